use laminark_core::config::PrivacyConfig;
use laminark_types::{HookEvent, HookEventName, ObservationSource};

use crate::admission::{self, AdmissionDecision, RejectReason};
use crate::extract;
use crate::redact::{self, UserPattern};
use crate::save_guard::{self, DuplicateLookup, SaveGuardDecision};
use crate::self_reference;

/// A fully-formed observation, ready for C1 to persist. Carries the
/// digest so the caller never has to recompute it before the insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineObservation {
    pub source: ObservationSource,
    pub content: String,
    pub digest: String,
}

/// Why a tool-use event produced no observation. None of these are errors —
/// the hook process exits success regardless (§4.2 detail floor, §7).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropReason {
    SelfReference,
    NotPostToolUse,
    MissingToolName,
    NoSummary,
    ExcludedPath,
    Admission(RejectReason),
    Duplicate(SaveGuardDecision),
}

pub type PipelineOutcome = Result<PipelineObservation, DropReason>;

/// Run a `PostToolUse`/`PostToolUseFailure` event through self-reference
/// guard → extract → redact → admission → save-guard (§4.2). Any other
/// event name is dropped — session lifecycle events are C3's concern.
pub fn run(
    event: &HookEvent,
    privacy: &PrivacyConfig,
    project_tag: &str,
    lookup: &dyn DuplicateLookup,
) -> PipelineOutcome {
    let event_name = event.event_name().map_err(|_| DropReason::NotPostToolUse)?;
    if !matches!(event_name, HookEventName::PostToolUse | HookEventName::PostToolUseFailure) {
        return Err(DropReason::NotPostToolUse);
    }

    let tool_name = event.tool_name.as_deref().ok_or(DropReason::MissingToolName)?;

    if self_reference::is_self_reference(tool_name) {
        return Err(DropReason::SelfReference);
    }

    let summary = extract::extract_summary(tool_name, event.tool_input.as_ref(), event.tool_response.as_ref())
        .ok_or(DropReason::NoSummary)?;

    if let Some(path) = event.tool_input.as_ref().and_then(|input| input.get("file_path")).and_then(|v| v.as_str()) {
        if redact::is_excluded_path(path, &privacy.excluded_files) {
            return Err(DropReason::ExcludedPath);
        }
    }

    let user_patterns: Vec<UserPattern> = privacy
        .additional_patterns
        .iter()
        .map(|p| UserPattern { regex: p.regex.clone(), replacement: p.replacement.clone() })
        .collect();
    let redacted = redact::redact(&summary, &user_patterns);

    let source = ObservationSource::hook(tool_name);

    match admission::decide(&source, &redacted) {
        AdmissionDecision::Reject(reason) => return Err(DropReason::Admission(reason)),
        AdmissionDecision::Admit => {}
    }

    let decision = save_guard::evaluate(lookup, project_tag, &source, &redacted);
    if !decision.save {
        return Err(DropReason::Duplicate(decision));
    }

    let digest = decision.duplicate_of.clone().unwrap_or_else(|| save_guard::content_digest(&source, &redacted));
    Ok(PipelineObservation { source, content: redacted, digest })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashSet;
    use std::sync::Mutex;

    struct AlwaysNovel;
    impl DuplicateLookup for AlwaysNovel {
        fn exists(&self, _project_tag: &str, _digest: &str) -> bool {
            false
        }
    }

    struct FakeLookup(Mutex<HashSet<String>>);
    impl DuplicateLookup for FakeLookup {
        fn exists(&self, _project_tag: &str, digest: &str) -> bool {
            self.0.lock().unwrap().contains(digest)
        }
    }

    fn write_event(path: &str, content: &str) -> HookEvent {
        HookEvent {
            hook_event_name: "PostToolUse".to_string(),
            session_id: "sess-1".to_string(),
            cwd: "/tmp/project".to_string(),
            tool_name: Some("Write".to_string()),
            tool_input: Some(json!({"file_path": path, "content": content})),
            tool_response: None,
            tool_use_id: None,
        }
    }

    #[test]
    fn write_event_is_admitted_end_to_end() {
        let privacy = PrivacyConfig::default();
        let outcome = run(&write_event("src/a.ts", "export const X=1"), &privacy, "proj", &AlwaysNovel);
        let observation = outcome.unwrap();
        assert!(observation.content.starts_with("[Write] Created src/a.ts"));
        assert_eq!(observation.source, ObservationSource::hook("Write"));
    }

    #[test]
    fn bash_noise_is_dropped_by_admission() {
        let event = HookEvent {
            hook_event_name: "PostToolUse".to_string(),
            session_id: "sess-1".to_string(),
            cwd: "/tmp/project".to_string(),
            tool_name: Some("Bash".to_string()),
            tool_input: Some(json!({"command": "npm install"})),
            tool_response: Some(json!({"output": "npm WARN deprecated X"})),
            tool_use_id: None,
        };
        let privacy = PrivacyConfig::default();
        let outcome = run(&event, &privacy, "proj", &AlwaysNovel);
        assert!(matches!(outcome, Err(DropReason::Admission(_))));
    }

    #[test]
    fn secret_in_bash_command_is_redacted() {
        let event = HookEvent {
            hook_event_name: "PostToolUse".to_string(),
            session_id: "sess-1".to_string(),
            cwd: "/tmp/project".to_string(),
            tool_name: Some("Bash".to_string()),
            tool_input: Some(json!({"command": "echo API_KEY=sk-AAAAAAAAAAAAAAAAAAAA"})),
            tool_response: Some(json!({"output": "done"})),
            tool_use_id: None,
        };
        let privacy = PrivacyConfig::default();
        let observation = run(&event, &privacy, "proj", &AlwaysNovel).unwrap();
        assert!(observation.content.contains("[REDACTED:api_key]"));
        assert!(!observation.content.contains("sk-AAAAAAAAAAAAAAAAAAAA"));
    }

    #[test]
    fn excluded_path_drops_the_event() {
        let event = write_event("/home/user/.env", "SECRET=abc123456");
        let privacy = PrivacyConfig::default();
        let outcome = run(&event, &privacy, "proj", &AlwaysNovel);
        assert_eq!(outcome, Err(DropReason::ExcludedPath));
    }

    #[test]
    fn self_reference_is_dropped_before_extraction() {
        let event = HookEvent {
            hook_event_name: "PostToolUse".to_string(),
            session_id: "sess-1".to_string(),
            cwd: "/tmp/project".to_string(),
            tool_name: Some("mcp__laminark__recall".to_string()),
            tool_input: Some(json!({"query": "anything"})),
            tool_response: None,
            tool_use_id: None,
        };
        let privacy = PrivacyConfig::default();
        let outcome = run(&event, &privacy, "proj", &AlwaysNovel);
        assert_eq!(outcome, Err(DropReason::SelfReference));
    }

    #[test]
    fn duplicate_content_is_rejected_by_save_guard() {
        let content = "export const X=1";
        let digest = save_guard::content_digest(&ObservationSource::hook("Write"), "[Write] Created src/a.ts\nexport const X=1");
        let lookup = FakeLookup(Mutex::new(HashSet::from([digest])));
        let privacy = PrivacyConfig::default();
        let outcome = run(&write_event("src/a.ts", content), &privacy, "proj", &lookup);
        assert!(matches!(outcome, Err(DropReason::Duplicate(_))));
    }

    #[test]
    fn session_lifecycle_events_are_not_handled_here() {
        let event = HookEvent {
            hook_event_name: "SessionStart".to_string(),
            session_id: "sess-1".to_string(),
            cwd: "/tmp/project".to_string(),
            tool_name: None,
            tool_input: None,
            tool_response: None,
            tool_use_id: None,
        };
        let privacy = PrivacyConfig::default();
        let outcome = run(&event, &privacy, "proj", &AlwaysNovel);
        assert_eq!(outcome, Err(DropReason::NotPostToolUse));
    }
}
