use std::io::Read;
use std::path::Path;
use uuid::Uuid;

use laminark_core::{discover_project_root, load_config, project_tag_from_root, Config};
use laminark_intake::pipeline::{self, DropReason};
use laminark_intake::save_guard::DuplicateLookup;
use laminark_storage::Store;
use laminark_types::{HookEvent, HookEventName, Observation, ObservationKind, ProjectTag};

const DB_FILE_NAME: &str = "db.sqlite";

/// Reads one hook event from stdin and handles it. Never propagates an
/// error to the caller: every failure is logged and the process still
/// exits success, per §7's "a failed capture is invisible to the user".
pub fn handle(data_dir: &Path, project_root_override: Option<&str>) {
    let event = match read_event() {
        Ok(event) => event,
        Err(err) => {
            tracing::warn!(error = %err, "hook: could not parse stdin as a hook event");
            return;
        }
    };

    let project_root = match discover_project_root(project_root_override, Some(&event.cwd)) {
        Ok(root) => root,
        Err(err) => {
            tracing::warn!(error = %err, "hook: could not resolve project root");
            return;
        }
    };
    let project_tag = project_tag_from_root(&project_root.display().to_string());

    let config = load_config(data_dir).unwrap_or_else(|err| {
        tracing::warn!(error = %err, "hook: could not load config, using defaults");
        Config::default()
    });

    let store = match Store::open(&data_dir.join(DB_FILE_NAME)) {
        Ok(store) => store,
        Err(err) => {
            tracing::error!(error = %err, "hook: could not open store");
            if matches!(event.event_name(), Ok(HookEventName::SessionStart)) {
                println!("{}", laminark_runtime::WELCOME_LINE);
            }
            return;
        }
    };

    match event.event_name() {
        Ok(HookEventName::PostToolUse) | Ok(HookEventName::PostToolUseFailure) => {
            handle_tool_use(&store, &config, &event, &project_tag)
        }
        Ok(HookEventName::SessionStart) => handle_session_start(&store, &project_tag),
        Ok(HookEventName::SessionEnd) => handle_session_end(&store, &project_tag),
        Ok(HookEventName::Stop) => handle_stop(&store, &project_tag),
        Err(err) => tracing::warn!(error = %err, name = %event.hook_event_name, "hook: unrecognized event name"),
    }
}

fn read_event() -> anyhow::Result<HookEvent> {
    let mut raw = String::new();
    std::io::stdin().read_to_string(&mut raw)?;
    Ok(serde_json::from_str(&raw)?)
}

fn handle_tool_use(store: &Store, config: &Config, event: &HookEvent, project_tag: &ProjectTag) {
    let lookup = StoreDuplicateLookup { store };

    match pipeline::run(event, &config.privacy, project_tag.as_str(), &lookup) {
        Ok(observation) => {
            let tool_name = event.tool_name.as_deref().unwrap_or("");
            let now = chrono::Utc::now();
            let session_id = store.open_session(project_tag).ok().flatten().map(|s| s.id);
            let obs = Observation {
                id: Uuid::new_v4(),
                project_tag: project_tag.clone(),
                session_id,
                content: observation.content,
                title: None,
                source: observation.source,
                kind: kind_for_tool(tool_name),
                classification: None,
                classified_at: None,
                embedding: None,
                embedding_model: None,
                created_at: now,
                updated_at: now,
                deleted_at: None,
            };
            if let Err(err) = store.create_observation(&obs) {
                tracing::warn!(error = %err, "hook: failed to persist observation");
            }
        }
        Err(reason) => tracing::debug!(reason = ?reason, "hook: observation dropped"),
    }
}

fn handle_session_start(store: &Store, project_tag: &ProjectTag) {
    let context = laminark_runtime::handle_session_start(store, project_tag).unwrap_or_else(|err| {
        tracing::warn!(error = %err, "hook: session start failed, falling back to the welcome line");
        laminark_runtime::WELCOME_LINE.to_string()
    });
    println!("{context}");
}

fn handle_session_end(store: &Store, project_tag: &ProjectTag) {
    let Ok(Some(session)) = store.open_session(project_tag) else {
        return;
    };
    if let Err(err) = laminark_runtime::handle_session_end(store, session.id) {
        tracing::warn!(error = %err, "hook: session end failed");
    }
}

fn handle_stop(store: &Store, project_tag: &ProjectTag) {
    let Ok(Some(session)) = store.open_session(project_tag) else {
        return;
    };
    if let Err(err) = laminark_runtime::handle_stop(store, session.id) {
        tracing::warn!(error = %err, "hook: stop handling failed");
    }
}

/// Write/Edit land directly in the repository, so they're the structural
/// "change" kind. Bash is how a session runs builds/tests, so it reads as
/// verification. Everything else (Read/Glob/Grep/unrecognized) is a
/// reference, matching `ObservationKind`'s own parse-fallback default.
fn kind_for_tool(tool_name: &str) -> ObservationKind {
    match tool_name {
        "Write" | "Edit" => ObservationKind::Change,
        "Bash" => ObservationKind::Verification,
        _ => ObservationKind::Reference,
    }
}

struct StoreDuplicateLookup<'a> {
    store: &'a Store,
}

impl DuplicateLookup for StoreDuplicateLookup<'_> {
    fn exists(&self, project_tag: &str, digest: &str) -> bool {
        self.store.digest_exists(&ProjectTag::new(project_tag), digest).unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_and_edit_are_changes() {
        assert_eq!(kind_for_tool("Write"), ObservationKind::Change);
        assert_eq!(kind_for_tool("Edit"), ObservationKind::Change);
    }

    #[test]
    fn bash_is_verification() {
        assert_eq!(kind_for_tool("Bash"), ObservationKind::Verification);
    }

    #[test]
    fn everything_else_is_a_reference() {
        assert_eq!(kind_for_tool("Read"), ObservationKind::Reference);
        assert_eq!(kind_for_tool("Glob"), ObservationKind::Reference);
        assert_eq!(kind_for_tool("mcp__laminark__recall"), ObservationKind::Reference);
    }

    #[test]
    fn lookup_reports_existing_digest() {
        let store = Store::open_in_memory().unwrap();
        let lookup = StoreDuplicateLookup { store: &store };
        assert!(!lookup.exists("proj", "deadbeef"));
    }
}
