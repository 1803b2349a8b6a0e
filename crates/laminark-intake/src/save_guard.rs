use sha2::{Digest, Sha256};

use laminark_types::{normalize_whitespace, ObservationSource};

/// Port to the persisted duplicate check. Kept separate from
/// `laminark-storage` so this crate stays a pure function of its inputs —
/// the runtime wires a storage-backed implementation in at the edge, the
/// same port-bundling shape the underlying provider adapters use to keep
/// parsing decoupled from persistence.
pub trait DuplicateLookup {
    /// True if a non-deleted observation with this digest already exists
    /// for the project.
    fn exists(&self, project_tag: &str, digest: &str) -> bool;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveGuardDecision {
    pub save: bool,
    pub reason: &'static str,
    pub duplicate_of: Option<String>,
}

/// The same digest laminark-storage's unique index enforces: sha256 over
/// `source || '\0' || normalize_whitespace(content)`. Computed here too so
/// the pipeline can short-circuit before ever reaching the database.
pub fn content_digest(source: &ObservationSource, content: &str) -> String {
    let normalized = normalize_whitespace(content);
    let mut hasher = Sha256::new();
    hasher.update(source.to_string().as_bytes());
    hasher.update(b"\0");
    hasher.update(normalized.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Evaluate the save-guard gate (§4.2 step 5). The storage layer's unique
/// index is the ultimate authority — this is a pre-flight check so a
/// known duplicate never reaches an insert attempt.
pub fn evaluate(
    lookup: &dyn DuplicateLookup,
    project_tag: &str,
    source: &ObservationSource,
    content: &str,
) -> SaveGuardDecision {
    let digest = content_digest(source, content);
    if lookup.exists(project_tag, &digest) {
        SaveGuardDecision {
            save: false,
            reason: "duplicate content for this project",
            duplicate_of: Some(digest),
        }
    } else {
        SaveGuardDecision { save: true, reason: "novel content", duplicate_of: None }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Mutex;

    struct FakeLookup(Mutex<HashSet<String>>);

    impl DuplicateLookup for FakeLookup {
        fn exists(&self, _project_tag: &str, digest: &str) -> bool {
            self.0.lock().unwrap().contains(digest)
        }
    }

    #[test]
    fn digest_is_stable_across_whitespace_variation() {
        let source = ObservationSource::hook("Write");
        let a = content_digest(&source, "export const X = 1");
        let b = content_digest(&source, "export   const X = 1\n");
        assert_eq!(a, b);
    }

    #[test]
    fn digest_differs_by_source() {
        let content = "export const X = 1";
        let hook = content_digest(&ObservationSource::hook("Write"), content);
        let manual = content_digest(&ObservationSource::Manual, content);
        assert_ne!(hook, manual);
    }

    #[test]
    fn novel_content_is_saved() {
        let lookup = FakeLookup(Mutex::new(HashSet::new()));
        let decision = evaluate(&lookup, "proj", &ObservationSource::hook("Write"), "new thing");
        assert!(decision.save);
        assert!(decision.duplicate_of.is_none());
    }

    #[test]
    fn known_digest_is_rejected() {
        let source = ObservationSource::hook("Write");
        let digest = content_digest(&source, "export const X = 1");
        let lookup = FakeLookup(Mutex::new(HashSet::from([digest])));
        let decision = evaluate(&lookup, "proj", &source, "export const X = 1");
        assert!(!decision.save);
        assert!(decision.duplicate_of.is_some());
    }
}
