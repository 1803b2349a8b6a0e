//! The analysis layer over the embedded store: graph entity/relation core
//! (duplicate finding, health), the topic-shift detector, and the debug-path
//! tracker. Everything here is pure computation plus short calls into
//! `laminark-storage` — no background loop lives in this crate.

mod detector;
mod error;
mod fuzzy;
mod health;
mod path_tracker;

pub use detector::{observe, record_decision, record_session_end, DetectorState, ShiftDecision};
pub use error::{Error, Result};
pub use fuzzy::{find_duplicate_entities, find_fuzzy_duplicates, DuplicateCandidate, MatchRule};
pub use health::{get_graph_health, GraphHealth};
pub use path_tracker::{PathOutcome, PathTracker};
