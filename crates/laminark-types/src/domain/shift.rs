use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::project::ProjectTag;

/// Snapshot of recent context created when the topic-shift detector (C6) decides
/// a session has moved on; write-once, never modified (§3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextStash {
    pub id: uuid::Uuid,
    pub session_id: uuid::Uuid,
    pub created_at: DateTime<Utc>,
    pub summary: String,
}

/// One row of the append-only shift-decision log (§3, §4.6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShiftDecisionLogRow {
    pub id: uuid::Uuid,
    pub project_tag: ProjectTag,
    pub session_id: uuid::Uuid,
    pub observation_id: Option<uuid::Uuid>,
    pub distance: f64,
    pub threshold: f64,
    pub ewma_distance: f64,
    pub ewma_variance: f64,
    pub sensitivity_multiplier: f64,
    pub shifted: bool,
    pub confidence: f64,
    pub stash_id: Option<uuid::Uuid>,
    pub created_at: DateTime<Utc>,
}
