use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::project::ProjectTag;

/// A conversation window between the host assistant and the user.
///
/// At most one session per project may be open (`ended_at` null) at a time;
/// `summary` is set at most once, after `ended_at`. See spec §3.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: uuid::Uuid,
    pub project_tag: ProjectTag,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub summary: Option<String>,
}

impl Session {
    pub fn is_open(&self) -> bool {
        self.ended_at.is_none()
    }

    pub fn is_summarized(&self) -> bool {
        self.summary.is_some()
    }
}

/// Append-only record of a closed session's final adaptive-threshold state (§4.6 step 7).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThresholdHistoryRow {
    pub project_tag: ProjectTag,
    pub session_id: uuid::Uuid,
    pub final_ewma_distance: f64,
    pub final_ewma_variance: f64,
    pub observation_count: u32,
    pub created_at: DateTime<Utc>,
}
