use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Marks an observation as superseded without deleting it (§4.8 step 3).
/// At most one unresolved flag per observation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StalenessFlag {
    pub observation_id: uuid::Uuid,
    pub reason: String,
    pub resolved: bool,
    pub created_at: DateTime<Utc>,
}
