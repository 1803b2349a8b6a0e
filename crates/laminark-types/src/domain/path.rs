use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::project::ProjectTag;
use crate::error::{Error, Result};

/// The 4-state debug-path machine (§4.7): `idle -> potential -> active -> resolved`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PathState {
    Idle,
    Potential,
    Active,
    Resolved,
}

impl PathState {
    pub fn as_str(&self) -> &'static str {
        match self {
            PathState::Idle => "idle",
            PathState::Potential => "potential",
            PathState::Active => "active",
            PathState::Resolved => "resolved",
        }
    }
}

impl std::str::FromStr for PathState {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "idle" => Ok(PathState::Idle),
            "potential" => Ok(PathState::Potential),
            "active" => Ok(PathState::Active),
            "resolved" => Ok(PathState::Resolved),
            other => Err(Error::UnknownVariant {
                field: "path.state",
                value: other.to_string(),
            }),
        }
    }
}

/// Kind of step recorded inside an active debug path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WaypointType {
    Error,
    DeadEnd,
    Note,
}

/// One recorded step inside a debug path; summary is capped at 200 characters (§4.7).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Waypoint {
    pub waypoint_type: WaypointType,
    pub summary: String,
    pub observation_id: Option<uuid::Uuid>,
    pub recorded_at: DateTime<Utc>,
}

/// Maximum number of waypoints an active path may hold (§3, §4.7, §8).
pub const MAX_WAYPOINTS: usize = 30;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebugPath {
    pub id: uuid::Uuid,
    pub project_tag: ProjectTag,
    pub state: PathState,
    pub opened_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub waypoints: Vec<Waypoint>,
}

impl DebugPath {
    pub fn is_terminal(&self) -> bool {
        matches!(self.state, PathState::Resolved)
    }
}

/// Signal the classifier attaches to an observation, describing whether it looks
/// like an error or a resolution in an ongoing debug sequence (§4.4, §4.7, §4.10).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebugSignal {
    pub is_error: bool,
    pub is_resolution: bool,
    pub waypoint_hint: Option<String>,
    pub confidence: f64,
}
