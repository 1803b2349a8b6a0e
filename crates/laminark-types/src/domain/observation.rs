use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::project::ProjectTag;
use crate::error::{Error, Result};

/// Where an observation's content came from.
///
/// Serializes as the spec's `source` strings (`hook:<tool>`, `mcp:<verb>`,
/// `curation:<verb>`, `manual`) rather than a tagged enum, since the inner
/// tool/verb name is free text supplied by the host or the curation pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum ObservationSource {
    Hook(String),
    Mcp(String),
    Curation(String),
    Manual,
}

impl ObservationSource {
    pub fn hook(tool: impl Into<String>) -> Self {
        ObservationSource::Hook(tool.into())
    }

    pub fn mcp(verb: impl Into<String>) -> Self {
        ObservationSource::Mcp(verb.into())
    }

    pub fn curation(verb: impl Into<String>) -> Self {
        ObservationSource::Curation(verb.into())
    }

    /// True for the host's own high-signal file tools (Write/Edit), which admission
    /// always accepts on non-empty content (§4.2 step 4).
    pub fn is_change_tool(&self) -> bool {
        matches!(self, ObservationSource::Hook(tool) if tool == "Write" || tool == "Edit")
    }

    pub fn is_mcp(&self) -> bool {
        matches!(self, ObservationSource::Mcp(_))
    }

    pub fn is_manual(&self) -> bool {
        matches!(self, ObservationSource::Manual)
    }
}

impl fmt::Display for ObservationSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ObservationSource::Hook(tool) => write!(f, "hook:{tool}"),
            ObservationSource::Mcp(verb) => write!(f, "mcp:{verb}"),
            ObservationSource::Curation(verb) => write!(f, "curation:{verb}"),
            ObservationSource::Manual => write!(f, "manual"),
        }
    }
}

impl From<ObservationSource> for String {
    fn from(s: ObservationSource) -> Self {
        s.to_string()
    }
}

impl TryFrom<String> for ObservationSource {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl std::str::FromStr for ObservationSource {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        if s == "manual" {
            return Ok(ObservationSource::Manual);
        }
        if let Some(tool) = s.strip_prefix("hook:") {
            return Ok(ObservationSource::Hook(tool.to_string()));
        }
        if let Some(verb) = s.strip_prefix("mcp:") {
            return Ok(ObservationSource::Mcp(verb.to_string()));
        }
        if let Some(verb) = s.strip_prefix("curation:") {
            return Ok(ObservationSource::Curation(verb.to_string()));
        }
        Err(Error::UnknownVariant {
            field: "observation.source",
            value: s.to_string(),
        })
    }
}

/// Structural class of an observation's content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObservationKind {
    Change,
    Reference,
    Finding,
    Decision,
    Verification,
}

impl ObservationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ObservationKind::Change => "change",
            ObservationKind::Reference => "reference",
            ObservationKind::Finding => "finding",
            ObservationKind::Decision => "decision",
            ObservationKind::Verification => "verification",
        }
    }
}

impl std::str::FromStr for ObservationKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "change" => Ok(ObservationKind::Change),
            "reference" => Ok(ObservationKind::Reference),
            "finding" => Ok(ObservationKind::Finding),
            "decision" => Ok(ObservationKind::Decision),
            "verification" => Ok(ObservationKind::Verification),
            other => Err(Error::UnknownVariant {
                field: "observation.kind",
                value: other.to_string(),
            }),
        }
    }
}

/// Classifier verdict persisted on an observation once the processor has run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    Discovery,
    Problem,
    Solution,
    Noise,
}

impl Classification {
    pub fn as_str(&self) -> &'static str {
        match self {
            Classification::Discovery => "discovery",
            Classification::Problem => "problem",
            Classification::Solution => "solution",
            Classification::Noise => "noise",
        }
    }
}

impl std::str::FromStr for Classification {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "discovery" => Ok(Classification::Discovery),
            "problem" => Ok(Classification::Problem),
            "solution" => Ok(Classification::Solution),
            "noise" => Ok(Classification::Noise),
            other => Err(Error::UnknownVariant {
                field: "observation.classification",
                value: other.to_string(),
            }),
        }
    }
}

/// Identifies the embedding model and version used to populate `embedding`,
/// so a later dimensionality change can't silently compare incompatible vectors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbeddingModelTag {
    pub model: String,
    pub version: String,
    pub dimensions: usize,
}

/// One unit of captured activity: text plus the metadata the pipeline attaches to it.
///
/// Immutable by default; the processor (C4) mutates only the classification fields
/// and embedding columns, and curation (C8) may soft-delete it. See spec §3.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Observation {
    pub id: uuid::Uuid,
    pub project_tag: ProjectTag,
    pub session_id: Option<uuid::Uuid>,
    pub content: String,
    pub title: Option<String>,
    pub source: ObservationSource,
    pub kind: ObservationKind,
    pub classification: Option<Classification>,
    pub classified_at: Option<DateTime<Utc>>,
    pub embedding: Option<Vec<f32>>,
    pub embedding_model: Option<EmbeddingModelTag>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Observation {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    pub fn is_unclassified(&self) -> bool {
        self.classification.is_none() && !self.is_deleted()
    }

    /// Short id used in the context-injection index (§4.9): first 8 hex chars.
    pub fn short_id(&self) -> String {
        self.id.simple().to_string()[..8].to_string()
    }
}
