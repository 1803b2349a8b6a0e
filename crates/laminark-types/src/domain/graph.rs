use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::project::ProjectTag;
use crate::error::{Error, Result};

/// Closed entity-type taxonomy (§4.5). Adding a variant requires a storage migration,
/// and the processor must reject any agent output outside this set (§9).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeType {
    Project,
    File,
    Decision,
    Problem,
    Solution,
    Reference,
}

impl NodeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeType::Project => "project",
            NodeType::File => "file",
            NodeType::Decision => "decision",
            NodeType::Problem => "problem",
            NodeType::Solution => "solution",
            NodeType::Reference => "reference",
        }
    }

    /// Minimum extraction confidence required before a candidate of this type
    /// is allowed to pass the write-quality gate (§4.4 step 4b).
    pub fn confidence_floor(&self) -> f64 {
        match self {
            NodeType::File => 0.95,
            NodeType::Reference => 0.85,
            NodeType::Project => 0.8,
            NodeType::Decision => 0.65,
            NodeType::Problem | NodeType::Solution => 0.6,
        }
    }
}

impl std::str::FromStr for NodeType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "project" => Ok(NodeType::Project),
            "file" => Ok(NodeType::File),
            "decision" => Ok(NodeType::Decision),
            "problem" => Ok(NodeType::Problem),
            "solution" => Ok(NodeType::Solution),
            "reference" => Ok(NodeType::Reference),
            other => Err(Error::UnknownVariant {
                field: "node.type",
                value: other.to_string(),
            }),
        }
    }
}

/// Closed relation-type taxonomy (§4.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeType {
    RelatedTo,
    SolvedBy,
    CausedBy,
    Modifies,
    InformedBy,
    References,
    VerifiedBy,
    PrecededBy,
}

impl EdgeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EdgeType::RelatedTo => "related_to",
            EdgeType::SolvedBy => "solved_by",
            EdgeType::CausedBy => "caused_by",
            EdgeType::Modifies => "modifies",
            EdgeType::InformedBy => "informed_by",
            EdgeType::References => "references",
            EdgeType::VerifiedBy => "verified_by",
            EdgeType::PrecededBy => "preceded_by",
        }
    }
}

impl std::str::FromStr for EdgeType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "related_to" => Ok(EdgeType::RelatedTo),
            "solved_by" => Ok(EdgeType::SolvedBy),
            "caused_by" => Ok(EdgeType::CausedBy),
            "modifies" => Ok(EdgeType::Modifies),
            "informed_by" => Ok(EdgeType::InformedBy),
            "references" => Ok(EdgeType::References),
            "verified_by" => Ok(EdgeType::VerifiedBy),
            "preceded_by" => Ok(EdgeType::PrecededBy),
            other => Err(Error::UnknownVariant {
                field: "edge.type",
                value: other.to_string(),
            }),
        }
    }
}

/// Free metadata map carried by a node; always expected to carry a `confidence` entry
/// once any entity has been written through the processor (§3).
pub type NodeMetadata = serde_json::Map<String, serde_json::Value>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: uuid::Uuid,
    pub project_tag: ProjectTag,
    pub node_type: NodeType,
    /// Display form, as originally observed.
    pub name: String,
    pub metadata: NodeMetadata,
    pub observation_ids: BTreeSet<uuid::Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl GraphNode {
    /// Comparison key for `(project, type, normalized-name)` uniqueness (§3):
    /// trimmed and lowercased, display form is preserved separately in `name`.
    pub fn normalized_name(name: &str) -> String {
        name.trim().to_lowercase()
    }

    pub fn confidence(&self) -> Option<f64> {
        self.metadata.get("confidence").and_then(|v| v.as_f64())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphEdge {
    pub id: uuid::Uuid,
    pub source_node_id: uuid::Uuid,
    pub target_node_id: uuid::Uuid,
    pub edge_type: EdgeType,
    pub weight: f64,
    pub metadata: NodeMetadata,
    pub created_at: DateTime<Utc>,
}

impl GraphEdge {
    pub fn is_self_loop(&self) -> bool {
        self.source_node_id == self.target_node_id
    }
}
