use serde::Deserialize;

use super::graph::{EdgeType, NodeType};
use super::observation::Classification;
use super::path::DebugSignal;

/// Output schema of the classifier agent (§4.4 step 2, §4.10). A missing
/// `debug_signal` parses as `None` — agents that predate the debug-path
/// feature still validate.
#[derive(Debug, Clone, Deserialize)]
pub struct ClassifierOutput {
    pub signal: Signal,
    pub classification: Option<Classification>,
    pub reason: String,
    #[serde(default)]
    pub debug_signal: Option<DebugSignal>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Signal {
    Signal,
    Noise,
}

/// One entity candidate from the entity-extraction agent (§4.4 step 4a,
/// §4.10), before the write-quality gate has run.
#[derive(Debug, Clone, Deserialize)]
pub struct EntityCandidate {
    pub name: String,
    #[serde(rename = "type")]
    pub entity_type: NodeType,
    pub confidence: f64,
}

/// One relation candidate from the relationship-inference agent (§4.4 step
/// 4d, §4.10), named by entity name rather than id — the processor resolves
/// ids after the write-quality gate runs.
#[derive(Debug, Clone, Deserialize)]
pub struct RelationshipCandidate {
    pub source: String,
    pub target: String,
    #[serde(rename = "type")]
    pub relation_type: EdgeType,
    pub confidence: f64,
}
