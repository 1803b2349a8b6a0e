use std::collections::HashMap;

use chrono::Utc;
use uuid::Uuid;

use laminark_clients::{EmbeddingPort, LlmPort};
use laminark_core::DetectorConfig;
use laminark_graph::{DetectorState, PathTracker};
use laminark_storage::Store;
use laminark_types::{
    Classification, EdgeType, EmbeddingModelTag, GraphEdge, GraphNode, NodeMetadata, Observation,
    ProjectTag, Signal,
};

use crate::quality_gate;
use crate::Result;

const MAX_DEGREE: usize = 50;
const MIN_ENTITIES_FOR_RELATIONSHIPS: usize = 2;
const EMBEDDING_MODEL_NAME: &str = "default";
const EMBEDDING_MODEL_VERSION: &str = "v1";

/// What happened to one observation inside the processor (§4.4).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessOutcome {
    /// Classified as noise; soft-deleted.
    Noise,
    /// Classified as signal; carries how many entities/edges were written.
    Signal { entities_written: usize, edges_written: usize },
    /// The agent's response had `signal = signal` but no classification —
    /// a malformed agent output (§7 taxonomy). Left unclassified for retry.
    Malformed,
}

/// Run one observation through the classifier → entity-extraction →
/// write-quality-gate → relationship-inference → embedding → topic-shift
/// chain (§4.4 steps 2-4; §4.6, folded into the same pass since C6 consumes
/// "each persisted observation with an embedding"). Any agent or storage
/// error propagates to the caller, which is expected to log it and leave
/// the observation unclassified for the next pass (§4.4 step 5, §7:
/// Transient/Malformed never halt the batch).
#[allow(clippy::too_many_arguments)]
pub fn process_observation(
    store: &Store,
    llm: &dyn LlmPort,
    embedder: &dyn EmbeddingPort,
    path_tracker: &mut PathTracker,
    detectors: &mut HashMap<Uuid, DetectorState>,
    detector_config: &DetectorConfig,
    observation: &Observation,
) -> Result<ProcessOutcome> {
    let source_str = observation.source.to_string();
    let output = laminark_clients::classify(llm, &observation.content, &source_str)?;
    let now = Utc::now();

    if output.signal == Signal::Noise {
        store.set_classification(observation.id, Classification::Noise, now)?;
        store.soft_delete_observation(observation.id)?;
        if let Some(signal) = &output.debug_signal {
            path_tracker.handle_signal(store, Some(observation.id), &observation.content, signal)?;
        }
        return Ok(ProcessOutcome::Noise);
    }

    let Some(classification) = output.classification else {
        return Ok(ProcessOutcome::Malformed);
    };
    store.set_classification(observation.id, classification, now)?;

    let raw_entities = laminark_clients::extract_entities(llm, &observation.content)?;
    let gated = quality_gate::apply(raw_entities, &observation.source);

    let mut node_ids: HashMap<String, Uuid> = HashMap::new();
    for candidate in &gated {
        let mut metadata = NodeMetadata::new();
        metadata.insert("confidence".to_string(), serde_json::json!(candidate.confidence));
        let mut observation_ids = std::collections::BTreeSet::new();
        observation_ids.insert(observation.id);

        let node = GraphNode {
            id: Uuid::new_v4(),
            project_tag: observation.project_tag.clone(),
            node_type: candidate.entity_type,
            name: candidate.name.clone(),
            metadata,
            observation_ids,
            created_at: now,
            updated_at: now,
        };
        let canonical = store.upsert_node(&node)?;
        node_ids.insert(GraphNode::normalized_name(&candidate.name), canonical.id);
    }

    let mut edges_written = 0;
    if gated.len() >= MIN_ENTITIES_FOR_RELATIONSHIPS {
        let relations =
            laminark_clients::infer_relationships(llm, &observation.content, &gated)?;
        for candidate in relations {
            let source_id = node_ids.get(&GraphNode::normalized_name(&candidate.source));
            let target_id = node_ids.get(&GraphNode::normalized_name(&candidate.target));
            let (Some(&source_id), Some(&target_id)) = (source_id, target_id) else { continue };
            if source_id == target_id {
                continue;
            }
            insert_edge_and_enforce_degree(
                store,
                source_id,
                target_id,
                candidate.relation_type,
                candidate.confidence.clamp(0.0, 1.0),
            )?;
            edges_written += 1;
        }
    }

    if let Some(signal) = &output.debug_signal {
        path_tracker.handle_signal(store, Some(observation.id), &observation.content, signal)?;
    }

    if let Some(session_id) = observation.session_id {
        let embedding = embedder.embed(&observation.content)?;
        let model = EmbeddingModelTag {
            model: EMBEDDING_MODEL_NAME.to_string(),
            version: EMBEDDING_MODEL_VERSION.to_string(),
            dimensions: embedding.len(),
        };
        store.set_embedding(observation.id, &embedding, &model)?;

        if !detectors.contains_key(&session_id) {
            let seeded = DetectorState::seeded(
                store,
                &observation.project_tag,
                detector_config.alpha,
                detector_config.sensitivity,
            )?;
            detectors.insert(session_id, seeded);
        }
        let state = detectors.get_mut(&session_id).expect("just inserted if absent");
        let decision = laminark_graph::observe(state, &embedding);
        laminark_graph::record_decision(
            store,
            &observation.project_tag,
            session_id,
            Some(observation.id),
            state,
            &decision,
            || format!("Context stash before topic shift at observation {}", observation.id),
        )?;
    }

    Ok(ProcessOutcome::Signal { entities_written: gated.len(), edges_written })
}

fn insert_edge_and_enforce_degree(
    store: &Store,
    source_id: Uuid,
    target_id: Uuid,
    edge_type: EdgeType,
    weight: f64,
) -> Result<()> {
    let edge = GraphEdge {
        id: Uuid::new_v4(),
        source_node_id: source_id,
        target_node_id: target_id,
        edge_type,
        weight,
        metadata: NodeMetadata::new(),
        created_at: Utc::now(),
    };
    store.insert_edge(&edge)?;
    store.enforce_max_degree(source_id, MAX_DEGREE)?;
    store.enforce_max_degree(target_id, MAX_DEGREE)?;
    Ok(())
}

/// Drain up to `batch_size` unclassified observations for one project,
/// oldest-first (§4.4 step 1), processing each in turn. A failure on one
/// observation is logged and the batch continues (§4.4 step 5). `detectors`
/// carries one `DetectorState` per open session across calls, so the EWMA
/// state accumulates as the loop keeps calling this with the same map.
#[allow(clippy::too_many_arguments)]
pub fn run_batch(
    store: &Store,
    llm: &dyn LlmPort,
    embedder: &dyn EmbeddingPort,
    path_tracker: &mut PathTracker,
    detectors: &mut HashMap<Uuid, DetectorState>,
    detector_config: &DetectorConfig,
    project_tag: &ProjectTag,
    batch_size: usize,
) -> Result<Vec<ProcessOutcome>> {
    let batch = store.list_unclassified(project_tag, batch_size)?;
    let mut outcomes = Vec::with_capacity(batch.len());
    for observation in &batch {
        match process_observation(store, llm, embedder, path_tracker, detectors, detector_config, observation) {
            Ok(outcome) => outcomes.push(outcome),
            Err(err) => {
                tracing::warn!(observation_id = %observation.id, error = %err, "processor: observation left unclassified");
            }
        }
    }
    Ok(outcomes)
}
