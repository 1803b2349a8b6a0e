use laminark_types::{EntityCandidate, NodeType, ObservationSource};

const MIN_NAME_LEN: usize = 3;
const MAX_NAME_LEN: usize = 200;
const VAGUE_PREFIXES: &[&str] = &["the ", "this ", "some ", "tmp "];
const FILE_NON_CHANGE_PENALTY: f64 = 0.74;
const MAX_FILE_ENTITIES: usize = 5;

/// Filters raw entity candidates from the extraction agent down to the ones
/// worth writing to the graph (§4.4 step 4b): name length, vague prefixes,
/// per-type confidence floors, the File-entity penalty for non-change
/// observations, and the File-entity cap.
pub fn apply(candidates: Vec<EntityCandidate>, source: &ObservationSource) -> Vec<EntityCandidate> {
    let passing: Vec<EntityCandidate> = candidates
        .into_iter()
        .filter_map(|mut candidate| {
            let len = candidate.name.trim().len();
            if len < MIN_NAME_LEN || len > MAX_NAME_LEN {
                return None;
            }
            let lower = candidate.name.to_lowercase();
            if VAGUE_PREFIXES.iter().any(|prefix| lower.starts_with(prefix)) {
                return None;
            }
            if candidate.entity_type == NodeType::File && !source.is_change_tool() {
                candidate.confidence *= FILE_NON_CHANGE_PENALTY;
            }
            if candidate.confidence < candidate.entity_type.confidence_floor() {
                return None;
            }
            Some(candidate)
        })
        .collect();

    let (mut files, mut rest): (Vec<_>, Vec<_>) =
        passing.into_iter().partition(|c| c.entity_type == NodeType::File);
    files.sort_by(|a, b| b.confidence.partial_cmp(&a.confidence).unwrap_or(std::cmp::Ordering::Equal));
    files.truncate(MAX_FILE_ENTITIES);
    rest.extend(files);
    rest
}
