use laminark_storage::Store;
use laminark_types::ProjectTag;

use crate::fuzzy;
use crate::Result;

const MAX_DEGREE: usize = 50;
const HOTSPOT_RATIO: f64 = 0.8;

#[derive(Debug, Clone, PartialEq)]
pub struct GraphHealth {
    pub node_count: usize,
    pub edge_count: usize,
    pub average_degree: f64,
    pub hotspots: Vec<uuid::Uuid>,
    pub duplicate_candidate_count: usize,
}

/// Compute `getGraphHealth` (§4.5): totals, average degree, nodes over the
/// hotspot ratio of the max-degree cap, and the exact-match duplicate count.
pub fn get_graph_health(store: &Store, project_tag: &ProjectTag) -> Result<GraphHealth> {
    let node_count = store.count_nodes(project_tag)?;
    let edge_count = store.count_edges(project_tag)?;
    let nodes = store.list_all_nodes(project_tag)?;

    let mut degree_sum = 0usize;
    let mut hotspots = Vec::new();
    let hotspot_threshold = (MAX_DEGREE as f64 * HOTSPOT_RATIO).floor() as usize;

    for node in &nodes {
        let degree = store.count_edges_for_node(node.id)?;
        degree_sum += degree;
        if degree > hotspot_threshold {
            hotspots.push(node.id);
        }
    }

    let average_degree = if node_count == 0 { 0.0 } else { degree_sum as f64 / node_count as f64 };
    let duplicate_candidate_count = fuzzy::find_duplicate_entities(&nodes).len();

    Ok(GraphHealth { node_count, edge_count, average_degree, hotspots, duplicate_candidate_count })
}
