use std::collections::{BTreeSet, HashSet};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use laminark_graph::{find_duplicate_entities, find_fuzzy_duplicates, DuplicateCandidate};
use laminark_storage::{ObservationFilter, Store};
use laminark_types::{Observation, ObservationSource, ProjectTag};

use crate::Result;

const MIN_OBSERVATIONS_FOR_MERGE: usize = 3;
const MERGE_SIMILARITY_THRESHOLD: f64 = 0.85;
const MIN_OBSERVATIONS_FOR_STALENESS: usize = 2;
const EDGE_DECAY_MIN_AGE_DAYS: i64 = 1;
const EDGE_HALF_LIFE_DAYS: f64 = 30.0;
const EDGE_WEIGHT_FLOOR: f64 = 0.05;
const EDGE_DELETE_WEIGHT: f64 = 0.08;
const EDGE_DELETE_MAX_AGE_DAYS: i64 = 180;
const LOW_VALUE_MIN_AGE_DAYS: i64 = 90;
const LOW_VALUE_MAX_LEN: usize = 40;
const PRUNE_SCAN_LIMIT: usize = 100_000;

const NEGATION_PATTERNS: &[&str] = &["no longer", "stopped"];
const REPLACEMENT_PATTERNS: &[&str] = &["replaced with", "switched to", "migrated from"];
const STATUS_CHANGE_PATTERNS: &[&str] = &["deprecated", "removed"];

/// Result of one `runOnce` (§4.8). Every counter is zero on a second
/// immediate call against an unchanged graph (idempotence).
#[derive(Debug, Clone, Default)]
pub struct CurationReport {
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub observations_merged: usize,
    pub entities_deduplicated: usize,
    pub staleness_flags_added: usize,
    pub low_value_pruned: usize,
    pub edges_decayed: usize,
    pub edges_deleted: usize,
}

/// One periodic curation pass over a project (§4.8). Each step is wrapped
/// so a failure in one does not skip the next; step errors are logged and
/// counted as zero for that step.
pub fn run_once(store: &mut Store, project_tag: &ProjectTag) -> CurationReport {
    let started_at = Utc::now();
    let mut report = CurationReport { started_at, ..Default::default() };

    match merge_observations(store, project_tag) {
        Ok(n) => report.observations_merged = n,
        Err(err) => tracing::warn!(error = %err, "curation: observation merge step failed"),
    }
    match deduplicate_entities(store, project_tag) {
        Ok(n) => report.entities_deduplicated = n,
        Err(err) => tracing::warn!(error = %err, "curation: entity dedup step failed"),
    }
    match flag_staleness(store, project_tag) {
        Ok(n) => report.staleness_flags_added = n,
        Err(err) => tracing::warn!(error = %err, "curation: staleness flagging step failed"),
    }
    match decay_edges(store, project_tag) {
        Ok((decayed, deleted)) => {
            report.edges_decayed = decayed;
            report.edges_deleted = deleted;
        }
        Err(err) => tracing::warn!(error = %err, "curation: temporal decay step failed"),
    }
    match prune_low_value(store, project_tag) {
        Ok(n) => report.low_value_pruned = n,
        Err(err) => tracing::warn!(error = %err, "curation: low-value prune step failed"),
    }

    report.completed_at = Utc::now();
    report
}

fn merge_observations(store: &mut Store, project_tag: &ProjectTag) -> Result<usize> {
    let nodes = store.list_all_nodes(project_tag)?;
    let mut merged = 0;

    for node in nodes {
        if node.observation_ids.len() < MIN_OBSERVATIONS_FOR_MERGE {
            continue;
        }
        let observations: Vec<Observation> = node
            .observation_ids
            .iter()
            .filter_map(|id| store.get_observation(*id).ok().flatten())
            .filter(|obs| !obs.is_deleted())
            .collect();

        for cluster in cluster_by_similarity(&observations) {
            if cluster.len() < 2 {
                continue;
            }
            let consolidated_content = format!(
                "[Consolidated from {} observations] {}",
                cluster.len(),
                cluster
                    .iter()
                    .map(|obs| obs.content.as_str())
                    .max_by_key(|content| content.len())
                    .unwrap_or_default()
            );
            let now = Utc::now();
            let consolidated = Observation {
                id: Uuid::new_v4(),
                project_tag: project_tag.clone(),
                session_id: None,
                content: consolidated_content,
                title: None,
                source: ObservationSource::curation("merge"),
                kind: cluster[0].kind,
                classification: cluster[0].classification,
                classified_at: cluster[0].classified_at,
                embedding: None,
                embedding_model: None,
                created_at: now,
                updated_at: now,
                deleted_at: None,
            };
            store.create_observation(&consolidated)?;

            let mut originals = BTreeSet::new();
            for obs in &cluster {
                store.soft_delete_observation(obs.id)?;
                originals.insert(obs.id);
            }
            store.rewrite_node_observations(node.id, &originals, consolidated.id)?;
            merged += cluster.len();
        }
    }
    Ok(merged)
}

/// Greedy single-link clustering: each observation joins the first cluster
/// whose first member it's similar enough to, else starts a new one.
fn cluster_by_similarity(observations: &[Observation]) -> Vec<Vec<Observation>> {
    let mut clusters: Vec<Vec<Observation>> = Vec::new();
    for obs in observations {
        let home = clusters.iter_mut().find(|cluster| {
            similarity(&cluster[0], obs) >= MERGE_SIMILARITY_THRESHOLD
        });
        match home {
            Some(cluster) => cluster.push(obs.clone()),
            None => clusters.push(vec![obs.clone()]),
        }
    }
    clusters
}

fn similarity(a: &Observation, b: &Observation) -> f64 {
    match (&a.embedding, &b.embedding) {
        (Some(ea), Some(eb)) => cosine_similarity(ea, eb),
        _ => token_jaccard(&a.content, &b.content),
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    (dot / (norm_a * norm_b)) as f64
}

fn token_jaccard(a: &str, b: &str) -> f64 {
    let tokens = |s: &str| -> HashSet<String> {
        s.to_lowercase().split_whitespace().map(|t| t.to_string()).collect()
    };
    let (ta, tb) = (tokens(a), tokens(b));
    if ta.is_empty() && tb.is_empty() {
        return 1.0;
    }
    let intersection = ta.intersection(&tb).count();
    let union = ta.union(&tb).count();
    if union == 0 {
        0.0
    } else {
        intersection as f64 / union as f64
    }
}

fn deduplicate_entities(store: &mut Store, project_tag: &ProjectTag) -> Result<usize> {
    let nodes = store.list_all_nodes(project_tag)?;
    let mut candidates = find_duplicate_entities(&nodes);
    candidates.extend(find_fuzzy_duplicates(&nodes));

    let mut merged_away: HashSet<Uuid> = HashSet::new();
    let mut count = 0;
    for DuplicateCandidate { a, b, .. } in candidates {
        if merged_away.contains(&a) || merged_away.contains(&b) {
            continue;
        }
        let (Some(node_a), Some(node_b)) = (store.get_node(a)?, store.get_node(b)?) else { continue };
        let (keep, merge) = pick_canonical(&node_a, &node_b);
        store.merge_nodes(keep, merge)?;
        merged_away.insert(merge);
        count += 1;
    }
    Ok(count)
}

/// Tie-break for which of two duplicate nodes survives a merge: more
/// observations wins, then the older node (§4.8 step 2).
fn pick_canonical(a: &laminark_types::GraphNode, b: &laminark_types::GraphNode) -> (Uuid, Uuid) {
    if a.observation_ids.len() != b.observation_ids.len() {
        return if a.observation_ids.len() > b.observation_ids.len() { (a.id, b.id) } else { (b.id, a.id) };
    }
    if a.created_at <= b.created_at {
        (a.id, b.id)
    } else {
        (b.id, a.id)
    }
}

fn flag_staleness(store: &Store, project_tag: &ProjectTag) -> Result<usize> {
    let nodes = store.list_all_nodes(project_tag)?;
    let mut flagged = 0;

    for node in nodes {
        if node.observation_ids.len() < MIN_OBSERVATIONS_FOR_STALENESS {
            continue;
        }
        let mut observations: Vec<Observation> = node
            .observation_ids
            .iter()
            .filter_map(|id| store.get_observation(*id).ok().flatten())
            .filter(|obs| !obs.is_deleted())
            .collect();
        observations.sort_by_key(|obs| obs.created_at);

        for window in observations.windows(2) {
            let (older, newer) = (&window[0], &window[1]);
            let Some(reason) = contradiction_reason(&newer.content) else { continue };
            if store.unresolved_flag_for(older.id)?.is_some() {
                continue;
            }
            store.flag_stale(&laminark_types::StalenessFlag {
                observation_id: older.id,
                reason,
                resolved: false,
                created_at: Utc::now(),
            })?;
            flagged += 1;
        }
    }
    Ok(flagged)
}

fn contradiction_reason(content: &str) -> Option<String> {
    let lower = content.to_lowercase();
    for pattern in NEGATION_PATTERNS {
        if lower.contains(pattern) {
            return Some(format!("negation: \"{pattern}\""));
        }
    }
    for pattern in REPLACEMENT_PATTERNS {
        if lower.contains(pattern) {
            return Some(format!("replacement: \"{pattern}\""));
        }
    }
    for pattern in STATUS_CHANGE_PATTERNS {
        if lower.contains(pattern) {
            return Some(format!("status change: \"{pattern}\""));
        }
    }
    None
}

fn decay_edges(store: &Store, project_tag: &ProjectTag) -> Result<(usize, usize)> {
    let edges = store.list_all_edges(project_tag)?;
    let now = Utc::now();
    let (mut decayed, mut deleted) = (0, 0);

    for edge in edges {
        let age_days = now.signed_duration_since(edge.created_at).num_days();
        if age_days <= EDGE_DECAY_MIN_AGE_DAYS {
            continue;
        }
        let decayed_weight =
            (edge.weight * 0.5_f64.powf(age_days as f64 / EDGE_HALF_LIFE_DAYS)).max(EDGE_WEIGHT_FLOOR);

        if decayed_weight < EDGE_DELETE_WEIGHT || age_days > EDGE_DELETE_MAX_AGE_DAYS {
            store.delete_edge(edge.id)?;
            deleted += 1;
        } else {
            store.update_edge_weight(edge.id, decayed_weight)?;
            decayed += 1;
        }
    }
    Ok((decayed, deleted))
}

fn prune_low_value(store: &Store, project_tag: &ProjectTag) -> Result<usize> {
    let filter = ObservationFilter { project_tag: Some(project_tag.clone()), ..Default::default() };
    let observations = store.list_observations(&filter, PRUNE_SCAN_LIMIT)?;
    let linked: HashSet<Uuid> = store
        .list_all_nodes(project_tag)?
        .into_iter()
        .flat_map(|node| node.observation_ids.into_iter())
        .collect();

    let now = Utc::now();
    let mut pruned = 0;
    for obs in observations {
        let age_days = now.signed_duration_since(obs.created_at).num_days();
        let is_auto_capture = !obs.source.is_mcp() && !obs.source.is_manual();
        if age_days > LOW_VALUE_MIN_AGE_DAYS
            && obs.content.len() < LOW_VALUE_MAX_LEN
            && !linked.contains(&obs.id)
            && is_auto_capture
        {
            store.soft_delete_observation(obs.id)?;
            pruned += 1;
        }
    }
    Ok(pruned)
}

#[cfg(test)]
mod tests {
    use super::*;
    use laminark_types::{GraphNode, NodeMetadata, NodeType, ObservationKind};

    fn project() -> ProjectTag {
        ProjectTag::new("proj")
    }

    fn observation_with_node(store: &Store, node_id: &mut Option<Uuid>, content: &str, created_at: DateTime<Utc>) -> Uuid {
        let obs = Observation {
            id: Uuid::new_v4(),
            project_tag: project(),
            session_id: None,
            content: content.to_string(),
            title: None,
            source: ObservationSource::hook("Write"),
            kind: ObservationKind::Change,
            classification: Some(laminark_types::Classification::Discovery),
            classified_at: None,
            embedding: None,
            embedding_model: None,
            created_at,
            updated_at: created_at,
            deleted_at: None,
        };
        store.create_observation(&obs).unwrap();

        let id = node_id.unwrap_or_else(Uuid::new_v4);
        let mut observation_ids = BTreeSet::new();
        observation_ids.insert(obs.id);
        let node = GraphNode {
            id,
            project_tag: project(),
            node_type: NodeType::Decision,
            name: "shared decision".to_string(),
            metadata: NodeMetadata::new(),
            observation_ids,
            created_at,
            updated_at: created_at,
        };
        let stored = store.upsert_node(&node).unwrap();
        *node_id = Some(stored.id);
        obs.id
    }

    #[test]
    fn merging_near_duplicate_observations_is_idempotent() {
        let mut store = Store::open_in_memory().unwrap();
        let project_tag = project();
        let mut node_id = None;
        let now = Utc::now();
        observation_with_node(&store, &mut node_id, "decided to use approach a for the auth module today", now);
        observation_with_node(&store, &mut node_id, "decided to use approach a for the auth module today now", now);
        observation_with_node(&store, &mut node_id, "decided to use approach a for the auth module today again", now);

        let first = run_once(&mut store, &project_tag);
        assert!(first.observations_merged >= 2);

        let second = run_once(&mut store, &project_tag);
        assert_eq!(second.observations_merged, 0, "a second immediate pass finds nothing new to merge");
    }

    #[test]
    fn staleness_flagging_marks_the_older_observation() {
        let store = Store::open_in_memory().unwrap();
        let project_tag = project();
        let mut node_id = None;
        let older_time = Utc::now() - chrono::Duration::days(2);
        let older = observation_with_node(&store, &mut node_id, "using approach A", older_time);
        observation_with_node(&store, &mut node_id, "replaced with approach B", Utc::now());

        let flagged = flag_staleness(&store, &project_tag).unwrap();
        assert_eq!(flagged, 1);
        assert!(store.unresolved_flag_for(older).unwrap().is_some());

        let second_pass = flag_staleness(&store, &project_tag).unwrap();
        assert_eq!(second_pass, 0, "an already-flagged observation is not double-flagged");
    }

    #[test]
    fn edge_decay_deletes_edges_past_the_age_ceiling() {
        let store = Store::open_in_memory().unwrap();
        let project_tag = project();
        let a = store
            .upsert_node(&GraphNode {
                id: Uuid::new_v4(),
                project_tag: project_tag.clone(),
                node_type: NodeType::File,
                name: "a.rs".to_string(),
                metadata: NodeMetadata::new(),
                observation_ids: BTreeSet::new(),
                created_at: Utc::now(),
                updated_at: Utc::now(),
            })
            .unwrap();
        let b = store
            .upsert_node(&GraphNode {
                id: Uuid::new_v4(),
                project_tag: project_tag.clone(),
                node_type: NodeType::File,
                name: "b.rs".to_string(),
                metadata: NodeMetadata::new(),
                observation_ids: BTreeSet::new(),
                created_at: Utc::now(),
                updated_at: Utc::now(),
            })
            .unwrap();
        let old_edge = laminark_types::GraphEdge {
            id: Uuid::new_v4(),
            source_node_id: a.id,
            target_node_id: b.id,
            edge_type: laminark_types::EdgeType::RelatedTo,
            weight: 0.9,
            metadata: NodeMetadata::new(),
            created_at: Utc::now() - chrono::Duration::days(200),
        };
        store.insert_edge(&old_edge).unwrap();

        let (decayed, deleted) = decay_edges(&store, &project_tag).unwrap();
        assert_eq!(decayed, 0);
        assert_eq!(deleted, 1);
        assert_eq!(store.count_edges(&project_tag).unwrap(), 0);
    }

    #[test]
    fn low_value_prune_skips_mcp_and_manual_sources() {
        let store = Store::open_in_memory().unwrap();
        let project_tag = project();
        let old = Utc::now() - chrono::Duration::days(120);

        let mcp_obs = Observation {
            id: Uuid::new_v4(),
            project_tag: project_tag.clone(),
            session_id: None,
            content: "short".to_string(),
            title: None,
            source: ObservationSource::mcp("save_memory"),
            kind: ObservationKind::Reference,
            classification: Some(laminark_types::Classification::Discovery),
            classified_at: None,
            embedding: None,
            embedding_model: None,
            created_at: old,
            updated_at: old,
            deleted_at: None,
        };
        store.create_observation(&mcp_obs).unwrap();

        let hook_obs = Observation {
            id: Uuid::new_v4(),
            project_tag: project_tag.clone(),
            session_id: None,
            content: "short one".to_string(),
            title: None,
            source: ObservationSource::hook("Bash"),
            kind: ObservationKind::Reference,
            classification: Some(laminark_types::Classification::Discovery),
            classified_at: None,
            embedding: None,
            embedding_model: None,
            created_at: old,
            updated_at: old,
            deleted_at: None,
        };
        store.create_observation(&hook_obs).unwrap();

        let pruned = prune_low_value(&store, &project_tag).unwrap();
        assert_eq!(pruned, 1);
        assert!(!store.get_observation(mcp_obs.id).unwrap().unwrap().is_deleted());
        assert!(store.get_observation(hook_obs.id).unwrap().unwrap().is_deleted());
    }
}
