use chrono::Utc;
use laminark_types::{EdgeType, GraphEdge, GraphNode, NodeType, ProjectTag};
use rusqlite::{params, OptionalExtension, Row};
use uuid::Uuid;

use crate::codec::*;
use crate::store::Store;
use crate::Result;

fn row_to_node(row: &Row) -> rusqlite::Result<GraphNode> {
    let id: String = row.get("id")?;
    let project_tag: String = row.get("project_tag")?;
    let node_type: String = row.get("node_type")?;
    let name: String = row.get("name")?;
    let metadata: String = row.get("metadata")?;
    let observation_ids: String = row.get("observation_ids")?;
    let created_at: String = row.get("created_at")?;
    let updated_at: String = row.get("updated_at")?;

    Ok(GraphNode {
        id: Uuid::parse_str(&id).unwrap_or_default(),
        project_tag: ProjectTag::new(project_tag),
        node_type: node_type.parse().unwrap_or(NodeType::Reference),
        name,
        metadata: json_to_metadata(&metadata).unwrap_or_default(),
        observation_ids: json_to_observation_ids(&observation_ids).unwrap_or_default(),
        created_at: ts_from_str(&created_at).unwrap_or_else(|_| Utc::now()),
        updated_at: ts_from_str(&updated_at).unwrap_or_else(|_| Utc::now()),
    })
}

fn row_to_edge(row: &Row) -> rusqlite::Result<GraphEdge> {
    let id: String = row.get("id")?;
    let source_node_id: String = row.get("source_node_id")?;
    let target_node_id: String = row.get("target_node_id")?;
    let edge_type: String = row.get("edge_type")?;
    let weight: f64 = row.get("weight")?;
    let metadata: String = row.get("metadata")?;
    let created_at: String = row.get("created_at")?;

    Ok(GraphEdge {
        id: Uuid::parse_str(&id).unwrap_or_default(),
        source_node_id: Uuid::parse_str(&source_node_id).unwrap_or_default(),
        target_node_id: Uuid::parse_str(&target_node_id).unwrap_or_default(),
        edge_type: edge_type.parse().unwrap_or(EdgeType::RelatedTo),
        weight,
        metadata: json_to_metadata(&metadata).unwrap_or_default(),
        created_at: ts_from_str(&created_at).unwrap_or_else(|_| Utc::now()),
    })
}

fn confidence_of(node: &GraphNode) -> f64 {
    node.metadata.get("confidence").and_then(|v| v.as_f64()).unwrap_or(0.0)
}

impl Store {
    pub fn get_node(&self, id: Uuid) -> Result<Option<GraphNode>> {
        self.conn
            .query_row("SELECT * FROM graph_nodes WHERE id = ?1", [id.to_string()], row_to_node)
            .optional()
            .map_err(Into::into)
    }

    pub fn get_node_by_name_and_type(
        &self,
        project_tag: &ProjectTag,
        node_type: NodeType,
        name: &str,
    ) -> Result<Option<GraphNode>> {
        let normalized = GraphNode::normalized_name(name);
        self.conn
            .query_row(
                "SELECT * FROM graph_nodes WHERE project_tag = ?1 AND node_type = ?2 AND normalized_name = ?3",
                params![project_tag.as_str(), node_type.as_str(), normalized],
                row_to_node,
            )
            .optional()
            .map_err(Into::into)
    }

    pub fn list_nodes_by_type(&self, project_tag: &ProjectTag, node_type: NodeType) -> Result<Vec<GraphNode>> {
        let mut stmt = self
            .conn
            .prepare("SELECT * FROM graph_nodes WHERE project_tag = ?1 AND node_type = ?2")?;
        let rows = stmt
            .query_map(params![project_tag.as_str(), node_type.as_str()], row_to_node)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    pub fn list_all_nodes(&self, project_tag: &ProjectTag) -> Result<Vec<GraphNode>> {
        let mut stmt = self.conn.prepare("SELECT * FROM graph_nodes WHERE project_tag = ?1")?;
        let rows = stmt
            .query_map([project_tag.as_str()], row_to_node)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    /// Insert or merge a node by `(project, type, normalized-name)` identity
    /// (§4.5). On conflict, unions the observation-id set and keeps the
    /// higher `confidence` in metadata, last-write-wins for every other key.
    pub fn upsert_node(&self, node: &GraphNode) -> Result<GraphNode> {
        if let Some(existing) = self.get_node_by_name_and_type(&node.project_tag, node.node_type, &node.name)? {
            let mut merged_ids = existing.observation_ids.clone();
            merged_ids.extend(node.observation_ids.iter().copied());

            let mut merged_metadata = existing.metadata.clone();
            for (key, value) in &node.metadata {
                if key == "confidence" {
                    let incoming = value.as_f64().unwrap_or(0.0);
                    if incoming > confidence_of(&existing) {
                        merged_metadata.insert(key.clone(), value.clone());
                    }
                } else {
                    merged_metadata.insert(key.clone(), value.clone());
                }
            }

            let now = Utc::now();
            self.conn.execute(
                "UPDATE graph_nodes SET metadata = ?1, observation_ids = ?2, updated_at = ?3 WHERE id = ?4",
                params![
                    metadata_to_json(&merged_metadata),
                    observation_ids_to_json(&merged_ids),
                    ts_to_string(now),
                    existing.id.to_string(),
                ],
            )?;

            return Ok(GraphNode {
                metadata: merged_metadata,
                observation_ids: merged_ids,
                updated_at: now,
                ..existing
            });
        }

        let normalized = GraphNode::normalized_name(&node.name);
        self.conn.execute(
            r#"
            INSERT INTO graph_nodes (
                id, project_tag, node_type, name, normalized_name, metadata,
                observation_ids, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
            params![
                node.id.to_string(),
                node.project_tag.as_str(),
                node.node_type.as_str(),
                node.name,
                normalized,
                metadata_to_json(&node.metadata),
                observation_ids_to_json(&node.observation_ids),
                ts_to_string(node.created_at),
                ts_to_string(node.updated_at),
            ],
        )?;
        Ok(node.clone())
    }

    /// Reroute every edge touching `merge_id` to `keep_id`, union their
    /// observation ids, and delete `merge_id` (§4.5 `mergeEntities`).
    pub fn merge_nodes(&mut self, keep_id: Uuid, merge_id: Uuid) -> Result<()> {
        let tx = self.conn.transaction()?;

        let keep_row: (String, String) = tx.query_row(
            "SELECT metadata, observation_ids FROM graph_nodes WHERE id = ?1",
            [keep_id.to_string()],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        let merge_row: (String, String) = tx.query_row(
            "SELECT metadata, observation_ids FROM graph_nodes WHERE id = ?1",
            [merge_id.to_string()],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;

        let mut keep_ids = json_to_observation_ids(&keep_row.1)?;
        let merge_ids = json_to_observation_ids(&merge_row.1)?;
        keep_ids.extend(merge_ids);

        tx.execute(
            "UPDATE graph_nodes SET observation_ids = ?1, updated_at = ?2 WHERE id = ?3",
            params![observation_ids_to_json(&keep_ids), ts_to_string(Utc::now()), keep_id.to_string()],
        )?;

        // Reroute edges where merge_id is the source, skipping ones that
        // would become self-loops or collide with an existing keep-edge of
        // lower weight.
        {
            let mut stmt = tx.prepare(
                "SELECT id, target_node_id, edge_type, weight FROM graph_edges WHERE source_node_id = ?1",
            )?;
            let outgoing: Vec<(String, String, String, f64)> = stmt
                .query_map([merge_id.to_string()], |row| {
                    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            for (edge_id, target, edge_type, weight) in outgoing {
                reroute_edge(&tx, &edge_id, keep_id, &target, &edge_type, weight, true)?;
            }
        }
        {
            let mut stmt = tx.prepare(
                "SELECT id, source_node_id, edge_type, weight FROM graph_edges WHERE target_node_id = ?1",
            )?;
            let incoming: Vec<(String, String, String, f64)> = stmt
                .query_map([merge_id.to_string()], |row| {
                    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            for (edge_id, source, edge_type, weight) in incoming {
                reroute_edge(&tx, &edge_id, keep_id, &source, &edge_type, weight, false)?;
            }
        }

        tx.execute("DELETE FROM graph_edges WHERE source_node_id = ?1 OR target_node_id = ?1", [merge_id.to_string()])?;
        tx.execute("DELETE FROM graph_nodes WHERE id = ?1", [merge_id.to_string()])?;
        tx.commit()?;
        Ok(())
    }

    pub fn delete_node(&mut self, id: Uuid) -> Result<()> {
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM graph_edges WHERE source_node_id = ?1 OR target_node_id = ?1", [id.to_string()])?;
        tx.execute("DELETE FROM graph_nodes WHERE id = ?1", [id.to_string()])?;
        tx.commit()?;
        Ok(())
    }

    /// Insert an edge, rejecting self-loops. On `(source, target, type)`
    /// conflict, keeps the higher weight (§4.5 `insertEdge`). Enforces the
    /// max-degree cap on both endpoints afterward.
    pub fn insert_edge(&self, edge: &GraphEdge) -> Result<()> {
        if edge.source_node_id == edge.target_node_id {
            return Err(crate::Error::Query("self-loop edges are rejected".into()));
        }

        let existing: Option<(String, f64)> = self
            .conn
            .query_row(
                "SELECT id, weight FROM graph_edges WHERE source_node_id = ?1 AND target_node_id = ?2 AND edge_type = ?3",
                params![edge.source_node_id.to_string(), edge.target_node_id.to_string(), edge.edge_type.as_str()],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        match existing {
            Some((_, existing_weight)) if existing_weight >= edge.weight => {}
            Some((existing_id, _)) => {
                self.conn.execute(
                    "UPDATE graph_edges SET weight = ?1, metadata = ?2 WHERE id = ?3",
                    params![edge.weight, metadata_to_json(&edge.metadata), existing_id],
                )?;
            }
            None => {
                self.conn.execute(
                    r#"
                    INSERT INTO graph_edges (id, source_node_id, target_node_id, edge_type, weight, metadata, created_at)
                    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                    "#,
                    params![
                        edge.id.to_string(),
                        edge.source_node_id.to_string(),
                        edge.target_node_id.to_string(),
                        edge.edge_type.as_str(),
                        edge.weight,
                        metadata_to_json(&edge.metadata),
                        ts_to_string(edge.created_at),
                    ],
                )?;
            }
        }

        self.enforce_max_degree(edge.source_node_id, 50)?;
        self.enforce_max_degree(edge.target_node_id, 50)?;
        Ok(())
    }

    pub fn get_edges_for_node(&self, node_id: Uuid) -> Result<Vec<GraphEdge>> {
        let mut stmt = self
            .conn
            .prepare("SELECT * FROM graph_edges WHERE source_node_id = ?1 OR target_node_id = ?1")?;
        let rows = stmt
            .query_map([node_id.to_string()], row_to_edge)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    pub fn count_edges_for_node(&self, node_id: Uuid) -> Result<usize> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM graph_edges WHERE source_node_id = ?1 OR target_node_id = ?1",
            [node_id.to_string()],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    /// Delete the lowest-weight edges incident to `node_id` until its
    /// degree is at most `cap`. Ties broken oldest-first (§4.5).
    pub fn enforce_max_degree(&self, node_id: Uuid, cap: usize) -> Result<usize> {
        let degree = self.count_edges_for_node(node_id)?;
        if degree <= cap {
            return Ok(0);
        }
        let excess = degree - cap;

        let mut stmt = self.conn.prepare(
            r#"
            SELECT id FROM graph_edges
            WHERE source_node_id = ?1 OR target_node_id = ?1
            ORDER BY weight ASC, created_at ASC
            LIMIT ?2
            "#,
        )?;
        let victims: Vec<String> = stmt
            .query_map(params![node_id.to_string(), excess as i64], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        for id in &victims {
            self.conn.execute("DELETE FROM graph_edges WHERE id = ?1", [id])?;
        }
        Ok(victims.len())
    }

    pub fn delete_lowest_weight(&self, node_id: Uuid) -> Result<()> {
        self.enforce_max_degree(node_id, self.count_edges_for_node(node_id)?.saturating_sub(1))?;
        Ok(())
    }

    pub fn count_nodes(&self, project_tag: &ProjectTag) -> Result<usize> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM graph_nodes WHERE project_tag = ?1",
            [project_tag.as_str()],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    pub fn count_edges(&self, project_tag: &ProjectTag) -> Result<usize> {
        let count: i64 = self.conn.query_row(
            r#"
            SELECT COUNT(*) FROM graph_edges e
            JOIN graph_nodes n ON n.id = e.source_node_id
            WHERE n.project_tag = ?1
            "#,
            [project_tag.as_str()],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    /// All edges whose source node belongs to `project_tag`; used by
    /// curation's temporal-decay pass (§4.8 step 4).
    pub fn list_all_edges(&self, project_tag: &ProjectTag) -> Result<Vec<GraphEdge>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT e.* FROM graph_edges e
            JOIN graph_nodes n ON n.id = e.source_node_id
            WHERE n.project_tag = ?1
            "#,
        )?;
        let rows = stmt
            .query_map([project_tag.as_str()], row_to_edge)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    pub fn update_edge_weight(&self, id: Uuid, weight: f64) -> Result<()> {
        self.conn
            .execute("UPDATE graph_edges SET weight = ?1 WHERE id = ?2", params![weight, id.to_string()])?;
        Ok(())
    }

    pub fn delete_edge(&self, id: Uuid) -> Result<()> {
        self.conn.execute("DELETE FROM graph_edges WHERE id = ?1", [id.to_string()])?;
        Ok(())
    }

    /// Drop `remove` from a node's observation-id set and add `add` in their
    /// place; used by curation's observation-merge step (§4.8 step 1) to
    /// point a node at its newly consolidated observation.
    pub fn rewrite_node_observations(
        &self,
        node_id: Uuid,
        remove: &std::collections::BTreeSet<Uuid>,
        add: Uuid,
    ) -> Result<()> {
        let Some(node) = self.get_node(node_id)? else { return Ok(()) };
        let mut ids = node.observation_ids;
        for id in remove {
            ids.remove(id);
        }
        ids.insert(add);
        self.conn.execute(
            "UPDATE graph_nodes SET observation_ids = ?1, updated_at = ?2 WHERE id = ?3",
            params![observation_ids_to_json(&ids), ts_to_string(Utc::now()), node_id.to_string()],
        )?;
        Ok(())
    }
}

fn reroute_edge(
    tx: &rusqlite::Transaction,
    edge_id: &str,
    keep_id: Uuid,
    other_id: &str,
    edge_type: &str,
    weight: f64,
    merge_is_source: bool,
) -> rusqlite::Result<()> {
    if other_id == keep_id.to_string() {
        return Ok(());
    }

    let (source, target) = if merge_is_source {
        (keep_id.to_string(), other_id.to_string())
    } else {
        (other_id.to_string(), keep_id.to_string())
    };

    let collision: Option<(String, f64)> = tx
        .query_row(
            "SELECT id, weight FROM graph_edges WHERE source_node_id = ?1 AND target_node_id = ?2 AND edge_type = ?3 AND id != ?4",
            params![source, target, edge_type, edge_id],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?;

    match collision {
        Some((_, existing_weight)) if existing_weight >= weight => {}
        Some((collision_id, _)) => {
            tx.execute("UPDATE graph_edges SET weight = ?1 WHERE id = ?2", params![weight, collision_id])?;
        }
        None => {
            tx.execute(
                "UPDATE graph_edges SET source_node_id = ?1, target_node_id = ?2 WHERE id = ?3",
                params![source, target, edge_id],
            )?;
        }
    }
    Ok(())
}
