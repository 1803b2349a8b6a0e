use chrono::Utc;
use laminark_types::{Classification, EmbeddingModelTag, Observation, ObservationKind, ObservationSource, ProjectTag};
use rusqlite::{params, OptionalExtension, Row};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::codec::*;
use crate::store::Store;
use crate::Result;

/// Filter accepted by [`Store::list_observations`]. All fields are
/// conjunctive; `None` means "no constraint on this field".
#[derive(Debug, Clone, Default)]
pub struct ObservationFilter {
    pub project_tag: Option<ProjectTag>,
    pub session_id: Option<Uuid>,
    pub kind: Option<ObservationKind>,
    pub include_deleted: bool,
}

fn content_digest(source: &ObservationSource, content: &str) -> String {
    let normalized = laminark_types::normalize_whitespace(content);
    let mut hasher = Sha256::new();
    hasher.update(source.to_string().as_bytes());
    hasher.update(b"\0");
    hasher.update(normalized.as_bytes());
    format!("{:x}", hasher.finalize())
}

fn row_to_observation(row: &Row) -> rusqlite::Result<(Observation, String)> {
    let id: String = row.get("id")?;
    let project_tag: String = row.get("project_tag")?;
    let session_id: Option<String> = row.get("session_id")?;
    let content: String = row.get("content")?;
    let title: Option<String> = row.get("title")?;
    let source: String = row.get("source")?;
    let kind: String = row.get("kind")?;
    let classification: Option<String> = row.get("classification")?;
    let classified_at: Option<String> = row.get("classified_at")?;
    let embedding: Option<Vec<u8>> = row.get("embedding")?;
    let embedding_model: Option<String> = row.get("embedding_model")?;
    let embedding_version: Option<String> = row.get("embedding_version")?;
    let embedding_dimensions: Option<i64> = row.get("embedding_dimensions")?;
    let digest: String = row.get("content_digest")?;
    let created_at: String = row.get("created_at")?;
    let updated_at: String = row.get("updated_at")?;
    let deleted_at: Option<String> = row.get("deleted_at")?;

    Ok((
        Observation {
            id: Uuid::parse_str(&id).unwrap_or_default(),
            project_tag: ProjectTag::new(project_tag),
            session_id: session_id.and_then(|s| Uuid::parse_str(&s).ok()),
            content,
            title,
            source: source.parse().unwrap_or(ObservationSource::Manual),
            kind: kind.parse().unwrap_or(ObservationKind::Reference),
            classification: classification.and_then(|c| c.parse().ok()),
            classified_at: classified_at.and_then(|t| ts_from_str(&t).ok()),
            embedding: embedding.and_then(|b| blob_to_embedding(&b).ok()),
            embedding_model: match (embedding_model, embedding_version, embedding_dimensions) {
                (Some(model), Some(version), Some(dimensions)) => Some(EmbeddingModelTag {
                    model,
                    version,
                    dimensions: dimensions as usize,
                }),
                _ => None,
            },
            created_at: ts_from_str(&created_at).unwrap_or_else(|_| Utc::now()),
            updated_at: ts_from_str(&updated_at).unwrap_or_else(|_| Utc::now()),
            deleted_at: deleted_at.and_then(|t| ts_from_str(&t).ok()),
        },
        digest,
    ))
}

impl Store {
    /// Persist a new observation. Returns `Error::Duplicate` if the
    /// content-addressed digest over `(source, normalized content)` already
    /// exists for a non-deleted observation in the same project (§3
    /// save-guard invariant; the intake pipeline's own save-guard is the
    /// primary gate, this is the backstop).
    pub fn create_observation(&self, obs: &Observation) -> Result<()> {
        let digest = content_digest(&obs.source, &obs.content);
        self.conn.execute(
            r#"
            INSERT INTO observations (
                id, project_tag, session_id, content, title, source, kind,
                classification, classified_at, embedding, embedding_model,
                embedding_version, embedding_dimensions, content_digest,
                created_at, updated_at, deleted_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)
            "#,
            params![
                obs.id.to_string(),
                obs.project_tag.as_str(),
                obs.session_id.map(|id| id.to_string()),
                obs.content,
                obs.title,
                obs.source.to_string(),
                obs.kind.as_str(),
                obs.classification.map(|c| c.as_str().to_string()),
                obs.classified_at.map(ts_to_string),
                obs.embedding.as_deref().map(embedding_to_blob),
                obs.embedding_model.as_ref().map(|m| m.model.clone()),
                obs.embedding_model.as_ref().map(|m| m.version.clone()),
                obs.embedding_model.as_ref().map(|m| m.dimensions as i64),
                digest,
                ts_to_string(obs.created_at),
                ts_to_string(obs.updated_at),
                obs.deleted_at.map(ts_to_string),
            ],
        )?;
        Ok(())
    }

    pub fn get_observation(&self, id: Uuid) -> Result<Option<Observation>> {
        self.conn
            .query_row(
                "SELECT * FROM observations WHERE id = ?1",
                [id.to_string()],
                |row| row_to_observation(row),
            )
            .optional()?
            .map(|(obs, _digest)| Ok(obs))
            .transpose()
    }

    pub fn list_observations(&self, filter: &ObservationFilter, limit: usize) -> Result<Vec<Observation>> {
        let mut sql = String::from("SELECT * FROM observations WHERE 1=1");
        let mut args: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(tag) = &filter.project_tag {
            sql.push_str(" AND project_tag = ?");
            args.push(Box::new(tag.as_str().to_string()));
        }
        if let Some(session_id) = filter.session_id {
            sql.push_str(" AND session_id = ?");
            args.push(Box::new(session_id.to_string()));
        }
        if let Some(kind) = filter.kind {
            sql.push_str(" AND kind = ?");
            args.push(Box::new(kind.as_str().to_string()));
        }
        if !filter.include_deleted {
            sql.push_str(" AND deleted_at IS NULL");
        }
        sql.push_str(" ORDER BY created_at DESC LIMIT ?");
        args.push(Box::new(limit as i64));

        let mut stmt = self.conn.prepare(&sql)?;
        let param_refs: Vec<&dyn rusqlite::ToSql> = args.iter().map(|b| b.as_ref()).collect();
        let rows = stmt
            .query_map(param_refs.as_slice(), row_to_observation)?
            .map(|r| r.map(|(obs, _)| obs))
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    /// Observations awaiting classification in this project, oldest first
    /// (§4.4 step 1).
    pub fn list_unclassified(&self, project_tag: &ProjectTag, limit: usize) -> Result<Vec<Observation>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT * FROM observations
            WHERE project_tag = ?1 AND classification IS NULL AND deleted_at IS NULL
            ORDER BY created_at ASC
            LIMIT ?2
            "#,
        )?;
        let rows = stmt
            .query_map(params![project_tag.as_str(), limit as i64], row_to_observation)?
            .map(|r| r.map(|(obs, _)| obs))
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    pub fn set_classification(
        &self,
        id: Uuid,
        classification: Classification,
        classified_at: chrono::DateTime<Utc>,
    ) -> Result<()> {
        self.conn.execute(
            "UPDATE observations SET classification = ?1, classified_at = ?2, updated_at = ?2 WHERE id = ?3",
            params![classification.as_str(), ts_to_string(classified_at), id.to_string()],
        )?;
        Ok(())
    }

    pub fn set_embedding(&self, id: Uuid, embedding: &[f32], model: &EmbeddingModelTag) -> Result<()> {
        self.conn.execute(
            r#"
            UPDATE observations SET
                embedding = ?1, embedding_model = ?2, embedding_version = ?3,
                embedding_dimensions = ?4, updated_at = ?5
            WHERE id = ?6
            "#,
            params![
                embedding_to_blob(embedding),
                model.model,
                model.version,
                model.dimensions as i64,
                ts_to_string(Utc::now()),
                id.to_string(),
            ],
        )?;
        Ok(())
    }

    /// Idempotent: soft-deleting an already-deleted observation leaves
    /// `deleted_at` at its original value (§3: "monotonically set").
    pub fn soft_delete_observation(&self, id: Uuid) -> Result<()> {
        self.conn.execute(
            "UPDATE observations SET deleted_at = COALESCE(deleted_at, ?1) WHERE id = ?2",
            params![ts_to_string(Utc::now()), id.to_string()],
        )?;
        Ok(())
    }

    pub fn restore_observation(&self, id: Uuid) -> Result<()> {
        self.conn.execute(
            "UPDATE observations SET deleted_at = NULL WHERE id = ?1",
            [id.to_string()],
        )?;
        Ok(())
    }

    /// Replace an observation's observation-id provenance with a single
    /// consolidated id; used by curation's observation-merge step when it
    /// rewrites a node's membership to point at the merged record.
    pub fn observation_exists(&self, id: Uuid) -> Result<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM observations WHERE id = ?1",
            [id.to_string()],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// True if a non-deleted observation with this content digest already
    /// exists for the project. Backs the intake pipeline's save-guard port
    /// at the edge where a hook process is wired to its own `Store`.
    pub fn digest_exists(&self, project_tag: &ProjectTag, digest: &str) -> Result<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM observations WHERE project_tag = ?1 AND content_digest = ?2 AND deleted_at IS NULL",
            params![project_tag.as_str(), digest],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }
}
