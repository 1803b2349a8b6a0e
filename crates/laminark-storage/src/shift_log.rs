use chrono::Utc;
use laminark_types::{ProjectTag, ShiftDecisionLogRow};
use rusqlite::params;
use uuid::Uuid;

use crate::codec::*;
use crate::store::Store;
use crate::Result;

impl Store {
    /// Append one row regardless of outcome (§4.6 step 6).
    pub fn append_shift_decision(&self, row: &ShiftDecisionLogRow) -> Result<()> {
        self.conn.execute(
            r#"
            INSERT INTO shift_decision_log (
                id, project_tag, session_id, observation_id, distance, threshold,
                ewma_distance, ewma_variance, sensitivity_multiplier, shifted,
                confidence, stash_id, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
            "#,
            params![
                row.id.to_string(),
                row.project_tag.as_str(),
                row.session_id.to_string(),
                row.observation_id.map(|id| id.to_string()),
                row.distance,
                row.threshold,
                row.ewma_distance,
                row.ewma_variance,
                row.sensitivity_multiplier,
                row.shifted,
                row.confidence,
                row.stash_id.map(|id| id.to_string()),
                ts_to_string(row.created_at),
            ],
        )?;
        Ok(())
    }

    pub fn shift_decisions_for_session(&self, session_id: Uuid) -> Result<Vec<ShiftDecisionLogRow>> {
        let mut stmt = self
            .conn
            .prepare("SELECT * FROM shift_decision_log WHERE session_id = ?1 ORDER BY created_at ASC")?;
        let rows = stmt
            .query_map([session_id.to_string()], |row| {
                let id: String = row.get("id")?;
                let project_tag: String = row.get("project_tag")?;
                let session_id: String = row.get("session_id")?;
                let observation_id: Option<String> = row.get("observation_id")?;
                let distance: f64 = row.get("distance")?;
                let threshold: f64 = row.get("threshold")?;
                let ewma_distance: f64 = row.get("ewma_distance")?;
                let ewma_variance: f64 = row.get("ewma_variance")?;
                let sensitivity_multiplier: f64 = row.get("sensitivity_multiplier")?;
                let shifted: bool = row.get("shifted")?;
                let confidence: f64 = row.get("confidence")?;
                let stash_id: Option<String> = row.get("stash_id")?;
                let created_at: String = row.get("created_at")?;

                Ok(ShiftDecisionLogRow {
                    id: uuid_from_str(&id).unwrap_or_default(),
                    project_tag: ProjectTag::new(project_tag),
                    session_id: uuid_from_str(&session_id).unwrap_or_default(),
                    observation_id: observation_id.and_then(|s| uuid_from_str(&s).ok()),
                    distance,
                    threshold,
                    ewma_distance,
                    ewma_variance,
                    sensitivity_multiplier,
                    shifted,
                    confidence,
                    stash_id: stash_id.and_then(|s| uuid_from_str(&s).ok()),
                    created_at: ts_from_str(&created_at).unwrap_or_else(|_| Utc::now()),
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }
}
