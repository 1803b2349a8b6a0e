use chrono::Utc;
use laminark_types::{ProjectTag, ThresholdHistoryRow};
use rusqlite::{params, Row};

use crate::codec::*;
use crate::store::Store;
use crate::Result;

fn row_to_threshold_history(row: &Row) -> rusqlite::Result<ThresholdHistoryRow> {
    let project_tag: String = row.get("project_tag")?;
    let session_id: String = row.get("session_id")?;
    let final_ewma_distance: f64 = row.get("final_ewma_distance")?;
    let final_ewma_variance: f64 = row.get("final_ewma_variance")?;
    let observation_count: i64 = row.get("observation_count")?;
    let created_at: String = row.get("created_at")?;

    Ok(ThresholdHistoryRow {
        project_tag: ProjectTag::new(project_tag),
        session_id: uuid_from_str(&session_id).unwrap_or_default(),
        final_ewma_distance,
        final_ewma_variance,
        observation_count: observation_count as u32,
        created_at: ts_from_str(&created_at).unwrap_or_else(|_| Utc::now()),
    })
}

impl Store {
    /// Append a final-state row on session end (§4.6 step 7).
    pub fn append_threshold_history(&self, row: &ThresholdHistoryRow) -> Result<()> {
        self.conn.execute(
            r#"
            INSERT INTO threshold_history (
                project_tag, session_id, final_ewma_distance, final_ewma_variance,
                observation_count, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                row.project_tag.as_str(),
                row.session_id.to_string(),
                row.final_ewma_distance,
                row.final_ewma_variance,
                row.observation_count as i64,
                ts_to_string(row.created_at),
            ],
        )?;
        Ok(())
    }

    /// Up to the last `limit` rows for this project, most-recent first, used
    /// to seed a new session's detector state (§4.6).
    pub fn recent_threshold_history(
        &self,
        project_tag: &ProjectTag,
        limit: usize,
    ) -> Result<Vec<ThresholdHistoryRow>> {
        let mut stmt = self.conn.prepare(
            "SELECT * FROM threshold_history WHERE project_tag = ?1 ORDER BY created_at DESC LIMIT ?2",
        )?;
        let rows = stmt
            .query_map(params![project_tag.as_str(), limit as i64], row_to_threshold_history)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn recent_threshold_history_respects_limit_and_order() {
        let store = Store::open_in_memory().unwrap();
        let tag = ProjectTag::new("proj1");

        for i in 0..3 {
            store
                .append_threshold_history(&ThresholdHistoryRow {
                    project_tag: tag.clone(),
                    session_id: Uuid::new_v4(),
                    final_ewma_distance: 0.1 * i as f64,
                    final_ewma_variance: 0.01,
                    observation_count: 10,
                    created_at: Utc::now() + chrono::Duration::seconds(i),
                })
                .unwrap();
        }

        let recent = store.recent_threshold_history(&tag, 2).unwrap();
        assert_eq!(recent.len(), 2);
        assert!(recent[0].final_ewma_distance >= recent[1].final_ewma_distance);
    }
}
