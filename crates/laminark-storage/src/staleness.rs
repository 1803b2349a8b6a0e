use chrono::Utc;
use laminark_types::StalenessFlag;
use rusqlite::{params, OptionalExtension, Row};
use uuid::Uuid;

use crate::codec::*;
use crate::store::Store;
use crate::Result;

fn row_to_flag(row: &Row) -> rusqlite::Result<StalenessFlag> {
    let observation_id: String = row.get("observation_id")?;
    let reason: String = row.get("reason")?;
    let resolved: bool = row.get("resolved")?;
    let created_at: String = row.get("created_at")?;

    Ok(StalenessFlag {
        observation_id: Uuid::parse_str(&observation_id).unwrap_or_default(),
        reason,
        resolved,
        created_at: ts_from_str(&created_at).unwrap_or_else(|_| Utc::now()),
    })
}

impl Store {
    /// Insert a staleness flag. Returns `Error::Duplicate` if this
    /// observation already carries an unresolved flag (§3: "at most once").
    pub fn flag_stale(&self, flag: &StalenessFlag) -> Result<()> {
        self.conn.execute(
            "INSERT INTO staleness_flags (observation_id, reason, resolved, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![
                flag.observation_id.to_string(),
                flag.reason,
                flag.resolved,
                ts_to_string(flag.created_at),
            ],
        )?;
        Ok(())
    }

    pub fn unresolved_flag_for(&self, observation_id: Uuid) -> Result<Option<StalenessFlag>> {
        self.conn
            .query_row(
                "SELECT * FROM staleness_flags WHERE observation_id = ?1 AND resolved = 0",
                [observation_id.to_string()],
                row_to_flag,
            )
            .optional()
            .map_err(Into::into)
    }

    pub fn is_flagged_stale(&self, observation_id: Uuid) -> Result<bool> {
        Ok(self.unresolved_flag_for(observation_id)?.is_some())
    }
}
