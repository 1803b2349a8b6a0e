use chrono::Utc;
use laminark_types::ContextStash;
use rusqlite::{params, OptionalExtension, Row};
use uuid::Uuid;

use crate::codec::*;
use crate::store::Store;
use crate::Result;

fn row_to_stash(row: &Row) -> rusqlite::Result<ContextStash> {
    let id: String = row.get("id")?;
    let session_id: String = row.get("session_id")?;
    let created_at: String = row.get("created_at")?;
    let summary: String = row.get("summary")?;

    Ok(ContextStash {
        id: Uuid::parse_str(&id).unwrap_or_default(),
        session_id: Uuid::parse_str(&session_id).unwrap_or_default(),
        created_at: ts_from_str(&created_at).unwrap_or_else(|_| Utc::now()),
        summary,
    })
}

impl Store {
    /// Append-only: stashes are created only on topic-shift decisions and
    /// never modified (§3).
    pub fn create_stash(&self, stash: &ContextStash) -> Result<()> {
        self.conn.execute(
            "INSERT INTO context_stashes (id, session_id, created_at, summary) VALUES (?1, ?2, ?3, ?4)",
            params![
                stash.id.to_string(),
                stash.session_id.to_string(),
                ts_to_string(stash.created_at),
                stash.summary,
            ],
        )?;
        Ok(())
    }

    pub fn get_stash(&self, id: Uuid) -> Result<Option<ContextStash>> {
        self.conn
            .query_row("SELECT * FROM context_stashes WHERE id = ?1", [id.to_string()], row_to_stash)
            .optional()
            .map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_and_get_round_trips() {
        let store = Store::open_in_memory().unwrap();
        let stash = ContextStash {
            id: Uuid::new_v4(),
            session_id: Uuid::new_v4(),
            created_at: Utc::now(),
            summary: "switched topics".to_string(),
        };
        store.create_stash(&stash).unwrap();
        let fetched = store.get_stash(stash.id).unwrap().unwrap();
        assert_eq!(fetched.summary, "switched topics");
    }
}
