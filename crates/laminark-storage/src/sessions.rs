use chrono::Utc;
use laminark_types::{ProjectTag, Session};
use rusqlite::{params, OptionalExtension, Row};
use uuid::Uuid;

use crate::codec::*;
use crate::store::Store;
use crate::Result;

fn row_to_session(row: &Row) -> rusqlite::Result<Session> {
    let id: String = row.get("id")?;
    let project_tag: String = row.get("project_tag")?;
    let started_at: String = row.get("started_at")?;
    let ended_at: Option<String> = row.get("ended_at")?;
    let summary: Option<String> = row.get("summary")?;

    Ok(Session {
        id: Uuid::parse_str(&id).unwrap_or_default(),
        project_tag: ProjectTag::new(project_tag),
        started_at: ts_from_str(&started_at).unwrap_or_else(|_| Utc::now()),
        ended_at: ended_at.and_then(|t| ts_from_str(&t).ok()),
        summary,
    })
}

impl Store {
    /// The open session for this project, if one exists (§3: "at most once
    /// open").
    pub fn open_session(&self, project_tag: &ProjectTag) -> Result<Option<Session>> {
        self.conn
            .query_row(
                "SELECT * FROM sessions WHERE project_tag = ?1 AND ended_at IS NULL ORDER BY started_at DESC LIMIT 1",
                [project_tag.as_str()],
                row_to_session,
            )
            .optional()
            .map_err(Into::into)
    }

    pub fn create_session(&self, session: &Session) -> Result<()> {
        self.conn.execute(
            "INSERT INTO sessions (id, project_tag, started_at, ended_at, summary) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                session.id.to_string(),
                session.project_tag.as_str(),
                ts_to_string(session.started_at),
                session.ended_at.map(ts_to_string),
                session.summary,
            ],
        )?;
        Ok(())
    }

    pub fn end_session(&self, id: Uuid, ended_at: chrono::DateTime<Utc>) -> Result<()> {
        self.conn.execute(
            "UPDATE sessions SET ended_at = ?1 WHERE id = ?2 AND ended_at IS NULL",
            params![ts_to_string(ended_at), id.to_string()],
        )?;
        Ok(())
    }

    /// Set a session's summary. Per the §3 invariant this is a one-time
    /// write; re-calling with an already-summarized session is a no-op.
    pub fn set_summary(&self, id: Uuid, summary: &str) -> Result<()> {
        self.conn.execute(
            "UPDATE sessions SET summary = ?1 WHERE id = ?2 AND summary IS NULL",
            params![summary, id.to_string()],
        )?;
        Ok(())
    }

    pub fn get_session(&self, id: Uuid) -> Result<Option<Session>> {
        self.conn
            .query_row("SELECT * FROM sessions WHERE id = ?1", [id.to_string()], row_to_session)
            .optional()
            .map_err(Into::into)
    }

    /// The most recently ended session in this project that has a summary,
    /// used by context injection (§4.9).
    pub fn last_completed_with_summary(&self, project_tag: &ProjectTag) -> Result<Option<Session>> {
        self.conn
            .query_row(
                r#"
                SELECT * FROM sessions
                WHERE project_tag = ?1 AND ended_at IS NOT NULL AND summary IS NOT NULL
                ORDER BY ended_at DESC
                LIMIT 1
                "#,
                [project_tag.as_str()],
                row_to_session,
            )
            .optional()
            .map_err(Into::into)
    }

    /// Up to the last `limit` closed sessions in this project, most-recent
    /// first, used by the topic-shift detector to seed EWMA state (§4.6).
    pub fn recent_closed_sessions(&self, project_tag: &ProjectTag, limit: usize) -> Result<Vec<Session>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT * FROM sessions
            WHERE project_tag = ?1 AND ended_at IS NOT NULL
            ORDER BY ended_at DESC
            LIMIT ?2
            "#,
        )?;
        let rows = stmt
            .query_map(params![project_tag.as_str(), limit as i64], row_to_session)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(project_tag: &str) -> Session {
        Session {
            id: Uuid::new_v4(),
            project_tag: ProjectTag::new(project_tag),
            started_at: Utc::now(),
            ended_at: None,
            summary: None,
        }
    }

    #[test]
    fn open_session_returns_the_unended_row() {
        let store = Store::open_in_memory().unwrap();
        let tag = ProjectTag::new("proj1");
        let session = sample("proj1");
        store.create_session(&session).unwrap();

        let open = store.open_session(&tag).unwrap().unwrap();
        assert_eq!(open.id, session.id);
    }

    #[test]
    fn ending_a_session_closes_it() {
        let store = Store::open_in_memory().unwrap();
        let tag = ProjectTag::new("proj1");
        let session = sample("proj1");
        store.create_session(&session).unwrap();

        store.end_session(session.id, Utc::now()).unwrap();
        assert!(store.open_session(&tag).unwrap().is_none());
    }

    #[test]
    fn summary_is_set_at_most_once() {
        let store = Store::open_in_memory().unwrap();
        let session = sample("proj1");
        store.create_session(&session).unwrap();

        store.set_summary(session.id, "first summary").unwrap();
        store.set_summary(session.id, "second summary").unwrap();

        let fetched = store.get_session(session.id).unwrap().unwrap();
        assert_eq!(fetched.summary.as_deref(), Some("first summary"));
    }

    #[test]
    fn recent_closed_sessions_excludes_the_open_one() {
        let store = Store::open_in_memory().unwrap();
        let tag = ProjectTag::new("proj1");

        let closed = sample("proj1");
        store.create_session(&closed).unwrap();
        store.end_session(closed.id, Utc::now()).unwrap();

        let open = sample("proj1");
        store.create_session(&open).unwrap();

        let recent = store.recent_closed_sessions(&tag, 10).unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].id, closed.id);
    }
}
