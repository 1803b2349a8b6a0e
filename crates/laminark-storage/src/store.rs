use rusqlite::Connection;
use std::path::Path;

use crate::schema::{run_migrations, schema_version, MIGRATIONS};
use crate::Result;

/// The embedded SQL store. One `Store` wraps one SQLite connection opened
/// in WAL mode so a long-lived background worker and short-lived hook
/// subprocesses can open the same file concurrently (§4.1: "one writer,
/// many concurrent readers").
pub struct Store {
    pub(crate) conn: Connection,
}

/// A snapshot of the store's health, for `laminark doctor` (§8).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthReport {
    pub schema_version: i32,
    pub latest_known_version: i32,
    pub journal_mode: String,
}

impl HealthReport {
    pub fn is_current(&self) -> bool {
        self.schema_version == self.latest_known_version
    }
}

impl Store {
    pub fn open(db_path: &Path) -> Result<Self> {
        let conn = Connection::open(db_path)?;
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::from_connection(conn)
    }

    fn from_connection(mut conn: Connection) -> Result<Self> {
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "busy_timeout", 5000)?;
        conn.pragma_update(None, "foreign_keys", true)?;
        run_migrations(&mut conn)?;
        Ok(Self { conn })
    }

    /// Reclaim free pages. Intended for an out-of-band maintenance path, not
    /// the hot request path.
    pub fn vacuum(&self) -> Result<()> {
        self.conn.execute("VACUUM", [])?;
        Ok(())
    }

    /// Schema version and journal mode, for `laminark doctor`.
    pub fn health(&self) -> Result<HealthReport> {
        let mode: String = self.conn.pragma_query_value(None, "journal_mode", |row| row.get(0))?;
        Ok(HealthReport {
            schema_version: schema_version(&self.conn)?,
            latest_known_version: MIGRATIONS.last().map(|m| m.version).unwrap_or(0),
            journal_mode: mode,
        })
    }
}
