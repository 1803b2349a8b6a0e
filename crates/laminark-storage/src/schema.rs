use rusqlite::Connection;

use crate::Result;

/// One forward-only, idempotent migration step.
pub struct Migration {
    pub version: i32,
    pub description: &'static str,
    pub up: &'static str,
}

/// The full migration ledger, in application order. Every statement is
/// written to tolerate re-application (`CREATE TABLE IF NOT EXISTS`,
/// `CREATE INDEX IF NOT EXISTS`) since a short-lived hook process and a
/// long-lived worker may both call `init_schema` against the same file.
pub const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        description: "observations, sessions",
        up: r#"
        CREATE TABLE IF NOT EXISTS sessions (
            id TEXT PRIMARY KEY,
            project_tag TEXT NOT NULL,
            started_at TEXT NOT NULL,
            ended_at TEXT,
            summary TEXT
        );
        CREATE INDEX IF NOT EXISTS idx_sessions_project ON sessions(project_tag);
        CREATE INDEX IF NOT EXISTS idx_sessions_open ON sessions(project_tag, ended_at);

        CREATE TABLE IF NOT EXISTS observations (
            id TEXT PRIMARY KEY,
            project_tag TEXT NOT NULL,
            session_id TEXT,
            content TEXT NOT NULL,
            title TEXT,
            source TEXT NOT NULL,
            kind TEXT NOT NULL,
            classification TEXT,
            classified_at TEXT,
            embedding BLOB,
            embedding_model TEXT,
            embedding_version TEXT,
            embedding_dimensions INTEGER,
            content_digest TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            deleted_at TEXT
        );
        CREATE INDEX IF NOT EXISTS idx_observations_project ON observations(project_tag);
        CREATE INDEX IF NOT EXISTS idx_observations_session ON observations(session_id);
        CREATE INDEX IF NOT EXISTS idx_observations_unclassified
            ON observations(project_tag, classification, deleted_at, created_at);
        CREATE UNIQUE INDEX IF NOT EXISTS idx_observations_digest
            ON observations(project_tag, content_digest)
            WHERE deleted_at IS NULL;
        "#,
    },
    Migration {
        version: 2,
        description: "graph nodes and edges",
        up: r#"
        CREATE TABLE IF NOT EXISTS graph_nodes (
            id TEXT PRIMARY KEY,
            project_tag TEXT NOT NULL,
            node_type TEXT NOT NULL,
            name TEXT NOT NULL,
            normalized_name TEXT NOT NULL,
            metadata TEXT NOT NULL,
            observation_ids TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );
        CREATE UNIQUE INDEX IF NOT EXISTS idx_graph_nodes_identity
            ON graph_nodes(project_tag, node_type, normalized_name);

        CREATE TABLE IF NOT EXISTS graph_edges (
            id TEXT PRIMARY KEY,
            source_node_id TEXT NOT NULL,
            target_node_id TEXT NOT NULL,
            edge_type TEXT NOT NULL,
            weight REAL NOT NULL,
            metadata TEXT NOT NULL,
            created_at TEXT NOT NULL,
            FOREIGN KEY (source_node_id) REFERENCES graph_nodes(id),
            FOREIGN KEY (target_node_id) REFERENCES graph_nodes(id)
        );
        CREATE UNIQUE INDEX IF NOT EXISTS idx_graph_edges_identity
            ON graph_edges(source_node_id, target_node_id, edge_type);
        CREATE INDEX IF NOT EXISTS idx_graph_edges_source ON graph_edges(source_node_id);
        CREATE INDEX IF NOT EXISTS idx_graph_edges_target ON graph_edges(target_node_id);
        "#,
    },
    Migration {
        version: 3,
        description: "context stashes and threshold history",
        up: r#"
        CREATE TABLE IF NOT EXISTS context_stashes (
            id TEXT PRIMARY KEY,
            session_id TEXT NOT NULL,
            created_at TEXT NOT NULL,
            summary TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_stashes_session ON context_stashes(session_id);

        CREATE TABLE IF NOT EXISTS threshold_history (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            project_tag TEXT NOT NULL,
            session_id TEXT NOT NULL,
            final_ewma_distance REAL NOT NULL,
            final_ewma_variance REAL NOT NULL,
            observation_count INTEGER NOT NULL,
            created_at TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_threshold_history_project
            ON threshold_history(project_tag, created_at DESC);
        "#,
    },
    Migration {
        version: 4,
        description: "shift decision log and staleness flags",
        up: r#"
        CREATE TABLE IF NOT EXISTS shift_decision_log (
            id TEXT PRIMARY KEY,
            project_tag TEXT NOT NULL,
            session_id TEXT NOT NULL,
            observation_id TEXT,
            distance REAL NOT NULL,
            threshold REAL NOT NULL,
            ewma_distance REAL NOT NULL,
            ewma_variance REAL NOT NULL,
            sensitivity_multiplier REAL NOT NULL,
            shifted INTEGER NOT NULL,
            confidence REAL NOT NULL,
            stash_id TEXT,
            created_at TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_shift_log_session ON shift_decision_log(session_id);

        CREATE TABLE IF NOT EXISTS staleness_flags (
            observation_id TEXT NOT NULL,
            reason TEXT NOT NULL,
            resolved INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL
        );
        CREATE UNIQUE INDEX IF NOT EXISTS idx_staleness_open
            ON staleness_flags(observation_id)
            WHERE resolved = 0;
        "#,
    },
    Migration {
        version: 5,
        description: "debug paths and waypoints",
        up: r#"
        CREATE TABLE IF NOT EXISTS debug_paths (
            id TEXT PRIMARY KEY,
            project_tag TEXT NOT NULL,
            state TEXT NOT NULL,
            opened_at TEXT NOT NULL,
            resolved_at TEXT
        );
        CREATE INDEX IF NOT EXISTS idx_debug_paths_project_state
            ON debug_paths(project_tag, state);

        CREATE TABLE IF NOT EXISTS debug_waypoints (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            path_id TEXT NOT NULL,
            waypoint_type TEXT NOT NULL,
            summary TEXT NOT NULL,
            observation_id TEXT,
            recorded_at TEXT NOT NULL,
            FOREIGN KEY (path_id) REFERENCES debug_paths(id)
        );
        CREATE INDEX IF NOT EXISTS idx_debug_waypoints_path ON debug_waypoints(path_id, recorded_at);
        "#,
    },
];

/// Apply every migration whose version is greater than the store's current
/// `schema_version`, each inside its own transaction, in order.
pub fn run_migrations(conn: &mut Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (id INTEGER PRIMARY KEY CHECK (id = 1), version INTEGER NOT NULL);
         INSERT OR IGNORE INTO schema_version (id, version) VALUES (1, 0);",
    )?;

    let current: i32 =
        conn.query_row("SELECT version FROM schema_version WHERE id = 1", [], |row| row.get(0))?;

    for migration in MIGRATIONS {
        if migration.version <= current {
            continue;
        }
        let tx = conn.transaction()?;
        tx.execute_batch(migration.up)?;
        tx.execute(
            "UPDATE schema_version SET version = ?1 WHERE id = 1",
            [migration.version],
        )?;
        tx.commit()?;
    }

    Ok(())
}

/// The schema version currently recorded in an already-migrated connection.
pub fn schema_version(conn: &Connection) -> Result<i32> {
    Ok(conn.query_row("SELECT version FROM schema_version WHERE id = 1", [], |row| row.get(0))?)
}
