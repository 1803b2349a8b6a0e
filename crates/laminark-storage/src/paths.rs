use chrono::Utc;
use laminark_types::{DebugPath, PathState, ProjectTag, Waypoint, WaypointType, MAX_WAYPOINTS};
use rusqlite::{params, OptionalExtension};
use uuid::Uuid;

use crate::codec::*;
use crate::store::Store;
use crate::Result;

fn load_waypoints(store: &Store, path_id: Uuid) -> Result<Vec<Waypoint>> {
    let mut stmt = store.conn.prepare(
        "SELECT waypoint_type, summary, observation_id, recorded_at FROM debug_waypoints WHERE path_id = ?1 ORDER BY recorded_at ASC, id ASC",
    )?;
    let rows = stmt
        .query_map([path_id.to_string()], |row| {
            let waypoint_type: String = row.get(0)?;
            let summary: String = row.get(1)?;
            let observation_id: Option<String> = row.get(2)?;
            let recorded_at: String = row.get(3)?;
            Ok((waypoint_type, summary, observation_id, recorded_at))
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    rows.into_iter()
        .map(|(waypoint_type, summary, observation_id, recorded_at)| {
            Ok(Waypoint {
                waypoint_type: match waypoint_type.as_str() {
                    "error" => WaypointType::Error,
                    "dead_end" => WaypointType::DeadEnd,
                    _ => WaypointType::Note,
                },
                summary,
                observation_id: observation_id.and_then(|s| uuid_from_str(&s).ok()),
                recorded_at: ts_from_str(&recorded_at)?,
            })
        })
        .collect()
}

impl Store {
    pub fn create_path(&self, path: &DebugPath) -> Result<()> {
        self.conn.execute(
            "INSERT INTO debug_paths (id, project_tag, state, opened_at, resolved_at) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                path.id.to_string(),
                path.project_tag.as_str(),
                path.state.as_str(),
                ts_to_string(path.opened_at),
                path.resolved_at.map(ts_to_string),
            ],
        )?;
        for waypoint in &path.waypoints {
            self.insert_waypoint(path.id, waypoint)?;
        }
        Ok(())
    }

    pub fn get_path(&self, id: Uuid) -> Result<Option<DebugPath>> {
        let row: Option<(String, String, String, Option<String>)> = self
            .conn
            .query_row(
                "SELECT project_tag, state, opened_at, resolved_at FROM debug_paths WHERE id = ?1",
                [id.to_string()],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
            )
            .optional()?;

        let Some((project_tag, state, opened_at, resolved_at)) = row else {
            return Ok(None);
        };

        Ok(Some(DebugPath {
            id,
            project_tag: ProjectTag::new(project_tag),
            state: state.parse().unwrap_or(PathState::Idle),
            opened_at: ts_from_str(&opened_at)?,
            resolved_at: opt_ts_from_str(resolved_at)?,
            waypoints: load_waypoints(self, id)?,
        }))
    }

    /// The one path currently `active` for this project, if any. Used to
    /// rehydrate in-memory state on process restart (§4.7).
    pub fn active_path(&self, project_tag: &ProjectTag) -> Result<Option<DebugPath>> {
        let id: Option<String> = self
            .conn
            .query_row(
                "SELECT id FROM debug_paths WHERE project_tag = ?1 AND state = 'active' LIMIT 1",
                [project_tag.as_str()],
                |row| row.get(0),
            )
            .optional()?;
        match id {
            Some(id) => self.get_path(uuid_from_str(&id)?),
            None => Ok(None),
        }
    }

    /// Append a waypoint if under the cap. Returns `false` (and does not
    /// insert) once the path already holds [`MAX_WAYPOINTS`] entries — the
    /// caller is responsible for transitioning the path to `resolved` with
    /// reason "waypoint-cap" in that case (§4.7).
    pub fn append_waypoint(&self, path_id: Uuid, waypoint: &Waypoint) -> Result<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM debug_waypoints WHERE path_id = ?1",
            [path_id.to_string()],
            |row| row.get(0),
        )?;
        if count as usize >= MAX_WAYPOINTS {
            return Ok(false);
        }
        self.insert_waypoint(path_id, waypoint)?;
        Ok(true)
    }

    fn insert_waypoint(&self, path_id: Uuid, waypoint: &Waypoint) -> Result<()> {
        let type_str = match waypoint.waypoint_type {
            WaypointType::Error => "error",
            WaypointType::DeadEnd => "dead_end",
            WaypointType::Note => "note",
        };
        self.conn.execute(
            "INSERT INTO debug_waypoints (path_id, waypoint_type, summary, observation_id, recorded_at) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                path_id.to_string(),
                type_str,
                waypoint.summary,
                waypoint.observation_id.map(|id| id.to_string()),
                ts_to_string(waypoint.recorded_at),
            ],
        )?;
        Ok(())
    }

    pub fn transition_path(&self, id: Uuid, state: PathState, resolved_at: Option<chrono::DateTime<Utc>>) -> Result<()> {
        self.conn.execute(
            "UPDATE debug_paths SET state = ?1, resolved_at = ?2 WHERE id = ?3",
            params![state.as_str(), resolved_at.map(ts_to_string), id.to_string()],
        )?;
        Ok(())
    }
}
