use std::collections::VecDeque;

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use laminark_storage::Store;
use laminark_types::{DebugPath, DebugSignal, PathState, ProjectTag, Waypoint, WaypointType};

use crate::Result;

const ERROR_WINDOW_MINUTES: i64 = 5;
const ACTIVATION_THRESHOLD: usize = 3;
const RESOLUTION_STREAK_THRESHOLD: u32 = 3;
const WAYPOINT_SUMMARY_MAX: usize = 200;

/// Outcome of feeding one debug signal through the tracker, for callers that
/// want to log or react (e.g. surface the newly active path in context
/// injection).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathOutcome {
    /// Signal ignored (not an error, and no path currently active).
    Idle,
    /// Buffered toward activation but threshold not yet reached.
    Buffering { buffered: usize },
    /// Buffer reached the activation threshold; a new active path was created.
    Activated(Uuid),
    /// A waypoint was appended to the active path.
    WaypointAppended(Uuid),
    /// The path hit the waypoint cap and was force-resolved.
    ResolvedWaypointCap(Uuid),
    /// Three consecutive resolution signals closed the path normally.
    Resolved(Uuid),
}

struct BufferedError {
    observed_at: DateTime<Utc>,
    hint: Option<String>,
    observation_id: Option<Uuid>,
}

/// Singleton per-project state machine (§4.7): idle → potential → active →
/// resolved. Buffering happens purely in memory; a `DebugPath` row is only
/// created once the buffer reaches the activation threshold.
pub struct PathTracker {
    project_tag: ProjectTag,
    error_buffer: VecDeque<BufferedError>,
    active_path_id: Option<Uuid>,
    consecutive_resolutions: u32,
}

impl PathTracker {
    /// Rehydrate from storage: if a path is already `active` for this
    /// project, pick it back up (§4.7 — survives process restart).
    pub fn load(store: &Store, project_tag: ProjectTag) -> Result<Self> {
        let active_path_id = store.active_path(&project_tag)?.map(|path| path.id);
        Ok(Self { project_tag, error_buffer: VecDeque::new(), active_path_id, consecutive_resolutions: 0 })
    }

    fn prune_buffer(&mut self, now: DateTime<Utc>) {
        let cutoff = now - Duration::minutes(ERROR_WINDOW_MINUTES);
        while let Some(front) = self.error_buffer.front() {
            if front.observed_at < cutoff {
                self.error_buffer.pop_front();
            } else {
                break;
            }
        }
    }

    fn waypoint_type(signal: &DebugSignal) -> WaypointType {
        if signal.is_error {
            WaypointType::Error
        } else if signal.waypoint_hint.is_some() {
            WaypointType::DeadEnd
        } else {
            WaypointType::Note
        }
    }

    fn summary(signal: &DebugSignal, content: &str) -> String {
        let text = signal.waypoint_hint.clone().unwrap_or_else(|| content.to_string());
        text.chars().take(WAYPOINT_SUMMARY_MAX).collect()
    }

    /// Process one observation's debug signal (§4.7). `content` is the
    /// observation text, used for the waypoint summary when the signal
    /// carries no explicit hint.
    pub fn handle_signal(
        &mut self,
        store: &Store,
        observation_id: Option<Uuid>,
        content: &str,
        signal: &DebugSignal,
    ) -> Result<PathOutcome> {
        let now = Utc::now();

        if let Some(path_id) = self.active_path_id {
            return self.handle_active_signal(store, path_id, observation_id, content, signal, now);
        }

        if !signal.is_error {
            return Ok(PathOutcome::Idle);
        }

        self.prune_buffer(now);
        self.error_buffer.push_back(BufferedError {
            observed_at: now,
            hint: signal.waypoint_hint.clone(),
            observation_id,
        });

        if self.error_buffer.len() < ACTIVATION_THRESHOLD {
            return Ok(PathOutcome::Buffering { buffered: self.error_buffer.len() });
        }

        let waypoints: Vec<Waypoint> = self
            .error_buffer
            .drain(..)
            .map(|buffered| Waypoint {
                waypoint_type: WaypointType::Error,
                summary: buffered
                    .hint
                    .unwrap_or_else(|| content.to_string())
                    .chars()
                    .take(WAYPOINT_SUMMARY_MAX)
                    .collect(),
                observation_id: buffered.observation_id,
                recorded_at: buffered.observed_at,
            })
            .collect();

        let path = DebugPath {
            id: Uuid::new_v4(),
            project_tag: self.project_tag.clone(),
            state: PathState::Active,
            opened_at: now,
            resolved_at: None,
            waypoints,
        };
        store.create_path(&path)?;
        self.active_path_id = Some(path.id);
        self.consecutive_resolutions = 0;

        Ok(PathOutcome::Activated(path.id))
    }

    fn handle_active_signal(
        &mut self,
        store: &Store,
        path_id: Uuid,
        observation_id: Option<Uuid>,
        content: &str,
        signal: &DebugSignal,
        now: DateTime<Utc>,
    ) -> Result<PathOutcome> {
        if signal.is_resolution {
            self.consecutive_resolutions += 1;
        } else {
            self.consecutive_resolutions = 0;
        }

        let waypoint = Waypoint {
            waypoint_type: Self::waypoint_type(signal),
            summary: Self::summary(signal, content),
            observation_id,
            recorded_at: now,
        };

        if self.consecutive_resolutions >= RESOLUTION_STREAK_THRESHOLD {
            store.transition_path(path_id, PathState::Resolved, Some(now))?;
            self.active_path_id = None;
            self.consecutive_resolutions = 0;
            return Ok(PathOutcome::Resolved(path_id));
        }

        if store.append_waypoint(path_id, &waypoint)? {
            Ok(PathOutcome::WaypointAppended(path_id))
        } else {
            store.transition_path(path_id, PathState::Resolved, Some(now))?;
            self.active_path_id = None;
            self.consecutive_resolutions = 0;
            Ok(PathOutcome::ResolvedWaypointCap(path_id))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn error_signal() -> DebugSignal {
        DebugSignal { is_error: true, is_resolution: false, waypoint_hint: None, confidence: 0.9 }
    }

    fn resolution_signal() -> DebugSignal {
        DebugSignal { is_error: false, is_resolution: true, waypoint_hint: None, confidence: 0.9 }
    }

    #[test]
    fn three_errors_activate_a_path_with_initial_waypoints() {
        let store = Store::open_in_memory().unwrap();
        let project_tag = ProjectTag::new("proj");
        let mut tracker = PathTracker::load(&store, project_tag.clone()).unwrap();

        assert_eq!(
            tracker.handle_signal(&store, None, "err1", &error_signal()).unwrap(),
            PathOutcome::Buffering { buffered: 1 }
        );
        assert_eq!(
            tracker.handle_signal(&store, None, "err2", &error_signal()).unwrap(),
            PathOutcome::Buffering { buffered: 2 }
        );
        let outcome = tracker.handle_signal(&store, None, "err3", &error_signal()).unwrap();
        let PathOutcome::Activated(path_id) = outcome else { panic!("expected activation") };

        let path = store.get_path(path_id).unwrap().unwrap();
        assert_eq!(path.state, PathState::Active);
        assert_eq!(path.waypoints.len(), 3);
    }

    #[test]
    fn non_error_signals_are_idle_before_activation() {
        let store = Store::open_in_memory().unwrap();
        let project_tag = ProjectTag::new("proj");
        let mut tracker = PathTracker::load(&store, project_tag).unwrap();
        let signal = DebugSignal { is_error: false, is_resolution: false, waypoint_hint: None, confidence: 0.1 };
        assert_eq!(tracker.handle_signal(&store, None, "noop", &signal).unwrap(), PathOutcome::Idle);
    }

    #[test]
    fn three_consecutive_resolutions_close_the_path() {
        let store = Store::open_in_memory().unwrap();
        let project_tag = ProjectTag::new("proj");
        let mut tracker = PathTracker::load(&store, project_tag).unwrap();

        for i in 0..3 {
            tracker.handle_signal(&store, None, &format!("err{i}"), &error_signal()).unwrap();
        }

        tracker.handle_signal(&store, None, "fix1", &resolution_signal()).unwrap();
        tracker.handle_signal(&store, None, "fix2", &resolution_signal()).unwrap();
        let outcome = tracker.handle_signal(&store, None, "fix3", &resolution_signal()).unwrap();
        let PathOutcome::Resolved(path_id) = outcome else { panic!("expected resolution") };

        let path = store.get_path(path_id).unwrap().unwrap();
        assert_eq!(path.state, PathState::Resolved);
        assert!(path.resolved_at.is_some());
    }

    #[test]
    fn a_non_resolution_signal_resets_the_streak() {
        let store = Store::open_in_memory().unwrap();
        let project_tag = ProjectTag::new("proj");
        let mut tracker = PathTracker::load(&store, project_tag).unwrap();

        for i in 0..3 {
            tracker.handle_signal(&store, None, &format!("err{i}"), &error_signal()).unwrap();
        }

        tracker.handle_signal(&store, None, "fix1", &resolution_signal()).unwrap();
        tracker.handle_signal(&store, None, "fix2", &resolution_signal()).unwrap();
        // breaks the streak
        tracker.handle_signal(&store, None, "note", &error_signal()).unwrap();
        let outcome = tracker.handle_signal(&store, None, "fix3", &resolution_signal()).unwrap();
        assert!(matches!(outcome, PathOutcome::WaypointAppended(_)));
    }

    #[test]
    fn waypoint_cap_force_resolves_the_path() {
        let store = Store::open_in_memory().unwrap();
        let project_tag = ProjectTag::new("proj");
        let mut tracker = PathTracker::load(&store, project_tag).unwrap();

        for i in 0..3 {
            tracker.handle_signal(&store, None, &format!("err{i}"), &error_signal()).unwrap();
        }

        // 27 more non-resolving waypoints bring the total to the 30 cap.
        for i in 0..27 {
            let signal = DebugSignal {
                is_error: true,
                is_resolution: false,
                waypoint_hint: Some(format!("hint{i}")),
                confidence: 0.5,
            };
            let outcome = tracker.handle_signal(&store, None, "note", &signal).unwrap();
            assert!(matches!(outcome, PathOutcome::WaypointAppended(_)));
        }

        let signal = error_signal();
        let outcome = tracker.handle_signal(&store, None, "overflow", &signal).unwrap();
        let PathOutcome::ResolvedWaypointCap(path_id) = outcome else { panic!("expected cap resolution") };
        let path = store.get_path(path_id).unwrap().unwrap();
        assert_eq!(path.state, PathState::Resolved);
        assert_eq!(path.waypoints.len(), 30);
    }

    #[test]
    fn loading_rehydrates_an_existing_active_path() {
        let store = Store::open_in_memory().unwrap();
        let project_tag = ProjectTag::new("proj");

        let path = DebugPath {
            id: Uuid::new_v4(),
            project_tag: project_tag.clone(),
            state: PathState::Active,
            opened_at: Utc::now(),
            resolved_at: None,
            waypoints: vec![],
        };
        store.create_path(&path).unwrap();

        let tracker = PathTracker::load(&store, project_tag).unwrap();
        assert_eq!(tracker.active_path_id, Some(path.id));
    }
}
