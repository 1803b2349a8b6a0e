use chrono::Utc;
use uuid::Uuid;

use laminark_graph::DetectorState;
use laminark_storage::{ObservationFilter, Store};
use laminark_types::{ProjectTag, Session};

use crate::context;
use crate::Result;

const SUMMARY_OBSERVATION_CAP: usize = 1000;

/// SessionStart (§4.3): open a session if one isn't already open, and
/// assemble the token-bounded recovery context to hand back to the host.
pub fn handle_session_start(store: &Store, project_tag: &ProjectTag) -> Result<String> {
    if store.open_session(project_tag)?.is_none() {
        let session = Session {
            id: Uuid::new_v4(),
            project_tag: project_tag.clone(),
            started_at: Utc::now(),
            ended_at: None,
            summary: None,
        };
        store.create_session(&session)?;
    }
    context::assemble_context(store, project_tag)
}

/// SessionEnd (§4.3): close the session and append its final detector state
/// to threshold history (§4.6 step 7). `Stop` (fired after) handles the
/// summary, since it has the last word on what happened in the session.
pub fn handle_session_end(store: &Store, session_id: Uuid) -> Result<()> {
    store.end_session(session_id, Utc::now())?;
    record_final_detector_state(store, session_id)?;
    Ok(())
}

/// The processor loop keeps the live `DetectorState` in memory for the
/// life of its own process, so here we recover the final EWMA values from
/// the last row this session wrote to the shift-decision log instead.
fn record_final_detector_state(store: &Store, session_id: Uuid) -> Result<()> {
    let decisions = store.shift_decisions_for_session(session_id)?;
    let Some(last) = decisions.last() else { return Ok(()) };
    let Some(session) = store.get_session(session_id)? else { return Ok(()) };

    // alpha/sensitivity don't feed into the threshold-history row; only the
    // three fields set below do.
    let state = DetectorState {
        ewma_distance: last.ewma_distance,
        ewma_variance: last.ewma_variance,
        observation_count: decisions.len() as u32,
        ..DetectorState::default()
    };
    laminark_graph::record_session_end(store, &session.project_tag, session_id, &state)?;
    Ok(())
}

/// Stop (§4.3): synthesize and store the session summary. A session with no
/// observations is a no-op — no stdout, no summary write.
pub fn handle_stop(store: &Store, session_id: Uuid) -> Result<()> {
    let Some(session) = store.get_session(session_id)? else {
        return Ok(());
    };
    let filter = ObservationFilter { session_id: Some(session_id), ..Default::default() };
    let observations = store.list_observations(&filter, SUMMARY_OBSERVATION_CAP)?;
    if observations.is_empty() {
        return Ok(());
    }
    let summary = context::summarize_session(&session, &observations);
    store.set_summary(session_id, &summary)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use laminark_types::{ObservationKind, ObservationSource, ShiftDecisionLogRow};

    #[test]
    fn session_end_with_no_shift_decisions_writes_no_threshold_history() {
        let store = Store::open_in_memory().unwrap();
        let project_tag = ProjectTag::new("proj");
        handle_session_start(&store, &project_tag).unwrap();
        let session = store.open_session(&project_tag).unwrap().unwrap();

        handle_session_end(&store, session.id).unwrap();
        assert!(store.recent_threshold_history(&project_tag, 10).unwrap().is_empty());
    }

    #[test]
    fn session_end_carries_the_last_shift_decision_into_threshold_history() {
        let store = Store::open_in_memory().unwrap();
        let project_tag = ProjectTag::new("proj");
        handle_session_start(&store, &project_tag).unwrap();
        let session = store.open_session(&project_tag).unwrap().unwrap();

        store
            .append_shift_decision(&ShiftDecisionLogRow {
                id: Uuid::new_v4(),
                project_tag: project_tag.clone(),
                session_id: session.id,
                observation_id: None,
                distance: 0.4,
                threshold: 0.3,
                ewma_distance: 0.25,
                ewma_variance: 0.02,
                sensitivity_multiplier: 1.5,
                shifted: true,
                confidence: 0.3,
                stash_id: None,
                created_at: Utc::now(),
            })
            .unwrap();

        handle_session_end(&store, session.id).unwrap();

        let history = store.recent_threshold_history(&project_tag, 10).unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].final_ewma_distance, 0.25);
        assert_eq!(history[0].final_ewma_variance, 0.02);
        assert_eq!(history[0].observation_count, 1);
    }

    #[test]
    fn session_start_opens_a_session_when_none_is_open() {
        let store = Store::open_in_memory().unwrap();
        let project_tag = ProjectTag::new("proj");
        let context = handle_session_start(&store, &project_tag).unwrap();
        assert!(!context.is_empty());
        assert!(store.open_session(&project_tag).unwrap().is_some());
    }

    #[test]
    fn session_start_reuses_an_already_open_session() {
        let store = Store::open_in_memory().unwrap();
        let project_tag = ProjectTag::new("proj");
        handle_session_start(&store, &project_tag).unwrap();
        let first = store.open_session(&project_tag).unwrap().unwrap();
        handle_session_start(&store, &project_tag).unwrap();
        let second = store.open_session(&project_tag).unwrap().unwrap();
        assert_eq!(first.id, second.id);
    }

    #[test]
    fn stop_with_no_observations_writes_no_summary() {
        let store = Store::open_in_memory().unwrap();
        let project_tag = ProjectTag::new("proj");
        handle_session_start(&store, &project_tag).unwrap();
        let session = store.open_session(&project_tag).unwrap().unwrap();
        handle_session_end(&store, session.id).unwrap();
        handle_stop(&store, session.id).unwrap();
        let reloaded = store.get_session(session.id).unwrap().unwrap();
        assert!(reloaded.summary.is_none());
    }

    #[test]
    fn stop_with_observations_writes_a_summary() {
        let store = Store::open_in_memory().unwrap();
        let project_tag = ProjectTag::new("proj");
        handle_session_start(&store, &project_tag).unwrap();
        let session = store.open_session(&project_tag).unwrap().unwrap();

        let obs = laminark_types::Observation {
            id: Uuid::new_v4(),
            project_tag: project_tag.clone(),
            session_id: Some(session.id),
            content: "decided to use approach A".to_string(),
            title: None,
            source: ObservationSource::hook("Write"),
            kind: ObservationKind::Decision,
            classification: Some(laminark_types::Classification::Discovery),
            classified_at: None,
            embedding: None,
            embedding_model: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            deleted_at: None,
        };
        store.create_observation(&obs).unwrap();

        handle_session_end(&store, session.id).unwrap();
        handle_stop(&store, session.id).unwrap();
        let reloaded = store.get_session(session.id).unwrap().unwrap();
        assert!(reloaded.summary.is_some());
        assert!(reloaded.summary.unwrap().contains("Observations: 1"));
    }
}
