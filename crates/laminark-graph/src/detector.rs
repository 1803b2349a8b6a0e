use chrono::Utc;
use uuid::Uuid;

use laminark_storage::Store;
use laminark_types::{ContextStash, ProjectTag, ShiftDecisionLogRow, ThresholdHistoryRow};

use crate::Result;

const DEFAULT_EWMA_DISTANCE: f64 = 0.3;
const DEFAULT_EWMA_VARIANCE: f64 = 0.01;
const DEFAULT_ALPHA: f64 = 0.3;
const DEFAULT_SENSITIVITY: f64 = 1.5;
const THRESHOLD_FLOOR: f64 = 0.15;
const THRESHOLD_CEILING: f64 = 0.6;
const SEED_HISTORY_LIMIT: usize = 10;

/// Per-session in-memory state for the topic-shift detector (§4.6).
#[derive(Debug, Clone)]
pub struct DetectorState {
    pub last_embedding: Option<Vec<f32>>,
    pub ewma_distance: f64,
    pub ewma_variance: f64,
    pub observation_count: u32,
    pub alpha: f64,
    pub sensitivity: f64,
}

impl Default for DetectorState {
    fn default() -> Self {
        Self {
            last_embedding: None,
            ewma_distance: DEFAULT_EWMA_DISTANCE,
            ewma_variance: DEFAULT_EWMA_VARIANCE,
            observation_count: 0,
            alpha: DEFAULT_ALPHA,
            sensitivity: DEFAULT_SENSITIVITY,
        }
    }
}

impl DetectorState {
    /// Seed a fresh session's state by averaging up to the last 10 closed
    /// sessions' final EWMA values for this project (§4.6). Falls back to
    /// the hard-coded defaults when there is no prior history.
    pub fn seeded(store: &Store, project_tag: &ProjectTag, alpha: f64, sensitivity: f64) -> Result<Self> {
        let history = store.recent_threshold_history(project_tag, SEED_HISTORY_LIMIT)?;
        if history.is_empty() {
            return Ok(Self { alpha, sensitivity, ..Self::default() });
        }

        let n = history.len() as f64;
        let ewma_distance = history.iter().map(|row| row.final_ewma_distance).sum::<f64>() / n;
        let ewma_variance = history.iter().map(|row| row.final_ewma_variance).sum::<f64>() / n;

        Ok(Self { last_embedding: None, ewma_distance, ewma_variance, observation_count: 0, alpha, sensitivity })
    }
}

/// Result of feeding one embedding through the detector.
#[derive(Debug, Clone, PartialEq)]
pub struct ShiftDecision {
    pub distance: f64,
    pub threshold: f64,
    pub shifted: bool,
    pub confidence: f64,
}

fn cosine_distance(a: &[f32], b: &[f32]) -> f64 {
    let dot: f64 = a.iter().zip(b).map(|(x, y)| (*x as f64) * (*y as f64)).sum();
    let norm_a: f64 = a.iter().map(|x| (*x as f64).powi(2)).sum::<f64>().sqrt();
    let norm_b: f64 = b.iter().map(|x| (*x as f64).powi(2)).sum::<f64>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    1.0 - (dot / (norm_a * norm_b))
}

fn clamp(value: f64, min: f64, max: f64) -> f64 {
    value.max(min).min(max)
}

/// Feed one newly embedded observation through the detector (§4.6 steps
/// 1-4). Mutates `state` in place; returns the decision for that embedding.
pub fn observe(state: &mut DetectorState, embedding: &[f32]) -> ShiftDecision {
    let Some(last) = state.last_embedding.clone() else {
        state.last_embedding = Some(embedding.to_vec());
        return ShiftDecision { distance: 0.0, threshold: 0.0, shifted: false, confidence: 0.0 };
    };

    let distance = cosine_distance(embedding, &last);
    let threshold = clamp(
        state.ewma_distance + state.sensitivity * state.ewma_variance.sqrt(),
        THRESHOLD_FLOOR,
        THRESHOLD_CEILING,
    );
    let shifted = distance > threshold;
    let confidence = if shifted { clamp((distance - threshold) / threshold, 0.0, 1.0) } else { 0.0 };

    let new_ewma = state.alpha * distance + (1.0 - state.alpha) * state.ewma_distance;
    let new_variance =
        state.alpha * (distance - new_ewma).powi(2) + (1.0 - state.alpha) * state.ewma_variance;

    state.ewma_distance = new_ewma;
    state.ewma_variance = new_variance;
    state.observation_count += 1;
    state.last_embedding = Some(embedding.to_vec());

    ShiftDecision { distance, threshold, shifted, confidence }
}

/// Record a shift decision (§4.6 step 6), optionally creating a context
/// stash first when `decision.shifted` (§4.6 step 5).
pub fn record_decision(
    store: &Store,
    project_tag: &ProjectTag,
    session_id: Uuid,
    observation_id: Option<Uuid>,
    state: &DetectorState,
    decision: &ShiftDecision,
    stash_summary: impl FnOnce() -> String,
) -> Result<Option<Uuid>> {
    let stash_id = if decision.shifted {
        let stash = ContextStash {
            id: Uuid::new_v4(),
            session_id,
            created_at: Utc::now(),
            summary: stash_summary(),
        };
        store.create_stash(&stash)?;
        Some(stash.id)
    } else {
        None
    };

    let row = ShiftDecisionLogRow {
        id: Uuid::new_v4(),
        project_tag: project_tag.clone(),
        session_id,
        observation_id,
        distance: decision.distance,
        threshold: decision.threshold,
        ewma_distance: state.ewma_distance,
        ewma_variance: state.ewma_variance,
        sensitivity_multiplier: state.sensitivity,
        shifted: decision.shifted,
        confidence: decision.confidence,
        stash_id,
        created_at: Utc::now(),
    };
    store.append_shift_decision(&row)?;

    Ok(stash_id)
}

/// Append the session's final state to threshold history (§4.6 step 7),
/// called on session end.
pub fn record_session_end(
    store: &Store,
    project_tag: &ProjectTag,
    session_id: Uuid,
    state: &DetectorState,
) -> Result<()> {
    let row = ThresholdHistoryRow {
        project_tag: project_tag.clone(),
        session_id,
        final_ewma_distance: state.ewma_distance,
        final_ewma_variance: state.ewma_variance,
        observation_count: state.observation_count,
        created_at: Utc::now(),
    };
    store.append_threshold_history(&row)?;
    Ok(())
}
