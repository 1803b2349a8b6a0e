use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use laminark_clients::{EmbeddingPort, LlmPort};
use laminark_core::DetectorConfig;
use laminark_graph::PathTracker;
use laminark_storage::Store;
use laminark_types::ProjectTag;

use crate::processor;

const DEFAULT_BATCH_SIZE: usize = 20;

/// A cancellable background timer loop (§5: "the server can stop C4 and C8
/// at any instant; their loops observe a cancellation flag between
/// observations and after each step"). Each loop owns its own `Store`
/// connection; nothing is shared across the thread boundary except the
/// cancellation flag and, for C4, the LLM and embedding ports.
pub struct Worker {
    cancel: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl Worker {
    /// Starts the C4 processor loop: every `interval`, drain up to
    /// `batch_size` unclassified observations for `project_tag`. Each
    /// persisted observation with an embedding is also run through the C6
    /// topic-shift detector in the same pass (§4.6), with one `DetectorState`
    /// kept per session for the life of this loop.
    pub fn spawn_processor(
        db_path: PathBuf,
        project_tag: ProjectTag,
        llm: Arc<dyn LlmPort>,
        embedder: Arc<dyn EmbeddingPort>,
        detector_config: DetectorConfig,
        interval: Duration,
    ) -> Self {
        let cancel = Arc::new(AtomicBool::new(false));
        let loop_cancel = cancel.clone();
        let handle = std::thread::Builder::new()
            .name("laminark-processor".to_string())
            .spawn(move || {
                let store = match Store::open(&db_path) {
                    Ok(store) => store,
                    Err(err) => {
                        tracing::error!(error = %err, "processor worker: failed to open store, exiting");
                        return;
                    }
                };
                let mut tracker = match PathTracker::load(&store, project_tag.clone()) {
                    Ok(tracker) => tracker,
                    Err(err) => {
                        tracing::error!(error = %err, "processor worker: failed to load path tracker, exiting");
                        return;
                    }
                };
                let mut detectors = HashMap::new();

                while !loop_cancel.load(Ordering::SeqCst) {
                    match processor::run_batch(
                        &store,
                        llm.as_ref(),
                        embedder.as_ref(),
                        &mut tracker,
                        &mut detectors,
                        &detector_config,
                        &project_tag,
                        DEFAULT_BATCH_SIZE,
                    ) {
                        Ok(outcomes) if !outcomes.is_empty() => {
                            tracing::debug!(count = outcomes.len(), "processor worker: batch processed");
                        }
                        Ok(_) => {}
                        Err(err) => tracing::warn!(error = %err, "processor worker: batch failed"),
                    }
                    park_or_cancel(&loop_cancel, interval);
                }
            })
            .expect("spawning the processor worker thread");

        Self { cancel, handle: Some(handle) }
    }

    /// Starts the C8 curation loop: every `interval`, run one curation pass.
    pub fn spawn_curation(db_path: PathBuf, project_tag: ProjectTag, interval: Duration) -> Self {
        let cancel = Arc::new(AtomicBool::new(false));
        let loop_cancel = cancel.clone();
        let handle = std::thread::Builder::new()
            .name("laminark-curation".to_string())
            .spawn(move || {
                let mut store = match Store::open(&db_path) {
                    Ok(store) => store,
                    Err(err) => {
                        tracing::error!(error = %err, "curation worker: failed to open store, exiting");
                        return;
                    }
                };

                while !loop_cancel.load(Ordering::SeqCst) {
                    let report = crate::curation::run_once(&mut store, &project_tag);
                    tracing::debug!(
                        merged = report.observations_merged,
                        deduped = report.entities_deduplicated,
                        flagged = report.staleness_flags_added,
                        pruned = report.low_value_pruned,
                        decayed = report.edges_decayed,
                        deleted = report.edges_deleted,
                        "curation worker: pass complete"
                    );
                    park_or_cancel(&loop_cancel, interval);
                }
            })
            .expect("spawning the curation worker thread");

        Self { cancel, handle: Some(handle) }
    }

    /// Signals the loop to stop after its current step and blocks until it exits.
    pub fn stop(mut self) {
        self.cancel.store(true, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        self.cancel.store(true, Ordering::SeqCst);
    }
}

/// Sleeps in short slices so a stop signal is observed promptly instead of
/// waiting out the full interval.
fn park_or_cancel(cancel: &AtomicBool, interval: Duration) {
    const SLICE: Duration = Duration::from_millis(200);
    let mut remaining = interval;
    while remaining > Duration::ZERO && !cancel.load(Ordering::SeqCst) {
        let slice = remaining.min(SLICE);
        std::thread::sleep(slice);
        remaining = remaining.saturating_sub(slice);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use laminark_clients::Error as ClientError;

    struct NoopLlm;
    impl LlmPort for NoopLlm {
        fn complete(&self, _system: &str, _user: &str) -> std::result::Result<String, ClientError> {
            Ok(r#"{"signal": "noise", "classification": null, "reason": "quiet"}"#.into())
        }
    }

    struct NoopEmbedder;
    impl EmbeddingPort for NoopEmbedder {
        fn embed(&self, _text: &str) -> std::result::Result<Vec<f32>, ClientError> {
            Ok(vec![0.0])
        }
    }

    #[test]
    fn processor_worker_starts_and_stops_cleanly() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("laminark.sqlite3");
        Store::open(&db_path).unwrap();

        let worker = Worker::spawn_processor(
            db_path,
            ProjectTag::new("proj"),
            Arc::new(NoopLlm),
            Arc::new(NoopEmbedder),
            DetectorConfig::default(),
            Duration::from_millis(50),
        );
        std::thread::sleep(Duration::from_millis(120));
        worker.stop();
    }

    #[test]
    fn curation_worker_starts_and_stops_cleanly() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("laminark.sqlite3");
        Store::open(&db_path).unwrap();

        let worker = Worker::spawn_curation(db_path, ProjectTag::new("proj"), Duration::from_millis(50));
        std::thread::sleep(Duration::from_millis(120));
        worker.stop();
    }
}
