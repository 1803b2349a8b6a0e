use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;

use laminark_clients::HttpSession;
use laminark_core::Config;
use laminark_runtime::Worker;
use laminark_types::ProjectTag;

const DB_FILE_NAME: &str = "db.sqlite";
const API_KEY_ENV: &str = "LAMINARK_LLM_API_KEY";

/// Starts the C4 processor loop and the C8 curation loop for one project
/// and blocks until the process is killed. Each loop owns its own `Store`
/// connection (§5).
pub fn handle(data_dir: &std::path::Path, config: &Config, project_tag: ProjectTag) -> Result<()> {
    let db_path = data_dir.join(DB_FILE_NAME);
    laminark_storage::Store::open(&db_path)?;

    let api_key = std::env::var(API_KEY_ENV).ok().or_else(|| config.llm.api_key.clone());
    let http = Arc::new(HttpSession::new(config.llm.base_url.clone(), api_key));
    let llm: Arc<dyn laminark_clients::LlmPort> = http.clone();
    let embedder: Arc<dyn laminark_clients::EmbeddingPort> = http;

    let _processor = Worker::spawn_processor(
        db_path.clone(),
        project_tag.clone(),
        llm,
        embedder,
        config.detector.clone(),
        Duration::from_millis(config.processor.interval_ms),
    );
    let _curation = Worker::spawn_curation(db_path, project_tag, Duration::from_millis(config.curation.interval_ms));

    tracing::info!("laminark serve: processor and curation loops running");
    loop {
        std::thread::sleep(Duration::from_secs(60));
    }
}
