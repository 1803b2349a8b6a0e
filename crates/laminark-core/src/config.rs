use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::path::Result;

/// `~/<data-dir>/config.json`, read once per process (§6).
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub privacy: PrivacyConfig,
    #[serde(default)]
    pub processor: ProcessorConfig,
    #[serde(default)]
    pub detector: DetectorConfig,
    #[serde(default)]
    pub curation: CurationConfig,
    #[serde(default)]
    pub llm: LlmConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PrivacyConfig {
    #[serde(default)]
    pub additional_patterns: Vec<AdditionalPattern>,
    #[serde(default)]
    pub excluded_files: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdditionalPattern {
    pub regex: String,
    pub replacement: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessorConfig {
    #[serde(default = "ProcessorConfig::default_interval_ms")]
    pub interval_ms: u64,
    #[serde(default = "ProcessorConfig::default_batch_size")]
    pub batch_size: usize,
}

impl ProcessorConfig {
    fn default_interval_ms() -> u64 {
        2000
    }
    fn default_batch_size() -> usize {
        20
    }
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            interval_ms: Self::default_interval_ms(),
            batch_size: Self::default_batch_size(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectorConfig {
    #[serde(default = "DetectorConfig::default_alpha")]
    pub alpha: f64,
    #[serde(default = "DetectorConfig::default_sensitivity")]
    pub sensitivity: f64,
}

impl DetectorConfig {
    fn default_alpha() -> f64 {
        0.3
    }
    fn default_sensitivity() -> f64 {
        1.5
    }
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            alpha: Self::default_alpha(),
            sensitivity: Self::default_sensitivity(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurationConfig {
    #[serde(default = "CurationConfig::default_interval_ms")]
    pub interval_ms: u64,
}

impl CurationConfig {
    fn default_interval_ms() -> u64 {
        15 * 60 * 1000
    }
}

impl Default for CurationConfig {
    fn default() -> Self {
        Self {
            interval_ms: Self::default_interval_ms(),
        }
    }
}

/// The C10 LLM/embedding port's connection details (§4.10). `api_key` is
/// read from config but an environment variable at the call site always
/// takes priority, so a key never has to sit in a file on disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "LlmConfig::default_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub api_key: Option<String>,
}

impl LlmConfig {
    fn default_base_url() -> String {
        "http://127.0.0.1:4315".to_string()
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self { base_url: Self::default_base_url(), api_key: None }
    }
}

/// Load `config.json` from the data directory. A missing file is not an
/// error — it means every section takes its default (§6, §7: a failed
/// capture must never surface to the user).
pub fn load_config(data_dir: &Path) -> Result<Config> {
    let path = data_dir.join("config.json");
    if !path.exists() {
        return Ok(Config::default());
    }
    let raw = std::fs::read_to_string(&path)?;
    serde_json::from_str(&raw).map_err(|e| {
        crate::path::Error::Config(format!("malformed config at {}: {e}", path.display()))
    })
}
