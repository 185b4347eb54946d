use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct FileConfig {
    // Core settings (can override CLI)
    pub db_path: Option<String>,
    pub base_url: Option<String>,
    pub cron_secret: Option<String>,
    pub timezone: Option<String>,
    pub pid_file: Option<String>,
    pub lock_file: Option<String>,

    // Process settings
    pub health_check_interval_ms: Option<u64>,
    pub shutdown_timeout_ms: Option<u64>,
    pub endpoint_test_timeout_ms: Option<u64>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse config file: {:?}", path))
    }
}
