use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Floor applied to `poll_interval_ms` so a zero interval cannot spin.
pub const MIN_POLL_INTERVAL_MS: u64 = 10;

/// What a tracking session does when a status poll fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PollFailurePolicy {
    /// End the session on the first failed poll.
    #[default]
    StopOnFailure,
    /// Keep polling through transient transport failures, giving up after
    /// `max_retries` consecutive ones. Other failures still end the session.
    RetryTransient { max_retries: u32 },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_max_jobs")]
    pub max_jobs: usize,
    #[serde(default = "default_broadcast_capacity")]
    pub broadcast_capacity: usize,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default)]
    pub poll_failure_policy: PollFailurePolicy,
}

fn default_base_url() -> String {
    "http://127.0.0.1:8080".to_string()
}

fn default_poll_interval_ms() -> u64 {
    1500
}

fn default_max_jobs() -> usize {
    10
}

fn default_broadcast_capacity() -> usize {
    256
}

fn default_request_timeout_secs() -> u64 {
    30
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            poll_interval_ms: default_poll_interval_ms(),
            max_jobs: default_max_jobs(),
            broadcast_capacity: default_broadcast_capacity(),
            request_timeout_secs: default_request_timeout_secs(),
            poll_failure_policy: PollFailurePolicy::default(),
        }
    }
}

impl ClientConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(MIN_POLL_INTERVAL_MS))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Load the ClientConfig using this resolution order:
///   1. explicit path (the `--config` flag)
///   2. `VPC_CONFIG_DIR/config.json`
///   3. platform config dir (`dirs::config_dir()/virtual-presenter-client/config.json`)
///   4. `ClientConfig::default()`
pub fn load_config(config_path: Option<&Path>) -> Result<ClientConfig> {
    if let Some(path) = config_path {
        if path.exists() {
            let config = read_config(path).context("Failed to load config file")?;
            tracing::info!("Loaded config from: {}", path.display());
            return Ok(config);
        }
        return Err(anyhow::anyhow!("Config file not found: {}", path.display()));
    }

    if let Ok(config_dir) = std::env::var("VPC_CONFIG_DIR") {
        let path = PathBuf::from(&config_dir).join("config.json");
        if path.exists() {
            let config =
                read_config(&path).context("Failed to load config from VPC_CONFIG_DIR")?;
            tracing::info!("Loaded config from VPC_CONFIG_DIR: {}", path.display());
            return Ok(config);
        }
    }

    if let Some(config_dir) = dirs::config_dir() {
        let path = config_dir
            .join("virtual-presenter-client")
            .join("config.json");
        if path.exists() {
            let config = read_config(&path)
                .context("Failed to load config from platform config dir")?;
            tracing::info!("Loaded config from: {}", path.display());
            return Ok(config);
        }
    }

    tracing::debug!("No config file found, using defaults");
    Ok(ClientConfig::default())
}

fn read_config(path: &Path) -> Result<ClientConfig> {
    let content = std::fs::read_to_string(path).context("Failed to read config file")?;
    let config: ClientConfig =
        serde_json::from_str(&content).context("Failed to parse config file")?;
    Ok(config)
}
