//! Configuration for the bridge

use crate::types::bridge_topic;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

/// Bridge configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Application identifier, used to name the queue topic
    pub application_id: String,

    /// Record classes mirrored to the ledger
    pub class_names: Vec<String>,

    /// Worker configuration
    pub worker: WorkerConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            application_id: "ledger-bridge".to_string(),
            class_names: Vec::new(),
            worker: WorkerConfig::default(),
        }
    }
}

/// Worker configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// Status reads while another sender holds `Sending`
    pub wait_sending_attempts: u32,

    /// Pause between those reads (milliseconds)
    pub wait_sending_sleep_ms: u64,

    /// Backoff added per consecutive failure (milliseconds)
    pub backoff_step_ms: u64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            wait_sending_attempts: 30,   // ~30 min with the default sleep
            wait_sending_sleep_ms: 60_000,
            backoff_step_ms: 1_000,
        }
    }
}

impl WorkerConfig {
    /// Replace zero values with defaults
    pub fn normalized(mut self) -> Self {
        let defaults = Self::default();
        if self.wait_sending_attempts == 0 {
            self.wait_sending_attempts = defaults.wait_sending_attempts;
        }
        if self.wait_sending_sleep_ms == 0 {
            self.wait_sending_sleep_ms = defaults.wait_sending_sleep_ms;
        }
        if self.backoff_step_ms == 0 {
            self.backoff_step_ms = defaults.backoff_step_ms;
        }
        self
    }

    /// Pause between status reads
    pub fn wait_sending_sleep(&self) -> Duration {
        Duration::from_millis(self.wait_sending_sleep_ms)
    }

    /// Delay before handling the next message after `fails` consecutive failures
    pub fn backoff(&self, fails: u32) -> Duration {
        Duration::from_millis(self.backoff_step_ms.saturating_mul(u64::from(fails)))
    }
}

impl Config {
    /// Queue topic of this application
    pub fn topic(&self) -> String {
        bridge_topic(&self.application_id)
    }

    /// Load from file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&content)?;
        config.worker = config.worker.normalized();
        Ok(config)
    }

    /// Load from environment variables
    pub fn from_env() -> Result<Self> {
        let mut config = Config::default();

        if let Ok(application_id) = std::env::var("BRIDGE_APPLICATION_ID") {
            config.application_id = application_id;
        }

        if let Ok(class_names) = std::env::var("BRIDGE_CLASS_NAMES") {
            config.class_names = class_names
                .split(',')
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(str::to_string)
                .collect();
        }

        if let Some(attempts) = env_number("BRIDGE_WAIT_SENDING_ATTEMPTS")? {
            config.worker.wait_sending_attempts = attempts;
        }

        if let Some(sleep_ms) = env_number("BRIDGE_WAIT_SENDING_SLEEP_MS")? {
            config.worker.wait_sending_sleep_ms = sleep_ms;
        }

        if let Some(step_ms) = env_number("BRIDGE_BACKOFF_STEP_MS")? {
            config.worker.backoff_step_ms = step_ms;
        }

        config.worker = config.worker.normalized();
        Ok(config)
    }
}

fn env_number<T: FromStr>(key: &str) -> Result<Option<T>> {
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| Error::Config(format!("{} is not a valid number: {:?}", key, raw))),
        Err(_) => Ok(None),
    }
}
