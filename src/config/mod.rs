//! Typed configuration from environment variables and an optional TOML file.
//!
//! Loads once at startup, fails fast if required vars are missing.
//! Sensitive values wrapped in secrecy::SecretString to prevent log leaks.

pub mod secrets;

use crate::error::{Error, Result};
use secrecy::SecretString;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";

#[derive(Debug)]
pub struct Config {
    pub anthropic_api_key: SecretString,
    pub model: String,
    pub batch_config_path: Option<PathBuf>,
    pub otel_endpoint: Option<String>,
    pub log_level: String,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// In local dev, call `dotenvy::dotenv().ok()` before this.
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            anthropic_api_key: SecretString::from(required_var("ANTHROPIC_API_KEY")?),
            model: std::env::var("FREIGHT_AI_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string()),
            batch_config_path: std::env::var("FREIGHT_AI_CONFIG").ok().map(PathBuf::from),
            otel_endpoint: std::env::var("OTEL_ENDPOINT").ok(),
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
        })
    }

    /// Batch settings from `FREIGHT_AI_CONFIG` if set, defaults otherwise.
    pub fn batch_config(&self) -> Result<BatchConfig> {
        match &self.batch_config_path {
            Some(path) => BatchConfig::load(path),
            None => Ok(BatchConfig::default()),
        }
    }
}

fn required_var(name: &str) -> Result<String> {
    std::env::var(name)
        .map_err(|_| Error::Config(format!("required environment variable {name} is not set")))
}

/// Tunables for batching, budgets and polling. Every field has a default, so
/// a TOML file only needs the keys it overrides.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    pub batch_interval_secs: u64,
    pub max_batch_size: usize,
    /// Pending count at which a high-priority enqueue flushes early.
    pub burst_threshold: usize,
    pub queue_capacity: usize,
    pub dispatch_timeout_secs: u64,
    pub poll_interval_ms: u64,
    pub poll_timeout_secs: u64,
    pub result_ttl_secs: u64,
    pub daily_token_limit: u64,
    pub daily_cost_limit: f64,
    pub cost_per_1k_tokens: f64,
    pub max_tokens: u64,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            batch_interval_secs: 300,
            max_batch_size: 50,
            burst_threshold: 10,
            queue_capacity: 1000,
            dispatch_timeout_secs: 60,
            poll_interval_ms: 1000,
            poll_timeout_secs: 30,
            result_ttl_secs: 86_400,
            daily_token_limit: 100_000,
            daily_cost_limit: 50.0,
            cost_per_1k_tokens: 0.003,
            max_tokens: 4096,
        }
    }
}

impl BatchConfig {
    /// Read a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("cannot read batch config {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&content)
            .map_err(|e| Error::Config(format!("bad batch config {}: {e}", path.display())))
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: BatchConfig =
            toml::from_str(content).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.batch_interval_secs == 0 {
            return Err(Error::Config("batch_interval_secs must be at least 1".to_string()));
        }
        if self.dispatch_timeout_secs == 0 {
            return Err(Error::Config("dispatch_timeout_secs must be at least 1".to_string()));
        }
        if self.max_batch_size == 0 {
            return Err(Error::Config("max_batch_size must be at least 1".to_string()));
        }
        if self.queue_capacity == 0 {
            return Err(Error::Config("queue_capacity must be at least 1".to_string()));
        }
        if self.poll_interval_ms == 0 {
            return Err(Error::Config("poll_interval_ms must be at least 1".to_string()));
        }
        Ok(())
    }

    pub fn batch_interval(&self) -> Duration {
        Duration::from_secs(self.batch_interval_secs)
    }

    pub fn dispatch_timeout(&self) -> Duration {
        Duration::from_secs(self.dispatch_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn poll_timeout(&self) -> Duration {
        Duration::from_secs(self.poll_timeout_secs)
    }

    pub fn result_ttl(&self) -> Duration {
        Duration::from_secs(self.result_ttl_secs)
    }
}
