//! Configuration file
//!
//! ```json
//! {
//!   "snapshot_path": "core.json",
//!   "lock_timeout_ms": 5000,
//!   "max_response_size": 104857600,
//!   "regex_size_limit": 1048576,
//!   "log_level": "info",
//!   "service_authorization": "loose"
//! }
//! ```
//!
//! Only `snapshot_path` is required. A relative path is resolved against
//! the directory of the configuration file.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::auth::ServiceAuthorization;
use crate::observability::Severity;
use crate::query::{QueryLimits, DEFAULT_MAX_RESPONSE_SIZE, DEFAULT_REGEX_SIZE_LIMIT};

use super::errors::{CliError, CliResult};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Core state snapshot (JSON)
    pub snapshot_path: PathBuf,

    /// Wait for the core state lock before a query fails with 503
    #[serde(default = "default_lock_timeout_ms")]
    pub lock_timeout_ms: u64,

    #[serde(default = "default_max_response_size")]
    pub max_response_size: usize,

    #[serde(default = "default_regex_size_limit")]
    pub regex_size_limit: usize,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub service_authorization: ServiceAuthorization,
}

fn default_lock_timeout_ms() -> u64 {
    5000
}
fn default_max_response_size() -> usize {
    DEFAULT_MAX_RESPONSE_SIZE
}
fn default_regex_size_limit() -> usize {
    DEFAULT_REGEX_SIZE_LIMIT
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Config with defaults for everything but the snapshot
    pub fn new(snapshot_path: impl Into<PathBuf>) -> Self {
        Self {
            snapshot_path: snapshot_path.into(),
            lock_timeout_ms: default_lock_timeout_ms(),
            max_response_size: default_max_response_size(),
            regex_size_limit: default_regex_size_limit(),
            log_level: default_log_level(),
            service_authorization: ServiceAuthorization::default(),
        }
    }

    pub fn load(path: &Path) -> CliResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            CliError::config_error(format!("failed to read {}: {}", path.display(), e))
        })?;

        let mut config: Config = serde_json::from_str(&content)
            .map_err(|e| CliError::config_error(format!("invalid config JSON: {}", e)))?;

        if config.snapshot_path.is_relative() {
            if let Some(dir) = path.parent() {
                config.snapshot_path = dir.join(&config.snapshot_path);
            }
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> CliResult<()> {
        if self.snapshot_path.as_os_str().is_empty() {
            return Err(CliError::config_error("snapshot_path must not be empty"));
        }
        if self.lock_timeout_ms == 0 {
            return Err(CliError::config_error("lock_timeout_ms must be > 0"));
        }
        if self.max_response_size == 0 {
            return Err(CliError::config_error("max_response_size must be > 0"));
        }
        if self.regex_size_limit == 0 {
            return Err(CliError::config_error("regex_size_limit must be > 0"));
        }
        if Severity::parse(&self.log_level).is_none() {
            return Err(CliError::config_error(format!(
                "invalid log_level '{}': expected trace, info, warn, error or fatal",
                self.log_level
            )));
        }
        Ok(())
    }

    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms)
    }

    pub fn limits(&self) -> QueryLimits {
        QueryLimits {
            regex_size_limit: self.regex_size_limit,
            max_response_size: self.max_response_size,
        }
    }

    pub fn severity(&self) -> Severity {
        Severity::parse(&self.log_level).unwrap_or(Severity::Info)
    }
}
