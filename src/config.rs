//! Engine configuration
//!
//! Loaded from a JSON file. Every key is optional:
//!
//! ```json
//! { "strict_types": false, "default_limit": null, "max_limit": 10000, "log_level": "info" }
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration error (FHIR_CONFIG)
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("configuration error: {0}")]
pub struct ConfigError(pub String);

impl ConfigError {
    pub fn code(&self) -> &'static str {
        "FHIR_CONFIG"
    }
}

pub type ConfigResult<T> = Result<T, ConfigError>;

const LOG_LEVELS: [&str; 6] = ["off", "error", "warn", "info", "debug", "trace"];

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EngineConfig {
    /// Reject writes whose field values contradict their declared type
    #[serde(default)]
    pub strict_types: bool,

    /// Page size of searches that give no limit
    #[serde(default)]
    pub default_limit: Option<usize>,

    /// Upper bound on any search page size
    #[serde(default = "default_max_limit")]
    pub max_limit: usize,

    /// Default tracing filter; `RUST_LOG` overrides it
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_max_limit() -> usize {
    10_000
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            strict_types: false,
            default_limit: None,
            max_limit: default_max_limit(),
            log_level: default_log_level(),
        }
    }
}

impl EngineConfig {
    /// Reads and validates a configuration file
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| ConfigError(format!("failed to read {}: {}", path.display(), e)))?;
        Self::from_json(&content)
    }

    /// Parses and validates configuration JSON
    pub fn from_json(content: &str) -> ConfigResult<Self> {
        let config: EngineConfig = serde_json::from_str(content)
            .map_err(|e| ConfigError(format!("invalid config JSON: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.max_limit == 0 {
            return Err(ConfigError("max_limit must be > 0".into()));
        }
        if let Some(limit) = self.default_limit {
            if limit > self.max_limit {
                return Err(ConfigError(format!(
                    "default_limit {} exceeds max_limit {}",
                    limit, self.max_limit
                )));
            }
        }
        if !LOG_LEVELS.contains(&self.log_level.to_ascii_lowercase().as_str()) {
            return Err(ConfigError(format!(
                "invalid log_level '{}'. Expected one of: {}",
                self.log_level,
                LOG_LEVELS.join(", ")
            )));
        }
        Ok(())
    }

    /// Page size for a request: the default when none is given, clamped to
    /// `max_limit`.
    pub fn effective_limit(&self, requested: Option<usize>) -> usize {
        requested
            .or(self.default_limit)
            .unwrap_or(self.max_limit)
            .min(self.max_limit)
    }
}
