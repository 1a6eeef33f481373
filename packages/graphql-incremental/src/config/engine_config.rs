//! Engine configuration
//!
//! ```yaml
//! version: 1
//! incremental:
//!   enabled: true
//!   publisher_ordering: ordered
//!   max_pending_calls: 10000
//! logging:
//!   filter: "graphql_incremental=debug"
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

use super::error::{ConfigError, ConfigResult};
use super::validation::Validatable;
use crate::features::reactive::PublisherOrdering;

pub const CONFIG_VERSION: u32 = 1;

const MAX_PENDING_CALLS_LIMIT: usize = 1_000_000;

// ═══════════════════════════════════════════════════════════════════════════
// Incremental delivery
// ═══════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IncrementalConfig {
    /// `false` selects the no-op deferred execution support
    pub enabled: bool,

    /// Variant built by `MappingPublisher::from_config`
    pub publisher_ordering: PublisherOrdering,

    /// Upper bound on calls enqueued but not yet completed per request
    pub max_pending_calls: usize,
}

impl Default for IncrementalConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            publisher_ordering: PublisherOrdering::Ordered,
            max_pending_calls: 10_000,
        }
    }
}

impl IncrementalConfig {
    /// Incremental delivery switched off
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    pub fn max_pending_calls(mut self, max: usize) -> Self {
        self.max_pending_calls = max;
        self
    }

    pub fn publisher_ordering(mut self, ordering: PublisherOrdering) -> Self {
        self.publisher_ordering = ordering;
        self
    }
}

impl Validatable for IncrementalConfig {
    fn validate(&self) -> ConfigResult<()> {
        if self.max_pending_calls == 0 || self.max_pending_calls > MAX_PENDING_CALLS_LIMIT {
            return Err(ConfigError::range_with_hint(
                "max_pending_calls",
                self.max_pending_calls,
                1,
                MAX_PENDING_CALLS_LIMIT,
                "Every request needs room for at least one deferred call",
            ));
        }
        Ok(())
    }

    fn config_name(&self) -> &'static str {
        "IncrementalConfig"
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Logging
// ═══════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    /// `EnvFilter` directive; `RUST_LOG` takes precedence when set
    pub filter: String,
    pub ansi: bool,
    pub with_target: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
            ansi: true,
            with_target: false,
        }
    }
}

impl Validatable for LoggingConfig {
    fn validate(&self) -> ConfigResult<()> {
        if self.filter.trim().is_empty() {
            return Err(ConfigError::validation(self.config_name(), "filter must not be empty"));
        }
        EnvFilter::try_new(&self.filter).map_err(|e| {
            ConfigError::validation(self.config_name(), format!("bad filter '{}': {}", self.filter, e))
        })?;
        Ok(())
    }

    fn config_name(&self) -> &'static str {
        "LoggingConfig"
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Engine
// ═══════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    pub version: u32,
    pub incremental: IncrementalConfig,
    pub logging: LoggingConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            incremental: IncrementalConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl EngineConfig {
    pub fn with_incremental(mut self, incremental: IncrementalConfig) -> Self {
        self.incremental = incremental;
        self
    }

    pub fn with_logging(mut self, logging: LoggingConfig) -> Self {
        self.logging = logging;
        self
    }

    /// Parse and validate a YAML document
    pub fn from_yaml_str(content: &str) -> ConfigResult<Self> {
        let config: EngineConfig = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from YAML file
    pub fn from_yaml(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    /// Export to YAML
    pub fn to_yaml(&self) -> ConfigResult<String> {
        Ok(serde_yaml::to_string(self)?)
    }
}

impl Validatable for EngineConfig {
    fn validate(&self) -> ConfigResult<()> {
        if self.version != CONFIG_VERSION {
            return Err(ConfigError::UnsupportedVersion {
                found: self.version,
                supported: vec![CONFIG_VERSION],
            });
        }
        self.incremental.validate()?;
        self.logging.validate()?;
        Ok(())
    }

    fn config_name(&self) -> &'static str {
        "EngineConfig"
    }
}
