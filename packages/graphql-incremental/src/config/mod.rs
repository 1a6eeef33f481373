//! Configuration
//!
//! Serde-backed settings with YAML IO and explicit validation.
//!
//! # Examples
//!
//! ```rust,ignore
//! use graphql_incremental::config::{EngineConfig, IncrementalConfig};
//!
//! // Programmatic
//! let config = EngineConfig::default().with_incremental(IncrementalConfig::disabled());
//!
//! // From YAML
//! let config = EngineConfig::from_yaml("engine.yaml")?;
//! ```

pub mod engine_config;
pub mod error;
pub mod validation;

// Re-exports
pub use engine_config::{EngineConfig, IncrementalConfig, LoggingConfig, CONFIG_VERSION};
pub use error::{ConfigError, ConfigResult};
pub use validation::Validatable;
