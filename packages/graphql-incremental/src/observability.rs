//! Tracing setup

use once_cell::sync::OnceCell;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::{ConfigError, LoggingConfig};
use crate::errors::Result;

static INSTALLED: OnceCell<()> = OnceCell::new();

/// Install the global fmt subscriber
///
/// `RUST_LOG` wins over `config.filter`. Calling this again after a
/// successful install is a no-op.
pub fn init_tracing(config: &LoggingConfig) -> Result<()> {
    INSTALLED
        .get_or_try_init(|| {
            let filter = match EnvFilter::try_from_default_env() {
                Ok(filter) => filter,
                Err(_) => EnvFilter::try_new(&config.filter)
                    .map_err(|e| ConfigError::Logging(format!("Invalid log filter: {e}")))?,
            };
            fmt()
                .with_env_filter(filter)
                .with_ansi(config.ansi)
                .with_target(config.with_target)
                .try_init()
                .map_err(|e| ConfigError::Logging(format!("Subscriber already installed: {e}")))
        })
        .map_err(Into::into)
        .map(|_| ())
}
