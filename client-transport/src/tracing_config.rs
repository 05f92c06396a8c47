//! Process-wide tracing subscriber setup.
//!
//! Development mode writes human-readable lines; production mode writes
//! JSON. `RUST_LOG` takes precedence over the configured level.

use std::env;

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::var_name;
use crate::error::ConfigError;

/// Tracing configuration.
///
/// Defaults to development output at `debug` level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TracingConfig {
    /// Log level filter
    pub log_level: String,
    /// Whether to output JSON format
    pub json_output: bool,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            log_level: "debug".to_string(),
            json_output: false,
        }
    }
}

impl TracingConfig {
    /// Create config with custom log level.
    #[must_use]
    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    /// Switch between development (plain text) and production (JSON) output.
    #[must_use]
    pub const fn with_development(mut self, is_development: bool) -> Self {
        self.json_output = !is_development;
        self
    }

    /// Whether plain-text development output is selected.
    #[must_use]
    pub const fn is_development(&self) -> bool {
        !self.json_output
    }

    /// Load from `<PREFIX>_IS_DEVELOPMENT` and `<PREFIX>_LEVEL`.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is malformed.
    pub fn from_env(prefix: &str) -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(prefix, |key| env::var(key).ok())
    }

    /// Load using `lookup`. Missing variables keep their defaults; an empty
    /// prefix reads the bare names.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is malformed.
    pub fn from_lookup<F>(prefix: &str, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        let development_var = var_name(prefix, "IS_DEVELOPMENT");
        if let Some(raw) = lookup(&development_var) {
            let is_development = raw
                .trim()
                .parse::<bool>()
                .map_err(|e| ConfigError::invalid(&development_var, e.to_string()))?;
            config = config.with_development(is_development);
        }

        let level_var = var_name(prefix, "LEVEL");
        if let Some(level) = lookup(&level_var).filter(|level| !level.trim().is_empty()) {
            EnvFilter::try_new(&level)
                .map_err(|e| ConfigError::invalid(&level_var, e.to_string()))?;
            config.log_level = level.trim().to_lowercase();
        }

        Ok(config)
    }
}

/// Install the global tracing subscriber.
///
/// Should be called once at application startup.
///
/// # Errors
///
/// Returns an error if a global subscriber is already installed.
pub fn init_tracing(
    config: &TracingConfig,
) -> Result<(), tracing_subscriber::util::TryInitError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    if config.json_output {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().pretty())
            .try_init()
    }
}
