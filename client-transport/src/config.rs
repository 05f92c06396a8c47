//! Client configuration.
//!
//! Configuration is an explicit value handed to each client at
//! construction. Settings can be loaded from environment variables under a
//! caller-chosen prefix (`USER_API_MAX_RETRIES`, ...); a `.env` file is read
//! first when present.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::error::ConfigError;

/// Settings shared by every outbound call of one client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallConfig {
    /// Name of the calling service
    pub service_name: String,
    /// Name of the service being called
    pub external_service_name: String,
    /// Maximum attempts per logical call (at least 1)
    pub max_retries: u32,
    /// Fixed delay between attempts
    pub backoff_delay: Duration,
}

impl CallConfig {
    /// Create a config for calls from `service_name` to `external_service_name`.
    ///
    /// Defaults to 3 attempts, 100ms apart.
    #[must_use]
    pub fn new(service_name: impl Into<String>, external_service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            external_service_name: external_service_name.into(),
            max_retries: 3,
            backoff_delay: Duration::from_millis(100),
        }
    }

    /// Set the maximum number of attempts.
    #[must_use]
    pub const fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Set the delay between attempts.
    #[must_use]
    pub const fn with_backoff_delay(mut self, delay: Duration) -> Self {
        self.backoff_delay = delay;
        self
    }

    /// Check the settings can drive a client.
    ///
    /// # Errors
    ///
    /// Returns an error if a name is empty or `max_retries` is zero.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.service_name.trim().is_empty() {
            return Err(ConfigError::Missing("service_name".to_string()));
        }
        if self.external_service_name.trim().is_empty() {
            return Err(ConfigError::Missing("external_service_name".to_string()));
        }
        if self.max_retries == 0 {
            return Err(ConfigError::invalid("max_retries", "must be at least 1"));
        }
        Ok(())
    }

    /// Load from environment variables under `prefix`.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is missing, malformed, or invalid.
    pub fn from_env(prefix: &str) -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(prefix, |key| env::var(key).ok())
    }

    /// Load using `lookup` to resolve variable names.
    ///
    /// Reads `<PREFIX>_SERVICE_NAME`, `<PREFIX>_EXTERNAL_SERVICE_NAME`,
    /// `<PREFIX>_MAX_RETRIES` and `<PREFIX>_BACKOFF_DELAYS_MS`.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is missing, malformed, or invalid.
    pub fn from_lookup<F>(prefix: &str, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let service_name = require(prefix, "SERVICE_NAME", &lookup)?;
        let external_service_name = require(prefix, "EXTERNAL_SERVICE_NAME", &lookup)?;
        let defaults = Self::new(service_name, external_service_name);

        let max_retries = parse_var(prefix, "MAX_RETRIES", &lookup, defaults.max_retries)?;
        let backoff_ms = parse_var(prefix, "BACKOFF_DELAYS_MS", &lookup, 100_u64)?;

        let config = defaults
            .with_max_retries(max_retries)
            .with_backoff_delay(Duration::from_millis(backoff_ms));
        config.validate()?;
        Ok(config)
    }
}

/// HTTP client configuration.
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Call identity and retry settings
    pub call: CallConfig,
    /// Per-attempt request timeout (default: 30s)
    pub timeout: Duration,
    /// Connection timeout (default: 10s)
    pub connect_timeout: Duration,
    /// Pool idle timeout (default: 90s)
    pub pool_idle_timeout: Duration,
    /// Maximum idle connections per host (default: 10)
    pub pool_max_idle_per_host: usize,
    /// User agent string
    pub user_agent: String,
}

impl HttpClientConfig {
    /// Create an HTTP config around the given call settings.
    #[must_use]
    pub fn new(call: CallConfig) -> Self {
        Self {
            call,
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            pool_idle_timeout: Duration::from_secs(90),
            pool_max_idle_per_host: 10,
            user_agent: "client-transport/0.1".to_string(),
        }
    }

    /// Set the per-attempt timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the connection timeout.
    #[must_use]
    pub const fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the user agent.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Set connection pool parameters.
    #[must_use]
    pub const fn with_pool_config(mut self, idle_timeout: Duration, max_idle: usize) -> Self {
        self.pool_idle_timeout = idle_timeout;
        self.pool_max_idle_per_host = max_idle;
        self
    }

    /// Check the settings can drive a client.
    ///
    /// # Errors
    ///
    /// Returns an error if the call settings are invalid or the timeout is zero.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.call.validate()?;
        if self.timeout.is_zero() {
            return Err(ConfigError::invalid("timeout", "must be greater than zero"));
        }
        Ok(())
    }

    /// Load from environment variables under `prefix`.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is missing, malformed, or invalid.
    pub fn from_env(prefix: &str) -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(prefix, |key| env::var(key).ok())
    }

    /// Load using `lookup`; adds `<PREFIX>_TIMEOUT_MS` to the call settings.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is missing, malformed, or invalid.
    pub fn from_lookup<F>(prefix: &str, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let call = CallConfig::from_lookup(prefix, &lookup)?;
        let timeout_ms = parse_var(prefix, "TIMEOUT_MS", &lookup, 30_000_u64)?;

        let config = Self::new(call).with_timeout(Duration::from_millis(timeout_ms));
        config.validate()?;
        Ok(config)
    }
}

/// gRPC client configuration.
#[derive(Debug, Clone)]
pub struct GrpcClientConfig {
    /// Call identity and retry settings
    pub call: CallConfig,
    /// Target host
    pub host: String,
    /// Target port
    pub port: u16,
    /// Per-attempt request timeout; unset leaves it to the caller's deadline
    pub timeout: Option<Duration>,
    /// Connection timeout (default: 10s)
    pub connect_timeout: Duration,
}

impl GrpcClientConfig {
    /// Create a gRPC config targeting `host:port`.
    #[must_use]
    pub fn new(call: CallConfig, host: impl Into<String>, port: u16) -> Self {
        Self {
            call,
            host: host.into(),
            port,
            timeout: None,
            connect_timeout: Duration::from_secs(10),
        }
    }

    /// Set the per-attempt timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the connection timeout.
    #[must_use]
    pub const fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Plaintext endpoint URI for the target.
    #[must_use]
    pub fn endpoint_uri(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }

    /// Check the settings can drive a client.
    ///
    /// # Errors
    ///
    /// Returns an error if the call settings are invalid, the host is
    /// empty, or the port is zero.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.call.validate()?;
        if self.host.trim().is_empty() {
            return Err(ConfigError::Missing("host".to_string()));
        }
        if self.port == 0 {
            return Err(ConfigError::invalid("port", "must be non-zero"));
        }
        Ok(())
    }

    /// Load from environment variables under `prefix`.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is missing, malformed, or invalid.
    pub fn from_env(prefix: &str) -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(prefix, |key| env::var(key).ok())
    }

    /// Load using `lookup`; adds `<PREFIX>_HOST`, `<PREFIX>_PORT` and
    /// `<PREFIX>_TIMEOUT_MS` to the call settings.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is missing, malformed, or invalid.
    pub fn from_lookup<F>(prefix: &str, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let call = CallConfig::from_lookup(prefix, &lookup)?;
        let host = require(prefix, "HOST", &lookup)?;
        let port = parse_var(prefix, "PORT", &lookup, 0_u16)?;

        let mut config = Self::new(call, host, port);
        if let Some(raw) = lookup(&var_name(prefix, "TIMEOUT_MS")) {
            let ms = parse_value::<u64>(&var_name(prefix, "TIMEOUT_MS"), &raw)?;
            config = config.with_timeout(Duration::from_millis(ms));
        }
        config.validate()?;
        Ok(config)
    }
}

pub(crate) fn var_name(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{}_{key}", prefix.to_uppercase())
    }
}

fn require<F>(prefix: &str, key: &str, lookup: &F) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let name = var_name(prefix, key);
    lookup(&name)
        .filter(|value| !value.trim().is_empty())
        .ok_or(ConfigError::Missing(name))
}

fn parse_var<T, F>(prefix: &str, key: &str, lookup: &F, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    let name = var_name(prefix, key);
    lookup(&name).map_or(Ok(default), |raw| parse_value(&name, &raw))
}

fn parse_value<T>(name: &str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse()
        .map_err(|e: T::Err| ConfigError::invalid(name, e.to_string()))
}
