//! Application configuration module
//!
//! Provides configuration types for the server. Values come from the
//! environment (after `.env` is loaded by the binary) or from a TOML file,
//! and every source goes through the same builder and validation.

use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

const DEFAULT_PORT: u16 = 3000;
const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(3600);
const DEFAULT_QUEUE_CAPACITY: usize = 256;
const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_secs(5);
const DEFAULT_LOG_FILTER: &str = "info";

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Postgres connection string; `None` runs on the in-memory store
    pub database_url: Option<String>,
    /// HTTP listen port
    pub server_port: u16,
    /// HS256 secret used to verify bearer tokens
    pub jwt_secret: String,
    /// Lifetime of a cached effective permission
    pub permission_cache_ttl: Duration,
    /// Outbound queue size per live connection
    pub connection_queue_capacity: usize,
    /// Upper bound on a single store call
    pub store_timeout: Duration,
    /// `tracing_subscriber::EnvFilter` directive used when `RUST_LOG` is unset
    pub log_filter: String,
    /// Envelope buffer of the cross-hub fan-out; `None` keeps hubs local
    pub fanout_capacity: Option<usize>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: None,
            server_port: DEFAULT_PORT,
            jwt_secret: String::new(),
            permission_cache_ttl: DEFAULT_CACHE_TTL,
            connection_queue_capacity: DEFAULT_QUEUE_CAPACITY,
            store_timeout: DEFAULT_STORE_TIMEOUT,
            log_filter: DEFAULT_LOG_FILTER.to_string(),
            fanout_capacity: None,
        }
    }
}

impl AppConfig {
    /// Create a new AppConfigBuilder
    pub fn builder() -> AppConfigBuilder {
        AppConfigBuilder::default()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(url) = &self.database_url {
            if !(url.starts_with("postgres://") || url.starts_with("postgresql://")) {
                return Err(ConfigError::InvalidUrl(url.clone()));
            }
        }
        if self.jwt_secret.trim().is_empty() {
            return Err(ConfigError::MissingValue("JWT_SECRET"));
        }
        if self.server_port == 0 {
            return Err(ConfigError::invalid("SERVER_PORT", "0"));
        }
        if self.connection_queue_capacity == 0 {
            return Err(ConfigError::invalid("CONNECTION_QUEUE_CAPACITY", "0"));
        }
        if self.permission_cache_ttl.is_zero() {
            return Err(ConfigError::invalid("PERMISSION_CACHE_TTL_SECS", "0"));
        }
        if self.store_timeout.is_zero() {
            return Err(ConfigError::invalid("STORE_TIMEOUT_MS", "0"));
        }
        if self.fanout_capacity == Some(0) {
            return Err(ConfigError::invalid("FANOUT_CAPACITY", "0"));
        }
        Ok(())
    }

    /// Read configuration from process environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration from any key lookup, e.g. a map in tests
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut builder = Self::builder();
        if let Some(url) = lookup("DATABASE_URL").filter(|v| !v.is_empty()) {
            builder = builder.database_url(url);
        }
        if let Some(port) = lookup("SERVER_PORT") {
            builder = builder.server_port(parse_number("SERVER_PORT", &port)?);
        }
        if let Some(secret) = lookup("JWT_SECRET") {
            builder = builder.jwt_secret(secret);
        }
        if let Some(ttl) = lookup("PERMISSION_CACHE_TTL_SECS") {
            let secs = parse_number("PERMISSION_CACHE_TTL_SECS", &ttl)?;
            builder = builder.permission_cache_ttl(Duration::from_secs(secs));
        }
        if let Some(capacity) = lookup("CONNECTION_QUEUE_CAPACITY") {
            builder = builder
                .connection_queue_capacity(parse_number("CONNECTION_QUEUE_CAPACITY", &capacity)?);
        }
        if let Some(timeout) = lookup("STORE_TIMEOUT_MS") {
            let millis = parse_number("STORE_TIMEOUT_MS", &timeout)?;
            builder = builder.store_timeout(Duration::from_millis(millis));
        }
        if let Some(filter) = lookup("RUST_LOG") {
            builder = builder.log_filter(filter);
        }
        if let Some(capacity) = lookup("FANOUT_CAPACITY").filter(|v| !v.is_empty()) {
            builder = builder.fanout_capacity(parse_number("FANOUT_CAPACITY", &capacity)?);
        }
        builder.build()
    }

    /// Parse a TOML document such as `taskmesh.toml`
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let file: FileConfig = toml::from_str(input)?;
        let mut builder = Self::builder();
        if let Some(url) = file.database_url {
            builder = builder.database_url(url);
        }
        if let Some(port) = file.server_port {
            builder = builder.server_port(port);
        }
        if let Some(secret) = file.jwt_secret {
            builder = builder.jwt_secret(secret);
        }
        if let Some(secs) = file.permission_cache_ttl_secs {
            builder = builder.permission_cache_ttl(Duration::from_secs(secs));
        }
        if let Some(capacity) = file.connection_queue_capacity {
            builder = builder.connection_queue_capacity(capacity);
        }
        if let Some(millis) = file.store_timeout_ms {
            builder = builder.store_timeout(Duration::from_millis(millis));
        }
        if let Some(filter) = file.log_filter {
            builder = builder.log_filter(filter);
        }
        if let Some(capacity) = file.fanout_capacity {
            builder = builder.fanout_capacity(capacity);
        }
        builder.build()
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    database_url: Option<String>,
    server_port: Option<u16>,
    jwt_secret: Option<String>,
    permission_cache_ttl_secs: Option<u64>,
    connection_queue_capacity: Option<usize>,
    store_timeout_ms: Option<u64>,
    log_filter: Option<String>,
    fanout_capacity: Option<usize>,
}

fn parse_number<T: std::str::FromStr>(key: &'static str, value: &str) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::invalid(key, value))
}

/// Builder for AppConfig
#[derive(Debug, Default)]
pub struct AppConfigBuilder {
    config: AppConfig,
}

impl AppConfigBuilder {
    /// Set the database URL
    pub fn database_url(mut self, url: impl Into<String>) -> Self {
        self.config.database_url = Some(url.into());
        self
    }

    pub fn server_port(mut self, port: u16) -> Self {
        self.config.server_port = port;
        self
    }

    pub fn jwt_secret(mut self, secret: impl Into<String>) -> Self {
        self.config.jwt_secret = secret.into();
        self
    }

    pub fn permission_cache_ttl(mut self, ttl: Duration) -> Self {
        self.config.permission_cache_ttl = ttl;
        self
    }

    pub fn connection_queue_capacity(mut self, capacity: usize) -> Self {
        self.config.connection_queue_capacity = capacity;
        self
    }

    pub fn store_timeout(mut self, timeout: Duration) -> Self {
        self.config.store_timeout = timeout;
        self
    }

    pub fn log_filter(mut self, filter: impl Into<String>) -> Self {
        self.config.log_filter = filter.into();
        self
    }

    /// Turn on the cross-hub fan-out with room for `capacity` envelopes
    pub fn fanout_capacity(mut self, capacity: usize) -> Self {
        self.config.fanout_capacity = Some(capacity);
        self
    }

    /// Build and validate the configuration
    pub fn build(self) -> Result<AppConfig, ConfigError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid URL: {0}")]
    InvalidUrl(String),
    #[error("missing value: {0}")]
    MissingValue(&'static str),
    #[error("invalid value for {key}: {value:?}")]
    InvalidValue { key: &'static str, value: String },
    #[error("malformed config file: {0}")]
    Parse(#[from] toml::de::Error),
}

impl ConfigError {
    fn invalid(key: &'static str, value: impl Into<String>) -> Self {
        Self::InvalidValue {
            key,
            value: value.into(),
        }
    }
}
