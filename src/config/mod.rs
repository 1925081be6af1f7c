//! Configuration management for country-atlas
//!
//! Configuration is loaded once at process start (from environment variables
//! or a TOML file), validated, and then passed explicitly to each component.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::utils::retry::RetryConfig;

pub const DEFAULT_COUNTRIES_URL: &str =
    "https://restcountries.com/v2/all?fields=name,capital,region,population,flag,currencies";
pub const DEFAULT_RATES_URL: &str = "https://open.er-api.com/v6/latest/USD";
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Database configuration
    pub database: DatabaseConfig,

    /// Upstream sources configuration
    #[serde(default)]
    pub sources: SourcesConfig,

    /// GDP estimation configuration
    #[serde(default)]
    pub gdp: GdpConfig,

    /// Summary image configuration
    #[serde(default)]
    pub summary: SummaryConfig,

    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Connection string (`sqlite:///rel.db`, `sqlite:////abs.db`, `sqlite::memory:` or a bare path)
    pub url: String,
}

/// Upstream sources configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourcesConfig {
    /// Countries list endpoint
    pub countries_url: String,

    /// Exchange rates endpoint
    pub rates_url: String,

    /// Request timeout in seconds
    pub request_timeout_secs: f64,

    /// Retry attempts for transient upstream failures
    pub max_retries: u32,

    /// Base backoff delay in milliseconds
    pub retry_base_delay_ms: u64,
}

/// Multiplier range for the estimated GDP
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GdpConfig {
    pub random_min: u32,
    pub random_max: u32,
}

/// Summary image configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SummaryConfig {
    /// Single well-known artifact path
    pub image_path: PathBuf,

    /// Directory scanned for fonts before falling back to system fonts
    pub fonts_dir: PathBuf,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_address: SocketAddr,
    pub enable_cors: bool,
    pub enable_request_logging: bool,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (text, json)
    pub format: String,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            countries_url: String::from(DEFAULT_COUNTRIES_URL),
            rates_url: String::from(DEFAULT_RATES_URL),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT.as_secs_f64(),
            max_retries: 2,
            retry_base_delay_ms: 500,
        }
    }
}

impl Default for GdpConfig {
    fn default() -> Self {
        Self {
            random_min: 1000,
            random_max: 2000,
        }
    }
}

impl Default for SummaryConfig {
    fn default() -> Self {
        Self {
            image_path: PathBuf::from("cache/summary.png"),
            fonts_dir: PathBuf::from("fonts"),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: SocketAddr::from(([0, 0, 0, 0], 8000)),
            enable_cors: true,
            enable_request_logging: true,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: String::from("info"),
            format: String::from("text"),
        }
    }
}

impl Config {
    /// Configuration with defaults for everything except the database URL
    pub fn with_database_url(url: impl Into<String>) -> Self {
        Self {
            database: DatabaseConfig { url: url.into() },
            sources: SourcesConfig::default(),
            gdp: GdpConfig::default(),
            summary: SummaryConfig::default(),
            server: ServerConfig::default(),
            logging: LoggingConfig::default(),
        }
    }

    /// Load configuration from environment variables
    ///
    /// `DATABASE_URL` is required; everything else has a default.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL")
            .filter(|v| !v.trim().is_empty())
            .context("DATABASE_URL must be set")?;

        let mut config = Self::with_database_url(database_url);

        if let Some(url) = lookup("COUNTRIES_API_URL") {
            config.sources.countries_url = url;
        }
        if let Some(url) = lookup("EXCHANGE_API_URL") {
            config.sources.rates_url = url;
        }
        if let Some(v) = parse_var::<f64, _>(&lookup, "REQUEST_TIMEOUT")? {
            config.sources.request_timeout_secs = v;
        }
        if let Some(v) = parse_var::<u32, _>(&lookup, "UPSTREAM_MAX_RETRIES")? {
            config.sources.max_retries = v;
        }
        if let Some(v) = parse_var::<u64, _>(&lookup, "UPSTREAM_RETRY_DELAY_MS")? {
            config.sources.retry_base_delay_ms = v;
        }
        if let Some(v) = parse_var::<u32, _>(&lookup, "RANDOM_MIN")? {
            config.gdp.random_min = v;
        }
        if let Some(v) = parse_var::<u32, _>(&lookup, "RANDOM_MAX")? {
            config.gdp.random_max = v;
        }
        if let Some(path) = lookup("SUMMARY_IMAGE_PATH") {
            config.summary.image_path = PathBuf::from(path);
        }
        if let Some(dir) = lookup("FONTS_DIR") {
            config.summary.fonts_dir = PathBuf::from(dir);
        }
        if let Some(v) = parse_var::<SocketAddr, _>(&lookup, "BIND_ADDRESS")? {
            config.server.bind_address = v;
        }
        if let Some(v) = parse_var::<bool, _>(&lookup, "ENABLE_CORS")? {
            config.server.enable_cors = v;
        }
        if let Some(v) = parse_var::<bool, _>(&lookup, "ENABLE_REQUEST_LOGGING")? {
            config.server.enable_request_logging = v;
        }
        if let Some(level) = lookup("LOG_LEVEL") {
            config.logging.level = level;
        }
        if let Some(format) = lookup("LOG_FORMAT") {
            config.logging.format = format;
        }

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse TOML config file: {}", path.display()))?;

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.database.url.trim().is_empty() {
            anyhow::bail!("database url must not be empty");
        }

        if self.sources.countries_url.trim().is_empty() || self.sources.rates_url.trim().is_empty()
        {
            anyhow::bail!("upstream URLs must not be empty");
        }

        match Duration::try_from_secs_f64(self.sources.request_timeout_secs) {
            Ok(timeout) if !timeout.is_zero() => {}
            _ => anyhow::bail!(
                "request timeout must be a positive number of seconds, got {}",
                self.sources.request_timeout_secs
            ),
        }

        if self.gdp.random_min > self.gdp.random_max {
            anyhow::bail!(
                "RANDOM_MIN ({}) must not exceed RANDOM_MAX ({})",
                self.gdp.random_min,
                self.gdp.random_max
            );
        }

        Ok(())
    }

    /// Get request timeout as Duration
    #[must_use]
    ///
    /// Falls back to the 10 second default when the value is out of range;
    /// [`Config::validate`] rejects such values up front.
    pub fn request_timeout(&self) -> Duration {
        Duration::try_from_secs_f64(self.sources.request_timeout_secs)
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT)
    }

    /// Retry policy for upstream calls
    #[must_use]
    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig::new(self.sources.max_retries, self.sources.retry_base_delay_ms)
    }
}

fn parse_var<T, F>(lookup: &F, key: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| anyhow::anyhow!("Invalid value for {key} ({raw}): {e}")),
    }
}
