//! Configuration management for slotwatch
//!
//! This module handles loading and validating configuration from environment variables,
//! files, and command-line arguments.

use anyhow::{Context, Result};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::crawler::url::DEFAULT_BOOKING_BASE;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Service being watched
    pub target: TargetConfig,

    /// Poll cadence and timeouts
    pub poll: PollConfig,

    /// Subscriber server
    pub server: ServerConfig,

    /// Identity rotation
    pub identities: IdentityConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Service being watched
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetConfig {
    /// Service page URL; its last path segment is the service id
    pub service_page_url: String,

    /// Calendar root of the booking service
    pub booking_base_url: String,

    /// IANA timezone the booking service lives in
    pub timezone: String,
}

/// Poll cadence configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PollConfig {
    /// Time between two requests from the same identity, in seconds
    pub base_interval_secs: u64,

    /// Minimum rest between two uses of one identity, in seconds
    pub cooldown_secs: u64,

    /// Per-page timeout in seconds
    pub request_timeout_secs: u64,

    /// Suppress local alerts
    pub quiet: bool,
}

/// Subscriber server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Interface to listen on
    pub host: String,

    /// Port to listen on
    pub port: u16,
}

/// Identity rotation configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentityConfig {
    /// `proxy;email;id` file; direct access when absent
    pub file: Option<PathBuf>,
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

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            service_page_url: String::new(),
            booking_base_url: String::from(DEFAULT_BOOKING_BASE),
            timezone: String::from("Europe/Berlin"),
        }
    }
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            base_interval_secs: 180,
            cooldown_secs: 180,
            request_timeout_secs: 20,
            quiet: false,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: String::from("0.0.0.0"),
            port: 8765,
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

fn env_parsed<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse::<T>().ok())
}

impl Config {
    /// Load configuration from environment variables
    ///
    /// Unset or unparsable variables keep their defaults.
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let service_page_url = std::env::var("SLOTWATCH_SERVICE_URL")
            .unwrap_or(defaults.target.service_page_url);

        let booking_base_url = std::env::var("SLOTWATCH_BOOKING_BASE_URL")
            .unwrap_or(defaults.target.booking_base_url);

        let timezone =
            std::env::var("SLOTWATCH_TIMEZONE").unwrap_or(defaults.target.timezone);

        let base_interval_secs = env_parsed("SLOTWATCH_BASE_INTERVAL")
            .unwrap_or(defaults.poll.base_interval_secs);

        let cooldown_secs =
            env_parsed("SLOTWATCH_COOLDOWN").unwrap_or(defaults.poll.cooldown_secs);

        let request_timeout_secs = env_parsed("SLOTWATCH_REQUEST_TIMEOUT")
            .unwrap_or(defaults.poll.request_timeout_secs);

        let quiet = env_parsed("SLOTWATCH_QUIET").unwrap_or(defaults.poll.quiet);

        let host = std::env::var("SLOTWATCH_HOST").unwrap_or(defaults.server.host);

        let port = env_parsed("SLOTWATCH_PORT").unwrap_or(defaults.server.port);

        let file = std::env::var("SLOTWATCH_PROXIES").ok().map(PathBuf::from);

        let log_level =
            std::env::var("SLOTWATCH_LOG_LEVEL").unwrap_or(defaults.logging.level);

        let log_format =
            std::env::var("SLOTWATCH_LOG_FORMAT").unwrap_or(defaults.logging.format);

        Ok(Self {
            target: TargetConfig {
                service_page_url,
                booking_base_url,
                timezone,
            },
            poll: PollConfig {
                base_interval_secs,
                cooldown_secs,
                request_timeout_secs,
                quiet,
            },
            server: ServerConfig { host, port },
            identities: IdentityConfig { file },
            logging: LoggingConfig {
                level: log_level,
                format: log_format,
            },
        })
    }

    /// Load configuration from a file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse TOML config file: {}", path.display()))?;

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.target.service_page_url.trim().is_empty() {
            anyhow::bail!("service page URL is required");
        }

        if self.poll.base_interval_secs == 0 {
            anyhow::bail!("base_interval_secs must be greater than 0");
        }

        if self.poll.request_timeout_secs == 0 {
            anyhow::bail!("request_timeout_secs must be greater than 0");
        }

        self.timezone()?;
        self.bind_address()?;

        Ok(())
    }

    /// Parsed timezone of the booking service
    pub fn timezone(&self) -> Result<Tz> {
        self.target
            .timezone
            .parse::<Tz>()
            .map_err(|e| anyhow::anyhow!("Unknown timezone '{}': {e}", self.target.timezone))
    }

    /// Address the subscriber server binds to
    pub fn bind_address(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.server.host, self.server.port)
            .parse::<SocketAddr>()
            .with_context(|| format!("Invalid listen address {}", self.server.host))
    }

    /// Get base interval as Duration
    #[must_use]
    pub fn base_interval(&self) -> Duration {
        Duration::from_secs(self.poll.base_interval_secs)
    }

    /// Get identity cooldown as Duration
    #[must_use]
    pub fn cooldown(&self) -> Duration {
        Duration::from_secs(self.poll.cooldown_secs)
    }

    /// Get request timeout as Duration
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.poll.request_timeout_secs)
    }
}
