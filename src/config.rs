//! Application configuration loading and validation.
//!
//! Configuration is loaded from a TOML file. Each `[exchanges.<name>]`
//! section configures one polling loop.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use tracing_subscriber::{fmt, EnvFilter};

use crate::error::{ConfigError, Result};
use crate::port::store::RetentionPolicy;
use crate::retry::Backoff;
use crate::scheduler::PollerConfig;

#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    /// One entry per polled exchange, keyed by exchange name.
    #[serde(default)]
    pub exchanges: BTreeMap<String, ExchangeConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter, e.g. `info` or `refsync=debug`.
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Emit JSON log lines instead of human-readable ones.
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    /// SQLite database path.
    #[serde(default = "default_database")]
    pub database: String,
    /// Generations retained for audit/rollback.
    #[serde(default = "default_retention")]
    pub retention: usize,
    /// Seconds an out-of-window generation survives before collection.
    #[serde(default = "default_grace_secs")]
    pub grace_secs: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database: default_database(),
            retention: default_retention(),
            grace_secs: default_grace_secs(),
        }
    }
}

fn default_database() -> String {
    "refdata.db".to_string()
}

fn default_retention() -> usize {
    16
}

fn default_grace_secs() -> u64 {
    60
}

impl StoreConfig {
    pub fn retention_policy(&self) -> RetentionPolicy {
        RetentionPolicy {
            keep: self.retention,
            grace: Duration::from_secs(self.grace_secs),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SchedulerConfig {
    /// Adapter retries per cycle, on top of the first attempt.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,
    #[serde(default = "default_backoff_factor")]
    pub backoff_factor: f64,
    #[serde(default = "default_backoff_max_ms")]
    pub backoff_max_ms: u64,
    /// Last-successful-refresh age after which a source is stale.
    #[serde(default = "default_stale_after_secs")]
    pub stale_after_secs: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            backoff_base_ms: default_backoff_base_ms(),
            backoff_factor: default_backoff_factor(),
            backoff_max_ms: default_backoff_max_ms(),
            stale_after_secs: default_stale_after_secs(),
        }
    }
}

fn default_max_retries() -> u32 {
    4
}

fn default_backoff_base_ms() -> u64 {
    200
}

fn default_backoff_factor() -> f64 {
    2.0
}

fn default_backoff_max_ms() -> u64 {
    3000
}

fn default_stale_after_secs() -> u64 {
    300
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExchangeConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    /// Optional allowlist of symbols; empty polls the full listing.
    #[serde(default)]
    pub symbols: Vec<String>,
    /// Per-request timeout for the exchange's HTTP API.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            poll_interval_secs: default_poll_interval_secs(),
            symbols: Vec::new(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

const fn default_true() -> bool {
    true
}

fn default_poll_interval_secs() -> u64 {
    60
}

fn default_request_timeout_secs() -> u64 {
    10
}

impl Config {
    /// Load and validate configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(ConfigError::ReadFile)?;
        let config: Config = toml::from_str(&raw).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        if self.store.database.trim().is_empty() {
            return Err(ConfigError::MissingField {
                field: "store.database",
            });
        }
        if self.store.retention == 0 {
            return Err(ConfigError::InvalidValue {
                field: "store.retention",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.scheduler.backoff_factor < 1.0 {
            return Err(ConfigError::InvalidValue {
                field: "scheduler.backoff_factor",
                reason: "must be >= 1.0".to_string(),
            });
        }
        for (name, exchange) in &self.exchanges {
            if exchange.enabled && exchange.poll_interval_secs == 0 {
                return Err(ConfigError::InvalidValue {
                    field: "exchanges.poll_interval_secs",
                    reason: format!("exchange '{name}' must poll at a nonzero interval"),
                });
            }
        }
        Ok(())
    }

    /// Poller parameters for one exchange, combining the shared scheduler
    /// section with the exchange's own cadence.
    pub fn poller_config(&self, exchange: &ExchangeConfig) -> PollerConfig {
        PollerConfig {
            interval: Duration::from_secs(exchange.poll_interval_secs),
            max_retries: self.scheduler.max_retries,
            backoff: Backoff {
                base: Duration::from_millis(self.scheduler.backoff_base_ms),
                factor: self.scheduler.backoff_factor,
                max: Duration::from_millis(self.scheduler.backoff_max_ms),
                jitter: true,
            },
            stale_after: Duration::from_secs(self.scheduler.stale_after_secs),
        }
    }

    /// Names of exchanges that will actually be polled.
    pub fn enabled_exchanges(&self) -> Vec<&str> {
        self.exchanges
            .iter()
            .filter(|(_, e)| e.enabled)
            .map(|(name, _)| name.as_str())
            .collect()
    }
}

/// Initialize the tracing subscriber from the logging section.
pub fn init_logging(config: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level.clone()));

    if config.json {
        fmt().with_env_filter(filter).json().init();
    } else {
        fmt().with_env_filter(filter).init();
    }
}
