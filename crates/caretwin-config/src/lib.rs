//! Configuration for the caretwin bridge.
//!
//! A single TOML file with environment-variable overrides, loaded once at
//! startup and validated before any component is constructed. Every
//! section has working defaults; an absent file configures a default
//! bridge.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use tracing::info;

/// Error types for configuration operations
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Validation error: {0}")]
    Validation(String),
}

impl ConfigError {
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}

/// Result type for configuration operations
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Top-level bridge configuration.
#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct BridgeConfig {
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub timeouts: TimeoutConfig,
    #[serde(default)]
    pub timers: TimerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Identity mapping cache settings.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct CacheConfig {
    /// Time-to-live for name/identity mappings, in days.
    #[serde(default = "default_identity_ttl_days")]
    pub identity_ttl_days: u64,
}

/// Budgets for the blocking collaborator calls.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct TimeoutConfig {
    /// Budget for one room directory lookup, in milliseconds.
    #[serde(default = "default_directory_lookup_ms")]
    pub directory_lookup_ms: u64,
    /// Budget for one resource broker lookup, in milliseconds.
    #[serde(default = "default_broker_lookup_ms")]
    pub broker_lookup_ms: u64,
    /// Budget for one behaviour invocation, in milliseconds.
    #[serde(default = "default_behaviour_ms")]
    pub behaviour_ms: u64,
}

/// Timer-based behaviour scheduling.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct TimerConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Heartbeat period, in seconds.
    #[serde(default = "default_heartbeat_period_secs")]
    pub heartbeat_period_secs: u64,
}

/// Logging settings applied by the binary.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_identity_ttl_days() -> u64 {
    30
}

fn default_directory_lookup_ms() -> u64 {
    5_000
}

fn default_broker_lookup_ms() -> u64 {
    5_000
}

fn default_behaviour_ms() -> u64 {
    30_000
}

fn default_heartbeat_period_secs() -> u64 {
    300
}

fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            identity_ttl_days: default_identity_ttl_days(),
        }
    }
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            directory_lookup_ms: default_directory_lookup_ms(),
            broker_lookup_ms: default_broker_lookup_ms(),
            behaviour_ms: default_behaviour_ms(),
        }
    }
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            heartbeat_period_secs: default_heartbeat_period_secs(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

const VALID_LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

impl BridgeConfig {
    /// Load configuration.
    ///
    /// With `Some(path)` the file must exist and parse; with `None` the
    /// defaults apply. Environment overrides (`CARETWIN_*`) are applied
    /// after the file, then the whole configuration is validated.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => {
                let raw = std::fs::read_to_string(path)?;
                toml::from_str(&raw).map_err(|e| ConfigError::parse(e.to_string()))?
            }
            None => Self::default(),
        };
        config.apply_env_overrides();
        config.validate()?;
        info!(
            identity_ttl_days = config.cache.identity_ttl_days,
            heartbeat_period_secs = config.timers.heartbeat_period_secs,
            "Configuration loaded"
        );
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Some(days) = env_u64("CARETWIN_IDENTITY_TTL_DAYS") {
            self.cache.identity_ttl_days = days;
        }
        if let Some(ms) = env_u64("CARETWIN_DIRECTORY_LOOKUP_MS") {
            self.timeouts.directory_lookup_ms = ms;
        }
        if let Some(ms) = env_u64("CARETWIN_BEHAVIOUR_MS") {
            self.timeouts.behaviour_ms = ms;
        }
        if let Ok(level) = std::env::var("CARETWIN_LOG_LEVEL") {
            self.logging.level = level;
        }
    }

    /// Reject configurations no component could run with.
    pub fn validate(&self) -> Result<()> {
        if self.cache.identity_ttl_days == 0 {
            return Err(ConfigError::validation("cache.identity_ttl_days must be positive"));
        }
        for (value, name) in [
            (self.timeouts.directory_lookup_ms, "timeouts.directory_lookup_ms"),
            (self.timeouts.broker_lookup_ms, "timeouts.broker_lookup_ms"),
            (self.timeouts.behaviour_ms, "timeouts.behaviour_ms"),
        ] {
            if value == 0 {
                return Err(ConfigError::validation(format!("{name} must be positive")));
            }
        }
        if self.timers.enabled && self.timers.heartbeat_period_secs == 0 {
            return Err(ConfigError::validation(
                "timers.heartbeat_period_secs must be positive while timers are enabled",
            ));
        }
        if !VALID_LOG_LEVELS.contains(&self.logging.level.as_str()) {
            return Err(ConfigError::validation(format!(
                "logging.level must be one of {VALID_LOG_LEVELS:?}, got {:?}",
                self.logging.level
            )));
        }
        Ok(())
    }

    pub fn identity_ttl(&self) -> Duration {
        Duration::from_secs(self.cache.identity_ttl_days * 24 * 60 * 60)
    }

    pub fn directory_budget(&self) -> Duration {
        Duration::from_millis(self.timeouts.directory_lookup_ms)
    }

    pub fn broker_budget(&self) -> Duration {
        Duration::from_millis(self.timeouts.broker_lookup_ms)
    }

    pub fn behaviour_budget(&self) -> Duration {
        Duration::from_millis(self.timeouts.behaviour_ms)
    }

    pub fn heartbeat_period(&self) -> Duration {
        Duration::from_secs(self.timers.heartbeat_period_secs)
    }
}

fn env_u64(name: &str) -> Option<u64> {
    std::env::var(name).ok().and_then(|raw| raw.parse().ok())
}
