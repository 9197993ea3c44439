//! Configuration loading and typed config structures.
//!
//! The canonical configuration lives in `nuclick-config.yaml` at the project
//! root (the path can be overridden with `NUCLICK_CONFIG`). Every field has a
//! default, so an absent file or an empty section yields a working setup.
//! A handful of deployment settings can be overridden from the environment:
//!
//! - `DATABASE_URL` sets `database.url` (empty means the in-memory store)
//! - `PORT` sets `server.port`
//! - `GAME_START_DATE` sets `game.start_date` (RFC 3339)

use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use serde::Deserialize;

use crate::clock::RoundClock;

/// Name of the environment variable that points at the config file.
pub const CONFIG_PATH_ENV: &str = "NUCLICK_CONFIG";

/// Config file used when `NUCLICK_CONFIG` is not set.
pub const DEFAULT_CONFIG_PATH: &str = "nuclick-config.yaml";

/// Upper bound for the `top_limit` setting and the `?limit=` query.
pub const MAX_TOP_LIMIT: usize = 100;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// A value parsed but is out of range or inconsistent.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level configuration.
///
/// Mirrors the structure of `nuclick-config.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct NuclickConfig {
    /// Game calendar and seeding.
    #[serde(default)]
    pub game: GameConfig,

    /// HTTP server settings.
    #[serde(default)]
    pub server: ServerSettings,

    /// Daily trigger settings.
    #[serde(default)]
    pub scheduler: SchedulerConfig,

    /// Persistence settings.
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl NuclickConfig {
    /// Load configuration from a YAML file, apply environment overrides
    /// and validate.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read,
    /// [`ConfigError::Yaml`] if the content is not valid YAML, or
    /// [`ConfigError::Invalid`] if a value is out of range.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let mut config = Self::parse(&contents)?;
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Load from `NUCLICK_CONFIG` or `nuclick-config.yaml`. A missing file
    /// falls back to defaults; environment overrides apply either way.
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.into());
        let path = Path::new(&path);
        if path.exists() {
            return Self::from_file(path);
        }
        let mut config = Self::default();
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Parse and validate configuration from a YAML string. Environment
    /// overrides are not applied.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML, or
    /// [`ConfigError::Invalid`] if a value is out of range.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = if yaml.trim().is_empty() {
            Self::default()
        } else {
            serde_yml::from_str(yaml)?
        };
        config.validate()?;
        Ok(config)
    }

    /// Apply `DATABASE_URL`, `PORT` and `GAME_START_DATE` from the process
    /// environment.
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary lookup, then re-validate.
    pub fn apply_overrides_from<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("DATABASE_URL") {
            let url = url.trim();
            self.database.url = (!url.is_empty()).then(|| url.to_owned());
        }
        if let Some(port) = lookup("PORT") {
            self.server.port = port
                .trim()
                .parse()
                .map_err(|e| ConfigError::Invalid(format!("PORT={port:?}: {e}")))?;
        }
        if let Some(raw) = lookup("GAME_START_DATE") {
            self.game.start_date = DateTime::parse_from_rfc3339(raw.trim())
                .map_err(|e| ConfigError::Invalid(format!("GAME_START_DATE={raw:?}: {e}")))?
                .with_timezone(&Utc);
        }
        self.validate()
    }

    /// Check cross-field constraints.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.game.daily_trigger_hour_utc > 23 {
            return Err(ConfigError::Invalid(format!(
                "game.daily_trigger_hour_utc must be 0..=23, got {}",
                self.game.daily_trigger_hour_utc
            )));
        }
        if self.game.daily_trigger_minute_utc > 59 {
            return Err(ConfigError::Invalid(format!(
                "game.daily_trigger_minute_utc must be 0..=59, got {}",
                self.game.daily_trigger_minute_utc
            )));
        }
        if self.game.top_limit == 0 || self.game.top_limit > MAX_TOP_LIMIT {
            return Err(ConfigError::Invalid(format!(
                "game.top_limit must be 1..={MAX_TOP_LIMIT}, got {}",
                self.game.top_limit
            )));
        }
        if self.server.request_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "server.request_timeout_ms must be positive".into(),
            ));
        }
        if self.scheduler.round_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "scheduler.round_timeout_ms must be positive".into(),
            ));
        }
        if self.database.max_connections == 0 {
            return Err(ConfigError::Invalid(
                "database.max_connections must be positive".into(),
            ));
        }
        for seed in &self.game.seed_provinces {
            nuclick_types::NewProvince::new(&seed.name, &seed.color_hex).map_err(|e| {
                ConfigError::Invalid(format!("game.seed_provinces entry {:?}: {e}", seed.name))
            })?;
        }
        Ok(())
    }

    /// Build the round clock described by the `game` section.
    pub fn round_clock(&self) -> Result<RoundClock, ConfigError> {
        RoundClock::new(
            self.game.start_date,
            self.game.daily_trigger_hour_utc,
            self.game.daily_trigger_minute_utc,
        )
        .map_err(|e| ConfigError::Invalid(e.to_string()))
    }
}

/// Game calendar and seeding.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GameConfig {
    /// Instant the game started. Round 0 runs until the first trigger on
    /// the following UTC day.
    #[serde(default = "default_start_date")]
    pub start_date: DateTime<Utc>,

    /// Hour of the daily trigger, UTC.
    #[serde(default = "default_trigger_hour")]
    pub daily_trigger_hour_utc: u32,

    /// Minute of the daily trigger, UTC.
    #[serde(default)]
    pub daily_trigger_minute_utc: u32,

    /// Default size of the "top provinces" list.
    #[serde(default = "default_top_limit")]
    pub top_limit: usize,

    /// Provinces inserted at startup when the store is empty.
    #[serde(default)]
    pub seed_provinces: Vec<SeedProvince>,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            start_date: default_start_date(),
            daily_trigger_hour_utc: default_trigger_hour(),
            daily_trigger_minute_utc: 0,
            top_limit: default_top_limit(),
            seed_provinces: Vec::new(),
        }
    }
}

/// A province to create at startup.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SeedProvince {
    /// Display name.
    pub name: String,
    /// Colour, `#RRGGBB` or `RRGGBB`.
    pub color_hex: String,
}

/// HTTP server settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ServerSettings {
    /// Bind address.
    #[serde(default = "default_host")]
    pub host: String,

    /// Bind port.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Deadline for each storage call made by a request handler.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// Whether `POST /api/province/round/execute` is allowed.
    #[serde(default = "default_true")]
    pub enable_manual_round: bool,
}

impl ServerSettings {
    /// Per-request storage deadline.
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            request_timeout_ms: default_request_timeout_ms(),
            enable_manual_round: true,
        }
    }
}

/// Daily trigger settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SchedulerConfig {
    /// Whether the daily trigger runs in this process.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Deadline for one round transition.
    #[serde(default = "default_round_timeout_ms")]
    pub round_timeout_ms: u64,
}

impl SchedulerConfig {
    /// Deadline for one round transition.
    pub const fn round_timeout(&self) -> Duration {
        Duration::from_millis(self.round_timeout_ms)
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            round_timeout_ms: default_round_timeout_ms(),
        }
    }
}

/// Persistence settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DatabaseConfig {
    /// `PostgreSQL` connection URL. `None` selects the in-memory store.
    #[serde(default)]
    pub url: Option<String>,

    /// Connection pool size.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: default_max_connections(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Log level used when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output.
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

// ---------------------------------------------------------------------------
// Default value functions
// ---------------------------------------------------------------------------

fn default_start_date() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0)
        .single()
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
}

const fn default_trigger_hour() -> u32 {
    14
}

const fn default_top_limit() -> usize {
    crate::ranking::DEFAULT_TOP_LIMIT
}

fn default_host() -> String {
    "0.0.0.0".into()
}

const fn default_port() -> u16 {
    8080
}

const fn default_request_timeout_ms() -> u64 {
    5_000
}

const fn default_round_timeout_ms() -> u64 {
    10_000
}

const fn default_max_connections() -> u32 {
    10
}

fn default_log_level() -> String {
    "info".into()
}

const fn default_true() -> bool {
    true
}
