//! Configuration loading and typed config structures for the Netsim kernel.
//!
//! The canonical configuration lives in `netsim-config.yaml` at the project
//! root. Every section and field has a default, so an empty file (or no file
//! at all) yields a playable session.

use std::path::Path;

use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use netsim_economy::EconomyPolicy;
use netsim_missions::PoolConfig;
use rust_decimal::Decimal;
use serde::Deserialize;

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

    /// A value is out of range.
    #[error("invalid configuration: {reason}")]
    Invalid {
        /// What is wrong.
        reason: String,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level kernel configuration, mirroring `netsim-config.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SimulationConfig {
    /// Player identity and session seed.
    #[serde(default)]
    pub session: SessionConfig,

    /// Clock speed settings.
    #[serde(default)]
    pub clock: ClockConfig,

    /// Local hardware.
    #[serde(default)]
    pub hardware: HardwareConfig,

    /// Bank and bankruptcy tunables.
    #[serde(default)]
    pub economy: EconomyConfig,

    /// Reputation tunables.
    #[serde(default)]
    pub reputation: ReputationConfig,

    /// Mission pool tunables.
    #[serde(default)]
    pub missions: PoolConfig,

    /// Observer HTTP server.
    #[serde(default)]
    pub observer: ObserverConfig,

    /// Logging.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl SimulationConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// Environment variables override YAML values:
    /// - `NETSIM_OBSERVER_PORT` overrides `observer.port`
    /// - `NETSIM_SEED` overrides `session.seed`
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read,
    /// [`ConfigError::Yaml`] if the content is not valid YAML, and
    /// [`ConfigError::Invalid`] if a value is out of range.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse configuration from a YAML string, apply environment overrides
    /// and validate.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] or [`ConfigError::Invalid`].
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let mut config: Self = if yaml.trim().is_empty() {
            Self::default()
        } else {
            serde_yml::from_str(yaml)?
        };
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Override selected values with environment variables when set and
    /// parseable.
    pub fn apply_env_overrides(&mut self) {
        if let Some(port) = std::env::var("NETSIM_OBSERVER_PORT")
            .ok()
            .and_then(|val| val.parse().ok())
        {
            self.observer.port = port;
        }
        if let Some(seed) = std::env::var("NETSIM_SEED")
            .ok()
            .and_then(|val| val.parse().ok())
        {
            self.session.seed = seed;
        }
    }

    /// Reject values the kernel cannot run with.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] describing the first bad value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |reason: &str| {
            Err(ConfigError::Invalid {
                reason: reason.to_owned(),
            })
        };

        if self.clock.allowed_speeds.is_empty() || self.clock.allowed_speeds.contains(&0) {
            return invalid("clock.allowed_speeds must be non-empty and non-zero");
        }
        if !self.clock.allowed_speeds.contains(&self.clock.default_speed) {
            return invalid("clock.default_speed must be one of clock.allowed_speeds");
        }
        if !self.hardware.adapter_mbps.is_finite() || self.hardware.adapter_mbps <= 0.0 {
            return invalid("hardware.adapter_mbps must be positive");
        }
        if self.economy.bankruptcy_threshold >= Decimal::ZERO {
            return invalid("economy.bankruptcy_threshold must be negative");
        }
        if self.economy.approaching_threshold <= self.economy.bankruptcy_threshold {
            return invalid("economy.approaching_threshold must lie above the bankruptcy threshold");
        }
        if self.economy.interest_interval_secs == 0 {
            return invalid("economy.interest_interval_secs must be at least 1");
        }
        if !(1..=11).contains(&self.reputation.starting_tier) {
            return invalid("reputation.starting_tier must be within 1..=11");
        }
        for (name, target) in [
            ("missions.standard", &self.missions.standard),
            ("missions.advanced", &self.missions.advanced),
        ] {
            if target.min > target.max || target.max == 0 {
                return Err(ConfigError::Invalid {
                    reason: format!("{name}: min must not exceed max and max must be positive"),
                });
            }
            if !(0.0..=1.0).contains(&target.investigation_chance) {
                return Err(ConfigError::Invalid {
                    reason: format!("{name}: investigation_chance must be within 0..=1"),
                });
            }
        }
        if self.missions.expiry_min_minutes > self.missions.expiry_max_minutes {
            return invalid("missions.expiry_min_minutes must not exceed expiry_max_minutes");
        }
        if !(0.0..=1.0).contains(&self.missions.arc_chance) {
            return invalid("missions.arc_chance must be within 0..=1");
        }
        Ok(())
    }

    /// Economy tunables in the form the economy crate consumes.
    pub fn economy_policy(&self) -> EconomyPolicy {
        EconomyPolicy {
            bankruptcy_threshold: self.economy.bankruptcy_threshold,
            approaching_threshold: self.economy.approaching_threshold,
            bankruptcy_countdown: TimeDelta::minutes(i64::from(
                self.economy.bankruptcy_countdown_minutes,
            )),
            termination_countdown: TimeDelta::minutes(i64::from(
                self.reputation.termination_countdown_minutes,
            )),
            interest_rate: self.economy.interest_rate,
            interest_interval: TimeDelta::seconds(i64::from(self.economy.interest_interval_secs)),
        }
    }
}

/// Player identity and reproducibility.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SessionConfig {
    /// Player username.
    #[serde(default = "default_username")]
    pub username: String,

    /// Seed for mission generation.
    #[serde(default = "default_seed")]
    pub seed: u64,

    /// Virtual start instant.
    #[serde(default = "default_start_time")]
    pub start_time: DateTime<Utc>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            username: default_username(),
            seed: default_seed(),
            start_time: default_start_time(),
        }
    }
}

impl SessionConfig {
    /// Mail address derived from the username.
    pub fn mail_id(&self) -> String {
        format!("{}@sourcenet.local", self.username)
    }
}

/// Clock speed settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ClockConfig {
    /// Speed multiplier at session start.
    #[serde(default = "default_speed")]
    pub default_speed: u32,

    /// Multipliers the player may select.
    #[serde(default = "default_allowed_speeds")]
    pub allowed_speeds: Vec<u32>,
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            default_speed: default_speed(),
            allowed_speeds: default_allowed_speeds(),
        }
    }
}

/// Local hardware.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct HardwareConfig {
    /// Local network adapter speed in Mbps.
    #[serde(default = "default_adapter_mbps")]
    pub adapter_mbps: f64,
}

impl Default for HardwareConfig {
    fn default() -> Self {
        Self {
            adapter_mbps: default_adapter_mbps(),
        }
    }
}

/// Bank and bankruptcy tunables.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EconomyConfig {
    /// Opening balance of the primary account.
    #[serde(default = "default_starting_balance")]
    pub starting_balance: Decimal,

    /// Name of the bank holding the primary account.
    #[serde(default = "default_bank_name")]
    pub bank_name: String,

    /// Total balance strictly below which the bankruptcy countdown starts.
    #[serde(default = "default_bankruptcy_threshold")]
    pub bankruptcy_threshold: Decimal,

    /// Total balance strictly below which the approaching notice fires.
    #[serde(default = "default_approaching_threshold")]
    pub approaching_threshold: Decimal,

    /// Length of the bankruptcy countdown in virtual minutes.
    #[serde(default = "default_bankruptcy_countdown_minutes")]
    pub bankruptcy_countdown_minutes: u32,

    /// Overdraft interest per interval.
    #[serde(default = "default_interest_rate")]
    pub interest_rate: Decimal,

    /// Interest interval in virtual seconds.
    #[serde(default = "default_interest_interval_secs")]
    pub interest_interval_secs: u32,

    /// Virtual seconds between queued message deliveries.
    #[serde(default = "default_message_gap_secs")]
    pub message_gap_secs: u32,
}

impl Default for EconomyConfig {
    fn default() -> Self {
        Self {
            starting_balance: default_starting_balance(),
            bank_name: default_bank_name(),
            bankruptcy_threshold: default_bankruptcy_threshold(),
            approaching_threshold: default_approaching_threshold(),
            bankruptcy_countdown_minutes: default_bankruptcy_countdown_minutes(),
            interest_rate: default_interest_rate(),
            interest_interval_secs: default_interest_interval_secs(),
            message_gap_secs: default_message_gap_secs(),
        }
    }
}

/// Reputation tunables.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ReputationConfig {
    /// Tier at session start.
    #[serde(default = "default_starting_tier")]
    pub starting_tier: u8,

    /// Length of the termination countdown in virtual minutes.
    #[serde(default = "default_termination_countdown_minutes")]
    pub termination_countdown_minutes: u32,
}

impl Default for ReputationConfig {
    fn default() -> Self {
        Self {
            starting_tier: default_starting_tier(),
            termination_countdown_minutes: default_termination_countdown_minutes(),
        }
    }
}

/// Observer HTTP server.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ObserverConfig {
    /// Bind address.
    #[serde(default = "default_observer_host")]
    pub host: String,

    /// Bind port.
    #[serde(default = "default_observer_port")]
    pub port: u16,
}

impl Default for ObserverConfig {
    fn default() -> Self {
        Self {
            host: default_observer_host(),
            port: default_observer_port(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error), used when `RUST_LOG`
    /// is unset.
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
// Default value functions for serde
// ---------------------------------------------------------------------------

fn default_username() -> String {
    "operator".to_owned()
}

const fn default_seed() -> u64 {
    42
}

fn default_start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2020, 3, 25, 9, 0, 0)
        .single()
        .unwrap_or_default()
}

const fn default_speed() -> u32 {
    1
}

fn default_allowed_speeds() -> Vec<u32> {
    vec![1, 2, 5, 10]
}

const fn default_adapter_mbps() -> f64 {
    250.0
}

fn default_starting_balance() -> Decimal {
    Decimal::from(1000)
}

fn default_bank_name() -> String {
    "First Bank Ltd".to_owned()
}

fn default_bankruptcy_threshold() -> Decimal {
    Decimal::from(-10_000)
}

fn default_approaching_threshold() -> Decimal {
    Decimal::from(-8_000)
}

const fn default_bankruptcy_countdown_minutes() -> u32 {
    5
}

const fn default_interest_rate() -> Decimal {
    Decimal::from_parts(1, 0, 0, false, 2)
}

const fn default_interest_interval_secs() -> u32 {
    60
}

const fn default_message_gap_secs() -> u32 {
    5
}

const fn default_starting_tier() -> u8 {
    9
}

const fn default_termination_countdown_minutes() -> u32 {
    10
}

fn default_observer_host() -> String {
    "127.0.0.1".to_owned()
}

const fn default_observer_port() -> u16 {
    8080
}

fn default_log_level() -> String {
    "info".to_owned()
}
