//! Configuration file structures for the Howl bot.
//!
//! The configuration is read from a YAML file and merged with `HOWL_`
//! prefixed environment variables, `__` separating nested keys.
//!
//! # Configuration File Format
//!
//! ```yaml
//! bot:
//!   # Prefix every command starts with
//!   prefix: "w."
//!   # Reply to unknown commands with a help hint (`hint`) or ignore them (`silent`)
//!   unknown_command: hint
//!   # Users allowed to cancel or start any session
//!   privileged_users:
//!     - "@admin:example.org"
//!
//! session:
//!   min_players: 3
//!   max_players: 20
//!   # Seconds without activity before a signup is reclaimed
//!   idle_timeout: 1800
//!   # Seconds between two idle sweeps
//!   sweep_interval: 60
//!   # Announce reclaimed signups in their channel
//!   notify_on_idle: true
//!   # Seconds granted to the rules engine to set a game up
//!   start_timeout: 10
//!
//! rules_engine:
//!   url: "http://localhost:8080"
//!   # Seconds between two polls of running games
//!   polling_interval: 30
//!   # Seconds granted to each game outcome request of a poll
//!   poll_timeout: 10
//!
//! matrix:
//!   user_id: "@howl:example.org"
//!   password: "secret-password"
//!   # Encrypts the local store
//!   passphrase: "store-passphrase"
//! ```
//!
//! # Environment Variable Overrides
//!
//! ```bash
//! export HOWL_MATRIX__PASSWORD="secret-from-env"
//! export HOWL_SESSION__MIN_PLAYERS=5
//! ```

use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Yaml},
};
use serde::Deserialize;
use thiserror::Error;

use crate::sessions::PlayerLimits;

/// Root configuration structure for the Howl bot.
#[derive(Deserialize, Debug)]
pub struct Config {
    /// Command handling settings
    #[serde(default)]
    pub bot: Bot,
    /// Session lifecycle settings
    #[serde(default)]
    pub session: Session,
    /// Rules engine connection settings
    pub rules_engine: RulesEngine,
    /// Matrix account configuration
    pub matrix: Matrix,
}

/// Reaction to a message using the prefix with an unknown command name.
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum UnknownCommandPolicy {
    /// Ignore the message
    Silent,
    /// Reply with a pointer to the help command
    #[default]
    Hint,
}

#[derive(Deserialize, Debug)]
pub struct Bot {
    #[serde(default = "default_prefix")]
    pub prefix: String,
    #[serde(default)]
    pub unknown_command: UnknownCommandPolicy,
    /// Users allowed to cancel or start any session
    #[serde(default)]
    pub privileged_users: Vec<String>,
}

impl Default for Bot {
    fn default() -> Self {
        Bot {
            prefix: default_prefix(),
            unknown_command: UnknownCommandPolicy::default(),
            privileged_users: Vec::new(),
        }
    }
}

/// Session lifecycle settings, durations in seconds.
#[derive(Deserialize, Debug)]
pub struct Session {
    #[serde(default = "default_min_players")]
    pub min_players: usize,
    #[serde(default = "default_max_players")]
    pub max_players: usize,
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout: u64,
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval: u64,
    #[serde(default = "default_notify_on_idle")]
    pub notify_on_idle: bool,
    #[serde(default = "default_start_timeout")]
    pub start_timeout: u64,
}

impl Default for Session {
    fn default() -> Self {
        Session {
            min_players: default_min_players(),
            max_players: default_max_players(),
            idle_timeout: default_idle_timeout(),
            sweep_interval: default_sweep_interval(),
            notify_on_idle: default_notify_on_idle(),
            start_timeout: default_start_timeout(),
        }
    }
}

impl Session {
    pub fn limits(&self) -> PlayerLimits {
        PlayerLimits {
            min: self.min_players,
            max: self.max_players,
        }
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval)
    }

    pub fn start_timeout(&self) -> Duration {
        Duration::from_secs(self.start_timeout)
    }
}

/// Rules engine connection settings.
#[derive(Deserialize, Debug)]
pub struct RulesEngine {
    /// Base URL of the rules engine, e.g. `http://localhost:8080`
    pub url: String,
    /// Seconds between two polls of running games
    #[serde(default = "default_polling_interval")]
    pub polling_interval: u64,
    /// Seconds granted to each game outcome request of a poll
    #[serde(default = "default_poll_timeout")]
    pub poll_timeout: u64,
}

impl RulesEngine {
    pub fn polling_interval(&self) -> Duration {
        Duration::from_secs(self.polling_interval)
    }

    pub fn poll_timeout(&self) -> Duration {
        Duration::from_secs(self.poll_timeout)
    }
}

/// Matrix account configuration.
#[derive(Deserialize, Debug)]
pub struct Matrix {
    /// Fully qualified Matrix user ID, e.g. `@howl:example.org`
    pub user_id: String,
    /// Used for the first login, the session is persisted afterwards
    pub password: String,
    /// Encrypts the local sqlite store
    pub passphrase: String,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(transparent)]
    Parse(#[from] figment::Error),
    #[error("invalid player limits: min {min}, max {max}")]
    InvalidLimits { min: usize, max: usize },
    #[error("{0} must be greater than 0")]
    ZeroInterval(&'static str),
}

impl Config {
    /// Loads the configuration from the YAML file at `path` and the
    /// environment, then validates it.
    pub fn load(path: &str) -> Result<Self, ConfigError> {
        let config: Config = Figment::new()
            .merge(Yaml::file(path))
            .merge(Env::prefixed("HOWL_").split("__"))
            .extract()?;

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let PlayerLimits { min, max } = self.session.limits();
        if min == 0 || max < min {
            return Err(ConfigError::InvalidLimits { min, max });
        }

        // `tokio::time::interval` panics on a zero period
        if self.session.sweep_interval == 0 {
            return Err(ConfigError::ZeroInterval("session.sweep_interval"));
        }
        if self.rules_engine.polling_interval == 0 {
            return Err(ConfigError::ZeroInterval("rules_engine.polling_interval"));
        }

        // A zero timeout expires before any engine call or signup can complete
        if self.session.idle_timeout == 0 {
            return Err(ConfigError::ZeroInterval("session.idle_timeout"));
        }
        if self.session.start_timeout == 0 {
            return Err(ConfigError::ZeroInterval("session.start_timeout"));
        }
        if self.rules_engine.poll_timeout == 0 {
            return Err(ConfigError::ZeroInterval("rules_engine.poll_timeout"));
        }

        Ok(())
    }
}

fn default_prefix() -> String {
    "w.".to_owned()
}

fn default_min_players() -> usize {
    3
}

fn default_max_players() -> usize {
    20
}

fn default_idle_timeout() -> u64 {
    30 * 60
}

fn default_sweep_interval() -> u64 {
    60
}

fn default_notify_on_idle() -> bool {
    true
}

fn default_start_timeout() -> u64 {
    10
}

fn default_polling_interval() -> u64 {
    30
}

fn default_poll_timeout() -> u64 {
    10
}
