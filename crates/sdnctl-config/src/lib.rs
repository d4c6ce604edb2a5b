//! Shared configuration for the sdnctl CLI.
//!
//! TOML file plus `SDNCTL_*` environment overrides, validation, and
//! translation to `sdnctl_core::ControllerConfig`. The engine itself
//! never reads files; this crate is the only place that does.

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use sdnctl_core::ControllerConfig;

/// Prefix for environment overrides, e.g. `SDNCTL_REFRESH_INTERVAL_SECS`.
pub const ENV_PREFIX: &str = "SDNCTL_";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config ─────────────────────────────────────────────────────

/// Log output format selected in the config file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Top-level TOML configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Config {
    /// Seconds between scheduled reconciliation cycles; 0 disables them.
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval_secs: u64,

    /// Upper bound for each switch query.
    #[serde(default = "default_timeout")]
    pub query_timeout_secs: u64,

    /// Upper bound for each flow or meter mod.
    #[serde(default = "default_timeout")]
    pub command_timeout_secs: u64,

    /// Grace period before a disconnected switch is forgotten.
    #[serde(default = "default_disconnect_timeout")]
    pub disconnect_timeout_secs: u64,

    #[serde(default)]
    pub resync_after_mutation: bool,

    #[serde(default)]
    pub log_format: LogFormat,

    /// Fabric description used when `--fabric` is not given.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fabric: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            refresh_interval_secs: default_refresh_interval(),
            query_timeout_secs: default_timeout(),
            command_timeout_secs: default_timeout(),
            disconnect_timeout_secs: default_disconnect_timeout(),
            resync_after_mutation: false,
            log_format: LogFormat::Text,
            fabric: None,
        }
    }
}

fn default_refresh_interval() -> u64 {
    30
}
fn default_timeout() -> u64 {
    5
}
fn default_disconnect_timeout() -> u64 {
    300
}

impl Config {
    /// Check the values and build the engine configuration.
    pub fn to_controller_config(&self) -> Result<ControllerConfig, ConfigError> {
        nonzero("query_timeout_secs", self.query_timeout_secs)?;
        nonzero("command_timeout_secs", self.command_timeout_secs)?;

        Ok(ControllerConfig {
            refresh_interval: Duration::from_secs(self.refresh_interval_secs),
            query_timeout: Duration::from_secs(self.query_timeout_secs),
            command_timeout: Duration::from_secs(self.command_timeout_secs),
            disconnect_timeout: Duration::from_secs(self.disconnect_timeout_secs),
            resync_after_mutation: self.resync_after_mutation,
        })
    }

    /// Render as pretty TOML.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }
}

fn nonzero(field: &str, value: u64) -> Result<(), ConfigError> {
    if value == 0 {
        return Err(ConfigError::Validation {
            field: field.into(),
            reason: "must be at least 1 second".into(),
        });
    }
    Ok(())
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("org", "sdnctl", "sdnctl").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("sdnctl");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the config from the canonical path and the environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load the config from `path` and the environment. A missing file
/// yields defaults (still overridable by env).
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let config: Config = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed(ENV_PREFIX))
        .extract()?;
    Ok(config)
}
