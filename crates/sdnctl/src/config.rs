//! CLI configuration: thin wrapper around `sdnctl_config` shared types.
//!
//! Adds the `--config` / `--fabric` flag overrides on top of the file
//! and environment layering done by the shared crate.

use std::path::PathBuf;

use sdnctl_core::ControllerConfig;

use crate::cli::GlobalOpts;
use crate::error::CliError;

pub use sdnctl_config::{Config, LogFormat, config_path, load_config_from};

/// Path of the config file in effect (flag > env > platform default).
pub fn active_config_path(global: &GlobalOpts) -> PathBuf {
    global.config.clone().unwrap_or_else(config_path)
}

pub fn load(global: &GlobalOpts) -> Result<Config, CliError> {
    Ok(load_config_from(&active_config_path(global))?)
}

/// Engine configuration for a one-shot CLI run. The scheduler stays off:
/// the initial reconciliation at startup is all a single command needs.
pub fn controller_config(config: &Config) -> Result<ControllerConfig, CliError> {
    let engine = config.to_controller_config()?;
    Ok(ControllerConfig {
        refresh_interval: std::time::Duration::ZERO,
        ..engine
    })
}

/// Fabric file to load (flag > env > config file).
pub fn fabric_path(global: &GlobalOpts, config: &Config) -> Result<PathBuf, CliError> {
    global
        .fabric
        .clone()
        .or_else(|| config.fabric.clone())
        .ok_or_else(|| CliError::NoFabric {
            path: active_config_path(global).display().to_string(),
        })
}
