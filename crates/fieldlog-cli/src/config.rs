//! Persistent CLI configuration.
//!
//! The file is a JSON-encoded [`ClientConfig`]. Environment variables and
//! command-line flags override it for a single run.

use std::path::{Path, PathBuf};

use fieldlog_core::config::ClientConfig;

use crate::cli::Cli;
use crate::error::CliError;

const CONFIG_FILE_NAME: &str = "cli-config.json";
const APP_DIR_NAME: &str = "fieldlog";

pub fn default_config_path() -> Result<PathBuf, CliError> {
    dirs::config_dir()
        .map(|dir| dir.join(APP_DIR_NAME).join(CONFIG_FILE_NAME))
        .ok_or_else(|| CliError::Config("failed to resolve CLI config directory".to_string()))
}

pub fn default_data_dir() -> Result<PathBuf, CliError> {
    dirs::data_local_dir()
        .map(|dir| dir.join(APP_DIR_NAME))
        .ok_or_else(|| CliError::Config("failed to resolve local data directory".to_string()))
}

/// Read the config file; a missing file yields defaults.
pub fn load_from_path(path: &Path) -> Result<ClientConfig, CliError> {
    if !path.exists() {
        return Ok(ClientConfig::default());
    }

    let raw = std::fs::read_to_string(path).map_err(|error| {
        CliError::Config(format!(
            "failed to read config at {}: {}",
            path.display(),
            error
        ))
    })?;
    let mut config = serde_json::from_str::<ClientConfig>(&raw).map_err(|error| {
        CliError::Config(format!(
            "failed to parse config at {}: {}",
            path.display(),
            error
        ))
    })?;
    config.normalize();
    Ok(config)
}

pub fn save_to_path(config: &ClientConfig, path: &Path) -> Result<(), CliError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|error| {
            CliError::Config(format!(
                "failed to create config directory {}: {}",
                parent.display(),
                error
            ))
        })?;
    }

    let mut normalized = config.clone();
    normalized.normalize();
    let serialized = serde_json::to_string_pretty(&normalized)?;
    std::fs::write(path, serialized).map_err(|error| {
        CliError::Config(format!(
            "failed to write config at {}: {}",
            path.display(),
            error
        ))
    })
}

/// Everything a command needs to open the event service.
#[derive(Debug, Clone)]
pub struct Settings {
    pub config: ClientConfig,
    pub config_path: PathBuf,
    pub data_dir: PathBuf,
    pub offline: bool,
}

impl Settings {
    /// File, then `FIELDLOG_*` environment, then command-line flags.
    pub fn resolve(cli: &Cli) -> Result<Self, CliError> {
        Self::resolve_with(cli, |key| std::env::var(key).ok())
    }

    pub fn resolve_with<F>(cli: &Cli, lookup: F) -> Result<Self, CliError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let config_path = match &cli.config {
            Some(path) => path.clone(),
            None => default_config_path()?,
        };
        let mut config = load_from_path(&config_path)?;
        config.apply_env_overrides(lookup)?;
        if let Some(data_dir) = &cli.data_dir {
            config.data_dir = Some(data_dir.clone());
        }

        let data_dir = match &config.data_dir {
            Some(dir) => dir.clone(),
            None => default_data_dir()?,
        };

        Ok(Self {
            config,
            config_path,
            data_dir,
            offline: cli.offline,
        })
    }
}
