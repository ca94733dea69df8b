use std::path::PathBuf;

use fieldlog_core::config::ClientConfig;

use crate::cli::{ConfigCommands, StorageKind};
use crate::config::{load_from_path, save_to_path, Settings};
use crate::error::CliError;

/// Values passed to `config init`
#[derive(Debug, Default)]
pub struct InitArgs {
    pub api_url: Option<String>,
    pub health_url: Option<String>,
    pub storage: Option<StorageKind>,
    pub max_retry_attempts: Option<u32>,
    pub reset: bool,
}

pub fn run_config(
    command: ConfigCommands,
    data_dir: Option<PathBuf>,
    settings: &Settings,
) -> Result<(), CliError> {
    match command {
        ConfigCommands::Init {
            api_url,
            health_url,
            storage,
            max_retry_attempts,
            reset,
        } => run_config_init(
            InitArgs {
                api_url,
                health_url,
                storage,
                max_retry_attempts,
                reset,
            },
            data_dir,
            settings,
        ),
        ConfigCommands::Show => run_config_show(settings),
    }
}

pub fn run_config_init(
    args: InitArgs,
    data_dir: Option<PathBuf>,
    settings: &Settings,
) -> Result<(), CliError> {
    let existing = if args.reset {
        ClientConfig::default()
    } else {
        load_from_path(&settings.config_path)?
    };
    let config = merge_init_args(existing, args, data_dir)?;

    save_to_path(&config, &settings.config_path)?;
    println!("{}", settings.config_path.display());
    Ok(())
}

/// Apply `config init` flags over the stored config and validate the result.
pub fn merge_init_args(
    mut config: ClientConfig,
    args: InitArgs,
    data_dir: Option<PathBuf>,
) -> Result<ClientConfig, CliError> {
    if let Some(api_url) = args.api_url {
        config.api_base_url = Some(api_url);
    }
    if let Some(health_url) = args.health_url {
        config.health_url = Some(health_url);
    }
    if let Some(storage) = args.storage {
        config.storage = storage.into();
    }
    if let Some(max_retry_attempts) = args.max_retry_attempts {
        config.max_retry_attempts = max_retry_attempts;
    }
    if data_dir.is_some() {
        config.data_dir = data_dir;
    }

    config.normalize();
    config.validate()?;
    Ok(config)
}

pub fn run_config_show(settings: &Settings) -> Result<(), CliError> {
    println!("# {}", settings.config_path.display());
    println!("{}", serde_json::to_string_pretty(&settings.config)?);
    Ok(())
}
