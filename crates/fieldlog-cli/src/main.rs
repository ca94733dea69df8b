//! fieldlog CLI - record field events from the terminal
//!
//! Events are saved locally first and pushed to the events API whenever it
//! is reachable.

mod cli;
mod commands;
mod config;
mod error;


use clap::Parser;

use crate::cli::{Cli, Commands};
use crate::commands::add::run_add;
use crate::commands::config::run_config;
use crate::commands::delete::run_delete;
use crate::commands::edit::{run_edit, EditArgs};
use crate::commands::export::run_export;
use crate::commands::list::run_list;
use crate::commands::retry::run_retry;
use crate::commands::show::run_show;
use crate::commands::status::run_status;
use crate::commands::sync::run_sync;
use crate::commands::watch::run_watch;
use crate::config::Settings;
use crate::error::CliError;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();

    let mut filter = tracing_subscriber::EnvFilter::from_default_env();
    if let Ok(directive) = "fieldlog=info".parse() {
        filter = filter.add_directive(directive);
    }
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let settings = Settings::resolve(&cli)?;

    match cli.command {
        Commands::Add {
            object,
            kind,
            occurred_at,
            photo,
            comment,
        } => {
            run_add(
                &object,
                kind,
                occurred_at.as_deref(),
                photo,
                &comment,
                &settings,
            )
            .await?;
        }
        Commands::List {
            status,
            limit,
            json,
        } => run_list(status, limit, json, &settings).await?,
        Commands::Show { id, json } => run_show(&id, json, &settings).await?,
        Commands::Edit {
            id,
            comment,
            object,
            kind,
            occurred_at,
            photo,
            clear_photo,
        } => {
            let args = EditArgs {
                comment,
                object,
                kind,
                occurred_at,
                photo,
                clear_photo,
            };
            run_edit(&id, args, &settings).await?;
        }
        Commands::Delete { id } => run_delete(&id, &settings).await?,
        Commands::Sync => run_sync(&settings).await?,
        Commands::Retry { id } => run_retry(&id, &settings).await?,
        Commands::Status { json } => run_status(json, &settings).await?,
        Commands::Export { format, output } => {
            run_export(format, output.as_deref(), &settings).await?;
        }
        Commands::Watch => run_watch(&settings).await?,
        Commands::Config { command } => run_config(command, cli.data_dir, &settings)?,
    }

    Ok(())
}
