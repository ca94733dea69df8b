use std::sync::Arc;

use crate::commands::common::open_service;
use crate::config::Settings;
use crate::error::CliError;

pub async fn run_watch(settings: &Settings) -> Result<(), CliError> {
    if !settings.config.is_sync_configured() || settings.offline {
        return Err(CliError::SyncNotConfigured);
    }

    let service = Arc::new(open_service(settings).await?);
    let _auto_sync = service.spawn_auto_sync();
    let _polling = service
        .engine()
        .connectivity()
        .spawn_polling(settings.config.probe_interval());

    println!("Watching for connectivity. Press Ctrl-C to stop.");
    tokio::signal::ctrl_c().await?;

    let summary = service.sync_summary().await?;
    println!(
        "Stopped: {} pending, {} failed, {} sent",
        summary.pending, summary.failed, summary.sent
    );
    Ok(())
}
