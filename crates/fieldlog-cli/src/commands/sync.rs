use fieldlog_core::sync::SyncOutcome;

use crate::commands::common::open_service;
use crate::config::Settings;
use crate::error::CliError;

pub async fn run_sync(settings: &Settings) -> Result<(), CliError> {
    if !settings.config.is_sync_configured() {
        return Err(CliError::SyncNotConfigured);
    }

    let service = open_service(settings).await?;
    match service.sync_events().await {
        SyncOutcome::Offline => {
            println!("Offline: events stay queued until the events API is reachable.");
        }
        SyncOutcome::Completed(report) => {
            println!(
                "Sync completed: {} confirmed, {} failed, {} waiting for manual retry",
                report.confirmed, report.failed, report.exhausted_skipped
            );
            if report.persist_errors > 0 {
                eprintln!(
                    "{} results could not be saved locally; they will be pushed again",
                    report.persist_errors
                );
            }
        }
        SyncOutcome::Aborted(reason) => return Err(CliError::SyncAborted(reason)),
    }
    Ok(())
}
