use fieldlog_core::config::StorageBackend;
use fieldlog_core::state::{SyncState, SyncSummary};
use serde::Serialize;

use crate::commands::common::open_service;
use crate::config::Settings;
use crate::error::CliError;

#[derive(Debug, Serialize)]
pub struct StatusReport {
    pub state: SyncState,
    #[serde(flatten)]
    pub summary: SyncSummary,
    pub storage: StorageBackend,
    pub storage_degraded: bool,
    pub sync_configured: bool,
    pub data_dir: String,
}

pub async fn run_status(as_json: bool, settings: &Settings) -> Result<(), CliError> {
    let service = open_service(settings).await?;
    let summary = service.sync_summary().await?;
    let report = StatusReport {
        state: summary.state(),
        summary,
        storage: service.storage_backend(),
        storage_degraded: service.is_storage_degraded(),
        sync_configured: settings.config.is_sync_configured() && !settings.offline,
        data_dir: settings.data_dir.display().to_string(),
    };

    if as_json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        for line in format_status_lines(&report) {
            println!("{line}");
        }
    }
    Ok(())
}

pub fn format_status_lines(report: &StatusReport) -> Vec<String> {
    let summary = &report.summary;
    let mut lines = vec![
        format!("state:     {}", report.state),
        format!(
            "events:    {} total, {} pending, {} sent, {} failed",
            summary.total, summary.pending, summary.sent, summary.failed
        ),
    ];
    if summary.exhausted > 0 {
        lines.push(format!(
            "exhausted: {} (use `fieldlog retry <id>`)",
            summary.exhausted
        ));
    }
    let storage = if report.storage_degraded {
        format!("{} (degraded to memory, changes will be lost)", report.storage)
    } else {
        report.storage.to_string()
    };
    lines.push(format!("storage:   {storage}"));
    lines.push(format!("data dir:  {}", report.data_dir));
    if !report.sync_configured {
        lines.push("sync:      local only".to_string());
    }
    lines
}
