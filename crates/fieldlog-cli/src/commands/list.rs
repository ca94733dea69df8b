use fieldlog_core::{Event, SyncStatus};

use crate::cli::StatusFilter;
use crate::commands::common::{format_event_lines, open_service};
use crate::config::Settings;
use crate::error::CliError;

pub async fn run_list(
    status: Option<StatusFilter>,
    limit: Option<usize>,
    as_json: bool,
    settings: &Settings,
) -> Result<(), CliError> {
    let service = open_service(settings).await?;
    let events = select_events(
        service.list_events().await?,
        status.map(SyncStatus::from),
        limit,
    );

    if as_json {
        println!("{}", serde_json::to_string_pretty(&events)?);
    } else if events.is_empty() {
        println!("No events recorded.");
    } else {
        let max_attempts = settings.config.max_retry_attempts;
        for line in format_event_lines(&events, max_attempts) {
            println!("{line}");
        }
    }

    Ok(())
}

/// Most recent occurrence first, optionally filtered and truncated.
pub fn select_events(
    mut events: Vec<Event>,
    status: Option<SyncStatus>,
    limit: Option<usize>,
) -> Vec<Event> {
    if let Some(status) = status {
        events.retain(|event| event.status == status);
    }
    events.sort_by(|a, b| b.occurred_at.cmp(&a.occurred_at));
    if let Some(limit) = limit {
        events.truncate(limit);
    }
    events
}
