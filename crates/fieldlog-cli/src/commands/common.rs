use std::io::{self, IsTerminal, Read};

use chrono::{DateTime, Utc};
use fieldlog_core::services::ConfiguredEventService;
use fieldlog_core::sync::{Saved, SyncDisposition};
use fieldlog_core::Event;

use crate::config::Settings;
use crate::error::CliError;

pub async fn open_service(settings: &Settings) -> Result<ConfiguredEventService, CliError> {
    let service =
        ConfiguredEventService::open(&settings.config, &settings.data_dir, settings.offline)
            .await?;
    Ok(service)
}

pub async fn resolve_event(
    service: &ConfiguredEventService,
    id: &str,
) -> Result<Event, CliError> {
    let id = normalize_event_identifier(id)?;
    let resolved = service.resolve_id(&id).await?;
    service
        .get_event(&resolved)
        .await?
        .ok_or_else(|| fieldlog_core::Error::NotFound(format!("event {id}")).into())
}

pub fn normalize_event_identifier(id: &str) -> Result<String, CliError> {
    let trimmed = id.trim();
    if trimmed.is_empty() {
        Err(CliError::EmptyEventId)
    } else {
        Ok(trimmed.to_string())
    }
}

pub fn normalize_content(content: &str) -> Option<String> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Comment from arguments, falling back to piped stdin.
pub fn resolve_comment(parts: &[String]) -> Result<String, CliError> {
    if let Some(comment) = normalize_content(&parts.join(" ")) {
        return Ok(comment);
    }

    if let Some(comment) = read_piped_stdin()? {
        return Ok(comment);
    }

    Err(CliError::EmptyComment)
}

pub fn read_piped_stdin() -> Result<Option<String>, CliError> {
    let stdin = io::stdin();
    if stdin.is_terminal() {
        return Ok(None);
    }

    let mut buffer = String::new();
    stdin.lock().read_to_string(&mut buffer)?;
    Ok(normalize_content(&buffer))
}

pub fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, CliError> {
    DateTime::parse_from_rfc3339(value.trim())
        .map(|timestamp| timestamp.with_timezone(&Utc))
        .map_err(|_| CliError::InvalidTimestamp(value.to_string()))
}

pub fn short_id(event: &Event) -> String {
    event.id.as_str().chars().take(13).collect()
}

pub fn event_preview(event: &Event, max_chars: usize) -> String {
    let first_line = event.comment.lines().next().unwrap_or("").trim();
    let collapsed = first_line.split_whitespace().collect::<Vec<_>>().join(" ");

    if collapsed.chars().count() <= max_chars {
        collapsed
    } else {
        let take_len = max_chars.saturating_sub(3);
        let mut truncated = collapsed.chars().take(take_len).collect::<String>();
        truncated.push_str("...");
        truncated
    }
}

pub fn format_event_lines(events: &[Event], max_retry_attempts: u32) -> Vec<String> {
    let now = Utc::now();
    events
        .iter()
        .map(|event| {
            let status = if event.status.is_unconfirmed()
                && event.is_retry_exhausted(max_retry_attempts)
            {
                format!("{}!", event.status)
            } else {
                event.status.to_string()
            };
            format!(
                "{:<13}  {:<8}  {:<8}  {:<12}  {:<40}  {}",
                short_id(event),
                event.event_type,
                status,
                event.object_id,
                event_preview(event, 40),
                format_relative_time(event.occurred_at, now)
            )
        })
        .collect()
}

pub fn format_event_details(event: &Event) -> Vec<String> {
    let mut lines = vec![
        format!("id:            {}", event.id),
        format!("object:        {}", event.object_id),
        format!("type:          {}", event.event_type),
        format!("occurred at:   {}", format_timestamp(event.occurred_at)),
        format!("status:        {}", event.status),
        format!("sync attempts: {}", event.sync_attempts),
    ];
    if let Some(server_id) = &event.server_id {
        lines.push(format!("server id:     {server_id}"));
    }
    if let Some(photo_uri) = &event.photo_uri {
        lines.push(format!("photo:         {photo_uri}"));
    }
    if let Some(error) = &event.last_sync_error {
        lines.push(format!("last error:    {error}"));
    }
    lines.push(format!("created at:    {}", format_timestamp(event.created_at)));
    lines.push(format!("updated at:    {}", format_timestamp(event.updated_at)));
    lines.push(String::new());
    lines.push(event.comment.clone());
    lines
}

pub fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

pub fn format_relative_time(timestamp: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let diff = (now - timestamp).num_milliseconds();
    if diff < 0 {
        return "upcoming".to_string();
    }
    let minute = 60_000;
    let hour = 60 * minute;
    let day = 24 * hour;
    let week = 7 * day;
    let month = 30 * day;
    let year = 365 * day;

    if diff < minute {
        "just now".to_string()
    } else if diff < hour {
        format!("{}m ago", diff / minute)
    } else if diff < day {
        format!("{}h ago", diff / hour)
    } else if diff < week {
        format!("{}d ago", diff / day)
    } else if diff < month {
        format!("{}w ago", diff / week)
    } else if diff < year {
        format!("{}mo ago", diff / month)
    } else {
        format!("{}y ago", diff / year)
    }
}

/// Print the event id on stdout and the sync outcome on stderr.
pub fn report_saved(saved: &Saved) {
    println!("{}", saved.event.id);
    match &saved.disposition {
        SyncDisposition::Confirmed => {}
        disposition => eprintln!("{}", disposition.user_message()),
    }
}
