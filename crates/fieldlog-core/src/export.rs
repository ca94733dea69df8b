//! Event export helpers.

use std::fmt::Write as _;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::Event;

/// Export output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Json,
    Markdown,
}

impl ExportFormat {
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Markdown => "md",
        }
    }
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "markdown" | "md" => Ok(Self::Markdown),
            other => Err(format!("unknown export format '{other}' (expected json or markdown)")),
        }
    }
}

/// Events in export order: by occurrence time, then id.
fn ordered(events: &[Event]) -> Vec<&Event> {
    let mut ordered = events.iter().collect::<Vec<_>>();
    ordered.sort_by(|a, b| a.occurred_at.cmp(&b.occurred_at).then(a.id.cmp(&b.id)));
    ordered
}

/// Render events as pretty-printed JSON in the persisted field layout.
pub fn render_json_export(events: &[Event]) -> serde_json::Result<String> {
    serde_json::to_string_pretty(&ordered(events))
}

/// Render events in Markdown with frontmatter blocks.
#[must_use]
pub fn render_markdown_export(events: &[Event]) -> String {
    let mut output = String::new();

    for (index, event) in ordered(events).into_iter().enumerate() {
        if index > 0 {
            output.push('\n');
        }

        let _ = writeln!(output, "---");
        let _ = writeln!(output, "id: {}", event.id);
        let _ = writeln!(output, "object_id: {}", event.object_id);
        let _ = writeln!(output, "type: {}", event.event_type);
        let _ = writeln!(output, "occurred_at: {}", event.occurred_at.to_rfc3339());
        let _ = writeln!(output, "status: {}", event.status);
        let _ = writeln!(output, "sync_attempts: {}", event.sync_attempts);
        if let Some(server_id) = &event.server_id {
            let _ = writeln!(output, "server_id: {server_id}");
        }
        if let Some(photo_uri) = &event.photo_uri {
            let _ = writeln!(output, "photo_uri: {photo_uri}");
        }
        if let Some(error) = &event.last_sync_error {
            let _ = writeln!(output, "last_sync_error: {error}");
        }
        let _ = writeln!(output, "---");
        let _ = writeln!(output);
        output.push_str(&event.comment);
        output.push('\n');
    }

    output
}

/// Render events in the selected format.
pub fn render_events_export(events: &[Event], format: ExportFormat) -> serde_json::Result<String> {
    match format {
        ExportFormat::Json => render_json_export(events),
        ExportFormat::Markdown => Ok(render_markdown_export(events)),
    }
}

/// Default file name for an export taken at `timestamp_ms`.
#[must_use]
pub fn suggested_export_file_name(format: ExportFormat, timestamp_ms: i64) -> String {
    format!("fieldlog-export-{timestamp_ms}.{}", format.extension())
}
