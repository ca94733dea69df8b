use fieldlog_core::models::NewEvent;

use crate::cli::EventKind;
use crate::commands::common::{open_service, parse_timestamp, report_saved, resolve_comment};
use crate::config::Settings;
use crate::error::CliError;

pub async fn run_add(
    object: &str,
    kind: EventKind,
    occurred_at: Option<&str>,
    photo: Option<String>,
    comment_parts: &[String],
    settings: &Settings,
) -> Result<(), CliError> {
    let comment = resolve_comment(comment_parts)?;
    let mut draft = NewEvent::new(object, kind.into(), comment);
    if let Some(occurred_at) = occurred_at {
        draft = draft.occurred_at(parse_timestamp(occurred_at)?);
    }
    if let Some(photo) = photo {
        draft = draft.photo_uri(photo);
    }

    let service = open_service(settings).await?;
    let saved = service.create_event(draft).await?;
    report_saved(&saved);
    Ok(())
}
