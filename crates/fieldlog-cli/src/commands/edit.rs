use fieldlog_core::models::EventPatch;

use crate::cli::EventKind;
use crate::commands::common::{
    normalize_content, open_service, parse_timestamp, report_saved, resolve_event,
};
use crate::config::Settings;
use crate::error::CliError;

/// Fields requested on the command line
#[derive(Debug, Default)]
pub struct EditArgs {
    pub comment: Option<String>,
    pub object: Option<String>,
    pub kind: Option<EventKind>,
    pub occurred_at: Option<String>,
    pub photo: Option<String>,
    pub clear_photo: bool,
}

pub async fn run_edit(id: &str, args: EditArgs, settings: &Settings) -> Result<(), CliError> {
    let patch = build_patch(args)?;
    let service = open_service(settings).await?;
    let event = resolve_event(&service, id).await?;

    let saved = service.update_event(&event.id, patch).await?;
    report_saved(&saved);
    Ok(())
}

pub fn build_patch(args: EditArgs) -> Result<EventPatch, CliError> {
    let comment = match args.comment {
        Some(comment) => Some(normalize_content(&comment).ok_or(CliError::EmptyComment)?),
        None => None,
    };
    let occurred_at = args
        .occurred_at
        .as_deref()
        .map(parse_timestamp)
        .transpose()?;
    let photo_uri = if args.clear_photo {
        Some(None)
    } else {
        args.photo.map(Some)
    };

    let patch = EventPatch {
        object_id: args.object,
        event_type: args.kind.map(Into::into),
        comment,
        occurred_at,
        photo_uri,
    };
    if patch.is_empty() {
        return Err(CliError::EmptyEdit);
    }
    Ok(patch)
}
