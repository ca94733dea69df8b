use crate::commands::common::{open_service, report_saved, resolve_event};
use crate::config::Settings;
use crate::error::CliError;

pub async fn run_retry(id: &str, settings: &Settings) -> Result<(), CliError> {
    let service = open_service(settings).await?;
    let event = resolve_event(&service, id).await?;

    let saved = service.retry_event(&event.id).await?;
    report_saved(&saved);
    Ok(())
}
