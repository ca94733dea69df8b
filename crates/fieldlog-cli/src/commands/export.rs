use std::path::Path;

use fieldlog_core::export::render_events_export;

use crate::cli::ExportFormat;
use crate::commands::common::open_service;
use crate::config::Settings;
use crate::error::CliError;

pub async fn run_export(
    format: ExportFormat,
    output_path: Option<&Path>,
    settings: &Settings,
) -> Result<(), CliError> {
    let service = open_service(settings).await?;
    let events = service.list_events().await?;
    let rendered = render_events_export(&events, format.into())?;

    if let Some(path) = output_path {
        std::fs::write(path, rendered)?;
        println!("{}", path.display());
    } else {
        println!("{rendered}");
    }

    Ok(())
}
