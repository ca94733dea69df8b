use crate::commands::common::{format_event_details, open_service, resolve_event};
use crate::config::Settings;
use crate::error::CliError;

pub async fn run_show(id: &str, as_json: bool, settings: &Settings) -> Result<(), CliError> {
    let service = open_service(settings).await?;
    let event = resolve_event(&service, id).await?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&event)?);
    } else {
        for line in format_event_details(&event) {
            println!("{line}");
        }
    }
    Ok(())
}
