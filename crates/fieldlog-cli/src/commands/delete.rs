use crate::commands::common::{open_service, resolve_event};
use crate::config::Settings;
use crate::error::CliError;

pub async fn run_delete(id: &str, settings: &Settings) -> Result<(), CliError> {
    let service = open_service(settings).await?;
    let event = resolve_event(&service, id).await?;

    service.delete_event(&event.id).await?;
    println!("{}", event.id);
    Ok(())
}
