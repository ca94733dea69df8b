//! HTTP client for the events API.

use std::time::Duration;

use reqwest::StatusCode;
use serde::Deserialize;

use super::{PushRequest, RemoteAck, RemoteError, RemoteEvents, RemoteResult};
use crate::util::{compact_text, is_http_url, normalize_text_option};

/// `POST {base}/events` for first sync, `PUT {base}/events/{server_id}` after.
#[derive(Debug, Clone)]
pub struct HttpEventsClient {
    base_url: String,
    client: reqwest::Client,
}

impl HttpEventsClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> RemoteResult<Self> {
        let base_url = normalize_base_url(base_url.into())?;
        Ok(Self {
            base_url,
            client: reqwest::Client::builder().timeout(timeout).build()?,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn events_url(&self) -> String {
        format!("{}/events", self.base_url)
    }

    fn event_url(&self, server_id: &str) -> String {
        format!("{}/events/{}", self.base_url, urlencoding::encode(server_id))
    }
}

impl RemoteEvents for HttpEventsClient {
    async fn push(&self, request: PushRequest<'_>) -> RemoteResult<RemoteAck> {
        let creating = !request.is_update();
        let builder = match request {
            PushRequest::Create(event) => self.client.post(self.events_url()).json(event),
            PushRequest::Update { server_id, event } => {
                self.client.put(self.event_url(server_id)).json(event)
            }
        };

        let response = builder
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await?;

        let status = response.status();
        let body = match response.text().await {
            Ok(body) => body,
            Err(error) => {
                tracing::debug!("Failed to read push response body: {error}");
                String::new()
            }
        };
        if !status.is_success() {
            let message = parse_api_error(status, &body);
            return Err(if status.is_client_error() {
                RemoteError::Rejected(message)
            } else {
                RemoteError::Api(message)
            });
        }

        let ack = parse_ack(&body);
        if creating && ack.server_id.is_none() {
            tracing::warn!(
                "Create accepted without a usable id; the next change will be posted again"
            );
        }
        Ok(ack)
    }
}

/// Server ids arrive as strings or plain numbers.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RemoteId {
    Text(String),
    Number(serde_json::Number),
}

impl RemoteId {
    fn into_text(self) -> String {
        match self {
            Self::Text(text) => text,
            Self::Number(number) => number.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct PushResponse {
    #[serde(default)]
    id: Option<RemoteId>,
    #[serde(default, alias = "serverId")]
    server_id: Option<RemoteId>,
}

fn parse_ack(body: &str) -> RemoteAck {
    if body.trim().is_empty() {
        return RemoteAck::default();
    }
    match serde_json::from_str::<PushResponse>(body) {
        Ok(payload) => RemoteAck {
            server_id: normalize_text_option(
                payload.server_id.or(payload.id).map(RemoteId::into_text),
            ),
        },
        Err(error) => {
            tracing::debug!("Push accepted with unparseable body: {error}");
            RemoteAck::default()
        }
    }
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: Option<String>,
    message: Option<String>,
}

fn parse_api_error(status: StatusCode, body: &str) -> String {
    if let Ok(payload) = serde_json::from_str::<ApiErrorBody>(body) {
        if let Some(message) = payload.message.or(payload.error) {
            return format!("{} ({})", message.trim(), status.as_u16());
        }
    }

    let trimmed = compact_text(body);
    if trimmed.is_empty() {
        format!("HTTP {}", status.as_u16())
    } else {
        format!("{} ({})", trimmed, status.as_u16())
    }
}

fn normalize_base_url(raw: String) -> RemoteResult<String> {
    let base_url = normalize_text_option(Some(raw)).ok_or_else(|| {
        RemoteError::InvalidConfiguration("API base URL must not be empty".to_string())
    })?;
    if is_http_url(&base_url) {
        Ok(base_url.trim_end_matches('/').to_string())
    } else {
        Err(RemoteError::InvalidConfiguration(
            "API base URL must include http:// or https://".to_string(),
        ))
    }
}
