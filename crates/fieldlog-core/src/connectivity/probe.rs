//! Reachability by polling an HTTP health endpoint.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use super::{publish, ConnectivityOracle, Reachability};
use crate::error::{Error, Result};
use crate::util::{is_http_url, normalize_text_option};

/// Treats any 2xx answer from `url` as "online".
#[derive(Debug, Clone)]
pub struct HttpProbe {
    url: String,
    client: reqwest::Client,
    state: Arc<watch::Sender<Reachability>>,
}

impl HttpProbe {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let url = normalize_text_option(Some(url.into()))
            .ok_or_else(|| Error::Config("health URL must not be empty".to_string()))?;
        if !is_http_url(&url) {
            return Err(Error::Config(
                "health URL must include http:// or https://".to_string(),
            ));
        }
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|error| Error::Config(format!("failed to build probe HTTP client: {error}")))?;
        let (state, _) = watch::channel(Reachability::new(false));
        Ok(Self {
            url,
            client,
            state: Arc::new(state),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Hit the endpoint once and publish the result.
    pub async fn probe(&self) -> bool {
        let connected = match self.client.get(&self.url).send().await {
            Ok(response) => response.status().is_success(),
            Err(error) => {
                tracing::debug!("Connectivity probe to {} failed: {}", self.url, error);
                false
            }
        };
        if publish(&self.state, connected) {
            tracing::info!(
                "Connectivity changed: {}",
                if connected { "online" } else { "offline" }
            );
        }
        connected
    }

    /// Probe every `interval` in the background until the handle is dropped.
    pub fn spawn_polling(&self, interval: Duration) -> ProbeHandle {
        let probe = self.clone();
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                probe.probe().await;
            }
        });
        ProbeHandle { task }
    }
}

impl ConnectivityOracle for HttpProbe {
    async fn is_connected(&self) -> bool {
        self.probe().await
    }

    fn subscribe(&self) -> watch::Receiver<Reachability> {
        self.state.subscribe()
    }
}

/// Background polling task; stops when dropped.
#[derive(Debug)]
pub struct ProbeHandle {
    task: JoinHandle<()>,
}

impl Drop for ProbeHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use axum::routing::get;
    use axum::Router;

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{address}")
    }

    #[test]
    fn rejects_invalid_urls() {
        assert!(HttpProbe::new("  ", Duration::from_secs(1)).is_err());
        assert!(HttpProbe::new("example.com/health", Duration::from_secs(1)).is_err());
    }

    #[tokio::test]
    async fn healthy_endpoint_means_online() {
        let base = serve(Router::new().route("/health", get(|| async { "ok" }))).await;
        let probe = HttpProbe::new(format!("{base}/health"), Duration::from_secs(2)).unwrap();
        let mut updates = probe.subscribe();
        assert!(!updates.borrow_and_update().connected);

        assert!(probe.is_connected().await);
        assert!(updates.has_changed().unwrap());
        assert_eq!(
            *updates.borrow_and_update(),
            Reachability {
                connected: true,
                reconnects: 1
            }
        );
    }

    #[tokio::test]
    async fn error_status_means_offline() {
        let base = serve(Router::new().route(
            "/health",
            get(|| async { StatusCode::SERVICE_UNAVAILABLE }),
        ))
        .await;
        let probe = HttpProbe::new(format!("{base}/health"), Duration::from_secs(2)).unwrap();
        assert!(!probe.is_connected().await);
    }

    #[tokio::test]
    async fn unreachable_host_means_offline() {
        // Bind then drop to get a port nobody listens on
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();
        drop(listener);

        let probe =
            HttpProbe::new(format!("http://{address}/health"), Duration::from_secs(1)).unwrap();
        assert!(!probe.is_connected().await);
    }
}
