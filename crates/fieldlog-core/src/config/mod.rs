//! Client configuration.
//!
//! Provides a unified `ClientConfig` used by every fieldlog front end to pick
//! a storage backend, locate the remote API and tune the sync engine.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::sync::{SyncPolicy, DEFAULT_MAX_RETRY_ATTEMPTS};
use crate::util::{is_http_url, normalize_text_option};

const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;
const DEFAULT_PROBE_INTERVAL_SECS: u64 = 15;
const DEFAULT_LIST_CACHE_TTL_SECS: u64 = 30;
const HEALTH_PATH: &str = "/health";

pub const ENV_API_URL: &str = "FIELDLOG_API_URL";
pub const ENV_DATA_DIR: &str = "FIELDLOG_DATA_DIR";
pub const ENV_STORAGE: &str = "FIELDLOG_STORAGE";

/// Which key-value backend holds the event collection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// JSON file on disk
    #[default]
    File,
    /// Local libSQL database
    LibSql,
    /// Volatile, lost on exit
    Memory,
}

impl fmt::Display for StorageBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::File => "file",
            Self::LibSql => "libsql",
            Self::Memory => "memory",
        })
    }
}

impl FromStr for StorageBackend {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "file" | "json" => Ok(Self::File),
            "libsql" | "sqlite" => Ok(Self::LibSql),
            "memory" => Ok(Self::Memory),
            other => Err(format!(
                "unknown storage backend '{other}' (expected file, libsql or memory)"
            )),
        }
    }
}

/// Client configuration persisted as JSON.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ClientConfig {
    #[serde(default)]
    pub storage: StorageBackend,
    /// Directory for durable backends; front ends supply a platform default
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
    /// Base URL of the events API; sync is disabled without it
    #[serde(default)]
    pub api_base_url: Option<String>,
    /// Reachability probe URL; defaults to `{api_base_url}/health`
    #[serde(default)]
    pub health_url: Option<String>,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_probe_interval_secs")]
    pub probe_interval_secs: u64,
    #[serde(default = "default_max_retry_attempts")]
    pub max_retry_attempts: u32,
    #[serde(default = "default_list_cache_ttl_secs")]
    pub list_cache_ttl_secs: u64,
}

const fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

const fn default_probe_interval_secs() -> u64 {
    DEFAULT_PROBE_INTERVAL_SECS
}

const fn default_max_retry_attempts() -> u32 {
    DEFAULT_MAX_RETRY_ATTEMPTS
}

const fn default_list_cache_ttl_secs() -> u64 {
    DEFAULT_LIST_CACHE_TTL_SECS
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            storage: StorageBackend::default(),
            data_dir: None,
            api_base_url: None,
            health_url: None,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            probe_interval_secs: DEFAULT_PROBE_INTERVAL_SECS,
            max_retry_attempts: DEFAULT_MAX_RETRY_ATTEMPTS,
            list_cache_ttl_secs: DEFAULT_LIST_CACHE_TTL_SECS,
        }
    }
}

impl ClientConfig {
    /// Trim text fields, drop empties and trailing slashes on URLs.
    pub fn normalize(&mut self) {
        self.api_base_url = normalize_text_option(self.api_base_url.take())
            .map(|url| url.trim_end_matches('/').to_string());
        self.health_url = normalize_text_option(self.health_url.take());
    }

    /// Check values that would otherwise fail late at request time.
    pub fn validate(&self) -> Result<()> {
        for (field, value) in [
            ("api_base_url", self.api_base_url.as_deref()),
            ("health_url", self.health_url.as_deref()),
        ] {
            if let Some(url) = value {
                if !is_http_url(url) {
                    return Err(Error::Config(format!(
                        "'{field}' must include http:// or https://"
                    )));
                }
            }
        }
        if self.max_retry_attempts == 0 {
            return Err(Error::Config(
                "'max_retry_attempts' must be at least 1".to_string(),
            ));
        }
        if self.request_timeout_secs == 0 || self.probe_interval_secs == 0 {
            return Err(Error::Config(
                "timeouts and probe interval must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Apply `FIELDLOG_*` overrides from the given lookup (usually `std::env::var`).
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = normalize_text_option(lookup(ENV_API_URL)) {
            self.api_base_url = Some(url);
        }
        if let Some(dir) = normalize_text_option(lookup(ENV_DATA_DIR)) {
            self.data_dir = Some(PathBuf::from(dir));
        }
        if let Some(storage) = normalize_text_option(lookup(ENV_STORAGE)) {
            self.storage = storage.parse().map_err(Error::Config)?;
        }
        self.normalize();
        Ok(())
    }

    /// Whether a remote API is configured at all
    pub const fn is_sync_configured(&self) -> bool {
        self.api_base_url.is_some()
    }

    /// Probe URL, derived from the API base URL when not set explicitly
    pub fn resolved_health_url(&self) -> Option<String> {
        self.health_url.clone().or_else(|| {
            self.api_base_url
                .as_ref()
                .map(|base| format!("{base}{HEALTH_PATH}"))
        })
    }

    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub const fn probe_interval(&self) -> Duration {
        Duration::from_secs(self.probe_interval_secs)
    }

    pub const fn list_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.list_cache_ttl_secs)
    }

    pub const fn sync_policy(&self) -> SyncPolicy {
        SyncPolicy {
            max_retry_attempts: self.max_retry_attempts,
        }
    }
}
