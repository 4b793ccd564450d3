//! Runtime settings.
//!
//! Settings are layered: built-in defaults, then an optional config file
//! (format picked from its extension), then `STATUSWATCH_*` environment
//! variables. Command-line flags are applied on top by the binary.
//!
//! ```toml
//! feed_url = "https://status.example.com/status"
//! upstream_url = "https://status-api.example.com"
//! poll_interval_ms = 15000
//! degraded_latency_threshold_ms = 750
//! ```

use std::path::Path;
use std::time::Duration;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

use crate::data::{Thresholds, DEFAULT_DEGRADED_LATENCY_MS};

/// Prefix for environment overrides, e.g. `STATUSWATCH_FEED_URL`.
pub const ENV_PREFIX: &str = "STATUSWATCH";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Event-stream endpoint.
    pub feed_url: String,
    /// Base address of the service behind the polling endpoint.
    pub upstream_url: String,
    /// Path of the polling endpoint on `upstream_url`.
    pub status_path: String,
    pub poll_interval_ms: u64,
    /// Latency above which an up sample counts as degraded.
    pub degraded_latency_threshold_ms: u64,
    /// Newest samples kept per site. 0 keeps everything.
    pub history_limit: usize,
    /// Retry the live connection this often while polling. Unset means never.
    pub reconnect_interval_ms: Option<u64>,
    /// Also bounds how long opening the live connection may take.
    pub request_timeout_ms: u64,
    /// Drop a live connection that sends no frame for this long. Unset means
    /// twice the poll interval.
    pub stream_idle_timeout_ms: Option<u64>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            feed_url: "http://localhost:8080/status".to_string(),
            upstream_url: "http://localhost:8080".to_string(),
            status_path: "/api/status".to_string(),
            poll_interval_ms: 30_000,
            degraded_latency_threshold_ms: DEFAULT_DEGRADED_LATENCY_MS,
            history_limit: 60,
            reconnect_interval_ms: None,
            request_timeout_ms: 10_000,
            stream_idle_timeout_ms: None,
        }
    }
}

impl Settings {
    /// Load settings from defaults, an optional file and the environment.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path));
        }

        let settings: Settings = builder
            .add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()?
            .try_deserialize()?;

        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::Message(
                "poll_interval_ms must be greater than zero".to_string(),
            ));
        }
        if self.request_timeout_ms == 0 {
            return Err(ConfigError::Message(
                "request_timeout_ms must be greater than zero".to_string(),
            ));
        }
        if self.stream_idle_timeout_ms == Some(0) {
            return Err(ConfigError::Message(
                "stream_idle_timeout_ms must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Full URL of the polling endpoint.
    pub fn poll_url(&self) -> String {
        let base = self.upstream_url.trim_end_matches('/');
        if self.status_path.starts_with('/') {
            format!("{}{}", base, self.status_path)
        } else {
            format!("{}/{}", base, self.status_path)
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn stream_idle_timeout(&self) -> Duration {
        match self.stream_idle_timeout_ms {
            Some(ms) => Duration::from_millis(ms),
            None => self.poll_interval().saturating_mul(2),
        }
    }

    pub fn reconnect_interval(&self) -> Option<Duration> {
        self.reconnect_interval_ms.map(Duration::from_millis)
    }

    pub fn thresholds(&self) -> Thresholds {
        Thresholds {
            degraded_latency_ms: self.degraded_latency_threshold_ms,
        }
    }
}
