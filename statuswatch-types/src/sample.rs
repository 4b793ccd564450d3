//! Health samples.

use chrono::{DateTime, FixedOffset};

/// Status code reported for a failed check.
pub const STATUS_DOWN: i64 = 0;

/// Status code reported for a successful check.
pub const STATUS_UP: i64 = 1;

/// One health-check observation of a site.
///
/// Samples are immutable once received. Any status code other than
/// [`STATUS_DOWN`] counts as a successful check; values besides `0` and `1`
/// are reserved by the server.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Sample {
    /// Result of the check.
    #[cfg_attr(feature = "serde", serde(rename = "status"))]
    pub status_code: i64,

    /// When the check ran, with the offset the server reported.
    #[cfg_attr(feature = "serde", serde(rename = "time"))]
    pub observed_at: DateTime<FixedOffset>,

    /// Response latency in milliseconds. Zero when the check failed before
    /// a response arrived.
    #[cfg_attr(feature = "serde", serde(rename = "ping", default))]
    pub latency_ms: f64,

    /// Free-form detail, usually the HTTP status line or the error text.
    #[cfg_attr(
        feature = "serde",
        serde(rename = "msg", default, skip_serializing_if = "Option::is_none")
    )]
    pub message: Option<String>,
}

impl Sample {
    /// Create a sample without a message.
    pub fn new(status_code: i64, observed_at: DateTime<FixedOffset>, latency_ms: f64) -> Self {
        Self {
            status_code,
            observed_at,
            latency_ms,
            message: None,
        }
    }

    /// A successful check with the given latency.
    pub fn up(observed_at: DateTime<FixedOffset>, latency_ms: f64) -> Self {
        Self::new(STATUS_UP, observed_at, latency_ms)
    }

    /// A failed check.
    pub fn down(observed_at: DateTime<FixedOffset>) -> Self {
        Self::new(STATUS_DOWN, observed_at, 0.0)
    }

    /// Attach a message.
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Whether the check succeeded.
    pub fn is_up(&self) -> bool {
        self.status_code != STATUS_DOWN
    }

    /// The message, treating an empty string as absent.
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref().filter(|m| !m.is_empty())
    }
}
