//! Error types for feed ingestion.

use thiserror::Error;

/// Errors that can occur while receiving or fetching the status feed.
///
/// None of these are fatal: a dropped connection falls back to polling, a
/// malformed frame is skipped, and a failed poll keeps the last good
/// snapshot on screen. The type is `Clone` so it can be handed to every
/// store subscriber.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FeedError {
    /// The live connection could not be opened or was dropped.
    #[error("Connection failed: {0}")]
    Connection(String),

    /// A payload was not a valid feed document.
    #[error("Failed to parse feed: {0}")]
    Parse(String),

    /// A polling request failed.
    #[error("Fetch failed: {0}")]
    Fetch(String),

    /// A polling request did not complete in time.
    #[error("Request timed out")]
    Timeout,

    /// The client was stopped before the operation completed.
    #[error("Client stopped")]
    Stopped,
}

impl FeedError {
    /// Whether this error came from the polling path.
    pub fn is_fetch_failure(&self) -> bool {
        matches!(self, FeedError::Fetch(_) | FeedError::Timeout)
    }
}

impl From<serde_json::Error> for FeedError {
    fn from(err: serde_json::Error) -> Self {
        FeedError::Parse(err.to_string())
    }
}

impl From<reqwest::Error> for FeedError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FeedError::Timeout
        } else if err.is_connect() {
            FeedError::Connection(err.to_string())
        } else {
            FeedError::Fetch(err.to_string())
        }
    }
}
