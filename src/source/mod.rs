//! Feed sources.
//!
//! This module owns everything between the status server and the data
//! pipeline: the transport abstraction ([`FeedTransport`]), the event-stream
//! decoder, the HTTP implementation, and the [`StreamClient`] state machine
//! that switches from the live stream to polling when the stream fails.

mod client;
mod http;
mod sse;

#[cfg(test)]
pub(crate) mod testing;

pub use client::{ClientOptions, ClientState, FeedEvent, StreamClient};
pub use http::HttpTransport;
pub use sse::EventStreamReader;
pub use statuswatch_types::{FeedResponse, Sample, Site, SiteStatus};

use std::fmt::Debug;

use async_trait::async_trait;
use tokio::io::AsyncBufRead;

use crate::error::FeedError;

/// An open live connection: the body of an event-stream response.
///
/// Dropping it releases the underlying connection.
pub type FeedConnection = Box<dyn AsyncBufRead + Send + Unpin>;

/// Transport to a status server.
///
/// Implementations provide the two ways of obtaining feed documents: a
/// long-lived event stream and a single request/response poll.
#[async_trait]
pub trait FeedTransport: Send + Sync + Debug {
    /// Open the live event stream.
    async fn connect(&self) -> Result<FeedConnection, FeedError>;

    /// Fetch one feed document from the polling endpoint and return its body.
    async fn fetch(&self) -> Result<String, FeedError>;

    /// Returns a human-readable description of the feed.
    ///
    /// Used for display in the TUI status bar.
    fn description(&self) -> &str;
}
