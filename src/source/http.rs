//! HTTP transport using reqwest.

use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::header::ACCEPT;
use reqwest::Client;
use tokio_util::io::StreamReader;

use super::{FeedConnection, FeedTransport};
use crate::config::Settings;
use crate::error::FeedError;

/// Production transport talking to a status server over HTTP.
///
/// The live stream is a `text/event-stream` GET on the feed URL; polling is a
/// plain GET on the (usually proxied) status endpoint.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    feed_url: String,
    poll_url: String,
    request_timeout: Duration,
    description: String,
}

impl HttpTransport {
    /// Build a transport from settings.
    pub fn new(settings: &Settings) -> Result<Self, FeedError> {
        let client = Client::builder()
            .connect_timeout(settings.request_timeout())
            .build()
            .map_err(|e| FeedError::Connection(e.to_string()))?;

        Ok(Self {
            client,
            feed_url: settings.feed_url.clone(),
            poll_url: settings.poll_url(),
            request_timeout: settings.request_timeout(),
            description: format!("feed: {}", settings.feed_url),
        })
    }

    pub fn feed_url(&self) -> &str {
        &self.feed_url
    }

    pub fn poll_url(&self) -> &str {
        &self.poll_url
    }
}

#[async_trait]
impl FeedTransport for HttpTransport {
    async fn connect(&self) -> Result<FeedConnection, FeedError> {
        tracing::debug!("Opening event stream {}", self.feed_url);
        let response = self
            .client
            .get(&self.feed_url)
            .header(ACCEPT, "text/event-stream")
            .send()
            .await
            .map_err(|e| FeedError::Connection(format!("GET {} failed: {}", self.feed_url, e)))?;

        if !response.status().is_success() {
            return Err(FeedError::Connection(format!(
                "{} returned status {}",
                self.feed_url,
                response.status()
            )));
        }

        let body = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(std::io::Error::other));

        Ok(Box::new(StreamReader::new(Box::pin(body))))
    }

    async fn fetch(&self) -> Result<String, FeedError> {
        tracing::debug!("GET {}", self.poll_url);
        let response = self
            .client
            .get(&self.poll_url)
            .timeout(self.request_timeout)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    FeedError::Timeout
                } else {
                    FeedError::Fetch(format!("GET {} failed: {}", self.poll_url, e))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FeedError::Fetch(format!(
                "{} returned status {}",
                self.poll_url, status
            )));
        }

        let body = response.text().await?;
        tracing::debug!("GET {} -> {} ({} bytes)", self.poll_url, status, body.len());
        Ok(body)
    }

    fn description(&self) -> &str {
        &self.description
    }
}
