//! The stream client state machine.
//!
//! A [`StreamClient`] owns the live connection to the feed. It runs in a
//! background task that decodes frames and emits them, in delivery order, on
//! a bounded channel. When the connection cannot be opened or drops, the
//! client moves through `Error` to `Polling` and the caller is expected to
//! pull documents with [`StreamClient::fetch`] instead.
//!
//! A connection that never answers, or that goes quiet for longer than the
//! idle timeout, counts as failed too.
//!
//! ```text
//! Connecting ──frame──▶ Streaming
//!     │                    │
//!     └──────failure───────┴──▶ Error ──▶ Polling ──(interval)──▶ Reconnecting
//!                                            ▲                        │
//!                                            └─────────failure────────┘
//! ```

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::error::Elapsed;
use tokio_util::sync::CancellationToken;

use statuswatch_types::FeedResponse;

use super::sse::EventStreamReader;
use super::{FeedConnection, FeedTransport};
use crate::error::FeedError;

/// Connection state of a [`StreamClient`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClientState {
    /// Opening the first live connection.
    Connecting,
    /// At least one frame has arrived on the current connection.
    Streaming,
    /// The live connection failed. Transient, always followed by `Polling`.
    Error,
    /// Opening a new live connection after a failure.
    Reconnecting,
    /// No live connection; documents must be fetched.
    Polling,
    /// Stopped. Terminal.
    Closed,
}

impl ClientState {
    pub fn label(&self) -> &'static str {
        match self {
            ClientState::Connecting => "connecting",
            ClientState::Streaming => "live",
            ClientState::Error => "error",
            ClientState::Reconnecting => "reconnecting",
            ClientState::Polling => "polling",
            ClientState::Closed => "closed",
        }
    }
}

impl fmt::Display for ClientState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// An event emitted by the client, in connection delivery order.
#[derive(Debug, Clone, PartialEq)]
pub enum FeedEvent {
    /// A parsed feed document.
    Frame(FeedResponse),
    /// A frame that could not be parsed. The connection stays open.
    FrameError(FeedError),
    /// The client changed state.
    State(ClientState),
}

/// Tuning for a [`StreamClient`].
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// When set, retry the live connection this often while polling.
    pub reconnect_interval: Option<Duration>,
    /// Give up on a connection attempt after this long.
    pub connect_timeout: Option<Duration>,
    /// Drop a live connection that dispatches no frame for this long.
    pub idle_timeout: Option<Duration>,
    /// Capacity of the event channel.
    pub event_buffer: usize,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            reconnect_interval: None,
            connect_timeout: Some(Duration::from_secs(10)),
            idle_timeout: Some(Duration::from_secs(60)),
            event_buffer: 64,
        }
    }
}

/// Owner of the live feed connection.
///
/// Must be started from within a Tokio runtime. The connection is held by
/// the background task only; [`stop`](StreamClient::stop) or dropping the
/// client cancels that task and releases it.
#[derive(Debug)]
pub struct StreamClient {
    transport: Arc<dyn FeedTransport>,
    state: Arc<watch::Sender<ClientState>>,
    cancel: CancellationToken,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl StreamClient {
    /// Start connecting and return the client together with its event stream.
    pub fn start(
        transport: Arc<dyn FeedTransport>,
        options: ClientOptions,
    ) -> (Self, mpsc::Receiver<FeedEvent>) {
        let (events, receiver) = mpsc::channel(options.event_buffer.max(1));
        let (state, _) = watch::channel(ClientState::Connecting);
        let state = Arc::new(state);
        let cancel = CancellationToken::new();

        let worker = Worker {
            transport: transport.clone(),
            state: state.clone(),
            events,
            cancel: cancel.clone(),
            reconnect_interval: options.reconnect_interval,
            connect_timeout: options.connect_timeout,
            idle_timeout: options.idle_timeout,
        };
        let task = tokio::spawn(worker.run());

        let client = Self {
            transport,
            state,
            cancel,
            task: Mutex::new(Some(task)),
        };
        (client, receiver)
    }

    pub fn state(&self) -> ClientState {
        *self.state.borrow()
    }

    /// Subscribe to state changes.
    pub fn watch_state(&self) -> watch::Receiver<ClientState> {
        self.state.subscribe()
    }

    pub fn description(&self) -> &str {
        self.transport.description()
    }

    pub fn is_stopped(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Fetch and parse one document from the polling endpoint.
    ///
    /// Fails with [`FeedError::Stopped`] once the client has been stopped,
    /// including when the stop happens while the request is in flight.
    pub async fn fetch(&self) -> Result<FeedResponse, FeedError> {
        if self.cancel.is_cancelled() {
            return Err(FeedError::Stopped);
        }

        let body = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return Err(FeedError::Stopped),
            body = self.transport.fetch() => body?,
        };

        Ok(serde_json::from_str(&body)?)
    }

    /// Stop the client and release the live connection.
    ///
    /// Safe to call from any state and more than once. When this returns
    /// the connection has been dropped and the state is `Closed`.
    pub async fn stop(&self) {
        self.cancel.cancel();

        let task = self.task.lock().take();
        if let Some(task) = task {
            if let Err(e) = task.await {
                if e.is_panic() {
                    tracing::error!("Feed connection task panicked: {}", e);
                }
            }
            tracing::info!("Feed client stopped ({})", self.transport.description());
        }

        self.state.send_replace(ClientState::Closed);
    }
}

impl Drop for StreamClient {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// State owned by the connection task.
struct Worker {
    transport: Arc<dyn FeedTransport>,
    state: Arc<watch::Sender<ClientState>>,
    events: mpsc::Sender<FeedEvent>,
    cancel: CancellationToken,
    reconnect_interval: Option<Duration>,
    connect_timeout: Option<Duration>,
    idle_timeout: Option<Duration>,
}

/// Await `fut`, bounded by `limit` when one is set.
async fn bounded<F: Future>(limit: Option<Duration>, fut: F) -> Result<F::Output, Elapsed> {
    match limit {
        Some(limit) => tokio::time::timeout(limit, fut).await,
        None => Ok(fut.await),
    }
}

impl Worker {
    async fn run(self) {
        if !self.transition(ClientState::Connecting).await {
            return self.close();
        }

        loop {
            let connected = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                connected = self.connect() => connected,
            };

            let err = match connected {
                Ok(connection) => {
                    tracing::debug!("Live connection open ({})", self.transport.description());
                    // The connection moves into the read future, so cancelling
                    // that future drops it.
                    match self.read_frames(connection).await {
                        Some(err) => err,
                        None => break,
                    }
                }
                Err(err) => err,
            };

            tracing::warn!("Live feed unavailable: {}", err);
            if !self.transition(ClientState::Error).await {
                break;
            }
            if !self.transition(ClientState::Polling).await {
                break;
            }

            let Some(interval) = self.reconnect_interval else {
                return;
            };

            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                _ = tokio::time::sleep(interval) => {}
            }
            if !self.transition(ClientState::Reconnecting).await {
                break;
            }
        }

        self.close();
    }

    async fn connect(&self) -> Result<FeedConnection, FeedError> {
        match bounded(self.connect_timeout, self.transport.connect()).await {
            Ok(connected) => connected,
            Err(_) => Err(FeedError::Connection(format!(
                "no response within {:?}",
                self.connect_timeout.unwrap_or_default()
            ))),
        }
    }

    /// Read frames until the connection drops or goes quiet.
    ///
    /// Returns the connection error, or `None` when cancelled or when
    /// nobody is listening any more.
    async fn read_frames(&self, connection: FeedConnection) -> Option<FeedError> {
        let mut reader = EventStreamReader::new(connection);

        loop {
            let next = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return None,
                next = bounded(self.idle_timeout, reader.next_event()) => next,
            };

            let payload = match next {
                Ok(Ok(Some(payload))) => payload,
                Ok(Ok(None)) => {
                    return Some(FeedError::Connection("stream closed by server".to_string()))
                }
                Ok(Err(e)) => return Some(FeedError::Connection(e.to_string())),
                Err(_) => {
                    return Some(FeedError::Connection(format!(
                        "no frame within {:?}",
                        self.idle_timeout.unwrap_or_default()
                    )))
                }
            };

            match parse_frame(payload) {
                Ok(feed) => {
                    let streaming = *self.state.borrow() == ClientState::Streaming;
                    if !streaming && !self.transition(ClientState::Streaming).await {
                        return None;
                    }
                    if !self.emit(FeedEvent::Frame(feed)).await {
                        return None;
                    }
                }
                Err(e) => {
                    tracing::warn!("Skipping malformed frame: {}", e);
                    if !self.emit(FeedEvent::FrameError(e)).await {
                        return None;
                    }
                }
            }
        }
    }

    async fn transition(&self, next: ClientState) -> bool {
        let previous = self.state.send_replace(next);
        if previous != next {
            tracing::debug!("Feed client {} -> {}", previous, next);
        }
        self.emit(FeedEvent::State(next)).await
    }

    /// Returns false when the client is cancelled or the receiver is gone.
    async fn emit(&self, event: FeedEvent) -> bool {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => false,
            sent = self.events.send(event) => sent.is_ok(),
        }
    }

    fn close(&self) {
        self.state.send_replace(ClientState::Closed);
        let _ = self.events.try_send(FeedEvent::State(ClientState::Closed));
    }
}

fn parse_frame(payload: Vec<u8>) -> Result<FeedResponse, FeedError> {
    let payload = String::from_utf8(payload)
        .map_err(|e| FeedError::Parse(format!("frame is not valid UTF-8: {}", e)))?;
    Ok(serde_json::from_str(&payload)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::testing::{feed_json, live_connection, sse_frame, MockTransport};
    use tokio::io::AsyncWriteExt;

    async fn collect(mut events: mpsc::Receiver<FeedEvent>) -> Vec<FeedEvent> {
        let mut out = Vec::new();
        while let Some(event) = events.recv().await {
            out.push(event);
        }
        out
    }

    async fn next_frame(events: &mut mpsc::Receiver<FeedEvent>) -> FeedResponse {
        loop {
            match events.recv().await {
                Some(FeedEvent::Frame(feed)) => return feed,
                Some(_) => continue,
                None => panic!("event stream ended before a frame arrived"),
            }
        }
    }

    #[tokio::test]
    async fn test_malformed_frame_then_valid_frame() {
        let body = format!("data: {{not json\n\n{}", sse_frame(&feed_json(&[("api", vec![1])])));
        let transport = Arc::new(MockTransport::new().with_stream(&body));

        let (client, events) = StreamClient::start(transport, ClientOptions::default());
        let events = collect(events).await;

        assert_eq!(events.len(), 6, "{events:?}");
        assert_eq!(events[0], FeedEvent::State(ClientState::Connecting));
        assert!(matches!(events[1], FeedEvent::FrameError(FeedError::Parse(_))));
        assert_eq!(events[2], FeedEvent::State(ClientState::Streaming));
        match &events[3] {
            FeedEvent::Frame(feed) => assert!(feed.get("api").is_some()),
            other => panic!("expected a frame, got {other:?}"),
        }
        assert_eq!(events[4], FeedEvent::State(ClientState::Error));
        assert_eq!(events[5], FeedEvent::State(ClientState::Polling));
        assert_eq!(client.state(), ClientState::Polling);
    }

    #[tokio::test]
    async fn test_invalid_utf8_frame_keeps_connection_open() {
        let (mut server, connection) = live_connection();
        let transport = Arc::new(MockTransport::new().with_connection(connection));
        let (client, mut events) = StreamClient::start(transport, ClientOptions::default());

        let mut body = b"data: {\"siteStatuses\": ".to_vec();
        body.extend_from_slice(&[0xff, 0xfe]);
        body.extend_from_slice(b"}\n\n");
        body.extend_from_slice(sse_frame(&feed_json(&[("api", vec![1])])).as_bytes());
        server.write_all(&body).await.unwrap();

        assert_eq!(
            events.recv().await,
            Some(FeedEvent::State(ClientState::Connecting))
        );
        match events.recv().await {
            Some(FeedEvent::FrameError(FeedError::Parse(msg))) => assert!(msg.contains("UTF-8")),
            other => panic!("expected a frame error, got {other:?}"),
        }
        assert_eq!(
            events.recv().await,
            Some(FeedEvent::State(ClientState::Streaming))
        );
        let feed = next_frame(&mut events).await;
        assert!(feed.get("api").is_some());
        assert_eq!(client.state(), ClientState::Streaming);

        client.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_silent_connection_falls_back_to_polling() {
        let (_server, connection) = live_connection();
        let transport = Arc::new(MockTransport::new().with_connection(connection));
        let options = ClientOptions {
            idle_timeout: Some(Duration::from_secs(2)),
            ..ClientOptions::default()
        };
        let (client, events) = StreamClient::start(transport, options);

        let started = tokio::time::Instant::now();
        let events = collect(events).await;

        assert_eq!(
            events,
            vec![
                FeedEvent::State(ClientState::Connecting),
                FeedEvent::State(ClientState::Error),
                FeedEvent::State(ClientState::Polling),
            ]
        );
        assert_eq!(client.state(), ClientState::Polling);
        assert!(started.elapsed() >= Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stalled_connect_falls_back_to_polling() {
        let transport = Arc::new(MockTransport::new().with_stalled_connect());
        let options = ClientOptions {
            connect_timeout: Some(Duration::from_secs(5)),
            ..ClientOptions::default()
        };
        let (client, events) = StreamClient::start(transport.clone(), options);

        let events = collect(events).await;

        assert_eq!(events.last(), Some(&FeedEvent::State(ClientState::Polling)));
        assert_eq!(client.state(), ClientState::Polling);
        assert_eq!(transport.connect_calls(), 1);
    }

    #[tokio::test]
    async fn test_refused_connection_falls_back_to_polling() {
        let transport = Arc::new(MockTransport::new().with_refused_connect());

        let (client, events) = StreamClient::start(transport.clone(), ClientOptions::default());
        let events = collect(events).await;

        assert_eq!(
            events,
            vec![
                FeedEvent::State(ClientState::Connecting),
                FeedEvent::State(ClientState::Error),
                FeedEvent::State(ClientState::Polling),
            ]
        );
        assert_eq!(client.state(), ClientState::Polling);
        assert_eq!(transport.connect_calls(), 1);
    }

    #[tokio::test]
    async fn test_frames_delivered_in_order() {
        let body: String = (1..=5)
            .map(|n| {
                sse_frame(&feed_json(&[("api", vec![1; n])]))
            })
            .collect();
        let transport = Arc::new(MockTransport::new().with_stream(&body));

        let (_client, events) = StreamClient::start(transport, ClientOptions::default());
        let lengths: Vec<usize> = collect(events)
            .await
            .into_iter()
            .filter_map(|event| match event {
                FeedEvent::Frame(feed) => Some(feed.get("api").unwrap().statuses.len()),
                _ => None,
            })
            .collect();

        assert_eq!(lengths, vec![1, 2, 3, 4, 5]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reconnects_when_interval_set() {
        let body = sse_frame(&feed_json(&[("api", vec![1])]));
        let transport = Arc::new(
            MockTransport::new()
                .with_refused_connect()
                .with_stream(&body),
        );
        let options = ClientOptions {
            reconnect_interval: Some(Duration::from_millis(100)),
            ..ClientOptions::default()
        };

        let (client, mut events) = StreamClient::start(transport.clone(), options);

        let mut states = Vec::new();
        loop {
            match events.recv().await {
                Some(FeedEvent::State(state)) => states.push(state),
                Some(FeedEvent::Frame(_)) => break,
                other => panic!("unexpected event {other:?}"),
            }
        }

        assert_eq!(
            states,
            vec![
                ClientState::Connecting,
                ClientState::Error,
                ClientState::Polling,
                ClientState::Reconnecting,
                ClientState::Streaming,
            ]
        );
        assert_eq!(transport.connect_calls(), 2);

        client.stop().await;
        assert_eq!(client.state(), ClientState::Closed);
    }

    #[tokio::test]
    async fn test_stop_releases_connection() {
        let (mut server, connection) = live_connection();
        let transport = Arc::new(MockTransport::new().with_connection(connection));
        let (client, mut events) = StreamClient::start(transport, ClientOptions::default());

        let frame = sse_frame(&feed_json(&[("api", vec![1, 1])]));
        server.write_all(frame.as_bytes()).await.unwrap();
        let feed = next_frame(&mut events).await;
        assert_eq!(feed.get("api").unwrap().statuses.len(), 2);
        assert_eq!(client.state(), ClientState::Streaming);

        client.stop().await;

        assert_eq!(client.state(), ClientState::Closed);
        assert!(client.is_stopped());
        // The reading half is gone, so the server sees a broken pipe.
        assert!(server.write_all(frame.as_bytes()).await.is_err());
    }

    #[tokio::test]
    async fn test_stop_is_idempotent() {
        let transport = Arc::new(MockTransport::new().with_refused_connect());
        let (client, _events) = StreamClient::start(transport, ClientOptions::default());

        client.stop().await;
        client.stop().await;
        assert_eq!(client.state(), ClientState::Closed);
    }

    #[tokio::test]
    async fn test_drop_releases_connection() {
        let (mut server, connection) = live_connection();
        let transport = Arc::new(MockTransport::new().with_connection(connection));
        let (client, mut events) = StreamClient::start(transport, ClientOptions::default());

        server
            .write_all(sse_frame(&feed_json(&[("api", vec![1])])).as_bytes())
            .await
            .unwrap();
        next_frame(&mut events).await;

        drop(client);

        let released = tokio::time::timeout(Duration::from_secs(1), async {
            loop {
                if server.write_all(b": ping\n").await.is_err() {
                    break;
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await;
        assert!(released.is_ok(), "connection still open after drop");
    }

    #[tokio::test]
    async fn test_fetch_parses_body() {
        let transport = Arc::new(
            MockTransport::new()
                .with_refused_connect()
                .with_fetch(feed_json(&[("api", vec![1, 0])])),
        );
        let (client, _events) = StreamClient::start(transport.clone(), ClientOptions::default());

        let feed = client.fetch().await.unwrap();
        assert_eq!(feed.get("api").unwrap().statuses.len(), 2);
        assert_eq!(transport.fetch_calls(), 1);
    }

    #[tokio::test]
    async fn test_fetch_malformed_body_is_parse_error() {
        let transport = Arc::new(
            MockTransport::new()
                .with_refused_connect()
                .with_fetch("<html>502</html>"),
        );
        let (client, _events) = StreamClient::start(transport, ClientOptions::default());

        assert!(matches!(client.fetch().await, Err(FeedError::Parse(_))));
    }

    #[tokio::test]
    async fn test_fetch_after_stop_is_stopped() {
        let transport = Arc::new(
            MockTransport::new()
                .with_refused_connect()
                .with_fetch(feed_json(&[])),
        );
        let (client, _events) = StreamClient::start(transport.clone(), ClientOptions::default());

        client.stop().await;
        assert_eq!(client.fetch().await, Err(FeedError::Stopped));
        assert_eq!(transport.fetch_calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_interrupts_fetch() {
        let transport = Arc::new(
            MockTransport::new()
                .with_refused_connect()
                .with_slow_fetch(Duration::from_secs(5), feed_json(&[])),
        );
        let (client, _events) = StreamClient::start(transport, ClientOptions::default());
        let client = Arc::new(client);

        let pending = tokio::spawn({
            let client = client.clone();
            async move { client.fetch().await }
        });
        tokio::time::sleep(Duration::from_millis(10)).await;
        client.stop().await;

        assert_eq!(pending.await.unwrap(), Err(FeedError::Stopped));
    }

    #[test]
    fn test_state_labels() {
        assert_eq!(ClientState::Streaming.to_string(), "live");
        assert_eq!(ClientState::Polling.to_string(), "polling");
    }
}
