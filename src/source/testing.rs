//! Scripted transport for tests.

use std::collections::VecDeque;
use std::fmt;
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Map, Value};
use tokio::io::{AsyncBufRead, BufReader, DuplexStream};

use super::{FeedConnection, FeedTransport};
use crate::error::FeedError;

type ScriptedFetch = (Duration, Result<String, FeedError>);

enum ScriptedConnect {
    Open(FeedConnection),
    Refused(FeedError),
    /// Never answers.
    Stall,
}

/// A [`FeedTransport`] that replays queued outcomes.
///
/// Connections and fetches are consumed in order. Once the connection queue
/// is empty every connect is refused; once the fetch queue is empty every
/// fetch fails.
pub(crate) struct MockTransport {
    connects: Mutex<VecDeque<ScriptedConnect>>,
    fetches: Mutex<VecDeque<ScriptedFetch>>,
    connect_calls: AtomicUsize,
    fetch_calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl fmt::Debug for MockTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockTransport")
            .field("connect_calls", &self.connect_calls)
            .field("fetch_calls", &self.fetch_calls)
            .finish_non_exhaustive()
    }
}

impl MockTransport {
    pub fn new() -> Self {
        Self {
            connects: Mutex::new(VecDeque::new()),
            fetches: Mutex::new(VecDeque::new()),
            connect_calls: AtomicUsize::new(0),
            fetch_calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    /// Queue a connection whose body is `body`, closed after it is read.
    pub fn with_stream(self, body: &str) -> Self {
        self.with_connection(Cursor::new(body.as_bytes().to_vec()))
    }

    pub fn with_connection<R>(self, reader: R) -> Self
    where
        R: AsyncBufRead + Send + Unpin + 'static,
    {
        self.connects
            .lock()
            .push_back(ScriptedConnect::Open(Box::new(reader)));
        self
    }

    pub fn with_refused_connect(self) -> Self {
        self.connects.lock().push_back(ScriptedConnect::Refused(
            FeedError::Connection("connection refused".to_string()),
        ));
        self
    }

    /// Queue a connect that hangs until it is cancelled.
    pub fn with_stalled_connect(self) -> Self {
        self.connects.lock().push_back(ScriptedConnect::Stall);
        self
    }

    pub fn with_fetch(self, body: impl Into<String>) -> Self {
        self.with_slow_fetch(Duration::ZERO, body)
    }

    pub fn with_slow_fetch(self, delay: Duration, body: impl Into<String>) -> Self {
        self.fetches.lock().push_back((delay, Ok(body.into())));
        self
    }

    pub fn with_failed_fetch(self, err: FeedError) -> Self {
        self.fetches.lock().push_back((Duration::ZERO, Err(err)));
        self
    }

    pub fn connect_calls(&self) -> usize {
        self.connect_calls.load(Ordering::SeqCst)
    }

    pub fn fetch_calls(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    /// Highest number of fetches observed running at the same time.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

/// Decrements the in-flight count even when the fetch future is dropped.
struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl FeedTransport for MockTransport {
    async fn connect(&self) -> Result<FeedConnection, FeedError> {
        self.connect_calls.fetch_add(1, Ordering::SeqCst);
        let next = self.connects.lock().pop_front();
        match next {
            Some(ScriptedConnect::Open(connection)) => Ok(connection),
            Some(ScriptedConnect::Refused(err)) => Err(err),
            Some(ScriptedConnect::Stall) => std::future::pending().await,
            None => Err(FeedError::Connection("connection refused".to_string())),
        }
    }

    async fn fetch(&self) -> Result<String, FeedError> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(running, Ordering::SeqCst);
        let _guard = InFlight(&self.in_flight);

        let next = self.fetches.lock().pop_front();
        let (delay, result) = next.unwrap_or_else(|| {
            (
                Duration::ZERO,
                Err(FeedError::Fetch("no response queued".to_string())),
            )
        });
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        result
    }

    fn description(&self) -> &str {
        "mock"
    }
}

/// An open connection the test writes to through the returned server half.
pub(crate) fn live_connection() -> (DuplexStream, BufReader<DuplexStream>) {
    let (client, server) = tokio::io::duplex(4096);
    (server, BufReader::new(client))
}

/// One event-stream frame carrying `payload`.
pub(crate) fn sse_frame(payload: &str) -> String {
    format!("data: {}\n\n", payload)
}

/// A feed document with one entry per `(site id, status codes newest first)`.
pub(crate) fn feed_json(sites: &[(&str, Vec<i64>)]) -> String {
    let site_statuses: Map<String, Value> = sites
        .iter()
        .map(|(id, codes)| {
            let statuses: Vec<Value> = codes
                .iter()
                .enumerate()
                .map(|(i, code)| {
                    json!({
                        "status": code,
                        "time": format!("2024-05-01T12:{:02}:00Z", 59 - i),
                        "msg": if *code == 0 { "timeout" } else { "200 OK" },
                        "ping": 50,
                    })
                })
                .collect();
            let entry = json!({
                "site": {
                    "id": id,
                    "url": format!("https://{}.example.com", id),
                    "name": id.to_uppercase(),
                },
                "statuses": statuses,
                "uptime": 100.0,
            });
            (id.to_string(), entry)
        })
        .collect();

    json!({ "siteStatuses": site_statuses }).to_string()
}
