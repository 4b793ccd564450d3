//! The reactive status store.
//!
//! [`StatusStore`] holds the one current [`Snapshot`] and fans updates out
//! to subscribers. Snapshots arrive either pushed (a stream frame handed to
//! [`StatusStore::ingest`]) or pulled ([`StatusStore::refresh`], only while
//! the client is polling).
//!
//! Refreshes are queued: a refresh requested while another is running waits
//! for it to finish, so results are applied in the order they were
//! requested. A refresh whose fetch started before a newer snapshot was
//! published discards its own result.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;

use statuswatch_types::FeedResponse;

use crate::data::{Snapshot, Thresholds};
use crate::error::FeedError;
use crate::source::{ClientState, StreamClient};

/// A notification delivered to subscribers.
#[derive(Debug, Clone)]
pub enum StoreUpdate {
    /// A new snapshot replaced the current one.
    Snapshot(Arc<Snapshot>),
    /// A refresh failed. The current snapshot, if any, is unchanged.
    Error(FeedError),
}

/// What the user should see right now.
#[derive(Debug, Clone)]
pub enum DisplayState {
    /// Nothing received yet.
    Loading,
    /// Nothing ever received, and the last attempt failed.
    Unavailable(FeedError),
    /// The last good snapshot, with the latest failure since it if any.
    Ready {
        snapshot: Arc<Snapshot>,
        error: Option<FeedError>,
    },
}

impl DisplayState {
    pub fn new(snapshot: Option<Arc<Snapshot>>, error: Option<FeedError>) -> Self {
        match (snapshot, error) {
            (Some(snapshot), error) => DisplayState::Ready { snapshot, error },
            (None, Some(error)) => DisplayState::Unavailable(error),
            (None, None) => DisplayState::Loading,
        }
    }

    pub fn snapshot(&self) -> Option<&Arc<Snapshot>> {
        match self {
            DisplayState::Ready { snapshot, .. } => Some(snapshot),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&FeedError> {
        match self {
            DisplayState::Loading => None,
            DisplayState::Unavailable(error) => Some(error),
            DisplayState::Ready { error, .. } => error.as_ref(),
        }
    }
}

/// Receiving end of [`StatusStore::subscribe`].
///
/// Ends (returns `None`) once the store is stopped.
#[derive(Debug)]
pub struct Subscription {
    receiver: mpsc::UnboundedReceiver<StoreUpdate>,
}

impl Subscription {
    pub async fn recv(&mut self) -> Option<StoreUpdate> {
        self.receiver.recv().await
    }

    /// Next queued update without waiting.
    pub fn try_recv(&mut self) -> Option<StoreUpdate> {
        self.receiver.try_recv().ok()
    }
}

#[derive(Debug, Default)]
struct Inner {
    snapshot: Option<Arc<Snapshot>>,
    last_error: Option<FeedError>,
    subscribers: Vec<mpsc::UnboundedSender<StoreUpdate>>,
    stopped: bool,
    /// Bumped on every published snapshot.
    generation: u64,
}

impl Inner {
    fn notify(&mut self, update: StoreUpdate) {
        self.subscribers.retain(|tx| tx.send(update.clone()).is_ok());
    }

    fn publish(&mut self, snapshot: Snapshot) -> Arc<Snapshot> {
        let snapshot = Arc::new(snapshot);
        self.snapshot = Some(snapshot.clone());
        self.last_error = None;
        self.generation += 1;
        self.notify(StoreUpdate::Snapshot(snapshot.clone()));
        snapshot
    }
}

/// Holds the current snapshot and notifies subscribers of changes.
#[derive(Debug)]
pub struct StatusStore {
    client: Arc<StreamClient>,
    thresholds: Thresholds,
    history_limit: usize,
    inner: Mutex<Inner>,
    refresh_gate: tokio::sync::Mutex<()>,
}

impl StatusStore {
    pub fn new(client: Arc<StreamClient>, thresholds: Thresholds, history_limit: usize) -> Self {
        Self {
            client,
            thresholds,
            history_limit,
            inner: Mutex::new(Inner::default()),
            refresh_gate: tokio::sync::Mutex::new(()),
        }
    }

    pub fn client(&self) -> &Arc<StreamClient> {
        &self.client
    }

    pub fn thresholds(&self) -> &Thresholds {
        &self.thresholds
    }

    /// The current snapshot, if one has been received.
    pub fn current(&self) -> Option<Arc<Snapshot>> {
        self.inner.lock().snapshot.clone()
    }

    /// The failure reported since the current snapshot, if any.
    pub fn last_error(&self) -> Option<FeedError> {
        self.inner.lock().last_error.clone()
    }

    pub fn display_state(&self) -> DisplayState {
        let inner = self.inner.lock();
        DisplayState::new(inner.snapshot.clone(), inner.last_error.clone())
    }

    pub fn is_stopped(&self) -> bool {
        self.inner.lock().stopped
    }

    /// Receive every later update exactly once, in order.
    pub fn subscribe(&self) -> Subscription {
        let (tx, receiver) = mpsc::unbounded_channel();
        let mut inner = self.inner.lock();
        if !inner.stopped {
            inner.subscribers.push(tx);
        }
        Subscription { receiver }
    }

    /// Run a raw feed document through the pipeline and publish the result.
    ///
    /// Returns `None` when the store has been stopped.
    pub fn ingest(&self, feed: FeedResponse) -> Option<Arc<Snapshot>> {
        let snapshot = Snapshot::from_feed(feed, &self.thresholds, self.history_limit);

        let mut inner = self.inner.lock();
        if inner.stopped {
            return None;
        }
        Some(inner.publish(snapshot))
    }

    /// Record a failure and tell subscribers. The current snapshot stays.
    pub fn report_error(&self, error: FeedError) {
        let mut inner = self.inner.lock();
        if inner.stopped {
            return;
        }
        inner.last_error = Some(error.clone());
        inner.notify(StoreUpdate::Error(error));
    }

    /// Fetch a fresh document if the client is polling.
    ///
    /// Waits for any refresh already running. Returns `Ok(true)` when a new
    /// snapshot was published and `Ok(false)` when there was nothing to do
    /// or the result was discarded. Fetch failures are reported to
    /// subscribers and returned.
    pub async fn refresh(&self) -> Result<bool, FeedError> {
        let _gate = self.refresh_gate.lock().await;

        if self.is_stopped() {
            return Ok(false);
        }
        let state = self.client.state();
        if state != ClientState::Polling {
            tracing::debug!("Skipping refresh, client is {}", state);
            return Ok(false);
        }

        let started = self.inner.lock().generation;
        match self.client.fetch().await {
            Ok(feed) => {
                let snapshot = Snapshot::from_feed(feed, &self.thresholds, self.history_limit);

                let mut inner = self.inner.lock();
                if inner.stopped {
                    tracing::debug!("Discarding refresh result, store stopped");
                    return Ok(false);
                }
                if inner.generation != started {
                    tracing::debug!("Discarding refresh result, a newer snapshot arrived");
                    return Ok(false);
                }
                inner.publish(snapshot);
                Ok(true)
            }
            Err(FeedError::Stopped) => Ok(false),
            Err(err) => {
                tracing::warn!("Refresh failed: {}", err);
                self.report_error(err.clone());
                Err(err)
            }
        }
    }

    /// Stop publishing.
    ///
    /// Subscriptions end, and nothing that completes afterwards (including
    /// a refresh already in flight) changes the store or notifies anyone.
    pub fn stop(&self) {
        let mut inner = self.inner.lock();
        if inner.stopped {
            return;
        }
        inner.stopped = true;
        inner.subscribers.clear();
        tracing::info!("Status store stopped");
    }
}
