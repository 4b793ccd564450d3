//! Wiring between the stream client, the store and the refresh timer.
//!
//! A [`Dashboard`] runs two background tasks:
//!
//! - the **event pump**, which hands every frame from the [`StreamClient`]
//!   to [`StatusStore::ingest`] in delivery order, and requests an immediate
//!   refresh when the client falls back to polling;
//! - the **refresher**, which serializes refresh requests from the periodic
//!   timer and from [`RefreshHandle`]s (focus regained, network restored,
//!   user request).

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{Duration, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::config::Settings;
use crate::source::{ClientOptions, ClientState, FeedEvent, FeedTransport, StreamClient};
use crate::store::StatusStore;

/// Why a refresh was requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshTrigger {
    /// The periodic poll timer fired.
    Timer,
    /// The application regained focus.
    FocusRegained,
    /// Network connectivity came back.
    ///
    /// A terminal has no connectivity event of its own, so nothing in this
    /// crate sends it. Embedders that watch the network do, through
    /// [`Dashboard::refresh_handle`].
    NetworkRestored,
    /// The client just fell back to polling.
    FallbackToPolling,
    /// The user asked for it.
    Manual,
}

/// Cheap handle for requesting refreshes from anywhere.
#[derive(Debug, Clone)]
pub struct RefreshHandle {
    tx: mpsc::UnboundedSender<RefreshTrigger>,
}

impl RefreshHandle {
    /// Queue a refresh. Returns false once the dashboard has stopped.
    pub fn request(&self, trigger: RefreshTrigger) -> bool {
        self.tx.send(trigger).is_ok()
    }
}

/// A running status dashboard.
#[derive(Debug)]
pub struct Dashboard {
    client: Arc<StreamClient>,
    store: Arc<StatusStore>,
    refresh: RefreshHandle,
    cancel: CancellationToken,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl Dashboard {
    /// Connect to the feed and start the background tasks.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(transport: Arc<dyn FeedTransport>, settings: &Settings) -> Self {
        let options = ClientOptions {
            reconnect_interval: settings.reconnect_interval(),
            connect_timeout: Some(settings.request_timeout()),
            idle_timeout: Some(settings.stream_idle_timeout()),
            ..ClientOptions::default()
        };
        let (client, events) = StreamClient::start(transport, options);
        let client = Arc::new(client);
        let store = Arc::new(StatusStore::new(
            client.clone(),
            settings.thresholds(),
            settings.history_limit,
        ));

        let (tx, triggers) = mpsc::unbounded_channel();
        let refresh = RefreshHandle { tx };
        let cancel = CancellationToken::new();

        let pump = tokio::spawn(pump_events(
            events,
            store.clone(),
            refresh.clone(),
            cancel.clone(),
        ));
        let refresher = tokio::spawn(run_refresher(
            triggers,
            store.clone(),
            settings.poll_interval(),
            cancel.clone(),
        ));

        tracing::info!(
            "Dashboard started ({}, polling every {:?})",
            client.description(),
            settings.poll_interval()
        );

        Self {
            client,
            store,
            refresh,
            cancel,
            tasks: Mutex::new(vec![pump, refresher]),
        }
    }

    pub fn store(&self) -> &Arc<StatusStore> {
        &self.store
    }

    pub fn refresh_handle(&self) -> RefreshHandle {
        self.refresh.clone()
    }

    /// Queue a refresh.
    pub fn trigger(&self, trigger: RefreshTrigger) -> bool {
        self.refresh.request(trigger)
    }

    pub fn client_state(&self) -> ClientState {
        self.client.state()
    }

    pub fn watch_client_state(&self) -> watch::Receiver<ClientState> {
        self.client.watch_state()
    }

    pub fn description(&self) -> &str {
        self.client.description()
    }

    /// Tear everything down.
    ///
    /// The store stops first, so no subscriber is notified once this has
    /// begun, even by a fetch that was already in flight.
    pub async fn stop(&self) {
        self.store.stop();
        self.cancel.cancel();
        self.client.stop().await;

        let tasks = std::mem::take(&mut *self.tasks.lock());
        for task in tasks {
            if let Err(e) = task.await {
                if e.is_panic() {
                    tracing::error!("Dashboard task panicked: {}", e);
                }
            }
        }
        tracing::info!("Dashboard stopped");
    }
}

impl Drop for Dashboard {
    fn drop(&mut self) {
        self.store.stop();
        self.cancel.cancel();
    }
}

async fn pump_events(
    mut events: mpsc::Receiver<FeedEvent>,
    store: Arc<StatusStore>,
    refresh: RefreshHandle,
    cancel: CancellationToken,
) {
    loop {
        let event = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            event = events.recv() => event,
        };
        let Some(event) = event else {
            break;
        };

        match event {
            FeedEvent::Frame(feed) => {
                store.ingest(feed);
            }
            FeedEvent::FrameError(err) => {
                tracing::debug!("Frame skipped: {}", err);
            }
            FeedEvent::State(ClientState::Polling) => {
                refresh.request(RefreshTrigger::FallbackToPolling);
            }
            FeedEvent::State(_) => {}
        }
    }
}

async fn run_refresher(
    mut triggers: mpsc::UnboundedReceiver<RefreshTrigger>,
    store: Arc<StatusStore>,
    period: Duration,
    cancel: CancellationToken,
) {
    let mut timer = tokio::time::interval_at(Instant::now() + period, period);
    timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        let trigger = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            Some(trigger) = triggers.recv() => trigger,
            _ = timer.tick() => RefreshTrigger::Timer,
        };
        tracing::debug!("Refresh requested ({:?})", trigger);

        // Failures are already reported to subscribers by the store.
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = store.refresh() => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FeedError;
    use crate::source::testing::{feed_json, live_connection, sse_frame, MockTransport};
    use crate::store::StoreUpdate;
    use tokio::io::AsyncWriteExt;

    fn settings() -> Settings {
        Settings {
            poll_interval_ms: 1_000,
            ..Settings::default()
        }
    }

    #[tokio::test]
    async fn test_malformed_then_valid_frame_publishes_once() {
        let (mut server, connection) = live_connection();
        let transport = Arc::new(MockTransport::new().with_connection(connection));
        let dashboard = Dashboard::start(transport, &settings());
        let mut sub = dashboard.store().subscribe();

        let body = format!(
            "data: {{\"siteStatuses\": [oops\n\n{}",
            sse_frame(&feed_json(&[("api", vec![1, 1, 0])]))
        );
        server.write_all(body.as_bytes()).await.unwrap();

        match sub.recv().await {
            Some(StoreUpdate::Snapshot(snapshot)) => {
                let api = snapshot.get("api").unwrap();
                assert_eq!(api.statuses.len(), 3);
                assert!((api.uptime_percent - 66.67).abs() < 0.01);
            }
            other => panic!("expected a snapshot, got {other:?}"),
        }

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(sub.try_recv().is_none());
        assert_eq!(dashboard.client_state(), ClientState::Streaming);
        assert!(dashboard.store().last_error().is_none());

        dashboard.stop().await;
    }

    #[tokio::test]
    async fn test_fallback_fetches_immediately() {
        let transport = Arc::new(
            MockTransport::new()
                .with_refused_connect()
                .with_fetch(feed_json(&[("api", vec![1])])),
        );
        let dashboard = Dashboard::start(transport.clone(), &Settings::default());
        let mut sub = dashboard.store().subscribe();

        // Well inside the 30 s poll interval.
        let update = tokio::time::timeout(Duration::from_secs(5), sub.recv())
            .await
            .unwrap();
        assert!(matches!(update, Some(StoreUpdate::Snapshot(_))));
        assert_eq!(dashboard.client_state(), ClientState::Polling);
        assert_eq!(transport.fetch_calls(), 1);

        dashboard.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_timer_refreshes_while_polling() {
        let transport = Arc::new(
            MockTransport::new()
                .with_fetch(feed_json(&[("api", vec![1])]))
                .with_fetch(feed_json(&[("api", vec![0, 1])])),
        );
        let dashboard = Dashboard::start(transport.clone(), &settings());
        let mut sub = dashboard.store().subscribe();

        assert!(matches!(sub.recv().await, Some(StoreUpdate::Snapshot(_))));
        assert_eq!(transport.fetch_calls(), 1);

        tokio::time::sleep(Duration::from_millis(1_100)).await;

        match sub.try_recv() {
            Some(StoreUpdate::Snapshot(snapshot)) => {
                assert_eq!(snapshot.get("api").unwrap().statuses.len(), 2);
            }
            other => panic!("expected a timer refresh, got {other:?}"),
        }
        assert_eq!(transport.fetch_calls(), 2);

        dashboard.stop().await;
    }

    #[tokio::test]
    async fn test_manual_trigger_and_error_marker() {
        let transport = Arc::new(
            MockTransport::new()
                .with_fetch(feed_json(&[("api", vec![1])]))
                .with_failed_fetch(FeedError::Fetch("502 Bad Gateway".to_string())),
        );
        let dashboard = Dashboard::start(transport.clone(), &Settings::default());
        let mut sub = dashboard.store().subscribe();

        assert!(matches!(sub.recv().await, Some(StoreUpdate::Snapshot(_))));

        assert!(dashboard.trigger(RefreshTrigger::Manual));
        assert!(matches!(sub.recv().await, Some(StoreUpdate::Error(FeedError::Fetch(_)))));

        assert!(dashboard.store().current().is_some());
        assert!(dashboard.store().display_state().error().is_some());

        dashboard.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_silent_stream_falls_back_to_polling() {
        let (_server, connection) = live_connection();
        let transport = Arc::new(
            MockTransport::new()
                .with_connection(connection)
                .with_fetch(feed_json(&[("api", vec![1])])),
        );
        let settings = Settings {
            stream_idle_timeout_ms: Some(2_500),
            ..settings()
        };
        let dashboard = Dashboard::start(transport.clone(), &settings);
        let mut sub = dashboard.store().subscribe();

        // Nothing arrives on the stream, so the client gives up on it and
        // the fallback fetch fills the view.
        assert!(matches!(sub.recv().await, Some(StoreUpdate::Snapshot(_))));
        assert_eq!(dashboard.client_state(), ClientState::Polling);
        assert_eq!(transport.fetch_calls(), 1);

        dashboard.stop().await;
    }

    #[tokio::test]
    async fn test_network_restored_hook_refreshes() {
        let transport = Arc::new(
            MockTransport::new()
                .with_fetch(feed_json(&[("api", vec![1])]))
                .with_fetch(feed_json(&[("api", vec![1, 1])])),
        );
        let dashboard = Dashboard::start(transport.clone(), &Settings::default());
        let mut sub = dashboard.store().subscribe();
        assert!(matches!(sub.recv().await, Some(StoreUpdate::Snapshot(_))));

        let handle = dashboard.refresh_handle();
        assert!(handle.request(RefreshTrigger::NetworkRestored));
        match sub.recv().await {
            Some(StoreUpdate::Snapshot(snapshot)) => {
                assert_eq!(snapshot.get("api").unwrap().statuses.len(), 2);
            }
            other => panic!("expected a snapshot, got {other:?}"),
        }
        assert_eq!(transport.fetch_calls(), 2);

        dashboard.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_notifications_after_stop() {
        let transport = Arc::new(
            MockTransport::new()
                .with_slow_fetch(Duration::from_millis(500), feed_json(&[("api", vec![1])]))
                .with_fetch(feed_json(&[("api", vec![1])])),
        );
        let dashboard = Dashboard::start(transport.clone(), &settings());
        let mut sub = dashboard.store().subscribe();

        // The fallback fetch is now in flight.
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(transport.fetch_calls(), 1);

        dashboard.stop().await;
        tokio::time::sleep(Duration::from_secs(5)).await;

        assert!(sub.recv().await.is_none());
        assert!(dashboard.store().current().is_none());
        assert_eq!(dashboard.client_state(), ClientState::Closed);
        assert_eq!(transport.fetch_calls(), 1);
        assert!(!dashboard.trigger(RefreshTrigger::NetworkRestored));
    }
}
