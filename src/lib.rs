//! # statuswatch
//!
//! A live status dashboard and library for site health-check feeds.
//!
//! A status server publishes, for every monitored site, its recent
//! health-check samples (newest first). This crate receives those documents
//! over a live event stream, falls back to polling when the stream is
//! unavailable, turns each document into an immutable [`Snapshot`] and
//! keeps the latest one in a [`StatusStore`] that the terminal UI renders.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                           Dashboard                              │
//! │  ┌──────────────┐  FeedEvent   ┌─────────────┐  StoreUpdate      │
//! │  │ StreamClient │─────────────▶│ StatusStore │────────────▶ app  │
//! │  │  (source)    │◀─── fetch ───│  (store)    │             │     │
//! │  └──────┬───────┘              └──────▲──────┘             ▼     │
//! │         │                             │ refresh           ui     │
//! │         ▼                        timer / focus / key             │
//! │   FeedTransport ◀── HttpTransport                                │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! - **[`source`]**: the [`FeedTransport`] trait, the event-stream decoder,
//!   the HTTP transport and the [`StreamClient`] state machine
//! - **[`data`]**: classification, normalization and aggregation of raw
//!   feed documents into [`Snapshot`]s
//! - **[`store`]**: the [`StatusStore`] holding the current snapshot
//! - **[`dashboard`]**: wiring of client, store and refresh timer
//! - **[`app`]**, **[`events`]**, **[`ui`]**: the terminal dashboard
//!
//! ## Usage
//!
//! ### As a CLI tool
//!
//! ```bash
//! # Watch a status server
//! statuswatch --feed-url https://status.example.com/status \
//!             --upstream-url https://status-api.example.com
//!
//! # Write one snapshot as JSON and exit
//! statuswatch --export status.json
//! ```
//!
//! ### As a library
//!
//! ```no_run
//! use std::sync::Arc;
//! use statuswatch::{Dashboard, HttpTransport, Settings, StoreUpdate};
//!
//! # tokio_test::block_on(async {
//! let settings = Settings::load(None).unwrap();
//! let transport = Arc::new(HttpTransport::new(&settings).unwrap());
//! let dashboard = Dashboard::start(transport, &settings);
//!
//! let mut updates = dashboard.store().subscribe();
//! while let Some(update) = updates.recv().await {
//!     if let StoreUpdate::Snapshot(snapshot) = update {
//!         println!("all operational: {}", snapshot.all_operational);
//!     }
//! }
//! # });
//! ```
//!
//! ### Running the pipeline by hand
//!
//! ```
//! use statuswatch::{FeedResponse, Snapshot, Thresholds};
//!
//! let feed: FeedResponse = serde_json::from_str(r#"{
//!     "siteStatuses": {
//!         "api": {
//!             "site": {"id": "api", "url": "https://api.example.com", "name": "API"},
//!             "statuses": [
//!                 {"status": 0, "time": "2024-05-01T12:01:00Z", "msg": "timeout", "ping": 0},
//!                 {"status": 1, "time": "2024-05-01T12:00:00Z", "msg": "200 OK", "ping": 80}
//!             ]
//!         }
//!     }
//! }"#).unwrap();
//!
//! let snapshot = Snapshot::from_feed(feed, &Thresholds::default(), 60);
//! assert_eq!(snapshot.get("api").unwrap().uptime_percent, 50.0);
//! assert!(!snapshot.all_operational);
//! ```

pub mod app;
pub mod config;
pub mod dashboard;
pub mod data;
pub mod error;
pub mod events;
pub mod source;
pub mod store;
pub mod ui;

// Re-export main types for convenience
pub use app::App;
pub use config::Settings;
pub use dashboard::{Dashboard, RefreshHandle, RefreshTrigger};
pub use data::{Classification, SampleState, SiteSeries, Snapshot, Thresholds};
pub use error::FeedError;
pub use source::{
    ClientOptions, ClientState, FeedEvent, FeedResponse, FeedTransport, HttpTransport, Sample,
    Site, SiteStatus, StreamClient,
};
pub use store::{DisplayState, StatusStore, StoreUpdate, Subscription};
