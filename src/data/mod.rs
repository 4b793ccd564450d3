//! Data models and processing for status feed documents.
//!
//! This module turns raw feed documents into health-annotated snapshots
//! suitable for display.
//!
//! ## Submodules
//!
//! - [`classify`]: Per-sample classification ([`SampleState`], [`Thresholds`])
//! - [`normalize`]: Feed order to chronological order ([`NewestFirst`], [`Chronological`])
//! - [`aggregate`]: Uptime and overall state ([`SeriesSummary`])
//! - [`snapshot`]: The published model ([`Snapshot`], [`SiteSeries`])
//!
//! ## Data Flow
//!
//! ```text
//! FeedResponse (raw JSON, newest first)
//!        │
//!        ▼
//! Snapshot::from_feed()
//!        │
//!        ├──▶ normalize()  (per site, exactly once)
//!        │
//!        ├──▶ aggregate()  (uptime, last state from Thresholds)
//!        │
//!        └──▶ all_operational()
//! ```

pub mod aggregate;
pub mod classify;
pub mod normalize;
pub mod snapshot;

pub use aggregate::{aggregate, all_operational, SeriesSummary};
pub use classify::{
    classify, format_observed_at, sample_state, Classification, SampleState, Thresholds,
    DEFAULT_DEGRADED_LATENCY_MS,
};
pub use normalize::{normalize, Chronological, NewestFirst};
pub use snapshot::{SiteSeries, Snapshot};
