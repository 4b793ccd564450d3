//! Published snapshots.
//!
//! A [`Snapshot`] is built once per received feed document and never mutated
//! afterwards; readers share it through an `Arc`.

use std::collections::BTreeMap;
use std::time::Instant;

use serde::Serialize;

use statuswatch_types::{FeedResponse, Sample, Site, SiteStatus};

use super::aggregate::{aggregate, all_operational};
use super::classify::{classify, Classification, SampleState, Thresholds};
use super::normalize::{normalize, Chronological, NewestFirst};

/// One site with its normalized history and derived metrics.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteSeries {
    pub site: Site,
    /// Samples oldest first.
    pub statuses: Chronological,
    /// Uptime recomputed from `statuses`.
    #[serde(rename = "uptime")]
    pub uptime_percent: f64,
    pub last_state: SampleState,
    /// Uptime as the server reported it. Informational only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reported_uptime: Option<f64>,
}

impl SiteSeries {
    /// Normalize and aggregate one site's feed entry.
    pub fn from_status(status: SiteStatus, thresholds: &Thresholds, history_limit: usize) -> Self {
        let raw = NewestFirst::new(status.statuses).truncate(history_limit);
        let statuses = normalize(&raw);
        let summary = aggregate(&statuses, thresholds);

        Self {
            site: status.site,
            statuses,
            uptime_percent: summary.uptime_percent,
            last_state: summary.last_state,
            reported_uptime: status.uptime,
        }
    }

    /// Classification of every sample, oldest first.
    pub fn tracker(&self, thresholds: &Thresholds) -> Vec<Classification> {
        self.statuses.iter().map(|s| classify(s, thresholds)).collect()
    }

    /// The most recent sample.
    pub fn latest(&self) -> Option<&Sample> {
        self.statuses.latest()
    }
}

/// The aggregated state of every monitored site at one point in time.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    /// Series per site id.
    pub site_statuses: BTreeMap<String, SiteSeries>,
    /// True when every site's latest sample is operational (and when there
    /// are no sites at all).
    pub all_operational: bool,
    /// When the snapshot was built.
    #[serde(skip)]
    pub received_at: Instant,
}

impl Snapshot {
    /// Run a raw feed document through normalization and aggregation.
    ///
    /// Consumes the document so the newest-first histories cannot be
    /// normalized a second time.
    pub fn from_feed(feed: FeedResponse, thresholds: &Thresholds, history_limit: usize) -> Self {
        if feed.is_empty() {
            tracing::debug!("Feed reported zero sites");
        }

        let site_statuses: BTreeMap<String, SiteSeries> = feed
            .site_statuses
            .into_iter()
            .map(|(id, status)| (id, SiteSeries::from_status(status, thresholds, history_limit)))
            .collect();

        let all_operational = all_operational(site_statuses.values().map(|s| s.last_state));

        Self {
            site_statuses,
            all_operational,
            received_at: Instant::now(),
        }
    }

    pub fn len(&self) -> usize {
        self.site_statuses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.site_statuses.is_empty()
    }

    pub fn get(&self, site_id: &str) -> Option<&SiteSeries> {
        self.site_statuses.get(site_id)
    }

    /// Sites in id order.
    pub fn sites(&self) -> impl Iterator<Item = &SiteSeries> {
        self.site_statuses.values()
    }

    /// Number of sites whose latest state is `state`.
    pub fn count(&self, state: SampleState) -> usize {
        self.sites().filter(|s| s.last_state == state).count()
    }
}
