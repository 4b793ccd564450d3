//! Feed payloads: one document per event-stream frame or poll response.

use std::collections::BTreeMap;

use crate::{Sample, Site};

/// The status of one site as published by the server.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SiteStatus {
    /// The monitored site.
    pub site: Site,

    /// Recent samples, **newest first**.
    #[cfg_attr(feature = "serde", serde(default))]
    pub statuses: Vec<Sample>,

    /// Uptime percentage as computed by the server, if it sent one.
    #[cfg_attr(
        feature = "serde",
        serde(default, skip_serializing_if = "Option::is_none")
    )]
    pub uptime: Option<f64>,
}

impl SiteStatus {
    /// Create a site status from newest-first samples.
    pub fn new(site: Site, statuses: Vec<Sample>) -> Self {
        Self {
            site,
            statuses,
            uptime: None,
        }
    }

    /// Attach the server-reported uptime.
    pub fn with_uptime(mut self, uptime: f64) -> Self {
        self.uptime = Some(uptime);
        self
    }
}

/// A complete feed document.
///
/// Maps site id to that site's status. An empty map is a valid document: the
/// server simply monitors no sites.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FeedResponse {
    /// Status per site id.
    #[cfg_attr(
        feature = "serde",
        serde(rename = "siteStatuses", default)
    )]
    pub site_statuses: BTreeMap<String, SiteStatus>,
}

impl FeedResponse {
    /// Create an empty document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a site, keyed by its id.
    pub fn with_site(mut self, status: SiteStatus) -> Self {
        self.site_statuses.insert(status.site.id.clone(), status);
        self
    }

    /// Whether the document lists no sites.
    pub fn is_empty(&self) -> bool {
        self.site_statuses.is_empty()
    }

    /// Number of sites.
    pub fn len(&self) -> usize {
        self.site_statuses.len()
    }

    /// Status of one site.
    pub fn get(&self, site_id: &str) -> Option<&SiteStatus> {
        self.site_statuses.get(site_id)
    }
}
