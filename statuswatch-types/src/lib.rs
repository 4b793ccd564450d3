//! # statuswatch-types
//!
//! Wire schema of the site status feed. A status server checks a set of
//! monitored sites on a fixed cadence and publishes, for every site, its most
//! recent health samples. This crate defines those payloads so that producers
//! and consumers (such as the statuswatch dashboard) agree on one format.
//!
//! ## Features
//!
//! - `serde`: JSON serialization matching the feed's field names
//!   (`siteStatuses`, `status`, `time`, `msg`, `ping`).
//!
//! ## Ordering
//!
//! The feed delivers each site's samples **newest first**. Nothing in this
//! crate reorders them; consumers are expected to normalize the order once
//! per received payload.
//!
//! ## Example
//!
//! ```rust
//! use chrono::DateTime;
//! use statuswatch_types::{FeedResponse, Sample, Site, SiteStatus};
//!
//! let at = DateTime::parse_from_rfc3339("2024-05-01T12:00:30+00:00").unwrap();
//! let site = Site::new("api", "https://api.example.com", "API");
//!
//! let feed = FeedResponse::new().with_site(SiteStatus::new(
//!     site,
//!     vec![Sample::up(at, 120.0), Sample::down(at - chrono::TimeDelta::seconds(30))],
//! ));
//!
//! assert_eq!(feed.len(), 1);
//! assert!(feed.get("api").unwrap().statuses[0].is_up());
//! ```

mod feed;
mod sample;
mod site;

pub use feed::*;
pub use sample::*;
pub use site::*;
