//! Sample classification.
//!
//! Maps a single health sample to a qualitative state and the tooltip label a
//! dashboard shows for it.

use chrono::{DateTime, Datelike, FixedOffset};
use serde::Serialize;

use statuswatch_types::Sample;

/// Default latency above which a successful check counts as degraded.
pub const DEFAULT_DEGRADED_LATENCY_MS: u64 = 1000;

/// Thresholds for sample classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Thresholds {
    /// Latency (exclusive) above which an up sample is degraded.
    pub degraded_latency_ms: u64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            degraded_latency_ms: DEFAULT_DEGRADED_LATENCY_MS,
        }
    }
}

/// Qualitative state of a sample or a site.
///
/// Ordered from best to worst so that `max()` picks the most severe state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SampleState {
    Operational,
    Degraded,
    Down,
    /// No sample to classify.
    Unknown,
}

impl SampleState {
    /// Returns a short symbol for display.
    pub fn symbol(&self) -> &'static str {
        match self {
            SampleState::Operational => "UP",
            SampleState::Degraded => "SLOW",
            SampleState::Down => "DOWN",
            SampleState::Unknown => "?",
        }
    }

    /// Returns a human readable label.
    pub fn label(&self) -> &'static str {
        match self {
            SampleState::Operational => "Operational",
            SampleState::Degraded => "Degraded",
            SampleState::Down => "Down",
            SampleState::Unknown => "Unknown",
        }
    }
}

/// Result of classifying one sample.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub state: SampleState,
    pub tooltip: String,
}

/// State of a sample without building its tooltip.
pub fn sample_state(sample: &Sample, thresholds: &Thresholds) -> SampleState {
    if !sample.is_up() {
        SampleState::Down
    } else if sample.latency_ms > thresholds.degraded_latency_ms as f64 {
        SampleState::Degraded
    } else {
        SampleState::Operational
    }
}

/// Classify a sample.
///
/// Down samples are labelled `"Downtime: <time>"`, degraded samples
/// `"Degraded: <time>"`, and operational samples carry the time alone.
pub fn classify(sample: &Sample, thresholds: &Thresholds) -> Classification {
    let state = sample_state(sample, thresholds);
    let time = format_observed_at(&sample.observed_at);
    let tooltip = match state {
        SampleState::Down => format!("Downtime: {}", time),
        SampleState::Degraded => format!("Degraded: {}", time),
        _ => time,
    };
    Classification { state, tooltip }
}

/// Format a sample time as e.g. `"May 1st 2024, 2:03:04 pm"`, in the offset
/// the server reported.
pub fn format_observed_at(at: &DateTime<FixedOffset>) -> String {
    let day = at.day();
    format!(
        "{} {}{} {}",
        at.format("%B"),
        day,
        ordinal_suffix(day),
        at.format("%Y, %-I:%M:%S %P")
    )
}

fn ordinal_suffix(day: u32) -> &'static str {
    match (day % 10, day % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    }
}
