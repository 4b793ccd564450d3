//! Uptime and overall state computation.

use serde::Serialize;

use super::classify::{sample_state, SampleState, Thresholds};
use super::normalize::Chronological;

/// Derived metrics for one site's series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeriesSummary {
    /// Share of successful samples, 0 to 100. Zero for an empty series.
    pub uptime_percent: f64,
    /// Classification of the most recent sample, `Unknown` if there is none.
    pub last_state: SampleState,
}

/// Compute uptime and last state of a chronological series.
pub fn aggregate(series: &Chronological, thresholds: &Thresholds) -> SeriesSummary {
    let total = series.len();
    let uptime_percent = if total == 0 {
        0.0
    } else {
        let up = series.iter().filter(|s| s.is_up()).count();
        100.0 * up as f64 / total as f64
    };

    let last_state = series
        .latest()
        .map_or(SampleState::Unknown, |s| sample_state(s, thresholds));

    SeriesSummary {
        uptime_percent,
        last_state,
    }
}

/// Whether every site is operational.
///
/// Vacuously true when there are no sites. A site with no samples is
/// `Unknown` and therefore not operational.
pub fn all_operational<I>(last_states: I) -> bool
where
    I: IntoIterator<Item = SampleState>,
{
    last_states.into_iter().all(|s| s == SampleState::Operational)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::normalize::{normalize, NewestFirst};
    use chrono::{DateTime, TimeDelta};
    use statuswatch_types::Sample;

    /// Build a chronological series from oldest-first status codes.
    fn series(codes: &[i64]) -> Chronological {
        let base = DateTime::parse_from_rfc3339("2024-05-01T12:00:00Z").unwrap();
        let newest_first: Vec<Sample> = codes
            .iter()
            .enumerate()
            .rev()
            .map(|(i, &code)| Sample::new(code, base + TimeDelta::seconds(30 * i as i64), 50.0))
            .collect();
        normalize(&NewestFirst::new(newest_first))
    }

    #[test]
    fn test_empty_series() {
        let summary = aggregate(&series(&[]), &Thresholds::default());
        assert_eq!(summary.uptime_percent, 0.0);
        assert!(!summary.uptime_percent.is_nan());
        assert_eq!(summary.last_state, SampleState::Unknown);
    }

    #[test]
    fn test_two_up_one_down() {
        let summary = aggregate(&series(&[1, 1, 0]), &Thresholds::default());
        assert!((summary.uptime_percent - 66.666_666).abs() < 0.001);
        assert_eq!(summary.last_state, SampleState::Down);
    }

    #[test]
    fn test_last_state_uses_latest_sample() {
        let summary = aggregate(&series(&[0, 0, 1]), &Thresholds::default());
        assert_eq!(summary.last_state, SampleState::Operational);
        assert!((summary.uptime_percent - 33.333_333).abs() < 0.001);
    }

    #[test]
    fn test_uptime_bounds() {
        let t = Thresholds::default();
        assert_eq!(aggregate(&series(&[1, 1, 1]), &t).uptime_percent, 100.0);
        assert_eq!(aggregate(&series(&[0, 0]), &t).uptime_percent, 0.0);
    }

    #[test]
    fn test_all_operational() {
        use SampleState::*;
        assert!(all_operational(Vec::<SampleState>::new()));
        assert!(all_operational([Operational, Operational]));
        assert!(!all_operational([Operational, Down]));
        assert!(!all_operational([Operational, Degraded]));
        assert!(!all_operational([Unknown]));
    }
}
