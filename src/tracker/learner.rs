//! Respawn window learning from observed times of death.
//!
//! Consecutive TOD gaps estimate the respawn interval. Gaps of a quarter hour or
//! less are treated as duplicate reports. With four or more usable gaps the
//! single shortest and longest are dropped as outliers, then a 5% margin is
//! applied to each bound.

use crate::tracker::types::{Confidence, RespawnWindow, Timestamp};

/// Gaps at or below this many hours are discarded as noise.
pub const NOISE_GAP_HOURS: f64 = 0.25;
/// Usable gap count from which the extremes are trimmed.
pub const TRIM_THRESHOLD: usize = 4;
pub const MIN_MARGIN: f64 = 0.95;
pub const MAX_MARGIN: f64 = 1.05;

/// Output of one learning pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Learned {
    pub window: Option<RespawnWindow>,
    pub confidence: Confidence,
}

impl Learned {
    fn insufficient() -> Self {
        Self {
            window: None,
            confidence: Confidence::Low,
        }
    }
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

/// Confidence from the untrimmed usable-gap count.
pub fn confidence_for(gap_count: usize) -> Confidence {
    match gap_count {
        0..=2 => Confidence::Low,
        3..=5 => Confidence::Medium,
        _ => Confidence::High,
    }
}

/// Usable consecutive gaps in hours, sorted ascending.
pub fn usable_gaps(history: &[Timestamp]) -> Vec<f64> {
    let mut times = history.to_vec();
    times.sort();
    let mut gaps: Vec<f64> = times
        .windows(2)
        .map(|pair| (pair[1] - pair[0]).num_milliseconds() as f64 / 3_600_000.0)
        .filter(|h| *h > NOISE_GAP_HOURS)
        .collect();
    gaps.sort_by(|a, b| a.total_cmp(b));
    gaps
}

/// Learn a window from a TOD history. Pure; never looks at stored window fields.
pub fn learn_window(history: &[Timestamp]) -> Learned {
    if history.len() < 2 {
        return Learned::insufficient();
    }
    let gaps = usable_gaps(history);
    if gaps.is_empty() {
        return Learned::insufficient();
    }

    let trimmed: &[f64] = if gaps.len() >= TRIM_THRESHOLD {
        &gaps[1..gaps.len() - 1]
    } else {
        &gaps
    };

    // trimmed is sorted and non-empty (>= 2 remain after trimming 4+)
    let shortest = trimmed.first().copied().unwrap_or_default();
    let longest = trimmed.last().copied().unwrap_or_default();

    Learned {
        window: Some(RespawnWindow {
            min_hours: round2(shortest * MIN_MARGIN),
            max_hours: round2(longest * MAX_MARGIN),
        }),
        confidence: confidence_for(gaps.len()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration};

    fn base() -> Timestamp {
        DateTime::parse_from_rfc3339("2025-12-05T02:00:00-05:00").unwrap()
    }

    fn at_hours(offsets: &[f64]) -> Vec<Timestamp> {
        offsets
            .iter()
            .map(|h| base() + Duration::seconds((h * 3600.0) as i64))
            .collect()
    }

    #[test]
    fn fewer_than_two_entries_is_insufficient() {
        assert_eq!(learn_window(&[]), Learned::insufficient());
        assert_eq!(learn_window(&at_hours(&[0.0])), Learned::insufficient());
    }

    #[test]
    fn single_gap_gives_low_confidence_window() {
        let learned = learn_window(&at_hours(&[0.0, 12.0]));
        let w = learned.window.unwrap();
        assert_eq!(w.min_hours, 11.4);
        assert_eq!(w.max_hours, 12.6);
        assert_eq!(learned.confidence, Confidence::Low);
    }

    #[test]
    fn noise_gaps_are_discarded() {
        // only a 10 minute gap: nothing usable
        assert_eq!(learn_window(&at_hours(&[0.0, 0.1666])), Learned::insufficient());
        // exactly 15 minutes is still noise
        assert_eq!(learn_window(&at_hours(&[0.0, 0.25])), Learned::insufficient());

        let learned = learn_window(&at_hours(&[0.0, 0.1, 10.1]));
        let w = learned.window.unwrap();
        assert_eq!(w.min_hours, 9.5);
        assert_eq!(w.max_hours, 10.5);
    }

    #[test]
    fn history_order_does_not_matter() {
        let sorted = learn_window(&at_hours(&[0.0, 8.0, 18.0]));
        let shuffled = learn_window(&at_hours(&[18.0, 0.0, 8.0]));
        assert_eq!(sorted, shuffled);
        let w = sorted.window.unwrap();
        assert_eq!(w.min_hours, 7.6);
        assert_eq!(w.max_hours, 10.5);
    }

    #[test]
    fn three_gaps_are_not_trimmed_and_medium() {
        // gaps 8, 10, 12
        let learned = learn_window(&at_hours(&[0.0, 8.0, 18.0, 30.0]));
        let w = learned.window.unwrap();
        assert_eq!(w.min_hours, 7.6);
        assert_eq!(w.max_hours, 12.6);
        assert_eq!(learned.confidence, Confidence::Medium);
    }

    #[test]
    fn four_gaps_trim_one_smallest_and_one_largest() {
        // gaps 1, 9, 10, 20 -> trimmed 9, 10; confidence from 4 untrimmed gaps
        let learned = learn_window(&at_hours(&[0.0, 1.0, 10.0, 20.0, 40.0]));
        let w = learned.window.unwrap();
        assert_eq!(w.min_hours, 8.55);
        assert_eq!(w.max_hours, 10.5);
        assert_eq!(learned.confidence, Confidence::Medium);
    }

    #[test]
    fn six_gaps_are_high_confidence() {
        // gaps 10, 11, 12, 10, 11, 12
        let learned = learn_window(&at_hours(&[0.0, 10.0, 21.0, 33.0, 43.0, 54.0, 66.0]));
        let w = learned.window.unwrap();
        assert_eq!(learned.confidence, Confidence::High);
        // trimmed to 10, 11, 11, 12 after dropping one 10 and one 12
        assert_eq!(w.min_hours, 9.5);
        assert_eq!(w.max_hours, 12.6);
    }

    #[test]
    fn confidence_bands() {
        assert_eq!(confidence_for(0), Confidence::Low);
        assert_eq!(confidence_for(2), Confidence::Low);
        assert_eq!(confidence_for(3), Confidence::Medium);
        assert_eq!(confidence_for(5), Confidence::Medium);
        assert_eq!(confidence_for(6), Confidence::High);
        assert_eq!(confidence_for(9), Confidence::High);
    }
}
