//! Helpers for per-pod traces

use crate::models::Sample;
use std::collections::BTreeMap;
use tracing::debug;

const SECONDS_PER_DAY: i64 = 24 * 60 * 60;

/// Merge per-pod series into one, keeping the largest value per timestamp.
///
/// The result is sorted by timestamp. Non-finite values never win over a
/// finite one.
pub fn merge_max(pods: &[Vec<Sample>]) -> Vec<Sample> {
    let mut merged: BTreeMap<i64, f64> = BTreeMap::new();
    for (ts, value) in pods.iter().flatten() {
        merged
            .entry(*ts)
            .and_modify(|current| *current = current.max(*value))
            .or_insert(*value);
    }
    merged.into_iter().collect()
}

/// Drop every sample on an excluded UTC day.
///
/// Days count back from the day of `reference_ts`: 0 is that day, 1 the
/// day before, and so on.
pub fn exclude_days(samples: &[Sample], days_back: &[u32], reference_ts: i64) -> Vec<Sample> {
    if days_back.is_empty() {
        return samples.to_vec();
    }
    let reference_day = reference_ts.div_euclid(SECONDS_PER_DAY);
    let excluded: Vec<i64> = days_back
        .iter()
        .map(|d| reference_day - i64::from(*d))
        .collect();

    let kept: Vec<Sample> = samples
        .iter()
        .copied()
        .filter(|(ts, _)| !excluded.contains(&ts.div_euclid(SECONDS_PER_DAY)))
        .collect();
    debug!(
        excluded_days = ?days_back,
        dropped = samples.len() - kept.len(),
        "Excluded bad days from trace"
    );
    kept
}
