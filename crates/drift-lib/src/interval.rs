//! Interval recommender
//!
//! Runs the optimizer once per complete interval of a batch and rescales
//! each normalized target back to absolute resource units.

use crate::curator::{curate_samples, AlignedSeries};
use crate::models::TargetEntry;
use crate::optimizer::Optimizer;
use crate::stats::percentile;
use tracing::{debug, warn};

/// Percentile returned for workloads shorter than one interval
const SHORT_LIVED_PERCENTILE: f64 = 98.0;

pub struct IntervalRecommender {
    optimization_interval: usize,
    resource_request: f64,
}

impl IntervalRecommender {
    pub fn new(optimization_interval: usize, resource_request: f64) -> Self {
        Self {
            optimization_interval,
            resource_request,
        }
    }

    /// One target per whole interval of `batch`, in absolute units.
    ///
    /// `batch` holds absolute utilization; it is normalized by the
    /// resource request and curated before optimization.
    pub fn recommend(&self, batch: &AlignedSeries, ue_weight: f64) -> Vec<TargetEntry> {
        let interval = self.optimization_interval;
        let normalized: Vec<f64> = batch
            .usage
            .iter()
            .map(|v| v / self.resource_request)
            .collect();

        let usage = curate_samples(&normalized, interval);
        let throttle = curate_samples(&batch.throttle, interval);

        // curation drops a leading remainder, keep timestamps in step
        let offset = batch.len() - usage.len();
        let starts = batch
            .timestamps
            .get(offset)
            .map(|&first| batch.since(first).interval_starts(interval))
            .unwrap_or_default();

        let optimizer = Optimizer::new(ue_weight);
        let targets: Vec<TargetEntry> = usage
            .chunks_exact(interval)
            .zip(throttle.chunks_exact(interval))
            .zip(starts)
            .map(|((samples, throttles), interval_start)| {
                let optimized = optimizer.optimize(samples, throttles);
                TargetEntry {
                    interval_start,
                    target: optimized.value * self.resource_request,
                }
            })
            .collect();

        debug!(
            intervals = targets.len(),
            optimization_interval = interval,
            ue_weight = ue_weight,
            "Optimized new intervals"
        );
        targets
    }
}

/// Target for a workload with less than one interval of history.
///
/// `usage` is in absolute units; the result is the 98th percentile of its
/// valid samples.
pub fn short_lived_target(usage: &[f64]) -> f64 {
    let valid: Vec<f64> = usage.iter().copied().filter(|v| v.is_finite()).collect();
    let target = percentile(&valid, SHORT_LIVED_PERCENTILE);
    warn!(
        samples = valid.len(),
        target = target,
        "Not enough samples for one interval, using 98th percentile"
    );
    target
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::curator::align;
    use crate::models::Sample;

    fn series(values: &[f64], start: i64) -> AlignedSeries {
        let usage: Vec<Sample> = values
            .iter()
            .enumerate()
            .map(|(i, v)| (start + i as i64 * 60, *v))
            .collect();
        align(&usage, &[]).unwrap()
    }

    #[test]
    fn test_one_target_per_interval() {
        let values: Vec<f64> = (0..120).map(|i| 1.0 + (i % 7) as f64 * 0.1).collect();
        let batch = series(&values, 6_000);
        let targets = IntervalRecommender::new(40, 2.0).recommend(&batch, 0.9);

        assert_eq!(targets.len(), 3);
        assert_eq!(
            targets.iter().map(|t| t.interval_start).collect::<Vec<_>>(),
            vec![6_000, 8_400, 10_800]
        );
        // absolute targets stay within the observed absolute range
        for entry in &targets {
            assert!(entry.target >= 1.0 && entry.target <= 1.6 + 1e-9, "{:?}", entry);
        }
    }

    #[test]
    fn test_leading_remainder_shifts_interval_starts() {
        let values: Vec<f64> = (0..130).map(|i| 0.5 + (i % 3) as f64 * 0.1).collect();
        let batch = series(&values, 0);
        let targets = IntervalRecommender::new(40, 1.0).recommend(&batch, 0.9);

        assert_eq!(
            targets.iter().map(|t| t.interval_start).collect::<Vec<_>>(),
            vec![600, 3_000, 5_400]
        );
    }

    #[test]
    fn test_targets_scale_with_request() {
        let values: Vec<f64> = (0..60).map(|i| 0.5 + (i % 5) as f64 * 0.125).collect();
        let batch = series(&values, 0);
        let scaled: Vec<f64> = values.iter().map(|v| v * 4.0).collect();
        let scaled_batch = series(&scaled, 0);

        let base = IntervalRecommender::new(60, 1.0).recommend(&batch, 0.8);
        let big = IntervalRecommender::new(60, 4.0).recommend(&scaled_batch, 0.8);

        assert_eq!(base.len(), 1);
        assert!((big[0].target - 4.0 * base[0].target).abs() < 1e-9);
    }

    #[test]
    fn test_short_lived_target_is_p98() {
        let usage: Vec<f64> = (1..=100).map(|i| i as f64).collect();
        // rank 0.98 * 99 = 97.02 between 98 and 99
        assert!((short_lived_target(&usage) - 98.02).abs() < 1e-9);

        let with_gaps = vec![f64::NAN, 2.0, 2.0, f64::NAN];
        assert_eq!(short_lived_target(&with_gaps), 2.0);
    }
}
