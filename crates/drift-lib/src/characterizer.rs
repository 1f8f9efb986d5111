//! Workload characterization
//!
//! Derives the under-estimation weight for the optimizer's loss from three
//! traits of the historical utilization: whether it follows a daily cycle,
//! how widely it spreads, and the workload's priority.

use crate::config::Priority;
use crate::curator::curate_samples;
use crate::models::Characterization;
use crate::stats::{mean, std_dev};
use rustfft::num_complex::Complex;
use rustfft::FftPlanner;
use tracing::debug;

/// Maximum standard deviation of a variable confined to [0, 1]
const MAX_STD: f64 = 0.5;

/// Number of strongest frequencies inspected for the daily component
const TOP_FREQUENCIES: usize = 5;

/// Minimum normalized power of the daily component
const PERIOD_POWER_THRESHOLD: f64 = 0.1;

/// Weight before any reduction
const BASE_WEIGHT: f64 = 0.99;

const PERIODICITY_IMPACT: f64 = 0.02;
const SPREAD_IMPACT: f64 = 0.05;

/// Computes the under-estimation weight of a workload
pub struct WorkloadCharacterizer {
    optimization_interval: usize,
    diurnal_len_in_min: usize,
    priority: Priority,
}

impl WorkloadCharacterizer {
    pub fn new(optimization_interval: usize, diurnal_len_in_min: usize, priority: Priority) -> Self {
        Self {
            optimization_interval,
            diurnal_len_in_min,
            priority,
        }
    }

    /// Characterize utilization already normalized by the resource request
    pub fn characterize(&self, normalized_usage: &[f64]) -> Characterization {
        let samples = curate_samples(normalized_usage, self.optimization_interval);

        let is_periodic = has_daily_periodicity(&samples, self.diurnal_len_in_min);
        let spread = spread(&samples);

        let periodic_impact = if is_periodic { PERIODICITY_IMPACT } else { 0.0 };
        let ue_weight =
            BASE_WEIGHT - periodic_impact - SPREAD_IMPACT * spread - self.priority.impact();

        debug!(
            ue_weight = ue_weight,
            is_periodic = is_periodic,
            spread = spread,
            samples = samples.len(),
            "Workload characterized"
        );

        Characterization {
            ue_weight: ue_weight.clamp(0.0, 1.0),
            is_periodic,
            spread,
        }
    }
}

/// Standard deviation relative to the largest possible for a [0, 1] variable
pub fn spread(samples: &[f64]) -> f64 {
    (std_dev(samples) / MAX_STD).clamp(0.0, 1.0)
}

/// Whether the series carries a strong component at `1 / diurnal_len`.
///
/// The samples are standardized, their power spectrum is taken with a
/// real DFT and normalized to unit sum; the daily frequency must rank
/// among the five strongest and hold more than 10% of the power.
pub fn has_daily_periodicity(samples: &[f64], diurnal_len: usize) -> bool {
    let n = samples.len();
    if n < 2 || diurnal_len == 0 || n % diurnal_len != 0 {
        // 1 / diurnal_len is not an exact frequency bin
        return false;
    }
    let daily_bin = n / diurnal_len;
    if daily_bin > n / 2 {
        return false;
    }

    let avg = mean(samples);
    let std = std_dev(samples);
    if std < f64::EPSILON {
        return false;
    }

    let power = power_spectrum(samples, avg, std);
    let total: f64 = power.iter().sum();
    if total.is_nan() || total <= 0.0 {
        return false;
    }

    let mut ranked: Vec<usize> = (0..power.len()).collect();
    ranked.sort_by(|&a, &b| power[b].partial_cmp(&power[a]).unwrap_or(std::cmp::Ordering::Equal));
    ranked.truncate(TOP_FREQUENCIES);

    let daily_power = power[daily_bin] / total;
    debug!(
        daily_bin = daily_bin,
        daily_power = daily_power,
        top_bins = ?ranked,
        "Periodicity spectrum"
    );

    ranked.contains(&daily_bin) && daily_power > PERIOD_POWER_THRESHOLD
}

/// Squared magnitudes of the non-negative frequency bins of the standardized series
fn power_spectrum(samples: &[f64], avg: f64, std: f64) -> Vec<f64> {
    let n = samples.len();
    let mut buffer: Vec<Complex<f64>> = samples
        .iter()
        .map(|x| Complex::new((x - avg) / std, 0.0))
        .collect();

    let mut planner = FftPlanner::<f64>::new();
    let fft = planner.plan_fft_forward(n);
    fft.process(&mut buffer);

    buffer[..=n / 2].iter().map(|c| c.norm_sqr()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use std::f64::consts::PI;

    const DAY: usize = 1440;

    fn daily_sine(days: usize) -> Vec<f64> {
        (0..days * DAY)
            .map(|t| 0.5 + 0.4 * (2.0 * PI * t as f64 / DAY as f64).sin())
            .collect()
    }

    fn white_noise(len: usize, seed: u64) -> Vec<f64> {
        let mut rng = StdRng::seed_from_u64(seed);
        (0..len).map(|_| rng.gen_range(0.0..1.0)).collect()
    }

    #[test]
    fn test_sine_is_periodic() {
        assert!(has_daily_periodicity(&daily_sine(7), DAY));
    }

    #[test]
    fn test_white_noise_is_not_periodic() {
        for seed in [1, 7, 42] {
            assert!(!has_daily_periodicity(&white_noise(7 * DAY, seed), DAY));
        }
    }

    #[test]
    fn test_non_multiple_length_is_not_periodic() {
        let mut samples = daily_sine(7);
        samples.truncate(7 * DAY - 10);
        assert!(!has_daily_periodicity(&samples, DAY));
    }

    #[test]
    fn test_constant_series() {
        let samples = vec![0.3; 2 * DAY];
        assert!(!has_daily_periodicity(&samples, DAY));
        assert_eq!(spread(&samples), 0.0);
    }

    #[test]
    fn test_spread_of_extremes() {
        let samples: Vec<f64> = (0..1000).map(|i| (i % 2) as f64).collect();
        assert!((spread(&samples) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_weight_for_periodic_workload() {
        let characterizer = WorkloadCharacterizer::new(DAY, DAY, Priority::High);
        let samples = daily_sine(7);
        let result = characterizer.characterize(&samples);

        assert!(result.is_periodic);
        let expected = 0.99 - 0.02 - 0.05 * result.spread;
        assert!((result.ue_weight - expected).abs() < 1e-12);
    }

    #[test]
    fn test_weight_includes_priority() {
        let samples = white_noise(2 * DAY, 3);
        let high = WorkloadCharacterizer::new(DAY, DAY, Priority::High).characterize(&samples);
        let low = WorkloadCharacterizer::new(DAY, DAY, Priority::Low).characterize(&samples);

        assert!(!high.is_periodic);
        assert!((high.ue_weight - low.ue_weight - 0.4).abs() < 1e-12);
        assert!(high.ue_weight <= 0.99 && high.ue_weight > 0.9);
    }
}
