//! Sample curation
//!
//! Turns raw, possibly gappy utilization and throttle traces into one
//! timestamp-complete series on a one-minute grid, and performs the
//! cleaning pass that runs right before optimization (gap filling,
//! winsorization, trimming to whole intervals).

use crate::error::{RecommendError, Result};
use crate::models::{Sample, SECONDS_PER_MINUTE};
use crate::stats::percentile_nearest_rank;
use tracing::{debug, warn};

/// Lower winsorization percentile
pub const WINSOR_LOWER_PERCENTILE: f64 = 0.1;

/// Upper winsorization percentile
pub const WINSOR_UPPER_PERCENTILE: f64 = 99.9;

/// Longest span the alignment grid may cover: one year of minutes
pub const MAX_GRID_MINUTES: i64 = 366 * 24 * 60;

/// Utilization and throttle fraction on a shared one-minute grid.
///
/// Missing values are `NaN`; interior gaps are already interpolated, so
/// only leading or trailing rows of a series can be undefined.
#[derive(Debug, Clone, PartialEq)]
pub struct AlignedSeries {
    pub timestamps: Vec<i64>,
    pub usage: Vec<f64>,
    pub throttle: Vec<f64>,
}

impl AlignedSeries {
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    pub fn last_timestamp(&self) -> Option<i64> {
        self.timestamps.last().copied()
    }

    fn slice(&self, start: usize, end: usize) -> AlignedSeries {
        AlignedSeries {
            timestamps: self.timestamps[start..end].to_vec(),
            usage: self.usage[start..end].to_vec(),
            throttle: self.throttle[start..end].to_vec(),
        }
    }

    /// Rows at or after `timestamp`
    pub fn since(&self, timestamp: i64) -> AlignedSeries {
        let start = self.timestamps.partition_point(|&t| t < timestamp);
        self.slice(start, self.len())
    }

    /// Drop leading and trailing rows whose utilization is undefined.
    ///
    /// Fails when no row carries a utilization value at all.
    pub fn trim_undefined_edges(&self) -> Result<AlignedSeries> {
        let first = self.usage.iter().position(|v| v.is_finite());
        let last = self.usage.iter().rposition(|v| v.is_finite());
        match (first, last) {
            (Some(first), Some(last)) => Ok(self.slice(first, last + 1)),
            _ => Err(RecommendError::MalformedInput(
                "utilization series has no valid samples".to_string(),
            )),
        }
    }

    /// Keep whole intervals only, discarding the trailing remainder
    pub fn trim_to_intervals(&self, interval: usize) -> AlignedSeries {
        let remainder = self.len() % interval;
        if remainder != 0 {
            warn!(
                samples = self.len(),
                optimization_interval = interval,
                discarded = remainder,
                "Sample count is not a multiple of the optimization interval, discarding trailing samples"
            );
        }
        self.slice(0, self.len() - remainder)
    }

    /// Start timestamp of every whole interval in the series
    pub fn interval_starts(&self, interval: usize) -> Vec<i64> {
        self.timestamps
            .chunks_exact(interval)
            .map(|chunk| chunk[0])
            .collect()
    }
}

/// Align utilization and throttle traces onto one complete one-minute grid.
///
/// The grid spans the union of both inputs. Samples off the grid snap to
/// the nearest slot, a repeated slot keeps the last value, and non-finite
/// values count as missing. Interior gaps are linearly interpolated;
/// nothing is extrapolated past the first or last known value. An empty
/// throttle trace means no throttling was observed.
pub fn align(usage: &[Sample], throttle: &[Sample]) -> Result<AlignedSeries> {
    if usage.is_empty() {
        return Err(RecommendError::MalformedInput(
            "utilization series is empty".to_string(),
        ));
    }

    let bounds = usage
        .iter()
        .chain(throttle.iter())
        .map(|(ts, _)| *ts)
        .fold((i64::MAX, i64::MIN), |(lo, hi), ts| (lo.min(ts), hi.max(ts)));
    let (min_ts, max_ts) = bounds;
    let span_minutes = max_ts
        .checked_sub(min_ts)
        .map(|span| span / SECONDS_PER_MINUTE)
        .filter(|minutes| *minutes < MAX_GRID_MINUTES)
        .ok_or_else(|| {
            RecommendError::MalformedInput(format!(
                "traces span {}..{} which exceeds {} minutes",
                min_ts, max_ts, MAX_GRID_MINUTES
            ))
        })?;
    let len = span_minutes as usize + 1;

    let timestamps: Vec<i64> = (0..len)
        .map(|i| min_ts + i as i64 * SECONDS_PER_MINUTE)
        .collect();

    let mut usage_grid = place_on_grid(usage, min_ts, len);
    interpolate_gaps(&mut usage_grid);

    let throttle_grid = if throttle.is_empty() {
        debug!("No throttle samples provided, assuming no throttling");
        vec![0.0; len]
    } else {
        let mut grid = place_on_grid(throttle, min_ts, len);
        interpolate_gaps(&mut grid);
        grid
    };

    debug!(
        raw_samples = usage.len(),
        aligned_samples = len,
        "Aligned utilization and throttle series"
    );

    Ok(AlignedSeries {
        timestamps,
        usage: usage_grid,
        throttle: throttle_grid,
    })
}

fn place_on_grid(samples: &[Sample], min_ts: i64, len: usize) -> Vec<f64> {
    let mut grid = vec![f64::NAN; len];
    let mut sorted: Vec<&Sample> = samples.iter().collect();
    sorted.sort_by_key(|(ts, _)| *ts);
    for (ts, value) in sorted {
        if !value.is_finite() {
            continue;
        }
        let offset = (ts - min_ts) as f64 / SECONDS_PER_MINUTE as f64;
        let slot = (offset.round() as usize).min(len - 1);
        grid[slot] = *value;
    }
    grid
}

/// Linear interpolation between known neighbors; edges stay undefined
fn interpolate_gaps(values: &mut [f64]) {
    let mut prev: Option<usize> = None;
    for i in 0..values.len() {
        if !values[i].is_finite() {
            continue;
        }
        if let Some(p) = prev {
            if i - p > 1 {
                let (a, b) = (values[p], values[i]);
                let span = (i - p) as f64;
                for j in p + 1..i {
                    values[j] = a + (b - a) * (j - p) as f64 / span;
                }
            }
        }
        prev = Some(i);
    }
}

/// Cleaning pass run right before optimization.
///
/// Fills any remaining `NaN` from valid neighbors (holding the nearest
/// value at the edges), clips to the [0.1, 99.9] percentile range, and
/// drops a leading partial interval so the length is a whole multiple of
/// `interval`. Running it twice is a no-op.
pub fn curate_samples(samples: &[f64], interval: usize) -> Vec<f64> {
    let mut values = samples.to_vec();
    fill_missing(&mut values);
    winsorize(&mut values);

    let remainder = values.len() % interval;
    if remainder != 0 {
        warn!(
            samples = values.len(),
            optimization_interval = interval,
            "Curated sample count is not a multiple of the optimization interval, dropping leading samples"
        );
        values.drain(..remainder);
    }
    values
}

fn fill_missing(values: &mut [f64]) {
    let valid: Vec<usize> = (0..values.len()).filter(|&i| values[i].is_finite()).collect();
    if valid.len() == values.len() {
        return;
    }
    let (Some(&first), Some(&last)) = (valid.first(), valid.last()) else {
        // no signal at all
        values.iter_mut().for_each(|v| *v = 0.0);
        return;
    };
    let (head, tail) = (values[first], values[last]);
    values[..first].fill(head);
    values[last + 1..].fill(tail);
    interpolate_gaps(values);
}

fn winsorize(values: &mut [f64]) {
    if values.is_empty() {
        return;
    }
    let upper = percentile_nearest_rank(values, WINSOR_UPPER_PERCENTILE);
    let lower = percentile_nearest_rank(values, WINSOR_LOWER_PERCENTILE);
    for v in values.iter_mut() {
        *v = v.clamp(lower, upper);
    }
}
