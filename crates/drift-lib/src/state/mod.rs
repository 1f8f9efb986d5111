//! Recommendation state machine
//!
//! A `RecommendationState` carries everything that must survive between
//! two `compute` calls for one workload: the per-interval target history,
//! the cached under-estimation weight and the last emitted recommendation.
//! A call either commits all of its changes or none of them.

mod store;

#[cfg(test)]
mod tests;

pub use store::RecommendationStore;

use crate::characterizer::WorkloadCharacterizer;
use crate::config::RecommenderConfig;
use crate::curator::align;
use crate::error::Result;
use crate::forecaster::DriftForecaster;
use crate::interval::{short_lived_target, IntervalRecommender};
use crate::models::{Characterization, Recommendation, Sample, TargetEntry, SECONDS_PER_MINUTE};
use std::collections::HashMap;
use tracing::debug;

/// Per-workload bookkeeping across `compute` calls
#[derive(Debug, Clone, Default)]
pub struct RecommendationState {
    /// Target history keyed by interval length, so lengths never mix
    histories: HashMap<usize, Vec<TargetEntry>>,
    ue_weight: Option<f64>,
    characterization: Option<Characterization>,
    last: Option<Recommendation>,
    /// Last timestamp consumed by the short-lived path
    short_lived_seen_until: Option<i64>,
}

impl RecommendationState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consume the delivered traces and return the current recommendation.
    ///
    /// Traces may be cumulative: rows already covered by the target history
    /// are skipped. When no complete new interval arrived, the previous
    /// recommendation is returned with a `NO_UPDATE` patch timestamp.
    pub fn compute(
        &mut self,
        config: &RecommenderConfig,
        usage: &[Sample],
        throttle: &[Sample],
    ) -> Result<Recommendation> {
        config.validate()?;
        let forecaster = DriftForecaster::new(&config.forecast_model, config.forecast_horizon)?;
        let aligned = align(usage, throttle)?.trim_undefined_edges()?;

        let interval = config.optimization_interval;
        let history: &[TargetEntry] = self
            .histories
            .get(&interval)
            .map(Vec::as_slice)
            .unwrap_or_default();

        if history.is_empty() && aligned.len() < interval {
            return Ok(self.short_lived(&aligned.usage, aligned.last_timestamp(), config));
        }

        let new_data = match history.last() {
            Some(anchor) => {
                aligned.since(anchor.interval_start + interval as i64 * SECONDS_PER_MINUTE)
            }
            None => aligned.clone(),
        };
        if new_data.len() < interval {
            debug!(
                new_samples = new_data.len(),
                optimization_interval = interval,
                "Less than one new interval, keeping previous recommendation"
            );
            return Ok(self.cached());
        }
        let batch = new_data.trim_to_intervals(interval);

        let (ue_weight, characterization) = match (self.ue_weight, config.ue_weight) {
            (Some(weight), _) | (None, Some(weight)) => (weight, None),
            (None, None) => {
                let normalized: Vec<f64> = batch
                    .usage
                    .iter()
                    .map(|v| v / config.resource_request)
                    .collect();
                let characterization = WorkloadCharacterizer::new(
                    interval,
                    config.diurnal_len_in_min,
                    config.priority(),
                )
                .characterize(&normalized);
                (characterization.ue_weight, Some(characterization))
            }
        };

        let new_targets = IntervalRecommender::new(interval, config.resource_request)
            .recommend(&batch, ue_weight);

        let mut extended = history.to_vec();
        extended.extend(new_targets);
        let values: Vec<f64> = extended.iter().map(|e| e.target).collect();
        let forecast = forecaster.forecast(&values);

        let last_consumed = batch.last_timestamp().unwrap_or_default();
        let recommendation =
            Recommendation::from_target(last_consumed + SECONDS_PER_MINUTE, forecast.target);

        debug!(
            intervals = extended.len(),
            anchor = extended.last().map(|e| e.interval_start),
            target = forecast.target,
            "Extended target history"
        );

        self.histories.insert(interval, extended);
        self.ue_weight = Some(ue_weight);
        if characterization.is_some() {
            self.characterization = characterization;
        }
        self.last = Some(recommendation);
        Ok(recommendation)
    }

    fn short_lived(
        &mut self,
        usage: &[f64],
        last_timestamp: Option<i64>,
        config: &RecommenderConfig,
    ) -> Recommendation {
        let Some(last_ts) = last_timestamp else {
            return self.cached();
        };
        if matches!(self.short_lived_seen_until, Some(seen) if seen >= last_ts) {
            return self.cached();
        }

        let target = short_lived_target(usage);
        debug!(
            samples = usage.len(),
            optimization_interval = config.optimization_interval,
            "Short-lived workload"
        );
        let recommendation = Recommendation::from_target(last_ts + SECONDS_PER_MINUTE, target);
        self.short_lived_seen_until = Some(last_ts);
        self.last = Some(recommendation);
        recommendation
    }

    /// Last recommendation re-issued as "nothing new"
    fn cached(&self) -> Recommendation {
        self.last
            .map(|rec| rec.unchanged())
            .unwrap_or_else(Recommendation::empty)
    }

    /// Forget the cached weight; the next interval takes the configured
    /// override or recharacterizes
    pub fn reset_ue_weight(&mut self) {
        self.ue_weight = None;
        self.characterization = None;
    }

    pub fn ue_weight(&self) -> Option<f64> {
        self.ue_weight
    }

    pub fn characterization(&self) -> Option<Characterization> {
        self.characterization
    }

    pub fn last_recommendation(&self) -> Option<Recommendation> {
        self.last
    }

    /// History for one interval length, oldest first
    pub fn target_history(&self, interval: usize) -> &[TargetEntry] {
        self.histories
            .get(&interval)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}
