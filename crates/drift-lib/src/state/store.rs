use super::RecommendationState;
use crate::config::RecommenderConfig;
use crate::error::Result;
use crate::models::{Recommendation, Sample, WorkloadKey};
use crate::observability::{RecommenderMetrics, StructuredLogger};
use dashmap::DashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

type SharedState = Arc<Mutex<RecommendationState>>;

/// Owns the state of every tracked workload.
///
/// The map only hands out per-workload handles; each `compute` runs under
/// its own workload's lock, so distinct keys never wait on each other and
/// calls for the same key are serialized.
pub struct RecommendationStore {
    states: DashMap<WorkloadKey, SharedState>,
    metrics: RecommenderMetrics,
    logger: StructuredLogger,
}

impl Default for RecommendationStore {
    fn default() -> Self {
        Self::new()
    }
}

fn lock(state: &SharedState) -> MutexGuard<'_, RecommendationState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

impl RecommendationStore {
    pub fn new() -> Self {
        Self {
            states: DashMap::new(),
            metrics: RecommenderMetrics::new(),
            logger: StructuredLogger::new("drift"),
        }
    }

    fn handle(&self, key: &WorkloadKey) -> Option<SharedState> {
        self.states.get(key).map(|entry| Arc::clone(entry.value()))
    }

    /// Run one `compute` for `key`, creating its state on first use
    pub fn compute(
        &self,
        key: &WorkloadKey,
        config: &RecommenderConfig,
        usage: &[Sample],
        throttle: &[Sample],
    ) -> Result<Recommendation> {
        let start = Instant::now();
        let existed = self.states.contains_key(key);
        let shared = Arc::clone(self.states.entry(key.clone()).or_default().value());

        let (result, characterization) = {
            let mut state = lock(&shared);
            let was_characterized = state.characterization().is_some();
            let result = state.compute(config, usage, throttle);
            let characterization = state
                .characterization()
                .filter(|_| !was_characterized);
            (result, characterization)
        };

        self.metrics
            .observe_compute_latency(start.elapsed().as_secs_f64());

        match &result {
            Ok(recommendation) => {
                if let Some(characterization) = characterization {
                    self.logger.log_characterization(key, &characterization);
                }
                self.metrics.record_outcome(recommendation);
                self.logger.log_recommendation(key, recommendation);
            }
            Err(e) => {
                if !existed {
                    self.states
                        .remove_if(key, |_, state| Arc::ptr_eq(state, &shared));
                }
                self.metrics.inc_compute_errors();
                self.logger.log_compute_error(key, e);
            }
        }
        self.metrics.set_tracked_workloads(self.states.len() as i64);

        result
    }

    /// Snapshot of one workload's state
    pub fn get(&self, key: &WorkloadKey) -> Option<RecommendationState> {
        self.handle(key).map(|state| lock(&state).clone())
    }

    /// Drop a workload's state; returns whether it was tracked
    pub fn evict(&self, key: &WorkloadKey) -> bool {
        let removed = self.states.remove(key).is_some();
        if removed {
            self.logger.log_eviction(key);
            self.metrics.set_tracked_workloads(self.states.len() as i64);
        }
        removed
    }

    /// Force recharacterization on the next computed interval
    pub fn reset_ue_weight(&self, key: &WorkloadKey) -> bool {
        match self.handle(key) {
            Some(state) => {
                lock(&state).reset_ue_weight();
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn keys(&self) -> Vec<WorkloadKey> {
        self.states.iter().map(|entry| entry.key().clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ResourceType;

    fn key(i: usize) -> WorkloadKey {
        WorkloadKey::new("default", format!("app-{}", i), "main", ResourceType::Cpu)
    }

    fn trace(len: usize) -> Vec<Sample> {
        (0..len).map(|i| (i as i64 * 60, 0.5)).collect()
    }

    #[test]
    fn test_busy_workload_does_not_block_others() {
        let store = RecommendationStore::new();
        let config = RecommenderConfig::with_interval(60);
        // enough keys that every map shard holds more than one
        for i in 0..256 {
            store.compute(&key(i), &config, &trace(60), &[]).unwrap();
        }

        let busy = store.handle(&key(0)).unwrap();
        let _guard = lock(&busy);

        for i in 1..256 {
            assert!(store.get(&key(i)).is_some());
            let rec = store.compute(&key(i), &config, &trace(120), &[]).unwrap();
            assert!(rec.is_update());
            assert!(store.reset_ue_weight(&key(i)));
        }
        assert!(store.evict(&key(255)));
        assert_eq!(store.len(), 255);
    }
}
