//! Observability infrastructure for the recommendation engine
//!
//! Provides:
//! - Prometheus metrics (compute latency, outcomes, optimizer fallback tiers)
//! - Structured logging of recommendation events with tracing

use crate::models::{Characterization, Recommendation, WorkloadKey};
use prometheus::{
    register_histogram, register_int_counter, register_int_counter_vec, register_int_gauge,
    Histogram, IntCounter, IntCounterVec, IntGauge,
};
use std::sync::OnceLock;
use tracing::{info, warn};

/// Histogram buckets for compute latency (in seconds)
const LATENCY_BUCKETS: &[f64] = &[
    0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5,
];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<RecommenderMetricsInner> = OnceLock::new();

struct RecommenderMetricsInner {
    compute_latency_seconds: Histogram,
    recommendations_emitted: IntCounter,
    recommendations_unchanged: IntCounter,
    optimizer_solutions: IntCounterVec,
    degenerate_solutions: IntCounter,
    throttle_inflations: IntCounter,
    compute_errors: IntCounter,
    tracked_workloads: IntGauge,
}

impl RecommenderMetricsInner {
    fn new() -> Self {
        Self {
            compute_latency_seconds: register_histogram!(
                "drift_compute_latency_seconds",
                "Time spent computing one recommendation",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register compute_latency_seconds"),

            recommendations_emitted: register_int_counter!(
                "drift_recommendations_emitted_total",
                "Recommendations computed from new intervals"
            )
            .expect("Failed to register recommendations_emitted"),

            recommendations_unchanged: register_int_counter!(
                "drift_recommendations_unchanged_total",
                "Calls that returned the cached recommendation"
            )
            .expect("Failed to register recommendations_unchanged"),

            optimizer_solutions: register_int_counter_vec!(
                "drift_optimizer_solutions_total",
                "Per-interval optimizer solutions by fallback tier",
                &["tier"]
            )
            .expect("Failed to register optimizer_solutions"),

            degenerate_solutions: register_int_counter!(
                "drift_degenerate_solutions_total",
                "Solutions below the domain lower bound replaced by a percentile"
            )
            .expect("Failed to register degenerate_solutions"),

            throttle_inflations: register_int_counter!(
                "drift_throttle_inflations_total",
                "Interval targets inflated because of heavy throttling"
            )
            .expect("Failed to register throttle_inflations"),

            compute_errors: register_int_counter!(
                "drift_compute_errors_total",
                "Calls rejected with a malformed input or configuration error"
            )
            .expect("Failed to register compute_errors"),

            tracked_workloads: register_int_gauge!(
                "drift_tracked_workloads",
                "Number of workloads with recommendation state"
            )
            .expect("Failed to register tracked_workloads"),
        }
    }
}

/// Recommender metrics for Prometheus exposition
///
/// This is a lightweight handle to the global metrics instance.
/// Multiple clones share the same underlying metrics.
#[derive(Clone)]
pub struct RecommenderMetrics {
    _private: (),
}

impl Default for RecommenderMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl RecommenderMetrics {
    /// Create a new metrics handle (initializes global metrics if needed)
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(RecommenderMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &RecommenderMetricsInner {
        GLOBAL_METRICS.get_or_init(RecommenderMetricsInner::new)
    }

    pub fn observe_compute_latency(&self, duration_secs: f64) {
        self.inner().compute_latency_seconds.observe(duration_secs);
    }

    /// Count a call outcome: emitted (new intervals) or unchanged (cached)
    pub fn record_outcome(&self, recommendation: &Recommendation) {
        if recommendation.is_update() {
            self.inner().recommendations_emitted.inc();
        } else {
            self.inner().recommendations_unchanged.inc();
        }
    }

    pub fn inc_optimizer_solution(&self, tier: &str) {
        self.inner()
            .optimizer_solutions
            .with_label_values(&[tier])
            .inc();
    }

    pub fn inc_degenerate_solutions(&self) {
        self.inner().degenerate_solutions.inc();
    }

    pub fn inc_throttle_inflations(&self) {
        self.inner().throttle_inflations.inc();
    }

    pub fn inc_compute_errors(&self) {
        self.inner().compute_errors.inc();
    }

    pub fn set_tracked_workloads(&self, count: i64) {
        self.inner().tracked_workloads.set(count);
    }
}

/// Structured logger for recommendation events
#[derive(Clone)]
pub struct StructuredLogger {
    recommender_name: String,
}

impl StructuredLogger {
    pub fn new(recommender_name: impl Into<String>) -> Self {
        Self {
            recommender_name: recommender_name.into(),
        }
    }

    /// Log the outcome of one `compute` call
    pub fn log_recommendation(&self, key: &WorkloadKey, recommendation: &Recommendation) {
        if recommendation.is_update() {
            info!(
                event = "recommendation_emitted",
                recommender = %self.recommender_name,
                namespace = %key.namespace,
                workload = %key.workload,
                container = %key.container,
                resource = %key.resource,
                patch_timestamp = recommendation.patch_timestamp,
                lower_bound = recommendation.lower_bound,
                target = recommendation.target,
                upper_bound = recommendation.upper_bound,
                "Computed new recommendation"
            );
        } else {
            info!(
                event = "recommendation_unchanged",
                recommender = %self.recommender_name,
                namespace = %key.namespace,
                workload = %key.workload,
                container = %key.container,
                resource = %key.resource,
                target = recommendation.target,
                "No new intervals, keeping previous recommendation"
            );
        }
    }

    /// Log the one-time characterization of a workload
    pub fn log_characterization(&self, key: &WorkloadKey, characterization: &Characterization) {
        info!(
            event = "workload_characterized",
            recommender = %self.recommender_name,
            workload_key = %key,
            ue_weight = characterization.ue_weight,
            is_periodic = characterization.is_periodic,
            spread = characterization.spread,
            "Workload characterized"
        );
    }

    /// Log a rejected `compute` call
    pub fn log_compute_error(&self, key: &WorkloadKey, error: &dyn std::error::Error) {
        warn!(
            event = "compute_failed",
            recommender = %self.recommender_name,
            workload_key = %key,
            error = %error,
            "Recommendation computation failed, state left unchanged"
        );
    }

    /// Log removal of a workload's state
    pub fn log_eviction(&self, key: &WorkloadKey) {
        info!(
            event = "workload_evicted",
            recommender = %self.recommender_name,
            workload_key = %key,
            "Recommendation state evicted"
        );
    }
}
