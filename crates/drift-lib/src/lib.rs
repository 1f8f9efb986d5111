//! DRIFT resource recommendation engine
//!
//! This crate provides the core functionality for:
//! - Curating raw utilization and throttle traces
//! - Workload characterization (periodicity and spread)
//! - Per-interval constrained optimization of the resource target
//! - Drift forecasting over the per-interval target history
//! - Per-workload recommendation state and observability

pub mod characterizer;
pub mod config;
pub mod curator;
pub mod error;
pub mod forecaster;
pub mod interval;
pub mod models;
pub mod observability;
pub mod optimizer;
pub mod policy;
pub mod quantity;
pub mod state;
pub mod stats;
pub mod traces;

pub use config::RecommenderConfig;
pub use error::{RecommendError, Result};
pub use models::*;
pub use observability::{RecommenderMetrics, StructuredLogger};
pub use policy::{CappedRecommendation, ContainerPolicy};
pub use state::{RecommendationState, RecommendationStore};
