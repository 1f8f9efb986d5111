//! Core data models for the recommendation engine

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::RecommendError;

/// One raw observation: (unix timestamp in seconds, value)
pub type Sample = (i64, f64);

/// Spacing of curated series
pub const SECONDS_PER_MINUTE: i64 = 60;

/// Patch timestamp signalling that nothing new was computed
pub const NO_UPDATE: i64 = -1;

/// Lower bound sits 10% below the target
pub const LOWER_BOUND_FACTOR: f64 = 0.10;

/// Upper bound sits 5% above the target
pub const UPPER_BOUND_FACTOR: f64 = 0.05;

/// Resource a recommendation is computed for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceType {
    Cpu,
    Memory,
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceType::Cpu => write!(f, "cpu"),
            ResourceType::Memory => write!(f, "memory"),
        }
    }
}

impl FromStr for ResourceType {
    type Err = RecommendError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "cpu" => Ok(ResourceType::Cpu),
            "memory" => Ok(ResourceType::Memory),
            other => Err(RecommendError::InvalidConfig(format!(
                "unsupported resource: {}",
                other
            ))),
        }
    }
}

/// Identity of one tracked recommendation stream
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorkloadKey {
    pub namespace: String,
    pub workload: String,
    pub container: String,
    pub resource: ResourceType,
}

impl WorkloadKey {
    pub fn new(
        namespace: impl Into<String>,
        workload: impl Into<String>,
        container: impl Into<String>,
        resource: ResourceType,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            workload: workload.into(),
            container: container.into(),
            resource,
        }
    }
}

impl fmt::Display for WorkloadKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{}-{}-{}",
            self.workload, self.namespace, self.container, self.resource
        )
    }
}

/// Result of one `compute` call, in absolute resource units
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    /// Boundary following the consumed data, or `NO_UPDATE`
    pub patch_timestamp: i64,
    pub lower_bound: f64,
    pub target: f64,
    pub upper_bound: f64,
}

impl Recommendation {
    /// A fresh recommendation with the fixed asymmetric bands around `target`
    pub fn from_target(patch_timestamp: i64, target: f64) -> Self {
        Self {
            patch_timestamp,
            lower_bound: target - LOWER_BOUND_FACTOR * target,
            target,
            upper_bound: target + UPPER_BOUND_FACTOR * target,
        }
    }

    /// The same bounds re-issued with the "nothing new" sentinel
    pub fn unchanged(&self) -> Self {
        Self {
            patch_timestamp: NO_UPDATE,
            ..*self
        }
    }

    /// Placeholder returned before any recommendation exists
    pub fn empty() -> Self {
        Self {
            patch_timestamp: NO_UPDATE,
            lower_bound: -1.0,
            target: -1.0,
            upper_bound: -1.0,
        }
    }

    /// Whether this result should be written downstream
    pub fn is_update(&self) -> bool {
        self.patch_timestamp != NO_UPDATE
    }

    /// Patch timestamp as the UTC string written to the `lastUpdate` annotation
    pub fn last_update(&self) -> Option<String> {
        if !self.is_update() {
            return None;
        }
        chrono::DateTime::from_timestamp(self.patch_timestamp, 0)
            .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
    }
}

/// One completed interval's optimized target
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TargetEntry {
    pub interval_start: i64,
    pub target: f64,
}

/// Outcome of workload characterization
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Characterization {
    /// Relative cost of under- vs over-provisioning, in [0, 1]
    pub ue_weight: f64,
    pub is_periodic: bool,
    /// Normalized standard deviation, in [0, 1]
    pub spread: f64,
}
