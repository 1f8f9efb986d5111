//! Per-container policy limits applied to emitted recommendations

use crate::models::Recommendation;
use serde::{Deserialize, Serialize};

/// Allowed range for a container's resource, in absolute units
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ContainerPolicy {
    #[serde(default)]
    pub min_allowed: Option<f64>,
    #[serde(default)]
    pub max_allowed: Option<f64>,
}

impl ContainerPolicy {
    pub fn new(min_allowed: Option<f64>, max_allowed: Option<f64>) -> Self {
        Self {
            min_allowed,
            max_allowed,
        }
    }

    pub fn is_unbounded(&self) -> bool {
        self.min_allowed.is_none() && self.max_allowed.is_none()
    }

    /// Raise to the minimum, else lower to the maximum
    pub fn bound(&self, value: f64) -> f64 {
        match (self.min_allowed, self.max_allowed) {
            (Some(min), _) if value < min => min,
            (_, Some(max)) if value > max => max,
            _ => value,
        }
    }
}

/// A recommendation after policy limits
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CappedRecommendation {
    pub patch_timestamp: i64,
    pub lower_bound: f64,
    pub target: f64,
    pub upper_bound: f64,
    /// Target before capping
    pub uncapped_target: f64,
}

impl CappedRecommendation {
    pub fn is_capped(&self) -> bool {
        self.target != self.uncapped_target
    }
}

impl Recommendation {
    /// Clamp each bound into the policy range.
    ///
    /// Sentinel (`NO_UPDATE`) results pass through untouched since they
    /// are never written downstream.
    pub fn capped(&self, policy: &ContainerPolicy) -> CappedRecommendation {
        if !self.is_update() {
            return CappedRecommendation {
                patch_timestamp: self.patch_timestamp,
                lower_bound: self.lower_bound,
                target: self.target,
                upper_bound: self.upper_bound,
                uncapped_target: self.target,
            };
        }
        CappedRecommendation {
            patch_timestamp: self.patch_timestamp,
            lower_bound: policy.bound(self.lower_bound),
            target: policy.bound(self.target),
            upper_bound: policy.bound(self.upper_bound),
            uncapped_target: self.target,
        }
    }
}
