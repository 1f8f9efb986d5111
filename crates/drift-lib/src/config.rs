//! Recommender configuration

use crate::error::{RecommendError, Result};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Default optimization interval: one day of one-minute samples
pub const DEFAULT_OPTIMIZATION_INTERVAL: usize = 1440;

/// Default diurnal period in minutes
pub const DEFAULT_DIURNAL_LEN_IN_MIN: usize = 1440;

/// Default forecast model name
pub const DEFAULT_FORECAST_MODEL: &str = "linear_regression";

/// Configuration consumed by `compute`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommenderConfig {
    /// Samples (minutes) per optimization interval
    #[serde(default = "default_optimization_interval")]
    pub optimization_interval: usize,

    /// Length of the daily period in minutes
    #[serde(default = "default_diurnal_len")]
    pub diurnal_len_in_min: usize,

    /// Workload priority label: "high", "mid" or "low"
    #[serde(default)]
    pub priority: Option<String>,

    /// Requested amount of the resource, in absolute units
    #[serde(default = "default_resource_request")]
    pub resource_request: f64,

    /// Number of future intervals the forecaster predicts
    #[serde(default = "default_forecast_horizon")]
    pub forecast_horizon: usize,

    /// Forecast model name
    #[serde(default = "default_forecast_model")]
    pub forecast_model: String,

    /// Operator-provided under-estimation weight, skips characterization
    #[serde(default)]
    pub ue_weight: Option<f64>,
}

fn default_optimization_interval() -> usize {
    DEFAULT_OPTIMIZATION_INTERVAL
}

fn default_diurnal_len() -> usize {
    DEFAULT_DIURNAL_LEN_IN_MIN
}

fn default_resource_request() -> f64 {
    1.0
}

fn default_forecast_horizon() -> usize {
    1
}

fn default_forecast_model() -> String {
    DEFAULT_FORECAST_MODEL.to_string()
}

impl Default for RecommenderConfig {
    fn default() -> Self {
        Self {
            optimization_interval: default_optimization_interval(),
            diurnal_len_in_min: default_diurnal_len(),
            priority: None,
            resource_request: default_resource_request(),
            forecast_horizon: default_forecast_horizon(),
            forecast_model: default_forecast_model(),
            ue_weight: None,
        }
    }
}

impl RecommenderConfig {
    /// Config with a custom optimization interval and defaults elsewhere
    pub fn with_interval(optimization_interval: usize) -> Self {
        Self {
            optimization_interval,
            ..Self::default()
        }
    }

    /// Reject values outside their domain
    pub fn validate(&self) -> Result<()> {
        if self.optimization_interval == 0 {
            return Err(RecommendError::InvalidConfig(
                "optimization_interval must be positive".to_string(),
            ));
        }
        if self.diurnal_len_in_min == 0 {
            return Err(RecommendError::InvalidConfig(
                "diurnal_len_in_min must be positive".to_string(),
            ));
        }
        if self.forecast_horizon == 0 {
            return Err(RecommendError::InvalidConfig(
                "forecast_horizon must be positive".to_string(),
            ));
        }
        if !(self.resource_request.is_finite() && self.resource_request > 0.0) {
            return Err(RecommendError::InvalidConfig(format!(
                "resource_request must be a positive number, got {}",
                self.resource_request
            )));
        }
        if let Some(weight) = self.ue_weight {
            if !(0.0..=1.0).contains(&weight) {
                return Err(RecommendError::InvalidConfig(format!(
                    "ue_weight must lie in [0, 1], got {}",
                    weight
                )));
            }
        }
        Ok(())
    }

    pub fn priority(&self) -> Priority {
        Priority::from_label(self.priority.as_deref())
    }
}

/// Workload priority, lowering the under-estimation weight for cheaper tiers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Priority {
    High,
    Mid,
    Low,
}

impl Priority {
    /// Parse a priority label; unset or unknown labels count as high
    pub fn from_label(label: Option<&str>) -> Self {
        match label {
            None => Priority::High,
            Some(l) => match l.to_ascii_lowercase().as_str() {
                "high" => Priority::High,
                "mid" => Priority::Mid,
                "low" => Priority::Low,
                other => {
                    warn!(priority = %other, "Unrecognized priority, using highest priority");
                    Priority::High
                }
            },
        }
    }

    /// Amount subtracted from the under-estimation weight
    pub fn impact(&self) -> f64 {
        match self {
            Priority::High => 0.0,
            Priority::Mid => 0.2,
            Priority::Low => 0.4,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RecommenderConfig::default();
        assert_eq!(config.optimization_interval, 1440);
        assert_eq!(config.diurnal_len_in_min, 1440);
        assert_eq!(config.resource_request, 1.0);
        assert_eq!(config.forecast_horizon, 1);
        assert_eq!(config.forecast_model, "linear_regression");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_deserialize_partial() {
        let config: RecommenderConfig =
            serde_json::from_str(r#"{"optimization_interval": 60, "priority": "mid"}"#).unwrap();
        assert_eq!(config.optimization_interval, 60);
        assert_eq!(config.priority(), Priority::Mid);
        assert_eq!(config.resource_request, 1.0);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        assert!(RecommenderConfig::with_interval(0).validate().is_err());

        let config = RecommenderConfig {
            resource_request: 0.0,
            ..RecommenderConfig::default()
        };
        assert!(config.validate().is_err());

        let config = RecommenderConfig {
            ue_weight: Some(1.5),
            ..RecommenderConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_priority_impact() {
        assert_eq!(Priority::from_label(None).impact(), 0.0);
        assert_eq!(Priority::from_label(Some("high")).impact(), 0.0);
        assert_eq!(Priority::from_label(Some("mid")).impact(), 0.2);
        assert_eq!(Priority::from_label(Some("LOW")).impact(), 0.4);
        assert_eq!(Priority::from_label(Some("urgent")), Priority::High);
    }
}
