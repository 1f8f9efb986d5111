//! Drift forecasting over the per-interval target history

use crate::error::{RecommendError, Result};
use crate::stats::linear_fit;
use std::str::FromStr;
use tracing::debug;

/// Histories of at most this many entries use their maximum instead of a fit
pub const MIN_HISTORY_FOR_FIT: usize = 3;

/// Supported trend models
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForecastModel {
    LinearRegression,
}

impl FromStr for ForecastModel {
    type Err = RecommendError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "linear_regression" | "LinearRegression" => Ok(ForecastModel::LinearRegression),
            other => Err(RecommendError::UnsupportedForecastModel(other.to_string())),
        }
    }
}

/// Forecast of the next interval's target
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Forecast {
    pub target: f64,
    /// Zero when the history was too short for a fit
    pub slope: f64,
    pub intercept: f64,
}

pub struct DriftForecaster {
    model: ForecastModel,
    horizon: usize,
}

impl DriftForecaster {
    /// Build a forecaster, failing on an unknown model name
    pub fn new(model_name: &str, horizon: usize) -> Result<Self> {
        let model = model_name.parse()?;
        Ok(Self {
            model,
            horizon: horizon.max(1),
        })
    }

    /// Forecast from the target values in chronological order
    pub fn forecast(&self, history: &[f64]) -> Forecast {
        if history.len() <= MIN_HISTORY_FOR_FIT {
            let max = history.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            let target = if max.is_finite() { max } else { 0.0 };
            return Forecast {
                target,
                slope: 0.0,
                intercept: target,
            };
        }

        let forecast = match self.model {
            ForecastModel::LinearRegression => {
                let (slope, intercept) = linear_fit(history);
                let n = history.len();
                let predictions: Vec<f64> = (n..n + self.horizon)
                    .map(|i| intercept + slope * i as f64)
                    .collect();
                Forecast {
                    target: predictions[0],
                    slope,
                    intercept,
                }
            }
        };

        debug!(
            history = history.len(),
            horizon = self.horizon,
            slope = forecast.slope,
            intercept = forecast.intercept,
            target = forecast.target,
            "Forecast drift"
        );
        forecast
    }
}
