//! Replay input file model

use anyhow::{Context, Result};
use drift_lib::models::{ResourceType, Sample, WorkloadKey};
use drift_lib::traces::{exclude_days, merge_max};
use drift_lib::{quantity, ContainerPolicy, RecommenderConfig};
use serde::Deserialize;
use std::path::Path;

/// Recorded traces for a set of workloads
#[derive(Debug, Deserialize)]
pub struct ReplayInput {
    pub workloads: Vec<WorkloadTrace>,
}

/// A resource amount given either as a number or a quantity string
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum QuantityValue {
    Number(f64),
    Text(String),
}

impl QuantityValue {
    fn resolve(&self, resource: ResourceType) -> Result<f64> {
        match self {
            QuantityValue::Number(value) => Ok(*value),
            QuantityValue::Text(text) => Ok(quantity::parse(resource, text)?),
        }
    }
}

/// Traces of one container's pods
#[derive(Debug, Default, Deserialize)]
pub struct PodTrace {
    pub usage: Vec<Sample>,
    #[serde(default)]
    pub throttle: Vec<Sample>,
}

#[derive(Debug, Deserialize)]
pub struct WorkloadTrace {
    #[serde(default = "default_namespace")]
    pub namespace: String,
    pub workload: String,
    pub container: String,
    pub resource: ResourceType,
    #[serde(default)]
    pub resource_request: Option<QuantityValue>,
    #[serde(default)]
    pub priority: Option<String>,
    #[serde(default)]
    pub ue_weight: Option<f64>,
    #[serde(default)]
    pub min_allowed: Option<QuantityValue>,
    #[serde(default)]
    pub max_allowed: Option<QuantityValue>,
    #[serde(default)]
    pub optimization_interval: Option<usize>,
    #[serde(default)]
    pub diurnal_len_in_min: Option<usize>,
    /// Days to drop, counted back from the day of the last usage sample
    #[serde(default)]
    pub bad_days: Vec<u32>,
    pub pods: Vec<PodTrace>,
}

fn default_namespace() -> String {
    "default".to_string()
}

impl WorkloadTrace {
    pub fn key(&self) -> WorkloadKey {
        WorkloadKey::new(
            self.namespace.clone(),
            self.workload.clone(),
            self.container.clone(),
            self.resource,
        )
    }

    /// Global config with this workload's overrides applied
    pub fn config(&self, base: &RecommenderConfig) -> Result<RecommenderConfig> {
        let mut config = base.clone();
        if let Some(request) = &self.resource_request {
            config.resource_request = request
                .resolve(self.resource)
                .with_context(|| format!("Invalid resource_request for {}", self.key()))?;
        }
        if self.priority.is_some() {
            config.priority = self.priority.clone();
        }
        if self.ue_weight.is_some() {
            config.ue_weight = self.ue_weight;
        }
        if let Some(interval) = self.optimization_interval {
            config.optimization_interval = interval;
        }
        if let Some(diurnal_len) = self.diurnal_len_in_min {
            config.diurnal_len_in_min = diurnal_len;
        }
        config
            .validate()
            .with_context(|| format!("Invalid configuration for {}", self.key()))?;
        Ok(config)
    }

    pub fn policy(&self) -> Result<ContainerPolicy> {
        let resolve = |value: &Option<QuantityValue>| -> Result<Option<f64>> {
            value
                .as_ref()
                .map(|v| v.resolve(self.resource))
                .transpose()
                .with_context(|| format!("Invalid policy limit for {}", self.key()))
        };
        Ok(ContainerPolicy::new(
            resolve(&self.min_allowed)?,
            resolve(&self.max_allowed)?,
        ))
    }

    /// Usage of all pods merged by per-timestamp maximum, bad days removed
    pub fn merged_usage(&self) -> Vec<Sample> {
        let pods: Vec<Vec<Sample>> = self.pods.iter().map(|p| p.usage.clone()).collect();
        self.without_bad_days(merge_max(&pods))
    }

    pub fn merged_throttle(&self) -> Vec<Sample> {
        let pods: Vec<Vec<Sample>> = self.pods.iter().map(|p| p.throttle.clone()).collect();
        self.without_bad_days(merge_max(&pods))
    }

    fn without_bad_days(&self, samples: Vec<Sample>) -> Vec<Sample> {
        let reference = self
            .pods
            .iter()
            .flat_map(|p| p.usage.iter().map(|(ts, _)| *ts))
            .max();
        match reference {
            Some(reference) if !self.bad_days.is_empty() => {
                exclude_days(&samples, &self.bad_days, reference)
            }
            _ => samples,
        }
    }
}

/// Read and parse a replay file
pub fn load(path: &Path) -> Result<ReplayInput> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read input file {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse input file {}", path.display()))
}
