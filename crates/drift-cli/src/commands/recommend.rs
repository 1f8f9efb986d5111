//! Replay recorded traces through the recommender

use anyhow::{Context, Result};
use drift_lib::models::{ResourceType, Sample, SECONDS_PER_MINUTE};
use drift_lib::{quantity, RecommendationStore, RecommenderConfig};
use serde::Serialize;
use std::sync::Arc;
use tabled::Tabled;
use tracing::info;

use crate::input::{ReplayInput, WorkloadTrace};
use crate::output::{mark_capped, print_info, print_records, OutputFormat};

/// One emitted recommendation after policy capping
#[derive(Debug, Clone, Serialize)]
pub struct EmittedRecommendation {
    pub workload: String,
    pub resource: ResourceType,
    pub patch_timestamp: i64,
    pub last_update: Option<String>,
    pub lower_bound: f64,
    pub target: f64,
    pub upper_bound: f64,
    pub uncapped_target: f64,
}

/// Row for the recommendations table
#[derive(Tabled)]
struct RecommendationRow {
    #[tabled(rename = "Workload")]
    workload: String,
    #[tabled(rename = "Last Update")]
    last_update: String,
    #[tabled(rename = "Lower")]
    lower: String,
    #[tabled(rename = "Target")]
    target: String,
    #[tabled(rename = "Upper")]
    upper: String,
}

impl From<&EmittedRecommendation> for RecommendationRow {
    fn from(rec: &EmittedRecommendation) -> Self {
        let format = |value| quantity::format(rec.resource, value);
        Self {
            workload: rec.workload.clone(),
            last_update: rec.last_update.clone().unwrap_or_default(),
            lower: format(rec.lower_bound),
            target: mark_capped(format(rec.target), rec.target != rec.uncapped_target),
            upper: format(rec.upper_bound),
        }
    }
}

/// Replay every workload in parallel and print what was emitted
pub async fn run(
    base: &RecommenderConfig,
    input: ReplayInput,
    step_minutes: Option<usize>,
    show_metrics: bool,
    format: OutputFormat,
) -> Result<()> {
    let store = Arc::new(RecommendationStore::new());

    let handles: Vec<_> = input
        .workloads
        .into_iter()
        .map(|workload| {
            let store = Arc::clone(&store);
            let base = base.clone();
            tokio::task::spawn_blocking(move || replay(&store, &base, &workload, step_minutes))
        })
        .collect();

    let mut emitted = Vec::new();
    for handle in handles {
        emitted.extend(handle.await.context("Replay task panicked")??);
    }

    info!(
        workloads = store.len(),
        recommendations = emitted.len(),
        "Replay finished"
    );

    print_records(&emitted, format, |rec| RecommendationRow::from(rec));
    if matches!(format, OutputFormat::Table) && !emitted.is_empty() {
        println!("\nTotal: {} recommendations", emitted.len());
    }

    if show_metrics {
        print_info("Metrics");
        print!("{}", encode_metrics()?);
    }
    Ok(())
}

/// Feed one workload's merged trace in growing prefixes of `step` minutes
fn replay(
    store: &RecommendationStore,
    base: &RecommenderConfig,
    workload: &WorkloadTrace,
    step_minutes: Option<usize>,
) -> Result<Vec<EmittedRecommendation>> {
    let key = workload.key();
    let config = workload.config(base)?;
    let policy = workload.policy()?;
    let usage = workload.merged_usage();
    let throttle = workload.merged_throttle();

    let (Some(&(first, _)), Some(&(last, _))) = (usage.first(), usage.last()) else {
        anyhow::bail!("Workload {} has no usage samples", key);
    };
    let step = step_minutes
        .unwrap_or(config.optimization_interval)
        .max(1) as i64
        * SECONDS_PER_MINUTE;

    let mut emitted = Vec::new();
    let mut end = first + step;
    loop {
        let usage_prefix = prefix(&usage, end);
        let throttle_prefix = prefix(&throttle, end);
        let recommendation = store
            .compute(&key, &config, usage_prefix, throttle_prefix)
            .with_context(|| format!("Failed to compute recommendation for {}", key))?;

        if recommendation.is_update() {
            let capped = recommendation.capped(&policy);
            emitted.push(EmittedRecommendation {
                workload: key.to_string(),
                resource: key.resource,
                patch_timestamp: capped.patch_timestamp,
                last_update: recommendation.last_update(),
                lower_bound: capped.lower_bound,
                target: capped.target,
                upper_bound: capped.upper_bound,
                uncapped_target: capped.uncapped_target,
            });
        }

        if end > last {
            break;
        }
        end += step;
    }
    Ok(emitted)
}

/// Samples strictly before `end`; traces are sorted by timestamp
fn prefix(samples: &[Sample], end: i64) -> &[Sample] {
    let len = samples.partition_point(|(ts, _)| *ts < end);
    &samples[..len]
}

fn encode_metrics() -> Result<String> {
    use prometheus::{Encoder, TextEncoder};

    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    encoder
        .encode(&prometheus::gather(), &mut buffer)
        .context("Failed to encode metrics")?;
    String::from_utf8(buffer).context("Metrics are not valid UTF-8")
}
