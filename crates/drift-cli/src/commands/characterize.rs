//! Characterization report

use anyhow::{Context, Result};
use drift_lib::characterizer::WorkloadCharacterizer;
use drift_lib::curator::align;
use drift_lib::RecommenderConfig;
use serde::Serialize;
use tabled::Tabled;

use crate::input::{ReplayInput, WorkloadTrace};
use crate::output::{color_weight, print_records, OutputFormat};

#[derive(Debug, Serialize)]
pub struct CharacterizationReport {
    pub workload: String,
    pub samples: usize,
    pub ue_weight: f64,
    pub is_periodic: bool,
    pub spread: f64,
}

/// Row for the characterization table
#[derive(Tabled)]
struct CharacterizationRow {
    #[tabled(rename = "Workload")]
    workload: String,
    #[tabled(rename = "Samples")]
    samples: usize,
    #[tabled(rename = "UE Weight")]
    ue_weight: String,
    #[tabled(rename = "Periodic")]
    is_periodic: String,
    #[tabled(rename = "Spread")]
    spread: String,
}

impl From<&CharacterizationReport> for CharacterizationRow {
    fn from(report: &CharacterizationReport) -> Self {
        Self {
            workload: report.workload.clone(),
            samples: report.samples,
            ue_weight: color_weight(report.ue_weight),
            is_periodic: if report.is_periodic { "yes" } else { "no" }.to_string(),
            spread: format!("{:.3}", report.spread),
        }
    }
}

pub fn run(base: &RecommenderConfig, input: ReplayInput, format: OutputFormat) -> Result<()> {
    let reports = input
        .workloads
        .iter()
        .map(|workload| characterize(base, workload))
        .collect::<Result<Vec<_>>>()?;

    print_records(&reports, format, |report| CharacterizationRow::from(report));
    Ok(())
}

fn characterize(base: &RecommenderConfig, workload: &WorkloadTrace) -> Result<CharacterizationReport> {
    let key = workload.key();
    let config = workload.config(base)?;

    let aligned = align(&workload.merged_usage(), &workload.merged_throttle())
        .and_then(|series| series.trim_undefined_edges())
        .with_context(|| format!("Invalid usage trace for {}", key))?;
    let normalized: Vec<f64> = aligned
        .usage
        .iter()
        .map(|v| v / config.resource_request)
        .collect();

    let characterization = WorkloadCharacterizer::new(
        config.optimization_interval,
        config.diurnal_len_in_min,
        config.priority(),
    )
    .characterize(&normalized);

    Ok(CharacterizationReport {
        workload: key.to_string(),
        samples: aligned.len(),
        ue_weight: characterization.ue_weight,
        is_periodic: characterization.is_periodic,
        spread: characterization.spread,
    })
}
