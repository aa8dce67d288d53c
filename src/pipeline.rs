// 🚚 Pipeline - Loader → Cleaner → Reconciler → Aggregator → Merger → Exporter
//
// Single pass, single owner: each stage takes the previous stage's table and
// hands on a new one. Any stage error aborts the run; there is no partial output.

use crate::aggregate::aggregate_by_region;
use crate::cleaner::remove_total_rows;
use crate::config::{PipelineConfig, RatePolicy};
use crate::error::PipelineResult;
use crate::export::export_csv;
use crate::merge::{merge_with_population, MergedDataset, PopulationTable};
use crate::regions::{reconcile, RegionNameMap, REGION_MAP_VERSION};
use crate::table::load_sources;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::info;

// ============================================================================
// RUN REPORT
// ============================================================================

/// Audit trail of one run. Timestamps and run id live here, never in the CSV.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub region_map_version: String,
    pub rate_policy: RatePolicy,

    pub crime_rows_loaded: usize,
    pub population_rows_loaded: usize,
    pub total_rows_removed: usize,
    pub no_equivalent_records_dropped: usize,
    pub no_equivalent_regions: Vec<String>,
    pub regions_aggregated: usize,
    pub crime_only_regions: Vec<String>,
    pub population_only_regions: Vec<String>,
    pub skipped_rate_regions: Vec<String>,

    pub rows_written: usize,
    pub output_path: String,
    pub output_sha256: String,
}

impl RunReport {
    pub fn summary(&self) -> String {
        format!(
            "{} regions written ({} 'Total' rows removed, {} records without equivalent region, {} crime-only, {} population-only, {} skipped)",
            self.rows_written,
            self.total_rows_removed,
            self.no_equivalent_records_dropped,
            self.crime_only_regions.len(),
            self.population_only_regions.len(),
            self.skipped_rate_regions.len(),
        )
    }

    /// Pretty JSON to `path`, creating parent directories
    pub fn write_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create report directory: {:?}", parent))?;
        }
        let json = serde_json::to_string_pretty(self).context("Failed to serialize run report")?;
        fs::write(path, json).with_context(|| format!("Failed to write run report: {:?}", path))?;
        Ok(())
    }
}

/// Everything a run produces
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub dataset: MergedDataset,
    pub report: RunReport,
}

// ============================================================================
// RUN
// ============================================================================

/// Run the full batch with the compiled-in region map
pub fn run(config: &PipelineConfig) -> PipelineResult<PipelineOutput> {
    run_with_map(config, &RegionNameMap::builtin())
}

pub fn run_with_map(config: &PipelineConfig, map: &RegionNameMap) -> PipelineResult<PipelineOutput> {
    let started_at = Utc::now();
    let run_id = uuid::Uuid::new_v4().to_string();
    info!(run_id = %run_id, "starting crime rate pipeline");

    // 1. Load
    let (mut crime, mut population) = load_sources(config)?;
    let crime_rows_loaded = crime.len();
    let population_rows_loaded = population.len();

    // 2. Clean
    let cleaned = remove_total_rows(&mut crime, config)?;

    // 3. Reconcile
    let reconciled = reconcile(&mut crime, &mut population, map, config)?;

    // 4. Aggregate
    let aggregates = aggregate_by_region(&crime, config)?;

    // 5. Merge + derive rate
    let population = PopulationTable::from_table(&population, config)?;
    let dataset = merge_with_population(&aggregates, &population, config)?;

    // 6. Export
    let exported = export_csv(&dataset, &config.output_path, config)?;

    let report = RunReport {
        run_id,
        started_at,
        finished_at: Utc::now(),
        region_map_version: REGION_MAP_VERSION.to_string(),
        rate_policy: config.rate_policy,
        crime_rows_loaded,
        population_rows_loaded,
        total_rows_removed: cleaned.removed,
        no_equivalent_records_dropped: reconciled.dropped,
        no_equivalent_regions: reconciled.dropped_regions,
        regions_aggregated: aggregates.regions.len(),
        crime_only_regions: dataset.crime_only.clone(),
        population_only_regions: dataset.population_only.clone(),
        skipped_rate_regions: dataset.skipped.clone(),
        rows_written: exported.rows,
        output_path: config.output_path.display().to_string(),
        output_sha256: exported.sha256,
    };

    info!(run_id = %report.run_id, "{}", report.summary());
    Ok(PipelineOutput { dataset, report })
}
