// ⚙️ Pipeline Configuration
// Compiled-in paths and column names. No CLI flags: override with the builder methods.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// What the merger does with a joined row whose population is missing or <= 0
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RatePolicy {
    /// Abort the run with `RateUndefined`
    Fail,
    /// Drop the row, log it, count it in the run report
    Skip,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    // ========================================================================
    // FILES
    // ========================================================================
    pub crime_path: PathBuf,
    pub population_path: PathBuf,
    /// Only read by the map step
    pub boundary_path: PathBuf,
    pub output_path: PathBuf,
    pub maps_dir: PathBuf,
    pub report_path: PathBuf,

    // ========================================================================
    // COLUMNS (post-normalization names)
    // ========================================================================
    /// Header of the crime table's region column before the rename
    pub crime_region_header: String,
    /// Shared region column name in both tables
    pub region_column: String,
    pub district_column: String,
    pub population_column: String,
    /// Numeric columns that identify a row rather than count offenses
    pub identifier_columns: Vec<String>,
    /// Preferred source of total_crimes when the crime table carries it
    pub total_crimes_column: String,

    // ========================================================================
    // BEHAVIOUR
    // ========================================================================
    /// District value marking pre-aggregated subtotal rows
    pub total_sentinel: String,
    pub rate_policy: RatePolicy,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            crime_path: PathBuf::from("data/raw/crime_data.csv"),
            population_path: PathBuf::from("data/raw/state_wise_population.csv"),
            boundary_path: PathBuf::from("data/raw/india_state_geo.json"),
            output_path: PathBuf::from("data/processed/final_crime_data.csv"),
            maps_dir: PathBuf::from("output/maps"),
            report_path: PathBuf::from("output/run_report.json"),
            crime_region_header: "states/uts".to_string(),
            region_column: "state".to_string(),
            district_column: "district".to_string(),
            population_column: "total_population".to_string(),
            identifier_columns: vec!["year".to_string()],
            total_crimes_column: "total_cognizable_ipc_crimes".to_string(),
            total_sentinel: "total".to_string(),
            rate_policy: RatePolicy::Fail,
        }
    }
}

impl PipelineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder pattern: read inputs from `crime` and `population`
    pub fn with_inputs(mut self, crime: impl Into<PathBuf>, population: impl Into<PathBuf>) -> Self {
        self.crime_path = crime.into();
        self.population_path = population.into();
        self
    }

    /// Builder pattern: write the joined table to `path`
    pub fn with_output(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_path = path.into();
        self
    }

    pub fn with_report(mut self, path: impl Into<PathBuf>) -> Self {
        self.report_path = path.into();
        self
    }

    pub fn with_boundary(mut self, path: impl Into<PathBuf>) -> Self {
        self.boundary_path = path.into();
        self
    }

    pub fn with_maps_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.maps_dir = dir.into();
        self
    }

    pub fn with_rate_policy(mut self, policy: RatePolicy) -> Self {
        self.rate_policy = policy;
        self
    }

    /// True when `column` is summed by the aggregator (if numeric)
    pub fn is_offense_candidate(&self, column: &str) -> bool {
        column != self.region_column
            && column != self.district_column
            && !self.identifier_columns.iter().any(|c| c == column)
    }
}
