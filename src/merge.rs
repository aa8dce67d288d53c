// 🔗 Merger / Rate Deriver - inner join on region key, crimes per 100,000 people
//
// Formula:
//   crime_rate = total_crimes / total_population * 100_000
//
// A region present on only one side is excluded: without a denominator there is
// no rate, and a population row without crime data adds nothing.

use crate::aggregate::CrimeAggregates;
use crate::config::{PipelineConfig, RatePolicy};
use crate::error::{PipelineError, PipelineResult, Stage};
use crate::table::{parse_integer, Table};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{info, warn};

pub const RATE_SCALE: f64 = 100_000.0;

// ============================================================================
// POPULATION RECORDS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PopulationRecord {
    pub region: String,
    /// None when the cell is blank
    pub total_population: Option<i64>,
    /// Every population column except the region, in file order
    pub values: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PopulationTable {
    /// Headers of `PopulationRecord::values`
    pub columns: Vec<String>,
    pub records: BTreeMap<String, PopulationRecord>,
}

impl PopulationTable {
    /// Type the reconciled population table. Non-integer populations and
    /// duplicate regions are load errors.
    pub fn from_table(table: &Table, config: &PipelineConfig) -> PipelineResult<Self> {
        let region = table.require_column(Stage::Merger, &config.region_column)?;
        let population = table.require_column(Stage::Merger, &config.population_column)?;

        let columns: Vec<String> = table
            .headers
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != region)
            .map(|(_, h)| h.clone())
            .collect();

        let mut records = BTreeMap::new();
        for (row, line) in table.rows.iter().zip(&table.lines) {
            let total_population = parse_integer(&row[population]).map_err(|_| {
                PipelineError::load(
                    &config.population_path,
                    format!("line {}: '{}' is not an integer population", line, row[population]),
                )
            })?;

            let values: Vec<String> = row
                .iter()
                .enumerate()
                .filter(|(i, _)| *i != region)
                .map(|(i, cell)| match (i == population, total_population) {
                    (true, Some(p)) => p.to_string(),
                    _ => cell.trim().to_string(),
                })
                .collect();

            let key = row[region].clone();
            let record = PopulationRecord {
                region: key.clone(),
                total_population,
                values,
            };
            if records.insert(key.clone(), record).is_some() {
                return Err(PipelineError::load(
                    &config.population_path,
                    format!("line {}: duplicate region '{}'", line, key),
                ));
            }
        }

        Ok(PopulationTable { columns, records })
    }
}

// ============================================================================
// MERGED RECORDS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MergedRegionRecord {
    pub region: String,
    pub offenses: Vec<i64>,
    pub population_values: Vec<String>,
    pub total_crimes: i64,
    pub total_population: i64,
    pub crime_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct MergedDataset {
    pub offense_columns: Vec<String>,
    pub population_columns: Vec<String>,
    /// Sorted by region key
    pub records: Vec<MergedRegionRecord>,
    /// Regions with crime data but no population row
    pub crime_only: Vec<String>,
    /// Regions with a population row but no crime data
    pub population_only: Vec<String>,
    /// Joined regions dropped under `RatePolicy::Skip`
    pub skipped: Vec<String>,
}

impl MergedDataset {
    pub fn regions(&self) -> Vec<&str> {
        self.records.iter().map(|r| r.region.as_str()).collect()
    }

    pub fn get(&self, region: &str) -> Option<&MergedRegionRecord> {
        self.records.iter().find(|r| r.region == region)
    }

    /// Highest crime rate first, ties broken by region key
    pub fn ranked_by_rate(&self) -> Vec<&MergedRegionRecord> {
        let mut ranked: Vec<&MergedRegionRecord> = self.records.iter().collect();
        ranked.sort_by(|a, b| {
            b.crime_rate
                .total_cmp(&a.crime_rate)
                .then_with(|| a.region.cmp(&b.region))
        });
        ranked
    }
}

/// Population usable as a rate denominator, i.e. present and strictly positive
pub fn rate_denominator(region: &str, population: Option<i64>) -> PipelineResult<i64> {
    match population {
        Some(p) if p > 0 => Ok(p),
        other => Err(PipelineError::RateUndefined {
            region: region.to_string(),
            population: other,
        }),
    }
}

fn rate_per_capita(total_crimes: i64, population: i64) -> f64 {
    total_crimes as f64 / population as f64 * RATE_SCALE
}

/// crime_rate for one joined row; population must be strictly positive
pub fn crime_rate(region: &str, total_crimes: i64, population: Option<i64>) -> PipelineResult<f64> {
    rate_denominator(region, population).map(|p| rate_per_capita(total_crimes, p))
}

/// Inner-join aggregates with population and derive the rate for every joined region
pub fn merge_with_population(
    aggregates: &CrimeAggregates,
    population: &PopulationTable,
    config: &PipelineConfig,
) -> PipelineResult<MergedDataset> {
    let mut merged = MergedDataset {
        offense_columns: aggregates.offense_columns.clone(),
        population_columns: population.columns.clone(),
        ..Default::default()
    };

    for agg in &aggregates.regions {
        let Some(pop) = population.records.get(&agg.region) else {
            merged.crime_only.push(agg.region.clone());
            continue;
        };

        let total_population = match rate_denominator(&agg.region, pop.total_population) {
            Ok(p) => p,
            Err(err) if config.rate_policy == RatePolicy::Skip => {
                warn!(region = %agg.region, error = %err, "skipping region");
                merged.skipped.push(agg.region.clone());
                continue;
            }
            Err(err) => return Err(err),
        };

        merged.records.push(MergedRegionRecord {
            region: agg.region.clone(),
            offenses: agg.offenses.clone(),
            population_values: pop.values.clone(),
            total_crimes: agg.total_crimes,
            total_population,
            crime_rate: rate_per_capita(agg.total_crimes, total_population),
        });
    }

    merged.population_only = population
        .records
        .keys()
        .filter(|region| aggregates.get(region).is_none())
        .cloned()
        .collect();

    if !merged.crime_only.is_empty() {
        warn!(regions = ?merged.crime_only, "crime regions without population data excluded");
    }
    info!(
        joined = merged.records.len(),
        crime_only = merged.crime_only.len(),
        population_only = merged.population_only.len(),
        skipped = merged.skipped.len(),
        "merged crime with population"
    );
    Ok(merged)
}
