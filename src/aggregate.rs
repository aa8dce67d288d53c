// ➕ Aggregator - per-region sums of every offense column

use crate::config::PipelineConfig;
use crate::error::{PipelineError, PipelineResult, Stage};
use crate::table::{parse_integer, Table};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{info, warn};

/// One row per canonical region
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegionCrimeAggregate {
    pub region: String,
    /// Parallel to `CrimeAggregates::offense_columns`
    pub offenses: Vec<i64>,
    pub total_crimes: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrimeAggregates {
    pub offense_columns: Vec<String>,
    /// Sorted by region key
    pub regions: Vec<RegionCrimeAggregate>,
}

impl CrimeAggregates {
    pub fn get(&self, region: &str) -> Option<&RegionCrimeAggregate> {
        self.regions
            .binary_search_by(|r| r.region.as_str().cmp(region))
            .ok()
            .map(|i| &self.regions[i])
    }

    /// Back to a table with the region column first, e.g. to re-aggregate
    pub fn to_table(&self, region_column: &str) -> Table {
        let mut headers = vec![region_column.to_string()];
        headers.extend(self.offense_columns.iter().cloned());
        let mut table = Table::new("crime_aggregate", headers);
        for (i, agg) in self.regions.iter().enumerate() {
            let mut row = vec![agg.region.clone()];
            row.extend(agg.offenses.iter().map(|v| v.to_string()));
            table.push_row(row, i + 2);
        }
        table
    }
}

fn aggregation_error(table: &Table, column: &str, detail: String) -> PipelineError {
    PipelineError::Schema {
        stage: Stage::Aggregator,
        table: table.name.clone(),
        column: column.to_string(),
        detail: Some(detail),
    }
}

/// Group `table` by region and sum every numeric offense column.
///
/// Offense columns are the numeric columns other than the region, district and
/// identifier columns; other candidates are left out with a warning. The
/// configured total column must be numeric when present, and `total_crimes`
/// comes from it; otherwise it is the sum of all offense columns. Counts must be
/// non-negative and every sum must fit in an i64.
pub fn aggregate_by_region(table: &Table, config: &PipelineConfig) -> PipelineResult<CrimeAggregates> {
    let region = table.require_column(Stage::Aggregator, &config.region_column)?;

    let mut offense_idx = Vec::new();
    for (i, header) in table.headers.iter().enumerate() {
        if !config.is_offense_candidate(header) {
            continue;
        }
        match table.first_non_integer(i) {
            None => offense_idx.push(i),
            Some((line, value)) if *header == config.total_crimes_column => {
                return Err(aggregation_error(
                    table,
                    header,
                    format!("line {}: '{}' is not an integer count", line, value),
                ));
            }
            Some((line, value)) => {
                warn!(column = %header, line, value, "non-numeric column left out of aggregation");
            }
        }
    }

    if offense_idx.is_empty() {
        return Err(aggregation_error(
            table,
            "<numeric>",
            "no numeric offense columns to aggregate".to_string(),
        ));
    }

    let offense_columns: Vec<String> = offense_idx
        .iter()
        .map(|&i| table.headers[i].clone())
        .collect();
    let total_position = offense_columns
        .iter()
        .position(|c| *c == config.total_crimes_column);

    let mut groups: BTreeMap<&str, Vec<i64>> = BTreeMap::new();
    for (row, line) in table.rows.iter().zip(&table.lines) {
        let key = row[region].as_str();
        let sums = groups
            .entry(key)
            .or_insert_with(|| vec![0; offense_idx.len()]);
        for (slot, &col) in offense_idx.iter().enumerate() {
            // Columns were checked numeric above; blanks count as zero
            let count = parse_integer(&row[col]).ok().flatten().unwrap_or(0);
            if count < 0 {
                return Err(aggregation_error(
                    table,
                    &offense_columns[slot],
                    format!("line {}: negative count {}", line, count),
                ));
            }
            sums[slot] = sums[slot].checked_add(count).ok_or_else(|| {
                aggregation_error(
                    table,
                    &offense_columns[slot],
                    format!("sum for region '{}' overflows i64", key),
                )
            })?;
        }
    }

    let mut regions = Vec::with_capacity(groups.len());
    for (key, offenses) in groups {
        let total_crimes = match total_position {
            Some(p) => offenses[p],
            None => offenses
                .iter()
                .try_fold(0i64, |acc, &v| acc.checked_add(v))
                .ok_or_else(|| {
                    aggregation_error(
                        table,
                        "total_crimes",
                        format!("total for region '{}' overflows i64", key),
                    )
                })?,
        };
        regions.push(RegionCrimeAggregate {
            region: key.to_string(),
            offenses,
            total_crimes,
        });
    }

    info!(
        regions = regions.len(),
        offense_columns = offense_columns.len(),
        "aggregated crime by region"
    );
    Ok(CrimeAggregates {
        offense_columns,
        regions,
    })
}
