// 🧹 Cleaner - drop pre-aggregated "Total" district rows
// These subtotal rows would double-count once districts are summed per state

use crate::config::PipelineConfig;
use crate::error::{PipelineResult, Stage};
use crate::table::Table;
use tracing::info;

/// Outcome of a cleaning pass. `removed` is an audit metric only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CleanStats {
    pub before: usize,
    pub after: usize,
    pub removed: usize,
}

/// Remove every row whose district equals the sentinel, case-insensitively
pub fn remove_total_rows(table: &mut Table, config: &PipelineConfig) -> PipelineResult<CleanStats> {
    let district = table.require_column(Stage::Cleaner, &config.district_column)?;
    let sentinel = config.total_sentinel.to_lowercase();
    let before = table.len();

    table.retain_rows(|row| row[district].trim().to_lowercase() != sentinel);

    let stats = CleanStats {
        before,
        after: table.len(),
        removed: before - table.len(),
    };
    info!(
        removed = stats.removed,
        remaining = stats.after,
        "removed '{}' district rows",
        config.total_sentinel
    );
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PipelineError;
    use crate::table::table_from;

    #[test]
    fn test_total_rows_removed_case_insensitively() {
        let mut table = table_from(
            "crime",
            &["state", "district", "murder"],
            &[
                &["Odisha", "Puri", "1"],
                &["Odisha", "TOTAL", "9"],
                &["Goa", "Total", "3"],
                &["Goa", " total ", "3"],
                &["Goa", "North Goa", "2"],
            ],
        );

        let stats = remove_total_rows(&mut table, &PipelineConfig::default()).unwrap();

        assert_eq!(stats, CleanStats { before: 5, after: 2, removed: 3 });
        assert!(table
            .rows
            .iter()
            .all(|row| row[1].trim().to_lowercase() != "total"));
    }

    #[test]
    fn test_district_names_containing_total_survive() {
        let mut table = table_from(
            "crime",
            &["state", "district"],
            &[&["Delhi UT", "Total South"], &["Delhi UT", "Totals"]],
        );
        let stats = remove_total_rows(&mut table, &PipelineConfig::default()).unwrap();
        assert_eq!(stats.removed, 0);
    }

    #[test]
    fn test_missing_district_column_is_schema_error() {
        let mut table = table_from("crime", &["state", "murder"], &[&["Goa", "1"]]);
        let err = remove_total_rows(&mut table, &PipelineConfig::default()).unwrap_err();
        assert!(matches!(err, PipelineError::Schema { .. }));
        assert_eq!(err.stage(), Stage::Cleaner);
    }
}
