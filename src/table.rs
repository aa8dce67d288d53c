// 📂 Loader - CSV → normalized in-memory tables
// Header names are trimmed, lowercased and underscored before any stage looks at them

use crate::config::PipelineConfig;
use crate::error::{PipelineError, PipelineResult, Stage};
use std::path::Path;
use tracing::{debug, info};

// ============================================================================
// TABLE
// ============================================================================

/// String-celled table with the source line of every row kept for diagnostics
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub name: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
    /// 1-based line in the source file, parallel to `rows`
    pub lines: Vec<usize>,
}

impl Table {
    pub fn new(name: &str, headers: Vec<String>) -> Self {
        Table {
            name: name.to_string(),
            headers,
            rows: Vec::new(),
            lines: Vec::new(),
        }
    }

    pub fn push_row(&mut self, row: Vec<String>, line: usize) {
        self.rows.push(row);
        self.lines.push(line);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, column: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == column)
    }

    /// Index of `column`, or a `Schema` error attributed to `stage`
    pub fn require_column(&self, stage: Stage, column: &str) -> PipelineResult<usize> {
        self.column_index(column)
            .ok_or_else(|| PipelineError::missing_column(stage, &self.name, column))
    }

    /// Rename a header in place; returns false when `from` is absent
    pub fn rename_column(&mut self, from: &str, to: &str) -> bool {
        match self.column_index(from) {
            Some(idx) => {
                self.headers[idx] = to.to_string();
                true
            }
            None => false,
        }
    }

    /// Keep only the rows for which `keep` returns true
    pub fn retain_rows<F>(&mut self, mut keep: F)
    where
        F: FnMut(&[String]) -> bool,
    {
        let rows = std::mem::take(&mut self.rows);
        let lines = std::mem::take(&mut self.lines);
        for (row, line) in rows.into_iter().zip(lines) {
            if keep(&row) {
                self.rows.push(row);
                self.lines.push(line);
            }
        }
    }

    /// A column is numeric when every non-empty cell parses as an integer
    pub fn is_numeric_column(&self, idx: usize) -> bool {
        self.first_non_integer(idx).is_none()
    }

    /// Source line and value of the first cell in column `idx` that is not an integer
    pub fn first_non_integer(&self, idx: usize) -> Option<(usize, &str)> {
        self.rows
            .iter()
            .zip(&self.lines)
            .find(|(row, _)| parse_integer(&row[idx]).is_err())
            .map(|(row, line)| (*line, row[idx].as_str()))
    }
}

// ============================================================================
// NORMALIZATION
// ============================================================================

/// "  States/UTs " → "states/uts", "Total Population" → "total_population"
pub fn normalize_header(header: &str) -> String {
    header.trim().to_lowercase().replace(' ', "_")
}

/// Cell that is neither blank nor an integer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NotAnInteger;

/// Integer cell parser. Empty cells are `Ok(None)`; "12.0" is accepted as 12,
/// floats outside the i64 range are not.
pub fn parse_integer(cell: &str) -> Result<Option<i64>, NotAnInteger> {
    let trimmed = cell.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    if let Ok(value) = trimmed.parse::<i64>() {
        return Ok(Some(value));
    }
    match trimmed.parse::<f64>() {
        // i64::MAX as f64 rounds up to 2^63, hence the strict upper bound
        Ok(value)
            if value.is_finite()
                && value.fract() == 0.0
                && value >= i64::MIN as f64
                && value < i64::MAX as f64 =>
        {
            Ok(Some(value as i64))
        }
        _ => Err(NotAnInteger),
    }
}

// ============================================================================
// LOADER
// ============================================================================

/// Read a delimited file into a `Table` with normalized headers
pub fn load_table(path: &Path, name: &str) -> PipelineResult<Table> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)
        .map_err(|e| PipelineError::load(path, e))?;

    let headers: Vec<String> = rdr
        .headers()
        .map_err(|e| PipelineError::load(path, e))?
        .iter()
        .map(normalize_header)
        .collect();

    if headers.iter().all(|h| h.is_empty()) {
        return Err(PipelineError::load(path, "no header row"));
    }

    let mut table = Table::new(name, headers);
    for result in rdr.records() {
        let record = result.map_err(|e| PipelineError::load(path, e))?;
        let line = record.position().map(|p| p.line() as usize).unwrap_or(0);
        table.push_row(record.iter().map(str::to_string).collect(), line);
    }

    debug!(table = name, columns = ?table.headers, "normalized headers");
    info!(table = name, rows = table.len(), path = %path.display(), "loaded table");
    Ok(table)
}

/// Load both sources and give the crime table's region column its shared name
pub fn load_sources(config: &PipelineConfig) -> PipelineResult<(Table, Table)> {
    let mut crime = load_table(&config.crime_path, "crime")?;
    let population = load_table(&config.population_path, "population")?;

    if crime.rename_column(&config.crime_region_header, &config.region_column) {
        debug!(
            from = %config.crime_region_header,
            to = %config.region_column,
            "renamed crime region column"
        );
    }

    crime.require_column(Stage::Loader, &config.region_column)?;
    population.require_column(Stage::Loader, &config.region_column)?;
    population.require_column(Stage::Loader, &config.population_column)?;

    Ok((crime, population))
}

#[cfg(test)]
pub(crate) fn table_from(name: &str, headers: &[&str], rows: &[&[&str]]) -> Table {
    let mut table = Table::new(name, headers.iter().map(|h| h.to_string()).collect());
    for (i, row) in rows.iter().enumerate() {
        table.push_row(row.iter().map(|c| c.to_string()).collect(), i + 2);
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_normalize_header() {
        assert_eq!(normalize_header("  STATES/UTs "), "states/uts");
        assert_eq!(normalize_header("Total Population"), "total_population");
        assert_eq!(
            normalize_header("Total Cognizable IPC crimes"),
            "total_cognizable_ipc_crimes"
        );
    }

    #[test]
    fn test_parse_integer() {
        assert_eq!(parse_integer(" 42 "), Ok(Some(42)));
        assert_eq!(parse_integer("12.0"), Ok(Some(12)));
        assert_eq!(parse_integer(""), Ok(None));
        assert_eq!(parse_integer("12.5"), Err(NotAnInteger));
        assert_eq!(parse_integer("Odisha"), Err(NotAnInteger));
        assert_eq!(parse_integer("-5"), Ok(Some(-5)));
    }

    #[test]
    fn test_parse_integer_rejects_out_of_range_floats() {
        assert_eq!(parse_integer("1e30"), Err(NotAnInteger));
        assert_eq!(parse_integer("-1e30"), Err(NotAnInteger));
        assert_eq!(parse_integer("9223372036854775808.0"), Err(NotAnInteger));
        assert_eq!(parse_integer("1e3"), Ok(Some(1000)));
    }

    #[test]
    fn test_first_non_integer_reports_line() {
        let table = table_from(
            "crime",
            &["state", "murder"],
            &[&["goa", "1"], &["goa", ""], &["goa", "NA"]],
        );
        assert_eq!(table.first_non_integer(1), Some((4, "NA")));
        assert!(!table.is_numeric_column(1));
        assert_eq!(table.first_non_integer(0), Some((2, "goa")));
    }

    #[test]
    fn test_load_sources_normalizes_and_renames() {
        let dir = tempdir().unwrap();
        let crime = dir.path().join("crime.csv");
        let pop = dir.path().join("pop.csv");
        fs::write(&crime, "STATES/UTs,DISTRICT,Year,Murder\nOdisha,Puri,2001,4\n").unwrap();
        fs::write(&pop, " State ,Total Population\norissa,40000000\n").unwrap();

        let config = PipelineConfig::default().with_inputs(&crime, &pop);
        let (crime_table, pop_table) = load_sources(&config).unwrap();

        assert_eq!(crime_table.headers, vec!["state", "district", "year", "murder"]);
        assert_eq!(pop_table.headers, vec!["state", "total_population"]);
        assert_eq!(crime_table.rows[0], vec!["Odisha", "Puri", "2001", "4"]);
        assert_eq!(crime_table.lines, vec![2]);
    }

    #[test]
    fn test_missing_file_is_load_error() {
        let dir = tempdir().unwrap();
        let err = load_table(&dir.path().join("nope.csv"), "crime").unwrap_err();
        assert!(matches!(err, PipelineError::Load { .. }));
        assert_eq!(err.stage(), Stage::Loader);
    }

    #[test]
    fn test_ragged_rows_are_load_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.csv");
        fs::write(&path, "state,district\nodisha,puri,extra\n").unwrap();
        assert!(matches!(
            load_table(&path, "crime"),
            Err(PipelineError::Load { .. })
        ));
    }

    #[test]
    fn test_population_without_total_column_is_schema_error() {
        let dir = tempdir().unwrap();
        let crime = dir.path().join("crime.csv");
        let pop = dir.path().join("pop.csv");
        fs::write(&crime, "states/uts,district\nGoa,North Goa\n").unwrap();
        fs::write(&pop, "state,people\ngoa,1\n").unwrap();

        let config = PipelineConfig::default().with_inputs(&crime, &pop);
        let err = load_sources(&config).unwrap_err();
        match err {
            PipelineError::Schema { table, column, .. } => {
                assert_eq!(table, "population");
                assert_eq!(column, "total_population");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_crime_without_region_column_is_schema_error() {
        let dir = tempdir().unwrap();
        let crime = dir.path().join("crime.csv");
        let pop = dir.path().join("pop.csv");
        fs::write(&crime, "province,district,murder
Goa,North Goa,1
").unwrap();
        fs::write(&pop, "state,total_population
goa,1
").unwrap();

        let config = PipelineConfig::default().with_inputs(&crime, &pop);
        let err = load_sources(&config).unwrap_err();

        assert_eq!(err.stage(), Stage::Loader);
        match err {
            PipelineError::Schema { table, column, .. } => {
                assert_eq!(table, "crime");
                assert_eq!(column, "state");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_retain_rows_keeps_lines_aligned() {
        let mut table = table_from(
            "crime",
            &["state", "district"],
            &[&["goa", "a"], &["goa", "total"], &["goa", "b"]],
        );
        table.retain_rows(|row| row[1] != "total");
        assert_eq!(table.len(), 2);
        assert_eq!(table.lines, vec![2, 4]);
    }
}
