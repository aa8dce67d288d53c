// 💾 Exporter - final joined table → delimited file
// Serialized in memory first so the file is written in one call and its checksum is known

use crate::config::PipelineConfig;
use crate::error::{PipelineError, PipelineResult, Stage};
use crate::merge::MergedDataset;
use sha2::{Digest, Sha256};
use std::fs;
use std::io;
use std::path::Path;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportSummary {
    pub rows: usize,
    pub bytes: usize,
    /// Hex SHA-256 of the written file
    pub sha256: String,
}

/// Header row: region, offense sums, population columns, total_crimes, crime_rate.
/// A name appearing twice is a `Schema` error.
pub fn export_headers(dataset: &MergedDataset, config: &PipelineConfig) -> PipelineResult<Vec<String>> {
    let mut headers = vec![config.region_column.clone()];
    headers.extend(dataset.offense_columns.iter().cloned());
    headers.extend(dataset.population_columns.iter().cloned());
    headers.push("total_crimes".to_string());
    headers.push("crime_rate".to_string());

    let duplicate = headers
        .iter()
        .enumerate()
        .find(|(i, h)| headers[..*i].contains(h))
        .map(|(_, h)| h.clone());
    if let Some(column) = duplicate {
        return Err(PipelineError::Schema {
            stage: Stage::Exporter,
            table: "merged".to_string(),
            column,
            detail: Some("duplicate output column".to_string()),
        });
    }
    Ok(headers)
}

/// Render the dataset as CSV bytes under `headers`
pub fn to_csv_bytes(dataset: &MergedDataset, headers: &[String]) -> io::Result<Vec<u8>> {
    let mut wtr = csv::Writer::from_writer(Vec::new());
    wtr.write_record(headers)?;

    for record in &dataset.records {
        let mut row = vec![record.region.clone()];
        row.extend(record.offenses.iter().map(|v| v.to_string()));
        row.extend(record.population_values.iter().cloned());
        row.push(record.total_crimes.to_string());
        row.push(record.crime_rate.to_string());
        wtr.write_record(&row)?;
    }

    wtr.into_inner().map_err(|e| io::Error::other(e.to_string()))
}

/// Write the dataset to `path`, replacing any previous file
pub fn export_csv(dataset: &MergedDataset, path: &Path, config: &PipelineConfig) -> PipelineResult<ExportSummary> {
    let write_err = |source: io::Error| PipelineError::Write {
        path: path.to_path_buf(),
        source,
    };

    let headers = export_headers(dataset, config)?;
    let bytes = to_csv_bytes(dataset, &headers).map_err(write_err)?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(write_err)?;
    }
    fs::write(path, &bytes).map_err(write_err)?;

    let summary = ExportSummary {
        rows: dataset.records.len(),
        bytes: bytes.len(),
        sha256: format!("{:x}", Sha256::digest(&bytes)),
    };
    info!(
        rows = summary.rows,
        path = %path.display(),
        sha256 = %summary.sha256,
        "saved final dataset"
    );
    Ok(summary)
}
