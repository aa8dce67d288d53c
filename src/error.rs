// 🚨 Pipeline Errors
// Every failure names the stage and the record that caused it

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Pipeline stage, used to tag diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Loader,
    Cleaner,
    Reconciler,
    Aggregator,
    Merger,
    Exporter,
}

impl Stage {
    pub fn name(&self) -> &'static str {
        match self {
            Stage::Loader => "loader",
            Stage::Cleaner => "cleaner",
            Stage::Reconciler => "reconciler",
            Stage::Aggregator => "aggregator",
            Stage::Merger => "merger",
            Stage::Exporter => "exporter",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Error)]
pub enum PipelineError {
    /// Input file missing, unreadable or not tabular
    #[error("[loader] failed to load {path}: {detail}")]
    Load { path: PathBuf, detail: String },

    /// Expected column absent after header normalization, or a column whose
    /// contents break the stage's rules (`detail` says which)
    #[error("[{stage}] table '{table}', column '{column}': {}", schema_detail(.detail))]
    Schema {
        stage: Stage,
        table: String,
        column: String,
        detail: Option<String>,
    },

    /// Source region with no entry in the region name map
    #[error("[reconciler] region '{region}' (line {line}) has no entry in the region name map")]
    MappingGap { region: String, line: usize },

    /// Joined row whose population cannot serve as a denominator
    #[error("[merger] crime rate undefined for region '{region}': population is {}", population_label(.population))]
    RateUndefined {
        region: String,
        population: Option<i64>,
    },

    /// Output destination not writable
    #[error("[exporter] failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

fn schema_detail(detail: &Option<String>) -> &str {
    detail.as_deref().unwrap_or("column not found")
}

fn population_label(population: &Option<i64>) -> String {
    match population {
        Some(p) => p.to_string(),
        None => "missing".to_string(),
    }
}

impl PipelineError {
    pub fn stage(&self) -> Stage {
        match self {
            PipelineError::Load { .. } => Stage::Loader,
            PipelineError::Schema { stage, .. } => *stage,
            PipelineError::MappingGap { .. } => Stage::Reconciler,
            PipelineError::RateUndefined { .. } => Stage::Merger,
            PipelineError::Write { .. } => Stage::Exporter,
        }
    }

    pub(crate) fn missing_column(stage: Stage, table: &str, column: &str) -> Self {
        PipelineError::Schema {
            stage,
            table: table.to_string(),
            column: column.to_string(),
            detail: None,
        }
    }

    pub(crate) fn load(path: impl Into<PathBuf>, detail: impl fmt::Display) -> Self {
        PipelineError::Load {
            path: path.into(),
            detail: detail.to_string(),
        }
    }
}

pub type PipelineResult<T> = Result<T, PipelineError>;
