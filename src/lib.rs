// Crime Atlas - Core Library
// District crime + state population → reconciled per-capita crime rates

pub mod config;
pub mod error;
pub mod table;          // Loader
pub mod cleaner;        // "Total" row removal
pub mod regions;        // Region name reconciliation
pub mod aggregate;      // Per-region sums
pub mod merge;          // Inner join + crime rate
pub mod export;         // Flat file output
pub mod pipeline;       // Stage orchestration + run report
pub mod boundary;       // GeoJSON boundaries (presentation only)
pub mod maps;           // Marker + choropleth layers (presentation only)

// Re-export commonly used types
pub use config::{PipelineConfig, RatePolicy};
pub use error::{PipelineError, PipelineResult, Stage};
pub use table::{load_sources, load_table, normalize_header, Table};
pub use cleaner::{remove_total_rows, CleanStats};
pub use regions::{
    normalize_region, reconcile, ReconcileStats, RegionMapping, RegionNameMap,
    REGION_MAP_VERSION, REGION_NAME_MAP,
};
pub use aggregate::{aggregate_by_region, CrimeAggregates, RegionCrimeAggregate};
pub use merge::{
    crime_rate, merge_with_population, rate_denominator, MergedDataset, MergedRegionRecord, PopulationRecord,
    PopulationTable, RATE_SCALE,
};
pub use export::{export_csv, ExportSummary};
pub use pipeline::{run, run_with_map, PipelineOutput, RunReport};
pub use boundary::{load_boundaries, BoundaryFeature, Geometry};
pub use maps::{write_maps, MapSummary};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
