// 🗺️ Region Reconciler - crime-source state names → population-source names
//
// The two datasets spell, abbreviate and split administrative regions differently.
// REGION_NAME_MAP is the single source of truth for that correspondence:
//   Some(name) → rewrite to the canonical population-side key
//   None       → no counterpart in the population source, drop the record
//   (absent)   → MappingGap, the run aborts

use crate::config::PipelineConfig;
use crate::error::{PipelineError, PipelineResult, Stage};
use crate::table::Table;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info, warn};

/// Bump whenever an entry in REGION_NAME_MAP changes
pub const REGION_MAP_VERSION: &str = "2024.1";

/// Normalized crime-source key → canonical population-source key
pub const REGION_NAME_MAP: &[(&str, Option<&str>)] = &[
    ("a&n islands", Some("andaman & nicobar islands")),
    ("andhra pradesh", Some("andhra pradesh")),
    ("arunachal pradesh", None),
    ("assam", Some("assam")),
    ("bihar", Some("bihar")),
    ("chandigarh", Some("chandigarh")),
    ("chhattisgarh", Some("chhattisgarh")),
    ("d&n haveli", Some("dnh")),
    ("daman & diu", Some("dnh")),
    ("delhi ut", Some("delhi")),
    ("goa", Some("goa")),
    ("gujarat", Some("gujarat")),
    ("haryana", Some("haryana")),
    ("himachal pradesh", Some("himachal pradesh")),
    ("jammu & kashmir", Some("j&k")),
    ("jharkhand", Some("jharkhand")),
    ("karnataka", Some("karnataka")),
    ("kerala", Some("kerala")),
    ("lakshadweep", None),
    ("madhya pradesh", Some("madhya pradesh")),
    ("maharashtra", Some("maharashtra")),
    ("manipur", Some("manipur")),
    ("meghalaya", Some("meghalaya")),
    ("mizoram", Some("mizoram")),
    ("nagaland", Some("nagaland")),
    ("odisha", Some("orissa")),
    ("puducherry", Some("pondy")),
    ("punjab", Some("punjab")),
    ("rajasthan", Some("rajasthan")),
    ("sikkim", Some("sikkim")),
    ("tamil nadu", Some("tamil nadu")),
    ("telangana", Some("telangana")),
    ("tripura", Some("tripura")),
    ("uttar pradesh", Some("uttar pradesh")),
    ("uttarakhand", Some("uttarakhand")),
    ("west bengal", Some("west bengal")),
];

/// Source key form shared by both tables: trimmed and lowercased
pub fn normalize_region(name: &str) -> String {
    name.trim().to_lowercase()
}

// ============================================================================
// REGION NAME MAP
// ============================================================================

/// Result of looking a source key up in the map
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionMapping<'a> {
    Canonical(&'a str),
    NoEquivalent,
    Unmapped,
}

#[derive(Debug, Clone)]
pub struct RegionNameMap {
    entries: BTreeMap<String, Option<String>>,
}

impl RegionNameMap {
    /// Map built from the compiled-in REGION_NAME_MAP
    pub fn builtin() -> Self {
        Self::from_entries(REGION_NAME_MAP.iter().copied())
    }

    /// Keys are normalized on insert; a later duplicate replaces an earlier one
    pub fn from_entries<'a, I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, Option<&'a str>)>,
    {
        RegionNameMap {
            entries: entries
                .into_iter()
                .map(|(source, target)| (normalize_region(source), target.map(normalize_region)))
                .collect(),
        }
    }

    pub fn lookup(&self, source_key: &str) -> RegionMapping<'_> {
        match self.entries.get(source_key) {
            Some(Some(target)) => RegionMapping::Canonical(target.as_str()),
            Some(None) => RegionMapping::NoEquivalent,
            None => RegionMapping::Unmapped,
        }
    }

    /// Canonical target names; reconciled regions always belong to this set
    pub fn codomain(&self) -> BTreeSet<&str> {
        self.entries
            .values()
            .filter_map(|target| target.as_deref())
            .collect()
    }

    /// Source keys explicitly marked as having no population-side counterpart
    pub fn excluded(&self) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|(_, target)| target.is_none())
            .map(|(source, _)| source.as_str())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for RegionNameMap {
    fn default() -> Self {
        Self::builtin()
    }
}

// ============================================================================
// RECONCILER
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileStats {
    pub rewritten: usize,
    /// Records whose region maps to "no equivalent region"
    pub dropped: usize,
    /// Distinct source keys dropped, for the run report
    pub dropped_regions: Vec<String>,
}

/// Normalize every region value in place
pub fn normalize_region_column(table: &mut Table, column: &str) -> PipelineResult<()> {
    let idx = table.require_column(Stage::Reconciler, column)?;
    for row in &mut table.rows {
        row[idx] = normalize_region(&row[idx]);
    }
    Ok(())
}

/// Rewrite crime-table regions to canonical names, dropping "no equivalent" records.
///
/// Both tables have their region column normalized first. A source key missing
/// from `map` aborts with `MappingGap` naming the first offending line.
pub fn reconcile(
    crime: &mut Table,
    population: &mut Table,
    map: &RegionNameMap,
    config: &PipelineConfig,
) -> PipelineResult<ReconcileStats> {
    let column = &config.region_column;
    normalize_region_column(crime, column)?;
    normalize_region_column(population, column)?;
    let idx = crime.require_column(Stage::Reconciler, column)?;

    // Check the whole table before touching it so a gap leaves no half-rewritten state
    for (row, line) in crime.rows.iter().zip(&crime.lines) {
        if map.lookup(&row[idx]) == RegionMapping::Unmapped {
            return Err(PipelineError::MappingGap {
                region: row[idx].clone(),
                line: *line,
            });
        }
    }

    let mut stats = ReconcileStats::default();
    let mut dropped = BTreeSet::new();
    crime.retain_rows(|row| match map.lookup(&row[idx]) {
        RegionMapping::NoEquivalent => {
            dropped.insert(row[idx].clone());
            stats.dropped += 1;
            false
        }
        _ => true,
    });

    for row in &mut crime.rows {
        if let RegionMapping::Canonical(target) = map.lookup(&row[idx]) {
            if row[idx] != target {
                debug!(from = %row[idx], to = target, "rewrote region");
            }
            row[idx] = target.to_string();
            stats.rewritten += 1;
        }
    }

    for region in &dropped {
        warn!(region = %region, "no equivalent region in population data; records dropped");
    }
    stats.dropped_regions = dropped.into_iter().collect();

    info!(
        map_version = REGION_MAP_VERSION,
        rewritten = stats.rewritten,
        dropped = stats.dropped,
        "reconciled region names"
    );
    Ok(stats)
}
