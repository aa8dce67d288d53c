// 🗾 Map Layers - GeoJSON ready for a marker map and a crime-rate choropleth
//
// Rendering (tiles, HTML, browser) belongs to whatever consumes these files.

use crate::boundary::{BoundaryFeature, NAME_PROPERTY};
use crate::merge::MergedDataset;
use anyhow::{Context, Result};
use geojson::{Feature, FeatureCollection, GeoJson};
use serde_json::Value;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub const MARKER_FILE: &str = "india_marker_map.geojson";
pub const CHOROPLETH_FILE: &str = "india_choropleth_map.geojson";
pub const NO_DATA: &str = "No data";

/// Boundary-file style name: first letter of every word uppercased.
/// A "word" starts after any non-letter, so "j&k" → "J&K".
pub fn display_name(region: &str) -> String {
    let mut out = String::with_capacity(region.len());
    let mut prev_is_letter = false;
    for c in region.trim().chars() {
        if prev_is_letter {
            out.extend(c.to_lowercase());
        } else {
            out.extend(c.to_uppercase());
        }
        prev_is_letter = c.is_alphabetic();
    }
    out
}

/// Two decimals, keeping a trailing ".0" for whole numbers
pub fn format_rate(rate: f64) -> String {
    let rounded = (rate * 100.0).round() / 100.0;
    if rounded.fract() == 0.0 {
        format!("{:.1}", rounded)
    } else {
        rounded.to_string()
    }
}

pub fn tooltip_text(name: &str, rate: f64) -> String {
    format!("{} | Crime Rate: {}", name, format_rate(rate))
}

// ============================================================================
// LAYERS
// ============================================================================

fn feature(geometry: Option<geojson::Geometry>, properties: geojson::JsonObject) -> Feature {
    Feature {
        bbox: None,
        geometry,
        id: None,
        properties: Some(properties),
        foreign_members: None,
    }
}

/// One Point per boundary feature at its centroid
pub fn marker_layer(features: &[BoundaryFeature]) -> FeatureCollection {
    let mut markers = Vec::new();
    for boundary in features {
        let name = display_name(&boundary.name);
        let Some((lon, lat)) = boundary.geometry.as_ref().and_then(|g| g.centroid()) else {
            warn!(feature = %name, "no centroid; marker skipped");
            continue;
        };
        let point = geojson::Geometry::new(geojson::Value::Point(vec![lon, lat]));
        let mut marker = feature(Some(point), geojson::JsonObject::new());
        marker.set_property("name", name);
        markers.push(marker);
    }
    markers.into_iter().collect()
}

/// Every boundary feature with `crime_rate` (or null) and a `tooltip_text`
pub fn choropleth_layer(features: &[BoundaryFeature], dataset: &MergedDataset) -> FeatureCollection {
    let rates: HashMap<String, f64> = dataset
        .records
        .iter()
        .map(|r| (display_name(&r.region), r.crime_rate))
        .collect();

    let mut out = Vec::with_capacity(features.len());
    for boundary in features {
        let name = display_name(&boundary.name);
        let geometry = boundary
            .geometry
            .as_ref()
            .map(|g| geojson::Geometry::new(geojson::Value::from(g)));
        let mut shaded = feature(geometry, boundary.properties.clone());
        match rates.get(&name) {
            Some(&rate) => {
                shaded.set_property("crime_rate", rate);
                shaded.set_property("tooltip_text", tooltip_text(&name, rate));
            }
            None => {
                shaded.set_property("crime_rate", Value::Null);
                shaded.set_property("tooltip_text", NO_DATA);
            }
        }
        shaded.set_property(NAME_PROPERTY, name);
        out.push(shaded);
    }
    out.into_iter().collect()
}

// ============================================================================
// OUTPUT
// ============================================================================

#[derive(Debug, Clone)]
pub struct MapSummary {
    pub marker_path: PathBuf,
    pub markers: usize,
    pub choropleth_path: PathBuf,
    /// Boundary features that received a crime rate
    pub matched: usize,
    pub unmatched: usize,
}

/// Write both layers into `dir`
pub fn write_maps(features: &[BoundaryFeature], dataset: &MergedDataset, dir: &Path) -> Result<MapSummary> {
    fs::create_dir_all(dir).with_context(|| format!("Failed to create maps directory: {:?}", dir))?;

    let markers = marker_layer(features);
    let choropleth = choropleth_layer(features, dataset);

    let marker_path = dir.join(MARKER_FILE);
    let choropleth_path = dir.join(CHOROPLETH_FILE);
    let marker_count = markers.features.len();
    let shaded_count = choropleth.features.len();
    let matched = choropleth
        .features
        .iter()
        .filter(|f| f.property("crime_rate").is_some_and(|rate| !rate.is_null()))
        .count();

    fs::write(&marker_path, GeoJson::from(markers).to_string())
        .with_context(|| format!("Failed to write {:?}", marker_path))?;
    fs::write(&choropleth_path, GeoJson::from(choropleth).to_string())
        .with_context(|| format!("Failed to write {:?}", choropleth_path))?;

    let summary = MapSummary {
        marker_path,
        markers: marker_count,
        choropleth_path,
        matched,
        unmatched: shaded_count - matched,
    };
    info!(
        markers = summary.markers,
        matched = summary.matched,
        unmatched = summary.unmatched,
        "wrote map layers"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boundary::{parse_boundaries, Geometry};
    use crate::merge::MergedRegionRecord;
    use serde_json::{json, Map};
    use tempfile::tempdir;

    fn record(region: &str, rate: f64) -> MergedRegionRecord {
        MergedRegionRecord {
            region: region.to_string(),
            offenses: vec![],
            population_values: vec![],
            total_crimes: 0,
            total_population: 1,
            crime_rate: rate,
        }
    }

    fn boundary_feature(name: &str, geometry: Option<Geometry>) -> BoundaryFeature {
        let mut properties = Map::new();
        properties.insert(NAME_PROPERTY.to_string(), json!(name));
        BoundaryFeature {
            name: name.to_string(),
            geometry,
            properties,
        }
    }

    fn square() -> Geometry {
        Geometry::Polygon(vec![vec![
            vec![0.0, 0.0],
            vec![2.0, 0.0],
            vec![2.0, 2.0],
            vec![0.0, 2.0],
        ]])
    }

    #[test]
    fn test_display_name() {
        assert_eq!(display_name("orissa"), "Orissa");
        assert_eq!(display_name("andaman & nicobar islands"), "Andaman & Nicobar Islands");
        assert_eq!(display_name("j&k"), "J&K");
        assert_eq!(display_name("  DELHI "), "Delhi");
    }

    #[test]
    fn test_format_rate() {
        assert_eq!(format_rate(1.25), "1.25");
        assert_eq!(format_rate(20.0), "20.0");
        assert_eq!(format_rate(2.0 / 3.0), "0.67");
        assert_eq!(tooltip_text("Goa", 20.0), "Goa | Crime Rate: 20.0");
    }

    #[test]
    fn test_choropleth_attaches_rates_and_no_data() {
        let dataset = MergedDataset {
            records: vec![record("orissa", 1.25)],
            ..Default::default()
        };
        let features = vec![boundary_feature("ORISSA", Some(square())), boundary_feature("Goa", Some(square()))];

        let layer = choropleth_layer(&features, &dataset);
        let out = &layer.features;

        assert_eq!(out[0].property("crime_rate"), Some(&json!(1.25)));
        assert_eq!(out[0].property("tooltip_text"), Some(&json!("Orissa | Crime Rate: 1.25")));
        assert_eq!(out[0].property("NAME_1"), Some(&json!("Orissa")));
        assert!(matches!(
            out[0].geometry.as_ref().map(|g| &g.value),
            Some(geojson::Value::Polygon(_))
        ));
        assert_eq!(out[1].property("crime_rate"), Some(&Value::Null));
        assert_eq!(out[1].property("tooltip_text"), Some(&json!(NO_DATA)));
    }

    #[test]
    fn test_marker_layer_skips_features_without_centroid() {
        let features = vec![boundary_feature("Goa", Some(square())), boundary_feature("Sikkim", None)];
        let layer = marker_layer(&features);
        let out = &layer.features;

        assert_eq!(out.len(), 1);
        assert_eq!(
            out[0].geometry.as_ref().map(|g| &g.value),
            Some(&geojson::Value::Point(vec![1.0, 1.0]))
        );
        assert_eq!(out[0].property("name"), Some(&json!("Goa")));
    }

    #[test]
    fn test_write_maps() {
        let dir = tempdir().unwrap();
        let features = parse_boundaries(
            r#"{"type": "FeatureCollection", "features": [
                {"type": "Feature", "properties": {"NAME_1": "Orissa"},
                 "geometry": {"type": "Polygon", "coordinates": [[[0, 0], [2, 0], [2, 2]]]}},
                {"type": "Feature", "properties": {"NAME_1": "Kerala"},
                 "geometry": {"type": "Polygon", "coordinates": [[[5, 5], [6, 6]]]}}
            ]}"#,
        )
        .unwrap();
        let dataset = MergedDataset {
            records: vec![record("orissa", 1.25)],
            ..Default::default()
        };

        let summary = write_maps(&features, &dataset, &dir.path().join("maps")).unwrap();

        assert_eq!(summary.markers, 2);
        assert_eq!(summary.matched, 1);
        assert_eq!(summary.unmatched, 1);
        let written: GeoJson = fs::read_to_string(&summary.choropleth_path).unwrap().parse().unwrap();
        match written {
            GeoJson::FeatureCollection(collection) => {
                assert_eq!(collection.features.len(), 2);
                assert_eq!(collection.features[0].property("crime_rate"), Some(&json!(1.25)));
            }
            other => panic!("unexpected GeoJSON: {other}"),
        }
        let markers: FeatureCollection = fs::read_to_string(&summary.marker_path).unwrap().parse().unwrap();
        assert_eq!(markers.features.len(), 2);
    }
}
