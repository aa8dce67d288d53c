// 🧭 Boundary Features - state polygons from a GeoJSON FeatureCollection
// Only the map step reads these; the core pipeline never does.

use anyhow::{bail, Context, Result};
use geojson::{GeoJson, JsonObject};
use serde_json::Value;
use std::fs;
use std::path::Path;
use tracing::{info, warn};

/// [lon, lat] with any extra ordinates (altitude) ignored
pub type Position = Vec<f64>;
pub type Ring = Vec<Position>;

/// Property holding the state name in the India boundary file
pub const NAME_PROPERTY: &str = "NAME_1";

// ============================================================================
// GEOMETRY
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    /// Exterior ring first, then holes
    Polygon(Vec<Ring>),
    MultiPolygon(Vec<Vec<Ring>>),
}

impl Geometry {
    /// Exterior rings of every polygon part
    pub fn exterior_rings(&self) -> Vec<&Ring> {
        match self {
            Geometry::Polygon(rings) => rings.first().into_iter().collect(),
            Geometry::MultiPolygon(polygons) => {
                polygons.iter().filter_map(|rings| rings.first()).collect()
            }
        }
    }

    /// Mean of all exterior-ring vertices as (lon, lat). None when there are none.
    pub fn centroid(&self) -> Option<(f64, f64)> {
        let mut count = 0usize;
        let (mut lon, mut lat) = (0.0, 0.0);
        for ring in self.exterior_rings() {
            for pos in ring {
                if pos.len() < 2 {
                    continue;
                }
                lon += pos[0];
                lat += pos[1];
                count += 1;
            }
        }
        if count == 0 {
            return None;
        }
        Some((lon / count as f64, lat / count as f64))
    }
}

impl TryFrom<&geojson::Value> for Geometry {
    type Error = anyhow::Error;

    fn try_from(value: &geojson::Value) -> Result<Self> {
        match value {
            geojson::Value::Polygon(rings) => Ok(Geometry::Polygon(rings.clone())),
            geojson::Value::MultiPolygon(polygons) => Ok(Geometry::MultiPolygon(polygons.clone())),
            _ => bail!("geometry is not a Polygon or MultiPolygon"),
        }
    }
}

impl From<&Geometry> for geojson::Value {
    fn from(geometry: &Geometry) -> Self {
        match geometry {
            Geometry::Polygon(rings) => geojson::Value::Polygon(rings.clone()),
            Geometry::MultiPolygon(polygons) => geojson::Value::MultiPolygon(polygons.clone()),
        }
    }
}

// ============================================================================
// FEATURES
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct BoundaryFeature {
    /// Raw `NAME_1` value
    pub name: String,
    /// None when the geometry is missing or not a (Multi)Polygon
    pub geometry: Option<Geometry>,
    pub properties: JsonObject,
}

/// Parse a FeatureCollection. Features without a name are skipped with a warning.
pub fn parse_boundaries(json: &str) -> Result<Vec<BoundaryFeature>> {
    let collection = match json.parse::<GeoJson>().context("Failed to parse boundary GeoJSON")? {
        GeoJson::FeatureCollection(collection) => collection,
        GeoJson::Feature(_) => bail!("expected a FeatureCollection, found a Feature"),
        GeoJson::Geometry(_) => bail!("expected a FeatureCollection, found a Geometry"),
    };

    let mut features = Vec::with_capacity(collection.features.len());
    for (i, feature) in collection.features.into_iter().enumerate() {
        let Some(name) = feature.property(NAME_PROPERTY).and_then(Value::as_str) else {
            warn!(feature = i, "boundary feature has no {} property; skipping", NAME_PROPERTY);
            continue;
        };
        let name = name.to_string();

        let geometry = match &feature.geometry {
            Some(g) => match Geometry::try_from(&g.value) {
                Ok(geometry) => Some(geometry),
                Err(e) => {
                    warn!(feature = %name, error = %e, "unsupported boundary geometry");
                    None
                }
            },
            None => None,
        };

        features.push(BoundaryFeature {
            name,
            geometry,
            properties: feature.properties.unwrap_or_default(),
        });
    }
    Ok(features)
}

pub fn load_boundaries(path: &Path) -> Result<Vec<BoundaryFeature>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read boundary file: {:?}", path))?;
    let features = parse_boundaries(&content)?;
    info!(features = features.len(), path = %path.display(), "loaded boundary GeoJSON");
    Ok(features)
}

#[cfg(test)]
mod tests {
    use super::*;

    const BOUNDARIES: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {
                "type": "Feature",
                "properties": {"NAME_1": "Orissa"},
                "geometry": {"type": "Polygon", "coordinates": [[[0.0, 0.0], [4.0, 0.0], [4.0, 2.0], [0.0, 2.0]]]}
            },
            {
                "type": "Feature",
                "properties": {"NAME_1": "Andaman & Nicobar Islands"},
                "geometry": {"type": "MultiPolygon", "coordinates": [
                    [[[0.0, 0.0], [2.0, 0.0]]],
                    [[[10.0, 10.0], [12.0, 10.0, 5.0]]]
                ]}
            },
            {
                "type": "Feature",
                "properties": {"NAME_1": "Goa"},
                "geometry": {"type": "Point", "coordinates": [1.0, 1.0]}
            },
            {
                "type": "Feature",
                "properties": {"ID": 7},
                "geometry": null
            }
        ]
    }"#;

    #[test]
    fn test_parse_boundaries() {
        let features = parse_boundaries(BOUNDARIES).unwrap();
        let names: Vec<&str> = features.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["Orissa", "Andaman & Nicobar Islands", "Goa"]);
        assert!(matches!(features[0].geometry, Some(Geometry::Polygon(_))));
        assert!(matches!(features[1].geometry, Some(Geometry::MultiPolygon(_))));
        assert!(features[2].geometry.is_none());
        assert_eq!(features[0].properties["NAME_1"], Value::from("Orissa"));
    }

    #[test]
    fn test_polygon_centroid_uses_exterior_ring() {
        let polygon = Geometry::Polygon(vec![
            vec![vec![0.0, 0.0], vec![4.0, 0.0], vec![4.0, 2.0], vec![0.0, 2.0]],
            vec![vec![100.0, 100.0]],
        ]);
        assert_eq!(polygon.centroid(), Some((2.0, 1.0)));
    }

    #[test]
    fn test_multipolygon_centroid_spans_all_parts() {
        let features = parse_boundaries(BOUNDARIES).unwrap();
        let centroid = features[1].geometry.as_ref().unwrap().centroid();
        assert_eq!(centroid, Some((6.0, 5.0)));
    }

    #[test]
    fn test_empty_geometry_has_no_centroid() {
        assert_eq!(Geometry::Polygon(vec![]).centroid(), None);
        assert_eq!(Geometry::MultiPolygon(vec![vec![vec![]]]).centroid(), None);
    }

    #[test]
    fn test_geometry_converts_to_and_from_geojson() {
        let polygon = Geometry::Polygon(vec![vec![vec![0.0, 0.0], vec![1.0, 0.0], vec![0.0, 1.0]]]);
        let value = geojson::Value::from(&polygon);
        assert!(matches!(value, geojson::Value::Polygon(_)));
        assert_eq!(Geometry::try_from(&value).unwrap(), polygon);

        let point = geojson::Value::Point(vec![1.0, 1.0]);
        assert!(Geometry::try_from(&point).is_err());
    }

    #[test]
    fn test_rejects_non_collection() {
        let err = parse_boundaries(r#"{"type": "Feature", "geometry": null, "properties": {}}"#).unwrap_err();
        assert!(err.to_string().contains("FeatureCollection"));

        assert!(parse_boundaries("not json").is_err());
    }
}
