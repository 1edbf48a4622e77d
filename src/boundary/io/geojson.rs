use std::{fs, path::Path};

use anyhow::{anyhow, ensure, Context, Result};
use geo::{Coord, LineString, MultiPolygon, Polygon};
use serde_json::Value;
use tracing::warn;

use super::RawLayer;
use crate::geom::Crs;

/// Read a GeoJSON FeatureCollection of Polygon / MultiPolygon features.
pub(super) fn read_geojson(path: &Path, name_column: &str) -> Result<RawLayer> {
    let bytes = fs::read(path)
        .with_context(|| format!("[boundary::geojson] failed to read {}", path.display()))?;
    let value: Value = serde_json::from_slice(&bytes)
        .with_context(|| format!("[boundary::geojson] failed to parse {}", path.display()))?;
    parse_feature_collection(&value, name_column)
}

/// Parse an already-decoded FeatureCollection.
pub(super) fn parse_feature_collection(value: &Value, name_column: &str) -> Result<RawLayer> {
    ensure!(
        value["type"].as_str() == Some("FeatureCollection"),
        "[boundary::geojson] expected a FeatureCollection, found {}",
        value["type"],
    );
    let features = value["features"].as_array()
        .ok_or_else(|| anyhow!("[boundary::geojson] FeatureCollection has no features array"))?;

    let mut layer = RawLayer::default();

    // Legacy (2008) GeoJSON named CRS member; RFC 7946 files are always CRS84.
    if let Some(name) = value["crs"]["properties"]["name"].as_str() {
        layer.crs = Some(Crs::parse(name)?);
    }

    for (i, feature) in features.iter().enumerate() {
        let properties = &feature["properties"];
        if let Some(map) = properties.as_object() {
            layer.attributes.extend(map.keys().cloned());
        }

        let geometry = &feature["geometry"];
        let shape = match geometry["type"].as_str() {
            Some("Polygon") => MultiPolygon(vec![parse_polygon(&geometry["coordinates"])
                .with_context(|| format!("[boundary::geojson] feature {i}"))?]),
            Some("MultiPolygon") => parse_multipolygon(&geometry["coordinates"])
                .with_context(|| format!("[boundary::geojson] feature {i}"))?,
            other => {
                warn!("[boundary::geojson] feature {i} has non-polygon geometry {other:?}; skipped");
                layer.skipped += 1;
                continue;
            }
        };

        layer.push(property_to_name(&properties[name_column]), shape);
    }

    Ok(layer)
}

/// Region names may be stored as strings or (rarely) numbers; blanks count as missing.
fn property_to_name(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Parse MultiPolygon coordinates: `[polygon, polygon, ...]`.
fn parse_multipolygon(coords: &Value) -> Result<MultiPolygon<f64>> {
    let polygons = coords.as_array()
        .ok_or_else(|| anyhow!("Invalid MultiPolygon: coordinates must be an array"))?;
    Ok(MultiPolygon(
        polygons.iter()
            .map(parse_polygon)
            .collect::<Result<Vec<_>>>()?
    ))
}

/// Parse Polygon coordinates: `[exterior, hole, hole, ...]`.
fn parse_polygon(coords: &Value) -> Result<Polygon<f64>> {
    let rings = coords.as_array()
        .ok_or_else(|| anyhow!("Invalid Polygon: coordinates must be an array"))?;
    let mut rings = rings.iter().map(parse_ring);

    let exterior = rings.next()
        .ok_or_else(|| anyhow!("Invalid Polygon: missing exterior ring"))??;
    let interiors = rings.collect::<Result<Vec<_>>>()?;

    Ok(Polygon::new(exterior, interiors))
}

/// Parse a ring: `[[x, y], [x, y], ...]`, closing it if necessary.
fn parse_ring(coords: &Value) -> Result<LineString<f64>> {
    let positions = coords.as_array()
        .ok_or_else(|| anyhow!("Invalid ring: must be an array of positions"))?;

    let mut points = Vec::with_capacity(positions.len() + 1);
    for position in positions {
        let x = position[0].as_f64()
            .ok_or_else(|| anyhow!("Invalid coordinate: x must be a number"))?;
        let y = position[1].as_f64()
            .ok_or_else(|| anyhow!("Invalid coordinate: y must be a number"))?;
        points.push(Coord { x, y });
    }

    // Ensure ring is closed (first point == last point)
    if !points.is_empty() && points[0] != points[points.len() - 1] {
        points.push(points[0]);
    }

    Ok(LineString(points))
}
