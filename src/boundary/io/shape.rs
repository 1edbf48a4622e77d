use std::{fs, path::Path};

use anyhow::{Context, Result};
use geo::{Coord, LineString, MultiPolygon, Polygon};
use shapefile::{dbase::{FieldValue, Record}, PolygonRing, Reader, Shape};
use tracing::{debug, warn};

use super::RawLayer;
use crate::geom::Crs;

/// Read all polygons and their name attribute from a `.shp` file (plus `.dbf`/`.prj` sidecars).
pub(super) fn read_shapefile(path: &Path, name_column: &str) -> Result<RawLayer> {
    let mut reader = Reader::from_path(path)
        .with_context(|| format!("[boundary::shape] failed to open shapefile: {}", path.display()))?;

    let mut layer = RawLayer { crs: read_prj(path), ..RawLayer::default() };

    for (i, result) in reader.iter_shapes_and_records().enumerate() {
        let (shape, record) = result.context("[boundary::shape] error reading shape+record")?;

        if i == 0 {
            layer.attributes.extend(record.clone().into_iter().map(|(field, _)| field));
        }

        let shape = match shape {
            Shape::Polygon(polygon) => shp_to_geo(&polygon),
            other => {
                warn!("[boundary::shape] record {i} has non-polygon shape {:?}; skipped", other.shapetype());
                layer.skipped += 1;
                continue;
            }
        };

        layer.push(record_name(&record, name_column), shape);
    }

    Ok(layer)
}

/// Identify the CRS declared by the `.prj` sidecar, if there is one we recognize.
fn read_prj(path: &Path) -> Option<Crs> {
    let prj = path.with_extension("prj");
    let wkt = fs::read_to_string(&prj).ok()?;
    let crs = Crs::from_wkt(&wkt);
    match &crs {
        Some(crs) => debug!("[boundary::shape] {} declares {crs}", prj.display()),
        None => warn!("[boundary::shape] could not identify CRS in {}; set `crs` in the config", prj.display()),
    }
    crs
}

/// Get a trimmed textual value of a DBF field.
fn record_name(record: &Record, field: &str) -> Option<String> {
    match record.get(field) {
        Some(FieldValue::Character(Some(s))) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
        Some(FieldValue::Numeric(Some(n))) => Some(n.to_string()),
        _ => None,
    }
}

/// Convert shapefile::Polygon to geo::MultiPolygon<f64>.
/// Shapefiles store each outer ring followed by its holes.
fn shp_to_geo(polygon: &shapefile::Polygon) -> MultiPolygon<f64> {
    /// Ensure first and last are the same for geo::LineString coords
    fn ring(points: &[shapefile::Point]) -> LineString<f64> {
        let mut coords = points.iter().map(|pt| Coord { x: pt.x, y: pt.y }).collect::<Vec<_>>();
        if !coords.is_empty() && coords[0] != coords[coords.len() - 1] {
            coords.push(coords[0]);
        }
        LineString(coords)
    }

    let mut polys = Vec::new();
    let mut current_exterior: Option<LineString<f64>> = None;
    let mut current_holes = Vec::new();

    for r in polygon.rings() {
        match r {
            PolygonRing::Outer(points) => {
                // flush previous polygon
                if let Some(exterior) = current_exterior.take() {
                    polys.push(Polygon::new(exterior, std::mem::take(&mut current_holes)));
                }
                current_exterior = Some(ring(points));
            }
            PolygonRing::Inner(points) => current_holes.push(ring(points)),
        }
    }
    if let Some(exterior) = current_exterior {
        polys.push(Polygon::new(exterior, current_holes));
    }

    MultiPolygon(polys)
}

#[cfg(test)]
mod tests {
    use std::path::{Path, PathBuf};

    use shapefile::{dbase::{FieldValue, Record, TableWriterBuilder}, Point, PolygonRing};

    use super::*;

    fn pts(coords: &[(f64, f64)]) -> Vec<Point> {
        coords.iter().map(|&(x, y)| Point { x, y }).collect()
    }

    /// Two unit squares: "Beijing" and a blank name, each with a numeric code.
    fn write_fixture(dir: &Path, prj: Option<&str>) -> PathBuf {
        let path = dir.join("cities.shp");
        let table = TableWriterBuilder::new()
            .add_character_field("name".try_into().unwrap(), 32)
            .add_numeric_field("code".try_into().unwrap(), 8, 0);
        let mut writer = shapefile::Writer::from_path(&path, table).unwrap();

        for (name, code, x0) in [("Beijing", 110000.0, 116.0), ("  ", 120000.0, 121.0)] {
            let polygon = shapefile::Polygon::new(PolygonRing::Outer(pts(&[
                (x0, 39.0), (x0, 40.0), (x0 + 1.0, 40.0), (x0 + 1.0, 39.0), (x0, 39.0),
            ])));
            let mut record = Record::default();
            record.insert("name".to_string(), FieldValue::Character(Some(name.to_string())));
            record.insert("code".to_string(), FieldValue::Numeric(Some(code)));
            writer.write_shape_and_record(&polygon, &record).unwrap();
        }
        drop(writer);

        if let Some(wkt) = prj {
            fs::write(path.with_extension("prj"), wkt).unwrap();
        }
        path
    }

    #[test]
    fn reads_polygons_names_and_attributes() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_fixture(dir.path(), None);

        let layer = read_shapefile(&path, "name").unwrap();
        assert_eq!(layer.names, vec![Some("Beijing".to_string()), None]);
        assert!(layer.attributes.contains("name") && layer.attributes.contains("code"));
        assert_eq!(layer.shapes.len(), 2);
        assert_eq!(layer.shapes[0].0.len(), 1);
        assert!(layer.crs.is_none());
        assert_eq!(layer.skipped, 0);
    }

    #[test]
    fn numeric_name_fields_become_text() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_fixture(dir.path(), None);

        let layer = read_shapefile(&path, "code").unwrap();
        assert_eq!(layer.names, vec![Some("110000".to_string()), Some("120000".to_string())]);
    }

    #[test]
    fn prj_sidecar_declares_the_crs() {
        let dir = tempfile::tempdir().unwrap();
        let utm = r#"PROJCS["WGS_1984_UTM_Zone_50N",GEOGCS["GCS_WGS_1984",DATUM["D_WGS_1984",SPHEROID["WGS_1984",6378137.0,298.257223563]]],PROJECTION["Transverse_Mercator"]]"#;
        let path = write_fixture(dir.path(), Some(utm));

        let layer = read_shapefile(&path, "name").unwrap();
        assert_eq!(layer.crs.map(|crs| crs.label().to_string()).as_deref(), Some("EPSG:32650"));
    }

    #[test]
    fn unreadable_prj_leaves_the_crs_open() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_fixture(dir.path(), Some(r#"LOCAL_CS["arbitrary"]"#));
        assert!(read_shapefile(&path, "name").unwrap().crs.is_none());
    }

    #[test]
    fn groups_holes_with_preceding_outer_ring() {
        let polygon = shapefile::Polygon::with_rings(vec![
            PolygonRing::Outer(pts(&[(0.0, 0.0), (0.0, 4.0), (4.0, 4.0), (4.0, 0.0), (0.0, 0.0)])),
            PolygonRing::Inner(pts(&[(1.0, 1.0), (2.0, 1.0), (2.0, 2.0), (1.0, 2.0), (1.0, 1.0)])),
            PolygonRing::Outer(pts(&[(10.0, 0.0), (10.0, 1.0), (11.0, 1.0), (11.0, 0.0), (10.0, 0.0)])),
        ]);

        let shape = shp_to_geo(&polygon);
        assert_eq!(shape.0.len(), 2);
        assert_eq!(shape.0[0].interiors().len(), 1);
        assert!(shape.0[1].interiors().is_empty());
    }
}
