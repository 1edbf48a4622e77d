use std::sync::Arc;

use tracing::debug;

use super::{MeasurementPoint, Period};
use crate::boundary::BoundaryLayer;

/// A measurement tagged with the region whose interior contains it.
#[derive(Debug, Clone, PartialEq)]
pub struct AttributedPoint {
    pub region: Arc<str>,
    pub period: Period,
    pub value: f64,
}

/// Spatially join points to a boundary layer using strict containment.
///
/// Points on a polygon edge or outside every named polygon are dropped. A point inside
/// several overlapping polygons yields one row per containing polygon.
pub fn attribute(points: &[MeasurementPoint], layer: &BoundaryLayer) -> Vec<AttributedPoint> {
    let mut attributed = Vec::with_capacity(points.len());
    let mut unmatched = 0usize;

    for point in points {
        let hits = layer.locate(&point.point());
        if hits.is_empty() {
            unmatched += 1;
            continue;
        }
        for idx in hits {
            let Some(region) = layer.name(idx) else { continue };
            attributed.push(AttributedPoint {
                region: region.clone(),
                period: point.period.clone(),
                value: point.value,
            });
        }
    }

    debug!(
        "[attribute] {} layer: {} point(s) joined to {} row(s), {unmatched} outside every region",
        layer.granularity(), points.len() - unmatched, attributed.len(),
    );
    attributed
}

#[cfg(test)]
mod tests {
    use geo::{polygon, MultiPolygon};

    use super::*;
    use crate::{boundary::Granularity, geom::Crs};

    fn square(x0: f64, y0: f64, size: f64) -> MultiPolygon<f64> {
        MultiPolygon(vec![polygon![
            (x: x0, y: y0),
            (x: x0 + size, y: y0),
            (x: x0 + size, y: y0 + size),
            (x: x0, y: y0 + size),
            (x: x0, y: y0),
        ]])
    }

    fn point(lon: f64, lat: f64, value: f64) -> MeasurementPoint {
        MeasurementPoint { lon, lat, value, period: Period::new("2005-2008") }
    }

    fn layer(features: Vec<(Option<String>, MultiPolygon<f64>)>) -> BoundaryLayer {
        BoundaryLayer::from_polygons(Granularity::City, features, Crs::wgs84(), &Crs::wgs84()).unwrap()
    }

    #[test]
    fn strict_containment() {
        let layer = layer(vec![(Some("北京市".into()), square(116.0, 39.5, 1.0))]);
        let points = [
            point(116.4, 39.9, 0.2),  // inside
            point(117.0, 39.9, 0.3),  // on the east edge
            point(120.0, 30.0, 0.4),  // outside
        ];
        let attributed = attribute(&points, &layer);
        assert_eq!(attributed.len(), 1);
        assert_eq!(attributed[0].region.as_ref(), "北京市");
        assert_eq!(attributed[0].value, 0.2);
    }

    #[test]
    fn overlapping_regions_each_receive_the_point() {
        let layer = layer(vec![
            (Some("a".into()), square(0.0, 0.0, 2.0)),
            (Some("b".into()), square(1.0, 1.0, 2.0)),
        ]);
        let attributed = attribute(&[point(1.5, 1.5, 1.0)], &layer);
        let regions = attributed.iter().map(|p| p.region.as_ref()).collect::<Vec<_>>();
        assert_eq!(regions, ["a", "b"]);
    }

    #[test]
    fn empty_input() {
        let layer = layer(vec![(Some("a".into()), square(0.0, 0.0, 1.0))]);
        assert!(attribute(&[], &layer).is_empty());
    }
}
