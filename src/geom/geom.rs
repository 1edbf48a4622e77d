use geo::{BoundingRect, Contains, Coord, MultiPolygon, Point, Rect};
use rstar::{RTree, AABB};

use crate::geom::BoundingBox;

/// Geometries holds the polygons of one boundary layer plus an R-tree over their bounding boxes.
#[derive(Debug, Clone)]
pub(crate) struct Geometries {
    shapes: Vec<MultiPolygon<f64>>,
    rtree: RTree<BoundingBox>,
}

impl Geometries {
    /// Construct a Geometries object from a vector of MultiPolygons.
    /// Empty shapes keep their index but never enter the R-tree.
    pub(crate) fn new(shapes: Vec<MultiPolygon<f64>>) -> Self {
        Self {
            rtree: RTree::bulk_load(
                shapes.iter().enumerate()
                    .filter_map(|(i, shape)| shape.bounding_rect().map(|rect| BoundingBox::new(i, rect)))
                    .collect()
            ),
            shapes,
        }
    }

    /// Get the number of MultiPolygons.
    #[inline] pub(crate) fn len(&self) -> usize { self.shapes.len() }

    /// Get a reference to the list of MultiPolygons.
    #[inline] pub(crate) fn shapes(&self) -> &[MultiPolygon<f64>] { &self.shapes }

    /// Indices of all shapes whose interior contains `point`, in ascending order.
    /// Points on a shape's boundary are not contained.
    pub(crate) fn containing(&self, point: &Point<f64>) -> Vec<usize> {
        let envelope = AABB::from_point([point.x(), point.y()]);
        let mut hits = self.rtree.locate_in_envelope_intersecting(&envelope)
            .map(|bbox| bbox.idx())
            .filter(|&idx| self.shapes[idx].contains(point))
            .collect::<Vec<_>>();
        hits.sort_unstable();
        hits
    }

    /// Compute the bounding rectangle of all MultiPolygons.
    pub(crate) fn bounds(&self) -> Option<Rect<f64>> {
        self.shapes.iter()
            .filter_map(|polygon| polygon.bounding_rect())
            .reduce(|a, b| Rect::new(
                Coord {
                    x: a.min().x.min(b.min().x),
                    y: a.min().y.min(b.min().y),
                },
                Coord {
                    x: a.max().x.max(b.max().x),
                    y: a.max().y.max(b.max().y),
                }
            ))
    }
}

#[cfg(test)]
mod tests {
    use geo::{polygon, MultiPolygon, Point};

    use super::Geometries;

    fn square(x0: f64, y0: f64, size: f64) -> MultiPolygon<f64> {
        MultiPolygon(vec![polygon![
            (x: x0, y: y0),
            (x: x0 + size, y: y0),
            (x: x0 + size, y: y0 + size),
            (x: x0, y: y0 + size),
            (x: x0, y: y0),
        ]])
    }

    #[test]
    fn containing_finds_the_right_square() {
        let geoms = Geometries::new(vec![square(0.0, 0.0, 1.0), square(1.0, 0.0, 1.0)]);
        assert_eq!(geoms.containing(&Point::new(0.5, 0.5)), vec![0]);
        assert_eq!(geoms.containing(&Point::new(1.5, 0.5)), vec![1]);
        assert!(geoms.containing(&Point::new(5.0, 5.0)).is_empty());
    }

    #[test]
    fn shared_edge_is_not_contained() {
        let geoms = Geometries::new(vec![square(0.0, 0.0, 1.0), square(1.0, 0.0, 1.0)]);
        assert!(geoms.containing(&Point::new(1.0, 0.5)).is_empty());
    }

    #[test]
    fn overlapping_shapes_all_match() {
        let geoms = Geometries::new(vec![square(0.0, 0.0, 2.0), square(1.0, 1.0, 2.0)]);
        assert_eq!(geoms.containing(&Point::new(1.5, 1.5)), vec![0, 1]);
    }

    #[test]
    fn empty_shape_is_skipped() {
        let geoms = Geometries::new(vec![MultiPolygon(vec![]), square(0.0, 0.0, 1.0)]);
        assert_eq!(geoms.len(), 2);
        assert_eq!(geoms.containing(&Point::new(0.5, 0.5)), vec![1]);
        let bounds = geoms.bounds().unwrap();
        assert_eq!(bounds.min().x, 0.0);
        assert_eq!(bounds.max().y, 1.0);
    }
}
