mod bbox;
mod crs;
mod geom;

use bbox::BoundingBox;
pub use crs::Crs;
pub(crate) use crs::Reprojector;
pub(crate) use geom::Geometries;
