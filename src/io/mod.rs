//! IO module for format-specific reading and writing operations.
//!
//! - `csv` - CSV format for measurement tables and panels
//!
//! Note: boundary files (GeoJSON, shapefile) are read in boundary/io since
//! they produce boundary-specific structures. Figures are written through
//! plotters backends in render.

pub(crate) mod csv;
