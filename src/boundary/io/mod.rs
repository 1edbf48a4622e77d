//! Boundary file readers. Each returns the layer exactly as stored on disk.

mod geojson;
mod shape;

use std::{collections::BTreeSet, path::Path};

use anyhow::{bail, Result};
use geo::MultiPolygon;

use crate::{common, geom::Crs};

/// Polygons, names and declared CRS of a boundary file, before normalization.
#[derive(Debug, Default)]
pub(crate) struct RawLayer {
    pub(crate) names: Vec<Option<String>>,
    pub(crate) shapes: Vec<MultiPolygon<f64>>,
    /// Every attribute key seen on any feature.
    pub(crate) attributes: BTreeSet<String>,
    /// CRS declared by the file itself, if any.
    pub(crate) crs: Option<Crs>,
    /// Features dropped for having non-polygon geometry.
    pub(crate) skipped: usize,
}

impl RawLayer {
    pub(crate) fn push(&mut self, name: Option<String>, shape: MultiPolygon<f64>) {
        self.names.push(name);
        self.shapes.push(shape);
    }
}

/// Dispatch on file extension.
pub(crate) fn read_boundary_file(path: &Path, name_column: &str) -> Result<RawLayer> {
    match common::extension_of(path).as_str() {
        "json" | "geojson" => geojson::read_geojson(path, name_column),
        "shp" => shape::read_shapefile(path, name_column),
        other => bail!("[boundary::io] unsupported boundary file extension {other:?}: {}", path.display()),
    }
}
