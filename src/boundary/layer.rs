use std::{collections::HashSet, sync::Arc};

use ahash::AHashMap;
use anyhow::{Context, Result};
use geo::{MultiPolygon, Point, Rect};
use tracing::{info, warn};

use super::{granularity::Granularity, io::{self, RawLayer}};
use crate::{
    common,
    config::BoundaryConfig,
    error::PipelineError,
    geom::{Crs, Geometries, Reprojector},
};

/// One administrative boundary layer, normalized to the target CRS.
///
/// Loaded once per stage and shared read-only across every period.
#[derive(Debug, Clone)]
pub struct BoundaryLayer {
    granularity: Granularity,
    names: Vec<Option<Arc<str>>>, // Region name per polygon; the join key for both stages.
    geoms: Geometries,
    source_crs: Crs,
}

impl BoundaryLayer {
    /// Load a boundary file, validate its names and reproject it to `target` if needed.
    /// Every failure here is fatal to the run.
    pub fn load(granularity: Granularity, config: &BoundaryConfig, target: &Crs) -> Result<Self> {
        let path = &config.path;
        common::require_file_exists(path)
            .with_context(|| format!("[boundary] {granularity} boundary file is missing"))?;

        info!("[boundary] loading {granularity} layer from {}", path.display());
        let raw = io::read_boundary_file(path, &config.name_column)?;

        let source = match &config.crs {
            Some(crs) => Crs::parse(crs)?,
            None => raw.crs.clone().unwrap_or_else(Crs::wgs84),
        };

        let layer = Self::from_raw(
            granularity,
            raw,
            source,
            target,
            &config.name_column,
            config.allow_duplicate_names,
        ).with_context(|| format!("[boundary] failed to prepare {}", path.display()))?;

        info!("[boundary] loaded {} {granularity} polygons ({})", layer.len(), layer.source_crs);
        Ok(layer)
    }

    /// Build a layer from named polygons that are already in `crs`, reprojecting to `target`.
    pub fn from_polygons(
        granularity: Granularity,
        features: Vec<(Option<String>, MultiPolygon<f64>)>,
        crs: Crs,
        target: &Crs,
    ) -> Result<Self> {
        let mut raw = RawLayer::default();
        raw.attributes.insert("name".to_string());
        for (name, shape) in features {
            raw.push(name, shape);
        }
        Self::from_raw(granularity, raw, crs, target, "name", false)
    }

    fn from_raw(
        granularity: Granularity,
        raw: RawLayer,
        source: Crs,
        target: &Crs,
        name_column: &str,
        allow_duplicate_names: bool,
    ) -> Result<Self> {
        let layer_label = format!("{granularity} layer");

        if !raw.attributes.contains(name_column) {
            return Err(PipelineError::MissingRegionColumn {
                layer: layer_label,
                column: name_column.to_string(),
                available: raw.attributes.into_iter().collect(),
            }.into());
        }

        let mut seen = HashSet::new();
        for name in raw.names.iter().flatten() {
            if !seen.insert(name.as_str()) {
                if !allow_duplicate_names {
                    return Err(PipelineError::DuplicateRegionName {
                        layer: layer_label,
                        name: name.clone(),
                    }.into());
                }
                warn!("[boundary] duplicate region name {name:?} in {layer_label}; rows will merge by name");
            }
        }

        let unnamed = raw.names.iter().filter(|name| name.is_none()).count();
        if unnamed > 0 {
            warn!("[boundary] {unnamed} polygon(s) in the {layer_label} have no {name_column:?}; they never receive points");
        }
        if raw.skipped > 0 {
            warn!("[boundary] {} non-polygon feature(s) skipped in the {layer_label}", raw.skipped);
        }

        let shapes = if source.same_as(target) {
            raw.shapes
        } else {
            info!("[boundary] reprojecting {layer_label} from {source} to {target}");
            let reprojector = Reprojector::new(&source, target)?;
            raw.shapes.iter()
                .map(|shape| reprojector.multipolygon(shape))
                .collect::<Result<Vec<_>>>()?
        };

        Ok(Self {
            granularity,
            names: raw.names.into_iter().map(|name| name.map(Arc::from)).collect(),
            geoms: Geometries::new(shapes),
            source_crs: source,
        })
    }

    #[inline] pub fn granularity(&self) -> Granularity { self.granularity }

    /// Number of polygons, named or not.
    #[inline] pub fn len(&self) -> usize { self.geoms.len() }

    #[inline] pub fn is_empty(&self) -> bool { self.geoms.len() == 0 }

    /// CRS the file was stored in before normalization.
    #[inline] pub fn source_crs(&self) -> &Crs { &self.source_crs }

    /// Region name of polygon `idx`, if it has one.
    #[inline]
    pub fn name(&self, idx: usize) -> Option<&Arc<str>> {
        self.names.get(idx).and_then(|name| name.as_ref())
    }

    /// Polygons in the target CRS.
    #[inline] pub fn shapes(&self) -> &[MultiPolygon<f64>] { self.geoms.shapes() }

    /// Bounding rectangle of the whole layer.
    #[inline] pub fn bounds(&self) -> Option<Rect<f64>> { self.geoms.bounds() }

    /// Indices of named polygons whose interior contains `point` (lon/lat in the target CRS).
    pub fn locate(&self, point: &Point<f64>) -> Vec<usize> {
        self.geoms.containing(point).into_iter()
            .filter(|&idx| self.names[idx].is_some())
            .collect()
    }

    /// Map from region name to the polygon indices carrying it.
    pub(crate) fn name_index(&self) -> AHashMap<&str, Vec<usize>> {
        let mut index: AHashMap<&str, Vec<usize>> = AHashMap::with_capacity(self.names.len());
        for (idx, name) in self.names.iter().enumerate() {
            if let Some(name) = name {
                index.entry(name.as_ref()).or_default().push(idx);
            }
        }
        index
    }
}
