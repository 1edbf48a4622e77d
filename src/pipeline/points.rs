use std::path::Path;

use anyhow::{bail, Result};
use geo::Point;
use polars::{frame::DataFrame, prelude::{Column, DataType}};
use tracing::debug;

use super::Period;
use crate::{config::ColumnMapping, io};

/// Canonical column names of a point table after renaming.
pub(crate) const VALUE: &str = "UV_Value";
pub(crate) const LON: &str = "lon";
pub(crate) const LAT: &str = "lat";
pub(crate) const PERIOD: &str = "year";

/// One raw observation of a period file.
#[derive(Debug, Clone, PartialEq)]
pub struct MeasurementPoint {
    pub lon: f64,
    pub lat: f64,
    pub value: f64,
    pub period: Period,
}

impl MeasurementPoint {
    #[inline] pub fn point(&self) -> Point<f64> { Point::new(self.lon, self.lat) }
}

/// Load one period's measurement table.
///
/// Points take the file's own period column when it has one, otherwise `label`.
/// Rows with a missing coordinate or value are dropped.
pub fn load_period_points(path: &Path, label: &str, columns: &ColumnMapping) -> Result<Vec<MeasurementPoint>> {
    let df = io::csv::read_csv_with_text_columns(path, &[])?;
    let df = normalize_columns(df, columns)?;
    let points = points_from_dataframe(&df, label)?;

    let dropped = df.height() - points.len();
    if dropped > 0 {
        debug!("[points] dropped {dropped} row(s) with missing coordinates or values from {}", path.display());
    }
    for point in points.iter().take(5) {
        debug!("[points]   {:>9.4} {:>8.4} {:>10.4} {}", point.lon, point.lat, point.value, point.period);
    }
    Ok(points)
}

/// Rename configured source columns to the canonical schema and check the required ones exist.
pub(crate) fn normalize_columns(mut df: DataFrame, columns: &ColumnMapping) -> Result<DataFrame> {
    let renames = [
        (columns.value.as_str(), VALUE),
        (columns.longitude.as_str(), LON),
        (columns.latitude.as_str(), LAT),
        (columns.period.as_str(), PERIOD),
    ];
    for (source, canonical) in renames {
        if source != canonical && has_column(&df, source) && !has_column(&df, canonical) {
            df.rename(source, canonical.into())?;
        }
    }

    let missing = [VALUE, LON, LAT].into_iter()
        .filter(|name| !has_column(&df, name))
        .collect::<Vec<_>>();
    if !missing.is_empty() {
        let found = df.get_column_names().iter().map(|name| name.to_string()).collect::<Vec<_>>();
        bail!("[points] missing column(s) {missing:?} after renaming; found {found:?}");
    }
    Ok(df)
}

fn has_column(df: &DataFrame, name: &str) -> bool {
    df.get_column_names().iter().any(|column| column.as_str() == name)
}

/// Build points from a normalized table.
pub(crate) fn points_from_dataframe(df: &DataFrame, label: &str) -> Result<Vec<MeasurementPoint>> {
    fn as_f64(df: &DataFrame, name: &str) -> Result<Column> {
        Ok(df.column(name)?.cast(&DataType::Float64)?)
    }

    let lon = as_f64(df, LON)?;
    let lat = as_f64(df, LAT)?;
    let value = as_f64(df, VALUE)?;
    let period = match df.column(PERIOD) {
        Ok(column) => Some(column.cast(&DataType::String)?),
        Err(_) => None,
    };
    let periods = period.as_ref().map(|column| column.str()).transpose()?;

    let fallback = Period::new(label);
    let mut current = fallback.clone();

    let mut points = Vec::with_capacity(df.height());
    let rows = lon.f64()?.into_iter()
        .zip(lat.f64()?.into_iter())
        .zip(value.f64()?.into_iter())
        .enumerate();
    for (i, ((lon, lat), value)) in rows {
        let (Some(lon), Some(lat), Some(value)) = (lon, lat, value) else { continue };
        if !(lon.is_finite() && lat.is_finite() && value.is_finite()) { continue }

        let period = match periods.and_then(|p| p.get(i)).map(str::trim).filter(|p| !p.is_empty()) {
            Some(p) if p == current.label() => current.clone(),
            Some(p) => {
                current = Period::new(p);
                current.clone()
            }
            None => fallback.clone(),
        };
        points.push(MeasurementPoint { lon, lat, value, period });
    }
    Ok(points)
}
