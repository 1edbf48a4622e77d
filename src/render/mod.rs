//! Stage B: panels back onto polygons, then figures.

mod boxplot;
mod choropleth;
mod color;

use std::{ops::Range, path::{Path, PathBuf}};

use anyhow::{Context, Result};
use geo::Rect;
use plotters::{coord::Shift, prelude::*};
use tracing::info;

pub use boxplot::BoxStats;
use boxplot::TrendFigure;
use choropleth::ChoroplethFigure;

use crate::{
    boundary::{BoundaryLayer, Granularity},
    common,
    config::Config,
    pipeline::Panel,
};

const FONT: &str = "sans-serif";

/// A figure that can be drawn onto any plotters backend.
pub(crate) trait Figure {
    /// Pixel size of the whole figure.
    fn size(&self) -> (u32, u32);

    fn draw<DB: DrawingBackend>(&self, root: &DrawingArea<DB, Shift>) -> Result<()>
    where
        DB::ErrorType: 'static;
}

/// Lon/lat ranges centered on `bounds` whose shape matches a `width` x `height` pixel area.
/// Latitude is stretched by 1/cos(mid-latitude).
pub(crate) fn fit_geographic(bounds: Rect<f64>, (width, height): (u32, u32)) -> (Range<f64>, Range<f64>) {
    let mid_lat = (bounds.min().y + bounds.max().y) / 2.0;
    let aspect = 1.0 / mid_lat.to_radians().cos().max(0.1);

    let (w, h) = (width.max(1) as f64, height.max(1) as f64);
    let (lon_span, lat_span) = (bounds.width().max(1e-9), bounds.height().max(1e-9));
    let scale = (w / lon_span).min(h / (lat_span * aspect)); // pixels per degree of longitude

    let (half_lon, half_lat) = (w / scale / 2.0, h / (scale * aspect) / 2.0);
    let center = bounds.center();
    (center.x - half_lon..center.x + half_lon, center.y - half_lat..center.y + half_lat)
}

/// Files written by the rendering stage.
#[derive(Debug, Clone, Default)]
pub struct RenderOutput {
    files: Vec<PathBuf>,
}

impl RenderOutput {
    pub fn files(&self) -> impl Iterator<Item = &Path> {
        self.files.iter().map(PathBuf::as_path)
    }
}

/// Read both panels back from disk and draw the two choropleth grids and the trend plot.
pub fn run_rendering(config: &Config) -> Result<RenderOutput> {
    config.validate()?;
    let target = config.target_crs()?;
    common::ensure_dir_exists(&config.output_dir)?;

    let city = read_panel(config, Granularity::City, &config.outputs.city_panel)?;
    let province = read_panel(config, Granularity::Province, &config.outputs.province_panel)?;

    let city_layer = BoundaryLayer::load(Granularity::City, &config.boundaries.city, &target)?;
    let province_layer = BoundaryLayer::load(Granularity::Province, &config.boundaries.province, &target)?;

    let mut output = RenderOutput::default();
    for (layer, panel, name) in [
        (&city_layer, &city, &config.outputs.city_map),
        (&province_layer, &province, &config.outputs.province_map),
    ] {
        let figure = ChoroplethFigure::new(layer, panel, &config.render)?;
        output.files.extend(write_figure(config, name, &figure)?);
    }

    let trend = TrendFigure::new(&city, &config.render.unit)?;
    info!("[render] trend plot over {} period(s)", trend.groups().len());
    output.files.extend(write_figure(config, &config.outputs.trend, &trend)?);

    Ok(output)
}

fn read_panel(config: &Config, granularity: Granularity, name: &str) -> Result<Panel> {
    let path = config.output_path(name);
    common::require_file_exists(&path)
        .with_context(|| format!("[render] {granularity} panel is missing; run the aggregate step first"))?;
    let panel = Panel::read_csv(granularity, &path)?;
    info!("[render] read {} {granularity} rows from {}", panel.len(), path.display());
    Ok(panel)
}

/// Draw one figure twice: vector SVG, then raster PNG.
fn write_figure(config: &Config, name: &str, figure: &impl Figure) -> Result<[PathBuf; 2]> {
    let size = figure.size();

    let svg_path = config.output_path(&format!("{name}.svg"));
    present(&SVGBackend::new(&svg_path, size).into_drawing_area(), figure)
        .with_context(|| format!("[render] failed to draw {}", svg_path.display()))?;

    let png_path = config.output_path(&format!("{name}.png"));
    present(&BitMapBackend::new(&png_path, size).into_drawing_area(), figure)
        .with_context(|| format!("[render] failed to draw {}", png_path.display()))?;

    Ok([svg_path, png_path])
}

fn present<DB: DrawingBackend>(root: &DrawingArea<DB, Shift>, figure: &impl Figure) -> Result<()>
where
    DB::ErrorType: 'static,
{
    root.fill(&WHITE)?;
    figure.draw(root)?;
    root.present()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use geo::{coord, Rect};

    use super::fit_geographic;

    fn close(a: f64, b: f64) -> bool { (a - b).abs() < 1e-9 }

    #[test]
    fn fit_pads_the_narrow_axis() {
        let bounds = Rect::new(coord! { x: -1.0, y: -1.0 }, coord! { x: 1.0, y: 1.0 });
        let (x, y) = fit_geographic(bounds, (200, 100));
        assert!(close(x.start, -2.0) && close(x.end, 2.0));
        assert!(close(y.start, -1.0) && close(y.end, 1.0));
    }

    #[test]
    fn high_latitudes_are_stretched() {
        let bounds = Rect::new(coord! { x: 0.0, y: 59.0 }, coord! { x: 2.0, y: 61.0 });
        let (x, y) = fit_geographic(bounds, (1000, 1000));
        // cos(60°) = 0.5: one degree of latitude takes twice the pixels of one degree of longitude.
        assert!(close(y.end - y.start, 2.0));
        assert!(close(x.end - x.start, 4.0));
    }
}
