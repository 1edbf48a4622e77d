use anyhow::{bail, Result};
use geo::{Area, LineString, MultiPolygon};
use plotters::{coord::Shift, prelude::*};
use tracing::{info, warn};

use super::{
    color::{spectral_r, ColorScale},
    fit_geographic, Figure, FONT,
};
use crate::{
    boundary::BoundaryLayer,
    config::RenderConfig,
    pipeline::{Panel, Period},
};

const LEGEND_BAND: i32 = 130;
const PADDING: i32 = 10;
const GRADIENT_STEPS: usize = 96;

/// A small-multiple grid: one choropleth per period sharing one color scale.
pub(crate) struct ChoroplethFigure<'a> {
    layer: &'a BoundaryLayer,
    render: &'a RenderConfig,
    scale: ColorScale,
    cells: Vec<(Period, Vec<(usize, f64)>)>, // Polygon values per drawn period
}

impl<'a> ChoroplethFigure<'a> {
    /// Join panel rows onto polygons by region name; the color range spans the whole panel.
    pub(crate) fn new(layer: &'a BoundaryLayer, panel: &Panel, render: &'a RenderConfig) -> Result<Self> {
        let granularity = layer.granularity();
        let Some((min, max)) = panel.value_range() else {
            bail!("[render] {granularity} panel has no rows to draw");
        };
        info!("[render] {granularity} value range min={min:.4} max={max:.4}");

        let index = layer.name_index();
        let mut unmatched = panel.records().iter()
            .filter(|record| !index.contains_key(record.region.as_ref()))
            .map(|record| record.region.as_ref())
            .collect::<Vec<_>>();
        unmatched.dedup();
        if !unmatched.is_empty() {
            warn!(
                "[render] {} {granularity} region(s) in the panel have no polygon, e.g. {:?}",
                unmatched.len(),
                &unmatched[..unmatched.len().min(5)],
            );
        }

        let mut periods = panel.periods();
        let capacity = render.rows * render.cols;
        if periods.len() > capacity {
            let dropped = periods.split_off(capacity);
            warn!(
                "[render] {} period(s) do not fit the {}x{} grid and are not drawn: {}",
                dropped.len(), render.rows, render.cols,
                dropped.iter().map(Period::label).collect::<Vec<_>>().join(", "),
            );
        }

        let cells = periods.into_iter()
            .map(|period| {
                let values = panel.values_for(&period)
                    .flat_map(|record| {
                        let polygons = index.get(record.region.as_ref()).map(Vec::as_slice).unwrap_or_default();
                        polygons.iter().map(move |&idx| (idx, record.value))
                    })
                    .collect::<Vec<_>>();
                (period, values)
            })
            .collect();

        Ok(Self { layer, render, scale: ColorScale::new(min, max), cells })
    }

    fn draw_cell<DB: DrawingBackend>(
        &self,
        area: &DrawingArea<DB, Shift>,
        period: &Period,
        values: &[(usize, f64)],
    ) -> Result<()>
    where
        DB::ErrorType: 'static,
    {
        let (width, _) = area.dim_in_pixel();
        let (map_area, legend_area) = area.split_horizontally(width as i32 - LEGEND_BAND);

        let title = format!("{}-Level Mean UV Radiation: {period}", self.layer.granularity().title());
        let map_area = map_area.titled(&title, (FONT, 18))?;
        self.draw_regions(&map_area.margin(PADDING, PADDING, PADDING, PADDING), values)?;
        self.draw_colorbar(&legend_area)
    }

    /// Fill every region with its value's color, then outline them.
    fn draw_regions<DB: DrawingBackend>(&self, area: &DrawingArea<DB, Shift>, values: &[(usize, f64)]) -> Result<()>
    where
        DB::ErrorType: 'static,
    {
        let Some(bounds) = self.layer.bounds() else {
            bail!("[render] {} layer has no geometry to draw", self.layer.granularity());
        };
        let (x_range, y_range) = fit_geographic(bounds, area.dim_in_pixel());
        let mut chart = ChartBuilder::on(area).build_cartesian_2d(x_range, y_range)?;

        let pieces = paint_order(self.layer.shapes(), values, &self.scale);
        for &(polygon, color) in &pieces {
            chart.draw_series(std::iter::once(Polygon::new(ring_points(polygon.exterior()), color.filled())))?;
            // holes go back to the background; anything inside them is smaller and drawn later
            chart.draw_series(polygon.interiors().iter().map(|hole| Polygon::new(ring_points(hole), WHITE.filled())))?;
        }

        if let Some(edge) = edge_style(self.render.edge_width) {
            for &(polygon, _) in &pieces {
                let rings = std::iter::once(polygon.exterior()).chain(polygon.interiors());
                chart.draw_series(rings.map(|ring| PathElement::new(ring_points(ring), edge)))?;
            }
        }
        Ok(())
    }

    /// Vertical legend in the right band, 60% of the cell height.
    fn draw_colorbar<DB: DrawingBackend>(&self, area: &DrawingArea<DB, Shift>) -> Result<()>
    where
        DB::ErrorType: 'static,
    {
        let (_, height) = area.dim_in_pixel();
        let band = (height as f64 * 0.2) as i32;
        let bar_area = area.margin(band, band, 6, 0);

        let (lo, hi) = self.scale.axis_range();
        let mut chart = ChartBuilder::on(&bar_area)
            .right_y_label_area_size(90)
            .build_cartesian_2d(0f64..1f64, lo..hi)?;
        chart.configure_mesh()
            .disable_mesh()
            .disable_x_axis()
            .y_labels(6)
            .y_desc(format!("UV Irradiance ({})", self.render.unit))
            .label_style((FONT, 12))
            .axis_desc_style((FONT, 13))
            .draw()?;

        let step = (hi - lo) / GRADIENT_STEPS as f64;
        chart.draw_series((0..GRADIENT_STEPS).map(|i| {
            let from = lo + step * i as f64;
            let t = (i as f64 + 0.5) / GRADIENT_STEPS as f64;
            Rectangle::new([(0.0, from), (1.0, from + step)], spectral_r(t).filled())
        }))?;
        chart.draw_series(std::iter::once(Rectangle::new([(0.0, lo), (1.0, hi)], BLACK.stroke_width(1))))?;
        Ok(())
    }
}

impl Figure for ChoroplethFigure<'_> {
    fn size(&self) -> (u32, u32) {
        (
            self.render.cell_width * self.render.cols as u32,
            self.render.cell_height * self.render.rows as u32,
        )
    }

    fn draw<DB: DrawingBackend>(&self, root: &DrawingArea<DB, Shift>) -> Result<()>
    where
        DB::ErrorType: 'static,
    {
        let areas = root.split_evenly((self.render.rows, self.render.cols));
        for (area, (period, values)) in areas.iter().zip(&self.cells) {
            self.draw_cell(area, period, values)?;
        }
        Ok(())
    }
}

/// Region polygons with their fill, largest exterior first, so an enclave lands on top of the
/// region around it.
fn paint_order<'s>(
    shapes: &'s [MultiPolygon<f64>],
    values: &[(usize, f64)],
    scale: &ColorScale,
) -> Vec<(&'s geo::Polygon<f64>, RGBColor)> {
    let mut pieces = values.iter()
        .flat_map(|&(idx, value)| shapes[idx].0.iter().map(move |polygon| (polygon, scale.color(value))))
        .map(|(polygon, color)| (exterior_area(polygon), polygon, color))
        .collect::<Vec<_>>();
    pieces.sort_by(|a, b| b.0.total_cmp(&a.0));
    pieces.into_iter().map(|(_, polygon, color)| (polygon, color)).collect()
}

fn exterior_area(polygon: &geo::Polygon<f64>) -> f64 {
    geo::Polygon::new(polygon.exterior().clone(), vec![]).unsigned_area()
}

fn ring_points(ring: &LineString<f64>) -> Vec<(f64, f64)> {
    ring.coords().map(|c| (c.x, c.y)).collect()
}

/// Edge stroke for a width in pixels. A sub-pixel width becomes a 1 px line at that opacity.
fn edge_style(width: f64) -> Option<ShapeStyle> {
    if width.is_nan() || width <= 0.0 {
        return None;
    }
    Some(if width < 1.0 {
        BLACK.mix(width).stroke_width(1)
    } else {
        BLACK.stroke_width(width.round() as u32)
    })
}
