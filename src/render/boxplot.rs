use anyhow::{bail, Result};
use plotters::{coord::{combinators::BindKeyPoints, Shift}, prelude::*};

use super::{Figure, FONT};
use crate::pipeline::{Panel, Period};

const WIDTH: u32 = 1000;
const HEIGHT: u32 = 600;
const BOX_COLOR: RGBColor = RGBColor(0x1f, 0x77, 0xb4);
const MEDIAN_COLOR: RGBColor = RGBColor(0x2c, 0xa0, 0x2c);
const HALF_BOX: f64 = 0.25;
const HALF_CAP: f64 = 0.12;

/// Five-number summary with Tukey whiskers.
#[derive(Debug, Clone, PartialEq)]
pub struct BoxStats {
    pub count: usize,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    /// Most extreme values within 1.5 IQR of the box.
    pub whisker_low: f64,
    pub whisker_high: f64,
    pub outliers: Vec<f64>,
}

impl BoxStats {
    /// Summarize the finite values, or `None` if there are none.
    pub fn from_values(values: &[f64]) -> Option<Self> {
        let mut sorted = values.iter().copied().filter(|v| v.is_finite()).collect::<Vec<_>>();
        if sorted.is_empty() { return None }
        sorted.sort_by(f64::total_cmp);

        let q1 = quantile(&sorted, 0.25);
        let median = quantile(&sorted, 0.5);
        let q3 = quantile(&sorted, 0.75);
        let reach = 1.5 * (q3 - q1);
        let (lo_fence, hi_fence) = (q1 - reach, q3 + reach);

        let whisker_low = sorted.iter().copied().find(|&v| v >= lo_fence).unwrap_or(q1);
        let whisker_high = sorted.iter().rev().copied().find(|&v| v <= hi_fence).unwrap_or(q3);
        let outliers = sorted.iter().copied().filter(|&v| v < lo_fence || v > hi_fence).collect();

        Some(Self { count: sorted.len(), q1, median, q3, whisker_low, whisker_high, outliers })
    }

    fn extent(&self) -> (f64, f64) {
        self.outliers.iter().fold((self.whisker_low, self.whisker_high), |(lo, hi), &v| (lo.min(v), hi.max(v)))
    }
}

/// Linear interpolation between closest ranks; `sorted` must be non-empty and ascending.
fn quantile(sorted: &[f64], p: f64) -> f64 {
    let pos = p * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
}

/// Distribution of panel values per period.
pub(crate) struct TrendFigure {
    groups: Vec<(Period, BoxStats)>,
    unit: String,
}

impl TrendFigure {
    pub(crate) fn new(panel: &Panel, unit: &str) -> Result<Self> {
        let groups = panel.periods().into_iter()
            .filter_map(|period| {
                let values = panel.values_for(&period).map(|record| record.value).collect::<Vec<_>>();
                BoxStats::from_values(&values).map(|stats| (period, stats))
            })
            .collect::<Vec<_>>();
        if groups.is_empty() {
            bail!("[render] {} panel has no values for a trend plot", panel.granularity());
        }
        Ok(Self { groups, unit: unit.to_string() })
    }

    #[inline] pub(crate) fn groups(&self) -> &[(Period, BoxStats)] { &self.groups }

    /// "2005-2020" from the first and last period, falling back to their labels.
    fn span(&self) -> String {
        let (Some((first, _)), Some((last, _))) = (self.groups.first(), self.groups.last()) else {
            return String::new();
        };
        match (first.years(), last.years()) {
            (Some((start, _)), Some((_, end))) => format!("{start}-{end}"),
            _ => format!("{first} to {last}"),
        }
    }

    /// Value axis covering every whisker and outlier, padded by 5%.
    fn value_range(&self) -> (f64, f64) {
        let (lo, hi) = self.groups.iter()
            .map(|(_, stats)| stats.extent())
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), (a, b)| (lo.min(a), hi.max(b)));
        let pad = if hi > lo { (hi - lo) * 0.05 } else { lo.abs().max(1.0) * 0.05 };
        (lo - pad, hi + pad)
    }

    /// Period label under the box at position `x`.
    fn label_at(&self, x: f64) -> String {
        let idx = x.round();
        if idx < 0.0 { return String::new() }
        self.groups.get(idx as usize).map(|(period, _)| period.label().to_string()).unwrap_or_default()
    }
}

impl Figure for TrendFigure {
    #[inline] fn size(&self) -> (u32, u32) { (WIDTH, HEIGHT) }

    fn draw<DB: DrawingBackend>(&self, root: &DrawingArea<DB, Shift>) -> Result<()>
    where
        DB::ErrorType: 'static,
    {
        let count = self.groups.len();
        let (lo, hi) = self.value_range();
        let positions = (0..count).map(|i| i as f64).collect::<Vec<_>>();

        let mut chart = ChartBuilder::on(root)
            .caption(format!("National Trend of UV Radiation ({})", self.span()), (FONT, 22))
            .margin(15)
            .x_label_area_size(50)
            .y_label_area_size(70)
            .build_cartesian_2d((-0.5..count as f64 - 0.5).with_key_points(positions), lo..hi)?;

        chart.configure_mesh()
            .disable_x_mesh()
            .x_desc("Time Period")
            .y_desc(format!("UV Value ({})", self.unit))
            .x_label_formatter(&|x| self.label_at(*x))
            .axis_desc_style((FONT, 15))
            .draw()?;

        for (i, (_, stats)) in self.groups.iter().enumerate() {
            let x = i as f64;
            let corners = [(x - HALF_BOX, stats.q3), (x + HALF_BOX, stats.q1)];
            chart.draw_series([
                Rectangle::new(corners, BOX_COLOR.mix(0.3).filled()),
                Rectangle::new(corners, BOX_COLOR.stroke_width(2)),
            ])?;

            let box_stroke = BOX_COLOR.stroke_width(2);
            chart.draw_series([
                PathElement::new(vec![(x, stats.q1), (x, stats.whisker_low)], box_stroke),
                PathElement::new(vec![(x, stats.q3), (x, stats.whisker_high)], box_stroke),
                PathElement::new(vec![(x - HALF_CAP, stats.whisker_low), (x + HALF_CAP, stats.whisker_low)], box_stroke),
                PathElement::new(vec![(x - HALF_CAP, stats.whisker_high), (x + HALF_CAP, stats.whisker_high)], box_stroke),
                PathElement::new(vec![(x - HALF_BOX, stats.median), (x + HALF_BOX, stats.median)], MEDIAN_COLOR.stroke_width(3)),
            ])?;

            chart.draw_series(stats.outliers.iter().map(|&v| Circle::new((x, v), 4, BLACK.stroke_width(1))))?;
        }
        Ok(())
    }
}
