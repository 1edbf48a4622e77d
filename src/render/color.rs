//! Color mapping utilities for figures.

use plotters::style::RGBColor;

/// Fill for values that cannot be mapped.
pub(crate) const MISSING: RGBColor = hex(0x969696);

const fn hex(value: u32) -> RGBColor {
    RGBColor((value >> 16) as u8, (value >> 8) as u8, value as u8)
}

fn lerp(a: RGBColor, b: RGBColor, t: f64) -> RGBColor {
    let mix = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * t).round().clamp(0.0, 255.0) as u8;
    RGBColor(mix(a.0, b.0), mix(a.1, b.1), mix(a.2, b.2))
}

/// ColorBrewer "Spectral", red end first.
const SPECTRAL: [RGBColor; 11] = [
    hex(0x9e0142),
    hex(0xd53e4f),
    hex(0xf46d43),
    hex(0xfdae61),
    hex(0xfee08b),
    hex(0xffffbf),
    hex(0xe6f598),
    hex(0xabdda4),
    hex(0x66c2a5),
    hex(0x3288bd),
    hex(0x5e4fa2),
];

/// Reversed Spectral ramp for t in [0.0, 1.0]: blue at 0, red at 1.
pub(crate) fn spectral_r(t: f64) -> RGBColor {
    if !t.is_finite() { return MISSING }

    let pos = (1.0 - t.clamp(0.0, 1.0)) * (SPECTRAL.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = (lo + 1).min(SPECTRAL.len() - 1);
    lerp(SPECTRAL[lo], SPECTRAL[hi], pos - lo as f64)
}

/// Linear map from a fixed value range onto the color ramp.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct ColorScale {
    pub(crate) min: f64,
    pub(crate) max: f64,
}

impl ColorScale {
    pub(crate) fn new(min: f64, max: f64) -> Self { Self { min, max } }

    /// Position of `value` in the range; a flat range maps everything to the middle.
    pub(crate) fn normalize(&self, value: f64) -> f64 {
        let span = self.max - self.min;
        if span > 0.0 { ((value - self.min) / span).clamp(0.0, 1.0) } else { 0.5 }
    }

    pub(crate) fn color(&self, value: f64) -> RGBColor {
        if !value.is_finite() { return MISSING }
        spectral_r(self.normalize(value))
    }

    /// Axis range for a legend; a flat range is widened so it can be drawn.
    pub(crate) fn axis_range(&self) -> (f64, f64) {
        if self.max > self.min {
            (self.min, self.max)
        } else {
            let pad = (self.min.abs() * 0.05).max(0.5);
            (self.min - pad, self.max + pad)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ramp_endpoints() {
        assert_eq!(spectral_r(0.0), hex(0x5e4fa2));
        assert_eq!(spectral_r(1.0), hex(0x9e0142));
        assert_eq!(spectral_r(0.5), hex(0xffffbf));
        assert_eq!(spectral_r(f64::NAN), MISSING);
    }

    #[test]
    fn scale_clamps_and_handles_flat_range() {
        let scale = ColorScale::new(10.0, 20.0);
        assert_eq!(scale.normalize(15.0), 0.5);
        assert_eq!(scale.normalize(-5.0), 0.0);
        assert_eq!(scale.color(25.0), spectral_r(1.0));
        assert_eq!(scale.axis_range(), (10.0, 20.0));

        let flat = ColorScale::new(3.0, 3.0);
        assert_eq!(flat.normalize(3.0), 0.5);
        assert_eq!(flat.axis_range(), (2.5, 3.5));
    }
}
