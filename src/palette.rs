//! Slope color ramp for gradient-mode routes.
//!
//! The break points are fixed at 0/10/20/30 percent; colors between them
//! are interpolated linearly per channel and clamped at both ends.

use serde::{Deserialize, Serialize};

/// An 8-bit RGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    /// `#rrggbb` form for the rendering surface.
    pub fn to_hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.0, self.1, self.2)
    }

    fn lerp(self, other: Rgb, t: f64) -> Rgb {
        let mix = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * t).round() as u8;
        Rgb(mix(self.0, other.0), mix(self.1, other.1), mix(self.2, other.2))
    }
}

/// Slope break points (percent) and their colors: flat green, yellow,
/// orange, red.
pub const SLOPE_STOPS: [(f64, Rgb); 4] = [
    (0.0, Rgb(0x22, 0xc5, 0x5e)),
    (10.0, Rgb(0xea, 0xb3, 0x08)),
    (20.0, Rgb(0xf9, 0x73, 0x16)),
    (30.0, Rgb(0xdc, 0x26, 0x26)),
];

/// Color for a slope in percent.
///
/// # Example
/// ```
/// use munro_map::palette::{slope_color, SLOPE_STOPS};
///
/// assert_eq!(slope_color(0.0), SLOPE_STOPS[0].1);
/// assert_eq!(slope_color(44.0), SLOPE_STOPS[3].1);
/// ```
pub fn slope_color(slope_percent: f64) -> Rgb {
    let (first_slope, first_color) = SLOPE_STOPS[0];
    if !(slope_percent > first_slope) {
        return first_color;
    }

    for window in SLOPE_STOPS.windows(2) {
        let (lo, lo_color) = window[0];
        let (hi, hi_color) = window[1];
        if slope_percent <= hi {
            return lo_color.lerp(hi_color, (slope_percent - lo) / (hi - lo));
        }
    }

    SLOPE_STOPS[SLOPE_STOPS.len() - 1].1
}
