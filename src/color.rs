// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Colors, and turning escape results into them.
//!
//! Gradients are authored in encoded (sRGB) space, because that's the
//! space people pick colors in.  Everything downstream of the gradient
//! (summing passes, dividing by the pass count) happens in linear
//! space, and the final average is encoded again on the way out.

use fractal::Escape;
use std::ops::{Add, AddAssign, Div, Mul};

/// An RGB triple.  Whether it's encoded or linear depends on where it
/// came from; the type doesn't track it.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Color {
    /// Red.
    pub r: f64,
    /// Green.
    pub g: f64,
    /// Blue.
    pub b: f64,
}

impl Color {
    /// Constructor.
    pub fn new(r: f64, g: f64, b: f64) -> Self {
        Color { r, g, b }
    }

    /// A gray.
    pub fn gray(v: f64) -> Self {
        Color { r: v, g: v, b: v }
    }

    /// Black, the default interior.
    pub fn black() -> Self {
        Color::gray(0.0)
    }

    /// Apply `f` to each channel.
    pub fn map<F: Fn(f64) -> f64>(self, f: F) -> Self {
        Color::new(f(self.r), f(self.g), f(self.b))
    }

    /// Linear interpolation; `t = 0` gives `self`.
    pub fn lerp(self, other: Color, t: f64) -> Self {
        self + (other + self * -1.0) * t
    }

    /// Decode every channel from sRGB into linear light.
    pub fn to_linear(self) -> Self {
        self.map(encoded_to_linear)
    }

    /// Encode every channel from linear light into sRGB.
    pub fn to_encoded(self) -> Self {
        self.map(linear_to_encoded)
    }

    /// Quantize to 8 bits per channel, clamping out-of-range values.
    pub fn to_rgb8(self) -> [u8; 3] {
        let q = |v: f64| (clamp_unit(v) * 255.0).round() as u8;
        [q(self.r), q(self.g), q(self.b)]
    }
}

impl Add for Color {
    type Output = Color;
    fn add(self, rhs: Color) -> Color {
        Color::new(self.r + rhs.r, self.g + rhs.g, self.b + rhs.b)
    }
}

impl AddAssign for Color {
    fn add_assign(&mut self, rhs: Color) {
        self.r += rhs.r;
        self.g += rhs.g;
        self.b += rhs.b;
    }
}

impl Mul<f64> for Color {
    type Output = Color;
    fn mul(self, rhs: f64) -> Color {
        Color::new(self.r * rhs, self.g * rhs, self.b * rhs)
    }
}

impl Div<f64> for Color {
    type Output = Color;
    fn div(self, rhs: f64) -> Color {
        Color::new(self.r / rhs, self.g / rhs, self.b / rhs)
    }
}

#[inline]
fn clamp_unit(x: f64) -> f64 {
    if x.is_nan() {
        0.0
    } else {
        x.max(0.0).min(1.0)
    }
}

/// sRGB decoding: a linear toe below 0.04045, a 2.4 power curve above.
/// Input is clamped to [0, 1].
pub fn encoded_to_linear(x: f64) -> f64 {
    let x = clamp_unit(x);
    if x <= 0.040_45 {
        x / 12.92
    } else {
        ((x + 0.055) / 1.055).powf(2.4)
    }
}

/// sRGB encoding, the inverse of `encoded_to_linear`.
pub fn linear_to_encoded(x: f64) -> f64 {
    let x = clamp_unit(x);
    if x <= 0.003_130_8 {
        x * 12.92
    } else {
        1.055 * x.powf(1.0 / 2.4) - 0.055
    }
}

/// Something that turns a real number into a color, in encoded space.
/// What range of inputs it was designed for is its own business.
pub trait Gradient: Sync {
    /// The color at `t`.
    fn color_at(&self, t: f64) -> Color;
}

impl<F> Gradient for F
where
    F: Fn(f64) -> Color + Sync,
{
    fn color_at(&self, t: f64) -> Color {
        self(t)
    }
}

/// The same color everywhere.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Solid(pub Color);

impl Gradient for Solid {
    fn color_at(&self, _t: f64) -> Color {
        self.0
    }
}

/// Piecewise-linear interpolation between color stops placed on
/// [0, 1], repeating every `period` units of input.
#[derive(Clone, Debug, PartialEq)]
pub struct StopGradient {
    stops: Vec<(f64, Color)>,
    period: f64,
}

/// Names accepted by `StopGradient::preset`.
pub const GRADIENT_NAMES: &[&str] = &["standard", "volcano", "glacier", "gray"];

impl StopGradient {
    /// Stops need not be sorted; positions are clamped to [0, 1].
    /// Returns `None` for an empty stop list or a non-positive period.
    pub fn new(stops: &[(f64, Color)], period: f64) -> Option<Self> {
        if stops.is_empty() || !(period.is_finite() && period > 0.0) {
            return None;
        }
        let mut stops: Vec<(f64, Color)> = stops
            .iter()
            .map(|&(pos, color)| (clamp_unit(pos), color))
            .collect();
        stops.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(::std::cmp::Ordering::Equal));
        Some(StopGradient { stops, period })
    }

    /// One of the built-in gradients.
    pub fn preset(name: &str) -> Option<Self> {
        let hex = |v: u32| {
            Color::new(
                f64::from((v >> 16) & 0xff) / 255.0,
                f64::from((v >> 8) & 0xff) / 255.0,
                f64::from(v & 0xff) / 255.0,
            )
        };
        let stops: Vec<(f64, Color)> = match name {
            "standard" => vec![
                (0.0, hex(0x00_07_64)),
                (0.16, hex(0x20_6b_cb)),
                (0.42, hex(0xed_ff_ff)),
                (0.6425, hex(0xff_aa_00)),
                (0.8575, hex(0x00_02_00)),
                (1.0, hex(0x00_07_64)),
            ],
            "volcano" => vec![
                (0.0, hex(0x1a_05_02)),
                (0.25, hex(0x9c_1c_05)),
                (0.5, hex(0xf2_8c_28)),
                (0.7, hex(0xd8_ec_f2)),
                (0.85, hex(0x3a_6e_8f)),
                (1.0, hex(0x1a_05_02)),
            ],
            "glacier" => vec![
                (0.0, hex(0x02_0c_1f)),
                (0.3, hex(0x1d_5a_8c)),
                (0.6, hex(0xa8_dc_f0)),
                (0.8, hex(0xff_ff_ff)),
                (1.0, hex(0x02_0c_1f)),
            ],
            "gray" => vec![(0.0, Color::black()), (0.5, Color::gray(1.0)), (1.0, Color::black())],
            _ => return None,
        };
        StopGradient::new(&stops, 1.0)
    }
}

impl Gradient for StopGradient {
    fn color_at(&self, t: f64) -> Color {
        if !t.is_finite() {
            return self.stops[0].1;
        }
        let u = t / self.period;
        let u = u - u.floor();
        let first = self.stops[0];
        if u <= first.0 {
            return first.1;
        }
        for w in self.stops.windows(2) {
            let (a, b) = (w[0], w[1]);
            if u <= b.0 {
                let span = b.0 - a.0;
                if span <= 0.0 {
                    return b.1;
                }
                return a.1.lerp(b.1, (u - a.0) / span);
            }
        }
        self.stops[self.stops.len() - 1].1
    }
}

/// The default compression of the iteration count: the square root
/// tames the long tail near the set's boundary.
pub fn sqrt_scale(iterations: u32) -> f64 {
    0.1 * f64::from(iterations).sqrt()
}

/// Turns escape results into linear-light colors.
pub struct ColorMapper<G> {
    gradient: G,
    interior: Color,
    scale: fn(u32) -> f64,
}

impl<G: Gradient> ColorMapper<G> {
    /// Black interior, square-root scaling.
    pub fn new(gradient: G) -> Self {
        ColorMapper {
            gradient,
            interior: Color::black(),
            scale: sqrt_scale,
        }
    }

    /// Color for points that never escape, given in encoded space.
    pub fn with_interior(mut self, interior: Color) -> Self {
        self.interior = interior.to_linear();
        self
    }

    /// Replace the iteration-count remapping.  It should be monotonic.
    pub fn with_scale(mut self, scale: fn(u32) -> f64) -> Self {
        self.scale = scale;
        self
    }

    /// The linear-light color for one sample.
    #[inline]
    pub fn color_for(&self, escape: &Escape) -> Color {
        if escape.bailed_out {
            self.gradient
                .color_at((self.scale)(escape.iterations))
                .to_linear()
        } else {
            self.interior
        }
    }
}
