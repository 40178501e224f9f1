// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Contains the PlaneMapper struct, which describes a relationship
//! between the image, a rectangle of (possibly fractional) pixel
//! coordinates with an origin at 0,0, and a window onto the complex
//! plane described by a center, a magnification, a rotation, a skew,
//! and a half-extent.

use complex::Complex64;
use error::RenderError;

/// A 2x2 matrix applied to the complex plane after rotation, treating
/// the real part as x and the imaginary part as y.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Skew(pub [[f64; 2]; 2]);

impl Skew {
    /// The matrix that changes nothing.
    pub fn identity() -> Self {
        Skew([[1.0, 0.0], [0.0, 1.0]])
    }

    /// Determinant; zero means the view collapses onto a line.
    pub fn determinant(&self) -> f64 {
        let m = &self.0;
        m[0][0] * m[1][1] - m[0][1] * m[1][0]
    }

    /// Apply the matrix to a point.
    #[inline]
    pub fn apply(&self, z: Complex64) -> Complex64 {
        let m = &self.0;
        Complex64::new(
            m[0][0] * z.re + m[0][1] * z.im,
            m[1][0] * z.re + m[1][1] * z.im,
        )
    }
}

impl Default for Skew {
    fn default() -> Self {
        Skew::identity()
    }
}

/// Everything that describes one render: the image size, the window
/// onto the complex plane, and how many anti-aliasing passes to take.
/// Created once and read by everyone; nothing changes it mid-render.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct RenderConfig {
    /// Image width in pixels.
    pub width: usize,
    /// Image height in pixels.
    pub height: usize,
    /// The point that lands in the middle of the image.
    pub center: Complex64,
    /// Zoom factor; 2 shows half as much of the plane as 1.
    pub magnification: f64,
    /// Counter-clockwise rotation of the view, in degrees.
    pub rotation: f64,
    /// Applied after rotation.
    pub skew: Skew,
    /// Half the height of the view at magnification 1.  The width
    /// follows from the aspect ratio.
    pub span: f64,
    /// Number of jittered samples per pixel.
    pub passes: u32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        RenderConfig {
            width: 800,
            height: 600,
            center: Complex64::new(-0.5, 0.0),
            magnification: 1.0,
            rotation: 0.0,
            skew: Skew::identity(),
            span: 1.5,
            passes: 64,
        }
    }
}

impl RenderConfig {
    /// Reject anything that would produce an empty image, divide by
    /// zero, or map every pixel to the same point.
    pub fn validate(&self) -> Result<(), RenderError> {
        if self.width == 0 || self.height == 0 {
            return Err(RenderError::InvalidDimensions {
                width: self.width,
                height: self.height,
            });
        }
        if self.passes == 0 {
            return Err(RenderError::InvalidPassCount);
        }
        if !(self.magnification.is_finite() && self.magnification > 0.0) {
            return Err(RenderError::InvalidView(format!(
                "magnification must be positive, got {}",
                self.magnification
            )));
        }
        if !(self.span.is_finite() && self.span > 0.0) {
            return Err(RenderError::InvalidView(format!(
                "span must be positive, got {}",
                self.span
            )));
        }
        if !(self.center.re.is_finite() && self.center.im.is_finite()) {
            return Err(RenderError::InvalidView(format!(
                "center must be finite, got {}",
                self.center
            )));
        }
        if !self.rotation.is_finite() {
            return Err(RenderError::InvalidView("rotation must be finite".to_string()));
        }
        let det = self.skew.determinant();
        if !det.is_finite() || det == 0.0 {
            return Err(RenderError::InvalidView(
                "skew matrix must be invertible".to_string(),
            ));
        }
        Ok(())
    }

    /// The number of pixels in the image.
    pub fn len(&self) -> usize {
        self.width * self.height
    }

    /// True when the image has no pixels.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Maps pixel coordinates onto the complex plane.  Everything that
/// can be is worked out once, up front, so the per-sample mapping is a
/// handful of multiplies.
#[derive(Copy, Clone, Debug)]
pub struct PlaneMapper {
    width: f64,
    height: f64,
    // The extent of the view on each axis before zoom.
    ranges: (f64, f64),
    // The rotation unit vector divided by the magnification.
    rotation: Complex64,
    skew: Skew,
    center: Complex64,
}

impl PlaneMapper {
    /// Constructor.  Fails for any configuration `validate` rejects.
    pub fn new(config: &RenderConfig) -> Result<PlaneMapper, RenderError> {
        config.validate()?;
        let width = config.width as f64;
        let height = config.height as f64;
        let aspect = width / height;
        let angle = config.rotation.to_radians();
        Ok(PlaneMapper {
            width,
            height,
            ranges: (2.0 * config.span * aspect, 2.0 * config.span),
            rotation: Complex64::new(angle.cos(), angle.sin()) * (1.0 / config.magnification),
            skew: config.skew,
            center: config.center,
        })
    }

    /// Given a (possibly fractional) pixel coordinate, return the point
    /// on the complex plane that it corresponds to.  Pure: the same
    /// inputs always give bit-identical outputs.
    #[inline]
    pub fn pixel_to_point(&self, x: f64, y: f64) -> Complex64 {
        let z = Complex64::new(
            (x / self.width - 0.5) * self.ranges.0,
            (y / self.height - 0.5) * self.ranges.1,
        );
        self.skew.apply(self.rotation * z) + self.center
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(size: usize, span: f64) -> RenderConfig {
        RenderConfig {
            width: size,
            height: size,
            center: Complex64::new(0.0, 0.0),
            span,
            passes: 1,
            ..RenderConfig::default()
        }
    }

    fn close(a: Complex64, b: Complex64) -> bool {
        (a - b).norm() < 1e-12
    }

    #[test]
    fn planemapper_fails_on_empty_image() {
        let mut config = square(4, 2.0);
        config.width = 0;
        assert_eq!(
            PlaneMapper::new(&config).err(),
            Some(RenderError::InvalidDimensions { width: 0, height: 4 })
        );
    }

    #[test]
    fn planemapper_fails_on_bad_view() {
        let mut config = square(4, 2.0);
        config.passes = 0;
        assert_eq!(PlaneMapper::new(&config).err(), Some(RenderError::InvalidPassCount));
        let mut config = square(4, 2.0);
        config.magnification = 0.0;
        assert!(PlaneMapper::new(&config).is_err());
        let mut config = square(4, 2.0);
        config.skew = Skew([[1.0, 2.0], [0.5, 1.0]]);
        assert!(PlaneMapper::new(&config).is_err());
    }

    #[test]
    fn center_pixel_maps_to_center() {
        let mut config = RenderConfig::default();
        config.center = Complex64::new(-0.75, 0.1);
        let pm = PlaneMapper::new(&config).unwrap();
        assert_eq!(pm.pixel_to_point(400.0, 300.0), config.center);
    }

    #[test]
    fn mapping_is_deterministic() {
        let mut config = RenderConfig::default();
        config.rotation = 33.0;
        config.skew = Skew([[1.0, 0.3], [-0.2, 0.9]]);
        config.magnification = 17.5;
        let pm = PlaneMapper::new(&config).unwrap();
        let a = pm.pixel_to_point(123.25, 77.625);
        let b = PlaneMapper::new(&config).unwrap().pixel_to_point(123.25, 77.625);
        assert_eq!(a.re.to_bits(), b.re.to_bits());
        assert_eq!(a.im.to_bits(), b.im.to_bits());
    }

    #[test]
    fn pixel_to_point_on_square_image() {
        let pm = PlaneMapper::new(&square(4, 2.0)).unwrap();
        assert_eq!(pm.pixel_to_point(0.0, 0.0), Complex64::new(-2.0, -2.0));
        assert_eq!(pm.pixel_to_point(2.0, 2.0), Complex64::new(0.0, 0.0));
        assert_eq!(pm.pixel_to_point(3.0, 1.0), Complex64::new(1.0, -1.0));
        assert_eq!(pm.pixel_to_point(4.0, 4.0), Complex64::new(2.0, 2.0));
    }

    #[test]
    fn aspect_ratio_widens_the_real_axis() {
        let mut config = square(4, 1.0);
        config.width = 8;
        let pm = PlaneMapper::new(&config).unwrap();
        assert_eq!(pm.pixel_to_point(0.0, 0.0), Complex64::new(-2.0, -1.0));
        assert_eq!(pm.pixel_to_point(8.0, 4.0), Complex64::new(2.0, 1.0));
    }

    #[test]
    fn magnification_shrinks_the_view() {
        let mut config = square(4, 2.0);
        config.magnification = 4.0;
        let pm = PlaneMapper::new(&config).unwrap();
        assert_eq!(pm.pixel_to_point(0.0, 0.0), Complex64::new(-0.5, -0.5));
    }

    #[test]
    fn rotation_turns_about_the_center() {
        let mut config = square(4, 2.0);
        config.rotation = 90.0;
        config.center = Complex64::new(1.0, 1.0);
        let pm = PlaneMapper::new(&config).unwrap();
        // (1, 0) from the center becomes (0, 1).
        assert!(close(pm.pixel_to_point(3.0, 2.0), Complex64::new(1.0, 2.0)));
    }

    #[test]
    fn skew_shears_after_rotation() {
        let mut config = square(4, 2.0);
        config.skew = Skew([[1.0, 1.0], [0.0, 1.0]]);
        let pm = PlaneMapper::new(&config).unwrap();
        assert!(close(pm.pixel_to_point(2.0, 3.0), Complex64::new(1.0, 1.0)));
    }
}
