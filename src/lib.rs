#![deny(missing_docs)]
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Anti-aliased escape-time fractal renderer
//!
//! An escape-time fractal takes a point on the complex plane, feeds it
//! into a recurrence over and over, and watches how long the result
//! takes to run off towards infinity.  Points that never leave are the
//! "inside" of the set; everything else is colored by how quickly it
//! left.
//!
//! Sampling each pixel once at its corner gives jagged, noisy edges,
//! because the interesting detail is much finer than a pixel.  This
//! renderer instead makes many passes over the image.  Each pass
//! samples every pixel at a slightly different position inside it,
//! chosen from a low-discrepancy sequence and scrambled per pixel, and
//! the final color of a pixel is the average, in linear light, of all
//! its samples.
//!
//! The pieces, leaves first:
//!
//! * `planes` maps (sub-)pixel coordinates to the complex plane.
//! * `sampling` decides where inside the pixel each pass samples.
//! * `fractal` holds the formulas and the escape loop.
//! * `color` turns escape results into linear-light colors.
//! * `render` runs the passes in parallel and averages the result.

extern crate crossbeam;
#[macro_use]
extern crate failure;
#[macro_use]
extern crate log;
extern crate num;
extern crate num_cpus;

#[cfg(test)]
extern crate itertools;
#[cfg(test)]
extern crate rand;

pub mod color;
pub mod complex;
pub mod error;
pub mod fractal;
pub mod params;
pub mod planes;
pub mod render;
pub mod sampling;

pub use color::{Color, ColorMapper, Gradient, Solid, StopGradient};
pub use complex::{Complex64, Power};
pub use error::RenderError;
pub use fractal::{escape, Escape, Formula, Fractal};
pub use params::{FractalParameters, ParamValue};
pub use planes::{PlaneMapper, RenderConfig, Skew};
pub use render::{Accumulator, Image, RenderState, Renderer};
pub use sampling::Jitter;
