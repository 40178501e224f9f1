// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Everything that can go wrong between reading a configuration and
//! handing back a finished image.  All of it is detected before the
//! first pass starts, except cancellation, a panicking worker and asking
//! a finished accumulator for another pass.

/// The library's error type.
#[derive(Debug, Fail, PartialEq)]
pub enum RenderError {
    /// A formula needs a parameter that has no default and was not
    /// supplied.
    #[fail(display = "{} requires the parameter \"{}\"", fractal, name)]
    MissingParameter {
        /// The formula being constructed.
        fractal: String,
        /// The missing key.
        name: String,
    },

    /// A parameter was supplied with a type that cannot be promoted to
    /// the one the formula wants.
    #[fail(display = "parameter \"{}\" must be {}, not {}", name, expected, found)]
    WrongParameterType {
        /// The offending key.
        name: String,
        /// What the formula asked for.
        expected: &'static str,
        /// What was in the bag.
        found: &'static str,
    },

    /// A parameter has the right type but an unusable value.
    #[fail(display = "parameter \"{}\" is invalid: {}", name, reason)]
    InvalidParameter {
        /// The offending key.
        name: String,
        /// Why it was rejected.
        reason: String,
    },

    /// A parameter was supplied that the formula does not know about.
    #[fail(display = "{} has no parameter named \"{}\"", fractal, name)]
    UnknownParameter {
        /// The formula being constructed.
        fractal: String,
        /// The unrecognised key.
        name: String,
    },

    /// No formula goes by this name.
    #[fail(display = "unknown fractal \"{}\"", _0)]
    UnknownFractal(String),

    /// The image has no pixels.
    #[fail(display = "image dimensions must be positive, got {}x{}", width, height)]
    InvalidDimensions {
        /// Requested width.
        width: usize,
        /// Requested height.
        height: usize,
    },

    /// Zero passes were requested.
    #[fail(display = "pass count must be at least 1")]
    InvalidPassCount,

    /// The view (zoom, span, skew, center) cannot be mapped.
    #[fail(display = "invalid view: {}", _0)]
    InvalidView(String),

    /// The caller raised the cancellation flag.
    #[fail(display = "render cancelled after {} of {} passes", completed, total)]
    Cancelled {
        /// Passes that finished before the flag was seen.
        completed: u32,
        /// Passes requested.
        total: u32,
    },

    /// Another pass was asked of an accumulator that already has them
    /// all.
    #[fail(display = "all {} passes have already run", _0)]
    AllPassesRun(u32),

    /// A worker thread panicked mid-pass.  The partial sums are
    /// discarded.
    #[fail(display = "a render worker panicked during pass {}", _0)]
    WorkerPanicked(u32),
}
