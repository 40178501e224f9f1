// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Escape-time formulas.
//!
//! A formula is three steps: set up the first iterate from the
//! sample's coordinate (`start`), advance one step (`iterate`), and
//! decide whether the orbit has left (`bailout_check`).  The loop that
//! strings those together lives in `escape` and is the same for every
//! formula.
//!
//! Formulas are small `Copy` values.  Some of them (the Manowar) carry
//! state from one step to the next, so every sample works on its own
//! copy and nothing is ever shared between pixels.

use complex::{abs_parts, is_finite, Complex64, Power};
use error::RenderError;
use params::{FractalParameters, ParamValue};

/// What every formula has to provide.
pub trait Formula {
    /// Reset any per-orbit state and return the first iterate.
    fn start(&mut self, z0: Complex64) -> Complex64 {
        z0
    }

    /// One step of the recurrence.
    fn iterate(&mut self, z: Complex64, z0: Complex64) -> Complex64;

    /// True once the orbit counts as escaped.
    fn bailout_check(&self, z: Complex64, iteration: u32) -> bool;

    /// The iteration budget.
    fn max_iterations(&self) -> u32;
}

/// The outcome of running one orbit.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Escape {
    /// Steps taken.
    pub iterations: u32,
    /// Whether `bailout_check` (or a non-finite iterate) stopped it.
    pub bailed_out: bool,
    /// The iterate stopped being a finite number.
    pub anomaly: bool,
    /// The formula's budget, kept so the result can be read on its own.
    pub max_iterations: u32,
}

impl Escape {
    /// True if the orbit ran out its whole budget.  For most formulas
    /// this is the same as not bailing out; the grid bails out on the
    /// last step for points on a line, so the two differ there.
    pub fn exhausted(&self) -> bool {
        self.iterations >= self.max_iterations
    }
}

/// Run `formula` from `z0` until it bails out or runs out of
/// iterations.
pub fn escape<F: Formula>(formula: &mut F, z0: Complex64) -> Escape {
    let max_iterations = formula.max_iterations();
    let mut z = formula.start(z0);
    let mut iterations = 0;
    let mut bailed_out = false;
    while !bailed_out && iterations < max_iterations {
        z = formula.iterate(z, z0);
        iterations += 1;
        if !is_finite(z) {
            return Escape {
                iterations,
                bailed_out: true,
                anomaly: true,
                max_iterations,
            };
        }
        bailed_out = formula.bailout_check(z, iterations);
    }
    Escape {
        iterations,
        bailed_out,
        anomaly: false,
        max_iterations,
    }
}

const MAX_ITER: &str = "maxIter";
const EXPONENT: &str = "exponent";
const BAILOUT: &str = "bailout";
const SEED: &str = "seed";
const GRID_WIDTH: &str = "GridWidth";
const GRID_X: &str = "GridX";
const GRID_Y: &str = "GridY";

fn max_iterations(params: &FractalParameters, default: u32) -> Result<u32, RenderError> {
    match params.integer(MAX_ITER)? {
        None => Ok(default),
        Some(n) if n >= 1 && n <= i64::from(u32::max_value()) => Ok(n as u32),
        Some(n) => Err(RenderError::InvalidParameter {
            name: MAX_ITER.to_string(),
            reason: format!("must be at least 1, got {}", n),
        }),
    }
}

fn exponent(params: &FractalParameters, default: Power) -> Result<Power, RenderError> {
    match params.real(EXPONENT)? {
        None => Ok(default),
        Some(x) if x.is_finite() => Ok(Power::from_real(x)),
        Some(x) => Err(RenderError::InvalidParameter {
            name: EXPONENT.to_string(),
            reason: format!("must be a finite number, got {}", x),
        }),
    }
}

fn power_value(power: Power) -> ParamValue {
    match power {
        Power::Integer(n) => ParamValue::Integer(i64::from(n)),
        Power::Real(x) => ParamValue::Real(x),
    }
}

fn positive(params: &FractalParameters, name: &str, default: f64) -> Result<f64, RenderError> {
    match params.real(name)? {
        None => Ok(default),
        Some(x) if x.is_finite() && x > 0.0 => Ok(x),
        Some(x) => Err(RenderError::InvalidParameter {
            name: name.to_string(),
            reason: format!("must be a positive number, got {}", x),
        }),
    }
}

// The default seed only makes sense for the quadratic set; any other
// exponent has to name its own.
fn seed(
    fractal: &str,
    params: &FractalParameters,
    d: &Julia,
    power: Power,
) -> Result<Complex64, RenderError> {
    let seed = if power == d.exponent {
        params.complex(SEED)?.unwrap_or(d.seed)
    } else {
        params.require_complex(fractal, SEED)?
    };
    if is_finite(seed) {
        Ok(seed)
    } else {
        Err(RenderError::InvalidParameter {
            name: SEED.to_string(),
            reason: format!("must be finite, got {}", seed),
        })
    }
}

/// `z -> z^e + z0`.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Mandelbrot {
    /// Iteration budget.
    pub max_iter: u32,
    /// Power in the recurrence.
    pub exponent: Power,
    /// Escape radius, squared.
    pub bailout: f64,
}

impl Default for Mandelbrot {
    fn default() -> Self {
        Mandelbrot {
            max_iter: 250,
            exponent: Power::Integer(2),
            bailout: 128.0,
        }
    }
}

impl Mandelbrot {
    /// Keys this formula reads.
    pub const KEYS: &'static [&'static str] = &[MAX_ITER, EXPONENT, BAILOUT];

    /// Build from a parameter bag, defaulting whatever is absent.
    pub fn from_parameters(params: &FractalParameters) -> Result<Self, RenderError> {
        let d = Mandelbrot::default();
        Ok(Mandelbrot {
            max_iter: max_iterations(params, d.max_iter)?,
            exponent: exponent(params, d.exponent)?,
            bailout: positive(params, BAILOUT, d.bailout)?,
        })
    }
}

impl Formula for Mandelbrot {
    #[inline]
    fn iterate(&mut self, z: Complex64, z0: Complex64) -> Complex64 {
        self.exponent.apply(z) + z0
    }

    #[inline]
    fn bailout_check(&self, z: Complex64, _iteration: u32) -> bool {
        z.norm_sqr() >= self.bailout
    }

    fn max_iterations(&self) -> u32 {
        self.max_iter
    }
}

/// `z -> z^e + seed`, with the sample's coordinate only as the
/// starting point.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Julia {
    /// Iteration budget.
    pub max_iter: u32,
    /// Power in the recurrence.
    pub exponent: Power,
    /// Escape radius, squared.
    pub bailout: f64,
    /// The constant added on every step.
    pub seed: Complex64,
}

impl Default for Julia {
    fn default() -> Self {
        Julia {
            max_iter: 2500,
            exponent: Power::Integer(2),
            bailout: 128.0,
            seed: Complex64::new(-0.4, 0.6),
        }
    }
}

impl Julia {
    /// Keys this formula reads.
    pub const KEYS: &'static [&'static str] = &[MAX_ITER, EXPONENT, BAILOUT, SEED];

    /// Build from a parameter bag, defaulting whatever is absent.  A
    /// non-default exponent requires an explicit seed.
    pub fn from_parameters(params: &FractalParameters) -> Result<Self, RenderError> {
        Julia::build("JuliaSet", params)
    }

    fn build(fractal: &str, params: &FractalParameters) -> Result<Self, RenderError> {
        let d = Julia::default();
        let power = exponent(params, d.exponent)?;
        Ok(Julia {
            max_iter: max_iterations(params, d.max_iter)?,
            exponent: power,
            bailout: positive(params, BAILOUT, d.bailout)?,
            seed: seed(fractal, params, &d, power)?,
        })
    }
}

impl Formula for Julia {
    #[inline]
    fn iterate(&mut self, z: Complex64, _z0: Complex64) -> Complex64 {
        self.exponent.apply(z) + self.seed
    }

    #[inline]
    fn bailout_check(&self, z: Complex64, _iteration: u32) -> bool {
        z.norm_sqr() >= self.bailout
    }

    fn max_iterations(&self) -> u32 {
        self.max_iter
    }
}

/// The Mandelbrot recurrence with both components folded positive
/// before the power.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct BurningShip(pub Mandelbrot);

impl Formula for BurningShip {
    #[inline]
    fn iterate(&mut self, z: Complex64, z0: Complex64) -> Complex64 {
        self.0.exponent.apply(abs_parts(z)) + z0
    }

    #[inline]
    fn bailout_check(&self, z: Complex64, iteration: u32) -> bool {
        self.0.bailout_check(z, iteration)
    }

    fn max_iterations(&self) -> u32 {
        self.0.max_iter
    }
}

/// The Julia counterpart of the burning ship.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct BurningShipJulia(pub Julia);

impl Formula for BurningShipJulia {
    #[inline]
    fn iterate(&mut self, z: Complex64, _z0: Complex64) -> Complex64 {
        self.0.exponent.apply(abs_parts(z)) + self.0.seed
    }

    #[inline]
    fn bailout_check(&self, z: Complex64, iteration: u32) -> bool {
        self.0.bailout_check(z, iteration)
    }

    fn max_iterations(&self) -> u32 {
        self.0.max_iter
    }
}

/// `z -> z^e + z1 + z0`, where `z1` is the previous iterate.  The only
/// formula here with memory between steps.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Manowar {
    /// Settings shared with the Mandelbrot.
    pub settings: Mandelbrot,
    previous: Complex64,
}

impl Manowar {
    /// Wrap a set of Mandelbrot settings.
    pub fn new(settings: Mandelbrot) -> Self {
        Manowar {
            settings,
            previous: Complex64::new(0.0, 0.0),
        }
    }
}

impl Formula for Manowar {
    fn start(&mut self, z0: Complex64) -> Complex64 {
        self.previous = z0;
        z0
    }

    #[inline]
    fn iterate(&mut self, z: Complex64, z0: Complex64) -> Complex64 {
        let next = self.settings.exponent.apply(z) + self.previous + z0;
        self.previous = z;
        next
    }

    #[inline]
    fn bailout_check(&self, z: Complex64, iteration: u32) -> bool {
        self.settings.bailout_check(z, iteration)
    }

    fn max_iterations(&self) -> u32 {
        self.settings.max_iter
    }
}

/// Not a fractal at all: draws grid lines.  The recurrence does
/// nothing; the bailout test asks whether the point lies within
/// `width` of a grid line.  Points off the lines escape on the first
/// step; points on a line run out the (small) budget.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Grid {
    /// Iteration budget.  Anything above 1 distinguishes line points
    /// from background.
    pub max_iter: u32,
    /// Line thickness, in plane units.
    pub width: f64,
    /// Distance between vertical lines.
    pub spacing_x: f64,
    /// Distance between horizontal lines.
    pub spacing_y: f64,
}

impl Default for Grid {
    fn default() -> Self {
        Grid {
            max_iter: 2,
            width: 0.02,
            spacing_x: 0.2,
            spacing_y: 0.2,
        }
    }
}

impl Grid {
    /// Keys this formula reads.
    pub const KEYS: &'static [&'static str] = &[MAX_ITER, GRID_WIDTH, GRID_X, GRID_Y];

    /// Build from a parameter bag, defaulting whatever is absent.
    pub fn from_parameters(params: &FractalParameters) -> Result<Self, RenderError> {
        let d = Grid::default();
        Ok(Grid {
            max_iter: max_iterations(params, d.max_iter)?,
            width: positive(params, GRID_WIDTH, d.width)?,
            spacing_x: positive(params, GRID_X, d.spacing_x)?,
            spacing_y: positive(params, GRID_Y, d.spacing_y)?,
        })
    }

    /// True if `z` lies on a line.
    pub fn on_line(&self, z: Complex64) -> bool {
        let dx = wrap_to_range(z.re, self.spacing_x);
        let dy = wrap_to_range(z.im, self.spacing_y);
        dx.min(dy) < self.width
    }
}

// x modulo y, always non-negative for positive y.
#[inline]
fn wrap_to_range(x: f64, y: f64) -> f64 {
    x - y * (x / y).floor()
}

impl Formula for Grid {
    #[inline]
    fn iterate(&mut self, z: Complex64, _z0: Complex64) -> Complex64 {
        z
    }

    #[inline]
    fn bailout_check(&self, z: Complex64, iteration: u32) -> bool {
        !(self.on_line(z) && iteration < self.max_iter)
    }

    fn max_iterations(&self) -> u32 {
        self.max_iter
    }
}

/// Every formula this crate knows, chosen at configuration time.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Fractal {
    /// See [`Mandelbrot`].
    Mandelbrot(Mandelbrot),
    /// See [`Julia`].
    Julia(Julia),
    /// See [`BurningShip`].
    BurningShip(BurningShip),
    /// See [`BurningShipJulia`].
    BurningShipJulia(BurningShipJulia),
    /// See [`Manowar`].
    Manowar(Manowar),
    /// See [`Grid`].
    Grid(Grid),
}

/// Names accepted by `Fractal::from_name`.
pub const FRACTAL_NAMES: &[&str] = &[
    "MandelbrotSet",
    "JuliaSet",
    "BurningShip",
    "BurningShipJulia",
    "Manowar",
    "Grid",
];

impl Fractal {
    /// Look a formula up by name (case-insensitively) and configure it
    /// from the bag.  Keys the formula doesn't read are rejected.
    pub fn from_name(name: &str, params: &FractalParameters) -> Result<Fractal, RenderError> {
        let canonical = FRACTAL_NAMES
            .iter()
            .find(|n| n.eq_ignore_ascii_case(name))
            .ok_or_else(|| RenderError::UnknownFractal(name.to_string()))?;
        let fractal = match *canonical {
            "MandelbrotSet" => {
                params.check_known(canonical, Mandelbrot::KEYS)?;
                Fractal::Mandelbrot(Mandelbrot::from_parameters(params)?)
            }
            "JuliaSet" => {
                params.check_known(canonical, Julia::KEYS)?;
                Fractal::Julia(Julia::from_parameters(params)?)
            }
            "BurningShip" => {
                params.check_known(canonical, Mandelbrot::KEYS)?;
                Fractal::BurningShip(BurningShip(Mandelbrot::from_parameters(params)?))
            }
            "BurningShipJulia" => {
                params.check_known(canonical, Julia::KEYS)?;
                Fractal::BurningShipJulia(BurningShipJulia(Julia::build(canonical, params)?))
            }
            "Manowar" => {
                params.check_known(canonical, Mandelbrot::KEYS)?;
                Fractal::Manowar(Manowar::new(Mandelbrot::from_parameters(params)?))
            }
            _ => {
                params.check_known(canonical, Grid::KEYS)?;
                Fractal::Grid(Grid::from_parameters(params)?)
            }
        };
        debug!("{} configured with {:?}", canonical, fractal.parameters());
        Ok(fractal)
    }

    /// The canonical name of this formula.
    pub fn name(&self) -> &'static str {
        match *self {
            Fractal::Mandelbrot(_) => "MandelbrotSet",
            Fractal::Julia(_) => "JuliaSet",
            Fractal::BurningShip(_) => "BurningShip",
            Fractal::BurningShipJulia(_) => "BurningShipJulia",
            Fractal::Manowar(_) => "Manowar",
            Fractal::Grid(_) => "Grid",
        }
    }

    /// The effective settings, defaults included, as a bag.
    pub fn parameters(&self) -> FractalParameters {
        let mandelbrot = |m: &Mandelbrot| {
            FractalParameters::new()
                .with(MAX_ITER, ParamValue::Integer(i64::from(m.max_iter)))
                .with(EXPONENT, power_value(m.exponent))
                .with(BAILOUT, ParamValue::Real(m.bailout))
        };
        let julia = |j: &Julia| {
            FractalParameters::new()
                .with(MAX_ITER, ParamValue::Integer(i64::from(j.max_iter)))
                .with(EXPONENT, power_value(j.exponent))
                .with(BAILOUT, ParamValue::Real(j.bailout))
                .with(SEED, ParamValue::Complex(j.seed))
        };
        match *self {
            Fractal::Mandelbrot(ref m) => mandelbrot(m),
            Fractal::BurningShip(BurningShip(ref m)) => mandelbrot(m),
            Fractal::Manowar(ref m) => mandelbrot(&m.settings),
            Fractal::Julia(ref j) => julia(j),
            Fractal::BurningShipJulia(BurningShipJulia(ref j)) => julia(j),
            Fractal::Grid(ref g) => FractalParameters::new()
                .with(MAX_ITER, ParamValue::Integer(i64::from(g.max_iter)))
                .with(GRID_WIDTH, ParamValue::Real(g.width))
                .with(GRID_X, ParamValue::Real(g.spacing_x))
                .with(GRID_Y, ParamValue::Real(g.spacing_y)),
        }
    }
}

impl Formula for Fractal {
    #[inline]
    fn start(&mut self, z0: Complex64) -> Complex64 {
        match *self {
            Fractal::Mandelbrot(ref mut f) => f.start(z0),
            Fractal::Julia(ref mut f) => f.start(z0),
            Fractal::BurningShip(ref mut f) => f.start(z0),
            Fractal::BurningShipJulia(ref mut f) => f.start(z0),
            Fractal::Manowar(ref mut f) => f.start(z0),
            Fractal::Grid(ref mut f) => f.start(z0),
        }
    }

    #[inline]
    fn iterate(&mut self, z: Complex64, z0: Complex64) -> Complex64 {
        match *self {
            Fractal::Mandelbrot(ref mut f) => f.iterate(z, z0),
            Fractal::Julia(ref mut f) => f.iterate(z, z0),
            Fractal::BurningShip(ref mut f) => f.iterate(z, z0),
            Fractal::BurningShipJulia(ref mut f) => f.iterate(z, z0),
            Fractal::Manowar(ref mut f) => f.iterate(z, z0),
            Fractal::Grid(ref mut f) => f.iterate(z, z0),
        }
    }

    #[inline]
    fn bailout_check(&self, z: Complex64, iteration: u32) -> bool {
        match *self {
            Fractal::Mandelbrot(ref f) => f.bailout_check(z, iteration),
            Fractal::Julia(ref f) => f.bailout_check(z, iteration),
            Fractal::BurningShip(ref f) => f.bailout_check(z, iteration),
            Fractal::BurningShipJulia(ref f) => f.bailout_check(z, iteration),
            Fractal::Manowar(ref f) => f.bailout_check(z, iteration),
            Fractal::Grid(ref f) => f.bailout_check(z, iteration),
        }
    }

    fn max_iterations(&self) -> u32 {
        match *self {
            Fractal::Mandelbrot(ref f) => f.max_iterations(),
            Fractal::Julia(ref f) => f.max_iterations(),
            Fractal::BurningShip(ref f) => f.max_iterations(),
            Fractal::BurningShipJulia(ref f) => f.max_iterations(),
            Fractal::Manowar(ref f) => f.max_iterations(),
            Fractal::Grid(ref f) => f.max_iterations(),
        }
    }
}
