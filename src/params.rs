// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The named parameter bag.  This is how formula settings arrive from
//! the outside world (the command line, mostly); each formula reads
//! what it needs out of the bag exactly once, at construction, and
//! keeps its own strongly-typed copy.

use complex::Complex64;
use error::RenderError;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// One typed value in the bag.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum ParamValue {
    /// A whole number, e.g. `maxIter`.
    Integer(i64),
    /// A real number, e.g. `bailout`.
    Real(f64),
    /// A point on the complex plane, e.g. `seed`.
    Complex(Complex64),
}

impl ParamValue {
    /// The name of the variant, for error messages.
    pub fn kind(&self) -> &'static str {
        match *self {
            ParamValue::Integer(_) => "an integer",
            ParamValue::Real(_) => "a real number",
            ParamValue::Complex(_) => "a complex number",
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            ParamValue::Integer(i) => write!(f, "{}", i),
            ParamValue::Real(x) => write!(f, "{}", x),
            ParamValue::Complex(z) => write!(f, "{},{}", z.re, z.im),
        }
    }
}

/// Integers parse as `Integer`, anything else numeric as `Real`, and a
/// comma-separated pair as `Complex`.
impl FromStr for ParamValue {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Some(index) = s.find(',') {
            let re = f64::from_str(s[..index].trim());
            let im = f64::from_str(s[index + 1..].trim());
            return match (re, im) {
                (Ok(re), Ok(im)) => Ok(ParamValue::Complex(Complex64::new(re, im))),
                _ => Err(format!("could not parse \"{}\" as a complex number", s)),
            };
        }
        if let Ok(i) = i64::from_str(s) {
            return Ok(ParamValue::Integer(i));
        }
        f64::from_str(s)
            .map(ParamValue::Real)
            .map_err(|_| format!("could not parse \"{}\" as a number", s))
    }
}

/// Split a `name=value` assignment, as given on the command line.
pub fn parse_assignment(s: &str) -> Result<(String, ParamValue), String> {
    match s.find('=') {
        None => Err(format!("expected name=value, got \"{}\"", s)),
        Some(index) => {
            let name = s[..index].trim();
            if name.is_empty() {
                return Err(format!("missing parameter name in \"{}\"", s));
            }
            let value = ParamValue::from_str(&s[index + 1..])?;
            Ok((name.to_string(), value))
        }
    }
}

/// A bag of typed values addressed by name.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FractalParameters {
    values: BTreeMap<String, ParamValue>,
}

impl FractalParameters {
    /// An empty bag; every formula falls back to its defaults.
    pub fn new() -> Self {
        FractalParameters::default()
    }

    /// Store a value, replacing any previous one of the same name.
    pub fn set<S: Into<String>>(&mut self, name: S, value: ParamValue) -> &mut Self {
        self.values.insert(name.into(), value);
        self
    }

    /// Builder-style `set`.
    pub fn with<S: Into<String>>(mut self, name: S, value: ParamValue) -> Self {
        self.set(name, value);
        self
    }

    /// The raw value, if present.
    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.values.get(name)
    }

    /// Names in the bag, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(|k| k.as_str())
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// True when nothing has been set.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Reject any key not in `known`.  Formulas call this so that a
    /// misspelt key is an error rather than a silently ignored default.
    pub fn check_known(&self, fractal: &str, known: &[&str]) -> Result<(), RenderError> {
        match self.names().find(|name| !known.contains(name)) {
            Some(name) => Err(RenderError::UnknownParameter {
                fractal: fractal.to_string(),
                name: name.to_string(),
            }),
            None => Ok(()),
        }
    }

    /// An integer, if present.
    pub fn integer(&self, name: &str) -> Result<Option<i64>, RenderError> {
        match self.get(name) {
            None => Ok(None),
            Some(&ParamValue::Integer(i)) => Ok(Some(i)),
            Some(other) => Err(wrong_type(name, "an integer", other)),
        }
    }

    /// A real, if present.  Integers are promoted.
    pub fn real(&self, name: &str) -> Result<Option<f64>, RenderError> {
        match self.get(name) {
            None => Ok(None),
            Some(&ParamValue::Integer(i)) => Ok(Some(i as f64)),
            Some(&ParamValue::Real(x)) => Ok(Some(x)),
            Some(other) => Err(wrong_type(name, "a real number", other)),
        }
    }

    /// A complex number, if present.  Integers and reals are promoted
    /// onto the real axis.
    pub fn complex(&self, name: &str) -> Result<Option<Complex64>, RenderError> {
        match self.get(name) {
            None => Ok(None),
            Some(&ParamValue::Integer(i)) => Ok(Some(Complex64::new(i as f64, 0.0))),
            Some(&ParamValue::Real(x)) => Ok(Some(Complex64::new(x, 0.0))),
            Some(&ParamValue::Complex(z)) => Ok(Some(z)),
        }
    }

    /// A complex number that must be present.
    pub fn require_complex(&self, fractal: &str, name: &str) -> Result<Complex64, RenderError> {
        self.complex(name)?.ok_or_else(|| missing(fractal, name))
    }
}

fn wrong_type(name: &str, expected: &'static str, found: &ParamValue) -> RenderError {
    RenderError::WrongParameterType {
        name: name.to_string(),
        expected,
        found: found.kind(),
    }
}

fn missing(fractal: &str, name: &str) -> RenderError {
    RenderError::MissingParameter {
        fractal: fractal.to_string(),
        name: name.to_string(),
    }
}
