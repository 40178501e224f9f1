// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The handful of complex-number operations the formulas need on top
//! of `num::Complex`.  The arithmetic itself is `num`'s; what lives
//! here are the powers, which the formulas call once per iteration and
//! so are written for speed rather than generality.

use num::Complex;

/// All of the rendering happens in double precision.
pub type Complex64 = Complex<f64>;

/// The multiplicative identity.
#[inline]
pub fn one() -> Complex64 {
    Complex64::new(1.0, 0.0)
}

/// `z * z`, written out so that the imaginary part is a single
/// multiplication.
#[inline]
pub fn sqr(z: Complex64) -> Complex64 {
    Complex64::new(z.re * z.re - z.im * z.im, 2.0 * z.re * z.im)
}

/// Component-wise absolute value; the "burning ship" fold.
#[inline]
pub fn abs_parts(z: Complex64) -> Complex64 {
    Complex64::new(z.re.abs(), z.im.abs())
}

/// True when both components are finite.  An iterate that fails this
/// has escaped as far as we are concerned.
#[inline]
pub fn is_finite(z: Complex64) -> bool {
    z.re.is_finite() && z.im.is_finite()
}

/// Raise `z` to an integer power.  The common small exponents are
/// spelled out as chains of squarings; anything larger falls back to
/// square-and-multiply.  Negative exponents invert the result.
pub fn ipow(z: Complex64, n: i32) -> Complex64 {
    let p = match n.unsigned_abs() {
        0 => return one(),
        1 => z,
        2 => sqr(z),
        3 => sqr(z) * z,
        4 => sqr(sqr(z)),
        5 => sqr(sqr(z)) * z,
        6 => sqr(sqr(z) * z),
        7 => sqr(sqr(z) * z) * z,
        8 => sqr(sqr(sqr(z))),
        mut k => {
            let mut base = z;
            let mut acc = one();
            while k > 0 {
                if k & 1 == 1 {
                    acc = acc * base;
                }
                base = sqr(base);
                k >>= 1;
            }
            acc
        }
    };
    if n < 0 {
        p.inv()
    } else {
        p
    }
}

/// Raise `z` to a real power through the polar form,
/// `|z|^x * (cos(x arg z), sin(x arg z))`.
pub fn fpow(z: Complex64, x: f64) -> Complex64 {
    let r2 = z.norm_sqr();
    let phi = z.arg();
    Complex64::new((x * phi).cos(), (x * phi).sin()) * r2.powf(x * 0.5)
}

/// The exponent of a power recurrence.  Whole numbers go through
/// `ipow`; anything else through the polar form.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Power {
    /// A whole exponent.
    Integer(i32),
    /// A fractional exponent.
    Real(f64),
}

impl Power {
    /// Pick the cheapest representation of `x`: a real that happens to
    /// be a whole number within `i32` becomes `Integer`.
    pub fn from_real(x: f64) -> Power {
        if x.fract() == 0.0 && x >= f64::from(i32::min_value()) && x <= f64::from(i32::max_value())
        {
            Power::Integer(x as i32)
        } else {
            Power::Real(x)
        }
    }

    /// `z` raised to this power.
    #[inline]
    pub fn apply(self, z: Complex64) -> Complex64 {
        match self {
            Power::Integer(n) => ipow(z, n),
            Power::Real(x) => fpow(z, x),
        }
    }
}
