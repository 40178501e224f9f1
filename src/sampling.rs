// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Sub-pixel sample placement.
//!
//! Each pass samples every pixel once, somewhere inside it.  Where
//! inside is decided by a 2D Hammersley point for the pass index (one
//! axis is `pass / passes`, the other the base-2 Halton sequence),
//! shifted by a per-pixel hash so neighbouring pixels don't sample the
//! same sub-pixel positions in lockstep, which would show up as
//! banding.  The result is then pushed through a tent-shaped remap so
//! the samples cluster near the pixel center, which amounts to a
//! triangle reconstruction filter instead of a box.
//!
//! There is no random state anywhere: the same pixel and pass always
//! give the same offset.

/// Bob Jenkins' 6-shift integer hash.  Good avalanche, no
/// cryptographic pretensions.
#[inline]
pub fn hash(a: u32) -> u32 {
    let mut a = a;
    a = a.wrapping_add(0x7ed5_5d16).wrapping_add(a << 12);
    a = (a ^ 0xc761_c23c) ^ (a >> 19);
    a = a.wrapping_add(0x1656_67b1).wrapping_add(a << 5);
    a = a.wrapping_add(0xd3a2_646c) ^ (a << 9);
    a = a.wrapping_add(0xfd70_46c5).wrapping_add(a << 3);
    a = (a ^ 0xb55a_4f09) ^ (a >> 16);
    a
}

/// Map the full range of a u32 onto [0, 1).
#[inline]
pub fn unit_interval(n: u32) -> f64 {
    f64::from(n) * (1.0 / 4_294_967_296.0)
}

/// The radical inverse of `i` in `base`: the i'th element of the
/// Halton sequence.
pub fn halton(i: u32, base: u32) -> f64 {
    let inv_base = 1.0 / f64::from(base);
    let mut i = i;
    let mut f = 1.0;
    let mut r = 0.0;
    while i > 0 {
        f *= inv_base;
        r += f * f64::from(i % base);
        i /= base;
    }
    r
}

/// Add two values in [0, 1] and wrap back into [0, 1].
#[inline]
pub fn wrap(x: f64, y: f64) -> f64 {
    let s = x + y;
    if s > 1.0 {
        s - 1.0
    } else {
        s
    }
}

/// Remap a uniform value in [0, 1] onto [-1, 1] with a tent-shaped
/// density peaking at 0.  The exact midpoint maps to 0.
#[inline]
pub fn tent(x: f64) -> f64 {
    let s = 2.0 * x - 1.0;
    if s == 0.0 {
        0.0
    } else {
        s.signum() * (1.0 - s.abs().sqrt())
    }
}

/// Produces the sub-pixel offset for a pixel on a given pass.
#[derive(Copy, Clone, Debug)]
pub struct Jitter {
    passes: u32,
    inv_passes: f64,
}

impl Jitter {
    /// A jitter pattern spread over `passes` passes.  With one pass (or,
    /// degenerately, zero) every sample sits at the pixel origin.
    pub fn new(passes: u32) -> Self {
        Jitter {
            passes,
            inv_passes: 1.0 / f64::from(passes.max(1)),
        }
    }

    /// The number of passes the pattern is spread over.
    pub fn passes(&self) -> u32 {
        self.passes
    }

    /// The (dx, dy) offset for `pixel` on `pass`, each in [-0.5, 0.5].
    #[inline]
    pub fn offset(&self, pixel: u32, pass: u32) -> (f64, f64) {
        if self.passes <= 1 {
            return (0.0, 0.0);
        }
        let h = unit_interval(hash(pixel));
        let dx = 0.5 * tent(wrap(f64::from(pass) * self.inv_passes, h));
        let dy = 0.5 * tent(wrap(halton(pass, 2), h));
        (dx, dy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_scatters_neighbours() {
        assert_eq!(hash(0), hash(0));
        assert_ne!(hash(0), hash(1));
        assert_ne!(hash(1), hash(2));
        let spread = (0..64u32)
            .map(|i| unit_interval(hash(i)))
            .fold((1.0f64, 0.0f64), |(lo, hi), v| (lo.min(v), hi.max(v)));
        assert!(spread.0 < 0.2 && spread.1 > 0.8, "{:?}", spread);
    }

    #[test]
    fn unit_interval_bounds() {
        assert_eq!(unit_interval(0), 0.0);
        assert!(unit_interval(u32::max_value()) < 1.0);
    }

    #[test]
    fn halton_base_two() {
        let expected = [0.0, 0.5, 0.25, 0.75, 0.125, 0.625, 0.375, 0.875];
        for (i, e) in expected.iter().enumerate() {
            assert_eq!(halton(i as u32, 2), *e);
        }
        assert_eq!(halton(1, 3), 1.0 / 3.0);
    }

    #[test]
    fn tent_shape() {
        assert_eq!(tent(0.5), 0.0);
        assert_eq!(tent(1.0), 0.0);
        assert_eq!(tent(0.0), 0.0);
        assert!((tent(0.75) - (1.0 - 0.5f64.sqrt())).abs() < 1e-12);
        assert!((tent(0.25) + (1.0 - 0.5f64.sqrt())).abs() < 1e-12);
        for i in 0..=100 {
            let t = tent(f64::from(i) / 100.0);
            assert!(t >= -1.0 && t <= 1.0);
        }
    }

    #[test]
    fn wrap_stays_in_unit_interval() {
        assert_eq!(wrap(0.25, 0.5), 0.75);
        assert_eq!(wrap(0.75, 0.5), 0.25);
        assert_eq!(wrap(0.5, 0.5), 1.0);
    }

    #[test]
    fn offsets_are_deterministic_and_bounded() {
        let jitter = Jitter::new(64);
        for pixel in (0..5000u32).step_by(37) {
            for pass in 0..64 {
                let (dx, dy) = jitter.offset(pixel, pass);
                assert_eq!((dx, dy), Jitter::new(64).offset(pixel, pass));
                assert!(dx >= -0.5 && dx <= 0.5, "{}", dx);
                assert!(dy >= -0.5 && dy <= 0.5, "{}", dy);
            }
        }
    }

    #[test]
    fn single_pass_samples_the_origin() {
        assert_eq!(Jitter::new(1).offset(12345, 0), (0.0, 0.0));
        assert_eq!(Jitter::new(0).offset(12345, 0), (0.0, 0.0));
    }

    fn variance(values: &[f64]) -> f64 {
        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / n
    }

    #[test]
    fn offsets_spread_across_passes() {
        for &passes in &[16u32, 64, 256] {
            let jitter = Jitter::new(passes);
            for &pixel in &[0u32, 1, 999, 123_456] {
                let (xs, ys): (Vec<f64>, Vec<f64>) =
                    (0..passes).map(|pass| jitter.offset(pixel, pass)).unzip();
                assert!(variance(&xs) > 0.05 * 0.25, "x variance for {}", pixel);
                assert!(variance(&ys) > 0.05 * 0.25, "y variance for {}", pixel);
            }
        }
    }

    #[test]
    fn offsets_concentrate_near_the_center() {
        let jitter = Jitter::new(1024);
        let near = (0..1024)
            .map(|pass| jitter.offset(77, pass).0)
            .filter(|dx| dx.abs() < 0.25)
            .count();
        // A tent filter puts three quarters of its mass in the inner
        // half; a box would put half.
        assert!(near > 700, "{}", near);
    }
}
