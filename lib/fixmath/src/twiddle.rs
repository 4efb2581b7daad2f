//! Half-angle twiddle recurrence.
//!
//! Stage `s` of a radix-2 FFT rotates by `e^(-iπ/2^s)`. Starting from
//! `(-1, 0)` each stage's factor follows from the previous cosine alone:
//!
//! ```text
//! cos' =  sqrt((1 + cos) / 2)
//! sin' = -sqrt((1 - cos) / 2)
//! ```
//!
//! so a transform of `log2(N)` stages costs `2·log2(N)` square roots and no
//! trigonometry.

use crate::{fast_sqrt, q_round, ONE, Q};

/// Rotation factor in Q30.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Twiddle {
    /// Real part
    pub cos: i64,
    /// Imaginary part
    pub sin: i64,
}

impl Twiddle {
    /// First stage factor, `e^(-iπ)`. Every transform restarts here.
    pub const SEED: Twiddle = Twiddle { cos: -ONE, sin: 0 };

    /// Unit rotation.
    pub const IDENTITY: Twiddle = Twiddle { cos: ONE, sin: 0 };

    /// Factor for the next stage.
    #[inline]
    pub fn next(self) -> Twiddle {
        twiddle_step(self)
    }

    /// Complex product, Q30, one rounding per component.
    #[inline]
    pub fn rotate(self, by: Twiddle) -> Twiddle {
        Twiddle {
            cos: q_round(self.cos * by.cos - self.sin * by.sin),
            sin: q_round(self.cos * by.sin + self.sin * by.cos),
        }
    }

    /// Applies this factor to a complex sample `(re, im)`, rounding the
    /// result back to the sample's own scale.
    #[inline]
    pub fn apply(self, re: i64, im: i64) -> (i64, i64) {
        (
            q_round(self.cos * re - self.sin * im),
            q_round(self.cos * im + self.sin * re),
        )
    }
}

/// Advances a twiddle factor by one FFT stage (halves its angle).
///
/// Only the cosine feeds the recurrence; the sine of the result is always
/// non-positive, which fixes the forward transform direction.
pub fn twiddle_step(current: Twiddle) -> Twiddle {
    let half_cos = current.cos >> 1;
    let plus = (ONE / 2 + half_cos).clamp(0, ONE) as u64;
    let minus = (ONE / 2 - half_cos).clamp(0, ONE) as u64;

    Twiddle {
        cos: fast_sqrt(plus << Q) as i64,
        sin: -(fast_sqrt(minus << Q) as i64),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn q30(v: f64) -> i64 {
        (v * ONE as f64) as i64
    }

    fn close(a: i64, b: i64, tol: i64) -> bool {
        (a - b).abs() <= tol
    }

    #[test]
    fn test_first_step_is_minus_i() {
        let t = Twiddle::SEED.next();
        assert_eq!(t, Twiddle { cos: 0, sin: -ONE });
    }

    #[test]
    fn test_eighth_turn() {
        let t = Twiddle::SEED.next().next();
        let expect = q30(core::f64::consts::FRAC_1_SQRT_2);
        assert!(close(t.cos, expect, 2));
        assert!(close(t.sin, -expect, 2));
    }

    #[test]
    fn test_sixteenth_turn() {
        let t = Twiddle::SEED.next().next().next();
        assert!(close(t.cos, q30(0.923_879_532_511_286_7), 4));
        assert!(close(t.sin, q30(-0.382_683_432_365_089_8), 4));
    }

    #[test]
    fn test_rotation_accumulates() {
        // Four quarter turns of -i bring the identity back to itself.
        let quarter = Twiddle::SEED.next();
        let mut u = Twiddle::IDENTITY;
        for _ in 0..4 {
            u = u.rotate(quarter);
        }
        assert_eq!(u, Twiddle::IDENTITY);
    }

    #[test]
    fn test_apply_quarter_turn() {
        let quarter = Twiddle::SEED.next();
        assert_eq!(quarter.apply(300, -40), (-40, -300));
        assert_eq!(Twiddle::IDENTITY.apply(-7, 9), (-7, 9));
    }

    #[test]
    fn test_factors_stay_on_unit_circle() {
        let mut t = Twiddle::SEED;
        for _ in 0..10 {
            t = t.next();
            let norm = crate::q_mul(t.cos, t.cos) + crate::q_mul(t.sin, t.sin);
            assert!(close(norm, ONE, 8), "norm {}", norm);
        }
    }
}
