//! Fixed-iteration integer square root.
//!
//! The argument is shifted left by an even amount so that its leading bit
//! lands on bit 62 or 63. The root then lies in `[2^31, 2^32)`, within a
//! factor of √2 of [`SQRT_SEED`], and four Newton steps are enough to reach
//! the integer root from there. Undoing the shift halves the exponent, so the
//! result is `floor(sqrt(x))` for every `u64`.

/// Newton steps per call. Fixed; the timing budget assumes it.
pub const SQRT_ITERATIONS: usize = 4;

/// Starting estimate, about 2^31.5.
pub const SQRT_SEED: u64 = 0xB504_F333;

/// Approximate square root.
///
/// Returns `x` unchanged for `x < 2`, which also keeps the divisor away from
/// zero. For larger inputs the result is the floor of the exact root.
#[inline]
pub fn fast_sqrt(x: u64) -> u64 {
    if x < 2 {
        return x;
    }

    let shift = x.leading_zeros() & !1;
    let n = x << shift;

    let mut a = SQRT_SEED;
    a = (a + n / a) >> 1;
    a = (a + n / a) >> 1;
    a = (a + n / a) >> 1;
    a = (a + n / a) >> 1;

    // Newton approaches from above; at most one step of overshoot is left.
    if a.checked_mul(a).map_or(true, |sq| sq > n) {
        a -= 1;
    }

    a >> (shift / 2)
}
