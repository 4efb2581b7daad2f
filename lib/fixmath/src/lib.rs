//! # Vibra Fixed-Point Helpers
//!
//! Cheap integer replacements for the transcendental calls a spectrum
//! analyzer would normally make. Everything here runs in a bounded number of
//! integer operations so it can sit inside a real-time budget on a part with
//! no FPU.
//!
//! ## Contents
//!
//! - **`fast_sqrt`**: four Newton steps from a constant seed
//! - **`Twiddle`**: half-angle recurrence for the radix-2 FFT rotation factor
//! - **`q_round`** / **`q_mul`**: Q30 products rounded back, shared by the
//!   butterflies and the rotation accumulator
//!
//! ## Design
//!
//! - Pure Rust, no dependencies
//! - No state, no allocation, no floating point

#![no_std]

pub mod sqrt;
pub mod twiddle;

pub use sqrt::{fast_sqrt, SQRT_ITERATIONS, SQRT_SEED};
pub use twiddle::{twiddle_step, Twiddle};

/// Fractional bits of the rotation format.
pub const Q: u32 = 30;

/// 1.0 in Q30.
pub const ONE: i64 = 1 << Q;

/// Drops the Q30 scale of a product, rounding half up.
#[inline(always)]
pub const fn q_round(v: i64) -> i64 {
    (v + (1 << (Q - 1))) >> Q
}

/// Multiplies two Q30 values, rounding half up.
#[inline(always)]
pub const fn q_mul(a: i64, b: i64) -> i64 {
    q_round(a * b)
}
