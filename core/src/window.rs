//! Window functions.
//!
//! Coefficients are stored in Q12 with the amplitude compensation of the
//! window already multiplied in, so that a full-scale sine reads the same
//! peak height whichever window is chosen. Windows are symmetric; only the
//! first `H = N / 2` coefficients are kept and the second half of the frame
//! reads them mirrored.

use crate::error::ConfigError;

/// Fractional bits of a window coefficient.
pub const WINDOW_FRAC_BITS: u32 = 12;

/// Largest accepted coefficient: a compensated Hann window at its peak.
///
/// The transform keeps every intermediate inside `i32` for frames up to
/// [`crate::MAX_SAMPLES`] of 10-bit samples only while the window gain stays
/// at or below this.
pub const MAX_COEFFICIENT: u16 = 15_200;

/// Window function applied before the transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowKind {
    /// Flat
    Rectangle,
    /// `0.54 - 0.46 cos(2πi / (N - 1))`
    Hamming,
    /// `0.5 (1 - cos(2πi / (N - 1)))`
    Hann,
}

impl WindowKind {
    /// Gain that restores the amplitude lost to windowing, including the
    /// factor two of a one-sided spectrum.
    pub const fn compensation(self) -> f64 {
        match self {
            WindowKind::Rectangle => 2.0,
            WindowKind::Hamming => 3.709_868_655_6,
            WindowKind::Hann => 3.710_945_379_6,
        }
    }

    /// Unscaled window value at index `i` of an `n`-point frame.
    pub fn value(self, i: usize, n: usize) -> f64 {
        let phase = 2.0 * core::f64::consts::PI * i as f64 / (n - 1) as f64;
        match self {
            WindowKind::Rectangle => 1.0,
            WindowKind::Hamming => 0.54 - 0.46 * libm::cos(phase),
            WindowKind::Hann => 0.5 * (1.0 - libm::cos(phase)),
        }
    }
}

/// First half of a compensated window, Q12.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowTable<const H: usize> {
    kind: Option<WindowKind>,
    coefficients: [u16; H],
}

impl<const H: usize> WindowTable<H> {
    /// Precomputes the table for a `2H`-point frame.
    pub fn new(kind: WindowKind) -> Self {
        let n = 2 * H;
        let gain = kind.compensation() * (1u32 << WINDOW_FRAC_BITS) as f64;
        let mut coefficients = [0u16; H];
        for (i, c) in coefficients.iter_mut().enumerate() {
            *c = libm::round(kind.value(i, n) * gain) as u16;
        }
        Self {
            kind: Some(kind),
            coefficients,
        }
    }

    /// Table from precomputed coefficients.
    ///
    /// Coefficients above [`MAX_COEFFICIENT`] are accepted here but rejected
    /// by [`crate::SpectralAnalyzer::new`].
    pub const fn from_coefficients(coefficients: [u16; H]) -> Self {
        Self {
            kind: None,
            coefficients,
        }
    }

    /// Window this table was built from, if it is a standard one.
    pub fn kind(&self) -> Option<WindowKind> {
        self.kind
    }

    /// Stored half.
    pub fn coefficients(&self) -> &[u16; H] {
        &self.coefficients
    }

    /// Coefficient for sample `i` of the full `2H`-point frame.
    #[inline]
    pub fn coefficient(&self, i: usize) -> u16 {
        if i < H {
            self.coefficients[i]
        } else {
            self.coefficients[2 * H - 1 - i]
        }
    }

    /// Checks that this table covers an `N`-point frame.
    pub fn check_len<const N: usize>(&self) -> Result<(), ConfigError> {
        if 2 * H == N {
            Ok(())
        } else {
            Err(ConfigError::WindowLengthMismatch {
                samples: N,
                window: H,
            })
        }
    }

    /// Checks every coefficient against [`MAX_COEFFICIENT`].
    pub fn check_gain(&self) -> Result<(), ConfigError> {
        match self
            .coefficients
            .iter()
            .position(|&c| c > MAX_COEFFICIENT)
        {
            Some(index) => Err(ConfigError::WindowGainTooHigh {
                index,
                coefficient: self.coefficients[index],
            }),
            None => Ok(()),
        }
    }

    /// Multiplies one sample by coefficient `i`, rounding back to the
    /// sample's scale.
    #[inline]
    pub fn apply(&self, i: usize, x: i32) -> i32 {
        let c = self.coefficient(i) as i64;
        ((x as i64 * c + (1 << (WINDOW_FRAC_BITS - 1))) >> WINDOW_FRAC_BITS) as i32
    }
}
