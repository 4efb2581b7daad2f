//! # Spectral Analyzer
//!
//! Destructive in-place magnitude spectrum of one channel.
//!
//! ## Pipeline
//!
//! ```text
//! real[N] ──► promote to Q8 ──► subtract mean ──► window (mirrored H)
//!                                                      │
//!          real[0..N/2] ◄── |X[k]| ◄── radix-2 DIT FFT ◄┘
//!                                       (bit reversal + log2 N stages)
//! ```
//!
//! The time-domain samples are gone once a channel has been analyzed; the
//! result lives in the first half of its real array until the next sample
//! lands there. The imaginary array and the upper half of the real array
//! hold transform byproducts.
//!
//! ## Arithmetic
//!
//! Samples are worked in Q8 `i32`. Butterfly products are formed in `i64`
//! against Q30 rotation factors and rounded back. Rotation factors come from
//! the half-angle recurrence, one square-root pair per stage.

use vibra_fixmath::{fast_sqrt, Twiddle};

use crate::buffer::ChannelData;
use crate::config::validate_sample_count;
use crate::error::ConfigError;
use crate::window::WindowTable;

/// Fractional bits of the working sample format.
pub const FRAC_BITS: u32 = 8;

/// Converts samples to Q8 and subtracts their mean. Returns the mean (Q8).
pub fn remove_dc(re: &mut [i32]) -> i32 {
    if re.is_empty() {
        return 0;
    }
    let mut sum: i64 = 0;
    for x in re.iter_mut() {
        *x <<= FRAC_BITS;
        sum += *x as i64;
    }
    let mean = (sum / re.len() as i64) as i32;
    for x in re.iter_mut() {
        *x -= mean;
    }
    mean
}

/// Multiplies each sample by its window coefficient.
pub fn apply_window<const H: usize>(window: &WindowTable<H>, re: &mut [i32]) {
    debug_assert_eq!(re.len(), 2 * H);
    for (i, x) in re.iter_mut().enumerate() {
        *x = window.apply(i, *x);
    }
}

/// Reorders both arrays into bit-reversed index order.
pub fn bit_reverse(re: &mut [i32], im: &mut [i32]) {
    let n = re.len();
    let mut j = 0;
    for i in 1..n {
        let mut bit = n >> 1;
        while j & bit != 0 {
            j ^= bit;
            bit >>= 1;
        }
        j |= bit;
        if i < j {
            re.swap(i, j);
            im.swap(i, j);
        }
    }
}

/// Forward radix-2 decimation-in-time FFT, in place.
///
/// Both slices must have the same power-of-two length.
pub fn fft_in_place(re: &mut [i32], im: &mut [i32]) {
    let n = re.len();
    debug_assert!(n.is_power_of_two() && im.len() == n);

    bit_reverse(re, im);

    let mut stage = Twiddle::SEED;
    let mut span = 1;
    while span < n {
        let step = span << 1;
        let mut u = Twiddle::IDENTITY;
        for j in 0..span {
            let mut i = j;
            while i < n {
                let k = i + span;
                let (tr, ti) = u.apply(re[k] as i64, im[k] as i64);
                let (ar, ai) = (re[i] as i64, im[i] as i64);
                re[k] = (ar - tr) as i32;
                im[k] = (ai - ti) as i32;
                re[i] = (ar + tr) as i32;
                im[i] = (ai + ti) as i32;
                i += step;
            }
            u = u.rotate(stage);
        }
        stage = stage.next();
        span = step;
    }
}

/// Writes `|X[k]|` for the first half of the bins into `re`, scaled back
/// from Q8.
pub fn magnitudes(re: &mut [i32], im: &[i32]) {
    let half = re.len() / 2;
    for k in 0..half {
        let r = (re[k] as i64).unsigned_abs();
        let i = (im[k] as i64).unsigned_abs();
        let m = fast_sqrt(r * r + i * i);
        re[k] = ((m + (1 << (FRAC_BITS - 1))) >> FRAC_BITS) as i32;
    }
}

/// Runs the full pipeline on one channel's arrays.
pub fn transform<const H: usize>(window: &WindowTable<H>, re: &mut [i32], im: &mut [i32]) {
    im.fill(0);
    remove_dc(re);
    apply_window(window, re);
    fft_in_place(re, im);
    magnitudes(re, im);
}

/// Analyzer for `N`-point frames with an `H = N / 2` window table.
#[derive(Debug, Clone)]
pub struct SpectralAnalyzer<const N: usize, const H: usize> {
    window: WindowTable<H>,
}

impl<const N: usize, const H: usize> SpectralAnalyzer<N, H> {
    /// Fails unless `N` is a supported power of two and the window covers it
    /// without exceeding [`crate::window::MAX_COEFFICIENT`].
    pub fn new(window: WindowTable<H>) -> Result<Self, ConfigError> {
        validate_sample_count(N)?;
        window.check_len::<N>()?;
        window.check_gain()?;
        Ok(Self { window })
    }

    /// Window in use.
    pub fn window(&self) -> &WindowTable<H> {
        &self.window
    }

    /// Replaces the channel's samples with their magnitude spectrum.
    ///
    /// Returns false without touching anything if the channel already
    /// holds a spectrum of its current samples.
    pub fn analyze(&self, data: &mut ChannelData<N>) -> bool {
        if data.spectrum_valid {
            return false;
        }
        transform(&self.window, &mut data.real, &mut data.imag);
        data.spectrum_valid = true;
        true
    }
}

/// Copy of a channel's magnitude spectrum.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Spectrum<const N: usize> {
    /// Channel index
    pub channel: usize,
    /// Mean per-channel sample period of the analyzed frame, µs
    pub sample_period_us: u32,
    bins: [i32; N],
}

impl<const N: usize> Spectrum<N> {
    /// Wraps a real array whose first half holds magnitudes.
    pub fn new(channel: usize, sample_period_us: u32, real: [i32; N]) -> Self {
        Self {
            channel,
            sample_period_us,
            bins: real,
        }
    }

    /// `N / 2` magnitudes, bin `k` at `k · Fs / N`.
    pub fn magnitudes(&self) -> &[i32] {
        &self.bins[..N / 2]
    }

    /// Largest bin and its magnitude. Ties go to the lower bin.
    pub fn peak(&self) -> Option<(usize, i32)> {
        let mut best: Option<(usize, i32)> = None;
        for (k, &m) in self.magnitudes().iter().enumerate() {
            match best {
                Some((_, top)) if m <= top => {}
                _ => best = Some((k, m)),
            }
        }
        best
    }

    /// Centre frequency of bin `k` in mHz, 0 if the period is unknown.
    pub fn bin_frequency_mhz(&self, k: usize) -> u64 {
        let denom = N as u64 * self.sample_period_us as u64;
        if denom == 0 {
            return 0;
        }
        k as u64 * 1_000_000_000 / denom
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::window::WindowKind;

    fn cosine<const N: usize>(bin: usize, amplitude: f64, offset: f64) -> [i32; N] {
        core::array::from_fn(|i| {
            let phase = 2.0 * core::f64::consts::PI * (bin * i) as f64 / N as f64;
            libm::round(offset + amplitude * libm::cos(phase)) as i32
        })
    }

    fn run<const N: usize, const H: usize>(kind: WindowKind, samples: [i32; N]) -> Spectrum<N> {
        let analyzer = SpectralAnalyzer::<N, H>::new(WindowTable::new(kind)).unwrap();
        let mut data = ChannelData::<N>::EMPTY;
        data.real = samples;
        assert!(analyzer.analyze(&mut data));
        Spectrum::new(0, 1_000, data.real)
    }

    #[test]
    fn test_remove_dc_of_constant() {
        let mut re = [700; 16];
        assert_eq!(remove_dc(&mut re), 700 << FRAC_BITS);
        assert_eq!(re, [0; 16]);
    }

    #[test]
    fn test_remove_dc_truncates_mean() {
        let mut re = [0, 0, 1];
        // mean of [0, 0, 256] is 85.33
        assert_eq!(remove_dc(&mut re), 85);
        assert_eq!(re, [-85, -85, 171]);
    }

    #[test]
    fn test_bit_reverse_order() {
        let mut re: [i32; 8] = core::array::from_fn(|i| i as i32);
        let mut im = [0; 8];
        bit_reverse(&mut re, &mut im);
        assert_eq!(re, [0, 4, 2, 6, 1, 5, 3, 7]);
    }

    #[test]
    fn test_fft_impulse_is_flat() {
        let mut re = [0; 8];
        let mut im = [0; 8];
        re[0] = 1 << 10;
        fft_in_place(&mut re, &mut im);
        assert_eq!(re, [1 << 10; 8]);
        assert_eq!(im, [0; 8]);
    }

    #[test]
    fn test_constant_input_has_empty_spectrum() {
        let s = run::<16, 8>(WindowKind::Hann, [700; 16]);
        assert_eq!(s.magnitudes(), &[0; 8]);
    }

    #[test]
    fn test_period_four_sequence_peaks_at_bin_two() {
        let s = run::<8, 4>(WindowKind::Rectangle, [1, 0, -1, 0, 1, 0, -1, 0]);
        assert_eq!(s.magnitudes(), &[0, 0, 8, 0]);
        assert_eq!(s.peak(), Some((2, 8)));
    }

    #[test]
    fn test_one_cycle_cosine_peaks_at_bin_one() {
        let s = run::<8, 4>(WindowKind::Rectangle, cosine::<8>(1, 100.0, 0.0));
        assert_eq!(s.magnitudes(), &[0, 802, 0, 2]);
    }

    #[test]
    fn test_hann_sine_with_offset() {
        let s = run::<64, 32>(WindowKind::Hann, cosine::<64>(5, 300.0, 512.0));
        let (peak, height) = s.peak().unwrap();
        assert_eq!(peak, 5);
        assert!(s.magnitudes()[0] < height / 20);
        for (k, &m) in s.magnitudes().iter().enumerate() {
            if k.abs_diff(5) > 1 {
                assert!(m < height / 50, "bin {} = {}", k, m);
            }
        }
    }

    #[test]
    fn test_hamming_full_size() {
        let s = run::<256, 128>(WindowKind::Hamming, cosine::<256>(20, 100.0, 128.0));
        assert_eq!(s.peak().map(|p| p.0), Some(20));
    }

    #[test]
    fn test_analyze_is_idempotent() {
        let analyzer = SpectralAnalyzer::<8, 4>::new(WindowTable::new(WindowKind::Rectangle)).unwrap();
        let mut data = ChannelData::<8>::EMPTY;
        data.real = [1, 0, -1, 0, 1, 0, -1, 0];
        assert!(analyzer.analyze(&mut data));
        let first = data.real;
        assert!(!analyzer.analyze(&mut data));
        assert_eq!(data.real, first);
    }

    #[test]
    fn test_rejects_bad_sizes() {
        assert_eq!(
            SpectralAnalyzer::<12, 6>::new(WindowTable::new(WindowKind::Hann)).unwrap_err(),
            ConfigError::SampleCountNotPowerOfTwo(12)
        );
        assert_eq!(
            SpectralAnalyzer::<16, 4>::new(WindowTable::new(WindowKind::Hann)).unwrap_err(),
            ConfigError::WindowLengthMismatch { samples: 16, window: 4 }
        );
    }

    #[test]
    fn test_rejects_excess_window_gain() {
        let window = WindowTable::from_coefficients([8192, 16_384, 8192, 8192]);
        assert_eq!(
            SpectralAnalyzer::<8, 4>::new(window).unwrap_err(),
            ConfigError::WindowGainTooHigh { index: 1, coefficient: 16_384 }
        );
    }

    #[test]
    fn test_peak_ties_and_frequency() {
        let s = Spectrum::<8>::new(3, 250, [1, 5, 5, 2, 9, 9, 9, 9]);
        assert_eq!(s.peak(), Some((1, 5)));
        // Fs = 4 kHz, bin 1 = 500 Hz
        assert_eq!(s.bin_frequency_mhz(1), 500_000);
        assert_eq!(Spectrum::<8>::new(0, 0, [0; 8]).bin_frequency_mhz(1), 0);
    }
}
