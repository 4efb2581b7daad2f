//! Facade consumed by the command and report collaborators.
//!
//! Owns the acquisition controller and the analyzer and borrows the static
//! sample store they share. Every method takes `&self`: the main loop and
//! the result-ready interrupt each hold a shared reference.

use crate::acquisition::{AcqState, AcqStats, Acquisition, StepOutcome};
use crate::analyzer::{SpectralAnalyzer, Spectrum};
use crate::buffer::{ChannelSnapshot, SampleBuffer};
use crate::config::Config;
use crate::critical::{without_interrupts, InterruptControl};
use crate::error::{ConfigError, Error};
use crate::hal::{AdcPeripheral, MicrosClock};
use crate::window::WindowTable;

/// Sampler plus on-demand spectrum analysis over `C` channels of `N` samples.
///
/// `H` must be `N / 2`.
pub struct Monitor<'b, A, K, I, const N: usize, const C: usize, const H: usize> {
    acquisition: Acquisition<'b, A, K, I, N, C>,
    analyzer: SpectralAnalyzer<N, H>,
}

impl<'b, A, K, I, const N: usize, const C: usize, const H: usize> Monitor<'b, A, K, I, N, C, H>
where
    A: AdcPeripheral,
    K: MicrosClock,
    I: InterruptControl,
{
    /// Builds the window named by `config`. Nothing is started.
    pub fn new(
        adc: A,
        clock: K,
        irq: I,
        buffer: &'b SampleBuffer<N, C>,
        config: Config,
    ) -> Result<Self, ConfigError> {
        let window = WindowTable::new(config.window);
        Self::with_window(adc, clock, irq, buffer, config, window)
    }

    /// Uses a caller-supplied window table instead of `config.window`.
    pub fn with_window(
        adc: A,
        clock: K,
        irq: I,
        buffer: &'b SampleBuffer<N, C>,
        config: Config,
        window: WindowTable<H>,
    ) -> Result<Self, ConfigError> {
        let analyzer = SpectralAnalyzer::new(window)?;
        let acquisition = Acquisition::new(adc, clock, irq, buffer, config)?;
        config.log_summary::<N, C>();
        Ok(Self {
            acquisition,
            analyzer,
        })
    }

    /// Starts sampling from an empty buffer.
    pub fn start(&self) -> Result<(), Error> {
        self.acquisition.start()
    }

    /// Stops sampling.
    pub fn stop(&self) {
        self.acquisition.stop();
    }

    /// One main loop tick of the sampler.
    pub fn acquisition_step(&self) -> StepOutcome {
        self.acquisition.step()
    }

    /// Result-ready interrupt body.
    pub fn on_conversion_complete(&self) -> StepOutcome {
        self.acquisition.on_conversion_complete()
    }

    /// Snapshot of one channel's time-domain buffer.
    ///
    /// After [`Monitor::analyze`] the values are spectrum data until new
    /// samples replace them.
    pub fn read_channel_buffer(&self, channel: usize) -> Result<ChannelSnapshot<N>, Error> {
        self.acquisition.buffer().read_channel(channel)
    }

    /// Replaces one channel's samples with their magnitude spectrum.
    ///
    /// In the Rapid profile the result-ready interrupt is masked for the
    /// whole pass.
    pub fn analyze(&self, channel: usize) -> Result<(), Error> {
        let buffer = self.acquisition.buffer();
        let analyzer = &self.analyzer;
        let ran = if self.acquisition.config().profile.is_interrupt_driven() {
            without_interrupts(self.acquisition.irq(), |_| {
                buffer.with_channel(channel, |data| analyzer.analyze(data))
            })?
        } else {
            buffer.with_channel(channel, |data| analyzer.analyze(data))?
        };
        if ran {
            log::debug!("analyzer: channel {} transformed", channel);
        }
        Ok(())
    }

    /// Magnitude spectrum of one channel, if its buffer still holds one.
    pub fn read_spectrum(&self, channel: usize) -> Result<Spectrum<N>, Error> {
        self.acquisition.buffer().with_channel(channel, |data| {
            if !data.spectrum_valid {
                return Err(Error::SpectrumStale { channel });
            }
            Ok(Spectrum::new(channel, data.mean_period_us(), data.real))
        })?
    }

    /// Sampler state.
    pub fn state(&self) -> AcqState {
        self.acquisition.state()
    }

    /// Sampler counters.
    pub fn stats(&self) -> AcqStats {
        self.acquisition.stats()
    }

    /// Active configuration.
    pub fn config(&self) -> &Config {
        self.acquisition.config()
    }

    /// Sampler, for adapter-level inspection.
    pub fn acquisition(&self) -> &Acquisition<'b, A, K, I, N, C> {
        &self.acquisition
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CyclePolicy;
    use crate::hal::sim::{SimAdc, SimClock, SimInterrupts};
    use crate::hal::DEFAULT_CHANNEL_MAP;
    use crate::window::WindowKind;

    // Channel 0 is a square wave of four channel periods. Channel 1 is flat.
    fn square(channel: usize, t_us: u32) -> u16 {
        let round = t_us / 200;
        match channel {
            0 if round / 2 % 2 == 0 => 600,
            0 => 400,
            _ => 512,
        }
    }

    #[test]
    fn test_round_trip_through_facade() {
        let clock = SimClock::new(0);
        let irq = SimInterrupts::new();
        let buffer: SampleBuffer<8, 2> = SampleBuffer::new();
        let adc = SimAdc::new(&clock, &DEFAULT_CHANNEL_MAP, square);
        let config = Config::precision(100)
            .cycle(CyclePolicy::SingleShot)
            .window(WindowKind::Rectangle);
        let monitor: Monitor<'_, _, _, _, 8, 2, 4> =
            Monitor::new(adc, &clock, &irq, &buffer, config).unwrap();
        monitor.start().unwrap();

        while monitor.state() != AcqState::Done {
            monitor.acquisition_step();
            clock.advance(100);
        }
        let snap = monitor.read_channel_buffer(0).unwrap();
        assert_eq!(snap.values, [600, 600, 400, 400, 600, 600, 400, 400]);
        assert_eq!(snap.mean_period_us(), 200);

        assert_eq!(
            monitor.read_spectrum(0).unwrap_err(),
            Error::SpectrumStale { channel: 0 }
        );
        monitor.analyze(0).unwrap();
        let spectrum = monitor.read_spectrum(0).unwrap();
        assert_eq!(spectrum.magnitudes(), &[0, 0, 1131, 0]);
        assert_eq!(spectrum.sample_period_us, 200);
        // Fs = 5 kHz, bin 2 = 1.25 kHz
        assert_eq!(spectrum.bin_frequency_mhz(2), 1_250_000);

        // Second request is a no-op and the spectrum stays readable.
        monitor.analyze(0).unwrap();
        assert_eq!(monitor.read_spectrum(0).unwrap(), spectrum);
        assert!(monitor.read_spectrum(1).is_err());
    }

    #[test]
    fn test_out_of_range_channel() {
        let clock = SimClock::new(0);
        let irq = SimInterrupts::new();
        let buffer: SampleBuffer<8, 2> = SampleBuffer::new();
        let adc = SimAdc::new(&clock, &DEFAULT_CHANNEL_MAP, square);
        let monitor: Monitor<'_, _, _, _, 8, 2, 4> =
            Monitor::new(adc, &clock, &irq, &buffer, Config::default()).unwrap();
        let err = Error::ChannelOutOfRange { channel: 5, channels: 2 };
        assert_eq!(monitor.analyze(5), Err(err));
        assert_eq!(monitor.read_channel_buffer(5).unwrap_err(), err);
        assert_eq!(monitor.read_spectrum(5).unwrap_err(), err);
    }

    #[test]
    fn test_window_length_checked() {
        let clock = SimClock::new(0);
        let irq = SimInterrupts::new();
        let buffer: SampleBuffer<8, 2> = SampleBuffer::new();
        let adc = SimAdc::new(&clock, &DEFAULT_CHANNEL_MAP, square);
        let result: Result<Monitor<'_, _, _, _, 8, 2, 2>, _> =
            Monitor::new(adc, &clock, &irq, &buffer, Config::default());
        assert_eq!(
            result.err(),
            Some(ConfigError::WindowLengthMismatch { samples: 8, window: 2 })
        );
    }

    #[test]
    fn test_spectrum_period_mid_round() {
        let clock = SimClock::new(0);
        let irq = SimInterrupts::new();
        let buffer: SampleBuffer<8, 2> = SampleBuffer::new();
        let adc = SimAdc::new(&clock, &DEFAULT_CHANNEL_MAP, square);
        let config = Config::precision(100).window(WindowKind::Rectangle);
        let monitor: Monitor<'_, _, _, _, 8, 2, 4> =
            Monitor::new(adc, &clock, &irq, &buffer, config).unwrap();
        monitor.start().unwrap();

        // One full cycle plus channel 0 of the next round.
        for _ in 0..17 {
            monitor.acquisition_step();
            clock.advance(100);
        }
        assert_eq!(buffer.cursor().channel, 1);
        assert_eq!(monitor.read_channel_buffer(0).unwrap().mean_period_us(), 200);

        monitor.analyze(0).unwrap();
        let spectrum = monitor.read_spectrum(0).unwrap();
        assert_eq!(spectrum.sample_period_us, 200);
        assert_eq!(spectrum.bin_frequency_mhz(2), 1_250_000);
    }
}
