//! Acquisition and analysis configuration.
//!
//! Set once before the sampler starts and never changed afterwards. Sample
//! count and channel count are const generics of the buffer; everything else
//! lives in [`Config`] and is checked by [`Config::validate`].

use crate::error::ConfigError;
use crate::hal::{Resolution, DEFAULT_CHANNEL_MAP};
use crate::window::WindowKind;
use crate::MAX_SAMPLES;

/// Widest multiplexer selector code (5-bit MUXPOS field).
pub const MUX_CODE_MAX: u8 = 0x1F;

/// Largest ADC clock prescaler exponent (3-bit PRESC field).
pub const PRESCALER_MAX: u8 = 7;

/// Prescaler that keeps the ADC clock in its full-resolution band at 20 MHz.
pub const DEFAULT_PRESCALER: u8 = 2;

/// Default Precision sample period in µs.
pub const DEFAULT_PERIOD_US: u32 = 1_000;

/// Resolution/throughput trade-off.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Profile {
    /// 10-bit, software-timed: one conversion per `period_us`, polled from
    /// the main loop
    Precision { period_us: u32 },
    /// 8-bit, free-running, captured by the result-ready interrupt
    Rapid,
}

impl Profile {
    /// Converter resolution used by this profile.
    pub const fn resolution(self) -> Resolution {
        match self {
            Profile::Precision { .. } => Resolution::Bits10,
            Profile::Rapid => Resolution::Bits8,
        }
    }

    /// Whether captures happen in interrupt context.
    pub const fn is_interrupt_driven(self) -> bool {
        matches!(self, Profile::Rapid)
    }
}

/// What happens when the slot index wraps to 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CyclePolicy {
    /// Stop after exactly `N` rounds
    SingleShot,
    /// Keep overwriting the oldest round
    Continuous,
}

/// Sampler configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Config {
    /// Resolution/triggering profile
    pub profile: Profile,
    /// Behaviour on buffer wrap
    pub cycle: CyclePolicy,
    /// ADC clock prescaler, as a power of two
    pub prescaler_power: u8,
    /// Multiplexer selector code per channel index
    pub channel_map: &'static [u8],
    /// Window applied before the transform
    pub window: WindowKind,
}

impl Default for Config {
    fn default() -> Self {
        Self::precision(DEFAULT_PERIOD_US)
    }
}

impl Config {
    /// Polled, 10-bit sampling every `period_us`.
    pub const fn precision(period_us: u32) -> Self {
        Self {
            profile: Profile::Precision { period_us },
            cycle: CyclePolicy::Continuous,
            prescaler_power: DEFAULT_PRESCALER,
            channel_map: &DEFAULT_CHANNEL_MAP,
            window: WindowKind::Hann,
        }
    }

    /// Free-running, interrupt-driven 8-bit sampling.
    pub const fn rapid() -> Self {
        Self {
            profile: Profile::Rapid,
            cycle: CyclePolicy::Continuous,
            prescaler_power: DEFAULT_PRESCALER,
            channel_map: &DEFAULT_CHANNEL_MAP,
            window: WindowKind::Hann,
        }
    }

    /// Set the wrap policy
    pub const fn cycle(mut self, cycle: CyclePolicy) -> Self {
        self.cycle = cycle;
        self
    }

    /// Set the prescaler exponent
    pub const fn prescaler(mut self, power: u8) -> Self {
        self.prescaler_power = power;
        self
    }

    /// Set the multiplexer table
    pub const fn channel_map(mut self, map: &'static [u8]) -> Self {
        self.channel_map = map;
        self
    }

    /// Set the window function
    pub const fn window(mut self, window: WindowKind) -> Self {
        self.window = window;
        self
    }

    /// Checks this configuration against `N` samples and `C` channels.
    pub fn validate<const N: usize, const C: usize>(&self) -> Result<(), ConfigError> {
        validate_sample_count(N)?;

        if C == 0 {
            return Err(ConfigError::NoChannels);
        }
        if C > self.channel_map.len() {
            return Err(ConfigError::TooManyChannels {
                channels: C,
                mapped: self.channel_map.len(),
            });
        }
        for (channel, &code) in self.channel_map.iter().take(C).enumerate() {
            if code > MUX_CODE_MAX {
                return Err(ConfigError::InvalidMuxCode { channel, code });
            }
        }

        if let Profile::Precision { period_us: 0 } = self.profile {
            return Err(ConfigError::ZeroPeriod);
        }
        if self.prescaler_power > PRESCALER_MAX {
            return Err(ConfigError::InvalidPrescaler(self.prescaler_power));
        }

        Ok(())
    }

    /// Selector code for a validated channel index.
    #[inline]
    pub fn mux_code(&self, channel: usize) -> u8 {
        self.channel_map[channel]
    }

    /// Sample period of one channel in µs, when it is fixed by configuration.
    pub fn channel_period_us<const C: usize>(&self) -> Option<u32> {
        match self.profile {
            Profile::Precision { period_us } => Some(period_us.saturating_mul(C as u32)),
            Profile::Rapid => None,
        }
    }

    /// Dumps the effective configuration at `info` level.
    pub fn log_summary<const N: usize, const C: usize>(&self) {
        log::info!(
            "vibra: {} samples x {} channels, {:?}, {:?}, {}-bit, prescaler 2^{}, {:?} window",
            N,
            C,
            self.profile,
            self.cycle,
            self.profile.resolution().bits(),
            self.prescaler_power,
            self.window,
        );
        if let Some(period) = self.channel_period_us::<C>() {
            log::info!("vibra: per-channel sample period {} us", period);
        }
    }
}

/// Rejects sample counts the transform cannot handle.
pub fn validate_sample_count(n: usize) -> Result<(), ConfigError> {
    if !(2..=MAX_SAMPLES).contains(&n) {
        return Err(ConfigError::SampleCountOutOfRange(n));
    }
    if !n.is_power_of_two() {
        return Err(ConfigError::SampleCountNotPowerOfTwo(n));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert_eq!(config.profile, Profile::Precision { period_us: 1_000 });
        assert_eq!(config.cycle, CyclePolicy::Continuous);
        assert!(config.validate::<256, 8>().is_ok());
    }

    #[test]
    fn test_profiles_pick_resolution() {
        assert_eq!(Config::precision(500).profile.resolution(), Resolution::Bits10);
        assert_eq!(Config::rapid().profile.resolution(), Resolution::Bits8);
        assert!(Config::rapid().profile.is_interrupt_driven());
    }

    #[test]
    fn test_rejects_bad_sample_counts() {
        let config = Config::default();
        assert_eq!(
            config.validate::<100, 2>(),
            Err(ConfigError::SampleCountNotPowerOfTwo(100))
        );
        assert_eq!(
            config.validate::<1, 2>(),
            Err(ConfigError::SampleCountOutOfRange(1))
        );
        assert_eq!(
            config.validate::<2048, 2>(),
            Err(ConfigError::SampleCountOutOfRange(2048))
        );
    }

    #[test]
    fn test_rejects_bad_channels() {
        let config = Config::default();
        assert_eq!(config.validate::<8, 0>(), Err(ConfigError::NoChannels));
        assert_eq!(
            config.validate::<8, 9>(),
            Err(ConfigError::TooManyChannels { channels: 9, mapped: 8 })
        );

        static BAD_MAP: [u8; 2] = [0x01, 0x20];
        let config = Config::default().channel_map(&BAD_MAP);
        assert_eq!(config.validate::<8, 1>(), Ok(()));
        assert_eq!(
            config.validate::<8, 2>(),
            Err(ConfigError::InvalidMuxCode { channel: 1, code: 0x20 })
        );
    }

    #[test]
    fn test_rejects_bad_timing() {
        assert_eq!(
            Config::precision(0).validate::<8, 1>(),
            Err(ConfigError::ZeroPeriod)
        );
        assert_eq!(
            Config::rapid().prescaler(8).validate::<8, 1>(),
            Err(ConfigError::InvalidPrescaler(8))
        );
    }

    #[test]
    fn test_channel_period() {
        let config = Config::precision(250);
        assert_eq!(config.channel_period_us::<4>(), Some(1_000));
        assert_eq!(Config::rapid().channel_period_us::<4>(), None);
    }
}
