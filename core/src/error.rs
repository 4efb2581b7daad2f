//! Error types.
//!
//! Configuration errors are fatal: every constructor validates up front and
//! refuses to build a sampler or analyzer that would misbehave later. Runtime
//! errors only cover accessor misuse and contention. Timing overruns and dropped samples are
//! not errors; they show up in [`crate::AcqStats`].

use core::fmt;

/// Rejected configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// Sample count is not a power of two
    SampleCountNotPowerOfTwo(usize),
    /// Sample count below 2 or above [`crate::MAX_SAMPLES`]
    SampleCountOutOfRange(usize),
    /// Zero channels
    NoChannels,
    /// More channels than multiplexer codes
    TooManyChannels { channels: usize, mapped: usize },
    /// Multiplexer code does not fit the selector field
    InvalidMuxCode { channel: usize, code: u8 },
    /// Precision profile with a zero sample period
    ZeroPeriod,
    /// Prescaler exponent out of range
    InvalidPrescaler(u8),
    /// Window table is not half the sample count
    WindowLengthMismatch { samples: usize, window: usize },
    /// Window coefficient above [`crate::window::MAX_COEFFICIENT`]
    WindowGainTooHigh { index: usize, coefficient: u16 },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::SampleCountNotPowerOfTwo(n) => {
                write!(f, "Sample count {} is not a power of two", n)
            }
            ConfigError::SampleCountOutOfRange(n) => write!(
                f,
                "Sample count {} outside 2..={}",
                n,
                crate::MAX_SAMPLES
            ),
            ConfigError::NoChannels => write!(f, "No channels configured"),
            ConfigError::TooManyChannels { channels, mapped } => write!(
                f,
                "{} channels but only {} multiplexer codes",
                channels, mapped
            ),
            ConfigError::InvalidMuxCode { channel, code } => {
                write!(f, "Invalid multiplexer code {:#04x} for channel {}", code, channel)
            }
            ConfigError::ZeroPeriod => write!(f, "Sample period must be non-zero"),
            ConfigError::InvalidPrescaler(p) => write!(f, "Prescaler exponent {} outside 0..=7", p),
            ConfigError::WindowLengthMismatch { samples, window } => write!(
                f,
                "Window of {} coefficients does not cover {} samples",
                window, samples
            ),
            ConfigError::WindowGainTooHigh { index, coefficient } => write!(
                f,
                "Window coefficient {} at {} exceeds {}",
                coefficient,
                index,
                crate::window::MAX_COEFFICIENT
            ),
        }
    }
}

/// Runtime accessor error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// Channel index outside `[0, C)`
    ChannelOutOfRange { channel: usize, channels: usize },
    /// No spectrum for this channel since its last sample
    SpectrumStale { channel: usize },
    /// Channel held by another context; nothing was changed
    ChannelBusy { channel: usize },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::ChannelOutOfRange { channel, channels } => {
                write!(f, "Channel {} out of range (0..{})", channel, channels)
            }
            Error::SpectrumStale { channel } => {
                write!(f, "Spectrum for channel {} is stale", channel)
            }
            Error::ChannelBusy { channel } => write!(f, "Channel {} is busy", channel),
        }
    }
}
