//! # Hardware Abstraction
//!
//! The acquisition controller talks to the converter, the microsecond timer
//! and the interrupt mask only through these traits. A platform adapter
//! implements them over real registers; the `sim` adapter implements them on
//! the host for tests.

pub mod atmega4809;
#[cfg(feature = "sim")]
pub mod sim;

/// Multiplexer selector codes for the Nano Every analog pins A0..A7.
pub const DEFAULT_CHANNEL_MAP: [u8; 8] = [0x3, 0x2, 0x1, 0x0, 0x6, 0xC, 0x4, 0x5];

/// Converter resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// 10-bit results, 0..=1023
    Bits10,
    /// 8-bit results, 0..=255
    Bits8,
}

impl Resolution {
    /// Width in bits.
    pub const fn bits(self) -> u32 {
        match self {
            Resolution::Bits10 => 10,
            Resolution::Bits8 => 8,
        }
    }

    /// Largest result code.
    pub const fn max_value(self) -> u16 {
        (1 << self.bits()) - 1
    }

    /// Reduces a 10-bit code to this resolution.
    pub const fn from_10bit(self, code: u16) -> u16 {
        let code = if code > 0x3FF { 0x3FF } else { code };
        code >> (10 - self.bits())
    }
}

/// Single multiplexed ADC.
pub trait AdcPeripheral {
    /// Routes the input selected by `code` to the converter.
    fn select_channel(&mut self, code: u8);

    /// Starts one conversion (or the first of a free-running series).
    fn start_conversion(&mut self);

    /// Whether a conversion is in progress.
    fn is_converting(&self) -> bool;

    /// Latest result.
    fn read_result(&mut self) -> u16;

    /// Sets the result width.
    fn set_resolution(&mut self, resolution: Resolution);

    /// Free-running mode restarts conversions without software triggers.
    fn set_free_running(&mut self, enabled: bool);

    /// Sets the converter clock divider to `2^power`.
    fn set_prescaler(&mut self, power: u8);

    /// Powers the converter on.
    fn enable(&mut self);

    /// Powers the converter off.
    fn disable(&mut self);
}

/// Free-running microsecond counter. Wraps at `u32::MAX`.
pub trait MicrosClock {
    /// Current time in µs.
    fn now_us(&self) -> u32;
}

impl<T: MicrosClock + ?Sized> MicrosClock for &T {
    fn now_us(&self) -> u32 {
        (**self).now_us()
    }
}

/// Whether `period_us` has passed since `since`, tolerant of counter wrap.
#[inline]
pub fn period_elapsed(now: u32, since: u32, period_us: u32) -> bool {
    now.wrapping_sub(since) >= period_us
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolution_reduction() {
        assert_eq!(Resolution::Bits10.from_10bit(1023), 1023);
        assert_eq!(Resolution::Bits8.from_10bit(1023), 255);
        assert_eq!(Resolution::Bits8.from_10bit(512), 128);
        assert_eq!(Resolution::Bits10.from_10bit(5000), 1023);
        assert_eq!(Resolution::Bits8.max_value(), 255);
    }

    #[test]
    fn test_period_elapsed_across_wrap() {
        assert!(period_elapsed(1_000, 0, 1_000));
        assert!(!period_elapsed(999, 0, 1_000));
        // 100 µs before wrap to 900 µs after: 1000 µs elapsed.
        assert!(period_elapsed(900, u32::MAX - 99, 1_000));
        assert!(!period_elapsed(898, u32::MAX - 99, 1_000));
    }
}
