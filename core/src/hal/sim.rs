//! Host-side simulation of the converter, timer and interrupt mask.
//!
//! Conversions are instantaneous unless a latency is programmed, in which
//! case [`AdcPeripheral::is_converting`] reports busy for that many polls
//! after each start. Input levels come from a plain function of
//! `(channel, time)` returning a 10-bit code.
//!
//! In free-running mode each result read hands back the conversion that
//! just finished and starts the next one on the channel routed at that
//! moment, like the hardware pipeline.

use core::cell::Cell;
use core::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use super::{AdcPeripheral, MicrosClock, Resolution};
use crate::critical::InterruptControl;

/// Input level of `channel` at `t_us`, as a 10-bit code.
pub type SignalFn = fn(channel: usize, t_us: u32) -> u16;

/// Manually advanced microsecond counter.
#[derive(Debug, Default)]
pub struct SimClock {
    now: AtomicU32,
}

impl SimClock {
    /// Clock reading `start_us`.
    pub const fn new(start_us: u32) -> Self {
        Self {
            now: AtomicU32::new(start_us),
        }
    }

    /// Moves time forward, wrapping.
    pub fn advance(&self, us: u32) {
        let now = self.now.load(Ordering::Relaxed);
        self.now.store(now.wrapping_add(us), Ordering::Relaxed);
    }

    /// Jumps to `us`.
    pub fn set(&self, us: u32) {
        self.now.store(us, Ordering::Relaxed);
    }
}

impl MicrosClock for SimClock {
    fn now_us(&self) -> u32 {
        self.now.load(Ordering::Relaxed)
    }
}

/// Simulated multiplexed converter.
pub struct SimAdc<'c> {
    clock: &'c SimClock,
    channel_map: &'static [u8],
    source: SignalFn,
    mux_code: u8,
    resolution: Resolution,
    free_running: bool,
    enabled: bool,
    prescaler_power: u8,
    latency: u32,
    busy_polls: Cell<u32>,
    latched: u16,
    conversions: u32,
}

impl<'c> SimAdc<'c> {
    /// Converter reading `source`, with mux codes resolved through `channel_map`.
    pub fn new(clock: &'c SimClock, channel_map: &'static [u8], source: SignalFn) -> Self {
        Self {
            clock,
            channel_map,
            source,
            mux_code: 0,
            resolution: Resolution::Bits10,
            free_running: false,
            enabled: false,
            prescaler_power: 0,
            latency: 0,
            busy_polls: Cell::new(0),
            latched: 0,
            conversions: 0,
        }
    }

    /// Reports busy for `polls` calls to `is_converting` after each start.
    pub fn set_latency(&mut self, polls: u32) {
        self.latency = polls;
    }

    /// Channel index currently routed to the converter.
    pub fn selected_channel(&self) -> Option<usize> {
        self.channel_map.iter().position(|&c| c == self.mux_code)
    }

    /// Current resolution.
    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    /// Whether free-running mode is on.
    pub fn is_free_running(&self) -> bool {
        self.free_running
    }

    /// Whether the converter is powered.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Current prescaler exponent.
    pub fn prescaler_power(&self) -> u8 {
        self.prescaler_power
    }

    /// Results read so far.
    pub fn conversions(&self) -> u32 {
        self.conversions
    }

    fn sample_now(&self) -> u16 {
        let code = match self.selected_channel() {
            Some(channel) => (self.source)(channel, self.clock.now_us()),
            None => 0,
        };
        self.resolution.from_10bit(code)
    }
}

impl AdcPeripheral for SimAdc<'_> {
    fn select_channel(&mut self, code: u8) {
        self.mux_code = code;
    }

    fn start_conversion(&mut self) {
        if !self.enabled {
            return;
        }
        self.latched = self.sample_now();
        self.busy_polls.set(self.latency);
    }

    fn is_converting(&self) -> bool {
        let remaining = self.busy_polls.get();
        if remaining == 0 {
            return false;
        }
        self.busy_polls.set(remaining - 1);
        true
    }

    fn read_result(&mut self) -> u16 {
        self.conversions += 1;
        let result = self.latched;
        if self.free_running && self.enabled {
            self.latched = self.sample_now();
        }
        result
    }

    fn set_resolution(&mut self, resolution: Resolution) {
        self.resolution = resolution;
    }

    fn set_free_running(&mut self, enabled: bool) {
        self.free_running = enabled;
    }

    fn set_prescaler(&mut self, power: u8) {
        self.prescaler_power = power & 0x7;
    }

    fn enable(&mut self) {
        self.enabled = true;
    }

    fn disable(&mut self) {
        self.enabled = false;
    }
}

/// Simulated interrupt enable bit.
#[derive(Debug, Default)]
pub struct SimInterrupts {
    enabled: AtomicBool,
    sections: AtomicU32,
}

impl SimInterrupts {
    /// Interrupt initially masked.
    pub const fn new() -> Self {
        Self {
            enabled: AtomicBool::new(false),
            sections: AtomicU32::new(0),
        }
    }

    /// Whether the interrupt is unmasked.
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    /// Number of masked sections entered so far.
    pub fn sections(&self) -> u32 {
        self.sections.load(Ordering::Relaxed)
    }
}

impl InterruptControl for SimInterrupts {
    fn disable(&self) -> bool {
        self.sections.fetch_add(1, Ordering::Relaxed);
        self.enabled.swap(false, Ordering::AcqRel)
    }

    fn restore(&self, was_enabled: bool) {
        if was_enabled {
            self.enabled.store(true, Ordering::Release);
        }
    }

    fn enable(&self) {
        self.enabled.store(true, Ordering::Release);
    }
}
