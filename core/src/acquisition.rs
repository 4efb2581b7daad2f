//! # Acquisition Controller
//!
//! Drives the multiplexed ADC round-robin over all channels and stores each
//! result, with its timestamp, at the buffer cursor.
//!
//! ## State Machine
//!
//! ```text
//!          start()
//!  IDLE ───────────► SELECT_CHANNEL ──► CONVERTING ──► CAPTURE ──► ADVANCE
//!   ▲                      ▲                                          │
//!   │ stop()               └──────────────────────────────────────────┤
//!   │                                                   single-shot   │
//!   └──────────────────────────── DONE ◄──────────── wrap of slot ────┘
//! ```
//!
//! CAPTURE and ADVANCE complete inside the call that observes the finished
//! conversion, under one critical section.
//!
//! ## Profiles
//!
//! - **Precision**: 10-bit single conversions, software-timed. Each main
//!   loop [`Acquisition::step`] checks whether the sample period has passed
//!   since the previous start; if so it selects the cursor's channel, starts
//!   a conversion and captures it as soon as it is done.
//! - **Rapid**: 8-bit free-running conversions. The result-ready interrupt
//!   calls [`Acquisition::on_conversion_complete`], which captures the result
//!   and routes a channel to the multiplexer. Main loop `step` only reports
//!   progress.
//!
//! In free-running mode the next conversion begins, on whatever the
//! multiplexer selects, as soon as the previous one completes. By the time
//! the interrupt for channel `k` runs, conversion `k + 1` is already under
//! way, so the interrupt routes channel `k + 2`.
//!
//! ## Sharing
//!
//! Every operation takes `&self`, so the main loop and the interrupt hold
//! plain shared references to one controller. The converter sits behind a
//! spin lock that the interrupt only ever `try_lock`s; state and counters
//! are atomics.

use core::sync::atomic::{AtomicU32, AtomicU8, Ordering};

use spin::Mutex;

use crate::buffer::{Capture, SampleBuffer};
use crate::config::{Config, CyclePolicy, Profile};
use crate::critical::{without_interrupts, InterruptControl};
use crate::error::{ConfigError, Error};
use crate::hal::{period_elapsed, AdcPeripheral, MicrosClock};

/// Controller state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum AcqState {
    /// Not started, or stopped
    Idle = 0,
    /// Waiting for the next sample to fall due
    SelectChannel = 1,
    /// A conversion is in progress
    Converting = 2,
    /// Single-shot run finished
    Done = 3,
}

impl AcqState {
    fn from_raw(raw: u8) -> Self {
        match raw {
            1 => AcqState::SelectChannel,
            2 => AcqState::Converting,
            3 => AcqState::Done,
            _ => AcqState::Idle,
        }
    }
}

/// Result of one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// Controller is idle
    Idle,
    /// Sample period has not elapsed yet
    NotDue,
    /// Conversion still in progress, or the converter was held elsewhere
    Busy,
    /// A sample was captured
    Captured(Capture),
    /// Single-shot run finished
    Done,
}

/// Acquisition counters, reset by [`Acquisition::start`].
///
/// All counters wrap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AcqStats {
    /// Samples stored
    pub captured: u32,
    /// Samples discarded because the channel was held by the main context
    pub dropped: u32,
    /// Ticks where the sample period had not elapsed
    pub skipped: u32,
    /// Ticks where a conversion was still running when the next sample fell due
    pub overruns: u32,
    /// Completed passes over the whole buffer
    pub cycles: u32,
}

struct Counters {
    captured: AtomicU32,
    dropped: AtomicU32,
    skipped: AtomicU32,
    overruns: AtomicU32,
    cycles: AtomicU32,
}

impl Counters {
    const fn new() -> Self {
        Self {
            captured: AtomicU32::new(0),
            dropped: AtomicU32::new(0),
            skipped: AtomicU32::new(0),
            overruns: AtomicU32::new(0),
            cycles: AtomicU32::new(0),
        }
    }

    #[inline]
    fn bump(counter: &AtomicU32) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn clear(&self) {
        for counter in [
            &self.captured,
            &self.dropped,
            &self.skipped,
            &self.overruns,
            &self.cycles,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }

    fn snapshot(&self) -> AcqStats {
        AcqStats {
            captured: self.captured.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
            overruns: self.overruns.load(Ordering::Relaxed),
            cycles: self.cycles.load(Ordering::Relaxed),
        }
    }
}

/// Converter plus the software timing that goes with it.
struct Driver<A> {
    adc: A,
    last_start_us: Option<u32>,
}

/// Round-robin sampler over `C` channels of `N` samples.
pub struct Acquisition<'b, A, K, I, const N: usize, const C: usize> {
    driver: Mutex<Driver<A>>,
    clock: K,
    irq: I,
    buffer: &'b SampleBuffer<N, C>,
    config: Config,
    state: AtomicU8,
    counters: Counters,
}

impl<'b, A, K, I, const N: usize, const C: usize> Acquisition<'b, A, K, I, N, C>
where
    A: AdcPeripheral,
    K: MicrosClock,
    I: InterruptControl,
{
    /// Validates `config` for `N` samples and `C` channels.
    pub fn new(
        adc: A,
        clock: K,
        irq: I,
        buffer: &'b SampleBuffer<N, C>,
        config: Config,
    ) -> Result<Self, ConfigError> {
        config.validate::<N, C>()?;
        Ok(Self {
            driver: Mutex::new(Driver {
                adc,
                last_start_us: None,
            }),
            clock,
            irq,
            buffer,
            config,
            state: AtomicU8::new(AcqState::Idle as u8),
            counters: Counters::new(),
        })
    }

    fn set_state(&self, state: AcqState) {
        self.state.store(state as u8, Ordering::Release);
    }

    /// Clears the buffer, programs the converter and begins sampling.
    ///
    /// Fails with [`Error::ChannelBusy`], leaving everything as it was, if a
    /// channel is held by the main context.
    pub fn start(&self) -> Result<(), Error> {
        let was_enabled = self.irq.disable();
        if let Err(err) = without_interrupts(&self.irq, |cs| self.buffer.reset(cs)) {
            self.irq.restore(was_enabled);
            log::warn!("acquisition: start refused, {}", err);
            return Err(err);
        }
        self.counters.clear();

        let mut driver = self.driver.lock();
        driver.last_start_us = None;
        driver.adc.set_resolution(self.config.profile.resolution());
        driver.adc.set_prescaler(self.config.prescaler_power);

        match self.config.profile {
            Profile::Precision { .. } => {
                driver.adc.set_free_running(false);
                driver.adc.enable();
                self.set_state(AcqState::SelectChannel);
            }
            Profile::Rapid => {
                driver.adc.set_free_running(true);
                driver.adc.enable();
                driver.adc.select_channel(self.config.mux_code(0));
                self.set_state(AcqState::Converting);
                driver.adc.start_conversion();
                // Conversion 0 has latched its input; the next one starts on
                // completion with whatever is routed by then.
                driver.adc.select_channel(self.config.mux_code(1 % C));
                drop(driver);
                self.irq.enable();
            }
        }
        log::info!(
            "acquisition: started {:?}, {:?}",
            self.config.profile,
            self.config.cycle
        );
        Ok(())
    }

    /// Halts sampling. Buffer contents are kept.
    pub fn stop(&self) {
        let interrupt_driven = self.config.profile.is_interrupt_driven();
        if interrupt_driven {
            self.irq.disable();
        }
        let mut driver = self.driver.lock();
        if interrupt_driven {
            driver.adc.set_free_running(false);
        }
        self.set_state(AcqState::Idle);
        let stats = self.counters.snapshot();
        log::info!(
            "acquisition: stopped after {} samples, {} cycles",
            stats.captured,
            stats.cycles
        );
    }

    /// Main loop tick.
    pub fn step(&self) -> StepOutcome {
        match (self.state(), self.config.profile) {
            (AcqState::Idle, _) => StepOutcome::Idle,
            (AcqState::Done, _) => StepOutcome::Done,
            (_, Profile::Rapid) => StepOutcome::Busy,
            (AcqState::SelectChannel, Profile::Precision { period_us }) => {
                let mut driver = self.driver.lock();
                let now = self.clock.now_us();
                if let Some(last) = driver.last_start_us {
                    if !period_elapsed(now, last, period_us) {
                        Counters::bump(&self.counters.skipped);
                        log::trace!("acquisition: not due ({} us since last)", now.wrapping_sub(last));
                        return StepOutcome::NotDue;
                    }
                }
                let channel = self.buffer.cursor().channel;
                driver.adc.select_channel(self.config.mux_code(channel));
                driver.adc.start_conversion();
                driver.last_start_us = Some(now);
                self.set_state(AcqState::Converting);
                self.poll_conversion(&mut driver, period_us)
            }
            (AcqState::Converting, Profile::Precision { period_us }) => {
                let mut driver = self.driver.lock();
                self.poll_conversion(&mut driver, period_us)
            }
        }
    }

    fn poll_conversion(&self, driver: &mut Driver<A>, period_us: u32) -> StepOutcome {
        if driver.adc.is_converting() {
            if let Some(last) = driver.last_start_us {
                if period_elapsed(self.clock.now_us(), last, period_us) {
                    Counters::bump(&self.counters.overruns);
                    log::trace!("acquisition: conversion overran its period");
                }
            }
            return StepOutcome::Busy;
        }

        let capture = self.capture(driver);
        if capture.cycle_complete {
            let stats = self.counters.snapshot();
            log::debug!(
                "acquisition: cycle {} complete ({} dropped)",
                stats.cycles,
                stats.dropped
            );
        }
        if self.state() != AcqState::Done {
            self.set_state(AcqState::SelectChannel);
        }
        StepOutcome::Captured(capture)
    }

    /// Result-ready interrupt body for the Rapid profile.
    ///
    /// Never waits: if the converter is held elsewhere the result is counted
    /// as dropped and `Busy` is returned.
    pub fn on_conversion_complete(&self) -> StepOutcome {
        match self.state() {
            AcqState::Idle => return StepOutcome::Idle,
            AcqState::Done => return StepOutcome::Done,
            _ => {}
        }
        if !self.config.profile.is_interrupt_driven() {
            return StepOutcome::Busy;
        }
        let Some(mut driver) = self.driver.try_lock() else {
            Counters::bump(&self.counters.dropped);
            return StepOutcome::Busy;
        };

        let capture = self.capture(&mut driver);
        if self.state() == AcqState::Done {
            driver.adc.set_free_running(false);
            self.irq.disable();
        } else {
            // The conversion for `next_channel` is already running.
            let ahead = (capture.next_channel + 1) % C;
            driver.adc.select_channel(self.config.mux_code(ahead));
        }
        StepOutcome::Captured(capture)
    }

    /// Reads the result and stores it with the current time as one unit.
    fn capture(&self, driver: &mut Driver<A>) -> Capture {
        let capture = without_interrupts(&self.irq, |cs| {
            let value = driver.adc.read_result();
            let timestamp = self.clock.now_us();
            self.buffer.capture(cs, timestamp, value as i32)
        });

        if capture.stored {
            Counters::bump(&self.counters.captured);
        } else {
            Counters::bump(&self.counters.dropped);
        }
        if capture.cycle_complete {
            Counters::bump(&self.counters.cycles);
            if self.config.cycle == CyclePolicy::SingleShot {
                self.set_state(AcqState::Done);
            }
        }
        capture
    }

    /// Current state.
    pub fn state(&self) -> AcqState {
        AcqState::from_raw(self.state.load(Ordering::Acquire))
    }

    /// Counters since the last start.
    pub fn stats(&self) -> AcqStats {
        self.counters.snapshot()
    }

    /// Active configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Shared sample store.
    pub fn buffer(&self) -> &'b SampleBuffer<N, C> {
        self.buffer
    }

    /// Runs `f` on the converter with the interrupt masked.
    pub fn with_adc<R>(&self, f: impl FnOnce(&mut A) -> R) -> R {
        without_interrupts(&self.irq, |_| f(&mut self.driver.lock().adc))
    }

    /// Interrupt mask.
    pub fn irq(&self) -> &I {
        &self.irq
    }
}
