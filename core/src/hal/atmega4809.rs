//! # ATmega4809 ADC0 Adapter
//!
//! Drives the ADC0 peripheral of the ATmega4809 (Arduino Nano Every) through
//! volatile accesses to its register block.
//!
//! ## Register Block
//!
//! ```text
//! ┌────────┬──────────┬──────────────────────────────────────────┐
//! │ Offset │ Register │ Fields used                              │
//! ├────────┼──────────┼──────────────────────────────────────────┤
//! │ 0x00   │ CTRLA    │ ENABLE · FREERUN · RESSEL (1 = 8-bit)    │
//! │ 0x02   │ CTRLC    │ PRESC[2:0] (clock divider 2^(n+1))       │
//! │ 0x06   │ MUXPOS   │ MUXPOS[4:0]                              │
//! │ 0x08   │ COMMAND  │ STCONV                                   │
//! │ 0x0A   │ INTCTRL  │ RESRDY                                   │
//! │ 0x0B   │ INTFLAGS │ RESRDY (cleared by reading RES)          │
//! │ 0x10   │ RES      │ 16-bit result, low byte first            │
//! └────────┴──────────┴──────────────────────────────────────────┘
//! ```
//!
//! The ADC needs a 50 kHz..1.5 MHz clock for full resolution; from the 20 MHz
//! system clock a prescaler exponent of 2 is the usual choice.

use bitflags::bitflags;

use super::{AdcPeripheral, Resolution};
use crate::critical::InterruptControl;

/// Base address of ADC0 in the data space.
pub const ADC0_BASE: usize = 0x0600;

/// ADC0 register offsets
#[allow(dead_code)]
mod regs {
    /// Control A
    pub const CTRLA: usize = 0x00;
    /// Control B (sample accumulation)
    pub const CTRLB: usize = 0x01;
    /// Control C (prescaler, reference)
    pub const CTRLC: usize = 0x02;
    /// Input multiplexer
    pub const MUXPOS: usize = 0x06;
    /// Command
    pub const COMMAND: usize = 0x08;
    /// Interrupt control
    pub const INTCTRL: usize = 0x0A;
    /// Interrupt flags
    pub const INTFLAGS: usize = 0x0B;
    /// Result, low byte
    pub const RESL: usize = 0x10;
    /// Result, high byte
    pub const RESH: usize = 0x11;
}

bitflags! {
    /// CTRLA bits.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct CtrlA: u8 {
        /// Converter enabled
        const ENABLE = 1 << 0;
        /// Free-running mode
        const FREERUN = 1 << 1;
        /// 8-bit resolution when set, 10-bit when clear
        const RESSEL = 1 << 2;
        /// Keep running in standby
        const RUNSTBY = 1 << 7;
    }
}

bitflags! {
    /// INTCTRL / INTFLAGS bits.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct AdcInt: u8 {
        /// Result ready
        const RESRDY = 1 << 0;
        /// Window comparator
        const WCMP = 1 << 1;
    }
}

const COMMAND_STCONV: u8 = 1 << 0;
const CTRLC_PRESC_MASK: u8 = 0x07;
const MUXPOS_MASK: u8 = 0x1F;

/// Handle on one ADC register block.
///
/// Holds nothing but the base address, so the acquisition controller can own
/// one copy as its [`AdcPeripheral`] and another as its [`InterruptControl`].
#[derive(Debug, Clone, Copy)]
pub struct Atmega4809Adc {
    base: usize,
}

impl Atmega4809Adc {
    /// Creates a handle on the register block at `base`.
    ///
    /// # Safety
    ///
    /// `base` must point at an ADC register block (or memory laid out like
    /// one) valid for the lifetime of every copy of the handle.
    pub const unsafe fn new(base: usize) -> Self {
        Self { base }
    }

    #[inline(always)]
    fn read(&self, offset: usize) -> u8 {
        unsafe { core::ptr::read_volatile((self.base + offset) as *const u8) }
    }

    #[inline(always)]
    fn write(&self, offset: usize, value: u8) {
        unsafe { core::ptr::write_volatile((self.base + offset) as *mut u8, value) }
    }

    fn ctrla(&self) -> CtrlA {
        CtrlA::from_bits_retain(self.read(regs::CTRLA))
    }

    fn set_ctrla(&self, bits: CtrlA, on: bool) {
        let mut ctrla = self.ctrla();
        ctrla.set(bits, on);
        self.write(regs::CTRLA, ctrla.bits());
    }

    fn intctrl(&self) -> AdcInt {
        AdcInt::from_bits_retain(self.read(regs::INTCTRL))
    }
}

impl AdcPeripheral for Atmega4809Adc {
    fn select_channel(&mut self, code: u8) {
        let muxpos = self.read(regs::MUXPOS) & !MUXPOS_MASK;
        self.write(regs::MUXPOS, muxpos | (code & MUXPOS_MASK));
    }

    fn start_conversion(&mut self) {
        let command = self.read(regs::COMMAND);
        self.write(regs::COMMAND, command | COMMAND_STCONV);
    }

    fn is_converting(&self) -> bool {
        self.read(regs::COMMAND) & COMMAND_STCONV != 0
    }

    fn read_result(&mut self) -> u16 {
        // Low byte first latches the high byte.
        let low = self.read(regs::RESL) as u16;
        let high = self.read(regs::RESH) as u16;
        (high << 8) | low
    }

    fn set_resolution(&mut self, resolution: Resolution) {
        self.set_ctrla(CtrlA::RESSEL, resolution == Resolution::Bits8);
    }

    fn set_free_running(&mut self, enabled: bool) {
        self.set_ctrla(CtrlA::FREERUN, enabled);
    }

    fn set_prescaler(&mut self, power: u8) {
        let ctrlc = self.read(regs::CTRLC) & !CTRLC_PRESC_MASK;
        self.write(regs::CTRLC, ctrlc | (power & CTRLC_PRESC_MASK));
    }

    fn enable(&mut self) {
        self.set_ctrla(CtrlA::ENABLE, true);
    }

    fn disable(&mut self) {
        self.set_ctrla(CtrlA::ENABLE, false);
    }
}

impl InterruptControl for Atmega4809Adc {
    fn disable(&self) -> bool {
        let intctrl = self.intctrl();
        self.write(regs::INTCTRL, (intctrl - AdcInt::RESRDY).bits());
        intctrl.contains(AdcInt::RESRDY)
    }

    fn restore(&self, was_enabled: bool) {
        if was_enabled {
            InterruptControl::enable(self);
        }
    }

    fn enable(&self) {
        self.write(regs::INTCTRL, (self.intctrl() | AdcInt::RESRDY).bits());
    }
}
