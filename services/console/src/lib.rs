//! # Vibra Serial Console
//!
//! Single-byte command protocol over the board's serial link.
//!
//! ## Commands
//!
//! A received byte `b` is reduced modulo `3·C`. The band of the result picks
//! the action and the remainder picks the channel:
//!
//! | `b % 3C`      | Action                           |
//! |---------------|----------------------------------|
//! | `0 .. C`      | print channel `j` time samples   |
//! | `C .. 2C`     | analyze channel `j`              |
//! | `2C .. 3C`    | print channel `j` spectrum       |
//!
//! ## Reports
//!
//! ```text
//! N 64\tCHANNELS 8\r\n                 banner
//! d 800\tA3 512 517 ...\r\n            N samples of channel 3
//! d 800\tF3 0 12 9731 ...\r\n          N/2 magnitudes of channel 3
//! E stale F3\r\n                       no spectrum to print
//! E range 9\r\n                         no such channel
//! E busy 3\r\n                          channel held elsewhere
//! ```
//!
//! `d` is the mean time between two samples of the channel, in µs.

#![no_std]

use core::fmt::{self, Write};

use vibra_core::{AdcPeripheral, Error, InterruptControl, MicrosClock, Monitor};

/// Decoded console command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Print a channel's sample buffer
    PrintChannel(usize),
    /// Run the spectrum analysis of a channel
    Analyze(usize),
    /// Print a channel's magnitude spectrum
    PrintSpectrum(usize),
}

impl Command {
    /// Maps a received byte onto a command for `channels` inputs.
    pub fn decode(byte: u8, channels: usize) -> Option<Command> {
        if channels == 0 {
            return None;
        }
        let code = byte as usize % (3 * channels);
        let channel = code % channels;
        Some(match code / channels {
            0 => Command::PrintChannel(channel),
            1 => Command::Analyze(channel),
            _ => Command::PrintSpectrum(channel),
        })
    }

    /// Channel the command applies to.
    pub fn channel(&self) -> usize {
        match *self {
            Command::PrintChannel(j) | Command::Analyze(j) | Command::PrintSpectrum(j) => j,
        }
    }
}

/// Command interpreter writing its reports to `W`.
pub struct Console<W: Write> {
    out: W,
    handled: u32,
}

impl<W: Write> Console<W> {
    /// Console over an output sink.
    pub fn new(out: W) -> Self {
        Self { out, handled: 0 }
    }

    /// Announces the buffer geometry.
    pub fn banner<const N: usize, const C: usize>(&mut self) -> fmt::Result {
        write!(self.out, "N {}\tCHANNELS {}\r\n", N, C)
    }

    /// Decodes and runs one received byte.
    pub fn handle<A, K, I, const N: usize, const C: usize, const H: usize>(
        &mut self,
        byte: u8,
        monitor: &Monitor<'_, A, K, I, N, C, H>,
    ) -> fmt::Result
    where
        A: AdcPeripheral,
        K: MicrosClock,
        I: InterruptControl,
    {
        let Some(command) = Command::decode(byte, C) else {
            return Ok(());
        };
        log::debug!("console: {:?}", command);
        self.handled = self.handled.wrapping_add(1);

        match command {
            Command::PrintChannel(j) => match monitor.read_channel_buffer(j) {
                Ok(snap) => self.report(snap.mean_period_us(), 'A', j, &snap.values),
                Err(e) => self.error(e),
            },
            Command::Analyze(j) => match monitor.analyze(j) {
                Ok(()) => Ok(()),
                Err(e) => self.error(e),
            },
            Command::PrintSpectrum(j) => match monitor.read_spectrum(j) {
                Ok(spectrum) => {
                    self.report(spectrum.sample_period_us, 'F', j, spectrum.magnitudes())
                }
                Err(e) => self.error(e),
            },
        }
    }

    fn report(&mut self, period_us: u32, tag: char, channel: usize, values: &[i32]) -> fmt::Result {
        write!(self.out, "d {}\t{}{}", period_us, tag, channel)?;
        for v in values {
            write!(self.out, " {}", v)?;
        }
        self.out.write_str("\r\n")
    }

    fn error(&mut self, err: Error) -> fmt::Result {
        log::warn!("console: {}", err);
        match err {
            Error::SpectrumStale { channel } => write!(self.out, "E stale F{}\r\n", channel),
            Error::ChannelOutOfRange { channel, .. } => write!(self.out, "E range {}\r\n", channel),
            Error::ChannelBusy { channel } => write!(self.out, "E busy {}\r\n", channel),
        }
    }

    /// Commands run so far, wrapping.
    pub fn handled(&self) -> u32 {
        self.handled
    }

    /// Output sink.
    pub fn out(&self) -> &W {
        &self.out
    }

    /// Releases the output sink.
    pub fn into_inner(self) -> W {
        self.out
    }
}
