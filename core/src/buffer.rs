//! # Sample Buffer
//!
//! Static per-channel storage shared by the acquisition interrupt and the
//! main loop.
//!
//! ## Layout
//!
//! ```text
//!             slot 0     slot 1            slot N-1
//! channel 0 │ t  re im │ t  re im │  ...  │ t  re im │
//! channel 1 │ t  re im │ t  re im │  ...  │ t  re im │
//!    ...
//! channel C-1
//!                 ▲
//!                 └── cursor (channel, slot): one write position shared by
//!                     all channels; slot advances after a full round
//! ```
//!
//! ## Sharing
//!
//! Writes only happen under a [`CriticalSection`]. Each channel sits behind
//! its own spin lock for interior mutability; the writer never waits on it.
//! If the main context holds a channel (snapshot or analysis in progress)
//! the sample for that channel is dropped instead, so a reader can never see
//! a timestamp from one sample paired with the value of another.
//!
//! The cursor is one packed atomic, only ever stored by the acquisition
//! path inside a critical section; readers may load it at any time. Each
//! channel also records its own next write slot under its lock, since
//! channels ahead of the cursor in the current round have already been
//! written at the cursor slot.

use core::sync::atomic::{AtomicU32, AtomicUsize, Ordering};

use spin::{Mutex, MutexGuard};

use crate::critical::CriticalSection;
use crate::error::Error;

/// Storage of one channel.
#[derive(Debug, Clone)]
pub struct ChannelData<const N: usize> {
    /// Capture time of each slot, µs
    pub timestamps: [u32; N],
    /// Sample values; magnitudes after analysis
    pub real: [i32; N],
    /// Zero on capture; transform byproduct after analysis
    pub imag: [i32; N],
    /// `real[..N/2]` holds a spectrum computed from the current samples
    pub spectrum_valid: bool,
    /// Slot after the newest stored sample, i.e. the oldest one once full
    pub next_slot: usize,
}

impl<const N: usize> ChannelData<N> {
    /// All-zero channel.
    pub const EMPTY: Self = Self {
        timestamps: [0; N],
        real: [0; N],
        imag: [0; N],
        spectrum_valid: false,
        next_slot: 0,
    };

    /// Mean time between consecutive samples.
    pub fn mean_period_us(&self) -> u32 {
        mean_period_us(&self.timestamps, self.next_slot)
    }

    /// Time-domain copy of this channel.
    pub fn snapshot(&self, channel: usize) -> ChannelSnapshot<N> {
        ChannelSnapshot {
            channel,
            timestamps: self.timestamps,
            values: self.real,
            next_slot: self.next_slot,
        }
    }
}

/// Round-robin write position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Cursor {
    /// Channel the next sample goes to
    pub channel: usize,
    /// Slot the next sample goes to
    pub slot: usize,
    /// Completed buffer cycles (slot wrapped to 0)
    pub cycles: u32,
}

/// Result of [`SampleBuffer::capture`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capture {
    /// Channel written
    pub channel: usize,
    /// Slot written
    pub slot: usize,
    /// False when the channel was busy and the sample was dropped
    pub stored: bool,
    /// Last channel of a round was written
    pub round_complete: bool,
    /// Last slot of the buffer was written; the slot index is back at 0
    pub cycle_complete: bool,
    /// Channel the cursor now points at
    pub next_channel: usize,
}

/// Copy of one channel, taken under its lock.
#[derive(Debug, Clone)]
pub struct ChannelSnapshot<const N: usize> {
    /// Channel index
    pub channel: usize,
    /// Capture time per slot, µs
    pub timestamps: [u32; N],
    /// Sample value per slot
    pub values: [i32; N],
    /// Slot the next sample will overwrite (the oldest one once full)
    pub next_slot: usize,
}

impl<const N: usize> ChannelSnapshot<N> {
    /// Mean time between consecutive samples of this channel.
    pub fn mean_period_us(&self) -> u32 {
        mean_period_us(&self.timestamps, self.next_slot)
    }

    /// `(timestamp, value)` pairs from oldest to newest.
    pub fn chronological(&self) -> impl Iterator<Item = (u32, i32)> + '_ {
        (0..N).map(move |i| {
            let slot = (self.next_slot + i) % N;
            (self.timestamps[slot], self.values[slot])
        })
    }
}

/// Mean spacing of a ring of timestamps whose oldest entry is `oldest`.
pub fn mean_period_us(timestamps: &[u32], oldest: usize) -> u32 {
    let n = timestamps.len();
    if n < 2 {
        return 0;
    }
    let first = timestamps[oldest % n];
    let last = timestamps[(oldest + n - 1) % n];
    last.wrapping_sub(first) / (n as u32 - 1)
}

/// Per-channel sample store with a shared round-robin cursor.
///
/// `C` must be non-zero.
pub struct SampleBuffer<const N: usize, const C: usize> {
    channels: [Mutex<ChannelData<N>>; C],
    /// `slot * C + channel`
    position: AtomicUsize,
    cycles: AtomicU32,
}

impl<const N: usize, const C: usize> SampleBuffer<N, C> {
    /// Zeroed buffer, usable in a `static`.
    pub const fn new() -> Self {
        Self {
            channels: [const { Mutex::new(ChannelData::EMPTY) }; C],
            position: AtomicUsize::new(0),
            cycles: AtomicU32::new(0),
        }
    }

    /// Samples per channel.
    pub const fn samples(&self) -> usize {
        N
    }

    /// Channel count.
    pub const fn channels(&self) -> usize {
        C
    }

    fn check_channel(channel: usize) -> Result<(), Error> {
        if channel < C {
            Ok(())
        } else {
            Err(Error::ChannelOutOfRange { channel, channels: C })
        }
    }

    /// Stores one sample. Constant time.
    ///
    /// Returns false, without waiting, if the main context currently holds
    /// the channel. Indices must be in range.
    pub fn write(
        &self,
        _cs: &CriticalSection<'_>,
        channel: usize,
        slot: usize,
        timestamp: u32,
        value: i32,
    ) -> bool {
        debug_assert!(channel < C && slot < N);
        match self.channels[channel].try_lock() {
            Some(mut data) => {
                data.timestamps[slot] = timestamp;
                data.real[slot] = value;
                data.imag[slot] = 0;
                data.spectrum_valid = false;
                data.next_slot = (slot + 1) % N;
                true
            }
            None => false,
        }
    }

    /// Writes at the cursor and advances it, as one unit.
    pub fn capture(&self, cs: &CriticalSection<'_>, timestamp: u32, value: i32) -> Capture {
        let position = self.position.load(Ordering::Relaxed);
        let (slot, channel) = (position / C, position % C);
        let stored = self.write(cs, channel, slot, timestamp, value);

        let mut next = position + 1;
        let cycle_complete = next == N * C;
        if cycle_complete {
            next = 0;
            self.cycles.fetch_add(1, Ordering::Relaxed);
        }
        self.position.store(next, Ordering::Release);

        Capture {
            channel,
            slot,
            stored,
            round_complete: channel + 1 == C,
            cycle_complete,
            next_channel: next % C,
        }
    }

    /// Current write position.
    pub fn cursor(&self) -> Cursor {
        let position = self.position.load(Ordering::Acquire);
        Cursor {
            channel: position % C,
            slot: position / C,
            cycles: self.cycles.load(Ordering::Relaxed),
        }
    }

    /// Consistent copy of one channel.
    pub fn read_channel(&self, channel: usize) -> Result<ChannelSnapshot<N>, Error> {
        Self::check_channel(channel)?;
        Ok(self.channels[channel].lock().snapshot(channel))
    }

    /// Runs `f` with exclusive access to one channel's storage.
    ///
    /// Samples for this channel that arrive meanwhile are dropped.
    pub fn with_channel<R>(
        &self,
        channel: usize,
        f: impl FnOnce(&mut ChannelData<N>) -> R,
    ) -> Result<R, Error> {
        Self::check_channel(channel)?;
        let mut data = self.channels[channel].lock();
        Ok(f(&mut data))
    }

    /// Clears storage and rewinds the cursor.
    ///
    /// Fails, changing nothing, if any channel is currently held.
    pub fn reset(&self, _cs: &CriticalSection<'_>) -> Result<(), Error> {
        let mut held: [Option<MutexGuard<'_, ChannelData<N>>>; C] =
            core::array::from_fn(|i| self.channels[i].try_lock());
        if let Some(channel) = held.iter().position(Option::is_none) {
            return Err(Error::ChannelBusy { channel });
        }
        for data in held.iter_mut().flatten() {
            **data = ChannelData::EMPTY;
        }
        self.position.store(0, Ordering::Release);
        self.cycles.store(0, Ordering::Relaxed);
        Ok(())
    }
}

impl<const N: usize, const C: usize> Default for SampleBuffer<N, C> {
    fn default() -> Self {
        Self::new()
    }
}
