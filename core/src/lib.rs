//! # Vibra Acquisition Core
//!
//! The real-time half of the Vibra firmware: a single ADC multiplexed across
//! several inputs, sampled round-robin into static per-channel buffers, and a
//! fixed-point spectrum analyzer that runs over those buffers on demand.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    COLLABORATORS                            │
//! │      command dispatcher · report printer · entry glue       │
//! ├─────────────────────────────────────────────────────────────┤
//! │                        Monitor                              │
//! │  acquisition_step · read_channel_buffer · analyze ·         │
//! │  read_spectrum                                              │
//! │ ┌───────────────────────┐      ┌──────────────────────────┐ │
//! │ │  Acquisition          │      │  SpectralAnalyzer        │ │
//! │ │  IDLE → SELECT →      │      │  DC removal → window →   │ │
//! │ │  CONVERT → CAPTURE →  │      │  radix-2 FFT → magnitude │ │
//! │ │  ADVANCE              │      │                          │ │
//! │ └──────────┬────────────┘      └────────────▲─────────────┘ │
//! │            │  write (masked)                │ in place      │
//! │ ┌──────────▼────────────────────────────────┴─────────────┐ │
//! │ │              SampleBuffer<N, C> (static)                 │ │
//! │ └──────────────────────────────────────────────────────────┘ │
//! ├─────────────────────────────────────────────────────────────┤
//! │   HAL: AdcPeripheral · MicrosClock · InterruptControl        │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Concurrency
//!
//! One main context plus one interrupt (ADC result ready). The only locking
//! discipline is masking that interrupt: every mutation of shared state goes
//! through a [`critical::CriticalSection`]. Per-channel spin locks exist for
//! interior mutability only; the interrupt path never waits on them and drops
//! the sample instead.
//! Both contexts hold a shared `&Monitor`; nothing on the interrupt path
//! needs `&mut`.
//!
//! ## Memory
//!
//! No allocation. `N` (samples per channel), `C` (channels) and `H = N / 2`
//! (window length) are const generics, and [`SampleBuffer::new`] is `const`
//! so the whole store can live in a `static`.

#![no_std]

pub mod acquisition;
pub mod analyzer;
pub mod buffer;
pub mod config;
pub mod critical;
pub mod error;
pub mod hal;
pub mod monitor;
pub mod window;

pub use acquisition::{AcqState, AcqStats, Acquisition, StepOutcome};
pub use analyzer::{SpectralAnalyzer, Spectrum};
pub use buffer::{Capture, ChannelSnapshot, Cursor, SampleBuffer};
pub use config::{Config, CyclePolicy, Profile};
pub use critical::{without_interrupts, CriticalSection, InterruptControl, MaskGuard};
pub use error::{ConfigError, Error};
pub use hal::{AdcPeripheral, MicrosClock, Resolution};
pub use monitor::Monitor;
pub use window::{WindowKind, WindowTable};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Largest supported sample count. Beyond this the Q8 working format can
/// overflow `i32` in the last butterfly stages.
pub const MAX_SAMPLES: usize = 1024;
