//! Round-robin acquisition driven through the simulated converter.

use vibra_core::hal::sim::{SimAdc, SimClock, SimInterrupts};
use vibra_core::hal::DEFAULT_CHANNEL_MAP;
use vibra_core::{AcqState, Acquisition, Config, CyclePolicy, SampleBuffer, StepOutcome};

const PERIOD_US: u32 = 25;

/// Value is the round number the sample belongs to, plus a channel tag.
fn round_tag(channel: usize, t_us: u32) -> u16 {
    let round = t_us.wrapping_sub(START_US) / (PERIOD_US * 3);
    (round as u16 % 64) * 10 + channel as u16
}

const START_US: u32 = u32::MAX - 2_000;

fn run_rounds<const N: usize>(
    acq: &Acquisition<'_, SimAdc<'_>, &SimClock, &SimInterrupts, N, 3>,
    clock: &SimClock,
    rounds: usize,
) {
    for _ in 0..rounds * 3 {
        assert!(matches!(acq.step(), StepOutcome::Captured(_)));
        // Extra ticks inside the period must not capture.
        if acq.state() != AcqState::Done {
            assert_eq!(acq.step(), StepOutcome::NotDue);
        }
        clock.advance(PERIOD_US);
    }
}

#[test]
fn full_rounds_across_timer_wrap() {
    let clock = SimClock::new(START_US);
    let irq = SimInterrupts::new();
    let buffer: SampleBuffer<32, 3> = SampleBuffer::new();
    let adc = SimAdc::new(&clock, &DEFAULT_CHANNEL_MAP, round_tag);
    let config = Config::precision(PERIOD_US).cycle(CyclePolicy::SingleShot);
    let acq = Acquisition::new(adc, &clock, &irq, &buffer, config).unwrap();
    acq.start().unwrap();

    run_rounds(&acq, &clock, 32);
    assert_eq!(acq.state(), AcqState::Done);
    assert_eq!(acq.stats().captured, 96);
    assert_eq!(acq.stats().skipped, 95);

    for channel in 0..3 {
        let snap = buffer.read_channel(channel).unwrap();
        let mut prev: Option<u32> = None;
        for (i, (ts, value)) in snap.chronological().enumerate() {
            if let Some(p) = prev {
                assert_eq!(ts.wrapping_sub(p), PERIOD_US * 3);
            }
            prev = Some(ts);
            assert_eq!(value, (i * 10 + channel) as i32);
        }
        assert_eq!(snap.mean_period_us(), PERIOD_US * 3);
    }
    // The run crossed the 32-bit wrap.
    let snap = buffer.read_channel(0).unwrap();
    assert!(snap.timestamps[0] > snap.timestamps[31]);
}

#[test]
fn continuous_ring_keeps_latest_rounds() {
    let clock = SimClock::new(START_US);
    let irq = SimInterrupts::new();
    let buffer: SampleBuffer<8, 3> = SampleBuffer::new();
    let adc = SimAdc::new(&clock, &DEFAULT_CHANNEL_MAP, round_tag);
    let acq =
        Acquisition::new(adc, &clock, &irq, &buffer, Config::precision(PERIOD_US)).unwrap();
    acq.start().unwrap();

    run_rounds(&acq, &clock, 16);
    assert_eq!(acq.state(), AcqState::SelectChannel);
    assert_eq!(acq.stats().cycles, 2);
    assert_eq!(buffer.cursor().slot, 0);
    assert_eq!(buffer.cursor().channel, 0);

    for channel in 0..3 {
        let snap = buffer.read_channel(channel).unwrap();
        let rounds: Vec<i32> = snap.chronological().map(|(_, v)| (v - channel as i32) / 10).collect();
        assert_eq!(rounds, (8..16).collect::<Vec<i32>>());
    }
}

#[test]
fn restart_clears_previous_run() {
    let clock = SimClock::new(0);
    let irq = SimInterrupts::new();
    let buffer: SampleBuffer<4, 3> = SampleBuffer::new();
    let adc = SimAdc::new(&clock, &DEFAULT_CHANNEL_MAP, |_, _| 1000);
    let acq = Acquisition::new(adc, &clock, &irq, &buffer, Config::precision(1)).unwrap();
    acq.start().unwrap();
    acq.step();
    acq.step();
    acq.stop();
    assert_eq!(acq.step(), StepOutcome::Idle);

    acq.start().unwrap();
    assert_eq!(buffer.cursor().channel, 0);
    assert_eq!(buffer.read_channel(0).unwrap().values, [0; 4]);
    assert_eq!(acq.stats().captured, 0);
}

#[test]
fn rapid_profile_round_robin() {
    let clock = SimClock::new(0);
    let irq = SimInterrupts::new();
    let buffer: SampleBuffer<16, 3> = SampleBuffer::new();
    let adc = SimAdc::new(&clock, &DEFAULT_CHANNEL_MAP, |ch, _| 256 * ch as u16 + 4);
    let acq = Acquisition::new(adc, &clock, &irq, &buffer, Config::rapid()).unwrap();
    acq.start().unwrap();

    for _ in 0..16 * 3 * 3 {
        clock.advance(7);
        assert!(matches!(acq.on_conversion_complete(), StepOutcome::Captured(_)));
    }
    assert_eq!(acq.state(), AcqState::Converting);
    assert_eq!(acq.stats().cycles, 3);
    assert_eq!(acq.stats().dropped, 0);
    assert!(irq.is_enabled());

    for channel in 0..3 {
        let snap = buffer.read_channel(channel).unwrap();
        assert!(snap.values.iter().all(|&v| v == 64 * channel as i32 + 1));
        assert_eq!(snap.mean_period_us(), 21);
    }
}

#[test]
fn snapshot_between_channels_of_a_round() {
    let clock = SimClock::new(1_000);
    let irq = SimInterrupts::new();
    let buffer: SampleBuffer<4, 2> = SampleBuffer::new();
    let adc = SimAdc::new(&clock, &DEFAULT_CHANNEL_MAP, |_, _| 512);
    let acq = Acquisition::new(adc, &clock, &irq, &buffer, Config::precision(100)).unwrap();
    acq.start().unwrap();

    for _ in 0..17 {
        assert!(matches!(acq.step(), StepOutcome::Captured(_)));
        clock.advance(100);
    }
    assert_eq!(buffer.cursor().channel, 1);
    assert_eq!(buffer.cursor().slot, 0);

    let snap = buffer.read_channel(0).unwrap();
    let times: Vec<u32> = snap.chronological().map(|(ts, _)| ts).collect();
    assert_eq!(times, [2_000, 2_200, 2_400, 2_600]);
    assert_eq!(snap.mean_period_us(), 200);

    let snap = buffer.read_channel(1).unwrap();
    let times: Vec<u32> = snap.chronological().map(|(ts, _)| ts).collect();
    assert_eq!(times, [1_900, 2_100, 2_300, 2_500]);
    assert_eq!(snap.mean_period_us(), 200);
}
