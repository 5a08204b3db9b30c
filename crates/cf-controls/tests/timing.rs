//! Integration test: sampling cadence of a running sensor.
//!
//! Test that demonstrates:
//! - Measurement timestamps never go backwards
//! - The mean gap between measurements stays within 2% of the sampling period
//! - Fixed-rate scheduling holds across a stop/start cycle
//! - Ticks that fall due during a slow tick fire back to back, and the
//!   schedule stays anchored to the start time

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use cf_controls::{PeriodicExecutor, SampledMeasurement, Sensor, SignalRecorder};
use cf_core::{IdentityRegistry, IntervalStats, SignalUnit, utc_now};
use parking_lot::Mutex;

const PERIOD: Duration = Duration::from_millis(50);
const TICKS: usize = 40;
const TOLERANCE: f64 = 0.02;

#[test]
fn sensor_sampling_period_is_held() {
    let ids = IdentityRegistry::new();
    let sensor = Sensor::new(
        &ids,
        "FT-100",
        PERIOD,
        SignalUnit::M3PerHour,
        SampledMeasurement::new(),
    )
    .unwrap();
    let recorder = SignalRecorder::shared();
    sensor.add_listener(recorder.clone());

    sensor.start_measuring();
    assert!(recorder.wait_for_len(TICKS, PERIOD * (TICKS as u32) * 3));
    sensor.stop_measuring();

    let stamps: Vec<_> = recorder.signals().iter().map(|s| s.timestamp).collect();
    let stats = IntervalStats::from_timestamps(&stamps).unwrap();
    assert!(stats.is_monotonic(), "{stats:?}");
    assert!(
        stats.mean_error(PERIOD) < TOLERANCE,
        "mean interval {:.3}ms vs {:?}",
        stats.mean_ms,
        PERIOD
    );
}

#[test]
fn executor_cadence_survives_restart() {
    let stamps = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&stamps);
    let executor = PeriodicExecutor::new("cadence", PERIOD, move || {
        sink.lock().push(utc_now());
    })
    .unwrap();

    for _ in 0..2 {
        stamps.lock().clear();
        executor.start();
        std::thread::sleep(PERIOD * (TICKS as u32 / 2) + PERIOD / 2);
        executor.stop();

        let run = stamps.lock().clone();
        assert!(run.len() > TICKS / 2 - 2, "only {} ticks", run.len());
        let stats = IntervalStats::from_timestamps(&run).unwrap();
        assert!(stats.is_monotonic());
        assert!(stats.mean_error(PERIOD) < TOLERANCE, "{stats:?}");
    }
}

#[test]
fn overrunning_tick_is_caught_up_without_skipping() {
    const FAST: Duration = Duration::from_millis(10);
    const SLOW_TICK: usize = 2;
    const RUN: Duration = Duration::from_millis(300);

    let starts = Arc::new(Mutex::new(Vec::<Instant>::new()));
    let sink = Arc::clone(&starts);
    let index = AtomicUsize::new(0);
    let executor = PeriodicExecutor::new("overrun", FAST, move || {
        sink.lock().push(Instant::now());
        if index.fetch_add(1, Ordering::SeqCst) == SLOW_TICK {
            std::thread::sleep(FAST * 3 + FAST / 2);
        }
    })
    .unwrap();

    executor.start();
    std::thread::sleep(RUN);
    executor.stop();

    let starts = starts.lock().clone();
    let gaps: Vec<Duration> = starts.windows(2).map(|w| w[1].duration_since(w[0])).collect();
    assert!(gaps.len() > 10, "gaps: {gaps:?}");

    // Deadlines 30ms and 40ms passed while tick 2 slept until ~55ms.
    assert!(gaps[SLOW_TICK] >= FAST * 3, "gaps: {gaps:?}");
    assert!(gaps[SLOW_TICK + 1] < Duration::from_millis(3), "gaps: {gaps:?}");
    assert!(gaps[SLOW_TICK + 2] < Duration::from_millis(3), "gaps: {gaps:?}");

    // Tick n never starts before start + n * period, and after the catch-up
    // it starts close to that deadline.
    let anchor = starts[0];
    for (n, start) in starts.iter().enumerate() {
        let deadline = anchor + FAST * n as u32;
        assert!(*start + Duration::from_millis(1) >= deadline, "tick {n} early");
        if n > SLOW_TICK + 3 {
            let late = start.saturating_duration_since(deadline);
            assert!(late < Duration::from_millis(8), "tick {n} late by {late:?}");
        }
    }

    // No tick was dropped: about RUN / period + 1 ticks in total.
    let expected = (RUN.as_millis() / FAST.as_millis()) as usize + 1;
    assert!(
        starts.len() + 3 >= expected && starts.len() <= expected + 1,
        "{} ticks, expected about {expected}",
        starts.len()
    );
    assert_eq!(executor.tick_count(), starts.len() as u64);
}
