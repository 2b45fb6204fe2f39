mod common;

use std::time::{Duration, Instant};

use anyhow::Result;
use chrono::Utc;
use humilog_lib::models::{JointRecord, Reading, TemperatureRecord};
use humilog_lib::psychro::relative_humidity;
use humilog_lib::models::SensorLayout;
use humilog_lib::run::{CancellationSignal, LoopPhase, StopReason};
use humilog_lib::sensing::{acquisition_loop, DualHumidity, LoopSettings, SingleTemperature};
use humilog_lib::settings::LoggerSettings;
use tokio::sync::watch;

use common::{Event, MemorySink, RecordingNotifier, ScriptedTransport, TransportCounters};

const POLL: Duration = Duration::from_millis(5);

fn settings() -> LoopSettings {
    LoopSettings {
        poll_interval: POLL,
        max_consecutive_rejections: None,
    }
}

fn cancel_after(signal: &CancellationSignal, delay: Duration) {
    let signal = signal.clone();
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        signal.cancel();
    });
}

#[tokio::test]
async fn both_boards_valid_produces_one_joint_record() -> Result<()> {
    // Arrange
    let counters = TransportCounters::new();
    let source = DualHumidity::new(
        ScriptedTransport::open(&counters, "inflow", &["10.0", "22.0"]),
        ScriptedTransport::open(&counters, "outflow", &["9.5", "21.0"]),
    );
    let sink = MemorySink::<JointRecord>::new();
    let records = sink.handle();
    let notifier = RecordingNotifier::new();
    let signal = CancellationSignal::new();
    let (phase, _) = watch::channel(LoopPhase::Idle);
    let before = Utc::now();
    cancel_after(&signal, Duration::from_millis(60));

    // Act
    let outcome = acquisition_loop(source, sink, &settings(), &signal, &notifier, &phase).await?;

    // Assert
    let records = records.lock().unwrap().clone();
    assert_eq!(records.len(), 1);
    let record = &records[0];
    assert_eq!(record.inflow, Reading::derive(22.0, 10.0));
    assert_eq!(record.outflow, Reading::derive(21.0, 9.5));
    assert_eq!(
        record.inflow.relative_humidity.to_bits(),
        relative_humidity(22.0, 10.0).to_bits()
    );
    assert_eq!(
        record.outflow.relative_humidity.to_bits(),
        relative_humidity(21.0, 9.5).to_bits()
    );
    assert!(record.timestamp >= before && record.timestamp <= Utc::now());

    assert_eq!(outcome.reason, StopReason::Cancelled);
    assert_eq!(outcome.stats.records_written, 1);
    assert_eq!(notifier.count(|e| matches!(e, Event::Recorded(_))), 1);
    Ok(())
}

#[tokio::test]
async fn one_board_timing_out_never_produces_a_record() -> Result<()> {
    // Arrange
    let counters = TransportCounters::new();
    let source = DualHumidity::new(
        ScriptedTransport::repeating(&counters, "inflow", &["10.0", "22.0"]),
        ScriptedTransport::open(&counters, "outflow", &[]),
    );
    let sink = MemorySink::<JointRecord>::new();
    let records = sink.handle();
    let notifier = RecordingNotifier::new();
    let signal = CancellationSignal::new();
    let (phase, _) = watch::channel(LoopPhase::Idle);
    cancel_after(&signal, Duration::from_millis(50));

    // Act
    let outcome = acquisition_loop(source, sink, &settings(), &signal, &notifier, &phase).await?;

    // Assert
    assert!(records.lock().unwrap().is_empty());
    assert_eq!(outcome.stats.records_written, 0);
    assert!(outcome.stats.skipped_cycles >= 2);
    let waiting = notifier.events();
    assert!(waiting
        .iter()
        .all(|e| matches!(e, Event::Waiting(msg) if msg.contains("Outflow sensor"))));
    Ok(())
}

#[tokio::test]
async fn malformed_frames_are_skipped_and_polling_continues() -> Result<()> {
    // Arrange
    let counters = TransportCounters::new();
    let source = DualHumidity::new(
        ScriptedTransport::open(&counters, "inflow", &["abc", "def", "10.0", "22.0"]),
        ScriptedTransport::open(&counters, "outflow", &["1.2.3", "--", "9.5", "21.0"]),
    );
    let sink = MemorySink::<JointRecord>::new();
    let records = sink.handle();
    let notifier = RecordingNotifier::new();
    let signal = CancellationSignal::new();
    let (phase, _) = watch::channel(LoopPhase::Idle);
    cancel_after(&signal, Duration::from_millis(60));

    // Act
    let outcome = acquisition_loop(source, sink, &settings(), &signal, &notifier, &phase).await?;

    // Assert
    let events = notifier.events();
    assert!(matches!(&events[0], Event::Waiting(msg)
        if msg.contains("Inflow sensor") && msg.contains("Outflow sensor")));
    assert!(matches!(&events[1], Event::Recorded(_)));
    assert_eq!(records.lock().unwrap().len(), 1);
    assert!(outcome.stats.cycles >= 2);
    assert_eq!(outcome.reason, StopReason::Cancelled);
    Ok(())
}

#[tokio::test]
async fn cancelled_before_start_writes_nothing() -> Result<()> {
    // Arrange
    let counters = TransportCounters::new();
    let source = DualHumidity::new(
        ScriptedTransport::repeating(&counters, "inflow", &["10.0", "22.0"]),
        ScriptedTransport::repeating(&counters, "outflow", &["9.5", "21.0"]),
    );
    let sink = MemorySink::<JointRecord>::new();
    let records = sink.handle();
    let notifier = RecordingNotifier::new();
    let signal = CancellationSignal::new();
    signal.cancel();
    let (phase, _) = watch::channel(LoopPhase::Idle);

    // Act
    let outcome = acquisition_loop(source, sink, &settings(), &signal, &notifier, &phase).await?;

    // Assert
    assert_eq!(outcome.stats.cycles, 0);
    assert!(records.lock().unwrap().is_empty());
    assert_eq!(counters.reads.load(std::sync::atomic::Ordering::SeqCst), 0);
    Ok(())
}

#[tokio::test]
async fn cancellation_stops_within_one_cycle_and_no_writes_follow() -> Result<()> {
    // Arrange
    let interval = Duration::from_millis(200);
    let counters = TransportCounters::new();
    let source = DualHumidity::new(
        ScriptedTransport::repeating(&counters, "inflow", &["10.0", "22.0"]),
        ScriptedTransport::repeating(&counters, "outflow", &["9.5", "21.0"]),
    );
    let sink = MemorySink::<JointRecord>::new();
    let records = sink.handle();
    let notifier = RecordingNotifier::new();
    let signal = CancellationSignal::new();
    let (phase, mut phase_rx) = watch::channel(LoopPhase::Idle);
    let settings = LoopSettings {
        poll_interval: interval,
        max_consecutive_rejections: None,
    };

    let task_signal = signal.clone();
    let task = tokio::spawn(async move {
        acquisition_loop(source, sink, &settings, &task_signal, &notifier, &phase).await
    });

    // Act
    phase_rx.wait_for(|phase| *phase == LoopPhase::Running).await?;
    tokio::time::sleep(Duration::from_millis(50)).await;
    let cancelled_at = Instant::now();
    signal.cancel();
    let outcome = task.await??;
    let stop_latency = cancelled_at.elapsed();

    // Assert
    assert!(stop_latency < interval + Duration::from_millis(150));
    assert_eq!(*phase_rx.borrow(), LoopPhase::Idle);
    let written = records.lock().unwrap().len() as u64;
    assert_eq!(written, outcome.stats.records_written);

    tokio::time::sleep(interval * 2).await;
    assert_eq!(records.lock().unwrap().len() as u64, written);
    Ok(())
}

#[tokio::test]
async fn write_failure_is_reported_and_polling_continues() -> Result<()> {
    // Arrange
    let counters = TransportCounters::new();
    let source = DualHumidity::new(
        ScriptedTransport::repeating(&counters, "inflow", &["10.0", "22.0"]),
        ScriptedTransport::repeating(&counters, "outflow", &["9.5", "21.0"]),
    );
    let sink = MemorySink::<JointRecord>::failing_first(1);
    let records = sink.handle();
    let notifier = RecordingNotifier::new();
    let signal = CancellationSignal::new();
    let (phase, _) = watch::channel(LoopPhase::Idle);
    cancel_after(&signal, Duration::from_millis(60));

    // Act
    let outcome = acquisition_loop(source, sink, &settings(), &signal, &notifier, &phase).await?;

    // Assert
    assert_eq!(outcome.stats.write_failures, 1);
    assert!(outcome.stats.records_written >= 1);
    assert_eq!(records.lock().unwrap().len() as u64, outcome.stats.records_written);
    assert!(matches!(&notifier.events()[0], Event::WriteFailed(msg) if msg.contains("disk full")));
    Ok(())
}

#[tokio::test]
async fn silent_sensors_end_run_after_rejection_limit() -> Result<()> {
    // Arrange
    let counters = TransportCounters::new();
    let source = DualHumidity::new(
        ScriptedTransport::open(&counters, "inflow", &[]),
        ScriptedTransport::open(&counters, "outflow", &[]),
    );
    let sink = MemorySink::<JointRecord>::new();
    let notifier = RecordingNotifier::new();
    let signal = CancellationSignal::new();
    let (phase, _) = watch::channel(LoopPhase::Idle);
    let settings = LoopSettings {
        poll_interval: Duration::from_millis(1),
        max_consecutive_rejections: Some(3),
    };

    // Act
    let outcome = acquisition_loop(source, sink, &settings, &signal, &notifier, &phase).await?;

    // Assert
    assert_eq!(outcome.reason, StopReason::SensorsSilent);
    assert_eq!(outcome.stats.skipped_cycles, 3);
    assert!(!signal.is_cancelled());
    Ok(())
}

#[tokio::test]
async fn zero_rejection_limit_means_retry_forever() -> Result<()> {
    // Arrange
    let counters = TransportCounters::new();
    let source = DualHumidity::new(
        ScriptedTransport::repeating(&counters, "inflow", &["10.0", "22.0"]),
        ScriptedTransport::repeating(&counters, "outflow", &["9.5", "21.0"]),
    );
    let sink = MemorySink::<JointRecord>::new();
    let records = sink.handle();
    let notifier = RecordingNotifier::new();
    let signal = CancellationSignal::new();
    let (phase, _) = watch::channel(LoopPhase::Idle);
    let settings = LoopSettings {
        poll_interval: POLL,
        max_consecutive_rejections: Some(0),
    };
    cancel_after(&signal, Duration::from_millis(40));

    // Act
    let outcome = acquisition_loop(source, sink, &settings, &signal, &notifier, &phase).await?;

    // Assert
    assert_eq!(outcome.reason, StopReason::Cancelled);
    assert!(outcome.stats.records_written >= 1);
    assert_eq!(records.lock().unwrap().len() as u64, outcome.stats.records_written);
    Ok(())
}

#[tokio::test]
async fn temperature_lines_are_consumed_back_to_back() -> Result<()> {
    // Arrange
    let settings = LoggerSettings {
        layout: SensorLayout::Temperature,
        ..LoggerSettings::default()
    }
    .loop_settings();
    let humidity_interval = LoggerSettings::default().loop_settings().poll_interval;
    let counters = TransportCounters::new();
    let source = SingleTemperature::new(ScriptedTransport::open(
        &counters,
        "temperature",
        &["20.0", "20.5", "21.0", "21.5", "22.0"],
    ));
    let sink = MemorySink::<TemperatureRecord>::new();
    let records = sink.handle();
    let notifier = RecordingNotifier::new();
    let signal = CancellationSignal::new();
    let (phase, _) = watch::channel(LoopPhase::Idle);
    cancel_after(&signal, humidity_interval / 10);

    // Act
    acquisition_loop(source, sink, &settings, &signal, &notifier, &phase).await?;

    // Assert
    let temperatures: Vec<f64> = records.lock().unwrap().iter().map(|r| r.temperature).collect();
    assert_eq!(temperatures, vec![20.0, 20.5, 21.0, 21.5, 22.0]);
    Ok(())
}

#[tokio::test]
async fn temperature_board_records_single_values() -> Result<()> {
    // Arrange
    let counters = TransportCounters::new();
    let source = SingleTemperature::new(ScriptedTransport::open(
        &counters,
        "temperature",
        &["24.5", "", "oops", "25.0"],
    ));
    let sink = MemorySink::<TemperatureRecord>::new();
    let records = sink.handle();
    let notifier = RecordingNotifier::new();
    let signal = CancellationSignal::new();
    let (phase, _) = watch::channel(LoopPhase::Idle);
    cancel_after(&signal, Duration::from_millis(60));

    // Act
    let outcome = acquisition_loop(source, sink, &settings(), &signal, &notifier, &phase).await?;

    // Assert
    let temperatures: Vec<f64> = records.lock().unwrap().iter().map(|r| r.temperature).collect();
    assert_eq!(temperatures, vec![24.5, 25.0]);
    assert!(outcome.stats.skipped_cycles >= 2);
    Ok(())
}

#[tokio::test]
async fn channels_come_back_open_after_the_loop() -> Result<()> {
    // Arrange
    let counters = TransportCounters::new();
    let source = DualHumidity::new(
        ScriptedTransport::open(&counters, "inflow", &[]),
        ScriptedTransport::open(&counters, "outflow", &[]),
    );
    let signal = CancellationSignal::new();
    signal.cancel();
    let (phase, _) = watch::channel(LoopPhase::Idle);

    // Act
    let outcome = acquisition_loop(
        source,
        MemorySink::<JointRecord>::new(),
        &settings(),
        &signal,
        &RecordingNotifier::new(),
        &phase,
    )
    .await?;

    // Assert
    assert_eq!(counters.closes(), 0);
    humilog_lib::sensing::Acquire::close(outcome.source)?;
    assert_eq!(counters.closes(), 2);
    assert_eq!(counters.opens(), 2);
    Ok(())
}
