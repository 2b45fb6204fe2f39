use anyhow::{Context, Result};
use tokio::sync::watch;
use tokio::time::Duration;

use crate::recording::RecordSink;
use crate::run::{CancellationSignal, LoopPhase, Notifier, RunStats, StopReason};

use super::source::{Acquire, CycleRejection};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_error, log_info, log_warn};

#[derive(Debug, Clone, Copy)]
pub struct LoopSettings {
    /// Pause after each cycle, giving the boards time to print the next frame.
    pub poll_interval: Duration,
    /// End the run after this many skipped cycles in a row. `None` or `0`
    /// retries forever.
    pub max_consecutive_rejections: Option<u32>,
}

impl Default for LoopSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
            max_consecutive_rejections: None,
        }
    }
}

/// Source and sink handed back once the loop stops.
pub struct LoopOutcome<A, S> {
    pub source: A,
    pub sink: S,
    pub stats: RunStats,
    pub reason: StopReason,
}

enum CycleOutcome<R> {
    Recorded(R),
    Skipped(CycleRejection),
    WriteFailed(anyhow::Error),
}

/// Drives one run: poll, persist, sleep, until `signal` is set.
///
/// The signal is checked only between cycles. A cycle that has started
/// always finishes, including its sink write, and no write happens once the
/// signal has been observed.
pub async fn acquisition_loop<A, S, N>(
    source: A,
    sink: S,
    settings: &LoopSettings,
    signal: &CancellationSignal,
    notifier: &N,
    phase: &watch::Sender<LoopPhase>,
) -> Result<LoopOutcome<A, S>>
where
    A: Acquire,
    S: RecordSink<A::Record>,
    N: Notifier,
{
    phase.send_replace(LoopPhase::Running);
    let result = drive(source, sink, settings, signal, notifier, phase).await;
    phase.send_replace(LoopPhase::Idle);
    result
}

async fn drive<A, S, N>(
    mut source: A,
    mut sink: S,
    settings: &LoopSettings,
    signal: &CancellationSignal,
    notifier: &N,
    phase: &watch::Sender<LoopPhase>,
) -> Result<LoopOutcome<A, S>>
where
    A: Acquire,
    S: RecordSink<A::Record>,
    N: Notifier,
{
    let mut stats = RunStats::default();

    let reason = loop {
        if signal.is_cancelled() {
            break StopReason::Cancelled;
        }
        if let Some(limit) = settings.max_consecutive_rejections.filter(|&n| n > 0) {
            if stats.consecutive_rejections >= limit {
                log_warn!("no complete frame in {limit} consecutive cycles, ending run");
                break StopReason::SensorsSilent;
            }
        }

        // Transport reads block, so the cycle runs off the async workers.
        let (returned_source, returned_sink, outcome) = tokio::task::spawn_blocking(move || {
            let outcome = run_cycle(&mut source, &mut sink);
            (source, sink, outcome)
        })
        .await
        .context("acquisition cycle worker join failed")?;
        source = returned_source;
        sink = returned_sink;

        match outcome {
            CycleOutcome::Recorded(record) => {
                stats.record_written();
                log_debug!("cycle {} recorded", stats.cycles);
                notifier.recorded(&record);
            }
            CycleOutcome::Skipped(rejection) => {
                stats.record_skipped();
                log_debug!("cycle {} skipped: {rejection}", stats.cycles);
                notifier.waiting(&rejection);
            }
            CycleOutcome::WriteFailed(err) => {
                stats.record_write_failure();
                log_error!("cycle {} write failed: {err:#}", stats.cycles);
                notifier.write_failed(&err);
            }
        }

        tokio::select! {
            _ = tokio::time::sleep(settings.poll_interval) => {}
            _ = signal.cancelled() => {}
        }
    };

    phase.send_replace(LoopPhase::Stopping);
    log_info!(
        "acquisition stopping ({reason:?}) after {} cycles, {} records",
        stats.cycles,
        stats.records_written
    );

    if let Err(err) = sink.close() {
        log_error!("closing sink failed: {err:#}");
        stats.write_failures += 1;
        notifier.write_failed(&err);
    }

    Ok(LoopOutcome {
        source,
        sink,
        stats,
        reason,
    })
}

fn run_cycle<A, S>(source: &mut A, sink: &mut S) -> CycleOutcome<A::Record>
where
    A: Acquire,
    S: RecordSink<A::Record>,
{
    match source.acquire() {
        Ok(record) => match sink.append(&record) {
            Ok(()) => CycleOutcome::Recorded(record),
            Err(err) => CycleOutcome::WriteFailed(err),
        },
        Err(rejection) => CycleOutcome::Skipped(rejection),
    }
}
