use std::future::Future;
use std::path::PathBuf;

use anyhow::{anyhow, bail, Context, Result};
use chrono::Utc;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::models::{RunConfig, SensorLayout};
use crate::recording::{CsvRecord, CsvSink};
use crate::sensing::{acquisition_loop, Acquire, LoopSettings};

use super::notify::{Notifier, RunHeader, RunSummary};
use super::signal::{spawn_stop_listener, CancellationSignal, StopInput};
use super::state::LoopPhase;

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_error, log_info};

/// The person at the keyboard: supplies run parameters, decides whether to
/// record another file, and stops runs.
pub trait Operator: StopInput {
    /// Parameters for the next run, or `None` to quit.
    fn next_run(
        &mut self,
        layout: SensorLayout,
    ) -> impl Future<Output = Result<Option<RunConfig>>> + Send;

    fn another_run(&mut self) -> impl Future<Output = Result<bool>> + Send;
}

#[derive(Debug, Clone)]
pub struct ControllerSettings {
    pub layout: SensorLayout,
    pub output_dir: PathBuf,
    pub loop_settings: LoopSettings,
}

/// Sequences runs over one set of sensor channels.
///
/// The channels arrive already open and are closed exactly once, when
/// [`RunController::run_all`] returns, however many runs happened.
pub struct RunController<A, O, N> {
    source: Option<A>,
    operator: Option<O>,
    notifier: N,
    settings: ControllerSettings,
    phase: watch::Sender<LoopPhase>,
}

impl<A, O, N> RunController<A, O, N>
where
    A: Acquire,
    A::Record: CsvRecord,
    O: Operator,
    N: Notifier,
{
    pub fn new(source: A, operator: O, notifier: N, settings: ControllerSettings) -> Self {
        let (phase, _) = watch::channel(LoopPhase::Idle);
        Self {
            source: Some(source),
            operator: Some(operator),
            notifier,
            settings,
            phase,
        }
    }

    pub fn subscribe_phase(&self) -> watch::Receiver<LoopPhase> {
        self.phase.subscribe()
    }

    /// Runs until the operator declines another run, then closes the channels.
    pub async fn run_all(mut self) -> Result<Vec<RunSummary>> {
        let result = self.session().await;

        let closed = match self.source.take() {
            Some(source) => source.close().context("failed to close sensor channels"),
            None => Ok(()),
        };
        log_info!("sensor channels closed");

        let summaries = result?;
        closed?;
        Ok(summaries)
    }

    async fn session(&mut self) -> Result<Vec<RunSummary>> {
        let layout = self.settings.layout;
        let mut summaries = Vec::new();

        loop {
            let operator = self
                .operator
                .as_mut()
                .ok_or_else(|| anyhow!("operator input unavailable"))?;
            let Some(config) = operator.next_run(layout).await? else {
                break;
            };

            match self.run_once(config.clone()).await {
                Ok(summary) => {
                    self.notifier.run_finished(&summary);
                    summaries.push(summary);
                }
                Err(err) => {
                    log_error!("run for {} failed: {err:#}", config.file_name());
                    self.notifier.run_failed(&config, &err);
                    if self.source.is_none() || self.operator.is_none() {
                        return Err(err);
                    }
                }
            }

            let operator = self
                .operator
                .as_mut()
                .ok_or_else(|| anyhow!("operator input unavailable"))?;
            if !operator.another_run().await? {
                break;
            }
        }

        Ok(summaries)
    }

    /// One run: open the sink, listen for stop, acquire until stopped.
    ///
    /// Fails without touching the channels if the sink cannot be opened.
    pub async fn run_once(&mut self, config: RunConfig) -> Result<RunSummary> {
        if config.parameters.layout() != self.settings.layout {
            bail!(
                "run parameters are for {:?} boards but {:?} boards are attached",
                config.parameters.layout(),
                self.settings.layout
            );
        }
        if self.source.is_none() {
            bail!("sensor channels unavailable");
        }
        if self.operator.is_none() {
            bail!("operator input unavailable");
        }

        let path = self.settings.output_dir.join(config.file_name());
        let sink = CsvSink::open(&path)?;

        let header = RunHeader {
            run_id: Uuid::new_v4(),
            config,
            path,
            started_at: Utc::now(),
        };
        log_info!("run {} recording to {}", header.run_id, header.path.display());
        self.notifier.run_started(&header);

        let (Some(source), Some(operator)) = (self.source.take(), self.operator.take()) else {
            bail!("sensor channels or operator input unavailable");
        };

        let signal = CancellationSignal::new();
        let run_scope = CancellationToken::new();
        let listener = spawn_stop_listener(operator, signal.clone(), run_scope.clone());

        let outcome = acquisition_loop(
            source,
            sink,
            &self.settings.loop_settings,
            &signal,
            &self.notifier,
            &self.phase,
        )
        .await;

        run_scope.cancel();
        let outcome = outcome?;
        self.source = Some(outcome.source);
        self.operator = Some(listener.await.context("stop listener task failed to join")?);

        log_info!(
            "run {} finished ({:?}): {} records written",
            header.run_id,
            outcome.reason,
            outcome.stats.records_written
        );

        Ok(RunSummary {
            run_id: header.run_id,
            config: header.config,
            path: header.path,
            started_at: header.started_at,
            finished_at: Utc::now(),
            stats: outcome.stats,
            reason: outcome.reason,
        })
    }
}
