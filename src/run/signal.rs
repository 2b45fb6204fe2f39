use std::future::Future;

use anyhow::Result;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_error, log_info};

/// How the operator asked for the run to stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopEvent {
    /// `q` on the console.
    Keypress,
    /// Ctrl-C.
    Interrupt,
}

/// Source of a single discrete stop request.
pub trait StopInput: Send + 'static {
    fn wait_for_stop(&mut self) -> impl Future<Output = Result<StopEvent>> + Send;
}

/// Per-run stop flag. Created fresh for every run; the listener sets it and
/// the acquisition loop only ever reads it.
#[derive(Debug, Clone, Default)]
pub struct CancellationSignal {
    token: CancellationToken,
}

impl CancellationSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolves once the signal is set.
    pub async fn cancelled(&self) {
        self.token.cancelled().await
    }
}

/// Spawns the run's only stop listener.
///
/// It sets `signal` on the first stop event and returns. A failed stop input
/// also sets it, since the run could not be stopped otherwise. If `run_scope` is
/// cancelled first (the run ended some other way) it returns without touching
/// the signal. Either way the input is handed back through the join handle so
/// the next run can listen on it again.
pub fn spawn_stop_listener<I: StopInput>(
    mut input: I,
    signal: CancellationSignal,
    run_scope: CancellationToken,
) -> JoinHandle<I> {
    tokio::spawn(async move {
        tokio::select! {
            event = input.wait_for_stop() => match event {
                Ok(event) => {
                    log_info!("stop requested ({event:?})");
                    signal.cancel();
                }
                Err(err) => {
                    log_error!("stop input failed, ending run: {err:#}");
                    signal.cancel();
                }
            },
            _ = run_scope.cancelled() => {}
        }
        input
    })
}
