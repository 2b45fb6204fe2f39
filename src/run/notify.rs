use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::RunConfig;
use crate::sensing::CycleRejection;

use super::state::{RunStats, StopReason};

/// Run identity announced before the first cycle.
#[derive(Debug, Clone)]
pub struct RunHeader {
    pub run_id: Uuid,
    pub config: RunConfig,
    pub path: PathBuf,
    pub started_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub config: RunConfig,
    pub path: PathBuf,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub stats: RunStats,
    pub reason: StopReason,
}

/// Operator-visible progress. Every cycle produces exactly one of
/// `recorded`, `waiting` or `write_failed`.
pub trait Notifier: Send + Sync + 'static {
    fn run_started(&self, header: &RunHeader);

    fn recorded(&self, record: &dyn fmt::Display);

    fn waiting(&self, rejection: &CycleRejection);

    fn write_failed(&self, err: &anyhow::Error);

    fn run_finished(&self, summary: &RunSummary);

    /// The run could not start (transport gone, sink would not open).
    fn run_failed(&self, config: &RunConfig, err: &anyhow::Error);
}
