#![allow(dead_code)]

use std::collections::VecDeque;
use std::fmt;
use std::future::Future;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{anyhow, Result};
use humilog_lib::models::{RunConfig, SensorLayout};
use humilog_lib::recording::RecordSink;
use humilog_lib::run::{
    Notifier, Operator, RunHeader, RunSummary, StopEvent, StopInput, StopReason,
};
use humilog_lib::sensing::{CycleRejection, LineTransport};
use uuid::Uuid;

/// Open/read/close counts shared by every transport of a test.
#[derive(Debug, Default)]
pub struct TransportCounters {
    pub opens: AtomicUsize,
    pub reads: AtomicUsize,
    pub closes: AtomicUsize,
}

impl TransportCounters {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

/// Plays back scripted lines, then either repeats a loop of lines or reports
/// timeouts (empty lines) forever.
pub struct ScriptedTransport {
    label: String,
    script: VecDeque<String>,
    repeat: Vec<String>,
    position: usize,
    counters: Arc<TransportCounters>,
}

impl ScriptedTransport {
    pub fn open(counters: &Arc<TransportCounters>, label: &str, lines: &[&str]) -> Self {
        counters.opens.fetch_add(1, Ordering::SeqCst);
        Self {
            label: label.to_string(),
            script: lines.iter().map(|line| line.to_string()).collect(),
            repeat: Vec::new(),
            position: 0,
            counters: Arc::clone(counters),
        }
    }

    pub fn repeating(counters: &Arc<TransportCounters>, label: &str, lines: &[&str]) -> Self {
        let mut transport = Self::open(counters, label, &[]);
        transport.repeat = lines.iter().map(|line| line.to_string()).collect();
        transport
    }
}

impl LineTransport for ScriptedTransport {
    fn read_line(&mut self) -> Result<String> {
        self.counters.reads.fetch_add(1, Ordering::SeqCst);
        if let Some(line) = self.script.pop_front() {
            return Ok(line);
        }
        if self.repeat.is_empty() {
            return Ok(String::new());
        }
        let line = self.repeat[self.position % self.repeat.len()].clone();
        self.position += 1;
        Ok(line)
    }

    fn describe(&self) -> &str {
        &self.label
    }

    fn close(self) -> Result<()> {
        self.counters.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Keeps every appended record in memory.
pub struct MemorySink<R> {
    pub records: Arc<Mutex<Vec<R>>>,
    failures_left: usize,
}

impl<R> MemorySink<R> {
    pub fn new() -> Self {
        Self {
            records: Arc::new(Mutex::new(Vec::new())),
            failures_left: 0,
        }
    }

    /// Fails the first `count` appends.
    pub fn failing_first(count: usize) -> Self {
        Self {
            records: Arc::new(Mutex::new(Vec::new())),
            failures_left: count,
        }
    }

    pub fn handle(&self) -> Arc<Mutex<Vec<R>>> {
        Arc::clone(&self.records)
    }
}

impl<R: Clone + Send + 'static> RecordSink<R> for MemorySink<R> {
    fn append(&mut self, record: &R) -> Result<()> {
        if self.failures_left > 0 {
            self.failures_left -= 1;
            return Err(anyhow!("disk full"));
        }
        self.records
            .lock()
            .map_err(|_| anyhow!("poisoned"))?
            .push(record.clone());
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Started(String),
    Recorded(String),
    Waiting(String),
    WriteFailed(String),
    Finished(StopReason, u64),
    Failed(String),
}

#[derive(Clone, Default)]
pub struct RecordingNotifier {
    pub events: Arc<Mutex<Vec<Event>>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    pub fn count(&self, matches: impl Fn(&Event) -> bool) -> usize {
        self.events().iter().filter(|event| matches(event)).count()
    }

    fn push(&self, event: Event) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}

impl Notifier for RecordingNotifier {
    fn run_started(&self, header: &RunHeader) {
        self.push(Event::Started(header.config.file_name()));
    }

    fn recorded(&self, record: &dyn fmt::Display) {
        self.push(Event::Recorded(record.to_string()));
    }

    fn waiting(&self, rejection: &CycleRejection) {
        self.push(Event::Waiting(rejection.to_string()));
    }

    fn write_failed(&self, err: &anyhow::Error) {
        self.push(Event::WriteFailed(format!("{err:#}")));
    }

    fn run_finished(&self, summary: &RunSummary) {
        self.push(Event::Finished(summary.reason, summary.stats.records_written));
    }

    fn run_failed(&self, config: &RunConfig, err: &anyhow::Error) {
        self.push(Event::Failed(format!("{}: {err:#}", config.file_name())));
    }
}

/// Operator that answers prompts from a script and presses stop after a delay.
pub struct ScriptedOperator {
    runs: VecDeque<RunConfig>,
    answers: VecDeque<bool>,
    stop_after: Duration,
    pub stops: Arc<AtomicUsize>,
}

impl ScriptedOperator {
    pub fn new(runs: Vec<RunConfig>, answers: Vec<bool>, stop_after: Duration) -> Self {
        Self {
            runs: runs.into(),
            answers: answers.into(),
            stop_after,
            stops: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl StopInput for ScriptedOperator {
    fn wait_for_stop(&mut self) -> impl Future<Output = Result<StopEvent>> + Send {
        let delay = self.stop_after;
        let stops = Arc::clone(&self.stops);
        async move {
            tokio::time::sleep(delay).await;
            stops.fetch_add(1, Ordering::SeqCst);
            Ok(StopEvent::Keypress)
        }
    }
}

impl Operator for ScriptedOperator {
    fn next_run(
        &mut self,
        _layout: SensorLayout,
    ) -> impl Future<Output = Result<Option<RunConfig>>> + Send {
        let next = self.runs.pop_front();
        async move { Ok(next) }
    }

    fn another_run(&mut self) -> impl Future<Output = Result<bool>> + Send {
        let answer = self.answers.pop_front().unwrap_or(false);
        async move { Ok(answer) }
    }
}

/// Fresh directory under the system temp dir.
pub fn scratch_dir() -> PathBuf {
    let dir = std::env::temp_dir().join(format!("humilog-test-{}", Uuid::new_v4()));
    std::fs::create_dir_all(&dir).expect("create scratch dir");
    dir
}
