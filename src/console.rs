//! Operator console: prompts, stop keys and progress output.
//!
//! Stdin is read on a dedicated thread and forwarded line by line, so a run's
//! stop listener and the prompts between runs share one reader without
//! racing for the terminal.

use std::fmt;
use std::fs;
use std::future::Future;
use std::io::{self, BufRead, Write};
use std::thread;

use anyhow::{Context, Result};
use tokio::sync::mpsc;

use crate::models::{RunConfig, SensorLayout};
use crate::run::{Notifier, Operator, RunHeader, RunSummary, StopEvent, StopInput, StopReason};
use crate::sensing::CycleRejection;

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_error, log_info};

const STOP_KEY: &str = "q";

pub struct Console {
    lines: mpsc::UnboundedReceiver<String>,
    stdin_closed: bool,
}

impl Console {
    /// Starts the stdin reader thread.
    pub fn spawn() -> Result<Self> {
        let (tx, rx) = mpsc::unbounded_channel();

        thread::Builder::new()
            .name("humilog-stdin".into())
            .spawn(move || {
                for line in io::stdin().lock().lines() {
                    match line {
                        Ok(line) => {
                            if tx.send(line).is_err() {
                                break;
                            }
                        }
                        Err(err) => {
                            log_error!("stdin read failed: {err}");
                            break;
                        }
                    }
                }
                log_info!("stdin closed");
            })
            .context("failed to spawn stdin reader thread")?;

        Ok(Self::from_lines(rx))
    }

    /// Console fed from any line source.
    pub fn from_lines(lines: mpsc::UnboundedReceiver<String>) -> Self {
        Self {
            lines,
            stdin_closed: false,
        }
    }

    /// Next input line; `None` once stdin is closed or on Ctrl-C.
    pub async fn read_line(&mut self) -> Option<String> {
        if self.stdin_closed {
            return None;
        }
        tokio::select! {
            line = self.lines.recv() => {
                if line.is_none() {
                    self.stdin_closed = true;
                }
                line
            }
            _ = tokio::signal::ctrl_c() => {
                println!("\nProgram interrupted by user");
                None
            }
        }
    }

    pub async fn prompt(&mut self, text: &str) -> Result<Option<String>> {
        print!("{text}");
        io::stdout().flush().context("failed to flush stdout")?;
        Ok(self.read_line().await.map(|line| line.trim().to_string()))
    }

    /// Asks for a port; `None` if the operator gave nothing usable.
    pub async fn ask_port(&mut self, label: &str, example: &str) -> Result<Option<String>> {
        let answer = self
            .prompt(&format!("Enter port for {label} board (e.g., {example}): "))
            .await?;
        Ok(answer.filter(|port| !port.is_empty()))
    }
}

/// Silence reads as "still waiting"; garbage on the line is called out.
fn waiting_message(layout: SensorLayout, rejection: &CycleRejection) -> String {
    let boards = match layout {
        SensorLayout::Humidity => "both sensors",
        SensorLayout::Temperature => "the sensor",
    };
    if rejection.all_timeouts() {
        format!("Waiting for valid data from {boards}... ({rejection})")
    } else {
        format!("Invalid data from {boards}, skipping this reading ({rejection})")
    }
}

fn parameter_prompts(layout: SensorLayout) -> (&'static str, &'static str) {
    match layout {
        SensorLayout::Humidity => ("Enter FlowRate: ", "Enter Amount of desiccant: "),
        SensorLayout::Temperature => ("Enter air pressure value: ", "Enter wattage value: "),
    }
}

impl StopInput for Console {
    fn wait_for_stop(&mut self) -> impl Future<Output = Result<StopEvent>> + Send {
        async move {
            loop {
                if self.stdin_closed {
                    tokio::signal::ctrl_c()
                        .await
                        .context("failed to listen for Ctrl-C")?;
                    return Ok(StopEvent::Interrupt);
                }

                tokio::select! {
                    line = self.lines.recv() => match line {
                        Some(line) if line.trim().eq_ignore_ascii_case(STOP_KEY) => {
                            println!("\nStopping data recording...");
                            return Ok(StopEvent::Keypress);
                        }
                        Some(_) => {}
                        None => self.stdin_closed = true,
                    },
                    signal = tokio::signal::ctrl_c() => {
                        signal.context("failed to listen for Ctrl-C")?;
                        println!("\nStopping data recording...");
                        return Ok(StopEvent::Interrupt);
                    }
                }
            }
        }
    }
}

impl Operator for Console {
    fn next_run(
        &mut self,
        layout: SensorLayout,
    ) -> impl Future<Output = Result<Option<RunConfig>>> + Send {
        async move {
            let (first_prompt, second_prompt) = parameter_prompts(layout);
            loop {
                let base_prompt = format!(
                    "Enter base filename (press Enter for '{}'): ",
                    layout.default_base_name()
                );
                let Some(base_name) = self.prompt(&base_prompt).await? else {
                    return Ok(None);
                };

                let Some(first) = self.prompt(first_prompt).await? else {
                    return Ok(None);
                };
                let Ok(first) = first.parse::<f64>() else {
                    println!("Invalid input. Please enter numeric values.");
                    continue;
                };

                let Some(second) = self.prompt(second_prompt).await? else {
                    return Ok(None);
                };
                let Ok(second) = second.parse::<f64>() else {
                    println!("Invalid input. Please enter numeric values.");
                    continue;
                };

                return Ok(Some(RunConfig::new(
                    &base_name,
                    layout.parameters(first, second),
                )));
            }
        }
    }

    fn another_run(&mut self) -> impl Future<Output = Result<bool>> + Send {
        async move {
            let answer = self
                .prompt("Do you want to create a new file? (y/n): ")
                .await?
                .unwrap_or_default()
                .to_lowercase();
            let again = answer == "y" || answer == "yes";
            if again {
                println!("\n{}", "=".repeat(60));
            }
            Ok(again)
        }
    }
}

/// Prints run progress to stdout.
pub struct ConsoleNotifier {
    layout: SensorLayout,
}

impl ConsoleNotifier {
    pub fn new(layout: SensorLayout) -> Self {
        Self { layout }
    }
}

impl Notifier for ConsoleNotifier {
    fn run_started(&self, header: &RunHeader) {
        if let Ok(cwd) = std::env::current_dir() {
            println!("\nCurrent working directory: {}", cwd.display());
        }
        let full_path = fs::canonicalize(&header.path).unwrap_or_else(|_| header.path.clone());
        println!("CSV file will be saved at: {}", full_path.display());
        println!("Recording data to: {}", header.config.file_name());
        println!("Press '{STOP_KEY}' then Enter (or Ctrl-C) to stop recording...\n");
    }

    fn recorded(&self, record: &dyn fmt::Display) {
        println!("{record}");
    }

    fn waiting(&self, rejection: &CycleRejection) {
        println!("{}", waiting_message(self.layout, rejection));
    }

    fn write_failed(&self, err: &anyhow::Error) {
        println!("Error saving to CSV: {err:#}");
    }

    fn run_finished(&self, summary: &RunSummary) {
        if summary.reason == StopReason::SensorsSilent {
            println!(
                "\nNo valid data for {} consecutive cycles; recording stopped.",
                summary.stats.consecutive_rejections
            );
        }
        println!(
            "\nData recording stopped. File saved as: {}",
            summary.config.file_name()
        );
        println!(
            "  {} cycles, {} records written, {} skipped, {} write failures",
            summary.stats.cycles,
            summary.stats.records_written,
            summary.stats.skipped_cycles,
            summary.stats.write_failures
        );
    }

    fn run_failed(&self, config: &RunConfig, err: &anyhow::Error) {
        println!(
            "Could not start recording to {}: {err:#}",
            config.file_name()
        );
    }
}
