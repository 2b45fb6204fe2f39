use anyhow::{Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::PathBuf,
    sync::{PoisonError, RwLock},
    time::Duration,
};

use crate::models::SensorLayout;
use crate::sensing::{LoopSettings, SerialOptions};

pub const SETTINGS_ENV_VAR: &str = "HUMILOG_SETTINGS";
const DEFAULT_SETTINGS_FILE: &str = "humilog.json";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct LoggerSettings {
    pub layout: SensorLayout,
    pub inflow_port: Option<String>,
    pub outflow_port: Option<String>,
    pub temperature_port: Option<String>,
    pub baud_rate: u32,
    pub read_timeout_ms: u64,
    pub poll_interval_ms: u64,
    /// A temperature board prints one line per sample and is read back to
    /// back; the read timeout alone paces the loop.
    pub temperature_poll_interval_ms: u64,
    /// Boards reset when their port opens; wait this long before reading.
    pub settle_delay_ms: u64,
    pub output_dir: PathBuf,
    pub max_consecutive_rejections: Option<u32>,
    pub simulate: bool,
}

impl Default for LoggerSettings {
    fn default() -> Self {
        Self {
            layout: SensorLayout::Humidity,
            inflow_port: None,
            outflow_port: None,
            temperature_port: None,
            baud_rate: 9600,
            read_timeout_ms: 1000,
            poll_interval_ms: 1000,
            temperature_poll_interval_ms: 0,
            settle_delay_ms: 2000,
            output_dir: PathBuf::from("."),
            max_consecutive_rejections: None,
            simulate: false,
        }
    }
}

impl LoggerSettings {
    pub fn serial_options(&self) -> SerialOptions {
        SerialOptions {
            baud_rate: self.baud_rate,
            read_timeout: Duration::from_millis(self.read_timeout_ms),
        }
    }

    pub fn loop_settings(&self) -> LoopSettings {
        let interval_ms = match self.layout {
            SensorLayout::Humidity => self.poll_interval_ms,
            SensorLayout::Temperature => self.temperature_poll_interval_ms,
        };
        LoopSettings {
            poll_interval: Duration::from_millis(interval_ms),
            max_consecutive_rejections: self.max_consecutive_rejections,
        }
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }
}

/// Command-line path, else `HUMILOG_SETTINGS`, else `humilog.json`.
pub fn resolve_settings_path(cli_path: Option<PathBuf>) -> PathBuf {
    cli_path
        .or_else(|| std::env::var_os(SETTINGS_ENV_VAR).map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_SETTINGS_FILE))
}

pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<LoggerSettings>,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_else(|err| {
                warn!(
                    "Ignoring malformed settings in {}: {err}; using defaults",
                    path.display()
                );
                LoggerSettings::default()
            })
        } else {
            LoggerSettings::default()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn current(&self) -> LoggerSettings {
        self.data
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Applies `change` and writes the result back to disk.
    pub fn update(&self, change: impl FnOnce(&mut LoggerSettings)) -> Result<()> {
        let mut guard = self.data.write().unwrap_or_else(PoisonError::into_inner);
        change(&mut *guard);
        self.persist(&guard)
    }

    fn persist(&self, data: &LoggerSettings) -> Result<()> {
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }
}
