use std::fmt;

use chrono::{DateTime, Local, Utc};

use crate::psychro;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Which board a value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SensorRole {
    Inflow,
    Outflow,
    Temperature,
}

impl SensorRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            SensorRole::Inflow => "Inflow",
            SensorRole::Outflow => "Outflow",
            SensorRole::Temperature => "Temperature",
        }
    }
}

impl fmt::Display for SensorRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One validated humidity board reading. Only built from a complete frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reading {
    pub temperature: f64,
    pub absolute_humidity: f64,
    pub relative_humidity: f64,
}

impl Reading {
    pub fn derive(temperature: f64, absolute_humidity: f64) -> Self {
        Self {
            temperature,
            absolute_humidity,
            relative_humidity: psychro::relative_humidity(temperature, absolute_humidity),
        }
    }
}

/// Inflow and outflow readings taken in the same cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct JointRecord {
    pub timestamp: DateTime<Utc>,
    pub inflow: Reading,
    pub outflow: Reading,
}

impl fmt::Display for JointRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Saved: {}", local_timestamp(&self.timestamp))?;
        for (role, reading) in [
            (SensorRole::Inflow, &self.inflow),
            (SensorRole::Outflow, &self.outflow),
        ] {
            writeln!(
                f,
                "  {role} - Temp: {:.2}°C, AH: {:.2}, RH: {:.2}%",
                reading.temperature, reading.absolute_humidity, reading.relative_humidity
            )?;
        }
        write!(f, "{}", "-".repeat(50))
    }
}

/// Single-board temperature sample.
#[derive(Debug, Clone, PartialEq)]
pub struct TemperatureRecord {
    pub timestamp: DateTime<Utc>,
    pub temperature: f64,
}

impl fmt::Display for TemperatureRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Saved: {}, Temperature: {}°C",
            local_timestamp(&self.timestamp),
            self.temperature
        )
    }
}

/// Wall-clock rendering used in files and on the console.
pub fn local_timestamp(timestamp: &DateTime<Utc>) -> String {
    timestamp
        .with_timezone(&Local)
        .format(TIMESTAMP_FORMAT)
        .to_string()
}
