use serde::Serialize;

use crate::models::{local_timestamp, JointRecord, TemperatureRecord};

/// Records that flatten into one CSV row.
pub trait CsvRecord {
    type Row: Serialize;

    fn to_row(&self) -> Self::Row;
}

#[derive(Debug, Serialize)]
pub struct HumidityRow {
    #[serde(rename = "Timestamp")]
    pub timestamp: String,
    #[serde(rename = "Inflow Temp")]
    pub inflow_temp: f64,
    #[serde(rename = "Inflow Absolute Humidity")]
    pub inflow_absolute_humidity: f64,
    #[serde(rename = "Inflow Relative Humidity")]
    pub inflow_relative_humidity: f64,
    #[serde(rename = "Outflow Temp")]
    pub outflow_temp: f64,
    #[serde(rename = "Outflow Absolute Humidity")]
    pub outflow_absolute_humidity: f64,
    #[serde(rename = "Outflow Relative Humidity")]
    pub outflow_relative_humidity: f64,
}

impl CsvRecord for JointRecord {
    type Row = HumidityRow;

    fn to_row(&self) -> HumidityRow {
        HumidityRow {
            timestamp: local_timestamp(&self.timestamp),
            inflow_temp: self.inflow.temperature,
            inflow_absolute_humidity: self.inflow.absolute_humidity,
            inflow_relative_humidity: self.inflow.relative_humidity,
            outflow_temp: self.outflow.temperature,
            outflow_absolute_humidity: self.outflow.absolute_humidity,
            outflow_relative_humidity: self.outflow.relative_humidity,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TemperatureRow {
    #[serde(rename = "Timestamp")]
    pub timestamp: String,
    #[serde(rename = "Temperature (°C)")]
    pub temperature: f64,
}

impl CsvRecord for TemperatureRecord {
    type Row = TemperatureRow;

    fn to_row(&self) -> TemperatureRow {
        TemperatureRow {
            timestamp: local_timestamp(&self.timestamp),
            temperature: self.temperature,
        }
    }
}
