//! Frame parsing for the board line protocol.
//!
//! A humidity board prints absolute humidity then temperature, one value per
//! line. A temperature board prints one temperature per line. An empty line
//! means the transport read window elapsed with nothing received.

use std::fmt;

use thiserror::Error;

/// The value a line was expected to carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameField {
    AbsoluteHumidity,
    Temperature,
}

impl fmt::Display for FrameField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrameField::AbsoluteHumidity => f.write_str("absolute humidity"),
            FrameField::Temperature => f.write_str("temperature"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum FrameRejection {
    #[error("no {0} line within the read window")]
    Timeout(FrameField),
    #[error("{field} line {line:?} is not a number")]
    Malformed { field: FrameField, line: String },
    #[error("transport read failed: {0}")]
    Transport(String),
}

impl FrameRejection {
    pub fn is_timeout(&self) -> bool {
        matches!(self, FrameRejection::Timeout(_))
    }
}

/// Parsed humidity board frame, before relative humidity is derived.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HumidityFrame {
    pub absolute_humidity: f64,
    pub temperature: f64,
}

pub fn parse_humidity_frame(
    humidity_line: &str,
    temperature_line: &str,
) -> Result<HumidityFrame, FrameRejection> {
    let absolute_humidity = parse_field(humidity_line, FrameField::AbsoluteHumidity)?;
    let temperature = parse_field(temperature_line, FrameField::Temperature)?;
    Ok(HumidityFrame {
        absolute_humidity,
        temperature,
    })
}

pub fn parse_temperature_frame(line: &str) -> Result<f64, FrameRejection> {
    parse_field(line, FrameField::Temperature)
}

fn parse_field(line: &str, field: FrameField) -> Result<f64, FrameRejection> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Err(FrameRejection::Timeout(field));
    }

    trimmed
        .parse::<f64>()
        .map_err(|_| FrameRejection::Malformed {
            field,
            line: trimmed.to_string(),
        })
}
