use serde::{Deserialize, Serialize};

/// Which boards are attached.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum SensorLayout {
    /// Inflow and outflow humidity boards, two lines per reading.
    #[default]
    Humidity,
    /// One temperature board, one line per reading.
    Temperature,
}

impl SensorLayout {
    pub fn default_base_name(&self) -> &'static str {
        match self {
            SensorLayout::Humidity => "AbsoluteHumidityData",
            SensorLayout::Temperature => "temperature_data",
        }
    }

    /// Builds the run parameters for this layout from the two prompted values.
    pub fn parameters(&self, first: f64, second: f64) -> RunParameters {
        match self {
            SensorLayout::Humidity => RunParameters::Flow {
                flow_rate: first,
                desiccant_amount: second,
            },
            SensorLayout::Temperature => RunParameters::Heating {
                air_pressure: first,
                wattage: second,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RunParameters {
    Flow { flow_rate: f64, desiccant_amount: f64 },
    Heating { air_pressure: f64, wattage: f64 },
}

impl RunParameters {
    pub fn layout(&self) -> SensorLayout {
        match self {
            RunParameters::Flow { .. } => SensorLayout::Humidity,
            RunParameters::Heating { .. } => SensorLayout::Temperature,
        }
    }

    /// File-name keys paired with their values, in file-name order.
    fn tagged(&self) -> [(&'static str, f64); 2] {
        match *self {
            RunParameters::Flow {
                flow_rate,
                desiccant_amount,
            } => [("FR", flow_rate), ("D", desiccant_amount)],
            RunParameters::Heating {
                air_pressure,
                wattage,
            } => [("P", air_pressure), ("W", wattage)],
        }
    }
}

/// Parameters of one recording run. Fixed once the run starts.
#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    pub base_name: String,
    pub parameters: RunParameters,
}

impl RunConfig {
    /// Blank base names fall back to the layout default.
    pub fn new(base_name: &str, parameters: RunParameters) -> Self {
        let trimmed = base_name.trim();
        let base_name = if trimmed.is_empty() {
            parameters.layout().default_base_name().to_string()
        } else {
            trimmed.to_string()
        };

        Self {
            base_name,
            parameters,
        }
    }

    /// Output file name, e.g. `AbsoluteHumidityData_FR5.0_D2.5.csv`.
    /// Same config gives the same name, so repeated runs append.
    pub fn file_name(&self) -> String {
        let mut name = self.base_name.clone();
        for (key, value) in self.parameters.tagged() {
            name.push('_');
            name.push_str(key);
            name.push_str(&format_parameter(value));
        }
        name.push_str(".csv");
        name
    }
}

/// Whole numbers keep one fractional digit (`5` renders as `5.0`).
fn format_parameter(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 {
        format!("{value:.1}")
    } else {
        format!("{value}")
    }
}
