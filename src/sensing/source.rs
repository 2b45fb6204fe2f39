use std::fmt;

use anyhow::Result;
use chrono::Utc;

use crate::models::{JointRecord, SensorRole, TemperatureRecord};

use super::channel::{ChannelRejection, SensorChannel};
use super::transport::LineTransport;

/// Every channel rejection from one cycle. Never empty.
#[derive(Debug, Clone, PartialEq)]
pub struct CycleRejection {
    pub rejections: Vec<ChannelRejection>,
}

impl CycleRejection {
    /// True when every board was silent, as opposed to sending garbage.
    pub fn all_timeouts(&self) -> bool {
        self.rejections
            .iter()
            .all(|rejection| rejection.reason.is_timeout())
    }
}

impl fmt::Display for CycleRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, rejection) in self.rejections.iter().enumerate() {
            if idx > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{rejection}")?;
        }
        Ok(())
    }
}

impl std::error::Error for CycleRejection {}

impl From<ChannelRejection> for CycleRejection {
    fn from(rejection: ChannelRejection) -> Self {
        Self {
            rejections: vec![rejection],
        }
    }
}

/// What the acquisition loop samples once per cycle.
///
/// `acquire` blocks for at most the transports' read timeouts and either
/// returns a complete, timestamped record or the reasons it could not.
pub trait Acquire: Send + 'static {
    type Record: fmt::Display + Send + 'static;

    fn acquire(&mut self) -> Result<Self::Record, CycleRejection>;

    /// Closes the underlying transports. Called once, at program exit.
    fn close(self) -> Result<()>
    where
        Self: Sized;
}

/// Inflow and outflow humidity boards sampled in lock-step.
pub struct DualHumidity<T> {
    inflow: SensorChannel<T>,
    outflow: SensorChannel<T>,
}

impl<T: LineTransport> DualHumidity<T> {
    pub fn new(inflow: T, outflow: T) -> Self {
        Self {
            inflow: SensorChannel::new(SensorRole::Inflow, inflow),
            outflow: SensorChannel::new(SensorRole::Outflow, outflow),
        }
    }

    pub fn describe(&self) -> String {
        format!(
            "{} (Inflow) and {} (Outflow)",
            self.inflow.describe(),
            self.outflow.describe()
        )
    }
}

impl<T: LineTransport> Acquire for DualHumidity<T> {
    type Record = JointRecord;

    fn acquire(&mut self) -> Result<JointRecord, CycleRejection> {
        // Poll both even if the first fails so the two streams stay aligned.
        let inflow = self.inflow.poll();
        let outflow = self.outflow.poll();

        match (inflow, outflow) {
            (Ok(inflow), Ok(outflow)) => Ok(JointRecord {
                timestamp: Utc::now(),
                inflow,
                outflow,
            }),
            (inflow, outflow) => Err(CycleRejection {
                rejections: [inflow.err(), outflow.err()].into_iter().flatten().collect(),
            }),
        }
    }

    fn close(self) -> Result<()> {
        let inflow = self.inflow.close();
        let outflow = self.outflow.close();
        inflow.and(outflow)
    }
}

/// A single temperature board.
pub struct SingleTemperature<T> {
    channel: SensorChannel<T>,
}

impl<T: LineTransport> SingleTemperature<T> {
    pub fn new(transport: T) -> Self {
        Self {
            channel: SensorChannel::new(SensorRole::Temperature, transport),
        }
    }

    pub fn describe(&self) -> String {
        format!("{} (Temperature)", self.channel.describe())
    }
}

impl<T: LineTransport> Acquire for SingleTemperature<T> {
    type Record = TemperatureRecord;

    fn acquire(&mut self) -> Result<TemperatureRecord, CycleRejection> {
        let temperature = self.channel.poll_temperature()?;
        Ok(TemperatureRecord {
            timestamp: Utc::now(),
            temperature,
        })
    }

    fn close(self) -> Result<()> {
        self.channel.close()
    }
}
