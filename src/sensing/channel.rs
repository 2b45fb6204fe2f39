use thiserror::Error;

use crate::models::{Reading, SensorRole};

use super::frame::{parse_humidity_frame, parse_temperature_frame, FrameRejection};
use super::transport::LineTransport;

/// A rejected poll, tagged with the board that produced it.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{role} sensor: {reason}")]
pub struct ChannelRejection {
    pub role: SensorRole,
    pub reason: FrameRejection,
}

/// One board behind an already-open transport.
///
/// A poll consumes a whole frame or rejects it; nothing is carried over to
/// the next poll except what the transport itself buffers.
pub struct SensorChannel<T> {
    role: SensorRole,
    transport: T,
}

impl<T: LineTransport> SensorChannel<T> {
    pub fn new(role: SensorRole, transport: T) -> Self {
        Self { role, transport }
    }

    pub fn describe(&self) -> &str {
        self.transport.describe()
    }

    /// Reads absolute humidity then temperature and derives relative humidity.
    ///
    /// Both lines are always read, even when the first one is missing, so a
    /// dropped line costs one poll instead of shifting every later pair.
    pub fn poll(&mut self) -> Result<Reading, ChannelRejection> {
        let humidity_line = self.transport.read_line();
        let temperature_line = self.transport.read_line();

        let humidity_line = humidity_line.map_err(|err| self.transport_rejection(err))?;
        let temperature_line = temperature_line.map_err(|err| self.transport_rejection(err))?;

        let frame = parse_humidity_frame(&humidity_line, &temperature_line)
            .map_err(|reason| self.rejection(reason))?;
        Ok(Reading::derive(frame.temperature, frame.absolute_humidity))
    }

    /// Reads a single temperature line.
    pub fn poll_temperature(&mut self) -> Result<f64, ChannelRejection> {
        let line = self
            .transport
            .read_line()
            .map_err(|err| self.transport_rejection(err))?;
        parse_temperature_frame(&line).map_err(|reason| self.rejection(reason))
    }

    pub fn close(self) -> anyhow::Result<()> {
        self.transport.close()
    }

    fn rejection(&self, reason: FrameRejection) -> ChannelRejection {
        ChannelRejection {
            role: self.role,
            reason,
        }
    }

    fn transport_rejection(&self, err: anyhow::Error) -> ChannelRejection {
        self.rejection(FrameRejection::Transport(format!("{err:#}")))
    }
}
