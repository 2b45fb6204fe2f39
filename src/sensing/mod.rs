pub mod channel;
pub mod frame;
pub mod loop_worker;
pub mod simulated;
pub mod source;
pub mod transport;

pub use channel::{ChannelRejection, SensorChannel};
pub use frame::{FrameField, FrameRejection};
pub use loop_worker::{acquisition_loop, LoopOutcome, LoopSettings};
pub use simulated::SimulatedBoard;
pub use source::{Acquire, CycleRejection, DualHumidity, SingleTemperature};
pub use transport::{available_ports, LineTransport, SerialOptions, SerialTransport};
