pub mod controller;
pub mod notify;
pub mod signal;
pub mod state;

pub use controller::{ControllerSettings, Operator, RunController};
pub use notify::{Notifier, RunHeader, RunSummary};
pub use signal::{spawn_stop_listener, CancellationSignal, StopEvent, StopInput};
pub use state::{LoopPhase, RunStats, StopReason};
