pub mod reading;
pub mod run;

pub use reading::{local_timestamp, JointRecord, Reading, SensorRole, TemperatureRecord};
pub use run::{RunConfig, RunParameters, SensorLayout};
