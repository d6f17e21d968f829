//! Sensor module - reading types, device registry and demo simulation

mod types;
mod registry;
mod simulator;

pub use types::{DataQuality, SensorReading, SensorType};
pub use registry::{DeviceChange, DeviceEvent, DeviceRegistry, DeviceStatus, EdgeDevice};
pub use simulator::{DemoDevice, SensorSimulator, DEMO_DEVICES};
