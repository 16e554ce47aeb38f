mod simulator;

pub use simulator::{SimulatedDeviceConfig, SimulatedRadio, SimulatorConfig, Transmission};
