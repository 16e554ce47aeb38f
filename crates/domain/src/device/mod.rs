mod address;
mod entity;
mod status;

pub use address::{normalize_address, validate_original_address};
pub use entity::{Device, DeviceUpdate};
pub use status::DeviceStatus;
