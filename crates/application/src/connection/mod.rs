//! Live radio sessions, one per display.

mod lease;
mod manager;

pub use lease::SessionLease;
pub use manager::ConnectionManager;
