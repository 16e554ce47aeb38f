//! Public operation surface. Every operation runs in its own unit of work
//! and answers with a status envelope instead of an error.

mod envelope;
mod nameplate;
mod types;

pub use envelope::*;
pub use nameplate::NameplateService;
pub use types::{ConnectOutcome, ConnectRequest, DisconnectOutcome, RadioStatus, StatusReport};
