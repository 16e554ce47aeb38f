//! Application layer - Use cases and business workflows
//!
//! Discovery, session management, card deployment and the deploy history,
//! exposed through [`NameplateService`].

pub mod audit;
pub mod connection;
pub mod deploy;
pub mod history;
pub mod registry;
pub mod scanner;
pub mod service;
pub mod settings;
pub mod unit_of_work;

pub use connection::{ConnectionManager, SessionLease};
pub use deploy::{BatchDeployRequest, BatchOutcome, DeployOutcome, DeployRequest};
pub use service::{ConnectRequest, NameplateService};
pub use settings::CoreSettings;
pub use unit_of_work::{UnitOfWork, run_in_unit_of_work};
