//! Card deployment: validation, transmission and attempt bookkeeping.

mod orchestrator;
mod request;

pub use orchestrator::DeployOrchestrator;
pub use request::{BatchDeployRequest, BatchItem, BatchOutcome, DeployOutcome, DeployRequest};
