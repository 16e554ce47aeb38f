pub mod audit_trails;
pub mod deploy_history;
pub mod devices;
