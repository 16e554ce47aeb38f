//! Command line front end of the nameplate control core.
//!
//! Loads configuration, opens the store, wires the simulated radio and the
//! static card catalogue, then runs one command (or an interactive shell)
//! against [`application::NameplateService`].

pub mod bootstrap;
pub mod cli;
pub mod commands;

pub use bootstrap::Agent;
pub use cli::{Cli, Command};
pub use commands::{Reply, execute, execute_line, run_shell};
