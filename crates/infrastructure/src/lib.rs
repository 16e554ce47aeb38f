//! Infrastructure layer - External integrations

pub mod cards;
pub mod config;
pub mod database;
pub mod memory_store;
pub mod radio;

pub use cards::StaticCardProvider;
pub use database::SeaOrmStore;
pub use memory_store::MemoryStore;
pub use radio::SimulatedRadio;
