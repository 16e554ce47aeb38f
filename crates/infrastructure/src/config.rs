use config::{Config, ConfigBuilder, ConfigError, Environment, File, FileFormat};
use config::builder::DefaultState;
use serde::{Deserialize, Serialize};

use crate::cards::CardConfig;
use crate::radio::SimulatorConfig;

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct RadioConfig {
    pub scan_window_ms: u64,
    pub connect_timeout_ms: u64,
    pub transmit_timeout_ms: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct HistoryConfig {
    pub max_page_size: u32,
}

/// Identity recorded in the audit trail for commands run from this process
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ActorConfig {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct NameplateConfig {
    pub database: DatabaseConfig,
    pub radio: RadioConfig,
    pub history: HistoryConfig,
    pub actor: ActorConfig,
    #[serde(default)]
    pub simulator: SimulatorConfig,
    #[serde(default)]
    pub cards: Vec<CardConfig>,
}

impl NameplateConfig {
    fn defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
        Config::builder()
            .set_default("database.url", "sqlite://data/nameplate.db?mode=rwc")?
            .set_default("radio.scan_window_ms", 10_000)?
            .set_default("radio.connect_timeout_ms", 10_000)?
            .set_default("radio.transmit_timeout_ms", 30_000)?
            .set_default("history.max_page_size", 100)?
            .set_default("actor.id", "system")?
            .set_default("actor.name", "System")
    }

    pub fn load(config_dir: &str) -> Result<Self, ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = Self::defaults()?
            // Shared settings, e.g. config/default.toml
            .add_source(File::with_name(&format!("{}/default", config_dir)).required(false))
            // Per environment overrides
            .add_source(File::with_name(&format!("{}/{}", config_dir, run_mode)).required(false))
            // Environment variables (e.g. NAMEPLATE__RADIO__SCAN_WINDOW_MS=5000)
            .add_source(Environment::with_prefix("NAMEPLATE").separator("__"))
            .build()?;

        s.try_deserialize()
    }

    /// Parses a TOML document on top of the defaults
    pub fn from_toml(document: &str) -> Result<Self, ConfigError> {
        Self::defaults()?
            .add_source(File::from_str(document, FileFormat::Toml))
            .build()?
            .try_deserialize()
    }
}
