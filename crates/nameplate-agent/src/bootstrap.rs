use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::info;

use application::{CoreSettings, NameplateService};
use domain::Actor;
use infrastructure::config::NameplateConfig;
use infrastructure::{SeaOrmStore, SimulatedRadio, StaticCardProvider};

/// Everything a command needs to run
pub struct Agent {
    pub service: NameplateService,
    pub actor: Actor,
    pub radio: SimulatedRadio,
}

pub fn core_settings(config: &NameplateConfig) -> CoreSettings {
    CoreSettings {
        scan_window: Duration::from_millis(config.radio.scan_window_ms),
        connect_timeout: Duration::from_millis(config.radio.connect_timeout_ms),
        transmit_timeout: Duration::from_millis(config.radio.transmit_timeout_ms),
        max_page_size: config.history.max_page_size,
    }
}

/// Creates the directory holding a file-backed SQLite database
pub fn ensure_database_dir(url: &str) -> Result<()> {
    let Some(path) = url.strip_prefix("sqlite://").or_else(|| url.strip_prefix("sqlite:")) else {
        return Ok(());
    };
    let path = path.split('?').next().unwrap_or_default();
    if path.is_empty() || path == ":memory:" {
        return Ok(());
    }

    if let Some(parent) = Path::new(path).parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create data directory {}", parent.display()))?;
        info!("📂 Data directory: {}", parent.display());
    }
    Ok(())
}

pub async fn build(config: &NameplateConfig) -> Result<Agent> {
    ensure_database_dir(&config.database.url)?;

    info!("💾 Connecting to Storage: {}", config.database.url);
    let store = SeaOrmStore::connect(&config.database.url)
        .await
        .context("Failed to open nameplate storage")?;

    let cards = StaticCardProvider::new(config.cards.clone()).context("Invalid card catalogue")?;
    let radio = SimulatedRadio::new(config.simulator.clone());
    info!(
        cards = config.cards.len(),
        displays = config.simulator.devices.len(),
        "📋 Loaded card catalogue and simulated displays"
    );

    let service = NameplateService::new(
        Arc::new(store),
        Arc::new(radio.clone()),
        Arc::new(cards),
        core_settings(config),
    );

    Ok(Agent {
        service,
        actor: Actor::new(config.actor.id.clone(), config.actor.name.clone()),
        radio,
    })
}
