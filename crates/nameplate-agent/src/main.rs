use anyhow::Result;
use clap::Parser;
use dotenv::dotenv;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use infrastructure::config::NameplateConfig;
use nameplate_agent::{Cli, Command, bootstrap, execute, run_shell};

async fn run() -> Result<i32> {
    dotenv().ok();

    // Logs go to stderr, stdout carries the JSON envelopes
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "info,nameplate_agent=debug,application=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    info!("📂 Config directory: {}", cli.config_dir);
    let mut config = NameplateConfig::load(&cli.config_dir)?;
    cli.apply_overrides(&mut config);
    info!(actor = %config.actor.id, "✅ Loaded configuration");

    let agent = bootstrap::build(&config).await?;

    if cli.command == Command::Shell {
        let shutdown = CancellationToken::new();
        let signal = shutdown.clone();
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => signal.cancel(),
                Err(err) => warn!(error = %err, "Unable to listen for shutdown signal"),
            }
        });
        run_shell(&agent, shutdown).await?;
        return Ok(0);
    }

    let reply = execute(&agent, &cli.command).await?;
    println!("{}", serde_json::to_string_pretty(&reply.body)?);
    Ok(if reply.success { 0 } else { 2 })
}

fn main() {
    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("\n❌ CRITICAL ERROR: failed to start runtime: {e}");
            std::process::exit(1);
        }
    };

    match rt.block_on(run()) {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("\n❌ CRITICAL ERROR: {:?}", e);
            eprintln!("--------------------------------------------------");
            eprintln!("The agent stopped because of a fatal error.");
            std::process::exit(1);
        }
    }
}
