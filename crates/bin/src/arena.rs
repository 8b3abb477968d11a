//! Arena - game server binary

use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Arena game server v{}", env!("CARGO_PKG_VERSION"));

    let config = server::Config::load()?;
    info!("Loaded configuration");
    info!("  Port: {}", config.server.port);
    info!("  Arena: {}x{}", config.arena.width, config.arena.height);
    info!(
        "  Tick rate: {} Hz, update rate: {} Hz",
        config.server.tick_rate_hz, config.server.update_rate_hz
    );
    info!("  Cell merge: {}, player eating: {}", config.rules.cell_merge, config.rules.player_eating);

    server::run(config).await?;

    Ok(())
}
