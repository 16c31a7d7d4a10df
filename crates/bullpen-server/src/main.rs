// Bullpen fatigue tracker entry point.
//
// Startup sequence:
// 1. Load config (config/bullpen.toml, seeded from defaults/ on first run)
// 2. Initialize tracing
// 3. Build the router and bind the listener
// 4. Serve until Ctrl+C

use bullpen_server::api;
use bullpen_server::config;
use bullpen_server::telemetry;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = config::load_config().context("failed to load configuration")?;

    telemetry::init_tracing(config.logging.file.as_deref())?;
    info!("Bullpen tracker starting up");
    info!(
        "Game log at {}, CORS origin {}",
        config.csv_path().display(),
        config.cors.frontend_origin
    );
    if let Some(date) = config.fatigue.reference_date {
        info!("Fatigue reference date pinned to {date}");
    }

    let app = api::build_router(&config);

    let bind_addr = config.bind_addr();
    let listener = TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {bind_addr}"))?;
    info!("Listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    info!("Bullpen tracker shut down cleanly");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {e}");
    }
}
