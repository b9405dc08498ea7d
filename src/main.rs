// =============================================================================
// Aurora Dash — Main Entry Point
// =============================================================================
//
// Live market dashboard for a fixed set of Binance spot pairs: candle
// snapshots with streamed updates, ticker and order-book polling, and a
// browser API that pushes every view change over a WebSocket.
// =============================================================================

// ── Module declarations ──────────────────────────────────────────────────────
mod api;
mod app_state;
mod binance;
mod dashboard;
mod format;
mod market_data;
mod runtime_config;
mod types;

use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::app_state::AppState;
use crate::runtime_config::DashConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── 1. Environment & config ──────────────────────────────────────────
    let _ = dotenv::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Aurora Dash — starting up");

    let config_path =
        std::env::var("AURORA_CONFIG").unwrap_or_else(|_| "dashboard_config.json".into());
    let mut config = DashConfig::load(&config_path).unwrap_or_else(|e| {
        warn!(error = %e, "Failed to load config, using defaults");
        DashConfig::default()
    });
    config.apply_env(|name| std::env::var(name).ok());

    info!(
        symbol = %config.default_symbol,
        timeframe = %config.default_timeframe,
        rest = %config.rest_base,
        stream = %config.ws_base,
        "Dashboard configured"
    );

    // ── 2. Build shared state and open the session ───────────────────────
    let state = Arc::new(AppState::new(config)?);
    state.start();

    // ── 3. Start the API server ──────────────────────────────────────────
    let bind_addr = state.config.bind_addr.clone();
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!(addr = %bind_addr, "API server listening");

    let app = api::rest::router(state.clone());
    let server = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!(error = %e, "API server failed");
        }
    });

    info!("Dashboard running. Press Ctrl+C to stop.");

    // ── 4. Graceful shutdown ─────────────────────────────────────────────
    tokio::signal::ctrl_c().await?;
    warn!("Shutdown signal received — stopping gracefully");

    state.shutdown();
    server.abort();

    info!("Aurora Dash shut down complete.");
    Ok(())
}
