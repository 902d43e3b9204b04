// =============================================================================
// Meridian Trade Scout — Main Entry Point
// =============================================================================
//
// An analysis service, not an execution venue: it sizes and reports trades,
// it never places them.  Provider endpoints and credentials come from the
// environment; everything tunable lives in meridian_config.json.
// =============================================================================

// ── Module declarations ──────────────────────────────────────────────────────
mod ai;
mod analysis;
mod api;
mod app_state;
mod error;
mod execution;
mod fundamentals;
mod indicators;
mod market_data;
mod patterns;
mod pipeline;
mod runtime_config;
mod scheduler;
mod types;

use std::sync::Arc;

use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::ai::AiClient;
use crate::app_state::AppState;
use crate::fundamentals::FundamentalsClient;
use crate::market_data::BarProvider;
use crate::runtime_config::RuntimeConfig;

/// On-disk location of the runtime configuration.
const CONFIG_PATH: &str = "meridian_config.json";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── 1. Environment & config ──────────────────────────────────────────
    let _ = dotenv::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("╔══════════════════════════════════════════════════════════╗");
    info!("║        Meridian Trade Scout — Starting Up                ║");
    info!("╚══════════════════════════════════════════════════════════╝");

    let mut config = RuntimeConfig::load(CONFIG_PATH).unwrap_or_else(|e| {
        warn!(error = %e, "Failed to load config, using defaults");
        RuntimeConfig::default()
    });

    // Override the watchlist from env if available.
    if let Ok(syms) = std::env::var("MERIDIAN_SYMBOLS") {
        let parsed: Vec<String> = syms
            .split(',')
            .map(|s| s.trim().to_uppercase())
            .filter(|s| !s.is_empty())
            .collect();
        if !parsed.is_empty() {
            config.watchlist = parsed;
        }
    }

    info!(watchlist = ?config.watchlist, "Configured watchlist");
    info!(
        batch_size = config.batch_size,
        batch_delay_ms = config.batch_delay_ms,
        run_timeout_secs = config.run_timeout_secs,
        "Batch scheduling parameters"
    );

    // ── 2. Upstream clients ──────────────────────────────────────────────
    let bars_url = std::env::var("MERIDIAN_BARS_URL")
        .unwrap_or_else(|_| "https://data.alpaca.markets".into());
    let bars_key = std::env::var("MERIDIAN_BARS_API_KEY").unwrap_or_default();
    let bar_provider = BarProvider::new(bars_url, &bars_key);

    let reference_url = std::env::var("MERIDIAN_REFERENCE_URL")
        .unwrap_or_else(|_| "https://www.alphavantage.co/query".into());
    let ratios_url = std::env::var("MERIDIAN_RATIOS_URL")
        .unwrap_or_else(|_| "https://financialmodelingprep.com/api/v3".into());
    let fundamentals_key = std::env::var("MERIDIAN_FUNDAMENTALS_API_KEY").unwrap_or_default();
    let fundamentals = FundamentalsClient::new(reference_url, ratios_url, fundamentals_key);

    let ai_url =
        std::env::var("MERIDIAN_AI_URL").unwrap_or_else(|_| "https://api.groq.com/openai".into());
    let ai_key = std::env::var("MERIDIAN_AI_API_KEY").unwrap_or_default();
    let ai = AiClient::new(ai_url, ai_key);

    // ── 3. Build shared state ────────────────────────────────────────────
    let state = Arc::new(AppState::new(config, bar_provider, fundamentals, ai));

    // ── 4. Start the API server ──────────────────────────────────────────
    let bind_addr =
        std::env::var("MERIDIAN_BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3001".into());

    let app = api::rest::router(state.clone());
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!(addr = %bind_addr, "API server listening");

    let server_state = state.clone();
    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            server_state.push_error(format!("API server failed: {e}"));
            error!(error = %e, "API server failed");
        }
    });

    info!("All subsystems running. Press Ctrl+C to stop.");

    // ── 5. Graceful shutdown ─────────────────────────────────────────────
    tokio::signal::ctrl_c().await?;
    warn!("Shutdown signal received — stopping gracefully");

    if let Err(e) = state.runtime_config.read().save(CONFIG_PATH) {
        error!(error = %e, "Failed to save runtime config on shutdown");
    }

    info!("Meridian Trade Scout shut down complete.");
    Ok(())
}
