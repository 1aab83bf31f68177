//! SensayLabs · Learner Progression Backend
//!
//! - Axum HTTP API for user records, activity events, levels and achievements
//! - In-memory stores with optional JSON snapshots (see `config`)
//!
//! Important env variables:
//!   PORT                     : u16 (default 3000)
//!   PROGRESSION_CONFIG_PATH  : path to TOML config (level table, achievements, snapshots)
//!   LOG_LEVEL                : tracing filter, e.g. "debug" or full directives
//!   LOG_FORMAT               : "pretty" (default) or "json"

mod telemetry;
mod domain;
mod error;
mod config;
mod snapshot;
mod store;
mod enrollment;
mod metrics;
mod progression;
mod achievements;
mod state;
mod protocol;
mod logic;
mod routes;

use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tracing::info;

use crate::config::load_service_config_from_env;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
  telemetry::init_tracing();

  // Rules + stores; a broken snapshot file aborts startup rather than serving empty data.
  let cfg = load_service_config_from_env();
  let state = Arc::new(AppState::from_config(cfg).await?);

  let app = build_router(state);

  let addr: SocketAddr = std::env::var("PORT")
    .ok()
    .and_then(|p| p.parse::<u16>().ok())
    .map(|port| SocketAddr::from(([0, 0, 0, 0], port)))
    .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 3000)));

  let listener = TcpListener::bind(addr).await?;
  info!(target: "sensaylabs", %addr, "HTTP server listening");
  axum::serve(listener, app)
    .with_graceful_shutdown(shutdown_signal())
    .await?;
  Ok(())
}

async fn shutdown_signal() {
  if let Err(e) = tokio::signal::ctrl_c().await {
    tracing::error!(target: "sensaylabs", error = %e, "Failed to listen for shutdown signal");
    std::future::pending::<()>().await;
  }
  info!(target: "sensaylabs", "Shutdown signal received");
}
