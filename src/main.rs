//! QuizRush · Arithmetic Quiz Backend
//!
//! - Axum HTTP + WebSocket API for timed arithmetic rounds
//! - Per-session bounded refill buffer of pre-generated questions
//! - In-memory players and leaderboard
//! - Static SPA fallback (./static/index.html)
//!
//! Important env variables:
//!   PORT              : u16 (default 3000)
//!   QUIZ_CONFIG_PATH  : path to TOML config (buffer size, round length, profiles)
//!   LOG_LEVEL         : tracing filter, e.g. "debug" or full directives
//!   LOG_FORMAT        : "pretty" (default) or "json"

mod buffer;
mod config;
mod domain;
mod error;
mod generator;
mod logic;
mod protocol;
mod routes;
mod session;
mod state;
mod telemetry;
mod util;

use std::{net::SocketAddr, sync::Arc, time::Duration};
use tokio::net::TcpListener;
use tracing::{info, instrument};

use crate::routes::build_router;
use crate::state::AppState;

/// How often timed-out rounds are recorded and stale sessions dropped.
const SWEEP_EVERY: Duration = Duration::from_secs(30);

#[instrument(level = "info", skip_all)]
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
  telemetry::init_tracing();

  // Shared state: validated config, live sessions, players, finished rounds.
  let state = Arc::new(AppState::new()?);

  // Background sweeper: records abandoned rounds, evicts stale sessions.
  let sweeper = state.clone();
  tokio::spawn(async move {
    let mut tick = tokio::time::interval(SWEEP_EVERY);
    loop {
      tick.tick().await;
      sweeper.sweep().await;
    }
  });

  let app = build_router(state.clone());

  let addr: SocketAddr = std::env::var("PORT")
    .ok()
    .and_then(|p| p.parse::<u16>().ok())
    .map(|port| SocketAddr::from(([0, 0, 0, 0], port)))
    .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 3000)));

  let listener = TcpListener::bind(addr).await?;
  info!(target: "quiz_backend", %addr, "HTTP server listening");
  axum::serve(listener, app)
    .with_graceful_shutdown(shutdown_signal())
    .await?;
  info!(target: "quiz_backend", "Server stopped");
  Ok(())
}

async fn shutdown_signal() {
  if let Err(e) = tokio::signal::ctrl_c().await {
    tracing::error!(target: "quiz_backend", error = %e, "Failed to listen for ctrl-c; running until killed");
    std::future::pending::<()>().await;
  }
}
