//! # qms-server
//!
//! HTTP server for QMS, the single-queue ticket dispatch system.
//!
//! This binary provides:
//! - REST API for ticket issuance and the staff queue station
//! - Server-sent-events stream of queue snapshots for displays
//! - OpenAPI documentation via Swagger UI
//! - Structured logging to file and stdout
//!
//! ## Running
//!
//! ```bash
//! # Development
//! cargo run --package qms-server
//!
//! # Production (QMS_ENV=production enables file logging)
//! QMS_ENV=production ./qms-server
//! ```

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]

use std::net::SocketAddr;

use tokio::net::TcpListener;
use tracing::info;

use qms_core::{QmsConfig, Storage};

mod api;
mod logging;
mod state;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let is_production = std::env::var("QMS_ENV")
        .map(|env| env.eq_ignore_ascii_case("production"))
        .unwrap_or(false);
    logging::init(is_production)?;

    info!("Starting qms-server");

    let config = QmsConfig::load()?;
    let addr: SocketAddr = format!("{}:{}", config.server.bind_addr, config.server.port)
        .parse()
        .map_err(|e| anyhow::anyhow!("invalid server bind address: {e}"))?;

    let storage = Storage::default_location()?;
    let shared_state = state::build_state(config, storage)?;
    let app = api::create_router(shared_state);

    let listener = TcpListener::bind(addr).await?;
    info!("Listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
