mod app;
mod config;
mod db;
mod handlers;
mod models;
mod service;
mod state;
mod storage;
#[cfg(test)]
mod testing;

use std::sync::Arc;

use anyhow::Context;
use kiosk_common::{bind_listener, init_tracing, shutdown_signal};

use crate::config::ServiceConfig;
use crate::state::AppState;
use crate::storage::PgStorage;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _guards = init_tracing("kiosk-service");

    let config = ServiceConfig::from_env();
    let target = config.database.describe();
    let pg_config = config.database.to_pg_config()?;
    let storage = PgStorage::connect(&pg_config)
        .await
        .with_context(|| format!("connect database at {target}"))?;
    tracing::info!(database = target.as_str(), "database connected");

    let app = app::build_router(AppState::new(Arc::new(storage)));
    let listener = bind_listener(config.port)
        .await
        .with_context(|| format!("bind port {}", config.port))?;
    tracing::info!(port = config.port, "kiosk api listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serve")?;
    Ok(())
}
