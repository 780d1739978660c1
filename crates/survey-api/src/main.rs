// SPDX-License-Identifier: BUSL-1.1
//! # survey-api — Binary Entry Point
//!
//! Reads `SURVEY_*` configuration, connects to Postgres when `DATABASE_URL`
//! is set, hydrates the in-memory collections and serves the API.

use anyhow::Context;
use survey_api::state::{AppConfig, AppState};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::from_env();
    init_tracing(config.log_json);

    if config.jwt_secret.is_none() {
        tracing::warn!(
            "SURVEY_JWT_SECRET not set: authentication is disabled and every caller is treated as superadmin"
        );
    }
    tracing::info!(?config, "configuration loaded");

    let db_pool = survey_api::db::init_pool()
        .await
        .context("database initialization failed")?;

    let port = config.port;
    let state = AppState::with_config(config, db_pool);

    state
        .hydrate_from_db()
        .await
        .map_err(anyhow::Error::msg)
        .context("database hydration failed")?;

    let app = survey_api::app(state);

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Survey API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}
