// SPDX-License-Identifier: BUSL-1.1
//! # survey-api — Axum API Service for the Survey/Audit Backend
//!
//! ## API Surface
//!
//! | Prefix                      | Module                         | Domain                  |
//! |-----------------------------|--------------------------------|-------------------------|
//! | `/v1/division`, `district`, `block`, `school` | [`routes::geography`] | Geography       |
//! | `/v1/department` … `/v1/sub-category`         | [`routes::departments`] | Department hierarchy |
//! | `/v1/survey-questions`      | [`routes::surveys`]            | Survey definitions      |
//! | `/v1/master-project`        | [`routes::surveys`]            | Master projects         |
//! | `/v1/audit-answer`          | [`routes::audit_answers`]      | Audit answers           |
//! | `/v1/assign-coordinators/*` | [`routes::coordinators`]       | Coordinator assignment  |
//! | `/v1/dashboard/*`           | [`routes::dashboard`]          | Aggregates              |
//!
//! ## Middleware Stack (execution order)
//!
//! ```text
//! TraceLayer → MetricsMiddleware → AuthMiddleware (token + policy) → Handler
//! ```
//!
//! ## OpenAPI
//!
//! Generated via utoipa derive macros, served at `/openapi.json`.

pub mod auth;
pub mod db;
pub mod error;
pub mod extractors;
pub mod middleware;
pub mod openapi;
pub mod policy;
pub mod routes;
pub mod state;

use axum::extract::{DefaultBodyLimit, State};
use axum::http::StatusCode;
use axum::middleware::from_fn;
use axum::response::IntoResponse;
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::auth::AuthConfig;
use crate::state::AppState;

/// Body limit for JSON routes. The bulk-upload route sets its own.
const JSON_BODY_LIMIT: usize = 2 * 1024 * 1024;

/// Assemble the full application router with all routes and middleware.
///
/// Health probes (`/health/*`), `/metrics` and `/openapi.json` are mounted
/// outside the auth middleware so they remain accessible without credentials.
pub fn app(state: AppState) -> Router {
    let auth_config = AuthConfig::new(state.config.jwt_secret.as_deref());

    let api = Router::new()
        .merge(routes::geography::router())
        .merge(routes::departments::router())
        .merge(routes::surveys::router())
        .merge(routes::audit_answers::router())
        .merge(routes::coordinators::router(state.config.max_upload_bytes))
        .merge(routes::dashboard::router());

    let mut api = api
        .layer(DefaultBodyLimit::max(JSON_BODY_LIMIT))
        .layer(from_fn(auth::auth_middleware));

    if let Some(metrics) = &state.metrics {
        api = api
            .route_layer(from_fn(middleware::metrics::metrics_middleware))
            .layer(axum::Extension(metrics.clone()));
    }

    let api = api
        .layer(TraceLayer::new_for_http())
        .layer(axum::Extension(auth_config))
        .with_state(state.clone());

    let mut unauthenticated = Router::new()
        .route("/health/liveness", axum::routing::get(liveness))
        .route("/health/readiness", axum::routing::get(readiness))
        .merge(openapi::router());

    if state.metrics.is_some() {
        unauthenticated = unauthenticated.route("/metrics", axum::routing::get(prometheus_metrics));
    }

    let unauthenticated = unauthenticated.with_state(state);

    Router::new().merge(unauthenticated).merge(api)
}

/// GET /metrics — Prometheus scrape endpoint.
///
/// Refreshes the per-collection document gauges, then encodes every metric
/// in the text exposition format.
async fn prometheus_metrics(State(state): State<AppState>) -> impl IntoResponse {
    let Some(metrics) = &state.metrics else {
        return StatusCode::NOT_FOUND.into_response();
    };

    metrics.set_document_counts(state.collection_counts());

    match metrics.gather_and_encode() {
        Ok(body) => (
            StatusCode::OK,
            [(
                axum::http::header::CONTENT_TYPE,
                "text/plain; version=0.0.4; charset=utf-8",
            )],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::error!("Failed to encode Prometheus metrics: {e}");
            (StatusCode::INTERNAL_SERVER_ERROR, e).into_response()
        }
    }
}

/// Liveness probe. Always 200 while the process is running.
async fn liveness() -> &'static str {
    "ok"
}

/// Readiness probe. Checks the database when one is configured.
async fn readiness(State(state): State<AppState>) -> impl IntoResponse {
    if let Some(pool) = &state.db_pool {
        if let Err(e) = sqlx::query("SELECT 1").execute(pool).await {
            tracing::warn!("Database health check failed: {e}");
            return (StatusCode::SERVICE_UNAVAILABLE, "database unreachable").into_response();
        }
    }

    (StatusCode::OK, "ready").into_response()
}
