// SPDX-License-Identifier: BUSL-1.1
//! # Dashboard API
//!
//! Read-only aggregates computed from the in-memory collections on each
//! request.

use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};
use survey_core::dashboard::{self, AuditProgress, Summary};

use crate::error::AppError;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/dashboard/summary", get(summary))
        .route("/v1/dashboard/audit-progress/{school_id}", get(audit_progress))
}

/// GET /v1/dashboard/summary — Document counts and audit submission totals.
#[utoipa::path(
    get,
    path = "/v1/dashboard/summary",
    responses(
        (status = 200, description = "Counts per collection", body = Summary),
    ),
    security(("bearer_auth" = [])),
    tag = "dashboard"
)]
pub(crate) async fn summary(State(state): State<AppState>) -> Result<Json<Summary>, AppError> {
    Ok(Json(dashboard::summary(
        state.collection_counts(),
        &state.audit_answers,
    )))
}

/// GET /v1/dashboard/audit-progress/{schoolId} — One school's answers by department.
#[utoipa::path(
    get,
    path = "/v1/dashboard/audit-progress/{school_id}",
    params(("school_id" = String, Path, description = "School id as used in audit answers")),
    responses(
        (status = 200, description = "Final and draft counts per department", body = AuditProgress),
    ),
    security(("bearer_auth" = [])),
    tag = "dashboard"
)]
pub(crate) async fn audit_progress(
    State(state): State<AppState>,
    Path(school_id): Path<String>,
) -> Result<Json<AuditProgress>, AppError> {
    Ok(Json(dashboard::audit_progress(&state.audit_answers, &school_id)))
}
