// SPDX-License-Identifier: BUSL-1.1
//! # OpenAPI Specification Assembly
//!
//! Assembles the utoipa-documented routes and entity schemas into one
//! OpenAPI 3.1 spec, served at `/openapi.json`. The generic entity routes
//! share one shape and are described by their schemas only.

use axum::routing::get;
use axum::{Json, Router};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::state::AppState;

/// Adds the bearer JWT security scheme.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .description(Some(
                            "HS256 JWT carrying a `role` claim. Signed with SURVEY_JWT_SECRET.",
                        ))
                        .build(),
                ),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Survey API",
        description = "REST backend for survey and audit data collection: geography and department hierarchy, survey questions, audit answers, coordinator assignment, and dashboards.\n\nEvery `/v1/*` endpoint requires `Authorization: Bearer <JWT>`. Health probes, `/metrics` and this document are unauthenticated.",
        license(name = "BUSL-1.1")
    ),
    servers(
        (url = "http://localhost:3000", description = "Local development server"),
    ),
    security(
        ("bearer_auth" = [])
    ),
    paths(
        // ── Audit answers ───────────────────────────────────────────────
        crate::routes::audit_answers::create_or_update_answer,
        // ── Coordinators ────────────────────────────────────────────────
        crate::routes::coordinators::assign_coordinators,
        crate::routes::coordinators::project_users,
        crate::routes::coordinators::assignment_for_project,
        crate::routes::coordinators::bulk_upload,
        crate::routes::coordinators::projects_for_user,
        // ── Dashboard ───────────────────────────────────────────────────
        crate::routes::dashboard::summary,
        crate::routes::dashboard::audit_progress,
    ),
    components(
        schemas(
            // ── Entities ────────────────────────────────────────────────
            survey_core::model::Division,
            survey_core::model::District,
            survey_core::model::Block,
            survey_core::model::School,
            survey_core::model::Department,
            survey_core::model::SubDepartment,
            survey_core::model::SubSubDepartment,
            survey_core::model::Category,
            survey_core::model::SubCategory,
            survey_core::model::SurveyQuestions,
            survey_core::model::MasterProject,
            survey_core::model::AuditAnswer,
            survey_core::model::CoordinatorAssignment,
            survey_core::model::CoordinatorRole,
            // ── Request / response DTOs ─────────────────────────────────
            crate::routes::coordinators::AssignCoordinatorsRequest,
            crate::routes::coordinators::ProjectUsers,
            crate::routes::coordinators::ProjectsForUserRequest,
            crate::routes::coordinators::ProjectsForUserResponse,
            survey_core::bulk::BulkReport,
            survey_core::bulk::RowError,
            survey_core::dashboard::Summary,
            survey_core::dashboard::AuditTotals,
            survey_core::dashboard::AuditProgress,
            survey_core::dashboard::DepartmentProgress,
            crate::auth::Role,
            // ── Error types ─────────────────────────────────────────────
            crate::error::ErrorBody,
            crate::error::ErrorDetail,
        ),
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "audit_answers", description = "Audit answers keyed by school, department path, frequency and role"),
        (name = "coordinators", description = "Coordinator assignment per master project, including CSV bulk upload"),
        (name = "dashboard", description = "Read-only aggregate views"),
    )
)]
pub struct ApiDoc;

/// Serves the OpenAPI JSON spec at `/openapi.json`.
pub fn router() -> Router<AppState> {
    Router::new().route("/openapi.json", get(openapi_json))
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
