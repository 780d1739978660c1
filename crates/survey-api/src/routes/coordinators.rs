// SPDX-License-Identifier: BUSL-1.1
//! # Coordinator Assignment API
//!
//! One [`CoordinatorAssignment`] per master project holds the block,
//! district, division and SME coordinator emails. Every write is a
//! set-union into those arrays, applied as one atomic upsert per project.
//!
//! | Method   | Path                                          | Handler                     |
//! |----------|-----------------------------------------------|-----------------------------|
//! | `POST`   | `/v1/assign-coordinators`                     | [`assign_coordinators`]     |
//! | `GET`    | `/v1/assign-coordinators`                     | paginated list              |
//! | `GET`    | `/v1/assign-coordinators/{id}`                | by record id                |
//! | `DELETE` | `/v1/assign-coordinators/{id}`                | by record id                |
//! | `GET`    | `/v1/assign-coordinators/{id}/users`          | [`project_users`]           |
//! | `GET`    | `/v1/assign-coordinators/filter/{projectId}`  | [`assignment_for_project`]  |
//! | `POST`   | `/v1/assign-coordinators/assign/bulk-upload`  | [`bulk_upload`]             |
//! | `POST`   | `/v1/assign-coordinators/getprojects`         | [`projects_for_user`]       |

use std::collections::HashSet;

use axum::extract::multipart::{Multipart, MultipartRejection};
use axum::extract::rejection::JsonRejection;
use axum::extract::{DefaultBodyLimit, Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use survey_core::bulk::{self, BulkDefaults, BulkReport};
use survey_core::model::coordinator::normalize_email;
use survey_core::model::{CoordinatorAssignment, CoordinatorRole, MasterProject};
use survey_core::{Collection, Record, UpsertOutcome};
use utoipa::ToSchema;

use super::crud::{self, persist, persist_many, Resource};
use crate::error::AppError;
use crate::extractors::{extract_validated_json, Validate};
use crate::state::AppState;

/// Rejection message for uploads that are not CSV.
pub const NOT_CSV_MESSAGE: &str = "Uploaded file must be in CSV format.";

const CSV_CONTENT_TYPES: &[&str] = &["text/csv", "application/csv"];

impl Resource for CoordinatorAssignment {
    fn collection(state: &AppState) -> &Collection<Self> {
        &state.coordinator_assignments
    }
}

// ── Request / response types ────────────────────────────────────────────────

/// Coordinators to add to a project's assignment.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AssignCoordinatorsRequest {
    pub master_project_id: String,
    #[serde(default)]
    pub survey_admin: Option<String>,
    #[serde(default)]
    pub block_coordinator_emails: Vec<String>,
    #[serde(default)]
    pub district_coordinator_emails: Vec<String>,
    #[serde(default)]
    pub division_coordinator_emails: Vec<String>,
    #[serde(default)]
    pub sme_emails: Vec<String>,
}

impl AssignCoordinatorsRequest {
    fn emails(&self, role: CoordinatorRole) -> &[String] {
        match role {
            CoordinatorRole::Block => &self.block_coordinator_emails,
            CoordinatorRole::District => &self.district_coordinator_emails,
            CoordinatorRole::Division => &self.division_coordinator_emails,
            CoordinatorRole::Sme => &self.sme_emails,
        }
    }

    /// The request as an assignment, emails normalized and de-duplicated.
    fn into_assignment(self) -> CoordinatorAssignment {
        let mut assignment = CoordinatorAssignment::new(self.master_project_id.trim());
        assignment.survey_admin = self.survey_admin.clone();
        for role in CoordinatorRole::ALL {
            assignment.merge_emails(role, self.emails(role).iter().map(String::as_str));
        }
        assignment
    }
}

impl Validate for AssignCoordinatorsRequest {
    fn validate(&self) -> Result<(), String> {
        if self.master_project_id.trim().is_empty() {
            return Err("masterProjectId must not be empty".to_string());
        }
        for role in CoordinatorRole::ALL {
            if let Some(bad) = self.emails(role).iter().find(|e| normalize_email(e).is_none()) {
                return Err(format!("{} contains an invalid email: {bad}", role.field_name()));
            }
        }
        Ok(())
    }
}

/// The four coordinator arrays of one project.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProjectUsers {
    pub master_project_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub survey_admin: Option<String>,
    pub block_coordinator_emails: Vec<String>,
    pub district_coordinator_emails: Vec<String>,
    pub division_coordinator_emails: Vec<String>,
    pub sme_emails: Vec<String>,
}

impl From<CoordinatorAssignment> for ProjectUsers {
    fn from(a: CoordinatorAssignment) -> Self {
        Self {
            master_project_id: a.master_project_id,
            survey_admin: a.survey_admin,
            block_coordinator_emails: a.block_coordinator_emails,
            district_coordinator_emails: a.district_coordinator_emails,
            division_coordinator_emails: a.division_coordinator_emails,
            sme_emails: a.sme_emails,
        }
    }
}

/// Which projects a user coordinates.
#[derive(Debug, Deserialize, ToSchema)]
pub struct ProjectsForUserRequest {
    pub email: String,
    /// A coordinator role tag, or `surveyadmin`.
    pub role: String,
}

impl Validate for ProjectsForUserRequest {
    fn validate(&self) -> Result<(), String> {
        if normalize_email(&self.email).is_none() {
            return Err("email must be a valid email address".to_string());
        }
        if self.role.trim().is_empty() {
            return Err("role must not be empty".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProjectsForUserResponse {
    #[schema(value_type = Vec<MasterProject>)]
    pub projects: Vec<Record<MasterProject>>,
}

// ── Router ──────────────────────────────────────────────────────────────────

/// Coordinator routes. `max_upload_bytes` caps the bulk-upload body.
pub fn router(max_upload_bytes: usize) -> Router<AppState> {
    Router::new()
        .route(
            "/v1/assign-coordinators",
            post(assign_coordinators).get(crud::list::<CoordinatorAssignment>),
        )
        .route(
            "/v1/assign-coordinators/{id}",
            get(crud::get_one::<CoordinatorAssignment>).delete(crud::remove::<CoordinatorAssignment>),
        )
        .route("/v1/assign-coordinators/{id}/users", get(project_users))
        .route(
            "/v1/assign-coordinators/filter/{master_project_id}",
            get(assignment_for_project),
        )
        .route(
            "/v1/assign-coordinators/assign/bulk-upload",
            post(bulk_upload).layer(DefaultBodyLimit::max(max_upload_bytes)),
        )
        .route("/v1/assign-coordinators/getprojects", post(projects_for_user))
}

// ── Handlers ────────────────────────────────────────────────────────────────

/// POST /v1/assign-coordinators — Union coordinators into a project's assignment.
#[utoipa::path(
    post,
    path = "/v1/assign-coordinators",
    request_body = AssignCoordinatorsRequest,
    responses(
        (status = 201, description = "Assignment created", body = CoordinatorAssignment),
        (status = 200, description = "Existing assignment extended", body = CoordinatorAssignment),
        (status = 422, description = "Invalid email or missing project", body = crate::error::ErrorBody),
    ),
    security(("bearer_auth" = [])),
    tag = "coordinators"
)]
pub(crate) async fn assign_coordinators(
    State(state): State<AppState>,
    body: Result<Json<AssignCoordinatorsRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Record<CoordinatorAssignment>>), AppError> {
    let incoming = extract_validated_json(body)?.into_assignment();

    let (record, outcome) = state.coordinator_assignments.upsert_with(
        |a| a.master_project_id == incoming.master_project_id,
        |existing| {
            let mut next = existing
                .cloned()
                .unwrap_or_else(|| CoordinatorAssignment::new(incoming.master_project_id.clone()));
            next.merge(&incoming);
            Ok((existing != Some(&next)).then_some(next))
        },
    )?;

    if outcome != UpsertOutcome::Unchanged {
        persist(&state, &record).await?;
    }
    tracing::info!(
        master_project_id = %record.doc.master_project_id,
        outcome = ?outcome,
        "coordinators assigned"
    );

    let status = match outcome {
        UpsertOutcome::Created => StatusCode::CREATED,
        UpsertOutcome::Updated | UpsertOutcome::Unchanged => StatusCode::OK,
    };
    Ok((status, Json(record)))
}

fn require_assignment(
    state: &AppState,
    master_project_id: &str,
) -> Result<Record<CoordinatorAssignment>, AppError> {
    state
        .coordinator_assignments
        .find_one(|a| a.master_project_id == master_project_id)
        .ok_or_else(|| {
            AppError::NotFound(format!(
                "no coordinator assignment for project {master_project_id}"
            ))
        })
}

/// GET /v1/assign-coordinators/{id}/users — Coordinator emails of a project.
#[utoipa::path(
    get,
    path = "/v1/assign-coordinators/{id}/users",
    params(("id" = String, Path, description = "Master project code")),
    responses(
        (status = 200, description = "Coordinator emails by role", body = ProjectUsers),
        (status = 404, description = "No assignment for the project", body = crate::error::ErrorBody),
    ),
    security(("bearer_auth" = [])),
    tag = "coordinators"
)]
pub(crate) async fn project_users(
    State(state): State<AppState>,
    Path(master_project_id): Path<String>,
) -> Result<Json<ProjectUsers>, AppError> {
    let record = require_assignment(&state, &master_project_id)?;
    Ok(Json(record.doc.into()))
}

/// GET /v1/assign-coordinators/filter/{masterProjectId} — A project's assignment.
#[utoipa::path(
    get,
    path = "/v1/assign-coordinators/filter/{master_project_id}",
    params(("master_project_id" = String, Path, description = "Master project code")),
    responses(
        (status = 200, description = "The project's assignment", body = CoordinatorAssignment),
        (status = 404, description = "No assignment for the project", body = crate::error::ErrorBody),
    ),
    security(("bearer_auth" = [])),
    tag = "coordinators"
)]
pub(crate) async fn assignment_for_project(
    State(state): State<AppState>,
    Path(master_project_id): Path<String>,
) -> Result<Json<Record<CoordinatorAssignment>>, AppError> {
    require_assignment(&state, &master_project_id).map(Json)
}

struct UploadedFile {
    file_name: Option<String>,
    content_type: Option<String>,
    bytes: Vec<u8>,
}

impl UploadedFile {
    fn is_csv(&self) -> bool {
        let by_extension = self
            .file_name
            .as_deref()
            .and_then(|n| n.rsplit_once('.'))
            .is_some_and(|(_, ext)| ext.eq_ignore_ascii_case("csv"));
        let by_content_type = self.content_type.as_deref().is_some_and(|ct| {
            let essence = ct.split(';').next().unwrap_or(ct).trim();
            CSV_CONTENT_TYPES
                .iter()
                .any(|t| essence.eq_ignore_ascii_case(t))
        });
        by_extension || by_content_type
    }
}

fn non_blank(s: String) -> Option<String> {
    let trimmed = s.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// POST /v1/assign-coordinators/assign/bulk-upload — CSV coordinator import.
///
/// Multipart fields: `file` (required, CSV), and optional `masterProjectId`,
/// `emailType` and `surveyAdmin` used for rows that lack those columns.
#[utoipa::path(
    post,
    path = "/v1/assign-coordinators/assign/bulk-upload",
    request_body(content_type = "multipart/form-data", description = "CSV `file` plus optional defaults"),
    responses(
        (status = 200, description = "Per-row outcome counts", body = BulkReport),
        (status = 422, description = "Missing or non-CSV file", body = crate::error::ErrorBody),
    ),
    security(("bearer_auth" = [])),
    tag = "coordinators"
)]
pub(crate) async fn bulk_upload(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<BulkReport>, AppError> {
    let mut multipart = multipart.map_err(|e| AppError::BadRequest(e.body_text()))?;
    let mut file: Option<UploadedFile> = None;
    let mut defaults = BulkDefaults::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("invalid multipart body: {e}")))?
    {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "file" => {
                let file_name = field.file_name().map(str::to_string);
                let content_type = field.content_type().map(str::to_string);
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::BadRequest(format!("failed to read file: {e}")))?;
                file = Some(UploadedFile {
                    file_name,
                    content_type,
                    bytes: bytes.to_vec(),
                });
            }
            "masterProjectId" | "emailType" | "surveyAdmin" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::BadRequest(format!("failed to read {name}: {e}")))?;
                let Some(value) = non_blank(text) else {
                    continue;
                };
                match name.as_str() {
                    "masterProjectId" => defaults.master_project_id = Some(value),
                    "surveyAdmin" => defaults.survey_admin = Some(value),
                    _ => {
                        let role = CoordinatorRole::from_tag(&value).ok_or_else(|| {
                            AppError::Validation(format!("unrecognized emailType '{value}'"))
                        })?;
                        defaults.role = Some(role);
                    }
                }
            }
            _ => {}
        }
    }

    let file = file.ok_or_else(|| AppError::Validation("file is required".to_string()))?;
    if !file.is_csv() {
        return Err(AppError::Validation(NOT_CSV_MESSAGE.to_string()));
    }

    let outcome = bulk::ingest(&state.coordinator_assignments, &file.bytes, &defaults)?;
    persist_many(&state, &outcome.touched).await?;
    if let Some(metrics) = &state.metrics {
        metrics.record_bulk_upload(&outcome.report);
    }
    Ok(Json(outcome.report))
}

/// POST /v1/assign-coordinators/getprojects — Projects a user coordinates.
#[utoipa::path(
    post,
    path = "/v1/assign-coordinators/getprojects",
    request_body = ProjectsForUserRequest,
    responses(
        (status = 200, description = "Matching master projects", body = ProjectsForUserResponse),
        (status = 422, description = "Invalid email or unknown role", body = crate::error::ErrorBody),
    ),
    security(("bearer_auth" = [])),
    tag = "coordinators"
)]
pub(crate) async fn projects_for_user(
    State(state): State<AppState>,
    body: Result<Json<ProjectsForUserRequest>, JsonRejection>,
) -> Result<Json<ProjectsForUserResponse>, AppError> {
    let req = extract_validated_json(body)?;
    let email = normalize_email(&req.email).unwrap_or_default();

    let assignments = if req.role.trim().eq_ignore_ascii_case("surveyadmin") {
        state.coordinator_assignments.find(|a| {
            a.survey_admin
                .as_deref()
                .is_some_and(|admin| admin.trim().eq_ignore_ascii_case(&email))
        })
    } else {
        let role = CoordinatorRole::from_tag(&req.role)
            .ok_or_else(|| AppError::Validation(format!("unrecognized role '{}'", req.role)))?;
        state
            .coordinator_assignments
            .find(|a| a.contains(role, &email))
    };

    let codes: HashSet<String> = assignments
        .into_iter()
        .map(|r| r.doc.master_project_id)
        .collect();
    let projects = state
        .master_projects
        .find(|p| codes.contains(&p.master_project_id));
    Ok(Json(ProjectsForUserResponse { projects }))
}
