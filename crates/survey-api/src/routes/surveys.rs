// SPDX-License-Identifier: BUSL-1.1
//! # Survey Questions & Master Projects API
//!
//! Generic routes for both, plus `GET /v1/master-project/code/{code}`.
//! The creator fields are filled from the caller's token when the payload
//! leaves them out.

use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};
use survey_core::model::{MasterProject, SurveyQuestions};
use survey_core::{Collection, Record};

use super::crud::{crud_routes, find_or_404, Resource};
use crate::auth::CallerIdentity;
use crate::error::AppError;
use crate::state::AppState;

impl Resource for SurveyQuestions {
    fn collection(state: &AppState) -> &Collection<Self> {
        &state.survey_questions
    }

    fn stamp_creator(&mut self, caller: &CallerIdentity) {
        if self.created_by_id.is_none() {
            self.created_by_id = caller.subject.clone();
        }
    }
}

impl Resource for MasterProject {
    fn collection(state: &AppState) -> &Collection<Self> {
        &state.master_projects
    }

    fn stamp_creator(&mut self, caller: &CallerIdentity) {
        if self.created_by.is_none() {
            self.created_by = caller.email.clone().or_else(|| caller.subject.clone());
        }
    }
}

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(crud_routes::<SurveyQuestions>("/v1/survey-questions"))
        .merge(crud_routes::<MasterProject>("/v1/master-project"))
        .route("/v1/master-project/code/{code}", get(master_project_by_code))
}

async fn master_project_by_code(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<Json<Record<MasterProject>>, AppError> {
    find_or_404(&state, "master project", |p: &MasterProject| {
        p.master_project_id == code
    })
}
