// SPDX-License-Identifier: BUSL-1.1
//! # Audit Answer API
//!
//! Generic routes plus `PUT /v1/audit-answer`, the create-or-update keyed by
//! `(schoolId, deptCode, subDeptCode, subSubDeptCode, frequency, roleCode)`.
//! A matching document is replaced whole; the last write wins. The generic
//! `POST` and `PUT /{id}` routes answer 409 when the key is already taken by
//! another document.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::put;
use axum::{Json, Router};
use survey_core::model::AuditAnswer;
use survey_core::{Collection, Record};

use super::crud::{crud_routes, persist, Resource};
use crate::error::AppError;
use crate::extractors::extract_json;
use crate::state::AppState;

impl Resource for AuditAnswer {
    fn collection(state: &AppState) -> &Collection<Self> {
        &state.audit_answers
    }
}

pub fn router() -> Router<AppState> {
    crud_routes::<AuditAnswer>("/v1/audit-answer")
        .route("/v1/audit-answer", put(create_or_update_answer))
}

/// PUT /v1/audit-answer — Create or replace the answer for a composite key.
#[utoipa::path(
    put,
    path = "/v1/audit-answer",
    request_body = AuditAnswer,
    responses(
        (status = 200, description = "Stored audit answer, with id and timestamps", body = AuditAnswer),
        (status = 422, description = "Missing key field or malformed body", body = crate::error::ErrorBody),
    ),
    security(("bearer_auth" = [])),
    tag = "audit_answers"
)]
pub(crate) async fn create_or_update_answer(
    State(state): State<AppState>,
    body: Result<Json<AuditAnswer>, JsonRejection>,
) -> Result<(StatusCode, Json<Record<AuditAnswer>>), AppError> {
    let answer = extract_json(body)?;
    let key = answer.key();

    let (record, outcome) = state
        .audit_answers
        .upsert_with(|a| a.has_key(&key), |_| Ok(Some(answer)))?;
    persist(&state, &record).await?;

    tracing::info!(
        id = %record.id,
        school_id = %record.doc.school_id,
        dept_code = %record.doc.dept_code,
        outcome = ?outcome,
        "audit answer stored"
    );
    Ok((StatusCode::OK, Json(record)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::crud::test_support::*;
    use serde_json::json;
    use tower::ServiceExt;

    fn payload(school: &str, answers: serde_json::Value, final_submit: bool) -> serde_json::Value {
        json!({
            "schoolId": school,
            "deptCode": "D1",
            "subDeptCode": "SD1",
            "subSubDeptCode": "SSD1",
            "frequency": "monthly",
            "roleCode": "HM",
            "finalSubmit": final_submit,
            "answers": answers
        })
    }

    #[tokio::test]
    async fn put_creates_then_replaces_same_key() {
        let state = AppState::new();

        let resp = with_caller(router(), state.clone())
            .oneshot(json_request(
                "PUT",
                "/v1/audit-answer",
                payload("S1", json!([{"q": 1, "a": "yes"}]), false),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let first = body_json(resp).await;

        let resp = with_caller(router(), state.clone())
            .oneshot(json_request(
                "PUT",
                "/v1/audit-answer",
                payload("S1", json!([{"q": 1, "a": "no"}]), true),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let second = body_json(resp).await;

        assert_eq!(first["id"], second["id"]);
        assert_eq!(first["createdAt"], second["createdAt"]);
        assert_eq!(second["answers"][0]["a"], "no");
        assert_eq!(second["finalSubmit"], true);
        assert_eq!(state.audit_answers.len(), 1);
    }

    #[tokio::test]
    async fn put_with_different_key_inserts() {
        let state = AppState::new();
        for school in ["S1", "S2"] {
            let resp = with_caller(router(), state.clone())
                .oneshot(json_request("PUT", "/v1/audit-answer", payload(school, json!([]), false)))
                .await
                .unwrap();
            assert_eq!(resp.status(), StatusCode::OK);
        }
        assert_eq!(state.audit_answers.len(), 2);
    }

    #[tokio::test]
    async fn put_missing_key_field_returns_422() {
        let resp = with_caller(router(), AppState::new())
            .oneshot(json_request(
                "PUT",
                "/v1/audit-answer",
                json!({"schoolId": "S1", "answers": []}),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn post_still_creates_with_201() {
        let resp = with_caller(router(), AppState::new())
            .oneshot(json_request("POST", "/v1/audit-answer", payload("S1", json!([]), false)))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::CREATED);
    }

    #[tokio::test]
    async fn post_twice_with_same_key_conflicts() {
        let state = AppState::new();
        let resp = with_caller(router(), state.clone())
            .oneshot(json_request("POST", "/v1/audit-answer", payload("S1", json!([]), false)))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::CREATED);

        let resp = with_caller(router(), state.clone())
            .oneshot(json_request("POST", "/v1/audit-answer", payload("S1", json!([]), true)))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::CONFLICT);
        assert_eq!(body_json(resp).await["error"]["code"], "CONFLICT");
        assert_eq!(state.audit_answers.len(), 1);
    }

    #[tokio::test]
    async fn put_by_id_onto_another_key_conflicts() {
        let state = AppState::new();
        let mut ids = Vec::new();
        for school in ["S1", "S2"] {
            let resp = with_caller(router(), state.clone())
                .oneshot(json_request("POST", "/v1/audit-answer", payload(school, json!([]), false)))
                .await
                .unwrap();
            ids.push(body_json(resp).await["id"].as_str().unwrap().to_string());
        }

        let resp = with_caller(router(), state.clone())
            .oneshot(json_request(
                "PUT",
                &format!("/v1/audit-answer/{}", ids[1]),
                json!({"schoolId": "S1"}),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::CONFLICT);
        assert_eq!(state.audit_answers.find(|a| a.school_id == "S2").len(), 1);

        let resp = with_caller(router(), state.clone())
            .oneshot(json_request(
                "PUT",
                &format!("/v1/audit-answer/{}", ids[1]),
                json!({"finalSubmit": true}),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn search_matches_dept_codes_case_insensitively() {
        let state = AppState::new();
        for (school, dept) in [("S1", "ABX"), ("S2", "xab"), ("S3", "QQQ")] {
            let mut body = payload(school, json!([]), false);
            body["deptCode"] = json!(dept);
            with_caller(router(), state.clone())
                .oneshot(json_request("PUT", "/v1/audit-answer", body))
                .await
                .unwrap();
        }

        let resp = with_caller(router(), state)
            .oneshot(empty_request("GET", "/v1/audit-answer?search=ab"))
            .await
            .unwrap();
        let page = body_json(resp).await;
        assert_eq!(page["totalResults"], 2);
    }
}
