// SPDX-License-Identifier: BUSL-1.1
//! # Department Hierarchy API
//!
//! Generic routes for the five department levels. Updating any of the four
//! ancestor levels plans a [`Cascade`] before anything is written: code
//! renames move the intermediate levels below, and the copies embedded in
//! sub-category rows are rewritten. The staged rows are committed and
//! persisted after the ancestor itself.

use axum::Router;
use survey_core::hierarchy::{self, Cascade, DepartmentTree};
use survey_core::model::{Category, Department, SubCategory, SubDepartment, SubSubDepartment};
use survey_core::{Collection, CoreResult};

use super::crud::{crud_routes, Resource};
use crate::state::AppState;

fn tree(state: &AppState) -> DepartmentTree {
    DepartmentTree {
        sub_departments: state.sub_departments.clone(),
        sub_sub_departments: state.sub_sub_departments.clone(),
        categories: state.categories.clone(),
        sub_categories: state.sub_categories.clone(),
    }
}

impl Resource for Department {
    fn collection(state: &AppState) -> &Collection<Self> {
        &state.departments
    }

    fn plan_update(state: &AppState, before: &Self, after: &Self) -> CoreResult<Option<Cascade>> {
        hierarchy::plan(&tree(state), before, after).map(Some)
    }
}

impl Resource for SubDepartment {
    fn collection(state: &AppState) -> &Collection<Self> {
        &state.sub_departments
    }

    fn plan_update(state: &AppState, before: &Self, after: &Self) -> CoreResult<Option<Cascade>> {
        hierarchy::plan(&tree(state), before, after).map(Some)
    }
}

impl Resource for SubSubDepartment {
    fn collection(state: &AppState) -> &Collection<Self> {
        &state.sub_sub_departments
    }

    fn plan_update(state: &AppState, before: &Self, after: &Self) -> CoreResult<Option<Cascade>> {
        hierarchy::plan(&tree(state), before, after).map(Some)
    }
}

impl Resource for Category {
    fn collection(state: &AppState) -> &Collection<Self> {
        &state.categories
    }

    fn plan_update(state: &AppState, before: &Self, after: &Self) -> CoreResult<Option<Cascade>> {
        hierarchy::plan(&tree(state), before, after).map(Some)
    }
}

impl Resource for SubCategory {
    fn collection(state: &AppState) -> &Collection<Self> {
        &state.sub_categories
    }
}

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(crud_routes::<Department>("/v1/department"))
        .merge(crud_routes::<SubDepartment>("/v1/sub-department"))
        .merge(crud_routes::<SubSubDepartment>("/v1/sub-sub-department"))
        .merge(crud_routes::<Category>("/v1/category"))
        .merge(crud_routes::<SubCategory>("/v1/sub-category"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::crud::test_support::*;
    use axum::http::StatusCode;
    use serde_json::json;
    use tower::ServiceExt;

    fn department(code: &str) -> Department {
        Department {
            department_code: code.into(),
            department_group_code: "G1".into(),
            department_description: format!("{code} description"),
            department_weightage: 40.0,
        }
    }

    fn sub_category(dept: &str, code: &str) -> serde_json::Value {
        json!({
            "DepartmentCode": dept,
            "DepartmentGroupCode": "G1",
            "DepartmentDescription": format!("{dept} description"),
            "DepartmentWeightage": 40,
            "SubDepartmentCode": "SD1",
            "SubDepartmentDescription": "SD1 description",
            "SubDepartmentWeightage": 50,
            "SubSubDepartmentCode": "SSD1",
            "SubSubDepartmentDescription": "SSD1 description",
            "SubSubDepartmentWeightage": 25,
            "CategoryCode": "C1",
            "CategoryDescription": "C1 description",
            "CategoryWeightage": 10,
            "CategoryDisplayOrder": 1,
            "SubCategoryCode": code,
            "SubCategoryDescription": format!("{code} description"),
            "SubCategoryWeightage": 5,
            "SubCategoryDisplayOrder": 2
        })
    }

    #[tokio::test]
    async fn sub_category_create_uses_pascal_case_fields() {
        let resp = with_caller(router(), AppState::new())
            .oneshot(json_request("POST", "/v1/sub-category", sub_category("D1", "SC1")))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::CREATED);
        let body = body_json(resp).await;
        assert_eq!(body["SubCategoryCode"], "SC1");
        assert!(body["id"].is_string());
    }

    #[tokio::test]
    async fn weightage_out_of_range_is_rejected() {
        let resp = with_caller(router(), AppState::new())
            .oneshot(json_request(
                "POST",
                "/v1/department",
                json!({
                    "DepartmentCode": "D1",
                    "DepartmentGroupCode": "G1",
                    "DepartmentDescription": "Infrastructure",
                    "DepartmentWeightage": 140
                }),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn department_update_propagates_to_sub_categories() {
        let state = AppState::new();
        let dept = state.departments.create(department("D1")).unwrap();
        for (d, code) in [("D1", "SC1"), ("D1", "SC2"), ("D2", "SC3")] {
            let resp = with_caller(router(), state.clone())
                .oneshot(json_request("POST", "/v1/sub-category", sub_category(d, code)))
                .await
                .unwrap();
            assert_eq!(resp.status(), StatusCode::CREATED);
        }

        let resp = with_caller(router(), state.clone())
            .oneshot(json_request(
                "PUT",
                &format!("/v1/department/{}", dept.id),
                json!({"DepartmentCode": "D9", "DepartmentDescription": "Renamed"}),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let renamed = state.sub_categories.find(|sc| sc.department_code == "D9");
        assert_eq!(renamed.len(), 2);
        assert!(renamed
            .iter()
            .all(|r| r.doc.department_description == "Renamed"));
        assert_eq!(
            state.sub_categories.find(|sc| sc.department_code == "D2").len(),
            1
        );
    }

    #[tokio::test]
    async fn child_edit_after_department_rename_reaches_sub_categories() {
        let state = AppState::new();
        let dept = state.departments.create(department("D1")).unwrap();
        let sub = state
            .sub_departments
            .create(SubDepartment {
                department_code: "D1".into(),
                sub_department_code: "SD1".into(),
                sub_department_description: "SD1 description".into(),
                sub_department_weightage: 50.0,
            })
            .unwrap();
        let resp = with_caller(router(), state.clone())
            .oneshot(json_request("POST", "/v1/sub-category", sub_category("D1", "SC1")))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::CREATED);

        let resp = with_caller(router(), state.clone())
            .oneshot(json_request(
                "PUT",
                &format!("/v1/department/{}", dept.id),
                json!({"DepartmentCode": "D9"}),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            state.sub_departments.require(&sub.id).unwrap().doc.department_code,
            "D9"
        );

        let resp = with_caller(router(), state.clone())
            .oneshot(json_request(
                "PUT",
                &format!("/v1/sub-department/{}", sub.id),
                json!({"SubDepartmentDescription": "Classrooms"}),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let rows = state.sub_categories.find(|_| true);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].doc.department_code, "D9");
        assert_eq!(rows[0].doc.sub_department_description, "Classrooms");
    }

    #[tokio::test]
    async fn invalid_ancestor_update_changes_nothing() {
        let state = AppState::new();
        let dept = state.departments.create(department("D1")).unwrap();
        let resp = with_caller(router(), state.clone())
            .oneshot(json_request("POST", "/v1/sub-category", sub_category("D1", "SC1")))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::CREATED);

        let resp = with_caller(router(), state.clone())
            .oneshot(json_request(
                "PUT",
                &format!("/v1/department/{}", dept.id),
                json!({"DepartmentCode": "D9", "DepartmentWeightage": 140}),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(state.departments.require(&dept.id).unwrap().doc.department_code, "D1");
        assert_eq!(state.sub_categories.find(|sc| sc.department_code == "D1").len(), 1);
    }

    #[tokio::test]
    async fn sub_category_update_does_not_touch_siblings() {
        let state = AppState::new();
        let mut ids = Vec::new();
        for code in ["SC1", "SC2"] {
            let resp = with_caller(router(), state.clone())
                .oneshot(json_request("POST", "/v1/sub-category", sub_category("D1", code)))
                .await
                .unwrap();
            ids.push(body_json(resp).await["id"].as_str().unwrap().to_string());
        }

        let resp = with_caller(router(), state.clone())
            .oneshot(json_request(
                "PUT",
                &format!("/v1/sub-category/{}", ids[0]),
                json!({"SubCategoryWeightage": 7}),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_json(resp).await["SubCategoryWeightage"], 7.0);
        assert_eq!(
            state
                .sub_categories
                .find(|sc| sc.sub_category_weightage == 5.0)
                .len(),
            1
        );
    }
}
