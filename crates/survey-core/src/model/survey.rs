// SPDX-License-Identifier: BUSL-1.1
//! Survey definitions and the master projects coordinators are assigned to.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

use super::{require_non_empty, require_non_empty_opt, Document};
use crate::error::{CoreError, CoreResult};

/// Upper bound on questions in one survey document.
pub const MAX_QUESTIONS: usize = 1000;

/// A survey: an ordered list of loosely-typed question objects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SurveyQuestions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    #[schema(value_type = Vec<Object>)]
    pub questions: Vec<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by_id: Option<String>,
    #[serde(default)]
    pub final_submit: bool,
}

impl Document for SurveyQuestions {
    const COLLECTION: &'static str = "survey_questions";
    const FILTER_FIELDS: &'static [&'static str] = &["createdById", "finalSubmit"];
    const SEARCH_FIELDS: &'static [&'static str] = &["title", "description"];

    fn validate(&self) -> CoreResult<()> {
        if self.questions.len() > MAX_QUESTIONS {
            return Err(CoreError::validation(format!(
                "questions must not exceed {MAX_QUESTIONS} entries"
            )));
        }
        if let Some(idx) = self.questions.iter().position(|q| !q.is_object()) {
            return Err(CoreError::validation(format!(
                "questions[{idx}] must be an object"
            )));
        }
        Ok(())
    }
}

/// A survey project, referenced by its human-readable `masterProjectId`
/// code rather than by the record id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MasterProject {
    pub master_project_id: String,
    pub project_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

impl Document for MasterProject {
    const COLLECTION: &'static str = "master_projects";
    const FILTER_FIELDS: &'static [&'static str] =
        &["masterProjectId", "projectName", "createdBy", "status"];
    const SEARCH_FIELDS: &'static [&'static str] = &["masterProjectId", "projectName"];

    fn validate(&self) -> CoreResult<()> {
        require_non_empty("masterProjectId", &self.master_project_id)?;
        require_non_empty("projectName", &self.project_name)?;
        require_non_empty_opt("status", self.status.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn survey_defaults() {
        let s: SurveyQuestions = serde_json::from_value(json!({"title": "T"})).unwrap();
        assert!(s.questions.is_empty());
        assert!(!s.final_submit);
        assert!(s.validate().is_ok());
    }

    #[test]
    fn survey_keeps_question_order() {
        let s: SurveyQuestions = serde_json::from_value(json!({
            "questions": [{"q": 1}, {"q": 2}, {"q": 3}]
        }))
        .unwrap();
        let order: Vec<i64> = s.questions.iter().map(|q| q["q"].as_i64().unwrap()).collect();
        assert_eq!(order, vec![1, 2, 3]);
    }

    #[test]
    fn survey_rejects_scalar_question() {
        let s: SurveyQuestions =
            serde_json::from_value(json!({"questions": [{"q": 1}, "oops"]})).unwrap();
        let err = s.validate().unwrap_err();
        assert!(err.to_string().contains("questions[1]"));
    }

    #[test]
    fn master_project_requires_code() {
        let p = MasterProject {
            master_project_id: "".into(),
            project_name: "Audit 2024".into(),
            project_description: None,
            created_by: None,
            status: None,
        };
        assert!(p.validate().is_err());
    }
}
