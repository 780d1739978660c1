// SPDX-License-Identifier: BUSL-1.1
//! Audit answers, keyed by school, hierarchy position, frequency and role.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

use super::{require_non_empty, Document};
use crate::error::{CoreError, CoreResult};

/// Upper bound on answer entries in one submission.
pub const MAX_ANSWERS: usize = 5000;

/// One school's answers for one hierarchy slot, frequency and role.
///
/// The six key fields together identify at most one stored document; see
/// [`AuditAnswer::key`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuditAnswer {
    pub school_id: String,
    pub dept_code: String,
    pub sub_dept_code: String,
    pub sub_sub_dept_code: String,
    pub frequency: String,
    pub role_code: String,
    #[serde(default)]
    pub final_submit: bool,
    #[serde(default)]
    #[schema(value_type = Vec<Object>)]
    pub answers: Vec<Value>,
}

/// The composite identity of an audit answer.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AuditAnswerKey {
    pub school_id: String,
    pub dept_code: String,
    pub sub_dept_code: String,
    pub sub_sub_dept_code: String,
    pub frequency: String,
    pub role_code: String,
}

impl AuditAnswer {
    pub fn key(&self) -> AuditAnswerKey {
        AuditAnswerKey {
            school_id: self.school_id.clone(),
            dept_code: self.dept_code.clone(),
            sub_dept_code: self.sub_dept_code.clone(),
            sub_sub_dept_code: self.sub_sub_dept_code.clone(),
            frequency: self.frequency.clone(),
            role_code: self.role_code.clone(),
        }
    }

    /// Exact, field-by-field key comparison without cloning.
    pub fn has_key(&self, key: &AuditAnswerKey) -> bool {
        self.school_id == key.school_id
            && self.dept_code == key.dept_code
            && self.sub_dept_code == key.sub_dept_code
            && self.sub_sub_dept_code == key.sub_sub_dept_code
            && self.frequency == key.frequency
            && self.role_code == key.role_code
    }
}

impl Document for AuditAnswer {
    const COLLECTION: &'static str = "audit_answers";
    const FILTER_FIELDS: &'static [&'static str] = &[
        "schoolId",
        "deptCode",
        "subDeptCode",
        "subSubDeptCode",
        "frequency",
        "roleCode",
        "finalSubmit",
    ];
    const SEARCH_FIELDS: &'static [&'static str] = &["deptCode", "subDeptCode", "subSubDeptCode"];

    fn validate(&self) -> CoreResult<()> {
        require_non_empty("schoolId", &self.school_id)?;
        require_non_empty("deptCode", &self.dept_code)?;
        require_non_empty("subDeptCode", &self.sub_dept_code)?;
        require_non_empty("subSubDeptCode", &self.sub_sub_dept_code)?;
        require_non_empty("frequency", &self.frequency)?;
        require_non_empty("roleCode", &self.role_code)?;
        if self.answers.len() > MAX_ANSWERS {
            return Err(CoreError::validation(format!(
                "answers must not exceed {MAX_ANSWERS} entries"
            )));
        }
        Ok(())
    }

    fn unique_key(&self) -> Option<String> {
        let key: [&str; 6] = [
            self.school_id.as_str(),
            &self.dept_code,
            &self.sub_dept_code,
            &self.sub_sub_dept_code,
            &self.frequency,
            &self.role_code,
        ];
        Some(key.join("\u{1f}"))
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn answer(school: &str, dept: &str, answers: Vec<Value>) -> AuditAnswer {
        AuditAnswer {
            school_id: school.into(),
            dept_code: dept.into(),
            sub_dept_code: "SD1".into(),
            sub_sub_dept_code: "SSD1".into(),
            frequency: "monthly".into(),
            role_code: "HM".into(),
            final_submit: false,
            answers,
        }
    }
}
