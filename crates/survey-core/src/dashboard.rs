// SPDX-License-Identifier: BUSL-1.1
//! Read-only aggregate views over the collections.

use std::collections::BTreeMap;

use serde::Serialize;
use utoipa::ToSchema;

use crate::model::AuditAnswer;
use crate::store::Collection;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuditTotals {
    pub total: usize,
    pub final_submitted: usize,
    pub drafts: usize,
}

impl AuditTotals {
    fn count(&mut self, answer: &AuditAnswer) {
        self.total += 1;
        if answer.final_submit {
            self.final_submitted += 1;
        } else {
            self.drafts += 1;
        }
    }
}

/// Document counts for every collection, plus audit submission totals.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub collections: BTreeMap<String, usize>,
    pub audit_answers: AuditTotals,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DepartmentProgress {
    pub dept_code: String,
    #[serde(flatten)]
    pub totals: AuditTotals,
}

/// One school's audit answers grouped by department code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuditProgress {
    pub school_id: String,
    pub departments: Vec<DepartmentProgress>,
    pub totals: AuditTotals,
}

pub fn audit_totals(answers: &Collection<AuditAnswer>) -> AuditTotals {
    let mut totals = AuditTotals::default();
    for rec in answers.list() {
        totals.count(&rec.doc);
    }
    totals
}

/// Build the summary from `(collection, count)` pairs.
pub fn summary<'a>(
    counts: impl IntoIterator<Item = (&'a str, usize)>,
    answers: &Collection<AuditAnswer>,
) -> Summary {
    Summary {
        collections: counts
            .into_iter()
            .map(|(name, n)| (name.to_string(), n))
            .collect(),
        audit_answers: audit_totals(answers),
    }
}

/// Departments come back sorted by code.
pub fn audit_progress(answers: &Collection<AuditAnswer>, school_id: &str) -> AuditProgress {
    let mut by_dept: BTreeMap<String, AuditTotals> = BTreeMap::new();
    let mut totals = AuditTotals::default();
    for rec in answers.find(|a| a.school_id == school_id) {
        by_dept
            .entry(rec.doc.dept_code.clone())
            .or_default()
            .count(&rec.doc);
        totals.count(&rec.doc);
    }
    AuditProgress {
        school_id: school_id.to_string(),
        departments: by_dept
            .into_iter()
            .map(|(dept_code, totals)| DepartmentProgress { dept_code, totals })
            .collect(),
        totals,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::audit::fixtures::answer;
    use serde_json::json;

    fn seeded() -> Collection<AuditAnswer> {
        let c = Collection::new();
        c.create(answer("S1", "D2", vec![])).unwrap();
        let mut submitted = answer("S1", "D1", vec![]);
        submitted.final_submit = true;
        c.create(submitted).unwrap();
        let mut other_slot = answer("S1", "D1", vec![]);
        other_slot.frequency = "weekly".into();
        c.create(other_slot).unwrap();
        c.create(answer("S2", "D1", vec![])).unwrap();
        c
    }

    #[test]
    fn totals_split_submitted_and_drafts() {
        let t = audit_totals(&seeded());
        assert_eq!(
            t,
            AuditTotals {
                total: 4,
                final_submitted: 1,
                drafts: 3
            }
        );
    }

    #[test]
    fn progress_groups_by_department() {
        let p = audit_progress(&seeded(), "S1");
        assert_eq!(p.totals.total, 3);
        let codes: Vec<&str> = p.departments.iter().map(|d| d.dept_code.as_str()).collect();
        assert_eq!(codes, vec!["D1", "D2"]);
        assert_eq!(p.departments[0].totals.final_submitted, 1);
        assert_eq!(p.departments[0].totals.drafts, 1);

        let v = serde_json::to_value(&p.departments[0]).unwrap();
        assert_eq!(v, json!({"deptCode": "D1", "total": 2, "finalSubmitted": 1, "drafts": 1}));
    }

    #[test]
    fn unknown_school_is_empty_not_error() {
        let p = audit_progress(&seeded(), "nope");
        assert!(p.departments.is_empty());
        assert_eq!(p.totals, AuditTotals::default());
    }

    #[test]
    fn summary_lists_collections() {
        let s = summary([("divisions", 2), ("schools", 0)], &seeded());
        assert_eq!(s.collections["divisions"], 2);
        assert_eq!(s.audit_answers.total, 4);
    }
}
