// SPDX-License-Identifier: BUSL-1.1
//! Coordinator assignments: which emails coordinate a master project, per
//! coordinator role.
//!
//! Each role has its own email array. Adding to an array is a set union:
//! emails are normalized (trimmed, lower-cased) and an email already present
//! is not appended again. Array order is insertion order.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{require_non_empty, require_non_empty_opt, Document};
use crate::error::{CoreError, CoreResult};

/// Which email array of an assignment a coordinator belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum CoordinatorRole {
    #[serde(rename = "block")]
    Block,
    #[serde(rename = "district")]
    District,
    #[serde(rename = "division")]
    Division,
    #[serde(rename = "SME")]
    Sme,
}

impl CoordinatorRole {
    pub const ALL: [CoordinatorRole; 4] = [Self::Block, Self::District, Self::Division, Self::Sme];

    /// Parse a role tag as found in uploads and request bodies.
    ///
    /// Accepts the short role names and the array field names, ignoring case.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag.trim().to_ascii_lowercase().as_str() {
            "block" | "blockcoordinatoremails" => Some(Self::Block),
            "district" | "districtcoordinatoremails" => Some(Self::District),
            "division" | "divisioncoordinatoremails" => Some(Self::Division),
            "sme" | "smeemails" => Some(Self::Sme),
            _ => None,
        }
    }

    /// JSON name of the email array this role maps to.
    pub fn field_name(self) -> &'static str {
        match self {
            Self::Block => "blockCoordinatorEmails",
            Self::District => "districtCoordinatorEmails",
            Self::Division => "divisionCoordinatorEmails",
            Self::Sme => "smeEmails",
        }
    }
}

impl fmt::Display for CoordinatorRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Block => "block",
            Self::District => "district",
            Self::Division => "division",
            Self::Sme => "SME",
        };
        f.write_str(s)
    }
}

/// Normalize an email for storage and comparison.
///
/// Returns `None` when the input is not shaped like `local@domain`.
pub fn normalize_email(raw: &str) -> Option<String> {
    let email = raw.trim().to_lowercase();
    let (local, domain) = email.split_once('@')?;
    if local.is_empty()
        || domain.is_empty()
        || domain.contains('@')
        || email.chars().any(char::is_whitespace)
    {
        return None;
    }
    Some(email)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CoordinatorAssignment {
    pub master_project_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
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

impl CoordinatorAssignment {
    /// An assignment with no coordinators yet.
    pub fn new(master_project_id: impl Into<String>) -> Self {
        Self {
            master_project_id: master_project_id.into(),
            survey_admin: None,
            block_coordinator_emails: Vec::new(),
            district_coordinator_emails: Vec::new(),
            division_coordinator_emails: Vec::new(),
            sme_emails: Vec::new(),
        }
    }

    pub fn emails(&self, role: CoordinatorRole) -> &[String] {
        match role {
            CoordinatorRole::Block => &self.block_coordinator_emails,
            CoordinatorRole::District => &self.district_coordinator_emails,
            CoordinatorRole::Division => &self.division_coordinator_emails,
            CoordinatorRole::Sme => &self.sme_emails,
        }
    }

    fn emails_mut(&mut self, role: CoordinatorRole) -> &mut Vec<String> {
        match role {
            CoordinatorRole::Block => &mut self.block_coordinator_emails,
            CoordinatorRole::District => &mut self.district_coordinator_emails,
            CoordinatorRole::Division => &mut self.division_coordinator_emails,
            CoordinatorRole::Sme => &mut self.sme_emails,
        }
    }

    /// Whether `email` (normalized) is in the array for `role`.
    pub fn contains(&self, role: CoordinatorRole, email: &str) -> bool {
        match normalize_email(email) {
            Some(email) => self.emails(role).iter().any(|e| *e == email),
            None => false,
        }
    }

    /// Add one email to a role's array. Returns `true` when it was new.
    ///
    /// Invalid emails are ignored and reported as not added; callers that
    /// need to distinguish the two validate with [`normalize_email`] first.
    pub fn add_email(&mut self, role: CoordinatorRole, email: &str) -> bool {
        let Some(email) = normalize_email(email) else {
            return false;
        };
        let list = self.emails_mut(role);
        if list.iter().any(|e| *e == email) {
            return false;
        }
        list.push(email);
        true
    }

    /// Set-union a batch of emails into a role's array. Returns how many
    /// were actually appended.
    pub fn merge_emails<'a, I>(&mut self, role: CoordinatorRole, emails: I) -> usize
    where
        I: IntoIterator<Item = &'a str>,
    {
        emails
            .into_iter()
            .filter(|e| self.add_email(role, e))
            .count()
    }

    /// Union every array of `other` into `self`. `surveyAdmin` is taken
    /// from `other` when it carries one.
    pub fn merge(&mut self, other: &CoordinatorAssignment) -> usize {
        if other.survey_admin.is_some() {
            self.survey_admin = other.survey_admin.clone();
        }
        CoordinatorRole::ALL
            .iter()
            .map(|role| {
                let incoming: Vec<&str> = other.emails(*role).iter().map(String::as_str).collect();
                self.merge_emails(*role, incoming)
            })
            .sum()
    }
}

impl Document for CoordinatorAssignment {
    const COLLECTION: &'static str = "coordinator_assignments";
    const FILTER_FIELDS: &'static [&'static str] = &["masterProjectId", "surveyAdmin"];

    fn validate(&self) -> CoreResult<()> {
        require_non_empty("masterProjectId", &self.master_project_id)?;
        require_non_empty_opt("surveyAdmin", self.survey_admin.as_deref())?;
        for role in CoordinatorRole::ALL {
            let mut seen = HashSet::new();
            for email in self.emails(role) {
                let normalized = normalize_email(email).ok_or_else(|| {
                    CoreError::validation(format!(
                        "{} contains an invalid email: {email}",
                        role.field_name()
                    ))
                })?;
                if !seen.insert(normalized) {
                    return Err(CoreError::validation(format!(
                        "{} contains a duplicate email: {email}",
                        role.field_name()
                    )));
                }
            }
        }
        Ok(())
    }

    fn unique_key(&self) -> Option<String> {
        Some(self.master_project_id.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn role_tags_accept_aliases() {
        assert_eq!(CoordinatorRole::from_tag("block"), Some(CoordinatorRole::Block));
        assert_eq!(
            CoordinatorRole::from_tag("blockCoordinatorEmails"),
            Some(CoordinatorRole::Block)
        );
        assert_eq!(CoordinatorRole::from_tag(" SME "), Some(CoordinatorRole::Sme));
        assert_eq!(CoordinatorRole::from_tag("smeEmails"), Some(CoordinatorRole::Sme));
        assert_eq!(
            CoordinatorRole::from_tag("DIVISION"),
            Some(CoordinatorRole::Division)
        );
        assert_eq!(CoordinatorRole::from_tag("principal"), None);
        assert_eq!(CoordinatorRole::from_tag(""), None);
    }

    #[test]
    fn role_serializes_to_short_name() {
        assert_eq!(serde_json::to_string(&CoordinatorRole::Sme).unwrap(), "\"SME\"");
        assert_eq!(CoordinatorRole::District.to_string(), "district");
    }

    #[test]
    fn normalize_email_lowercases_and_trims() {
        assert_eq!(
            normalize_email("  A.User@Example.ORG "),
            Some("a.user@example.org".to_string())
        );
        assert_eq!(normalize_email("no-at-sign"), None);
        assert_eq!(normalize_email("@domain"), None);
        assert_eq!(normalize_email("a@b@c"), None);
        assert_eq!(normalize_email("a b@c.d"), None);
    }

    #[test]
    fn add_email_is_set_union() {
        let mut a = CoordinatorAssignment::new("P1");
        assert!(a.add_email(CoordinatorRole::Block, "x@y.z"));
        assert!(!a.add_email(CoordinatorRole::Block, "X@Y.Z"));
        assert!(a.add_email(CoordinatorRole::District, "x@y.z"));
        assert_eq!(a.block_coordinator_emails, vec!["x@y.z"]);
        assert_eq!(a.district_coordinator_emails, vec!["x@y.z"]);
    }

    #[test]
    fn merge_counts_only_new_emails() {
        let mut a = CoordinatorAssignment::new("P1");
        a.add_email(CoordinatorRole::Sme, "a@x.org");
        let mut incoming = CoordinatorAssignment::new("P1");
        incoming.sme_emails = vec!["a@x.org".into(), "b@x.org".into()];
        incoming.block_coordinator_emails = vec!["c@x.org".into()];
        incoming.survey_admin = Some("admin-1".into());
        assert_eq!(a.merge(&incoming), 2);
        assert_eq!(a.sme_emails, vec!["a@x.org", "b@x.org"]);
        assert_eq!(a.survey_admin.as_deref(), Some("admin-1"));
    }

    #[test]
    fn contains_normalizes_the_lookup_email() {
        let mut a = CoordinatorAssignment::new("P1");
        a.add_email(CoordinatorRole::Division, "boss@x.org");
        assert!(a.contains(CoordinatorRole::Division, " BOSS@x.org"));
        assert!(!a.contains(CoordinatorRole::Block, "boss@x.org"));
    }

    #[test]
    fn validate_rejects_duplicates() {
        let mut a = CoordinatorAssignment::new("P1");
        a.block_coordinator_emails = vec!["a@x.org".into(), "A@x.org".into()];
        let err = a.validate().unwrap_err();
        assert!(err.to_string().contains("duplicate"));
    }

    proptest! {
        /// Applying the same batch twice leaves the array as applying it once.
        #[test]
        fn merge_is_idempotent(emails in prop::collection::vec("[a-e]{1,3}@[a-c]\\.org", 0..20)) {
            let refs: Vec<&str> = emails.iter().map(String::as_str).collect();
            let mut once = CoordinatorAssignment::new("P");
            once.merge_emails(CoordinatorRole::Block, refs.iter().copied());
            let mut twice = once.clone();
            let added = twice.merge_emails(CoordinatorRole::Block, refs.iter().copied());
            prop_assert_eq!(added, 0);
            prop_assert_eq!(&once, &twice);
            prop_assert!(once.validate().is_ok());
        }
    }
}
