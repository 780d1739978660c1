// SPDX-License-Identifier: BUSL-1.1
//! # Entity Documents
//!
//! Each entity is a plain serde struct implementing [`Document`]. Stored
//! documents are wrapped in a [`Record`] that adds the generated id and the
//! creation/update timestamps; the domain fields are flattened next to them
//! so the JSON shape is a single flat object.
//!
//! Parents in the geographic and department hierarchies are referenced by
//! string name/code only. Nothing in this module checks that a parent exists.

pub mod audit;
pub mod coordinator;
pub mod department;
pub mod geography;
pub mod survey;

use std::fmt;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{CoreError, CoreResult};

pub use audit::{AuditAnswer, AuditAnswerKey};
pub use coordinator::{CoordinatorAssignment, CoordinatorRole};
pub use department::{Category, Department, SubCategory, SubDepartment, SubSubDepartment};
pub use geography::{Block, District, Division, School};
pub use survey::{MasterProject, SurveyQuestions};

/// A storable entity.
///
/// The associated constants drive the generic list endpoint: which query
/// parameters become exact-match filters and which columns the free-text
/// `search` parameter scans. Names are the serialized (JSON) field names.
pub trait Document:
    Serialize + DeserializeOwned + Clone + fmt::Debug + Send + Sync + 'static
{
    /// Collection name, used in error messages, metrics and persistence.
    const COLLECTION: &'static str;

    /// Query parameters accepted as exact-match filters.
    const FILTER_FIELDS: &'static [&'static str] = &[];

    /// Columns matched case-insensitively by the `search` parameter.
    const SEARCH_FIELDS: &'static [&'static str] = &[];

    /// Field-level checks run on create and after every update.
    fn validate(&self) -> CoreResult<()> {
        Ok(())
    }

    /// Identity at most one stored document may carry. `None` means the
    /// entity has no natural key besides its id.
    fn unique_key(&self) -> Option<String> {
        None
    }
}

/// A stored document with its generated id and timestamps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record<T> {
    pub id: Uuid,
    #[serde(flatten)]
    pub doc: T,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl<T: Document> Record<T> {
    /// Wrap a fresh document with a new id and `now` timestamps.
    pub fn new(doc: T, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            doc,
            created_at: now,
            updated_at: now,
        }
    }

    /// The flat JSON form used for filtering, sorting and patching.
    pub fn to_value(&self) -> CoreResult<serde_json::Value> {
        Ok(serde_json::to_value(self)?)
    }
}

/// Reject empty or whitespace-only strings.
pub(crate) fn require_non_empty(field: &str, value: &str) -> CoreResult<()> {
    if value.trim().is_empty() {
        return Err(CoreError::validation(format!("{field} must not be empty")));
    }
    if value.len() > 255 {
        return Err(CoreError::validation(format!(
            "{field} must not exceed 255 characters"
        )));
    }
    Ok(())
}

/// Reject empty optional strings when present.
pub(crate) fn require_non_empty_opt(field: &str, value: Option<&str>) -> CoreResult<()> {
    match value {
        Some(v) => require_non_empty(field, v),
        None => Ok(()),
    }
}

/// A single weightage must be a percentage.
pub(crate) fn require_weightage(field: &str, value: f64) -> CoreResult<()> {
    if !value.is_finite() || !(0.0..=100.0).contains(&value) {
        return Err(CoreError::validation(format!(
            "{field} must be between 0 and 100"
        )));
    }
    Ok(())
}

/// Display orders are positions, so negatives are rejected.
pub(crate) fn require_display_order(field: &str, value: i64) -> CoreResult<()> {
    if value < 0 {
        return Err(CoreError::validation(format!(
            "{field} must not be negative"
        )));
    }
    Ok(())
}
