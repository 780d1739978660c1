// SPDX-License-Identifier: BUSL-1.1
//! # List Filters
//!
//! A [`Filter`] is evaluated against the flat JSON form of a record:
//!
//! - every exact-match clause must hold (AND);
//! - the optional search clause holds when *any* of its columns contains the
//!   needle, ignoring case (OR).
//!
//! Filters are built from query parameters through a whitelist so unknown
//! parameters never reach the store.

use std::collections::HashMap;

use serde_json::Value;

/// Query parameter carrying the free-text search needle.
pub const SEARCH_PARAM: &str = "search";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    equals: Vec<(String, String)>,
    search: Option<Search>,
}

#[derive(Debug, Clone, PartialEq)]
struct Search {
    fields: Vec<String>,
    needle: String,
}

impl Filter {
    /// A filter that matches everything.
    pub fn new() -> Self {
        Self::default()
    }

    /// Require `field` to equal `value`.
    pub fn eq(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.equals.push((field.into(), value.into()));
        self
    }

    /// Require at least one of `fields` to contain `needle`, ignoring case.
    ///
    /// A blank needle adds no clause.
    pub fn search(mut self, fields: &[&str], needle: &str) -> Self {
        let needle = needle.trim();
        if needle.is_empty() || fields.is_empty() {
            return self;
        }
        self.search = Some(Search {
            fields: fields.iter().map(|f| (*f).to_string()).collect(),
            needle: needle.to_lowercase(),
        });
        self
    }

    /// Build a filter from raw query parameters.
    ///
    /// Parameters named in `allowed` become exact matches; `search` becomes
    /// the search clause over `search_fields`. Everything else is ignored.
    pub fn from_params(
        params: &HashMap<String, String>,
        allowed: &[&str],
        search_fields: &[&str],
    ) -> Self {
        let mut filter = Self::new();
        for field in allowed {
            if let Some(value) = params.get(*field) {
                filter = filter.eq(*field, value.clone());
            }
        }
        if let Some(needle) = params.get(SEARCH_PARAM) {
            filter = filter.search(search_fields, needle);
        }
        filter
    }

    pub fn is_empty(&self) -> bool {
        self.equals.is_empty() && self.search.is_none()
    }

    /// Evaluate against a record's JSON object.
    pub fn matches(&self, doc: &Value) -> bool {
        let equals_ok = self.equals.iter().all(|(field, expected)| {
            doc.get(field)
                .is_some_and(|actual| scalar_equals(actual, expected))
        });
        if !equals_ok {
            return false;
        }
        match &self.search {
            None => true,
            Some(search) => search.fields.iter().any(|field| {
                doc.get(field)
                    .and_then(Value::as_str)
                    .is_some_and(|s| s.to_lowercase().contains(&search.needle))
            }),
        }
    }
}

/// Compare a stored scalar with a query-string value.
///
/// Strings compare verbatim; numbers and booleans compare by their textual
/// form so `?finalSubmit=true` and `?CategoryDisplayOrder=3` work.
fn scalar_equals(actual: &Value, expected: &str) -> bool {
    match actual {
        Value::String(s) => s == expected,
        Value::Bool(b) => expected.parse::<bool>().is_ok_and(|e| e == *b),
        Value::Number(n) => match (n.as_f64(), expected.parse::<f64>()) {
            (Some(a), Ok(e)) => a == e,
            _ => false,
        },
        _ => false,
    }
}
