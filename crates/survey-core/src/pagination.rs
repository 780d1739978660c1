// SPDX-License-Identifier: BUSL-1.1
//! # Pagination
//!
//! List endpoints take `sortBy`, `limit` and `page` query parameters and
//! answer with a [`Page`] envelope:
//!
//! ```json
//! {"results": [...], "page": 1, "limit": 10, "totalPages": 3, "totalResults": 25}
//! ```
//!
//! `sortBy` is a comma-separated list of `field:asc` / `field:desc` keys over
//! the serialized field names. Without it, results come back in creation
//! order.

use std::cmp::Ordering;
use std::collections::HashMap;

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{CoreError, CoreResult};

pub const DEFAULT_LIMIT: usize = 10;
pub const MAX_LIMIT: usize = 1000;

/// One `field:direction` sort key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    pub field: String,
    pub descending: bool,
}

impl SortKey {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            descending: false,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            descending: true,
        }
    }

    fn parse(raw: &str) -> CoreResult<Self> {
        let (field, dir) = match raw.split_once(':') {
            Some((f, d)) => (f.trim(), d.trim()),
            None => (raw.trim(), "asc"),
        };
        if field.is_empty() {
            return Err(CoreError::validation(format!("invalid sortBy key '{raw}'")));
        }
        match dir.to_ascii_lowercase().as_str() {
            "asc" => Ok(Self::asc(field)),
            "desc" => Ok(Self::desc(field)),
            _ => Err(CoreError::validation(format!(
                "sortBy direction must be asc or desc, got '{dir}'"
            ))),
        }
    }
}

/// Sort and window options for a list query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryOptions {
    pub sort_by: Vec<SortKey>,
    pub limit: usize,
    pub page: usize,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            sort_by: Vec::new(),
            limit: DEFAULT_LIMIT,
            page: 1,
        }
    }
}

impl QueryOptions {
    /// Read `sortBy`, `limit` and `page` from raw query parameters.
    ///
    /// `limit` above [`MAX_LIMIT`] is clamped; zero, negative or
    /// non-numeric values are rejected.
    pub fn from_params(params: &HashMap<String, String>) -> CoreResult<Self> {
        let mut opts = Self::default();
        if let Some(raw) = params.get("sortBy") {
            opts.sort_by = raw
                .split(',')
                .filter(|k| !k.trim().is_empty())
                .map(SortKey::parse)
                .collect::<CoreResult<_>>()?;
        }
        if let Some(raw) = params.get("limit") {
            opts.limit = parse_positive("limit", raw)?.min(MAX_LIMIT);
        }
        if let Some(raw) = params.get("page") {
            opts.page = parse_positive("page", raw)?;
        }
        Ok(opts)
    }

    /// Index of the first result on the requested page.
    pub fn offset(&self) -> usize {
        self.page.saturating_sub(1).saturating_mul(self.limit)
    }
}

fn parse_positive(name: &str, raw: &str) -> CoreResult<usize> {
    match raw.trim().parse::<usize>() {
        Ok(n) if n >= 1 => Ok(n),
        _ => Err(CoreError::validation(format!(
            "{name} must be a positive integer"
        ))),
    }
}

/// One page of list results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub results: Vec<T>,
    pub page: usize,
    pub limit: usize,
    pub total_pages: usize,
    pub total_results: usize,
}

impl<T> Page<T> {
    /// Cut the requested window out of an already-sorted result set.
    pub fn from_sorted(items: Vec<T>, opts: &QueryOptions) -> Self {
        let total_results = items.len();
        let results = items
            .into_iter()
            .skip(opts.offset())
            .take(opts.limit)
            .collect();
        Self {
            results,
            page: opts.page,
            limit: opts.limit,
            total_pages: total_results.div_ceil(opts.limit),
            total_results,
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            results: self.results.into_iter().map(f).collect(),
            page: self.page,
            limit: self.limit,
            total_pages: self.total_pages,
            total_results: self.total_results,
        }
    }
}

/// Stable-sort `(json, item)` pairs by `keys`.
///
/// Callers pre-order the input (the store uses creation time then id) so
/// ties under `keys` keep that order.
pub fn sort_by_keys<T>(items: &mut [(Value, T)], keys: &[SortKey]) {
    if keys.is_empty() {
        return;
    }
    items.sort_by(|(a, _), (b, _)| {
        for key in keys {
            let ord = compare_values(a.get(&key.field), b.get(&key.field));
            let ord = if key.descending { ord.reverse() } else { ord };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    });
}

/// Total order over optional JSON scalars.
///
/// Missing and null sort first, then booleans, numbers and strings. Values
/// of mixed kinds order by kind; arrays and objects compare equal. RFC 3339
/// strings compare by instant and sort ahead of other strings.
pub fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    fn rank(v: Option<&Value>) -> u8 {
        match v {
            None | Some(Value::Null) => 0,
            Some(Value::Bool(_)) => 1,
            Some(Value::Number(_)) => 2,
            Some(Value::String(_)) => 3,
            Some(_) => 4,
        }
    }
    match (a, b) {
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (Some(Value::Number(x)), Some(Value::Number(y))) => {
            let (x, y) = (x.as_f64().unwrap_or(0.0), y.as_f64().unwrap_or(0.0));
            x.total_cmp(&y)
        }
        (Some(Value::String(x)), Some(Value::String(y))) => match (timestamp(x), timestamp(y)) {
            (Some(tx), Some(ty)) => tx.cmp(&ty),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => x.cmp(y),
        },
        _ => rank(a).cmp(&rank(b)),
    }
}

fn timestamp(s: &str) -> Option<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(s).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn defaults() {
        let o = QueryOptions::from_params(&HashMap::new()).unwrap();
        assert_eq!(o, QueryOptions::default());
        assert_eq!(o.limit, 10);
        assert_eq!(o.page, 1);
        assert_eq!(o.offset(), 0);
    }

    #[test]
    fn parses_multi_key_sort() {
        let o = QueryOptions::from_params(&params(&[("sortBy", "divisionName:desc,createdAt")]))
            .unwrap();
        assert_eq!(
            o.sort_by,
            vec![SortKey::desc("divisionName"), SortKey::asc("createdAt")]
        );
    }

    #[test]
    fn rejects_bad_direction() {
        let err = QueryOptions::from_params(&params(&[("sortBy", "a:sideways")])).unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
    }

    #[test]
    fn rejects_zero_and_garbage_limits() {
        assert!(QueryOptions::from_params(&params(&[("limit", "0")])).is_err());
        assert!(QueryOptions::from_params(&params(&[("limit", "-3")])).is_err());
        assert!(QueryOptions::from_params(&params(&[("page", "x")])).is_err());
    }

    #[test]
    fn clamps_large_limit() {
        let o = QueryOptions::from_params(&params(&[("limit", "50000")])).unwrap();
        assert_eq!(o.limit, MAX_LIMIT);
    }

    #[test]
    fn page_past_the_end_is_empty() {
        let opts = QueryOptions {
            page: 5,
            limit: 10,
            ..Default::default()
        };
        let p = Page::from_sorted((0..12).collect::<Vec<_>>(), &opts);
        assert!(p.results.is_empty());
        assert_eq!(p.total_pages, 2);
        assert_eq!(p.total_results, 12);
    }

    #[test]
    fn envelope_is_camel_case() {
        let p = Page::from_sorted(vec![1, 2, 3], &QueryOptions::default());
        let v = serde_json::to_value(&p).unwrap();
        assert_eq!(v["totalPages"], 1);
        assert_eq!(v["totalResults"], 3);
        assert_eq!(v["results"], json!([1, 2, 3]));
    }

    #[test]
    fn timestamps_sort_by_instant_not_text() {
        let mut items = vec![
            (json!({"createdAt": "2024-05-01T10:00:00.123456Z"}), 'b'),
            (json!({"createdAt": "2024-05-01T10:00:00.123Z"}), 'a'),
            (json!({"createdAt": "2024-05-01T10:00:00Z"}), '0'),
            (json!({"createdAt": "2024-05-01T12:30:00+02:00"}), 'c'),
        ];
        sort_by_keys(&mut items, &[SortKey::asc("createdAt")]);
        let order: String = items.iter().map(|(_, c)| *c).collect();
        assert_eq!(order, "0abc");
    }

    #[test]
    fn sort_is_stable_and_directional() {
        let mut items = vec![
            (json!({"n": 2, "s": "b"}), 0),
            (json!({"n": 1, "s": "a"}), 1),
            (json!({"n": 2, "s": "a"}), 2),
            (json!({"s": "z"}), 3),
        ];
        sort_by_keys(&mut items, &[SortKey::desc("n")]);
        let order: Vec<i32> = items.iter().map(|(_, i)| *i).collect();
        assert_eq!(order, vec![0, 2, 1, 3]);

        sort_by_keys(&mut items, &[SortKey::asc("s"), SortKey::asc("n")]);
        let order: Vec<i32> = items.iter().map(|(_, i)| *i).collect();
        assert_eq!(order, vec![1, 2, 0, 3]);
    }

    proptest! {
        #[test]
        fn page_arithmetic(n in 0usize..300, limit in 1usize..50, page in 1usize..20) {
            let opts = QueryOptions { limit, page, ..Default::default() };
            let p = Page::from_sorted((0..n).collect::<Vec<_>>(), &opts);
            prop_assert_eq!(p.total_results, n);
            prop_assert_eq!(p.total_pages, (n + limit - 1) / limit);
            let remaining = n.saturating_sub((page - 1) * limit);
            prop_assert_eq!(p.results.len(), remaining.min(limit));
            if let Some(first) = p.results.first() {
                prop_assert_eq!(*first, (page - 1) * limit);
            }
        }
    }
}
