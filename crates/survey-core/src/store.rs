// SPDX-License-Identifier: BUSL-1.1
//! # In-Memory Collections
//!
//! [`Collection<T>`] holds every [`Record`] of one entity type and implements
//! the generic create/query/get/update/delete contract shared by all list
//! endpoints, plus [`Collection::upsert_with`] for the keyed create-or-update
//! paths (audit answers, coordinator assignments).
//!
//! Documents with a [`Document::unique_key`] are unique within their
//! collection: every write checks the key under the same write lock that
//! performs it.
//!
//! All operations are synchronous. The lock is a `parking_lot::RwLock` and
//! is never held across an `.await`; persistence happens in the HTTP layer
//! after the in-memory mutation returns.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use parking_lot::RwLock;
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::error::{CoreError, CoreResult};
use crate::filter::Filter;
use crate::model::{Document, Record};
use crate::pagination::{sort_by_keys, Page, QueryOptions};

/// Patch keys owned by the store. They are dropped from update payloads.
pub const RESERVED_FIELDS: &[&str] = &["id", "createdAt", "updatedAt"];

/// What [`Collection::upsert_with`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// No document matched; a new one was inserted.
    Created,
    /// A matching document was replaced.
    Updated,
    /// A matching document existed and the builder left it as is.
    Unchanged,
}

/// Thread-safe, cloneable collection of records keyed by id.
#[derive(Debug)]
pub struct Collection<T: Document> {
    data: Arc<RwLock<HashMap<Uuid, Record<T>>>>,
}

impl<T: Document> Clone for Collection<T> {
    fn clone(&self) -> Self {
        Self {
            data: Arc::clone(&self.data),
        }
    }
}

impl<T: Document> Default for Collection<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Document> Collection<T> {
    pub fn new() -> Self {
        Self {
            data: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Validate `doc` and store it under a fresh id.
    ///
    /// Fails with [`CoreError::Conflict`] when another document already
    /// carries the same [`Document::unique_key`].
    pub fn create(&self, doc: T) -> CoreResult<Record<T>> {
        doc.validate()?;
        let mut guard = self.data.write();
        check_unique(&guard, &doc, None)?;
        let record = Record::new(doc, Utc::now());
        guard.insert(record.id, record.clone());
        tracing::debug!(collection = T::COLLECTION, id = %record.id, "created");
        Ok(record)
    }

    pub fn get(&self, id: &Uuid) -> Option<Record<T>> {
        self.data.read().get(id).cloned()
    }

    /// Like [`get`](Self::get) but absent ids become [`CoreError::NotFound`].
    pub fn require(&self, id: &Uuid) -> CoreResult<Record<T>> {
        self.get(id).ok_or_else(|| not_found::<T>(id))
    }

    /// Every record in creation order.
    pub fn list(&self) -> Vec<Record<T>> {
        let mut all: Vec<Record<T>> = self.data.read().values().cloned().collect();
        all.sort_by(|a, b| (a.created_at, a.id).cmp(&(b.created_at, b.id)));
        all
    }

    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Filter, sort and paginate.
    pub fn query(&self, filter: &Filter, opts: &QueryOptions) -> CoreResult<Page<Record<T>>> {
        let mut matched = Vec::new();
        for record in self.list() {
            let value = record.to_value()?;
            if filter.matches(&value) {
                matched.push((value, record));
            }
        }
        sort_by_keys(&mut matched, &opts.sort_by);
        let records = matched.into_iter().map(|(_, r)| r).collect();
        Ok(Page::from_sorted(records, opts))
    }

    /// Earliest-created record whose document satisfies `pred`.
    pub fn find_one(&self, pred: impl Fn(&T) -> bool) -> Option<Record<T>> {
        self.data
            .read()
            .values()
            .filter(|r| pred(&r.doc))
            .min_by_key(|r| (r.created_at, r.id))
            .cloned()
    }

    /// All records whose document satisfies `pred`, in creation order.
    pub fn find(&self, pred: impl Fn(&T) -> bool) -> Vec<Record<T>> {
        let mut hits: Vec<Record<T>> = self
            .data
            .read()
            .values()
            .filter(|r| pred(&r.doc))
            .cloned()
            .collect();
        hits.sort_by(|a, b| (a.created_at, a.id).cmp(&(b.created_at, b.id)));
        hits
    }

    /// Shallow-merge `patch` into the stored document and re-validate.
    ///
    /// Top-level keys in `patch` replace the stored ones wholesale; nested
    /// objects are not merged. [`RESERVED_FIELDS`] are ignored. A patch that
    /// makes the document unparsable, invalid or a duplicate of another
    /// document's unique key leaves it untouched.
    pub fn update(&self, id: &Uuid, patch: &Map<String, Value>) -> CoreResult<Record<T>> {
        let mut guard = self.data.write();
        let doc = merged_checked(&guard, id, patch)?;
        let entry = guard.get_mut(id).ok_or_else(|| not_found::<T>(id))?;
        entry.doc = doc;
        entry.updated_at = Utc::now();
        Ok(entry.clone())
    }

    /// The stored record and the document [`update`](Self::update) would
    /// produce from `patch`, without writing anything.
    pub fn preview_update(
        &self,
        id: &Uuid,
        patch: &Map<String, Value>,
    ) -> CoreResult<(Record<T>, T)> {
        let guard = self.data.read();
        let doc = merged_checked(&guard, id, patch)?;
        let current = guard.get(id).cloned().ok_or_else(|| not_found::<T>(id))?;
        Ok((current, doc))
    }

    /// Overwrite the document stored under `id`, keeping id and `createdAt`.
    pub fn replace(&self, id: &Uuid, doc: T) -> CoreResult<Record<T>> {
        doc.validate()?;
        let mut guard = self.data.write();
        check_unique(&guard, &doc, Some(*id))?;
        let entry = guard.get_mut(id).ok_or_else(|| not_found::<T>(id))?;
        entry.doc = doc;
        entry.updated_at = Utc::now();
        Ok(entry.clone())
    }

    /// Remove and return a record.
    pub fn delete(&self, id: &Uuid) -> CoreResult<Record<T>> {
        self.data.write().remove(id).ok_or_else(|| not_found::<T>(id))
    }

    /// Atomically look up the document matching `matches` and write the one
    /// `build` derives from it.
    ///
    /// `build` sees the current document (or `None`) and returns the
    /// replacement, or `Ok(None)` to leave an existing document as is. The
    /// lookup and the write run under one write lock. A replaced record
    /// keeps its id and `createdAt`; `updatedAt` is bumped.
    pub fn upsert_with<M, B>(&self, matches: M, build: B) -> CoreResult<(Record<T>, UpsertOutcome)>
    where
        M: Fn(&T) -> bool,
        B: FnOnce(Option<&T>) -> CoreResult<Option<T>>,
    {
        let mut guard = self.data.write();
        let existing = guard
            .values()
            .filter(|r| matches(&r.doc))
            .min_by_key(|r| (r.created_at, r.id))
            .cloned();

        match existing {
            Some(existing) => match build(Some(&existing.doc))? {
                Some(doc) => {
                    doc.validate()?;
                    check_unique(&guard, &doc, Some(existing.id))?;
                    let record = Record {
                        doc,
                        updated_at: Utc::now(),
                        ..existing
                    };
                    guard.insert(record.id, record.clone());
                    Ok((record, UpsertOutcome::Updated))
                }
                None => Ok((existing, UpsertOutcome::Unchanged)),
            },
            None => {
                let doc = build(None)?.ok_or_else(|| {
                    CoreError::validation(format!("nothing to insert into {}", T::COLLECTION))
                })?;
                doc.validate()?;
                check_unique(&guard, &doc, None)?;
                let record = Record::new(doc, Utc::now());
                guard.insert(record.id, record.clone());
                Ok((record, UpsertOutcome::Created))
            }
        }
    }

    /// Apply `f` to a copy of every document matching `pred` and validate
    /// the results. Nothing is written; hand the output to
    /// [`commit_staged`](Self::commit_staged).
    pub fn stage_where<P, F>(&self, pred: P, f: F) -> CoreResult<Staged<T>>
    where
        P: Fn(&T) -> bool,
        F: Fn(&mut T),
    {
        let guard = self.data.read();
        let mut staged = Vec::new();
        for record in guard.values().filter(|r| pred(&r.doc)) {
            let mut doc = record.doc.clone();
            f(&mut doc);
            doc.validate()?;
            check_unique(&guard, &doc, Some(record.id))?;
            staged.push((record.id, doc));
        }
        Ok(staged)
    }

    /// Write staged documents back under one lock. Ids deleted since
    /// staging are skipped. Returns the written records in creation order.
    pub fn commit_staged(&self, staged: Staged<T>) -> Vec<Record<T>> {
        if staged.is_empty() {
            return Vec::new();
        }
        let mut guard = self.data.write();
        let now = Utc::now();
        let mut touched = Vec::with_capacity(staged.len());
        for (id, doc) in staged {
            if let Some(entry) = guard.get_mut(&id) {
                entry.doc = doc;
                entry.updated_at = now;
                touched.push(entry.clone());
            }
        }
        touched.sort_by(|a, b| (a.created_at, a.id).cmp(&(b.created_at, b.id)));
        touched
    }

    /// Put a previously persisted record back, keeping its id and
    /// timestamps. Used when hydrating from the database.
    pub fn restore(&self, record: Record<T>) {
        self.data.write().insert(record.id, record);
    }
}

/// Documents rewritten off-lock, keyed by the id they replace.
pub type Staged<T> = Vec<(Uuid, T)>;

fn not_found<T: Document>(id: &Uuid) -> CoreError {
    CoreError::NotFound {
        collection: T::COLLECTION,
        id: *id,
    }
}

/// Reject `doc` if a record other than `except` carries its unique key.
fn check_unique<T: Document>(
    records: &HashMap<Uuid, Record<T>>,
    doc: &T,
    except: Option<Uuid>,
) -> CoreResult<()> {
    let Some(key) = doc.unique_key() else {
        return Ok(());
    };
    let holder = records
        .values()
        .find(|r| Some(r.id) != except && r.doc.unique_key().as_deref() == Some(key.as_str()));
    match holder {
        Some(r) => Err(CoreError::Conflict {
            collection: T::COLLECTION,
            id: r.id,
        }),
        None => Ok(()),
    }
}

/// Merge `patch` into the document under `id`, validate it and check its
/// unique key.
fn merged_checked<T: Document>(
    records: &HashMap<Uuid, Record<T>>,
    id: &Uuid,
    patch: &Map<String, Value>,
) -> CoreResult<T> {
    let current = records.get(id).ok_or_else(|| not_found::<T>(id))?;
    let mut merged = match serde_json::to_value(&current.doc)? {
        Value::Object(map) => map,
        _ => Map::new(),
    };
    for (key, value) in patch {
        if !RESERVED_FIELDS.contains(&key.as_str()) {
            merged.insert(key.clone(), value.clone());
        }
    }
    let doc: T = serde_json::from_value(Value::Object(merged))
        .map_err(|e| CoreError::validation(e.to_string()))?;
    doc.validate()?;
    check_unique(records, &doc, Some(*id))?;
    Ok(doc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::audit::fixtures::answer;
    use crate::model::{AuditAnswer, Division};
    use proptest::prelude::*;
    use serde_json::json;

    fn division(name: &str) -> Division {
        Division {
            division_name: name.into(),
            division_code: None,
        }
    }

    fn patch(v: Value) -> Map<String, Value> {
        match v {
            Value::Object(m) => m,
            _ => panic!("patch must be an object"),
        }
    }

    #[test]
    fn create_then_get_returns_fields() {
        let c = Collection::new();
        let rec = c.create(division("North")).unwrap();
        let got = c.get(&rec.id).unwrap();
        assert_eq!(got.doc.division_name, "North");
        assert_eq!(got.created_at, got.updated_at);
    }

    #[test]
    fn create_rejects_invalid() {
        let c = Collection::new();
        let err = c.create(division("  ")).unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
        assert!(c.is_empty());
    }

    #[test]
    fn delete_then_get_is_absent() {
        let c = Collection::new();
        let rec = c.create(division("North")).unwrap();
        c.delete(&rec.id).unwrap();
        assert!(c.get(&rec.id).is_none());
        assert!(matches!(
            c.delete(&rec.id),
            Err(CoreError::NotFound { collection: "divisions", .. })
        ));
    }

    #[test]
    fn update_unknown_id_is_not_found() {
        let c: Collection<Division> = Collection::new();
        let err = c
            .update(&Uuid::new_v4(), &patch(json!({"divisionName": "X"})))
            .unwrap_err();
        assert!(matches!(err, CoreError::NotFound { .. }));
    }

    #[test]
    fn update_is_shallow_merge_ignoring_reserved_keys() {
        let c = Collection::new();
        let rec = c.create(division("North")).unwrap();
        let updated = c
            .update(
                &rec.id,
                &patch(json!({
                    "divisionCode": "N1",
                    "id": Uuid::nil(),
                    "createdAt": "2000-01-01T00:00:00Z"
                })),
            )
            .unwrap();
        assert_eq!(updated.id, rec.id);
        assert_eq!(updated.created_at, rec.created_at);
        assert_eq!(updated.doc.division_name, "North");
        assert_eq!(updated.doc.division_code.as_deref(), Some("N1"));
        assert!(updated.updated_at >= rec.updated_at);
    }

    #[test]
    fn invalid_update_leaves_record_untouched() {
        let c = Collection::new();
        let rec = c.create(division("North")).unwrap();
        assert!(c.update(&rec.id, &patch(json!({"divisionName": ""}))).is_err());
        assert!(c.update(&rec.id, &patch(json!({"divisionName": 7}))).is_err());
        assert_eq!(c.get(&rec.id).unwrap(), rec);
    }

    #[test]
    fn query_filters_and_paginates() {
        let c = Collection::new();
        for name in ["b", "a", "c", "a"] {
            c.create(division(name)).unwrap();
        }
        let opts = QueryOptions {
            limit: 1,
            ..Default::default()
        };
        let page = c
            .query(&Filter::new().eq("divisionName", "a"), &opts)
            .unwrap();
        assert_eq!(page.total_results, 2);
        assert_eq!(page.total_pages, 2);
        assert_eq!(page.results.len(), 1);

        let sorted = c
            .query(
                &Filter::new(),
                &QueryOptions {
                    sort_by: vec![crate::SortKey::desc("divisionName")],
                    ..Default::default()
                },
            )
            .unwrap();
        let names: Vec<&str> = sorted
            .results
            .iter()
            .map(|r| r.doc.division_name.as_str())
            .collect();
        assert_eq!(names, vec!["c", "b", "a", "a"]);
    }

    #[test]
    fn upsert_creates_then_replaces() {
        let c: Collection<AuditAnswer> = Collection::new();
        let first = answer("S1", "D1", vec![json!({"q": 1})]);
        let key = first.key();

        let (created, outcome) = c
            .upsert_with(|d| d.has_key(&key), |_| Ok(Some(first.clone())))
            .unwrap();
        assert_eq!(outcome, UpsertOutcome::Created);

        let second = answer("S1", "D1", vec![json!({"q": 2})]);
        let (updated, outcome) = c
            .upsert_with(|d| d.has_key(&key), |_| Ok(Some(second.clone())))
            .unwrap();
        assert_eq!(outcome, UpsertOutcome::Updated);
        assert_eq!(updated.id, created.id);
        assert_eq!(updated.created_at, created.created_at);
        assert_eq!(updated.doc, second);
        assert_eq!(c.len(), 1);
    }

    #[test]
    fn upsert_builder_can_leave_existing_unchanged() {
        let c = Collection::new();
        c.create(division("North")).unwrap();
        let (rec, outcome) = c
            .upsert_with(|d| d.division_name == "North", |_| Ok(None))
            .unwrap();
        assert_eq!(outcome, UpsertOutcome::Unchanged);
        assert_eq!(rec.doc.division_name, "North");
    }

    #[test]
    fn staged_rewrite_is_all_or_nothing() {
        let c = Collection::new();
        c.create(division("a")).unwrap();
        c.create(division("b")).unwrap();
        let before = c.list();

        let err = c.stage_where(
            |_| true,
            |d| {
                if d.division_name == "b" {
                    d.division_name = String::new();
                } else {
                    d.division_code = Some("X".into());
                }
            },
        );
        assert!(err.is_err());
        assert_eq!(c.list(), before);

        let staged = c
            .stage_where(|d| d.division_name == "a", |d| d.division_code = Some("A".into()))
            .unwrap();
        assert_eq!(c.list(), before, "staging alone writes nothing");
        let touched = c.commit_staged(staged);
        assert_eq!(touched.len(), 1);
        assert_eq!(touched[0].doc.division_code.as_deref(), Some("A"));
    }

    #[test]
    fn commit_skips_records_deleted_after_staging() {
        let c = Collection::new();
        let rec = c.create(division("a")).unwrap();
        let staged = c.stage_where(|_| true, |d| d.division_code = Some("A".into())).unwrap();
        c.delete(&rec.id).unwrap();
        assert!(c.commit_staged(staged).is_empty());
        assert!(c.is_empty());
    }

    #[test]
    fn preview_writes_nothing_and_replace_commits() {
        let c = Collection::new();
        let rec = c.create(division("North")).unwrap();
        let (current, doc) = c
            .preview_update(&rec.id, &patch(json!({"divisionCode": "N"})))
            .unwrap();
        assert_eq!(current, rec);
        assert_eq!(doc.division_code.as_deref(), Some("N"));
        assert_eq!(c.get(&rec.id).unwrap(), rec);

        let replaced = c.replace(&rec.id, doc).unwrap();
        assert_eq!(replaced.id, rec.id);
        assert_eq!(replaced.created_at, rec.created_at);
        assert_eq!(c.get(&rec.id).unwrap().doc.division_code.as_deref(), Some("N"));
        assert!(matches!(
            c.replace(&Uuid::new_v4(), division("X")),
            Err(CoreError::NotFound { .. })
        ));
    }

    #[test]
    fn create_rejects_a_taken_unique_key() {
        let c: Collection<AuditAnswer> = Collection::new();
        let first = c.create(answer("S1", "D1", vec![json!({"a": "one"})])).unwrap();
        let err = c
            .create(answer("S1", "D1", vec![json!({"a": "two"})]))
            .unwrap_err();
        assert!(matches!(
            err,
            CoreError::Conflict { collection: "audit_answers", id } if id == first.id
        ));
        assert_eq!(c.len(), 1);
        assert_eq!(c.list()[0].doc.answers, vec![json!({"a": "one"})]);

        c.create(answer("S1", "D2", vec![])).unwrap();
        assert_eq!(c.len(), 2);
    }

    #[test]
    fn update_onto_another_documents_key_is_rejected() {
        let c: Collection<AuditAnswer> = Collection::new();
        c.create(answer("S1", "D1", vec![])).unwrap();
        let other = c.create(answer("S1", "D2", vec![])).unwrap();

        let err = c
            .update(&other.id, &patch(json!({"deptCode": "D1"})))
            .unwrap_err();
        assert!(matches!(err, CoreError::Conflict { .. }));
        assert_eq!(c.get(&other.id).unwrap(), other);

        let same_key = c
            .update(&other.id, &patch(json!({"finalSubmit": true})))
            .unwrap();
        assert!(same_key.doc.final_submit);
    }

    #[test]
    fn upsert_after_create_keeps_one_document_per_key() {
        let c: Collection<AuditAnswer> = Collection::new();
        let first = answer("S1", "D1", vec![json!({"a": "one"})]);
        let key = first.key();
        c.create(first).unwrap();
        assert!(c.create(answer("S1", "D1", vec![json!({"a": "two"})])).is_err());

        let third = answer("S1", "D1", vec![json!({"a": "three"})]);
        c.upsert_with(|d| d.has_key(&key), |_| Ok(Some(third.clone())))
            .unwrap();
        let all = c.list();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].doc, third);
    }

    #[test]
    fn restore_keeps_identity() {
        let c = Collection::new();
        let rec = Record::new(division("North"), Utc::now());
        c.restore(rec.clone());
        assert_eq!(c.get(&rec.id), Some(rec));
    }

    proptest! {
        /// Any sequence of submissions under one key leaves exactly one
        /// document, equal to the last submission.
        #[test]
        fn last_write_wins(values in prop::collection::vec(0i64..1000, 1..15)) {
            let c: Collection<AuditAnswer> = Collection::new();
            let key = answer("S", "D", vec![]).key();
            for v in &values {
                let payload = answer("S", "D", vec![json!({"v": v})]);
                c.upsert_with(|d| d.has_key(&key), |_| Ok(Some(payload))).unwrap();
            }
            let all = c.list();
            prop_assert_eq!(all.len(), 1);
            let last = values.last().copied().unwrap_or_default();
            prop_assert_eq!(&all[0].doc.answers, &vec![json!({"v": last})]);
        }
    }
}
