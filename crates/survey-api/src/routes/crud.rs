// SPDX-License-Identifier: BUSL-1.1
//! # Generic Entity Routes
//!
//! Every entity root exposes the same five operations:
//!
//! | Method   | Path          | Status | Body                     |
//! |----------|---------------|--------|--------------------------|
//! | `POST`   | `{base}`      | 201    | stored record            |
//! | `GET`    | `{base}`      | 200    | page of records          |
//! | `GET`    | `{base}/{id}` | 200    | stored record            |
//! | `PUT`    | `{base}/{id}` | 200    | stored record            |
//! | `DELETE` | `{base}/{id}` | 204    | empty                    |
//!
//! [`crud_routes`] builds them for any [`Resource`]. Entity modules add their
//! own lookup routes on top of the returned router.
//!
//! Successful mutations are written through to Postgres when a pool is
//! configured.

use std::collections::HashMap;

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{Map, Value};
use survey_core::hierarchy::{Cascade, Propagated};
use survey_core::{Collection, CoreResult, Document, Filter, Page, QueryOptions, Record};
use uuid::Uuid;

use crate::auth::CallerIdentity;
use crate::db;
use crate::error::AppError;
use crate::extractors::{extract_json, extract_params};
use crate::state::AppState;

/// An entity served by [`crud_routes`].
pub trait Resource: Document {
    /// The collection holding this entity.
    fn collection(state: &AppState) -> &Collection<Self>;

    /// Fill caller-derived fields on create. Default: nothing.
    fn stamp_creator(&mut self, _caller: &CallerIdentity) {}

    /// Stage the rows an update to this entity rewrites in other
    /// collections. Nothing is written until the update itself commits.
    fn plan_update(_state: &AppState, _before: &Self, _after: &Self) -> CoreResult<Option<Cascade>> {
        Ok(None)
    }
}

/// The five generic routes for `T`, rooted at `base`.
pub fn crud_routes<T: Resource>(base: &str) -> Router<AppState> {
    Router::new()
        .route(base, get(list::<T>).post(create::<T>))
        .route(
            &format!("{base}/{{id}}"),
            get(get_one::<T>).put(update::<T>).delete(remove::<T>),
        )
}

async fn create<T: Resource>(
    State(state): State<AppState>,
    caller: CallerIdentity,
    body: Result<Json<T>, JsonRejection>,
) -> Result<(StatusCode, Json<Record<T>>), AppError> {
    let mut doc = extract_json(body)?;
    doc.stamp_creator(&caller);
    let record = T::collection(&state).create(doc)?;
    persist(&state, &record).await?;
    tracing::debug!(collection = T::COLLECTION, id = %record.id, "document created");
    Ok((StatusCode::CREATED, Json(record)))
}

pub(crate) async fn list<T: Resource>(
    State(state): State<AppState>,
    query: Result<Query<HashMap<String, String>>, QueryRejection>,
) -> Result<Json<Page<Record<T>>>, AppError> {
    let params = extract_params(query)?;
    let filter = Filter::from_params(&params, T::FILTER_FIELDS, T::SEARCH_FIELDS);
    let opts = QueryOptions::from_params(&params)?;
    Ok(Json(T::collection(&state).query(&filter, &opts)?))
}

pub(crate) async fn get_one<T: Resource>(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Record<T>>, AppError> {
    Ok(Json(T::collection(&state).require(&id)?))
}

async fn update<T: Resource>(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    body: Result<Json<Map<String, Value>>, JsonRejection>,
) -> Result<Json<Record<T>>, AppError> {
    let patch = extract_json(body)?;
    let collection = T::collection(&state);
    let (before, doc) = collection.preview_update(&id, &patch)?;
    let cascade = T::plan_update(&state, &before.doc, &doc)?;

    let after = collection.replace(&id, doc)?;
    let touched = cascade.map(Cascade::commit).unwrap_or_default();

    persist(&state, &after).await?;
    persist_propagated(&state, &touched).await?;
    Ok(Json(after))
}

pub(crate) async fn remove<T: Resource>(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let removed = T::collection(&state).delete(&id)?;
    persist_delete::<T>(&state, removed.id).await?;
    tracing::debug!(collection = T::COLLECTION, %id, "document deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// Look a single document up by a domain field; `what` names it in the 404.
pub(crate) fn find_or_404<T: Resource>(
    state: &AppState,
    what: &str,
    pred: impl Fn(&T) -> bool,
) -> Result<Json<Record<T>>, AppError> {
    T::collection(state)
        .find_one(pred)
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("{what} not found")))
}

// ── Write-through ───────────────────────────────────────────────────────────

pub(crate) async fn persist<T: Document>(
    state: &AppState,
    record: &Record<T>,
) -> Result<(), AppError> {
    if let Some(pool) = &state.db_pool {
        if let Err(e) = db::documents::upsert(pool, record).await {
            tracing::error!(
                collection = T::COLLECTION,
                id = %record.id,
                error = %e,
                "failed to persist document"
            );
            return Err(AppError::persist_failed(T::COLLECTION));
        }
    }
    Ok(())
}

pub(crate) async fn persist_many<T: Document>(
    state: &AppState,
    records: &[Record<T>],
) -> Result<(), AppError> {
    if records.is_empty() {
        return Ok(());
    }
    if let Some(pool) = &state.db_pool {
        if let Err(e) = db::documents::upsert_many(pool, records).await {
            tracing::error!(
                collection = T::COLLECTION,
                count = records.len(),
                error = %e,
                "failed to persist documents"
            );
            return Err(AppError::persist_failed(T::COLLECTION));
        }
    }
    Ok(())
}

async fn persist_propagated(state: &AppState, touched: &Propagated) -> Result<(), AppError> {
    persist_many(state, &touched.sub_departments).await?;
    persist_many(state, &touched.sub_sub_departments).await?;
    persist_many(state, &touched.categories).await?;
    persist_many(state, &touched.sub_categories).await
}

pub(crate) async fn persist_delete<T: Document>(state: &AppState, id: Uuid) -> Result<(), AppError> {
    if let Some(pool) = &state.db_pool {
        if let Err(e) = db::documents::delete(pool, T::COLLECTION, id).await {
            tracing::error!(
                collection = T::COLLECTION,
                %id,
                error = %e,
                "failed to delete persisted document"
            );
            return Err(AppError::persist_failed(T::COLLECTION));
        }
    }
    Ok(())
}
