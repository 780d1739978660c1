// SPDX-License-Identifier: BUSL-1.1
//! # Geography API
//!
//! Divisions, districts, blocks and schools. Each has the generic entity
//! routes plus a lookup by its natural key: name for the first three,
//! UDISE code for schools.

use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};
use survey_core::model::{Block, District, Division, School};
use survey_core::{Collection, Record};

use super::crud::{crud_routes, find_or_404, Resource};
use crate::error::AppError;
use crate::state::AppState;

impl Resource for Division {
    fn collection(state: &AppState) -> &Collection<Self> {
        &state.divisions
    }
}

impl Resource for District {
    fn collection(state: &AppState) -> &Collection<Self> {
        &state.districts
    }
}

impl Resource for Block {
    fn collection(state: &AppState) -> &Collection<Self> {
        &state.blocks
    }
}

impl Resource for School {
    fn collection(state: &AppState) -> &Collection<Self> {
        &state.schools
    }
}

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(crud_routes::<Division>("/v1/division"))
        .route("/v1/division/name/{name}", get(division_by_name))
        .merge(crud_routes::<District>("/v1/district"))
        .route("/v1/district/name/{name}", get(district_by_name))
        .merge(crud_routes::<Block>("/v1/block"))
        .route("/v1/block/name/{name}", get(block_by_name))
        .merge(crud_routes::<School>("/v1/school"))
        .route("/v1/school/udise/{udise_code}", get(school_by_udise))
}

async fn division_by_name(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<Record<Division>>, AppError> {
    find_or_404(&state, "division", |d: &Division| d.division_name == name)
}

async fn district_by_name(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<Record<District>>, AppError> {
    find_or_404(&state, "district", |d: &District| d.district_name == name)
}

async fn block_by_name(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<Record<Block>>, AppError> {
    find_or_404(&state, "block", |b: &Block| b.block_name == name)
}

async fn school_by_udise(
    State(state): State<AppState>,
    Path(udise_code): Path<String>,
) -> Result<Json<Record<School>>, AppError> {
    find_or_404(&state, "school", |s: &School| s.udise_code == udise_code)
}
