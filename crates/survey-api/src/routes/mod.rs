// SPDX-License-Identifier: BUSL-1.1
//! # API Route Modules
//!
//! - `crud`: the generic create/list/get/update/delete routes every entity
//!   root shares, plus write-through helpers.
//! - `geography`: divisions, districts, blocks, schools and their
//!   name/UDISE lookups.
//! - `departments`: the five department levels, with sub-category
//!   propagation on ancestor edits.
//! - `surveys`: survey questions and master projects.
//! - `audit_answers`: audit answers and the composite-key create-or-update.
//! - `coordinators`: coordinator assignment, CSV bulk upload, project lookup
//!   by coordinator.
//! - `dashboard`: read-only aggregates.

pub mod audit_answers;
pub mod coordinators;
pub mod crud;
pub mod dashboard;
pub mod departments;
pub mod geography;
pub mod surveys;
