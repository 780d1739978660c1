// SPDX-License-Identifier: BUSL-1.1
//! # survey-core — Domain Layer for the Survey/Audit Backend
//!
//! Everything the HTTP layer needs that does not involve HTTP:
//!
//! - [`model`]: entity documents (geography, department hierarchy, surveys,
//!   audit answers, coordinator assignments) and the [`Document`] trait that
//!   describes how each one is stored, filtered and validated.
//! - [`store`]: [`Collection<T>`], the in-memory document collection with the
//!   generic create/query/get/update/delete contract and atomic upserts.
//! - [`filter`] and [`pagination`]: list-endpoint query construction and the
//!   `{results, page, limit, totalPages, totalResults}` page envelope.
//! - [`bulk`]: CSV ingestion for coordinator assignments.
//! - [`hierarchy`]: propagation of ancestor edits into denormalized
//!   sub-category rows.
//! - [`dashboard`]: read-only aggregate views.
//!
//! ## Crate Policy
//!
//! - No HTTP types. Handlers live in `survey-api`.
//! - No `.unwrap()` outside tests.
//! - All mutation of a collection happens under its own write lock; no
//!   operation spans two collections atomically.

pub mod bulk;
pub mod dashboard;
pub mod error;
pub mod filter;
pub mod hierarchy;
pub mod model;
pub mod pagination;
pub mod store;

pub use error::{CoreError, CoreResult};
pub use filter::Filter;
pub use model::{Document, Record};
pub use pagination::{Page, QueryOptions, SortKey};
pub use store::{Collection, UpsertOutcome};
