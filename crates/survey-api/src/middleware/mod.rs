// SPDX-License-Identifier: BUSL-1.1
//! # Middleware Stack
//!
//! Tower middleware for the API layer:
//! - [`metrics`]: Prometheus request metrics.
//!
//! Authentication and route policy live in [`crate::auth`].

pub mod metrics;
