// SPDX-License-Identifier: BUSL-1.1
//! # Error Types
//!
//! One error enum for the domain layer. The HTTP crate maps each variant to
//! a status code; nothing here knows about status codes.

use thiserror::Error;
use uuid::Uuid;

/// Errors raised by collections and domain services.
#[derive(Error, Debug)]
pub enum CoreError {
    /// No document with this id exists in the collection.
    #[error("{collection} {id} not found")]
    NotFound {
        /// Collection name, e.g. `divisions`.
        collection: &'static str,
        /// The id that was looked up.
        id: Uuid,
    },

    /// Another document already carries the unique key of the one being
    /// written.
    #[error("{collection} {id} already holds this key")]
    Conflict {
        collection: &'static str,
        /// The document that holds the key.
        id: Uuid,
    },

    /// A payload, patch or query parameter failed validation.
    #[error("{0}")]
    Validation(String),

    /// A document could not be converted to or from its JSON form.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The uploaded tabular file could not be read at all.
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
}

impl CoreError {
    /// Shorthand for a validation failure.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}

/// Result alias used throughout the crate.
pub type CoreResult<T> = Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_message_names_collection_and_id() {
        let id = Uuid::nil();
        let err = CoreError::NotFound {
            collection: "divisions",
            id,
        };
        let msg = err.to_string();
        assert!(msg.contains("divisions"));
        assert!(msg.contains(&id.to_string()));
    }

    #[test]
    fn validation_message_is_verbatim() {
        let err = CoreError::validation("divisionName must not be empty");
        assert_eq!(err.to_string(), "divisionName must not be empty");
    }

    #[test]
    fn serde_error_converts() {
        let serde_err = serde_json::from_str::<u32>("\"x\"").unwrap_err();
        let err = CoreError::from(serde_err);
        assert!(matches!(err, CoreError::Serialization(_)));
    }
}
