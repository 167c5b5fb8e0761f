//! Error types and result types for document store operations.
//!
//! Every fallible operation in docrud returns [`DocumentStoreResult<T>`]. Store failures are never
//! swallowed: each one is surfaced as a [`DocumentStoreError`] carrying the store's own detail.

use std::collections::BTreeMap;

use bson::{Bson, error::Error as BsonError};
use serde_json::Error as SerdeJsonError;
use thiserror::Error;

/// Represents all possible errors that can occur when interacting with a document store.
#[derive(Error, Debug)]
pub enum DocumentStoreError {
    /// The store could not be reached or rejected the credentials while connecting.
    ///
    /// This is fatal for the client being constructed; no retry is attempted.
    #[error("Connection error: {0}")]
    Connection(String),
    /// An operation was invoked after the client released its connection.
    #[error("Not connected: the connection has been closed")]
    NotConnected,
    /// A store round-trip exceeded the deadline enforced by the driver.
    #[error("Timeout: {0}")]
    Timeout(String),
    /// Any other failure reported by the store (duplicate key, non-array `$push`, ...).
    #[error("Operation error: {0}")]
    Operation(String),
    /// A batch insert stopped partway through.
    ///
    /// `inserted_ids` maps the input position of every document that was written before the
    /// failure to its identifier.
    #[error("Batch insert stopped after {} document(s): {detail}", inserted_ids.len())]
    PartialInsert {
        inserted_ids: BTreeMap<usize, Bson>,
        detail: String,
    },
    /// The filter document could not be understood.
    #[error("Invalid filter: {0}")]
    InvalidFilter(String),
    /// The update document could not be understood or targets an immutable field.
    #[error("Invalid update: {0}")]
    InvalidUpdate(String),
    /// The document has an invalid structure.
    #[error("Invalid document: {0}")]
    InvalidDocument(String),
    /// Serialization/deserialization error when converting between document formats (BSON, JSON).
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl DocumentStoreError {
    /// Returns `true` when repeating the same call could reasonably succeed.
    ///
    /// The library never retries on its own; this only helps callers decide.
    pub fn is_retryable(&self) -> bool {
        matches!(self, DocumentStoreError::Timeout(_))
    }
}

/// A specialized `Result` type for document store operations.
pub type DocumentStoreResult<T> = Result<T, DocumentStoreError>;

impl From<BsonError> for DocumentStoreError {
    fn from(err: BsonError) -> Self {
        DocumentStoreError::Serialization(err.to_string())
    }
}

impl From<SerdeJsonError> for DocumentStoreError {
    fn from(err: SerdeJsonError) -> Self {
        DocumentStoreError::Serialization(err.to_string())
    }
}
