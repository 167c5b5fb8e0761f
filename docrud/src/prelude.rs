//! Convenient re-exports of commonly used types from docrud.
//!
//! ```ignore
//! use docrud::prelude::*;
//! ```
//!
//! This provides access to:
//! - The client and its result record
//! - Backend traits and builders
//! - Filters, updates and find options
//! - Document helpers and the `doc!` macro
//! - Error types

pub use bson::{Bson, Document, doc, oid::ObjectId};

pub use docrud_core::{
    backend::{Namespace, StoreBackend, StoreBackendBuilder},
    client::DocumentStoreClient,
    document::{DocumentExt, ID_FIELD, from_document, to_document},
    error::{DocumentStoreError, DocumentStoreResult},
    options::{FindOptions, Projection, Sort, SortDirection, UpdateOptions},
    query::{Expr, FieldOp, Filter, IntoFilter},
    result::OperationResult,
    update::{IntoUpdate, PopEnd, Update, UpdateOp},
};
