//! Mapping of MongoDB driver errors onto [`DocumentStoreError`].

use std::{collections::BTreeMap, io};

use bson::Bson;
use mongodb::error::{Error as MongoError, ErrorKind};

use docrud_core::error::DocumentStoreError;

/// Classifies an error raised by an operation on a live client.
pub(crate) fn classify(err: MongoError) -> DocumentStoreError {
    match err.kind.as_ref() {
        ErrorKind::Io(io_err) if io_err.kind() == io::ErrorKind::TimedOut => {
            DocumentStoreError::Timeout(err.to_string())
        }
        ErrorKind::ServerSelection { .. } => DocumentStoreError::Timeout(err.to_string()),
        ErrorKind::Authentication { .. } => DocumentStoreError::Connection(err.to_string()),
        ErrorKind::Shutdown => DocumentStoreError::NotConnected,
        _ => DocumentStoreError::Operation(err.to_string()),
    }
}

/// Classifies an error raised while establishing the connection.
pub(crate) fn classify_connect(err: MongoError) -> DocumentStoreError {
    DocumentStoreError::Connection(err.to_string())
}

/// Classifies an error from an ordered `insert_many`.
///
/// Write errors mean the batch stopped at the first failing position; every document before it
/// was written with the identifier it was sent with.
pub(crate) fn classify_insert(err: MongoError, ids: &[Bson]) -> DocumentStoreError {
    let first_failure = match err.kind.as_ref() {
        ErrorKind::InsertMany(failure) => failure
            .write_errors
            .as_ref()
            .and_then(|errors| errors.iter().min_by_key(|error| error.index)),
        _ => None,
    };

    match first_failure {
        Some(failure) => DocumentStoreError::PartialInsert {
            inserted_ids: ids
                .iter()
                .take(failure.index)
                .cloned()
                .enumerate()
                .collect::<BTreeMap<_, _>>(),
            detail: format!("{} (code {})", failure.message, failure.code),
        },
        None => classify(err),
    }
}
