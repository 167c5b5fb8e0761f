//! Helpers for working with schema-less documents.
//!
//! Documents are plain [`bson::Document`] values: ordered maps from field names to the
//! [`Bson`] tagged union. This module adds identifier handling and conversions between
//! documents and serde types.

use bson::{Bson, Document, de::deserialize_from_bson, oid::ObjectId, ser::serialize_to_bson};
use serde::{Serialize, de::DeserializeOwned};

use crate::error::{DocumentStoreError, DocumentStoreResult};

/// Name of the identifier field every stored document carries.
pub const ID_FIELD: &str = "_id";

/// Extension trait for identifier handling on [`Document`].
pub trait DocumentExt {
    /// Returns the document's identifier, if it has a non-null one.
    fn id(&self) -> Option<&Bson>;

    /// Ensures the document carries an identifier and returns it.
    ///
    /// A missing or null `_id` is replaced by a fresh [`ObjectId`] placed as the first field,
    /// matching where MongoDB stores it.
    fn ensure_id(&mut self) -> Bson;
}

impl DocumentExt for Document {
    fn id(&self) -> Option<&Bson> {
        match self.get(ID_FIELD) {
            Some(Bson::Null) | None => None,
            Some(id) => Some(id),
        }
    }

    fn ensure_id(&mut self) -> Bson {
        if let Some(id) = self.id() {
            return id.clone();
        }

        let id = Bson::ObjectId(ObjectId::new());
        let rest = std::mem::take(self)
            .into_iter()
            .filter(|(key, _)| key != ID_FIELD);

        *self = std::iter::once((ID_FIELD.to_string(), id.clone()))
            .chain(rest)
            .collect();

        id
    }
}

/// Converts any serializable value into a [`Document`].
///
/// # Errors
///
/// Returns [`DocumentStoreError::InvalidDocument`] if the value does not serialize to a
/// document (e.g. a bare string or number).
pub fn to_document<T: Serialize>(value: &T) -> DocumentStoreResult<Document> {
    match serialize_to_bson(value)? {
        Bson::Document(document) => Ok(document),
        other => Err(DocumentStoreError::InvalidDocument(format!(
            "expected a document, got {:?}",
            other.element_type()
        ))),
    }
}

/// Deserializes a [`Document`] into a typed value.
pub fn from_document<T: DeserializeOwned>(document: Document) -> DocumentStoreResult<T> {
    Ok(deserialize_from_bson(Bson::Document(document))?)
}
