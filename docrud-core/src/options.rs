//! Options for read and update operations.
//!
//! [`FindOptions`] carries sorting, paging and projection for queries, built with the fluent
//! [`FindOptionsBuilder`]:
//!
//! ```ignore
//! use docrud::options::{FindOptions, Projection, SortDirection};
//!
//! let options = FindOptions::builder()
//!     .sort("quantity", SortDirection::Desc)
//!     .limit(1)
//!     .projection(Projection::include(["name", "category"]).exclude_id())
//!     .build();
//! ```

use bson::{Bson, Document};

use crate::document::ID_FIELD;

/// Sort direction for query results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    /// Ascending order (A to Z, 0 to 9, earliest to latest).
    Asc,
    /// Descending order (Z to A, 9 to 0, latest to earliest).
    Desc,
}

/// Sort order for query results.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sort {
    /// The field path to sort by.
    pub field: String,
    /// The sort direction.
    pub direction: SortDirection,
}

/// Which fields a query returns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Projection {
    /// Return only the listed fields, plus `_id` when `id` is `true`.
    Include { fields: Vec<String>, id: bool },
    /// Return everything except the listed fields.
    Exclude { fields: Vec<String> },
}

impl Projection {
    /// Keeps only `fields` (and the identifier).
    pub fn include<S: Into<String>>(fields: impl IntoIterator<Item = S>) -> Self {
        Projection::Include {
            fields: fields.into_iter().map(Into::into).collect(),
            id: true,
        }
    }

    /// Drops `fields`, keeping everything else.
    pub fn exclude<S: Into<String>>(fields: impl IntoIterator<Item = S>) -> Self {
        Projection::Exclude {
            fields: fields.into_iter().map(Into::into).collect(),
        }
    }

    /// Also drops the identifier field.
    ///
    /// Documents read through such a projection no longer carry `_id`.
    pub fn exclude_id(self) -> Self {
        match self {
            Projection::Include { fields, .. } => Projection::Include { fields, id: false },
            Projection::Exclude { mut fields } => {
                if !fields.iter().any(|field| field == ID_FIELD) {
                    fields.push(ID_FIELD.to_string());
                }
                Projection::Exclude { fields }
            }
        }
    }

    /// The MongoDB projection document, e.g. `{"name": 1, "_id": 0}`.
    pub fn to_document(&self) -> Document {
        match self {
            Projection::Include { fields, id } => {
                let mut projection: Document = fields
                    .iter()
                    .filter(|field| field.as_str() != ID_FIELD)
                    .map(|field| (field.clone(), Bson::Int32(1)))
                    .collect();

                if !id {
                    projection.insert(ID_FIELD, 0);
                }

                projection
            }
            Projection::Exclude { fields } => fields
                .iter()
                .map(|field| (field.clone(), Bson::Int32(0)))
                .collect(),
        }
    }
}

/// Sorting, paging and projection for a query.
///
/// Sorts apply in order (the first is the primary key), then `skip`, then `limit`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindOptions {
    pub sort: Vec<Sort>,
    pub limit: Option<usize>,
    pub skip: Option<usize>,
    pub projection: Option<Projection>,
}

impl FindOptions {
    pub fn builder() -> FindOptionsBuilder {
        FindOptionsBuilder::new()
    }

    /// The MongoDB sort document, e.g. `{"quantity": -1}`.
    pub fn sort_document(&self) -> Option<Document> {
        if self.sort.is_empty() {
            return None;
        }

        Some(
            self.sort
                .iter()
                .map(|sort| {
                    (
                        sort.field.clone(),
                        match sort.direction {
                            SortDirection::Asc => Bson::Int32(1),
                            SortDirection::Desc => Bson::Int32(-1),
                        },
                    )
                })
                .collect(),
        )
    }
}

#[derive(Debug, Clone, Default)]
pub struct FindOptionsBuilder {
    options: FindOptions,
}

impl FindOptionsBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a sort key. Earlier keys take precedence.
    pub fn sort(mut self, field: impl Into<String>, direction: SortDirection) -> Self {
        self.options.sort.push(Sort { field: field.into(), direction });
        self
    }

    /// Sets the maximum number of documents to return.
    pub fn limit(mut self, limit: usize) -> Self {
        self.options.limit = Some(limit);
        self
    }

    /// Sets the number of matching documents to skip.
    pub fn skip(mut self, skip: usize) -> Self {
        self.options.skip = Some(skip);
        self
    }

    pub fn projection(mut self, projection: Projection) -> Self {
        self.options.projection = Some(projection);
        self
    }

    pub fn build(self) -> FindOptions {
        self.options
    }
}

/// Options for update operations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateOptions {
    /// Insert a new document when nothing matches the filter.
    pub upsert: bool,
}

impl UpdateOptions {
    pub fn upsert() -> Self {
        Self { upsert: true }
    }
}

/// How many documents a write affects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteScope {
    /// Only the first matching document.
    One,
    /// Every matching document.
    Many,
}
