//! Update documents: the mutations applied to matched documents.
//!
//! An [`Update`] is an ordered list of [`UpdateOp`]s. Build one fluently:
//!
//! ```ignore
//! use docrud::update::Update;
//!
//! let restock = Update::new()
//!     .set("price", 2.3)
//!     .set("quantity", 20)
//!     .unset("color");
//! ```
//!
//! or parse a MongoDB-style update document with [`Update::from_document`].

use bson::{Bson, Document};

use crate::{
    document::ID_FIELD,
    error::{DocumentStoreError, DocumentStoreResult},
};

/// Which end of an array `$pop` removes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PopEnd {
    /// Remove the first element (`$pop: -1`).
    First,
    /// Remove the last element (`$pop: 1`).
    Last,
}

impl PopEnd {
    pub fn direction(&self) -> i32 {
        match self {
            PopEnd::First => -1,
            PopEnd::Last => 1,
        }
    }
}

/// A single mutation on one field path.
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateOp {
    /// Replace or create the field.
    Set(String, Bson),
    /// Remove the field entirely.
    Unset(String),
    /// Append a value to an array field, creating the array if absent.
    Push(String, Bson),
    /// Remove every array element equal to the value.
    Pull(String, Bson),
    /// Remove the first or last array element.
    Pop(String, PopEnd),
}

impl UpdateOp {
    /// The field path this operation targets.
    pub fn field(&self) -> &str {
        match self {
            UpdateOp::Set(field, _)
            | UpdateOp::Unset(field)
            | UpdateOp::Push(field, _)
            | UpdateOp::Pull(field, _)
            | UpdateOp::Pop(field, _) => field,
        }
    }

    /// The MongoDB operator name for this mutation.
    pub fn operator(&self) -> &'static str {
        match self {
            UpdateOp::Set(..) => "$set",
            UpdateOp::Unset(..) => "$unset",
            UpdateOp::Push(..) => "$push",
            UpdateOp::Pull(..) => "$pull",
            UpdateOp::Pop(..) => "$pop",
        }
    }
}

/// An ordered list of mutations applied to each matched document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Update {
    ops: Vec<UpdateOp>,
}

impl Update {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces or creates `field` with `value`.
    pub fn set(mut self, field: impl Into<String>, value: impl Into<Bson>) -> Self {
        self.ops.push(UpdateOp::Set(field.into(), value.into()));
        self
    }

    /// Removes `field` from the document.
    pub fn unset(mut self, field: impl Into<String>) -> Self {
        self.ops.push(UpdateOp::Unset(field.into()));
        self
    }

    /// Appends `value` to the array at `field`.
    pub fn push(mut self, field: impl Into<String>, value: impl Into<Bson>) -> Self {
        self.ops.push(UpdateOp::Push(field.into(), value.into()));
        self
    }

    /// Removes all elements equal to `value` from the array at `field`.
    ///
    /// Only literal values are supported; query conditions such as `{"$in": [..]}` fail
    /// validation.
    pub fn pull(mut self, field: impl Into<String>, value: impl Into<Bson>) -> Self {
        self.ops.push(UpdateOp::Pull(field.into(), value.into()));
        self
    }

    /// Removes the last element of the array at `field`.
    pub fn pop_last(mut self, field: impl Into<String>) -> Self {
        self.ops.push(UpdateOp::Pop(field.into(), PopEnd::Last));
        self
    }

    /// Removes the first element of the array at `field`.
    pub fn pop_first(mut self, field: impl Into<String>) -> Self {
        self.ops.push(UpdateOp::Pop(field.into(), PopEnd::First));
        self
    }

    pub fn ops(&self) -> &[UpdateOp] {
        &self.ops
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Checks that the update is non-empty, leaves the identifier alone and pulls only literal
    /// values.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::InvalidUpdate`] otherwise.
    pub fn validate(&self) -> DocumentStoreResult<()> {
        if self.ops.is_empty() {
            return Err(DocumentStoreError::InvalidUpdate(
                "update must contain at least one operation".to_string(),
            ));
        }

        if let Some(op) = self.ops.iter().find(|op| targets_id(op.field())) {
            return Err(DocumentStoreError::InvalidUpdate(format!(
                "{} on {} would modify the immutable field {ID_FIELD}",
                op.operator(),
                op.field()
            )));
        }

        if let Some(field) = self.ops.iter().find_map(|op| match op {
            UpdateOp::Pull(field, Bson::Document(condition))
                if condition.keys().any(|key| key.starts_with('$')) =>
            {
                Some(field)
            }
            _ => None,
        }) {
            return Err(DocumentStoreError::InvalidUpdate(format!(
                "$pull on {field} only removes literal values, not query conditions"
            )));
        }

        Ok(())
    }

    /// Parses a MongoDB-style update document such as
    /// `{"$set": {"price": 2.3}, "$pop": {"tags": 1}}`.
    ///
    /// `$push` also accepts `{"$each": [...]}` to append several values.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::InvalidUpdate`] for replacement-style documents, unknown
    /// operators, non-document operands and `$pop` values other than `1` or `-1`.
    pub fn from_document(update: &Document) -> DocumentStoreResult<Update> {
        let mut parsed = Update::new();

        for (operator, fields) in update {
            let fields = match fields {
                Bson::Document(fields) => fields,
                _ if !operator.starts_with('$') => {
                    return Err(DocumentStoreError::InvalidUpdate(format!(
                        "replacement field {operator} is not an update operator"
                    )));
                }
                _ => {
                    return Err(DocumentStoreError::InvalidUpdate(format!(
                        "{operator} requires a document of fields"
                    )));
                }
            };

            for (field, value) in fields {
                let field = field.clone();

                match operator.as_str() {
                    "$set" => parsed = parsed.set(field, value.clone()),
                    "$unset" => parsed = parsed.unset(field),
                    "$push" => match value {
                        Bson::Document(modifiers) if modifiers.contains_key("$each") => {
                            let values = modifiers
                                .get_array("$each")
                                .map_err(|_| {
                                    DocumentStoreError::InvalidUpdate(
                                        "$each requires an array".to_string(),
                                    )
                                })?;

                            for value in values {
                                parsed = parsed.push(field.clone(), value.clone());
                            }
                        }
                        _ => parsed = parsed.push(field, value.clone()),
                    },
                    "$pull" => parsed = parsed.pull(field, value.clone()),
                    "$pop" => {
                        parsed = match pop_direction(value) {
                            Some(1) => parsed.pop_last(field),
                            Some(-1) => parsed.pop_first(field),
                            _ => {
                                return Err(DocumentStoreError::InvalidUpdate(format!(
                                    "$pop on {field} requires 1 or -1, got {value}"
                                )));
                            }
                        }
                    }
                    other if other.starts_with('$') => {
                        return Err(DocumentStoreError::InvalidUpdate(format!(
                            "unsupported update operator {other}"
                        )));
                    }
                    other => {
                        return Err(DocumentStoreError::InvalidUpdate(format!(
                            "replacement field {other} is not an update operator"
                        )));
                    }
                }
            }
        }

        Ok(parsed)
    }
}

fn targets_id(field: &str) -> bool {
    field == ID_FIELD || field.starts_with("_id.")
}

fn pop_direction(value: &Bson) -> Option<i64> {
    match value {
        Bson::Int32(n) => Some(*n as i64),
        Bson::Int64(n) => Some(*n),
        Bson::Double(n) if n.fract() == 0.0 => Some(*n as i64),
        _ => None,
    }
}

/// Conversion into a validated [`Update`].
///
/// Implemented for [`Update`] and for update documents, so client operations accept either.
pub trait IntoUpdate {
    fn into_update(self) -> DocumentStoreResult<Update>;
}

impl IntoUpdate for Update {
    fn into_update(self) -> DocumentStoreResult<Update> {
        self.validate()?;
        Ok(self)
    }
}

impl IntoUpdate for Document {
    fn into_update(self) -> DocumentStoreResult<Update> {
        Update::from_document(&self)?.into_update()
    }
}

impl IntoUpdate for &Document {
    fn into_update(self) -> DocumentStoreResult<Update> {
        Update::from_document(self)?.into_update()
    }
}
