//! Applying update operations and projections to stored documents.

use bson::{Bson, Document};

use docrud_core::{
    document::{DocumentExt, ID_FIELD},
    error::{DocumentStoreError, DocumentStoreResult},
    options::Projection,
    update::{PopEnd, Update, UpdateOp},
};

use crate::evaluator::values_equal;

/// Applies every operation of `update` to `document`, in order.
///
/// # Errors
///
/// Returns [`DocumentStoreError::Operation`] when an array operator meets a non-array value or
/// a path runs through a scalar. `document` may be partially updated in that case; callers
/// apply to a copy.
pub(crate) fn apply_update(document: &mut Document, update: &Update) -> DocumentStoreResult<()> {
    for op in update.ops() {
        match op {
            UpdateOp::Set(field, value) => set_path(document, field, value.clone())?,
            UpdateOp::Unset(field) => unset_path(document, field),
            UpdateOp::Push(field, value) => match get_path_mut(document, field) {
                Some(Bson::Array(items)) => items.push(value.clone()),
                Some(other) => return Err(not_an_array(op, other)),
                None => set_path(document, field, Bson::Array(vec![value.clone()]))?,
            },
            UpdateOp::Pull(field, value) => match get_path_mut(document, field) {
                Some(Bson::Array(items)) => items.retain(|item| !values_equal(item, value)),
                Some(other) => return Err(not_an_array(op, other)),
                None => {}
            },
            UpdateOp::Pop(field, end) => match get_path_mut(document, field) {
                Some(Bson::Array(items)) if items.is_empty() => {}
                Some(Bson::Array(items)) => {
                    match end {
                        PopEnd::First => items.remove(0),
                        PopEnd::Last => items.remove(items.len() - 1),
                    };
                }
                Some(other) => return Err(not_an_array(op, other)),
                None => {}
            },
        }
    }

    Ok(())
}

fn not_an_array(op: &UpdateOp, found: &Bson) -> DocumentStoreError {
    DocumentStoreError::Operation(format!(
        "{} requires {} to be an array, found {:?}",
        op.operator(),
        op.field(),
        found.element_type()
    ))
}

fn get_path_mut<'a>(document: &'a mut Document, path: &str) -> Option<&'a mut Bson> {
    let mut segments = path.split('.');
    let mut current = document.get_mut(segments.next()?)?;

    for segment in segments {
        current = match current {
            Bson::Document(inner) => inner.get_mut(segment)?,
            Bson::Array(items) => items.get_mut(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }

    Some(current)
}

/// Sets `path` to `value`, creating intermediate documents as needed.
///
/// A numeric segment indexes into an array; setting past the end pads the array with `null`.
pub(crate) fn set_path(document: &mut Document, path: &str, value: Bson) -> DocumentStoreResult<()> {
    let Some((head, rest)) = path.split_once('.') else {
        document.insert(path, value);
        return Ok(());
    };

    let next = document
        .entry(head.to_string())
        .or_insert_with(|| Bson::Document(Document::new()));

    set_in(next, rest, value, path)
}

fn set_in(target: &mut Bson, remaining: &str, value: Bson, path: &str) -> DocumentStoreResult<()> {
    let (segment, rest) = match remaining.split_once('.') {
        Some((segment, rest)) => (segment, Some(rest)),
        None => (remaining, None),
    };

    match target {
        Bson::Document(inner) => match rest {
            None => {
                inner.insert(segment, value);
                Ok(())
            }
            Some(rest) => {
                let next = inner
                    .entry(segment.to_string())
                    .or_insert_with(|| Bson::Document(Document::new()));

                set_in(next, rest, value, path)
            }
        },
        Bson::Array(items) => {
            let index = segment.parse::<usize>().map_err(|_| {
                DocumentStoreError::Operation(format!(
                    "cannot create field {segment} of {path} in an array"
                ))
            })?;

            if index >= items.len() {
                items.resize(index + 1, Bson::Null);

                if rest.is_some() {
                    items[index] = Bson::Document(Document::new());
                }
            }

            match rest {
                None => {
                    items[index] = value;
                    Ok(())
                }
                Some(rest) => set_in(&mut items[index], rest, value, path),
            }
        }
        other => Err(DocumentStoreError::Operation(format!(
            "cannot create field {segment} of {path} in element of type {:?}",
            other.element_type()
        ))),
    }
}

fn unset_path(document: &mut Document, path: &str) {
    match path.rsplit_once('.') {
        None => {
            document.remove(path);
        }
        Some((parent, leaf)) => match get_path_mut(document, parent) {
            Some(Bson::Document(inner)) => {
                inner.remove(leaf);
            }
            // Unsetting an array element leaves a null in its place.
            Some(Bson::Array(items)) => {
                if let Some(item) = leaf
                    .parse::<usize>()
                    .ok()
                    .and_then(|index| items.get_mut(index))
                {
                    *item = Bson::Null;
                }
            }
            _ => {}
        },
    }
}

/// Builds the document a new upsert starts from: the filter's equality conditions.
pub(crate) fn upsert_seed(equalities: &[(&str, &Bson)]) -> DocumentStoreResult<Document> {
    let mut seed = Document::new();

    for (field, value) in equalities {
        set_path(&mut seed, field, (*value).clone())?;
    }

    Ok(seed)
}

/// Shapes a matched document per `projection`.
pub(crate) fn project(document: Document, projection: &Projection) -> Document {
    match projection {
        Projection::Include { fields, id } => {
            let mut paths = fields
                .iter()
                .map(String::as_str)
                .collect::<Vec<_>>();

            if *id {
                paths.push(ID_FIELD);
            }

            let mut projected = include(&document, &paths);

            if !id {
                projected.remove(ID_FIELD);
            }

            projected
        }
        Projection::Exclude { fields } => {
            let mut projected = document;

            for field in fields {
                exclude(&mut projected, field);
            }

            projected
        }
    }
}

fn exclude(document: &mut Document, path: &str) {
    match path.rsplit_once('.') {
        None => {
            document.remove(path);
        }
        Some((parent, leaf)) => {
            if let Some(Bson::Document(inner)) = get_path_mut(document, parent) {
                inner.remove(leaf);
            }
        }
    }
}

fn include(document: &Document, paths: &[&str]) -> Document {
    let mut projected = Document::new();

    for (key, value) in document {
        if paths.contains(&key.as_str()) {
            projected.insert(key.clone(), value.clone());
            continue;
        }

        let nested = paths
            .iter()
            .filter_map(|path| {
                path.strip_prefix(key.as_str())
                    .and_then(|rest| rest.strip_prefix('.'))
            })
            .collect::<Vec<_>>();

        if let (false, Bson::Document(inner)) = (nested.is_empty(), value) {
            projected.insert(key.clone(), include(inner, &nested));
        }
    }

    projected
}

/// Rejects documents whose `_id` collides with one already stored.
pub(crate) fn check_unique_id(
    stored: &[Document],
    document: &Document,
) -> DocumentStoreResult<()> {
    let Some(id) = document.id() else {
        return Ok(());
    };

    if stored
        .iter()
        .filter_map(DocumentExt::id)
        .any(|existing| values_equal(existing, id))
    {
        return Err(DocumentStoreError::Operation(format!(
            "E11000 duplicate key error: {ID_FIELD} {id} already exists"
        )));
    }

    Ok(())
}
