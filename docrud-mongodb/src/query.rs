//! Filter and update translation from docrud's AST to MongoDB query syntax.

use bson::{Bson, Document, doc};

use docrud_core::{
    error::DocumentStoreError,
    query::{Expr, FieldOp, QueryVisitor},
    update::{Update, UpdateOp},
};

/// Translates docrud filter expressions into MongoDB filter documents.
///
/// This struct implements the [`QueryVisitor`] trait to convert abstract
/// query expressions into MongoDB's native BSON query syntax.
pub(crate) struct MongoQueryTranslator;

impl QueryVisitor for MongoQueryTranslator {
    type Output = Document;
    type Error = DocumentStoreError;

    fn visit_and(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error> {
        match exprs {
            [] => Ok(doc! {}),
            [single] => self.visit_expr(single),
            _ => Ok(doc! {
                "$and": exprs
                    .iter()
                    .map(|expr| self.visit_expr(expr))
                    .collect::<Result<Vec<_>, _>>()?,
            }),
        }
    }

    fn visit_or(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error> {
        // MongoDB rejects an empty $or; an empty disjunction matches nothing.
        if exprs.is_empty() {
            return Ok(doc! { "_id": { "$in": [] } });
        }

        Ok(doc! {
            "$or": exprs
                .iter()
                .map(|expr| self.visit_expr(expr))
                .collect::<Result<Vec<_>, _>>()?,
        })
    }

    fn visit_not(&mut self, expr: &Expr) -> Result<Self::Output, Self::Error> {
        Ok(doc! {
            "$nor": [self.visit_expr(expr)?],
        })
    }

    fn visit_exists(&mut self, field: &str, should_exist: bool) -> Result<Self::Output, Self::Error> {
        Ok(doc! {
            field: { "$exists": should_exist },
        })
    }

    fn visit_field(&mut self, field: &str, op: &FieldOp, value: &Bson) -> Result<Self::Output, Self::Error> {
        if matches!(op, FieldOp::In | FieldOp::Nin) && !matches!(value, Bson::Array(_)) {
            return Err(DocumentStoreError::InvalidFilter(format!(
                "{} on {field} requires an array",
                op.operator()
            )));
        }

        Ok(doc! {
            field: { op.operator(): value.clone() },
        })
    }
}

/// Translates an [`Update`] into a MongoDB update document.
///
/// Operations are grouped under their operator in order of first appearance. Several pushes to
/// one field become a single `$push` with `$each`.
pub(crate) fn translate_update(update: &Update) -> Document {
    let mut groups: Vec<(&'static str, Document)> = Vec::new();
    let mut pushes: Vec<(&str, Vec<Bson>)> = Vec::new();

    for op in update.ops() {
        let fields = operator_fields(&mut groups, op.operator());

        match op {
            UpdateOp::Set(field, value) | UpdateOp::Pull(field, value) => {
                fields.insert(field.clone(), value.clone());
            }
            UpdateOp::Unset(field) => {
                fields.insert(field.clone(), "");
            }
            UpdateOp::Pop(field, end) => {
                fields.insert(field.clone(), end.direction());
            }
            UpdateOp::Push(field, value) => match pushes
                .iter_mut()
                .find(|(pushed, _)| *pushed == field.as_str())
            {
                Some((_, values)) => values.push(value.clone()),
                None => pushes.push((field.as_str(), vec![value.clone()])),
            },
        }
    }

    if !pushes.is_empty() {
        let fields = operator_fields(&mut groups, "$push");

        for (field, mut values) in pushes {
            let value = match values.len() {
                1 => values.remove(0),
                _ => Bson::Document(doc! { "$each": values }),
            };
            fields.insert(field, value);
        }
    }

    groups
        .into_iter()
        .map(|(operator, fields)| (operator.to_string(), Bson::Document(fields)))
        .collect()
}

fn operator_fields<'a>(
    groups: &'a mut Vec<(&'static str, Document)>,
    operator: &'static str,
) -> &'a mut Document {
    let position = match groups
        .iter()
        .position(|(name, _)| *name == operator)
    {
        Some(position) => position,
        None => {
            groups.push((operator, Document::new()));
            groups.len() - 1
        }
    };

    &mut groups[position].1
}
