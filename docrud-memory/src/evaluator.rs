//! Filter evaluation and value ordering for in-memory documents.
//!
//! The rules follow MongoDB's query semantics closely enough for the operations docrud exposes:
//! numbers compare across integer and floating point types, equality against an array field
//! matches any element, `null` equality matches missing fields, and range operators only compare
//! values of the same type bracket.

use std::cmp::Ordering;

use bson::{Bson, Document, datetime::DateTime, oid::ObjectId};

use docrud_core::{
    error::{DocumentStoreError, DocumentStoreResult},
    query::{Expr, FieldOp, QueryVisitor},
};

/// Borrowed, comparable view of a BSON value.
///
/// Integers compare exactly with each other and doubles, decimals are read as doubles. The
/// variant order is MongoDB's cross-type sort order, which [`Comparable::rank`] encodes.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Comparable<'a> {
    Null,
    Int(i64),
    Double(f64),
    String(&'a str),
    Map(&'a Document),
    Array(&'a [Bson]),
    ObjectId(ObjectId),
    Bool(bool),
    DateTime(DateTime),
    Other(&'a Bson),
}

impl<'a> From<&'a Bson> for Comparable<'a> {
    fn from(bson: &'a Bson) -> Self {
        match bson {
            Bson::Null | Bson::Undefined => Comparable::Null,
            Bson::Int32(value) => Comparable::Int(i64::from(*value)),
            Bson::Int64(value) => Comparable::Int(*value),
            Bson::Double(value) => Comparable::Double(*value),
            Bson::Decimal128(value) => match value.to_string().parse::<f64>() {
                Ok(value) => Comparable::Double(value),
                Err(_) => Comparable::Other(bson),
            },
            Bson::String(value) | Bson::Symbol(value) => Comparable::String(value),
            Bson::Document(doc) => Comparable::Map(doc),
            Bson::Array(arr) => Comparable::Array(arr),
            Bson::ObjectId(oid) => Comparable::ObjectId(*oid),
            Bson::Boolean(value) => Comparable::Bool(*value),
            Bson::DateTime(value) => Comparable::DateTime(*value),
            other => Comparable::Other(other),
        }
    }
}

impl Comparable<'_> {
    fn rank(&self) -> u8 {
        match self {
            Comparable::Null => 0,
            Comparable::Int(_) | Comparable::Double(_) => 1,
            Comparable::String(_) => 2,
            Comparable::Map(_) => 3,
            Comparable::Array(_) => 4,
            Comparable::ObjectId(_) => 5,
            Comparable::Bool(_) => 6,
            Comparable::DateTime(_) => 7,
            Comparable::Other(_) => 8,
        }
    }

    /// Total order over all values: first by type bracket, then by value.
    pub(crate) fn total_cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Comparable::Null, Comparable::Null) => Ordering::Equal,
            (Comparable::Int(a), Comparable::Int(b)) => a.cmp(b),
            (Comparable::Double(a), Comparable::Double(b)) => compare_doubles(*a, *b),
            (Comparable::Int(a), Comparable::Double(b)) => compare_int_double(*a, *b),
            (Comparable::Double(a), Comparable::Int(b)) => compare_int_double(*b, *a).reverse(),
            (Comparable::String(a), Comparable::String(b)) => a.cmp(b),
            (Comparable::Map(a), Comparable::Map(b)) => a
                .iter()
                .zip(b.iter())
                .map(|((ka, va), (kb, vb))| {
                    ka.cmp(kb)
                        .then_with(|| compare_values(va, vb))
                })
                .find(|ordering| ordering.is_ne())
                .unwrap_or_else(|| a.len().cmp(&b.len())),
            (Comparable::Array(a), Comparable::Array(b)) => a
                .iter()
                .zip(b.iter())
                .map(|(va, vb)| compare_values(va, vb))
                .find(|ordering| ordering.is_ne())
                .unwrap_or_else(|| a.len().cmp(&b.len())),
            (Comparable::ObjectId(a), Comparable::ObjectId(b)) => a.bytes().cmp(&b.bytes()),
            (Comparable::Bool(a), Comparable::Bool(b)) => a.cmp(b),
            (Comparable::DateTime(a), Comparable::DateTime(b)) => a
                .timestamp_millis()
                .cmp(&b.timestamp_millis()),
            (Comparable::Other(a), Comparable::Other(b)) if a == b => Ordering::Equal,
            (Comparable::Other(a), Comparable::Other(b)) => (a.element_type() as u8)
                .cmp(&(b.element_type() as u8))
                .then_with(|| a.to_string().cmp(&b.to_string()))
                .then(Ordering::Less),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

/// `NaN` equals itself and sorts below every other number.
fn compare_doubles(a: f64, b: f64) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        (false, false) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
    }
}

/// Exact comparison of an integer with a double, also above 2^53.
fn compare_int_double(int: i64, double: f64) -> Ordering {
    if double.is_nan() {
        return Ordering::Greater;
    }

    match (int as f64).partial_cmp(&double) {
        Some(Ordering::Equal) if double >= 9_223_372_036_854_775_808.0 => Ordering::Less,
        Some(Ordering::Equal) => int.cmp(&(double as i64)),
        Some(ordering) => ordering,
        None => Ordering::Equal,
    }
}

/// Compares two values under MongoDB's cross-type ordering.
pub(crate) fn compare_values(left: &Bson, right: &Bson) -> Ordering {
    Comparable::from(left).total_cmp(&Comparable::from(right))
}

/// Value equality with numeric normalization, so `1` equals `1.0`.
pub(crate) fn values_equal(left: &Bson, right: &Bson) -> bool {
    compare_values(left, right).is_eq()
}

/// Resolves a dotted path to every value it reaches.
///
/// Arrays along the path fan out: `tags.name` on `{tags: [{name: "a"}, {name: "b"}]}` reaches
/// both names. A numeric segment indexes into an array.
pub(crate) fn field_values<'a>(document: &'a Document, path: &str) -> Vec<&'a Bson> {
    let segments = path.split('.').collect::<Vec<_>>();
    let mut found = Vec::new();

    if let Some((head, rest)) = segments.split_first()
        && let Some(value) = document.get(*head)
    {
        resolve(value, rest, &mut found);
    }

    found
}

fn resolve<'a>(value: &'a Bson, path: &[&str], found: &mut Vec<&'a Bson>) {
    let Some((head, rest)) = path.split_first() else {
        found.push(value);
        return;
    };

    match value {
        Bson::Document(document) => {
            if let Some(next) = document.get(*head) {
                resolve(next, rest, found);
            }
        }
        Bson::Array(items) => match head.parse::<usize>() {
            Ok(index) => {
                if let Some(next) = items.get(index) {
                    resolve(next, rest, found);
                }
            }
            Err(_) => {
                for item in items {
                    if let Bson::Document(_) = item {
                        resolve(item, path, found);
                    }
                }
            }
        },
        _ => {}
    }
}

/// The value a document sorts by for `path`; missing fields sort as `null`.
pub(crate) fn sort_key<'a>(document: &'a Document, path: &str) -> Comparable<'a> {
    field_values(document, path)
        .first()
        .map(|value| Comparable::from(*value))
        .unwrap_or(Comparable::Null)
}

pub(crate) struct DocumentEvaluator<'a> {
    document: &'a Document,
}

impl<'a> DocumentEvaluator<'a> {
    pub fn new(document: &'a Document) -> Self {
        Self { document }
    }

    pub fn evaluate(&mut self, expr: &Expr) -> DocumentStoreResult<bool> {
        self.visit_expr(expr)
    }

    /// Returns `true` if `document` satisfies `expr`.
    pub fn matches(document: &Document, expr: &Expr) -> DocumentStoreResult<bool> {
        DocumentEvaluator::new(document).evaluate(expr)
    }

    fn equals(&self, field: &str, value: &Bson) -> bool {
        let candidates = field_values(self.document, field);

        if candidates.is_empty() {
            return matches!(Comparable::from(value), Comparable::Null);
        }

        candidates.into_iter().any(|candidate| {
            values_equal(candidate, value)
                || matches!(candidate, Bson::Array(items) if items.iter().any(|item| values_equal(item, value)))
        })
    }

    fn compares(&self, field: &str, value: &Bson, accept: impl Fn(Ordering) -> bool) -> bool {
        let target = Comparable::from(value);

        field_values(self.document, field)
            .into_iter()
            .flat_map(|candidate| match candidate {
                Bson::Array(items) => items.iter().collect::<Vec<_>>(),
                _ => vec![candidate],
            })
            .map(Comparable::from)
            .filter(|candidate| candidate.rank() == target.rank())
            .any(|candidate| accept(candidate.total_cmp(&target)))
    }

    fn any_of(&self, field: &str, values: &Bson) -> DocumentStoreResult<bool> {
        match values {
            Bson::Array(values) => Ok(values
                .iter()
                .any(|value| self.equals(field, value))),
            other => Err(DocumentStoreError::InvalidFilter(format!(
                "$in/$nin on {field} requires an array, got {other}"
            ))),
        }
    }
}

impl QueryVisitor for DocumentEvaluator<'_> {
    type Output = bool;
    type Error = DocumentStoreError;

    fn visit_and(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error> {
        for expr in exprs {
            if !self.visit_expr(expr)? {
                return Ok(false);
            }
        }

        Ok(true)
    }

    fn visit_or(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error> {
        for expr in exprs {
            if self.visit_expr(expr)? {
                return Ok(true);
            }
        }

        Ok(false)
    }

    fn visit_not(&mut self, expr: &Expr) -> Result<Self::Output, Self::Error> {
        Ok(!self.visit_expr(expr)?)
    }

    fn visit_exists(&mut self, field: &str, should_exist: bool) -> Result<Self::Output, Self::Error> {
        Ok(!field_values(self.document, field).is_empty() == should_exist)
    }

    fn visit_field(&mut self, field: &str, op: &FieldOp, value: &Bson) -> Result<Self::Output, Self::Error> {
        Ok(match op {
            FieldOp::Eq => self.equals(field, value),
            FieldOp::Ne => !self.equals(field, value),
            FieldOp::In => self.any_of(field, value)?,
            FieldOp::Nin => !self.any_of(field, value)?,
            // Inclusive comparisons against null also match missing fields.
            FieldOp::Gte | FieldOp::Lte if matches!(value, Bson::Null) => self.equals(field, value),
            FieldOp::Gt => self.compares(field, value, Ordering::is_gt),
            FieldOp::Gte => self.compares(field, value, Ordering::is_ge),
            FieldOp::Lt => self.compares(field, value, Ordering::is_lt),
            FieldOp::Lte => self.compares(field, value, Ordering::is_le),
        })
    }
}

#[cfg(test)]
mod tests {
    use bson::doc;
    use docrud_core::query::Filter;

    use super::*;

    fn clementine() -> Document {
        doc! {
            "_id": 1,
            "name": "Clementine",
            "price": 1.05,
            "quantity": 12,
            "tags": ["fruit", "citric"],
            "origin": { "country": "ES", "region": "Valencia" },
            "sizes": [ { "w": 10 }, { "w": 20 } ],
        }
    }

    fn eval(expr: Expr) -> bool {
        DocumentEvaluator::matches(&clementine(), &expr).unwrap()
    }

    #[test]
    fn numbers_compare_across_types() {
        assert!(eval(Filter::eq("quantity", 12.0)));
        assert!(eval(Filter::lt("price", 2)));
        assert!(eval(Filter::gte("quantity", 12_i64)));
        assert!(!eval(Filter::gt("quantity", 12)));
    }

    #[test]
    fn equality_matches_array_elements() {
        assert!(eval(Filter::eq("tags", "citric")));
        assert!(eval(Filter::eq("tags", bson::bson!(["fruit", "citric"]))));
        assert!(!eval(Filter::eq("tags", "vegetable")));
        assert!(eval(Filter::ne("tags", "vegetable")));
        assert!(eval(Filter::in_("tags", ["breakfast", "fruit"])));
        assert!(eval(Filter::nin("tags", ["breakfast"])));
    }

    #[test]
    fn dotted_paths_reach_nested_and_array_documents() {
        assert!(eval(Filter::eq("origin.country", "ES")));
        assert!(eval(Filter::eq("sizes.w", 20)));
        assert!(eval(Filter::eq("sizes.0.w", 10)));
        assert!(!eval(Filter::eq("sizes.1.w", 10)));
        assert!(eval(Filter::exists("origin.region")));
        assert!(eval(Filter::not_exists("origin.city")));
    }

    #[test]
    fn missing_fields() {
        assert!(eval(Filter::eq("color", Bson::Null)));
        assert!(eval(Filter::ne("color", "Orange")));
        assert!(!eval(Filter::lt("color", "Z")));
        assert!(!eval(Filter::gt("weight", 0)));
        assert!(eval(Filter::lte("weight", Bson::Null)));
    }

    #[test]
    fn range_operators_stay_in_type_bracket() {
        assert!(!eval(Filter::gt("name", 5)));
        assert!(eval(Filter::gt("name", "Apple")));
    }

    #[test]
    fn logical_combinators() {
        assert!(eval(Filter::and([])));
        assert!(!eval(Filter::or([])));
        assert!(eval(Filter::eq("name", "Kiwi").or(Filter::eq("name", "Clementine"))));
        assert!(!eval(Filter::eq("name", "Clementine").not()));
    }

    #[test]
    fn large_integers_compare_exactly() {
        let big = Bson::Int64(9_007_199_254_740_993);

        assert!(!values_equal(&Bson::Int64(9_007_199_254_740_992), &big));
        assert!(values_equal(&Bson::Int64(9_007_199_254_740_992), &Bson::Double(9_007_199_254_740_992.0)));
        assert_eq!(compare_values(&Bson::Double(9_007_199_254_740_992.0), &big), Ordering::Less);
        assert_eq!(compare_values(&Bson::Int32(3), &Bson::Double(2.5)), Ordering::Greater);
    }

    #[test]
    fn distinct_binary_values_are_not_equal() {
        let first = Bson::Binary(bson::Binary { subtype: bson::spec::BinarySubtype::Generic, bytes: vec![1; 16] });
        let second = Bson::Binary(bson::Binary { subtype: bson::spec::BinarySubtype::Generic, bytes: vec![2; 16] });

        assert!(values_equal(&first, &first.clone()));
        assert!(!values_equal(&first, &second));
        assert_eq!(compare_values(&first, &second), compare_values(&second, &first).reverse());

        let document = doc! { "key": first };
        assert!(!DocumentEvaluator::matches(&document, &Filter::eq("key", second)).unwrap());
    }

    #[test]
    fn decimals_compare_as_numbers() {
        let cheap = Bson::Decimal128("1.05".parse().unwrap());
        let dear = Bson::Decimal128("3.50".parse().unwrap());

        assert!(!values_equal(&cheap, &dear));
        assert!(values_equal(&dear, &Bson::Double(3.5)));
        assert_eq!(compare_values(&cheap, &Bson::Int32(2)), Ordering::Less);
    }

    #[test]
    fn cross_type_sort_order() {
        let mut values = vec![
            Bson::Boolean(true),
            Bson::String("a".into()),
            Bson::Int32(3),
            Bson::Null,
            Bson::Double(1.5),
            Bson::Document(doc! { "a": 1 }),
        ];
        values.sort_by(compare_values);

        assert_eq!(
            values,
            vec![
                Bson::Null,
                Bson::Double(1.5),
                Bson::Int32(3),
                Bson::String("a".into()),
                Bson::Document(doc! { "a": 1 }),
                Bson::Boolean(true),
            ],
        );
    }
}
