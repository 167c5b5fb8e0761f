//! Filter construction and parsing for document stores.
//!
//! Filters are represented as an [`Expr`] tree. They can be built with the [`Filter`] helper:
//!
//! ```ignore
//! use docrud::query::Filter;
//!
//! let cheap_fruit = Filter::eq("category", "Fruit").and(Filter::lt("price", 2.0));
//! ```
//!
//! or parsed from a MongoDB-style filter document with [`Expr::from_document`]:
//!
//! ```ignore
//! use bson::doc;
//!
//! let cheap = Expr::from_document(&doc! { "price": { "$lt": 2.0 } })?;
//! ```
//!
//! Backends consume expressions through the [`QueryVisitor`] trait.

use bson::{Bson, Document};

use crate::error::{DocumentStoreError, DocumentStoreResult};

/// Field comparison operators for filter expressions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldOp {
    /// Equal to. On array fields, matches when any element is equal.
    Eq,
    /// Not equal to.
    Ne,
    /// Greater than.
    Gt,
    /// Greater than or equal to.
    Gte,
    /// Less than.
    Lt,
    /// Less than or equal to.
    Lte,
    /// Equal to any of the values in an array.
    In,
    /// Equal to none of the values in an array.
    Nin,
}

impl FieldOp {
    /// The MongoDB operator name for this comparison.
    pub fn operator(&self) -> &'static str {
        match self {
            FieldOp::Eq => "$eq",
            FieldOp::Ne => "$ne",
            FieldOp::Gt => "$gt",
            FieldOp::Gte => "$gte",
            FieldOp::Lt => "$lt",
            FieldOp::Lte => "$lte",
            FieldOp::In => "$in",
            FieldOp::Nin => "$nin",
        }
    }

    fn from_operator(operator: &str) -> Option<Self> {
        Some(match operator {
            "$eq" => FieldOp::Eq,
            "$ne" => FieldOp::Ne,
            "$gt" => FieldOp::Gt,
            "$gte" => FieldOp::Gte,
            "$lt" => FieldOp::Lt,
            "$lte" => FieldOp::Lte,
            "$in" => FieldOp::In,
            "$nin" => FieldOp::Nin,
            _ => return None,
        })
    }
}

/// A filter expression for matching documents.
///
/// Expressions can be combined using logical operators (`And`, `Or`, `Not`)
/// to build complex filter predicates. An empty `And` matches every document.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Logical AND of multiple expressions (all must match).
    And(Vec<Expr>),
    /// Logical OR of multiple expressions (any must match).
    Or(Vec<Expr>),
    /// Logical NOT of an expression (inverts the result).
    Not(Box<Expr>),
    /// Checks if a field exists or doesn't exist.
    Exists(String, bool),
    /// Field comparison expression.
    Field {
        /// The field path to compare, dotted for nested fields.
        field: String,
        /// The comparison operator.
        op: FieldOp,
        /// The value to compare against.
        value: Bson,
    },
}

impl Expr {
    /// An expression matching every document.
    pub fn all() -> Self {
        Expr::And(Vec::new())
    }

    /// Creates a field comparison expression.
    pub fn field(field: String, op: FieldOp, value: Bson) -> Self {
        Expr::Field { field, op, value }
    }

    /// Returns `true` if this expression matches every document.
    pub fn is_match_all(&self) -> bool {
        matches!(self, Expr::And(list) if list.is_empty())
    }

    /// Combines this expression with another using logical AND.
    ///
    /// If this expression is already an AND, the other expression is appended
    /// to the list. Otherwise, a new AND expression is created.
    pub fn and(self, other: Expr) -> Self {
        match self {
            Expr::And(mut list) => {
                list.push(other);
                Expr::And(list)
            }
            _ => Expr::And(vec![self, other]),
        }
    }

    /// Combines this expression with another using logical OR.
    ///
    /// If this expression is already an OR, the other expression is appended
    /// to the list. Otherwise, a new OR expression is created.
    pub fn or(self, other: Expr) -> Self {
        match self {
            Expr::Or(mut list) => {
                list.push(other);
                Expr::Or(list)
            }
            _ => Expr::Or(vec![self, other]),
        }
    }

    /// Negates this expression (logical NOT).
    pub fn not(self) -> Self {
        Expr::Not(Box::new(self))
    }

    /// Parses a MongoDB-style filter document.
    ///
    /// Supported forms are `{field: value}` equality, `{field: {$op: value, ...}}` with
    /// `$eq`, `$ne`, `$gt`, `$gte`, `$lt`, `$lte`, `$in`, `$nin`, `$exists` and `$not`, and the
    /// top-level `$and`, `$or` and `$nor` combinators. Several conditions in one document are
    /// AND-ed.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::InvalidFilter`] for unknown operators or ill-typed operands.
    pub fn from_document(filter: &Document) -> DocumentStoreResult<Expr> {
        let clauses = filter
            .iter()
            .map(|(key, value)| match key.as_str() {
                "$and" => Ok(Expr::And(parse_clause_list(key, value)?)),
                "$or" => Ok(Expr::Or(parse_clause_list(key, value)?)),
                "$nor" => Ok(Expr::Or(parse_clause_list(key, value)?).not()),
                operator if operator.starts_with('$') => Err(DocumentStoreError::InvalidFilter(
                    format!("unsupported top-level operator {operator}"),
                )),
                field => parse_field(field, value),
            })
            .collect::<DocumentStoreResult<Vec<_>>>()?;

        Ok(match <[Expr; 1]>::try_from(clauses) {
            Ok([single]) => single,
            Err(clauses) => Expr::And(clauses),
        })
    }

    /// Collects the `field == value` conditions that must hold for this expression to match.
    ///
    /// Only top-level equality and equality nested in `And` qualify; this is what an upsert
    /// seeds a new document with.
    pub fn equality_fields(&self) -> Vec<(&str, &Bson)> {
        match self {
            Expr::Field { field, op: FieldOp::Eq, value } => vec![(field.as_str(), value)],
            Expr::And(exprs) => exprs
                .iter()
                .flat_map(Expr::equality_fields)
                .collect(),
            _ => Vec::new(),
        }
    }
}

fn parse_clause_list(operator: &str, value: &Bson) -> DocumentStoreResult<Vec<Expr>> {
    let clauses = value.as_array().ok_or_else(|| {
        DocumentStoreError::InvalidFilter(format!("{operator} requires an array of filters"))
    })?;

    if clauses.is_empty() {
        return Err(DocumentStoreError::InvalidFilter(format!(
            "{operator} requires a non-empty array"
        )));
    }

    clauses
        .iter()
        .map(|clause| match clause {
            Bson::Document(document) => Expr::from_document(document),
            _ => Err(DocumentStoreError::InvalidFilter(format!(
                "{operator} entries must be documents"
            ))),
        })
        .collect()
}

fn is_operator_document(document: &Document) -> bool {
    document
        .keys()
        .next()
        .is_some_and(|key| key.starts_with('$'))
}

fn parse_field(field: &str, value: &Bson) -> DocumentStoreResult<Expr> {
    match value {
        Bson::Document(conditions) if is_operator_document(conditions) => {
            let clauses = conditions
                .iter()
                .map(|(operator, operand)| parse_condition(field, operator, operand))
                .collect::<DocumentStoreResult<Vec<_>>>()?;

            Ok(match <[Expr; 1]>::try_from(clauses) {
                Ok([single]) => single,
                Err(clauses) => Expr::And(clauses),
            })
        }
        _ => Ok(Filter::eq(field, value.clone())),
    }
}

fn parse_condition(field: &str, operator: &str, operand: &Bson) -> DocumentStoreResult<Expr> {
    match operator {
        "$exists" => Ok(Expr::Exists(field.to_string(), truthy(operand)?)),
        "$not" => match operand {
            Bson::Document(inner) if is_operator_document(inner) => {
                Ok(parse_field(field, operand)?.not())
            }
            _ => Err(DocumentStoreError::InvalidFilter(
                "$not requires an operator document".to_string(),
            )),
        },
        _ => match FieldOp::from_operator(operator) {
            Some(op @ (FieldOp::In | FieldOp::Nin)) if !matches!(operand, Bson::Array(_)) => {
                Err(DocumentStoreError::InvalidFilter(format!(
                    "{} requires an array",
                    op.operator()
                )))
            }
            Some(op) => Ok(Expr::field(field.to_string(), op, operand.clone())),
            None => Err(DocumentStoreError::InvalidFilter(format!(
                "unsupported operator {operator} on field {field}"
            ))),
        },
    }
}

fn truthy(value: &Bson) -> DocumentStoreResult<bool> {
    match value {
        Bson::Boolean(flag) => Ok(*flag),
        Bson::Int32(n) => Ok(*n != 0),
        Bson::Int64(n) => Ok(*n != 0),
        Bson::Double(n) => Ok(*n != 0.0),
        _ => Err(DocumentStoreError::InvalidFilter(
            "$exists requires a boolean".to_string(),
        )),
    }
}

/// Helper struct for constructing filter expressions.
///
/// All methods accept field names and values as `Into<String>` and `Into<Bson>` for ergonomics.
///
/// # Example
///
/// ```ignore
/// use docrud::query::Filter;
///
/// let expr = Filter::eq("color", "Orange")
///     .and(Filter::gt("quantity", 5));
/// ```
pub struct Filter;

impl Filter {
    /// Matches documents where the field equals the specified value.
    pub fn eq(field: impl Into<String>, value: impl Into<Bson>) -> Expr {
        Expr::field(field.into(), FieldOp::Eq, value.into())
    }

    /// Matches documents where the field does not equal the specified value.
    pub fn ne(field: impl Into<String>, value: impl Into<Bson>) -> Expr {
        Expr::field(field.into(), FieldOp::Ne, value.into())
    }

    /// Matches documents where the field is greater than the specified value.
    pub fn gt(field: impl Into<String>, value: impl Into<Bson>) -> Expr {
        Expr::field(field.into(), FieldOp::Gt, value.into())
    }

    /// Matches documents where the field is greater than or equal to the specified value.
    pub fn gte(field: impl Into<String>, value: impl Into<Bson>) -> Expr {
        Expr::field(field.into(), FieldOp::Gte, value.into())
    }

    /// Matches documents where the field is less than the specified value.
    pub fn lt(field: impl Into<String>, value: impl Into<Bson>) -> Expr {
        Expr::field(field.into(), FieldOp::Lt, value.into())
    }

    /// Matches documents where the field is less than or equal to the specified value.
    pub fn lte(field: impl Into<String>, value: impl Into<Bson>) -> Expr {
        Expr::field(field.into(), FieldOp::Lte, value.into())
    }

    /// Matches documents where the field equals any of the given values.
    pub fn in_<V: Into<Bson>>(field: impl Into<String>, values: impl IntoIterator<Item = V>) -> Expr {
        Expr::field(
            field.into(),
            FieldOp::In,
            Bson::Array(values.into_iter().map(Into::into).collect()),
        )
    }

    /// Matches documents where the field equals none of the given values.
    pub fn nin<V: Into<Bson>>(field: impl Into<String>, values: impl IntoIterator<Item = V>) -> Expr {
        Expr::field(
            field.into(),
            FieldOp::Nin,
            Bson::Array(values.into_iter().map(Into::into).collect()),
        )
    }

    /// Matches documents where the field is present.
    pub fn exists(field: impl Into<String>) -> Expr {
        Expr::Exists(field.into(), true)
    }

    /// Matches documents where the field is absent.
    pub fn not_exists(field: impl Into<String>) -> Expr {
        Expr::Exists(field.into(), false)
    }

    /// Combines multiple expressions such that all must match.
    pub fn and(exprs: impl IntoIterator<Item = Expr>) -> Expr {
        Expr::And(exprs.into_iter().collect())
    }

    /// Combines multiple expressions such that any can match.
    pub fn or(exprs: impl IntoIterator<Item = Expr>) -> Expr {
        Expr::Or(exprs.into_iter().collect())
    }
}

/// Conversion into a filter expression.
///
/// Implemented for [`Expr`] and for filter documents, so client operations accept either.
pub trait IntoFilter {
    fn into_filter(self) -> DocumentStoreResult<Expr>;
}

impl IntoFilter for Expr {
    fn into_filter(self) -> DocumentStoreResult<Expr> {
        Ok(self)
    }
}

impl IntoFilter for Document {
    fn into_filter(self) -> DocumentStoreResult<Expr> {
        Expr::from_document(&self)
    }
}

impl IntoFilter for &Document {
    fn into_filter(self) -> DocumentStoreResult<Expr> {
        Expr::from_document(self)
    }
}

pub trait QueryVisitor {
    type Output;
    type Error: Into<DocumentStoreError>;

    fn visit_and(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error>;
    fn visit_or(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error>;
    fn visit_not(&mut self, expr: &Expr) -> Result<Self::Output, Self::Error>;
    fn visit_exists(
        &mut self,
        field: &str,
        should_exist: bool,
    ) -> Result<Self::Output, Self::Error>;
    fn visit_field(
        &mut self,
        field: &str,
        op: &FieldOp,
        value: &Bson,
    ) -> Result<Self::Output, Self::Error>;

    fn visit_expr(&mut self, expr: &Expr) -> Result<Self::Output, Self::Error> {
        match expr {
            Expr::And(exprs) => self.visit_and(exprs),
            Expr::Or(exprs) => self.visit_or(exprs),
            Expr::Not(expr) => self.visit_not(expr),
            Expr::Exists(field, should_exist) => self.visit_exists(field, *should_exist),
            Expr::Field { field, op, value } => self.visit_field(field, op, value),
        }
    }
}
