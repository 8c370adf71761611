//! The bound-parameter side of compilation, kept distinct from [`Operand`]
//! (the AST value type): a [`Param`] is what actually gets sent to the
//! backend for a `$N` placeholder, already shaped into the bucket
//! (`Integer`/`Numeric`/`Text`/... or one of the array variants for
//! `$in`/`$nin`) that its emitted cast expects.
//!
//! Grounded on `octofhir_search::sql_builder::SqlParam` — this crate is
//! adapted from a system with the same text/integer/float/boolean/json
//! split, extended with the array variants `$in`/`$nin` partitioning needs.

use mqc_core::Operand;
use serde_json::Value;

#[derive(Debug, Clone, PartialEq)]
pub enum Param {
    Text(String),
    Integer(i64),
    Numeric(f64),
    Boolean(bool),
    Json(Value),
    IntegerArray(Vec<i64>),
    NumericArray(Vec<f64>),
    BooleanArray(Vec<bool>),
    TextArray(Vec<String>),
    JsonArray(Vec<Value>),
}

impl From<&Operand> for Param {
    fn from(operand: &Operand) -> Self {
        match operand {
            Operand::Bool(b) => Param::Boolean(*b),
            Operand::Int(i) => Param::Integer(*i),
            Operand::Float(f) => Param::Numeric(*f),
            Operand::Str(s) => Param::Text(s.clone()),
            Operand::Null | Operand::Undefined | Operand::Array(_) | Operand::Object(_) => {
                Param::Json(operand.to_json())
            }
        }
    }
}

/// An append-only, 1-based parameter vector threaded through a single
/// compile. `push` returns the placeholder number (`$N`) the caller should
/// splice into the emitted SQL text.
#[derive(Debug, Default, Clone)]
pub struct Params(Vec<Param>);

impl Params {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `param` and return its 1-based placeholder number.
    pub fn push(&mut self, param: Param) -> usize {
        self.0.push(param);
        self.0.len()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn into_vec(self) -> Vec<Param> {
        self.0
    }

    #[must_use]
    pub fn as_slice(&self) -> &[Param] {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_returns_one_based_index() {
        let mut params = Params::new();
        assert_eq!(params.push(Param::Text("a".into())), 1);
        assert_eq!(params.push(Param::Integer(1)), 2);
        assert_eq!(params.len(), 2);
    }

    #[test]
    fn from_operand_buckets_scalars() {
        assert_eq!(Param::from(&Operand::Bool(true)), Param::Boolean(true));
        assert_eq!(Param::from(&Operand::Int(5)), Param::Integer(5));
        assert_eq!(Param::from(&Operand::Float(1.5)), Param::Numeric(1.5));
        assert_eq!(
            Param::from(&Operand::Str("x".into())),
            Param::Text("x".into())
        );
    }
}
