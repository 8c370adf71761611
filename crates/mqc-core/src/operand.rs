//! The dynamically-typed operand a MongoDB-shaped query document carries.
//!
//! The compiler is schema-blind: every cast and SQL shape it picks is a
//! function of the runtime type of the value it was handed, never of a
//! declared column type. `Operand` is the tagged sum that makes that
//! dispatch a `match` instead of a web of `serde_json::Value` probes.

use indexmap::IndexMap;
use serde_json::Value;

/// A single query/update operand, tagged by its MongoDB-relevant dynamic type.
///
/// `Undefined` has no JSON representation — it models the JavaScript
/// `undefined` that `$eq`/`$ne` treat differently from JSON `null` in the
/// system this crate is adapted from. Callers building operands from parsed
/// JSON will never produce it; it exists so the operator dispatch in
/// `mqc-compiler` can express `$eq: undefined` / `$ne: undefined` without a
/// third boolean flag threaded through every call site.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Undefined,
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Array(Vec<Operand>),
    Object(IndexMap<String, Operand>),
}

impl Operand {
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[must_use]
    pub fn is_undefined(&self) -> bool {
        matches!(self, Self::Undefined)
    }

    #[must_use]
    pub fn is_empty_object(&self) -> bool {
        matches!(self, Self::Object(m) if m.is_empty())
    }

    #[must_use]
    pub fn as_array(&self) -> Option<&[Operand]> {
        match self {
            Self::Array(v) => Some(v),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_object(&self) -> Option<&IndexMap<String, Operand>> {
        match self {
            Self::Object(m) => Some(m),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Truthiness in the MongoDB sense used by `$exists`: everything except
    /// `false`, `0`, `null`/`undefined` and the empty string is truthy.
    #[must_use]
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Undefined | Self::Null => false,
            Self::Bool(b) => *b,
            Self::Int(i) => *i != 0,
            Self::Float(f) => *f != 0.0,
            Self::Str(s) => !s.is_empty(),
            Self::Array(_) | Self::Object(_) => true,
        }
    }

    /// `true` for `Int`/`Float` — the "is this a number at all" test used
    /// by `$in`/`$nin` partitioning and numeric comparison dispatch.
    #[must_use]
    pub fn is_number(&self) -> bool {
        matches!(self, Self::Int(_) | Self::Float(_))
    }

    /// Whole-number test deciding the `integer` vs `numeric` cast for
    /// equality and `$in`/`$nin` grouping. An `Int` is always whole; a
    /// `Float` is whole only when it has no fractional part.
    #[must_use]
    pub fn is_whole_number(&self) -> bool {
        match self {
            Self::Int(_) => true,
            Self::Float(f) => f.fract() == 0.0,
            _ => false,
        }
    }

    /// Render a numeric operand as its PostgreSQL literal text, used for
    /// the inlined comparisons of `$gt`/`$gte`/`$lt`/`$lte`/`$mod`.
    #[must_use]
    pub fn numeric_literal(&self) -> Option<String> {
        match self {
            Self::Int(i) => Some(i.to_string()),
            Self::Float(f) => Some(format!("{f}")),
            _ => None,
        }
    }

    /// Parse a `[number, number]` pair, used by `$mod`.
    #[must_use]
    pub fn as_number_pair(&self) -> Option<(Operand, Operand)> {
        let arr = self.as_array()?;
        if arr.len() != 2 {
            return None;
        }
        if !arr[0].is_number() || !arr[1].is_number() {
            return None;
        }
        Some((arr[0].clone(), arr[1].clone()))
    }

    /// Non-negative integer extraction used by `$size`.
    #[must_use]
    pub fn as_non_negative_i64(&self) -> Option<i64> {
        match self {
            Self::Int(i) if *i >= 0 => Some(*i),
            Self::Float(f) if f.fract() == 0.0 && *f >= 0.0 => Some(*f as i64),
            _ => None,
        }
    }

    /// Mirror of this operand as a JSON value, used to build `$set`
    /// parameters (the update builder parameterizes `JSON.stringify(value)`
    /// equivalents) and `$all`/containment literal bodies.
    #[must_use]
    pub fn to_json(&self) -> Value {
        match self {
            Self::Undefined | Self::Null => Value::Null,
            Self::Bool(b) => Value::Bool(*b),
            Self::Int(i) => Value::from(*i),
            Self::Float(f) => serde_json::Number::from_f64(*f).map_or(Value::Null, Value::Number),
            Self::Str(s) => Value::String(s.clone()),
            Self::Array(items) => Value::Array(items.iter().map(Operand::to_json).collect()),
            Self::Object(map) => {
                let mut out = serde_json::Map::with_capacity(map.len());
                for (k, v) in map {
                    out.insert(k.clone(), v.to_json());
                }
                Value::Object(out)
            }
        }
    }
}

impl From<&Value> for Operand {
    fn from(value: &Value) -> Self {
        match value {
            Value::Null => Operand::Null,
            Value::Bool(b) => Operand::Bool(*b),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Operand::Int(i)
                } else {
                    Operand::Float(n.as_f64().unwrap_or(0.0))
                }
            }
            Value::String(s) => Operand::Str(s.clone()),
            Value::Array(items) => Operand::Array(items.iter().map(Operand::from).collect()),
            Value::Object(map) => {
                let mut out = IndexMap::with_capacity(map.len());
                for (k, v) in map {
                    out.insert(k.clone(), Operand::from(v));
                }
                Operand::Object(out)
            }
        }
    }
}

impl From<Value> for Operand {
    fn from(value: Value) -> Self {
        Operand::from(&value)
    }
}

/// Partition of an `$in`/`$nin` array by dynamic type, in the order the
/// compiler emits disjuncts: integers, numbers (`Float`-tagged, regardless
/// of whether the value happens to be whole — `3.0` groups with other
/// floats, not with `Int`), booleans, strings, objects. `had_null` records
/// whether `null` (or `undefined`) appeared among the elements so the
/// null-aware disjunct can be added.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct OperandGroups {
    pub integers: Vec<i64>,
    pub numbers: Vec<f64>,
    pub booleans: Vec<bool>,
    pub strings: Vec<String>,
    pub objects: Vec<Value>,
    pub had_null: bool,
}

impl OperandGroups {
    #[must_use]
    pub fn partition(items: &[Operand]) -> Self {
        let mut groups = Self::default();
        for item in items {
            match item {
                Operand::Null | Operand::Undefined => groups.had_null = true,
                Operand::Int(i) => groups.integers.push(*i),
                Operand::Float(f) => groups.numbers.push(*f),
                Operand::Bool(b) => groups.booleans.push(*b),
                Operand::Str(s) => groups.strings.push(s.clone()),
                Operand::Object(_) | Operand::Array(_) => groups.objects.push(item.to_json()),
            }
        }
        groups
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.integers.is_empty()
            && self.numbers.is_empty()
            && self.booleans.is_empty()
            && self.strings.is_empty()
            && self.objects.is_empty()
            && !self.had_null
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_number_literal_shape_decides_int_vs_float() {
        let int_val: Value = serde_json::from_str("3").unwrap();
        let float_val: Value = serde_json::from_str("3.0").unwrap();
        assert_eq!(Operand::from(&int_val), Operand::Int(3));
        assert_eq!(Operand::from(&float_val), Operand::Float(3.0));
    }

    #[test]
    fn partition_keeps_whole_floats_out_of_integers() {
        let items = vec![
            Operand::Int(1),
            Operand::Str("two".to_string()),
            Operand::Null,
            Operand::Float(3.0),
        ];
        let groups = OperandGroups::partition(&items);
        assert_eq!(groups.integers, vec![1]);
        assert_eq!(groups.numbers, vec![3.0]);
        assert_eq!(groups.strings, vec!["two".to_string()]);
        assert!(groups.had_null);
    }

    #[test]
    fn truthiness_matches_mongo_rules() {
        assert!(!Operand::Bool(false).is_truthy());
        assert!(!Operand::Int(0).is_truthy());
        assert!(!Operand::Str(String::new()).is_truthy());
        assert!(Operand::Array(vec![]).is_truthy());
        assert!(Operand::Int(1).is_truthy());
    }

    #[test]
    fn whole_number_distinguishes_int_and_fractional_float() {
        assert!(Operand::Int(4).is_whole_number());
        assert!(Operand::Float(4.0).is_whole_number());
        assert!(!Operand::Float(4.5).is_whole_number());
    }
}
