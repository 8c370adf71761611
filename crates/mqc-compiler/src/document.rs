//! The query document type and the operator-object/equality-value
//! distinction the rest of the compiler dispatches on.

use indexmap::IndexMap;
use mqc_core::Operand;

/// A query (or `$and`/`$or`/`$elemMatch` sub-) document: an ordered map from
/// field path or `$`-prefixed operator key to operand. Ordered so parameter
/// numbering matches source iteration order (§8 invariant).
pub type QueryDocument = IndexMap<String, Operand>;

/// `true` when every key of `map` starts with `$` and `map` is non-empty —
/// the test that distinguishes an operator object (`{$gt: 5, $lt: 10}`) from
/// a plain equality value or a sub-document.
#[must_use]
pub fn is_operator_object(map: &IndexMap<String, Operand>) -> bool {
    !map.is_empty() && map.keys().all(|k| k.starts_with('$'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::indexmap;

    #[test]
    fn detects_operator_objects() {
        let ops: IndexMap<String, Operand> = indexmap! {
            "$gt".to_string() => Operand::Int(5),
            "$lt".to_string() => Operand::Int(10),
        };
        assert!(is_operator_object(&ops));

        let plain: IndexMap<String, Operand> = indexmap! {
            "street".to_string() => Operand::Str("Main St".into()),
        };
        assert!(!is_operator_object(&plain));

        let empty: IndexMap<String, Operand> = IndexMap::new();
        assert!(!is_operator_object(&empty));
    }
}
