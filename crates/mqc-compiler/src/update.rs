//! Update expression builder (spec §4.8): fold `$set`/`$inc` into a chain of
//! `jsonb_set_lax` calls starting from the bare column name.

use indexmap::IndexMap;
use mqc_core::quoting::{jsonb_path_literal, split_dotted_path};
use mqc_core::{AccessPath, Operand};

use crate::params::{Param, Params};

/// The subset of MongoDB update operators this compiler supports, in the
/// order they're applied: every `$set` entry, then every `$inc` entry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateOps {
    pub set: IndexMap<String, Operand>,
    pub inc: IndexMap<String, Operand>,
}

impl UpdateOps {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.set.is_empty() && self.inc.is_empty()
    }
}

fn path_literal(path: &str) -> String {
    let segments = split_dotted_path(path)
        .into_iter()
        .map(str::to_string)
        .collect::<Vec<_>>();
    jsonb_path_literal(&segments)
}

/// Build the `SET <column> = <expr>` right-hand side against `column`,
/// returning `None` if no supported operator was applied (the model layer
/// falls back to a plain COUNT in that case).
#[must_use]
pub fn build_update_expr(ops: &UpdateOps, column: &str) -> Option<(String, Vec<Param>)> {
    if ops.is_empty() {
        return None;
    }

    let mut params = Params::new();
    let mut expr = column.to_string();
    let mut applied = false;

    for (path, value) in &ops.set {
        applied = true;
        let idx = params.push(Param::Json(value.to_json()));
        let pathlit = path_literal(path);
        expr = format!("jsonb_set_lax({expr}::jsonb, {pathlit}, ${idx}::jsonb, true)");
    }

    for (path, value) in &ops.inc {
        if !value.is_number() {
            tracing::warn!(path = %path, "skipping $inc on non-numeric operand");
            continue;
        }
        applied = true;
        let textaccess = AccessPath::build(column, path).jsonpath;
        let idx = params.push(Param::from(value));
        let pathlit = path_literal(path);
        expr = format!(
            "jsonb_set_lax({expr}::jsonb, {pathlit}, to_jsonb(COALESCE(({textaccess})::numeric, 0) + ${idx}::numeric), true)"
        );
    }

    if applied {
        Some((expr, params.into_vec()))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::indexmap;

    #[test]
    fn empty_ops_yield_none() {
        assert_eq!(build_update_expr(&UpdateOps::default(), "data"), None);
    }

    #[test]
    fn set_and_inc_fold_left_to_right() {
        let ops = UpdateOps {
            set: indexmap! {
                "wallet".to_string() => Operand::Int(15),
                "profile.level".to_string() => Operand::Int(5),
            },
            inc: indexmap! {
                "loginCount".to_string() => Operand::Int(1),
            },
        };
        let (expr, params) = build_update_expr(&ops, "data").unwrap();
        assert_eq!(
            expr,
            "jsonb_set_lax(jsonb_set_lax(jsonb_set_lax(data::jsonb, '{\"wallet\"}', $1::jsonb, true)::jsonb, '{\"profile\",\"level\"}', $2::jsonb, true)::jsonb, '{\"loginCount\"}', to_jsonb(COALESCE((data->'loginCount')::numeric, 0) + $3::numeric), true)"
        );
        assert_eq!(
            params,
            vec![
                Param::Json(serde_json::json!(15)),
                Param::Json(serde_json::json!(5)),
                Param::Integer(1),
            ]
        );
    }

    #[test]
    fn inc_skips_non_numeric_operand() {
        let ops = UpdateOps {
            set: IndexMap::new(),
            inc: indexmap! {
                "tags".to_string() => Operand::Str("oops".into()),
            },
        };
        assert_eq!(build_update_expr(&ops, "data"), None);
    }
}
