//! `$elemMatch` (spec §4.5): primitive-mode (every key an operator, none
//! logical) vs object-mode (anything else) array-element expansion.

use mqc_core::{AccessPath, Fragment, MqcError, Operand};

use crate::document::{is_operator_object, QueryDocument};
use crate::logical::{compile_document, is_logical_key};
use crate::params::Params;

pub fn compile(
    access: &AccessPath,
    operand: &Operand,
    params: &mut Params,
) -> Result<Fragment, MqcError> {
    let map = operand
        .as_object()
        .ok_or_else(|| MqcError::invalid_operand("$elemMatch", "expected an object operand"))?;

    let primitive_mode = is_operator_object(map) && !map.keys().any(|k| is_logical_key(k));

    let (function, alias, inner) = if primitive_mode {
        (
            "jsonb_array_elements_text",
            "elem_val",
            compile_primitive(map, params)?,
        )
    } else {
        let doc: QueryDocument = map.clone();
        (
            "jsonb_array_elements",
            "elem",
            compile_document(&doc, "elem", params)?,
        )
    };

    let jsonpath = &access.jsonpath;
    Ok(match inner {
        Fragment::Empty | Fragment::True => Fragment::sql(format!(
            "({j} IS NOT NULL AND jsonb_typeof({j}) = 'array' AND jsonb_array_length({j}) > 0)",
            j = jsonpath
        )),
        other => Fragment::sql(format!(
            "EXISTS (SELECT 1 FROM {function}({jsonpath}) as {alias} WHERE {})",
            other.render_or_true()
        )),
    })
}

/// Primitive mode applies its single operator to the text-extracted
/// element directly (`elem_val`). `jsonb_array_elements_text` discards
/// JSONB-null structure, so `$exists` and a null-sensitive `$eq`/`$ne`
/// against this pseudo-path are not meaningful — reject them instead of
/// silently compiling a clause that can never match.
fn compile_primitive(
    map: &indexmap::IndexMap<String, Operand>,
    params: &mut Params,
) -> Result<Fragment, MqcError> {
    let pseudo = AccessPath {
        jsonpath: "elem_val".to_string(),
        accesspath: "elem_val".to_string(),
    };
    let options = map.get("$options").and_then(Operand::as_str);
    let mut children = Vec::with_capacity(map.len());
    for (op, value) in map {
        if op == "$options" {
            continue;
        }
        if op == "$exists" {
            return Err(MqcError::elem_match_primitive_operator_unsupported("$exists"));
        }
        if (op == "$eq" || op == "$ne") && (value.is_null() || value.is_undefined()) {
            return Err(MqcError::elem_match_primitive_operator_unsupported(op));
        }
        children.push(crate::operators::compile_operator(
            op, value, options, &pseudo, params,
        )?);
    }
    Ok(Fragment::and_all(children))
}
