//! Field operator dispatch (spec §4.3): the `{$op: v, ...}` operator-object
//! table, plus the single-operator implementations it fans out to.
//!
//! Grounded on `octofhir_search::filter::FilterOp` / `build_condition` for
//! the dispatch-table shape, adapted from FHIR's fixed operator set to
//! MongoDB's.

use indexmap::IndexMap;
use mqc_core::{AccessPath, Fragment, MqcError, Operand, OperandGroups};

use crate::equality::{equality_condition, ne_condition};
use crate::params::{Param, Params};

/// Compile a single field's value: an operator object dispatches through
/// [`compile_operator_object`], anything else compiles as a bare equality
/// condition (§4.2).
pub fn compile_field(
    value: &Operand,
    access: &AccessPath,
    params: &mut Params,
) -> Result<Fragment, MqcError> {
    match value.as_object() {
        Some(map) if crate::document::is_operator_object(map) => {
            compile_operator_object(map, access, params)
        }
        _ => Ok(equality_condition(access, value, params)),
    }
}

/// Compile an operator object (every key `$`-prefixed, at least one key) at
/// `access`. `$options` is consumed only as a sibling fallback for
/// `$regex`, never compiled as its own clause.
pub fn compile_operator_object(
    map: &IndexMap<String, Operand>,
    access: &AccessPath,
    params: &mut Params,
) -> Result<Fragment, MqcError> {
    let options = map.get("$options").and_then(Operand::as_str);
    let mut children = Vec::with_capacity(map.len());
    for (op, operand) in map {
        if op == "$options" {
            continue;
        }
        children.push(compile_operator(op, operand, options, access, params)?);
    }
    Ok(Fragment::and_all(children))
}

/// Compile a single `(operator, operand)` pair to a [`Fragment`]. `options`
/// is `$regex`'s sibling `$options`, if present.
pub fn compile_operator(
    op: &str,
    operand: &Operand,
    options: Option<&str>,
    access: &AccessPath,
    params: &mut Params,
) -> Result<Fragment, MqcError> {
    match op {
        "$eq" => Ok(equality_condition(access, operand, params)),
        "$ne" => Ok(ne_condition(access, operand, params)),
        "$gt" => cmp_operator(access, operand, ">"),
        "$gte" => cmp_operator(access, operand, ">="),
        "$lt" => cmp_operator(access, operand, "<"),
        "$lte" => cmp_operator(access, operand, "<="),
        "$in" => Ok(in_operator(access, operand, params)),
        "$nin" => Ok(nin_operator(access, operand, params)),
        "$exists" => Ok(exists_operator(access, operand)),
        "$regex" => Ok(regex_operator(access, operand, options)),
        "$mod" => Ok(mod_operator(access, operand)),
        "$size" => Ok(size_operator(access, operand)),
        "$all" => Ok(all_operator(access, operand)),
        "$elemMatch" => crate::elem_match::compile(access, operand, params),
        "$type" => Ok(type_operator(access, operand)),
        "$not" => not_operator(access, operand, params),
        "$search" => Ok(Fragment::Empty),
        "$where" => Err(MqcError::WhereOperatorUnsupported),
        other => {
            tracing::warn!(operator = %other, "skipping unsupported field operator");
            Ok(Fragment::Empty)
        }
    }
}

fn cmp_operator(access: &AccessPath, operand: &Operand, op: &str) -> Result<Fragment, MqcError> {
    let literal = inline_literal(operand).ok_or_else(|| {
        MqcError::invalid_operand(op, "expected a string, number, or boolean operand")
    })?;
    Ok(if operand.is_number() {
        Fragment::sql(format!("({})::numeric {op} {literal}", access.accesspath))
    } else {
        Fragment::sql(format!("{} {op} {literal}", access.accesspath))
    })
}

fn inline_literal(operand: &Operand) -> Option<String> {
    match operand {
        Operand::Str(s) => Some(mqc_core::quoting::quote_literal(s)),
        Operand::Bool(b) => Some(b.to_string()),
        Operand::Int(_) | Operand::Float(_) => operand.numeric_literal(),
        _ => None,
    }
}

fn in_operator(access: &AccessPath, operand: &Operand, params: &mut Params) -> Fragment {
    let Some(items) = operand.as_array() else {
        tracing::warn!("$in operand was not an array, treating as no match");
        return Fragment::False;
    };
    if items.is_empty() {
        return Fragment::False;
    }
    let groups = OperandGroups::partition(items);
    let mut disjuncts = Vec::new();
    if !groups.integers.is_empty() {
        let idx = params.push(Param::IntegerArray(groups.integers));
        disjuncts.push(format!("({})::integer = ANY(${idx})", access.accesspath));
    }
    if !groups.numbers.is_empty() {
        let idx = params.push(Param::NumericArray(groups.numbers));
        disjuncts.push(format!("({})::numeric = ANY(${idx})", access.accesspath));
    }
    if !groups.booleans.is_empty() {
        let idx = params.push(Param::BooleanArray(groups.booleans));
        disjuncts.push(format!("({})::boolean = ANY(${idx})", access.accesspath));
    }
    if !groups.strings.is_empty() {
        let idx = params.push(Param::TextArray(groups.strings));
        disjuncts.push(format!("{} = ANY(${idx})", access.accesspath));
    }
    if !groups.objects.is_empty() {
        let idx = params.push(Param::JsonArray(groups.objects));
        disjuncts.push(format!("{}::jsonb = ANY(${idx}::jsonb[])", access.jsonpath));
    }

    let body = join(disjuncts, "OR");
    let null_check = format!(
        "({j} IS NULL OR {j} = 'null'::jsonb)",
        j = access.jsonpath
    );
    match (body, groups.had_null) {
        (Some(b), true) => Fragment::sql(format!("({b} OR {null_check})")),
        (Some(b), false) => Fragment::sql(b),
        (None, true) => Fragment::sql(null_check),
        (None, false) => Fragment::False,
    }
}

fn nin_operator(access: &AccessPath, operand: &Operand, params: &mut Params) -> Fragment {
    let Some(items) = operand.as_array() else {
        tracing::warn!("$nin operand was not an array, treating as match-all");
        return Fragment::True;
    };
    if items.is_empty() {
        return Fragment::True;
    }
    let groups = OperandGroups::partition(items);
    let mut conjuncts = Vec::new();
    if !groups.integers.is_empty() {
        let idx = params.push(Param::IntegerArray(groups.integers));
        conjuncts.push(format!("({})::integer != ALL(${idx})", access.accesspath));
    }
    if !groups.numbers.is_empty() {
        let idx = params.push(Param::NumericArray(groups.numbers));
        conjuncts.push(format!("({})::numeric != ALL(${idx})", access.accesspath));
    }
    if !groups.booleans.is_empty() {
        let idx = params.push(Param::BooleanArray(groups.booleans));
        conjuncts.push(format!("({})::boolean != ALL(${idx})", access.accesspath));
    }
    if !groups.strings.is_empty() {
        let idx = params.push(Param::TextArray(groups.strings));
        conjuncts.push(format!("{} != ALL(${idx})", access.accesspath));
    }
    if !groups.objects.is_empty() {
        let idx = params.push(Param::JsonArray(groups.objects));
        conjuncts.push(format!(
            "{}::jsonb != ALL(${idx}::jsonb[])",
            access.jsonpath
        ));
    }

    let body = join(conjuncts, "AND");
    let not_null_check = format!(
        "({j} IS NOT NULL AND {j} != 'null'::jsonb)",
        j = access.jsonpath
    );
    match (body, groups.had_null) {
        (Some(b), true) => Fragment::sql(format!("({b} AND {not_null_check})")),
        (Some(b), false) => Fragment::sql(b),
        (None, true) => Fragment::sql(not_null_check),
        (None, false) => Fragment::True,
    }
}

fn join(parts: Vec<String>, sep: &str) -> Option<String> {
    match parts.len() {
        0 => None,
        1 => Some(parts.into_iter().next().unwrap()),
        _ => Some(format!("({})", parts.join(&format!(" {sep} ")))),
    }
}

fn exists_operator(access: &AccessPath, operand: &Operand) -> Fragment {
    if operand.is_truthy() {
        Fragment::sql(format!("{} IS NOT NULL", access.jsonpath))
    } else {
        Fragment::sql(format!("{} IS NULL", access.jsonpath))
    }
}

fn regex_operator(access: &AccessPath, operand: &Operand, options: Option<&str>) -> Fragment {
    let Some((pattern, local_flags)) = parse_regex_operand(operand) else {
        tracing::warn!("$regex operand had an unrecognized shape");
        return Fragment::False;
    };
    let flags = if !local_flags.is_empty() {
        local_flags
    } else {
        options.unwrap_or_default().to_string()
    };
    let op = if flags.contains('i') { "~*" } else { "~" };
    Fragment::sql(format!(
        "{} {op} {}",
        access.accesspath,
        mqc_core::quoting::quote_literal(&pattern)
    ))
}

fn parse_regex_operand(operand: &Operand) -> Option<(String, String)> {
    match operand {
        Operand::Array(items) if items.len() == 2 => {
            let pattern = items[0].as_str()?.to_string();
            let flags = items[1].as_str()?.to_string();
            Some((pattern, flags))
        }
        Operand::Str(s) => {
            if let Some(rest) = s.strip_prefix('/') {
                if let Some(close) = rest.rfind('/') {
                    let pattern = rest[..close].to_string();
                    let flags = rest[close + 1..].to_string();
                    return Some((pattern, flags));
                }
            }
            Some((s.clone(), String::new()))
        }
        _ => None,
    }
}

fn mod_operator(access: &AccessPath, operand: &Operand) -> Fragment {
    let Some((divisor, remainder)) = operand.as_number_pair() else {
        tracing::warn!("$mod operand was not a [number, number] pair");
        return Fragment::False;
    };
    let (Some(d), Some(r)) = (divisor.numeric_literal(), remainder.numeric_literal()) else {
        return Fragment::False;
    };
    Fragment::sql(format!("({})::numeric % {d} = {r}", access.accesspath))
}

fn size_operator(access: &AccessPath, operand: &Operand) -> Fragment {
    let Some(n) = operand.as_non_negative_i64() else {
        tracing::warn!("$size operand was not a non-negative integer");
        return Fragment::False;
    };
    Fragment::sql(format!(
        "(jsonb_typeof({j}) = 'array' AND jsonb_array_length({j}) = {n})",
        j = access.jsonpath
    ))
}

fn all_operator(access: &AccessPath, operand: &Operand) -> Fragment {
    let Some(items) = operand.as_array() else {
        tracing::warn!("$all operand was not an array");
        return Fragment::False;
    };
    if items.is_empty() {
        return Fragment::True;
    }
    let json = Operand::Array(items.to_vec()).to_json();
    let literal = serde_json::to_string(&json).unwrap_or_else(|_| "[]".to_string());
    Fragment::sql(format!(
        "{} @> {}::jsonb",
        access.jsonpath,
        mqc_core::quoting::quote_literal(&literal)
    ))
}

const JSONB_TYPE_NAMES: &[&str] = &["string", "number", "boolean", "array", "object", "null"];

fn type_operator(access: &AccessPath, operand: &Operand) -> Fragment {
    let Some(name) = operand.as_str() else {
        tracing::warn!("$type operand was not a string");
        return Fragment::False;
    };
    if !JSONB_TYPE_NAMES.contains(&name) {
        tracing::warn!(type_name = %name, "$type named an unrecognized JSONB type");
        return Fragment::False;
    }
    Fragment::sql(format!(
        "jsonb_typeof({}) = {}",
        access.jsonpath,
        mqc_core::quoting::quote_literal(name)
    ))
}

fn not_operator(
    access: &AccessPath,
    operand: &Operand,
    params: &mut Params,
) -> Result<Fragment, MqcError> {
    let inner = match operand.as_object() {
        Some(map) if crate::document::is_operator_object(map) => {
            compile_operator_object(map, access, params)?
        }
        _ => equality_condition(access, operand, params),
    };
    Ok(inner.negate())
}
