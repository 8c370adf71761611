//! Statement assembler (spec §4.7): the three pure primitives the model
//! layer consumes (§6 — `build_select`, `build_where`, `build_update`) plus
//! the full-statement helpers (`COUNT`, hard/soft `DELETE`, the renumbered
//! `UPDATE`) built on top of them.

use indexmap::IndexMap;
use mqc_core::quoting::quote_ident;
use mqc_core::{AccessPath, Fragment, MqcError};

use crate::document::QueryDocument;
use crate::logical::compile_document;
use crate::params::{Param, Params};
use crate::renumber::renumber_placeholders;
use crate::update::UpdateOps;

const DEFAULT_JSON_FIELD: &str = "data";

/// Sort direction: `+1` ascending, `-1` descending, matching the model
/// layer's Mongo-style `sort` option.
pub type SortSpec = IndexMap<String, i32>;

#[derive(Debug, Clone, Default)]
pub struct SelectOptions {
    pub json_field: Option<String>,
    pub schema: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    pub sort: Option<SortSpec>,
}

fn json_field(field: Option<&str>) -> &str {
    field.unwrap_or(DEFAULT_JSON_FIELD)
}

fn qualified_table(schema: Option<&str>, table: &str) -> String {
    match schema {
        Some(schema) => format!("{}.{}", quote_ident(schema), quote_ident(table)),
        None => quote_ident(table),
    }
}

fn where_clause(frag: &Fragment) -> String {
    match frag {
        Fragment::Empty => String::new(),
        Fragment::True => " WHERE TRUE".to_string(),
        Fragment::False => " WHERE FALSE".to_string(),
        Fragment::Sql(s) => format!(" WHERE {s}"),
    }
}

/// `build_where(query, json_field?) -> (sql_with_WHERE_prefix_or_empty, params)`.
pub fn build_where(
    query: &QueryDocument,
    field: Option<&str>,
) -> Result<(String, Vec<Param>), MqcError> {
    let mut params = Params::new();
    let frag = compile_document(query, json_field(field), &mut params)?;
    Ok((where_clause(&frag).trim_start().to_string(), params.into_vec()))
}

/// `build_select(table, query, opts) -> (sql, params)`.
pub fn build_select(
    table: &str,
    query: &QueryDocument,
    opts: &SelectOptions,
) -> Result<(String, Vec<Param>), MqcError> {
    let column = json_field(opts.json_field.as_deref());
    let mut params = Params::new();
    let frag = compile_document(query, column, &mut params)?;

    let mut sql = format!(
        "SELECT {} FROM {}",
        quote_ident(column),
        qualified_table(opts.schema.as_deref(), table)
    );
    sql.push_str(&where_clause(&frag));

    if let Some(sort) = opts.sort.as_ref().filter(|s| !s.is_empty()) {
        let order = sort
            .iter()
            .map(|(path, dir)| {
                let access = AccessPath::build(column, path);
                let direction = if *dir < 0 { "DESC" } else { "ASC" };
                format!("{} {direction}", access.accesspath)
            })
            .collect::<Vec<_>>()
            .join(", ");
        sql.push_str(" ORDER BY ");
        sql.push_str(&order);
    }

    if let Some(limit) = opts.limit {
        if limit < 0 {
            return Err(MqcError::negative_integer("limit", limit));
        }
        sql.push_str(&format!(" LIMIT {limit}"));
    }
    if let Some(offset) = opts.offset {
        if offset < 0 {
            return Err(MqcError::negative_integer("offset", offset));
        }
        sql.push_str(&format!(" OFFSET {offset}"));
    }

    Ok((sql, params.into_vec()))
}

/// `build_update(update_ops, json_field?) -> Option<(expr, params)>`.
#[must_use]
pub fn build_update(ops: &UpdateOps, field: Option<&str>) -> Option<(String, Vec<Param>)> {
    crate::update::build_update_expr(ops, json_field(field))
}

/// `SELECT COUNT(*) AS count FROM "<table>" [WHERE ...]`.
pub fn build_count(
    table: &str,
    query: &QueryDocument,
    field: Option<&str>,
) -> Result<(String, Vec<Param>), MqcError> {
    let mut params = Params::new();
    let frag = compile_document(query, json_field(field), &mut params)?;
    let mut sql = format!("SELECT COUNT(*) AS count FROM {}", quote_ident(table));
    sql.push_str(&where_clause(&frag));
    Ok((sql, params.into_vec()))
}

/// Hard `DELETE FROM "<table>" WHERE ...`. Refuses an empty filter — a
/// destructive statement must never be issued against every row by
/// accident.
pub fn build_delete(
    table: &str,
    query: &QueryDocument,
    field: Option<&str>,
) -> Result<(String, Vec<Param>), MqcError> {
    let mut params = Params::new();
    let frag = compile_document(query, json_field(field), &mut params)?;
    if matches!(frag, Fragment::Empty | Fragment::True) {
        return Err(MqcError::EmptyDestructiveFilter);
    }
    let sql = format!(
        "DELETE FROM {}{}",
        quote_ident(table),
        where_clause(&frag)
    );
    Ok((sql, params.into_vec()))
}

/// Soft delete: stamp `_deletedAt` instead of removing the row.
/// `deleted_at_millis` is the caller-supplied timestamp (milliseconds since
/// epoch), appended as the final parameter after the WHERE parameters.
pub fn build_soft_delete(
    table: &str,
    query: &QueryDocument,
    field: Option<&str>,
    deleted_at_millis: f64,
) -> Result<(String, Vec<Param>), MqcError> {
    let column = json_field(field);
    let mut params = Params::new();
    let frag = compile_document(query, column, &mut params)?;
    if matches!(frag, Fragment::Empty | Fragment::True) {
        return Err(MqcError::EmptyDestructiveFilter);
    }
    let idx = params.push(Param::Numeric(deleted_at_millis));
    let quoted_column = quote_ident(column);
    let sql = format!(
        "UPDATE {} SET {quoted_column} = jsonb_set({quoted_column}, '{{_deletedAt}}', to_jsonb(${idx}::numeric)){}",
        quote_ident(table),
        where_clause(&frag),
    );
    Ok((sql, params.into_vec()))
}

/// Full `UPDATE "<table>" SET <json> = <expr> WHERE <frag>`: compiles the
/// WHERE fragment and the SET expression with independent parameter
/// vectors, renumbers the SET expression's placeholders past the WHERE
/// vector's length, and concatenates `P_w ++ P_u`. Returns `None` if `ops`
/// had no effect; refuses an empty filter.
pub fn build_update_statement(
    table: &str,
    query: &QueryDocument,
    ops: &UpdateOps,
    field: Option<&str>,
) -> Result<Option<(String, Vec<Param>)>, MqcError> {
    let column = json_field(field);
    let mut where_params = Params::new();
    let frag = compile_document(query, column, &mut where_params)?;
    if matches!(frag, Fragment::Empty | Fragment::True) {
        return Err(MqcError::EmptyDestructiveFilter);
    }

    let Some((set_expr, set_params)) = crate::update::build_update_expr(ops, column) else {
        return Ok(None);
    };

    let offset = where_params.len();
    let renumbered = renumber_placeholders(&set_expr, offset);

    let sql = format!(
        "UPDATE {} SET {} = {}{}",
        quote_ident(table),
        quote_ident(column),
        renumbered,
        where_clause(&frag)
    );

    let mut params = where_params.into_vec();
    params.extend(set_params);
    Ok(Some((sql, params)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::indexmap;
    use mqc_core::Operand;

    #[test]
    fn empty_document_yields_no_where_and_no_params() {
        let query = QueryDocument::new();
        let (sql, params) = build_select("users", &query, &SelectOptions::default()).unwrap();
        assert_eq!(sql, "SELECT \"data\" FROM \"users\"");
        assert!(params.is_empty());
    }

    #[test]
    fn scenario_one_two_field_equality() {
        let query: QueryDocument = indexmap! {
            "name".to_string() => Operand::Str("John Doe".into()),
            "age".to_string() => Operand::Int(30),
        };
        let (sql, params) = build_select("users", &query, &SelectOptions::default()).unwrap();
        assert_eq!(
            sql,
            "SELECT \"data\" FROM \"users\" WHERE data->>'name' = $1 AND (data->>'age')::integer = $2"
        );
        assert_eq!(params, vec![Param::Text("John Doe".into()), Param::Integer(30)]);
    }

    #[test]
    fn scenario_five_nested_path() {
        let query: QueryDocument = indexmap! {
            "metadata.user.address.country".to_string() => Operand::Str("CA".into()),
        };
        let (sql, params) = build_select("events", &query, &SelectOptions::default()).unwrap();
        assert_eq!(
            sql,
            "SELECT \"data\" FROM \"events\" WHERE data->'metadata'->'user'->'address'->>'country' = $1"
        );
        assert_eq!(params, vec![Param::Text("CA".into())]);
    }

    #[test]
    fn scenario_six_update_renumbers_past_where() {
        let filter: QueryDocument = indexmap! {
            "email".to_string() => Operand::Str("x@y".into()),
        };
        let ops = UpdateOps {
            set: indexmap! {
                "wallet".to_string() => Operand::Int(15),
                "profile.level".to_string() => Operand::Int(5),
            },
            inc: indexmap! {
                "loginCount".to_string() => Operand::Int(1),
            },
        };
        let (sql, params) = build_update_statement("users", &filter, &ops, None)
            .unwrap()
            .unwrap();
        assert_eq!(
            sql,
            "UPDATE \"users\" SET \"data\" = jsonb_set_lax(jsonb_set_lax(jsonb_set_lax(data::jsonb, '{\"wallet\"}', $2::jsonb, true)::jsonb, '{\"profile\",\"level\"}', $3::jsonb, true)::jsonb, '{\"loginCount\"}', to_jsonb(COALESCE((data->'loginCount')::numeric, 0) + $4::numeric), true) WHERE data->>'email' = $1"
        );
        assert_eq!(
            params,
            vec![
                Param::Text("x@y".into()),
                Param::Json(serde_json::json!(15)),
                Param::Json(serde_json::json!(5)),
                Param::Integer(1),
            ]
        );
    }

    #[test]
    fn delete_refuses_empty_filter() {
        let query = QueryDocument::new();
        let err = build_delete("users", &query, None);
        assert!(matches!(err, Err(MqcError::EmptyDestructiveFilter)));
    }

    #[test]
    fn update_statement_refuses_empty_filter() {
        let query = QueryDocument::new();
        let ops = UpdateOps {
            set: indexmap! { "wallet".to_string() => Operand::Int(1) },
            inc: IndexMap::new(),
        };
        let err = build_update_statement("users", &query, &ops, None);
        assert!(matches!(err, Err(MqcError::EmptyDestructiveFilter)));
    }

    #[test]
    fn update_statement_with_no_ops_is_none() {
        let filter: QueryDocument = indexmap! {
            "email".to_string() => Operand::Str("x@y".into()),
        };
        let result = build_update_statement("users", &filter, &UpdateOps::default(), None).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn count_builds_where_and_select_count() {
        let query: QueryDocument = indexmap! {
            "status".to_string() => Operand::Str("active".into()),
        };
        let (sql, params) = build_count("items", &query, None).unwrap();
        assert_eq!(
            sql,
            "SELECT COUNT(*) AS count FROM \"items\" WHERE data->>'status' = $1"
        );
        assert_eq!(params, vec![Param::Text("active".into())]);
    }
}
