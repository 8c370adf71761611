//! Recursive-descent compiler from MongoDB-shaped query/update documents to
//! parameterized JSONB SQL, targeting a single `JSONB` column per table.
//!
//! The compiler is a pure function of `(query, update?, options)`: no I/O,
//! no shared mutable state, nothing `async`. `mqc-model` is the consumer
//! that turns its output into executed statements.

pub mod assemble;
pub mod document;
pub mod elem_match;
pub mod equality;
pub mod logical;
pub mod operators;
pub mod params;
pub mod renumber;
pub mod update;

pub use assemble::{
    build_count, build_delete, build_select, build_soft_delete, build_update,
    build_update_statement, build_where, SelectOptions, SortSpec,
};
pub use document::QueryDocument;
pub use params::{Param, Params};
pub use renumber::renumber_placeholders;
pub use update::UpdateOps;

#[cfg(test)]
mod end_to_end_tests {
    use indexmap::indexmap;
    use mqc_core::Operand;

    use super::*;

    #[test]
    fn scenario_two_in_and_nin_of_strings() {
        let query: QueryDocument = indexmap! {
            "status".to_string() => Operand::Object(indexmap! {
                "$in".to_string() => Operand::Array(vec![
                    Operand::Str("active".into()),
                    Operand::Str("pending".into()),
                ]),
            }),
            "category".to_string() => Operand::Object(indexmap! {
                "$nin".to_string() => Operand::Array(vec![
                    Operand::Str("archived".into()),
                    Operand::Str("deleted".into()),
                ]),
            }),
        };
        let (sql, params) = build_select("items", &query, &SelectOptions::default()).unwrap();
        assert_eq!(
            sql,
            "SELECT \"data\" FROM \"items\" WHERE data->>'status' = ANY($1) AND data->>'category' != ALL($2)"
        );
        assert_eq!(
            params,
            vec![
                Param::TextArray(vec!["active".into(), "pending".into()]),
                Param::TextArray(vec!["archived".into(), "deleted".into()]),
            ]
        );
    }

    #[test]
    fn scenario_three_in_mixed_dynamic_types() {
        let query: QueryDocument = indexmap! {
            "values".to_string() => Operand::Object(indexmap! {
                "$in".to_string() => Operand::Array(vec![
                    Operand::Int(1),
                    Operand::Str("two".into()),
                    Operand::Null,
                    Operand::Float(3.0),
                ]),
            }),
        };
        let (sql, params) = build_select("mixed", &query, &SelectOptions::default()).unwrap();
        assert_eq!(
            sql,
            "SELECT \"data\" FROM \"mixed\" WHERE (((data->>'values')::integer = ANY($1) OR (data->>'values')::numeric = ANY($2) OR data->>'values' = ANY($3)) OR (data->'values' IS NULL OR data->'values' = 'null'::jsonb))"
        );
        assert_eq!(
            params,
            vec![
                Param::IntegerArray(vec![1]),
                Param::NumericArray(vec![3.0]),
                Param::TextArray(vec!["two".into()]),
            ]
        );
    }

    #[test]
    fn scenario_four_elem_match_object_mode() {
        let query: QueryDocument = indexmap! {
            "items".to_string() => Operand::Object(indexmap! {
                "$elemMatch".to_string() => Operand::Object(indexmap! {
                    "product".to_string() => Operand::Str("apple".into()),
                    "quantity".to_string() => Operand::Object(indexmap! {
                        "$gte".to_string() => Operand::Int(5),
                    }),
                }),
            }),
        };
        let (sql, params) = build_select("orders", &query, &SelectOptions::default()).unwrap();
        assert_eq!(
            sql,
            "SELECT \"data\" FROM \"orders\" WHERE EXISTS (SELECT 1 FROM jsonb_array_elements(data->'items') as elem WHERE elem->>'product' = $1 AND (elem->>'quantity')::numeric >= 5)"
        );
        assert_eq!(params, vec![Param::Text("apple".into())]);
    }

    #[test]
    fn invariant_placeholder_count_matches_param_count() {
        let query: QueryDocument = indexmap! {
            "a".to_string() => Operand::Int(1),
            "b".to_string() => Operand::Str("x".into()),
            "c".to_string() => Operand::Object(indexmap! {
                "$in".to_string() => Operand::Array(vec![Operand::Int(1), Operand::Int(2)]),
            }),
        };
        let (sql, params) = build_select("t", &query, &SelectOptions::default()).unwrap();
        let placeholders: std::collections::BTreeSet<usize> = (1..=params.len()).collect();
        let found: std::collections::BTreeSet<usize> = regex::Regex::new(r"\$(\d+)")
            .unwrap()
            .captures_iter(&sql)
            .map(|c| c[1].parse().unwrap())
            .collect();
        assert_eq!(placeholders, found);
    }

    #[test]
    fn sort_and_limit_offset_render() {
        let query = QueryDocument::new();
        let opts = SelectOptions {
            sort: Some(indexmap! { "createdAt".to_string() => -1, "name".to_string() => 1 }),
            limit: Some(10),
            offset: Some(20),
            ..Default::default()
        };
        let (sql, _) = build_select("users", &query, &opts).unwrap();
        assert_eq!(
            sql,
            "SELECT \"data\" FROM \"users\" ORDER BY data->>'createdAt' DESC, data->>'name' ASC LIMIT 10 OFFSET 20"
        );
    }
}
