//! Equality condition (spec §4.2): the shape a bare field value compiles to,
//! and the one `$eq` falls back to for everything except `undefined`.

use mqc_core::{AccessPath, Fragment, Operand};

use crate::params::{Param, Params};

#[must_use]
pub fn equality_condition(access: &AccessPath, value: &Operand, params: &mut Params) -> Fragment {
    match value {
        Operand::Undefined => Fragment::sql(format!("{} IS NULL", access.jsonpath)),
        Operand::Null => Fragment::sql(format!(
            "({j} IS NULL OR {j} = 'null'::jsonb)",
            j = access.jsonpath
        )),
        Operand::Object(m) if m.is_empty() => {
            Fragment::sql(format!("{}::jsonb = '{{}}'::jsonb", access.jsonpath))
        }
        Operand::Array(_) => {
            let idx = params.push(Param::from(value));
            Fragment::sql(format!("{}::jsonb = ${idx}::jsonb", access.jsonpath))
        }
        Operand::Bool(_) => {
            let idx = params.push(Param::from(value));
            Fragment::sql(format!("({})::boolean = ${idx}", access.accesspath))
        }
        Operand::Int(_) | Operand::Float(_) => {
            let cast = if value.is_whole_number() {
                "integer"
            } else {
                "numeric"
            };
            let idx = params.push(Param::from(value));
            Fragment::sql(format!("({})::{cast} = ${idx}", access.accesspath))
        }
        _ => {
            let idx = params.push(Param::from(value));
            Fragment::sql(format!("{} = ${idx}", access.accesspath))
        }
    }
}

/// Negated equality, used by `$ne`.
#[must_use]
pub fn ne_condition(access: &AccessPath, value: &Operand, params: &mut Params) -> Fragment {
    match value {
        Operand::Undefined => Fragment::sql(format!("{} IS NOT NULL", access.jsonpath)),
        Operand::Null => Fragment::sql(format!(
            "({j} IS NOT NULL AND {j} != 'null'::jsonb)",
            j = access.jsonpath
        )),
        Operand::Object(m) if m.is_empty() => {
            Fragment::sql(format!("{}::jsonb != '{{}}'::jsonb", access.jsonpath))
        }
        Operand::Array(_) => {
            let idx = params.push(Param::from(value));
            Fragment::sql(format!("{}::jsonb != ${idx}::jsonb", access.jsonpath))
        }
        Operand::Bool(_) => {
            let idx = params.push(Param::from(value));
            Fragment::sql(format!(
                "({})::boolean IS DISTINCT FROM ${idx}",
                access.accesspath
            ))
        }
        Operand::Int(_) | Operand::Float(_) => {
            let cast = if value.is_whole_number() {
                "integer"
            } else {
                "numeric"
            };
            let idx = params.push(Param::from(value));
            Fragment::sql(format!(
                "({})::{cast} IS DISTINCT FROM ${idx}",
                access.accesspath
            ))
        }
        _ => {
            let idx = params.push(Param::from(value));
            Fragment::sql(format!("{} != ${idx}", access.accesspath))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_equality_parameterizes() {
        let access = AccessPath::build("data", "name");
        let mut params = Params::new();
        let frag = equality_condition(&access, &Operand::Str("John Doe".into()), &mut params);
        assert_eq!(frag, Fragment::sql("data->>'name' = $1"));
        assert_eq!(params.len(), 1);
    }

    #[test]
    fn integer_equality_casts_integer() {
        let access = AccessPath::build("data", "age");
        let mut params = Params::new();
        let frag = equality_condition(&access, &Operand::Int(30), &mut params);
        assert_eq!(frag, Fragment::sql("(data->>'age')::integer = $1"));
    }

    #[test]
    fn fractional_equality_casts_numeric() {
        let access = AccessPath::build("data", "price");
        let mut params = Params::new();
        let frag = equality_condition(&access, &Operand::Float(19.99), &mut params);
        assert_eq!(frag, Fragment::sql("(data->>'price')::numeric = $1"));
    }

    #[test]
    fn null_equality_has_no_parameter() {
        let access = AccessPath::build("data", "deletedAt");
        let mut params = Params::new();
        let frag = equality_condition(&access, &Operand::Null, &mut params);
        assert_eq!(
            frag,
            Fragment::sql("(data->'deletedAt' IS NULL OR data->'deletedAt' = 'null'::jsonb)")
        );
        assert!(params.is_empty());
    }

    #[test]
    fn empty_object_equality_has_no_parameter() {
        let access = AccessPath::build("data", "settings");
        let mut params = Params::new();
        let frag = equality_condition(&access, &Operand::Object(Default::default()), &mut params);
        assert_eq!(
            frag,
            Fragment::sql("data->'settings'::jsonb = '{}'::jsonb")
        );
        assert!(params.is_empty());
    }

    #[test]
    fn ne_boolean_uses_is_distinct_from() {
        let access = AccessPath::build("data", "active");
        let mut params = Params::new();
        let frag = ne_condition(&access, &Operand::Bool(true), &mut params);
        assert_eq!(
            frag,
            Fragment::sql("(data->>'active')::boolean IS DISTINCT FROM $1")
        );
    }
}
