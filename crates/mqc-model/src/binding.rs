//! Binds a compiled [`Param`] vector onto a `sqlx_core` query, in the
//! positional order the compiler already produced. JSONB parameters ride
//! as `sqlx_core::types::Json`; array parameters bind directly as Postgres
//! arrays via the `Vec<T>` encodings `sqlx-postgres` already provides.

use mqc_compiler::Param;
use sqlx_core::query::Query;
use sqlx_core::types::Json;
use sqlx_postgres::{PgArguments, Postgres};

pub fn bind_all<'q>(
    mut query: Query<'q, Postgres, PgArguments>,
    params: Vec<Param>,
) -> Query<'q, Postgres, PgArguments> {
    for param in params {
        query = match param {
            Param::Text(s) => query.bind(s),
            Param::Integer(i) => query.bind(i),
            Param::Numeric(f) => query.bind(f),
            Param::Boolean(b) => query.bind(b),
            Param::Json(v) => query.bind(Json(v)),
            Param::IntegerArray(v) => query.bind(v),
            Param::NumericArray(v) => query.bind(v),
            Param::BooleanArray(v) => query.bind(v),
            Param::TextArray(v) => query.bind(v),
            Param::JsonArray(v) => query.bind(v.into_iter().map(Json).collect::<Vec<_>>()),
        };
    }
    query
}
