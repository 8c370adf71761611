//! Identifier and literal quoting — the only place user-controlled text is
//! allowed to flow into emitted SQL, and only ever through these functions.

/// Double-quote a SQL identifier (table/column/schema name), doubling any
/// embedded double quote.
#[must_use]
pub fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

/// Single-quote a SQL string literal, doubling any embedded single quote.
/// Used for the handful of operators the spec deliberately inlines
/// (`$gt`/`$gte`/`$lt`/`$lte` string operands, `$regex` patterns) instead
/// of parameterizing.
#[must_use]
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// Build the JSONB path-literal text `'{"a","b"}'` consumed by
/// `jsonb_set_lax`'s path argument. Each segment is individually
/// JSON-stringified (so it carries its own double quotes) and the
/// segments are joined with commas inside a single-quoted `{}` pair — the
/// shape the backend's text-path-array input expects.
#[must_use]
pub fn jsonb_path_literal(segments: &[String]) -> String {
    let body = segments
        .iter()
        .map(|s| serde_json::to_string(s).unwrap_or_else(|_| format!("\"{s}\"")))
        .collect::<Vec<_>>()
        .join(",");
    format!("'{{{body}}}'")
}

/// Split a dotted path (`a.b.2.c`) into its segments. A numeric segment
/// denotes an array index; `segment_is_index` tells callers which.
#[must_use]
pub fn split_dotted_path(path: &str) -> Vec<&str> {
    path.split('.').collect()
}

/// `true` when a path segment should be emitted as an unquoted integer
/// array accessor rather than a quoted object-key accessor.
#[must_use]
pub fn segment_is_index(segment: &str) -> bool {
    !segment.is_empty() && segment.bytes().all(|b| b.is_ascii_digit())
}
