//! Placeholder renumbering (spec §4.9): shift every `$N` in an independently
//! numbered SQL fragment by a fixed offset, so it can be spliced after a
//! pre-numbered WHERE clause. Applied only to the update SET expression —
//! the WHERE fragment itself is never renumbered.
//!
//! Treating `$\d+` as an opaque token is safe here because the emitted
//! dialect never allows an identifier to start with `$`.

use std::sync::OnceLock;

use regex::Regex;

fn placeholder_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\$(\d+)").expect("static regex is valid"))
}

#[must_use]
pub fn renumber_placeholders(sql: &str, offset: usize) -> String {
    placeholder_pattern()
        .replace_all(sql, |caps: &regex::Captures| {
            let n: usize = caps[1].parse().expect("regex only captures digits");
            format!("${}", n + offset)
        })
        .into_owned()
}
