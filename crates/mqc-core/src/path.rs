//! JSONB accessor-path construction (§4.1 of the design spec).

use crate::quoting::{quote_literal, segment_is_index, split_dotted_path};

/// The container-form and text-form JSONB accessors for a dotted field
/// path rooted at `root` (a column name or an `$elemMatch` alias like
/// `elem`/`elem_val`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessPath {
    /// Ends in `->`, suitable for `jsonb_typeof`/array expansion/further
    /// traversal.
    pub jsonpath: String,
    /// Ends in `->>`, suitable for casting and scalar comparison.
    pub accesspath: String,
}

impl AccessPath {
    /// Build both forms for `path` rooted at `root`.
    #[must_use]
    pub fn build(root: &str, path: &str) -> Self {
        let segments = split_dotted_path(path);
        let mut jsonpath = root.to_string();
        let mut accesspath = root.to_string();

        for (i, segment) in segments.iter().enumerate() {
            let is_last = i == segments.len() - 1;
            let accessor = if segment_is_index(segment) {
                segment.to_string()
            } else {
                quote_literal(segment)
            };
            jsonpath.push_str("->");
            jsonpath.push_str(&accessor);

            accesspath.push_str(if is_last { "->>" } else { "->" });
            accesspath.push_str(&accessor);
        }

        Self {
            jsonpath,
            accesspath,
        }
    }
}
