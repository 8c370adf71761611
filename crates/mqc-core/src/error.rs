//! Compile-time error taxonomy for the query compiler.
//!
//! Mirrors the shape of `octofhir_storage::StorageError`: named variants
//! with `#[must_use]` constructor helpers and a `category()` method for
//! structured logging, rather than a single opaque `anyhow::Error`.

use thiserror::Error;

/// Errors raised while compiling a query or update document to SQL.
///
/// All other unsupported-operator cases degrade gracefully (emit `Empty`
/// or `TRUE` and log a warning) per the operator table; only the variants
/// below abort compilation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MqcError {
    /// `$where` was present anywhere in the query document. The compiler
    /// never emits arbitrary server-side code, so this always aborts.
    #[error("$where is not supported")]
    WhereOperatorUnsupported,

    /// An operand was the wrong shape for its operator (`$mod` not a pair
    /// of numbers, `$size` not a non-negative integer, `$all` not an
    /// array, `$type` not a recognized type name).
    #[error("invalid operand for {operator}: {message}")]
    InvalidOperand { operator: String, message: String },

    /// A destructive statement (`remove`, `updateOne`/`updateMany`) was
    /// asked to compile against an empty filter. Refused rather than
    /// emitting a predicate that matches every row.
    #[error("refusing to compile a destructive statement with an empty filter")]
    EmptyDestructiveFilter,

    /// `$elemMatch` in primitive mode was asked to apply `$exists` or a
    /// null-sensitive `$eq`/`$ne` to the text-extracted pseudo-path. This
    /// has no meaningful JSONB-null semantics (see design notes) so it is
    /// rejected instead of silently compiling something that can never
    /// match.
    #[error("$elemMatch in primitive mode cannot use {operator} against a text-extracted element")]
    ElemMatchPrimitiveOperatorUnsupported { operator: String },

    /// A non-negative integer (`limit`, `offset`, `$size`) was negative.
    #[error("{field} must be non-negative, got {value}")]
    NegativeInteger { field: String, value: i64 },
}

impl MqcError {
    #[must_use]
    pub fn invalid_operand(operator: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidOperand {
            operator: operator.into(),
            message: message.into(),
        }
    }

    #[must_use]
    pub fn elem_match_primitive_operator_unsupported(operator: impl Into<String>) -> Self {
        Self::ElemMatchPrimitiveOperatorUnsupported {
            operator: operator.into(),
        }
    }

    #[must_use]
    pub fn negative_integer(field: impl Into<String>, value: i64) -> Self {
        Self::NegativeInteger {
            field: field.into(),
            value,
        }
    }

    /// Coarse classification used to pick a log level / metric bucket at
    /// the call site, the same role `StorageError::category` plays.
    #[must_use]
    pub fn category(&self) -> MqcErrorCategory {
        match self {
            Self::WhereOperatorUnsupported => MqcErrorCategory::Unsupported,
            Self::InvalidOperand { .. } | Self::ElemMatchPrimitiveOperatorUnsupported { .. } => {
                MqcErrorCategory::InvalidOperand
            }
            Self::EmptyDestructiveFilter => MqcErrorCategory::RefusedDestructive,
            Self::NegativeInteger { .. } => MqcErrorCategory::InvalidOperand,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MqcErrorCategory {
    Unsupported,
    InvalidOperand,
    RefusedDestructive,
}

impl std::fmt::Display for MqcErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unsupported => write!(f, "unsupported"),
            Self::InvalidOperand => write!(f, "invalid_operand"),
            Self::RefusedDestructive => write!(f, "refused_destructive"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_classifies_variants() {
        assert_eq!(
            MqcError::WhereOperatorUnsupported.category(),
            MqcErrorCategory::Unsupported
        );
        assert_eq!(
            MqcError::invalid_operand("$mod", "not a pair").category(),
            MqcErrorCategory::InvalidOperand
        );
        assert_eq!(
            MqcError::EmptyDestructiveFilter.category(),
            MqcErrorCategory::RefusedDestructive
        );
    }

    #[test]
    fn display_messages() {
        assert_eq!(
            MqcError::WhereOperatorUnsupported.to_string(),
            "$where is not supported"
        );
        assert_eq!(
            MqcError::negative_integer("limit", -1).to_string(),
            "limit must be non-negative, got -1"
        );
    }
}
