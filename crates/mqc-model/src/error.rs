//! Execution-time error taxonomy (spec §7), mirroring
//! `octofhir_storage::error::StorageError`'s shape: named variants with
//! `#[must_use]` constructors and a `category()` used for structured
//! logging, wrapping both [`mqc_compiler`]'s compile-time errors and
//! `sqlx`'s execution-time ones.

use mqc_core::MqcError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("compile error: {0}")]
    Compile(#[from] MqcError),

    #[error("database error: {0}")]
    Database(#[from] sqlx_core::error::Error),

    #[error("optimistic lock conflict on {collection} id {id}: expected version {expected}, found {actual}")]
    OptimisticLock {
        collection: String,
        id: String,
        expected: i64,
        actual: i64,
    },

    #[error("document not found in {collection}: {id}")]
    NotFound { collection: String, id: String },

    #[error("validation failed: {}", errors.join("; "))]
    ValidationFailed { errors: Vec<String> },

    #[error("collection {0} is not registered")]
    UnknownCollection(String),
}

impl ModelError {
    #[must_use]
    pub fn optimistic_lock(
        collection: impl Into<String>,
        id: impl Into<String>,
        expected: i64,
        actual: i64,
    ) -> Self {
        Self::OptimisticLock {
            collection: collection.into(),
            id: id.into(),
            expected,
            actual,
        }
    }

    #[must_use]
    pub fn not_found(collection: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            collection: collection.into(),
            id: id.into(),
        }
    }

    #[must_use]
    pub fn validation_failed(errors: Vec<String>) -> Self {
        Self::ValidationFailed { errors }
    }

    #[must_use]
    pub fn unknown_collection(name: impl Into<String>) -> Self {
        Self::UnknownCollection(name.into())
    }

    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    #[must_use]
    pub fn is_optimistic_lock(&self) -> bool {
        matches!(self, Self::OptimisticLock { .. })
    }

    #[must_use]
    pub fn category(&self) -> ModelErrorCategory {
        match self {
            Self::Compile(_) => ModelErrorCategory::Compile,
            Self::Database(_) => ModelErrorCategory::Database,
            Self::OptimisticLock { .. } => ModelErrorCategory::Conflict,
            Self::NotFound { .. } => ModelErrorCategory::NotFound,
            Self::ValidationFailed { .. } => ModelErrorCategory::Validation,
            Self::UnknownCollection(_) => ModelErrorCategory::Configuration,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelErrorCategory {
    Compile,
    Database,
    Conflict,
    NotFound,
    Validation,
    Configuration,
}

impl std::fmt::Display for ModelErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Compile => write!(f, "compile"),
            Self::Database => write!(f, "database"),
            Self::Conflict => write!(f, "conflict"),
            Self::NotFound => write!(f, "not_found"),
            Self::Validation => write!(f, "validation"),
            Self::Configuration => write!(f, "configuration"),
        }
    }
}
