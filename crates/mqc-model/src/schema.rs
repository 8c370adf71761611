//! Schema registry (spec §5): the table-registration set the teacher keeps
//! on its storage handle, re-expressed as a `DashMap<String, SchemaDef>`
//! owned by [`crate::Database`] and populated only at `define_schema` time.
//! Each [`SchemaDef`] is immutable once inserted — soft-delete
//! configuration never changes after a collection is defined.

use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;

/// A schema's required/validate hook (spec §7): given a candidate document,
/// returns the aggregated list of per-field error messages, empty when the
/// document is valid. Run by [`crate::Collection::save`] before any SQL is
/// issued.
pub type ValidateHook = Arc<dyn Fn(&serde_json::Value) -> Vec<String> + Send + Sync>;

/// Per-collection configuration captured once at `define_schema` time.
#[derive(Clone)]
pub struct SchemaDef {
    pub table: String,
    pub json_field: String,
    /// When `true`, `remove()` stamps `_deletedAt` instead of issuing a
    /// hard `DELETE`, and read paths implicitly filter `_deletedAt IS
    /// NULL` unless the caller passed `includeDeleted`.
    pub soft_delete: bool,
    pub validate: Option<ValidateHook>,
}

impl SchemaDef {
    #[must_use]
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            json_field: "data".to_string(),
            soft_delete: true,
            validate: None,
        }
    }

    #[must_use]
    pub fn with_soft_delete(mut self, soft_delete: bool) -> Self {
        self.soft_delete = soft_delete;
        self
    }

    #[must_use]
    pub fn with_json_field(mut self, field: impl Into<String>) -> Self {
        self.json_field = field.into();
        self
    }

    #[must_use]
    pub fn with_validate(mut self, hook: ValidateHook) -> Self {
        self.validate = Some(hook);
        self
    }
}

impl fmt::Debug for SchemaDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaDef")
            .field("table", &self.table)
            .field("json_field", &self.json_field)
            .field("soft_delete", &self.soft_delete)
            .field("validate", &self.validate.is_some())
            .finish()
    }
}

#[derive(Debug, Default)]
pub struct SchemaRegistry {
    schemas: DashMap<String, SchemaDef>,
}

impl SchemaRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn define(&self, collection: impl Into<String>, schema: SchemaDef) {
        self.schemas.insert(collection.into(), schema);
    }

    #[must_use]
    pub fn get(&self, collection: &str) -> Option<SchemaDef> {
        self.schemas.get(collection).map(|entry| entry.clone())
    }
}
