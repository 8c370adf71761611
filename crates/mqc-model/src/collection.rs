//! The model layer's CRUD surface (spec §6): `create`, `find1`, `findOne`,
//! `find`, `count`, `remove`, `updateOne`, `updateMany`, raw `query`, and
//! the per-document `save`/`populate` helpers.

use std::marker::PhantomData;

use mqc_compiler::{
    build_count, build_select, build_soft_delete, build_update_statement, Param, QueryDocument,
    SelectOptions, UpdateOps,
};
use serde::de::DeserializeOwned;
use sqlx_core::column::Column;
use sqlx_core::row::Row;
use sqlx_postgres::{PgPool, PgRow};
use tracing::{debug, instrument};

use crate::binding::bind_all;
use crate::context::{execute_with_ambient, fetch_all_with_ambient, fetch_optional_with_ambient};
use crate::document::{self, DELETED_AT_KEY, ID_KEY, VERS_KEY};
use crate::error::ModelError;
use crate::schema::SchemaDef;

/// Mongo-style `+1`/`-1` sort plus pagination, mirroring spec §6's find
/// options. `include_deleted` bypasses the implicit `_deletedAt IS NULL`
/// filter a soft-delete-enabled schema otherwise injects.
#[derive(Debug, Clone, Default)]
pub struct FindOptions {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    pub sort: Option<mqc_compiler::SortSpec>,
    pub include_deleted: bool,
}

pub struct Collection<T> {
    pool: PgPool,
    schema: SchemaDef,
    _marker: PhantomData<T>,
}

impl<T> Collection<T>
where
    T: DeserializeOwned + Send + Unpin,
{
    pub(crate) fn new(pool: PgPool, schema: SchemaDef) -> Self {
        Self {
            pool,
            schema,
            _marker: PhantomData,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.schema.table
    }

    fn decode_row(row: &PgRow) -> Result<T, ModelError>
    where
        T: DeserializeOwned,
    {
        let value: serde_json::Value = row.try_get("data").map_err(ModelError::Database)?;
        serde_json::from_value(value)
            .map_err(|e| ModelError::validation_failed(vec![e.to_string()]))
    }

    /// Runs the schema's required/validate hook, if any, aggregating its
    /// per-field errors into a single [`ModelError::ValidationFailed`].
    /// Called wherever a complete candidate document is available —
    /// [`Self::create`] and [`Self::save`] — before any SQL is issued.
    /// `update_one`/`update_many` only ever see a partial `$set`/`$inc`
    /// document, not a full candidate, so they are not hook call sites.
    fn validate(&self, doc: &serde_json::Map<String, serde_json::Value>) -> Result<(), ModelError> {
        let Some(hook) = &self.schema.validate else {
            return Ok(());
        };
        let errors = hook(&serde_json::Value::Object(doc.clone()));
        if errors.is_empty() {
            Ok(())
        } else {
            Err(ModelError::validation_failed(errors))
        }
    }

    /// Injects `{_deletedAt: null}` into `query` unless the schema has soft
    /// delete disabled, the caller already constrains `_deletedAt`, or
    /// `include_deleted` was requested.
    fn with_soft_delete_filter(
        &self,
        mut query: QueryDocument,
        include_deleted: bool,
    ) -> QueryDocument {
        if self.schema.soft_delete && !include_deleted && !query.contains_key(DELETED_AT_KEY) {
            query.insert(DELETED_AT_KEY.to_string(), mqc_core::Operand::Null);
        }
        query
    }

    #[instrument(skip(self, doc), fields(collection = %self.schema.table))]
    pub async fn create(&self, mut doc: serde_json::Map<String, serde_json::Value>) -> Result<T, ModelError> {
        self.validate(&doc)?;
        document::stamp_create(&mut doc, &self.schema.table);
        let value = serde_json::Value::Object(doc);
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ($1) RETURNING {}",
            mqc_core::quoting::quote_ident(&self.schema.table),
            mqc_core::quoting::quote_ident(&self.schema.json_field),
            mqc_core::quoting::quote_ident(&self.schema.json_field),
        );
        let query = sqlx_core::query::query(&sql).bind(sqlx_core::types::Json(value));
        let row = fetch_optional_with_ambient(&self.pool, query)
            .await
            .map_err(ModelError::Database)?
            .ok_or_else(|| ModelError::not_found(&self.schema.table, "<new>"))?;
        debug!("document created");
        Self::decode_row(&row)
    }

    pub async fn find1(&self, id: &str) -> Result<Option<T>, ModelError> {
        let mut query = QueryDocument::new();
        query.insert(ID_KEY.to_string(), mqc_core::Operand::Str(id.to_string()));
        self.find_one(query, None).await
    }

    pub async fn find_one(
        &self,
        query: QueryDocument,
        opts: Option<&FindOptions>,
    ) -> Result<Option<T>, ModelError> {
        let include_deleted = opts.map(|o| o.include_deleted).unwrap_or(false);
        let query = self.with_soft_delete_filter(query, include_deleted);
        let select_opts = SelectOptions {
            json_field: Some(self.schema.json_field.clone()),
            schema: None,
            limit: Some(1),
            offset: None,
            sort: opts.and_then(|o| o.sort.clone()),
        };
        let (sql, params) = build_select(&self.schema.table, &query, &select_opts)?;
        let bound = bind_all(sqlx_core::query::query(&sql), params);
        let row = fetch_optional_with_ambient(&self.pool, bound)
            .await
            .map_err(ModelError::Database)?;
        row.as_ref().map(Self::decode_row).transpose()
    }

    pub async fn find(
        &self,
        query: QueryDocument,
        opts: Option<&FindOptions>,
    ) -> Result<Vec<T>, ModelError> {
        let include_deleted = opts.map(|o| o.include_deleted).unwrap_or(false);
        let query = self.with_soft_delete_filter(query, include_deleted);
        let select_opts = SelectOptions {
            json_field: Some(self.schema.json_field.clone()),
            schema: None,
            limit: opts.and_then(|o| o.limit),
            offset: opts.and_then(|o| o.offset),
            sort: opts.and_then(|o| o.sort.clone()),
        };
        let (sql, params) = build_select(&self.schema.table, &query, &select_opts)?;
        let bound = bind_all(sqlx_core::query::query(&sql), params);
        let rows = fetch_all_with_ambient(&self.pool, bound)
            .await
            .map_err(ModelError::Database)?;
        rows.iter().map(Self::decode_row).collect()
    }

    pub async fn count(&self, query: QueryDocument, opts: Option<&FindOptions>) -> Result<i64, ModelError> {
        let include_deleted = opts.map(|o| o.include_deleted).unwrap_or(false);
        let query = self.with_soft_delete_filter(query, include_deleted);
        let (sql, params) = build_count(
            &self.schema.table,
            &query,
            Some(self.schema.json_field.as_str()),
        )?;
        let bound = bind_all(sqlx_core::query::query(&sql), params);
        let row = fetch_optional_with_ambient(&self.pool, bound)
            .await
            .map_err(ModelError::Database)?
            .expect("COUNT(*) always returns exactly one row");
        row.try_get::<i64, _>("count").map_err(ModelError::Database)
    }

    /// Removes documents matching `query` — soft-deletes (stamps
    /// `_deletedAt`) when the schema has soft delete enabled, otherwise
    /// issues a hard `DELETE`. Returns the number of affected rows.
    #[instrument(skip(self, query), fields(collection = %self.schema.table))]
    pub async fn remove(&self, query: QueryDocument) -> Result<u64, ModelError> {
        let field = Some(self.schema.json_field.as_str());
        let (sql, params) = if self.schema.soft_delete {
            build_soft_delete(&self.schema.table, &query, field, document::now_millis())?
        } else {
            mqc_compiler::build_delete(&self.schema.table, &query, field)?
        };
        let bound = bind_all(sqlx_core::query::query(&sql), params);
        let result = execute_with_ambient(&self.pool, bound)
            .await
            .map_err(ModelError::Database)?;
        Ok(result.rows_affected())
    }

    /// Applies `ops` to every document matching `filter`, bumping
    /// `_mtime` via a raw SQL timestamp but *not* `_vers` — version bumps
    /// only apply to the single-document [`Self::update_one`] path, which
    /// can enforce the optimistic-lock predicate.
    pub async fn update_many(&self, filter: QueryDocument, ops: UpdateOps) -> Result<u64, ModelError> {
        let Some((sql, params)) = build_update_statement(
            &self.schema.table,
            &filter,
            &ops,
            Some(self.schema.json_field.as_str()),
        )?
        else {
            return Ok(0);
        };
        let bound = bind_all(sqlx_core::query::query(&sql), params);
        let result = execute_with_ambient(&self.pool, bound)
            .await
            .map_err(ModelError::Database)?;
        Ok(result.rows_affected())
    }

    /// Single-document update with optimistic-lock enforcement: adds
    /// `_vers = expected` to the filter and `_vers = expected + 1` /
    /// `_mtime = now` to the SET clause. A zero-row result is
    /// [`ModelError::OptimisticLock`] when the document still exists with
    /// a different version, or [`ModelError::NotFound`] when it is gone.
    pub async fn update_one(
        &self,
        id: &str,
        expected_version: i64,
        mut ops: UpdateOps,
    ) -> Result<T, ModelError> {
        // `_vers`/`_mtime` are reserved and stamped here, never by the
        // caller; strip anything they set on them before overwriting.
        ops.set.retain(|key, _| !document::is_reserved_key(key));
        ops.set
            .insert(VERS_KEY.to_string(), mqc_core::Operand::Int(expected_version + 1));
        ops.set
            .insert("_mtime".to_string(), mqc_core::Operand::Float(document::now_millis()));

        let mut filter = QueryDocument::new();
        filter.insert(ID_KEY.to_string(), mqc_core::Operand::Str(id.to_string()));
        filter.insert(VERS_KEY.to_string(), mqc_core::Operand::Int(expected_version));

        let Some((sql, params)) = build_update_statement(
            &self.schema.table,
            &filter,
            &ops,
            Some(self.schema.json_field.as_str()),
        )?
        else {
            return self
                .find1(id)
                .await?
                .ok_or_else(|| ModelError::not_found(&self.schema.table, id));
        };
        let full_sql = format!("{sql} RETURNING {}", mqc_core::quoting::quote_ident(&self.schema.json_field));
        let bound = bind_all(sqlx_core::query::query(&full_sql), params);
        let row = fetch_optional_with_ambient(&self.pool, bound)
            .await
            .map_err(ModelError::Database)?;

        match row {
            Some(row) => Self::decode_row(&row),
            None => match self.find1(id).await? {
                Some(_) => {
                    // still exists but the version predicate excluded it:
                    // the actual current version is unknown without a
                    // second read, so re-fetch it for the error.
                    let actual = self.current_version(id).await?;
                    Err(ModelError::optimistic_lock(
                        &self.schema.table,
                        id,
                        expected_version,
                        actual,
                    ))
                }
                None => Err(ModelError::not_found(&self.schema.table, id)),
            },
        }
    }

    async fn current_version(&self, id: &str) -> Result<i64, ModelError> {
        let mut query = QueryDocument::new();
        query.insert(ID_KEY.to_string(), mqc_core::Operand::Str(id.to_string()));
        let (sql, params) = build_select(
            &self.schema.table,
            &query,
            &SelectOptions {
                json_field: Some(self.schema.json_field.clone()),
                limit: Some(1),
                ..Default::default()
            },
        )?;
        let bound = bind_all(sqlx_core::query::query(&sql), params);
        let row = fetch_optional_with_ambient(&self.pool, bound)
            .await
            .map_err(ModelError::Database)?
            .ok_or_else(|| ModelError::not_found(&self.schema.table, id))?;
        let value: serde_json::Value = row.try_get("data").map_err(ModelError::Database)?;
        Ok(value.get(VERS_KEY).and_then(serde_json::Value::as_i64).unwrap_or(1))
    }

    /// Insert-or-update a full document (spec §6): absent `_id` delegates
    /// to [`Self::create`]; a present `_id` stamps `_mtime`/`_vers` via
    /// [`document::stamp_update`] and issues a whole-row `UPDATE` gated on
    /// the prior version, enforcing the same optimistic lock as
    /// [`Self::update_one`]. Runs the schema's validation hook before any
    /// SQL is issued.
    #[instrument(skip(self, doc), fields(collection = %self.schema.table))]
    pub async fn save(&self, mut doc: serde_json::Map<String, serde_json::Value>) -> Result<T, ModelError> {
        self.validate(&doc)?;

        let Some(id) = doc.get(ID_KEY).and_then(serde_json::Value::as_str).map(str::to_string) else {
            return self.create(doc).await;
        };

        let expected = document::stamp_update(&mut doc);
        let value = serde_json::Value::Object(doc);
        let quoted_table = mqc_core::quoting::quote_ident(&self.schema.table);
        let quoted_column = mqc_core::quoting::quote_ident(&self.schema.json_field);
        let sql = format!(
            "UPDATE {quoted_table} SET {quoted_column} = $1 WHERE {quoted_column}->>'_id' = $2 AND ({quoted_column}->>'_vers')::integer = $3 RETURNING {quoted_column}"
        );
        let bound = sqlx_core::query::query(&sql)
            .bind(sqlx_core::types::Json(value))
            .bind(id.clone())
            .bind(expected);
        let row = fetch_optional_with_ambient(&self.pool, bound)
            .await
            .map_err(ModelError::Database)?;

        match row {
            Some(row) => Self::decode_row(&row),
            None => match self.find1(&id).await? {
                Some(_) => {
                    let actual = self.current_version(&id).await?;
                    Err(ModelError::optimistic_lock(&self.schema.table, &id, expected, actual))
                }
                None => Err(ModelError::not_found(&self.schema.table, &id)),
            },
        }
    }

    /// Issues a raw SQL statement, binding `params` positionally. Escapes
    /// the compiler entirely — intended for reporting queries the
    /// MongoDB-shaped filter language cannot express. When `raw` is
    /// `false`, the five reserved bookkeeping keys are stripped from each
    /// returned JSON object (the common case: a single JSONB column
    /// select meant for application consumption); when `true`, every
    /// column of each row is decoded into a JSON object keyed by column
    /// name and returned untouched.
    pub async fn query(
        &self,
        sql: &str,
        params: Vec<Param>,
        raw: bool,
    ) -> Result<Vec<serde_json::Value>, ModelError> {
        let bound = bind_all(sqlx_core::query::query(sql), params);
        let rows = fetch_all_with_ambient(&self.pool, bound)
            .await
            .map_err(ModelError::Database)?;
        if raw {
            Ok(rows.iter().map(row_to_json).collect())
        } else {
            rows.iter()
                .map(|row| {
                    row.try_get::<serde_json::Value, _>(0)
                        .map(|value| strip_reserved_keys(value))
                        .map_err(ModelError::Database)
                })
                .collect()
        }
    }

    /// Resolves a foreign id stored at `field` (e.g. `"authorId"`) against
    /// another registered collection, returning the referenced document if
    /// present. Model-layer only — the compiler has no notion of foreign
    /// keys.
    pub async fn populate<U>(
        &self,
        doc: &serde_json::Value,
        field: &str,
        related: &Collection<U>,
    ) -> Result<Option<U>, ModelError>
    where
        U: DeserializeOwned + Send + Unpin,
    {
        let Some(id) = doc.get(field).and_then(serde_json::Value::as_str) else {
            return Ok(None);
        };
        related.find1(id).await
    }
}

/// Removes the five reserved bookkeeping keys from a top-level JSON object,
/// leaving other values untouched. The application-facing default for
/// [`Collection::query`]'s non-`raw` mode.
fn strip_reserved_keys(mut value: serde_json::Value) -> serde_json::Value {
    if let serde_json::Value::Object(map) = &mut value {
        map.retain(|key, _| !document::is_reserved_key(key));
    }
    value
}

/// Decodes every column of `row` into a JSON object keyed by column name,
/// trying progressively looser Postgres types per column. Used by
/// [`Collection::query`]'s `raw` mode for arbitrary reporting `SELECT`s
/// whose shape the compiler never sees.
fn row_to_json(row: &PgRow) -> serde_json::Value {
    let mut obj = serde_json::Map::new();
    for column in row.columns() {
        let name = column.name().to_string();
        let idx = column.ordinal();
        let value = row
            .try_get::<serde_json::Value, _>(idx)
            .or_else(|_| row.try_get::<i64, _>(idx).map(serde_json::Value::from))
            .or_else(|_| {
                row.try_get::<f64, _>(idx).map(|f| {
                    serde_json::Number::from_f64(f)
                        .map(serde_json::Value::Number)
                        .unwrap_or(serde_json::Value::Null)
                })
            })
            .or_else(|_| row.try_get::<bool, _>(idx).map(serde_json::Value::Bool))
            .or_else(|_| row.try_get::<String, _>(idx).map(serde_json::Value::String))
            .unwrap_or(serde_json::Value::Null);
        obj.insert(name, value);
    }
    serde_json::Value::Object(obj)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn with_soft_delete_filter_adds_deleted_at_null_when_enabled() {
        let schema = SchemaDef::new("users");
        let pool_free_collection = CollectionFixture { schema };
        let query = QueryDocument::new();
        let filtered = pool_free_collection.apply(query, false);
        assert!(filtered.contains_key(DELETED_AT_KEY));
    }

    #[test]
    fn include_deleted_skips_injection() {
        let schema = SchemaDef::new("users");
        let pool_free_collection = CollectionFixture { schema };
        let query = QueryDocument::new();
        let filtered = pool_free_collection.apply(query, true);
        assert!(!filtered.contains_key(DELETED_AT_KEY));
    }

    #[test]
    fn caller_supplied_deleted_at_is_not_overwritten() {
        let schema = SchemaDef::new("users");
        let pool_free_collection = CollectionFixture { schema };
        let mut query = QueryDocument::new();
        query.insert(
            DELETED_AT_KEY.to_string(),
            mqc_core::Operand::Object(Default::default()),
        );
        let filtered = pool_free_collection.apply(query, false);
        assert_eq!(
            filtered.get(DELETED_AT_KEY),
            Some(&mqc_core::Operand::Object(Default::default()))
        );
    }

    /// Exercises `with_soft_delete_filter`'s logic without constructing a
    /// real `PgPool` — the method only touches `self.schema`.
    struct CollectionFixture {
        schema: SchemaDef,
    }

    impl CollectionFixture {
        fn apply(&self, query: QueryDocument, include_deleted: bool) -> QueryDocument {
            let mut query = query;
            if self.schema.soft_delete && !include_deleted && !query.contains_key(DELETED_AT_KEY) {
                query.insert(DELETED_AT_KEY.to_string(), mqc_core::Operand::Null);
            }
            query
        }

        fn validate(&self, doc: &serde_json::Map<String, serde_json::Value>) -> Result<(), ModelError> {
            let Some(hook) = &self.schema.validate else {
                return Ok(());
            };
            let errors = hook(&serde_json::Value::Object(doc.clone()));
            if errors.is_empty() {
                Ok(())
            } else {
                Err(ModelError::validation_failed(errors))
            }
        }
    }

    #[test]
    fn strip_reserved_keys_removes_bookkeeping_fields_only() {
        let value = serde_json::json!({
            "_id": "users_1",
            "_vers": 1,
            "name": "Ada",
        });
        let stripped = strip_reserved_keys(value);
        assert_eq!(stripped, serde_json::json!({"name": "Ada"}));
    }

    #[test]
    fn strip_reserved_keys_leaves_non_object_values_untouched() {
        let value = serde_json::json!([1, 2, 3]);
        assert_eq!(strip_reserved_keys(value.clone()), value);
    }

    #[test]
    fn validate_short_circuits_before_any_sql_would_run() {
        let hook: crate::schema::ValidateHook = std::sync::Arc::new(|doc| {
            if doc.get("email").is_none() {
                vec!["email is required".to_string()]
            } else {
                Vec::new()
            }
        });
        let schema = SchemaDef::new("users").with_validate(hook);
        let fixture = CollectionFixture { schema };

        let mut invalid = serde_json::Map::new();
        invalid.insert("name".to_string(), serde_json::json!("Ada"));
        let err = fixture.validate(&invalid).unwrap_err();
        assert!(matches!(err, ModelError::ValidationFailed { .. }));

        let mut valid = serde_json::Map::new();
        valid.insert("email".to_string(), serde_json::json!("ada@example.com"));
        assert!(fixture.validate(&valid).is_ok());
    }
}
