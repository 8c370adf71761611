//! Document model, connection pool, and CRUD surface built on top of
//! `mqc-compiler`'s pure SQL-compilation primitives (spec §5-§7).
//!
//! [`Database`] owns the process-wide `PgPool` and the schema registry;
//! [`Collection`] is the typed CRUD surface obtained from it.

pub mod binding;
pub mod collection;
pub mod config;
pub mod context;
pub mod document;
pub mod error;
pub mod pool;
pub mod schema;

pub use collection::{Collection, FindOptions};
pub use config::DbConfig;
pub use error::ModelError;
pub use schema::{SchemaDef, SchemaRegistry};

use sqlx_postgres::PgPool;

/// Owns the connection pool and the schema registry; the single value an
/// application constructs at startup and shares across tasks.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
    registry: std::sync::Arc<SchemaRegistry>,
}

impl Database {
    /// Connects a new pool per `config` (see [`pool::create_pool`]).
    pub async fn connect(config: &DbConfig) -> Result<Self, ModelError> {
        let pool = pool::create_pool(config).await?;
        Ok(Self {
            pool,
            registry: std::sync::Arc::new(SchemaRegistry::new()),
        })
    }

    /// Wraps an already-constructed pool, used by tests that build their
    /// own `PgPool` (e.g. against `testcontainers`).
    #[must_use]
    pub fn from_pool(pool: PgPool) -> Self {
        Self {
            pool,
            registry: std::sync::Arc::new(SchemaRegistry::new()),
        }
    }

    /// Registers a collection's schema. Soft-delete configuration and the
    /// JSONB column name are fixed for the registry's lifetime once this
    /// is called.
    pub fn define_schema(&self, collection: impl Into<String>, schema: SchemaDef) {
        self.registry.define(collection, schema);
    }

    /// Obtains the typed CRUD surface for a collection previously
    /// registered with [`Self::define_schema`].
    pub fn collection<T>(&self, name: &str) -> Result<Collection<T>, ModelError>
    where
        T: serde::de::DeserializeOwned + Send + Unpin,
    {
        let schema = self
            .registry
            .get(name)
            .ok_or_else(|| ModelError::unknown_collection(name))?;
        Ok(Collection::new(self.pool.clone(), schema))
    }

    /// Runs `body` inside a transaction, flattening nested calls onto the
    /// same ambient connection (see [`context::with_transaction`]).
    pub async fn transaction<F, Fut, T>(&self, body: F) -> Result<T, ModelError>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<T, ModelError>>,
    {
        context::with_transaction(&self.pool, body).await
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}
