//! Per-task transaction context (spec §5), grounded on
//! `octofhir_db_postgres::transaction::PostgresTransaction`: a
//! `Mutex`-guarded boxed transaction, committed or rolled back explicitly,
//! with a `Drop` guard warning if neither happened. Re-expressed here as a
//! `tokio::task_local!` slot so `Collection` methods can transparently pick
//! up the ambient transaction's connection instead of checking one out of
//! the pool, the same way the teacher's storage trait looked up its bound
//! connection.

use std::sync::Arc;

use sqlx_core::error::Error as SqlxError;
use sqlx_postgres::{PgPool, PgTransaction, Postgres};
use tokio::sync::Mutex;
use tracing::warn;

tokio::task_local! {
    static CURRENT_TRANSACTION: Arc<Mutex<Option<PgTransaction<'static>>>>;
}

/// `true` when called from within an active [`with_transaction`] callback.
#[must_use]
pub fn in_transaction() -> bool {
    CURRENT_TRANSACTION.try_with(|_| ()).is_ok()
}

/// Guard returned by [`with_transaction`]'s setup, committing or rolling
/// back on drop if the caller never called [`TransactionHandle::commit`] or
/// [`TransactionHandle::rollback`] explicitly. Mirrors the teacher's
/// `impl Drop for PostgresTransaction`, which relies on `sqlx`'s own
/// `Transaction::drop` issuing `ROLLBACK` when abandoned.
struct TransactionGuard {
    finished: bool,
}

impl Drop for TransactionGuard {
    fn drop(&mut self) {
        if !self.finished {
            warn!("transaction dropped without explicit commit or rollback; sqlx will roll back");
        }
    }
}

/// Runs `body` with the ambient transaction context set. If a transaction
/// is already active on this task, it is reused and no nested
/// `BEGIN`/`COMMIT`/`ROLLBACK` is issued — flattening, per the
/// concurrency model. `E` carries the caller's own error type; a commit or
/// rollback failure is converted into it via `From<SqlxError>`.
pub async fn with_transaction<F, Fut, T, E>(pool: &PgPool, body: F) -> Result<T, E>
where
    F: FnOnce() -> Fut,
    Fut: std::future::Future<Output = Result<T, E>>,
    E: From<SqlxError>,
{
    if in_transaction() {
        return body().await;
    }

    let tx: PgTransaction<'static> = pool.begin().await?;
    let shared = Arc::new(Mutex::new(Some(tx)));
    let mut guard = TransactionGuard { finished: false };

    let result = CURRENT_TRANSACTION
        .scope(Arc::clone(&shared), async { body().await })
        .await;

    let mut slot = shared.lock().await;
    let Some(tx) = slot.take() else {
        guard.finished = true;
        return result;
    };
    drop(slot);

    match &result {
        Ok(_) => tx.commit().await?,
        Err(_) => tx.rollback().await?,
    }
    guard.finished = true;
    result
}

/// Runs `query` against the ambient transaction's connection if one is
/// active, otherwise against `pool` directly.
pub async fn execute_with_ambient<'q>(
    pool: &PgPool,
    query: sqlx_core::query::Query<'q, Postgres, sqlx_postgres::PgArguments>,
) -> Result<sqlx_postgres::PgQueryResult, SqlxError> {
    if let Ok(shared) = CURRENT_TRANSACTION.try_with(Arc::clone) {
        let mut slot = shared.lock().await;
        let tx = slot.as_mut().expect("transaction slot emptied while active");
        query.execute(&mut **tx).await
    } else {
        query.execute(pool).await
    }
}

pub async fn fetch_all_with_ambient<'q>(
    pool: &PgPool,
    query: sqlx_core::query::Query<'q, Postgres, sqlx_postgres::PgArguments>,
) -> Result<Vec<sqlx_postgres::PgRow>, SqlxError> {
    if let Ok(shared) = CURRENT_TRANSACTION.try_with(Arc::clone) {
        let mut slot = shared.lock().await;
        let tx = slot.as_mut().expect("transaction slot emptied while active");
        query.fetch_all(&mut **tx).await
    } else {
        query.fetch_all(pool).await
    }
}

pub async fn fetch_optional_with_ambient<'q>(
    pool: &PgPool,
    query: sqlx_core::query::Query<'q, Postgres, sqlx_postgres::PgArguments>,
) -> Result<Option<sqlx_postgres::PgRow>, SqlxError> {
    if let Ok(shared) = CURRENT_TRANSACTION.try_with(Arc::clone) {
        let mut slot = shared.lock().await;
        let tx = slot.as_mut().expect("transaction slot emptied while active");
        query.fetch_optional(&mut **tx).await
    } else {
        query.fetch_optional(pool).await
    }
}
