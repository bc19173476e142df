//! SQL execution collaborator
//!
//! The DAO never talks to a driver directly. It hands generated SQL (with
//! positional `?` placeholders) and ordered bind values to a [`SqlExecutor`].
//! [`PgExecutor`] is the PostgreSQL implementation over a `sqlx` pool.

use std::future::Future;

use futures_util::StreamExt;
use futures_util::stream::{self, BoxStream};
use sqlx::PgPool;
use sqlx::postgres::{PgArguments, PgRow};
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::trace;

use crate::error::ExecutorError;
use crate::row::SqlRow;
use crate::sql::placeholder::to_numbered;
use crate::types::{AttrType, SqlValue};

/// Default capacity of the channel backing [`PgExecutor`] row streams
pub const DEFAULT_STREAM_BUFFER: usize = 64;

/// Executes parameterized SQL on behalf of the DAO
///
/// Implementations own connection handling. Unique-key violations must be
/// reported as [`ExecutorError::UniqueViolation`] so the DAO can translate
/// them into [`DaoOutcome::Duplicate`](crate::DaoOutcome::Duplicate).
pub trait SqlExecutor: Send + Sync {
    type Row: SqlRow + Send + 'static;

    /// Run a statement and return the number of affected rows
    fn execute(
        &self,
        sql: &str,
        params: &[SqlValue],
    ) -> impl Future<Output = Result<u64, ExecutorError>> + Send;

    /// Run a query and collect every row
    fn execute_select(
        &self,
        sql: &str,
        params: &[SqlValue],
    ) -> impl Future<Output = Result<Vec<Self::Row>, ExecutorError>> + Send;

    /// Run a query and yield rows lazily
    ///
    /// Dropping the stream before it is exhausted must release the
    /// underlying cursor/connection.
    fn execute_select_stream(
        &self,
        sql: &str,
        params: &[SqlValue],
    ) -> BoxStream<'static, Result<Self::Row, ExecutorError>>;
}

type PgQuery<'q> = sqlx::query::Query<'q, sqlx::Postgres, PgArguments>;

/// PostgreSQL executor backed by a `sqlx` connection pool
#[derive(Debug, Clone)]
pub struct PgExecutor {
    pool: PgPool,
    stream_buffer: usize,
}

impl PgExecutor {
    /// Connect a new pool to `database_url`
    pub async fn connect(database_url: &str) -> Result<Self, ExecutorError> {
        let pool = PgPool::connect(database_url).await?;
        Ok(Self::from_pool(pool))
    }

    /// Wrap an existing pool
    pub fn from_pool(pool: PgPool) -> Self {
        Self {
            pool,
            stream_buffer: DEFAULT_STREAM_BUFFER,
        }
    }

    /// Rows buffered ahead of a slow stream consumer (minimum 1)
    pub fn with_stream_buffer(mut self, rows: usize) -> Self {
        self.stream_buffer = rows.max(1);
        self
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

impl SqlExecutor for PgExecutor {
    type Row = PgRow;

    async fn execute(&self, sql: &str, params: &[SqlValue]) -> Result<u64, ExecutorError> {
        let sql = to_numbered(sql);
        let result = bind_all(sqlx::query(&sql), params)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(result.rows_affected())
    }

    async fn execute_select(
        &self,
        sql: &str,
        params: &[SqlValue],
    ) -> Result<Vec<PgRow>, ExecutorError> {
        let sql = to_numbered(sql);
        bind_all(sqlx::query(&sql), params)
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_error)
    }

    /// Rows are fetched by a spawned task and handed over a bounded channel.
    /// Outside a Tokio runtime the stream yields a single error.
    fn execute_select_stream(
        &self,
        sql: &str,
        params: &[SqlValue],
    ) -> BoxStream<'static, Result<PgRow, ExecutorError>> {
        let runtime = match current_runtime() {
            Ok(runtime) => runtime,
            Err(e) => return stream::once(async move { Err(e) }).boxed(),
        };

        let (tx, rx) = mpsc::channel(self.stream_buffer);
        let pool = self.pool.clone();
        let sql = to_numbered(sql);
        let params = params.to_vec();

        runtime.spawn(async move {
            let mut rows = bind_all(sqlx::query(&sql), &params).fetch(&pool);
            while let Some(row) = rows.next().await {
                let failed = row.is_err();
                if tx.send(row.map_err(map_sqlx_error)).await.is_err() {
                    trace!("Row stream dropped by consumer");
                    break;
                }
                if failed {
                    break;
                }
            }
        });

        ReceiverStream::new(rx).boxed()
    }
}

fn current_runtime() -> Result<Handle, ExecutorError> {
    Handle::try_current()
        .map_err(|e| ExecutorError::other(format!("row streams need a Tokio runtime: {e}")))
}

fn bind_all<'q>(query: PgQuery<'q>, params: &'q [SqlValue]) -> PgQuery<'q> {
    params.iter().fold(query, bind_value)
}

fn bind_value<'q>(query: PgQuery<'q>, value: &'q SqlValue) -> PgQuery<'q> {
    match value {
        SqlValue::Null(attr_type) => bind_null(query, *attr_type),
        SqlValue::Bool(v) => query.bind(*v),
        SqlValue::SmallInt(v) => query.bind(*v),
        SqlValue::Int(v) => query.bind(*v),
        SqlValue::BigInt(v) => query.bind(*v),
        SqlValue::Float(v) => query.bind(*v),
        SqlValue::Double(v) => query.bind(*v),
        SqlValue::Decimal(v) => query.bind(*v),
        SqlValue::String(v) => query.bind(v.as_str()),
        SqlValue::Bytes(v) => query.bind(v.as_slice()),
        SqlValue::Uuid(v) => query.bind(*v),
        SqlValue::Timestamp(v) => query.bind(*v),
        SqlValue::Date(v) => query.bind(*v),
        SqlValue::Time(v) => query.bind(*v),
        SqlValue::Json(v) => query.bind(v),
    }
}

/// PostgreSQL types its parameters, so NULL is bound with the column's type
/// when known and as text otherwise
fn bind_null(query: PgQuery<'_>, attr_type: Option<AttrType>) -> PgQuery<'_> {
    match attr_type {
        Some(AttrType::Boolean) => query.bind(None::<bool>),
        Some(AttrType::SmallInt) => query.bind(None::<i16>),
        Some(AttrType::Integer) => query.bind(None::<i32>),
        Some(AttrType::BigInt) => query.bind(None::<i64>),
        Some(AttrType::Float) => query.bind(None::<f32>),
        Some(AttrType::Double) => query.bind(None::<f64>),
        Some(AttrType::Decimal) => query.bind(None::<rust_decimal::Decimal>),
        Some(AttrType::Bytes | AttrType::Blob) => query.bind(None::<Vec<u8>>),
        Some(AttrType::Uuid) => query.bind(None::<uuid::Uuid>),
        Some(AttrType::Timestamp) => query.bind(None::<chrono::DateTime<chrono::Utc>>),
        Some(AttrType::Date) => query.bind(None::<chrono::NaiveDate>),
        Some(AttrType::Time) => query.bind(None::<chrono::NaiveTime>),
        Some(AttrType::Json) => query.bind(None::<serde_json::Value>),
        Some(AttrType::String | AttrType::Clob) | None => query.bind(None::<String>),
    }
}

/// Translate SQLSTATE 23505 into [`ExecutorError::UniqueViolation`]
fn map_sqlx_error(err: sqlx::Error) -> ExecutorError {
    let unique = err
        .as_database_error()
        .filter(|db| db.is_unique_violation())
        .map(|db| db.message().to_string());

    match unique {
        Some(message) => ExecutorError::UniqueViolation(message),
        None => ExecutorError::Database(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_sqlx_error_passes_through_non_database_errors() {
        let err = map_sqlx_error(sqlx::Error::RowNotFound);
        assert!(matches!(err, ExecutorError::Database(sqlx::Error::RowNotFound)));
        assert!(!err.is_unique_violation());
    }

    #[test]
    fn test_current_runtime_outside_tokio_is_error() {
        let err = current_runtime().unwrap_err();
        assert!(matches!(err, ExecutorError::Other(ref m) if m.contains("Tokio runtime")));
    }

    #[tokio::test]
    async fn test_current_runtime_inside_tokio() {
        assert!(current_runtime().is_ok());
    }

    #[test]
    fn test_bind_all_accepts_every_value_kind() {
        let params = vec![
            SqlValue::from("a"),
            SqlValue::Null(Some(AttrType::BigInt)),
            SqlValue::null(),
            SqlValue::Json(serde_json::json!({"x": 1})),
        ];
        let sql = to_numbered("SELECT ?, ?, ?, ?");
        let _query = bind_all(sqlx::query(&sql), &params);
    }
}
