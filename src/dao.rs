//! GenericBoDao - CRUD orchestration for one BO type and one table
//!
//! The DAO renders statements through its [`RowMapper`], extracts bind
//! values from BOs, hands both to a [`SqlExecutor`], and maps result rows
//! back into BOs. Zero-row and duplicate-key results are reported as
//! [`DaoOutcome`] values rather than errors.

use std::sync::Arc;
use std::time::Instant;

use futures_util::{Stream, StreamExt};
use tracing::{debug, instrument, trace};

use crate::config::DaoConfig;
use crate::entity::{Bo, BoId};
use crate::error::{DaoError, ExecutionContext, Operation, Result};
use crate::executor::SqlExecutor;
use crate::mapper::RowMapper;
use crate::row::SqlRow;
use crate::sql::filter::Filter;
use crate::types::SqlValue;

/// Result of a mutating DAO call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DaoOutcome {
    /// The row was written
    Successful,
    /// INSERT affected no rows
    NotCreated,
    /// No row matched the key (or the checksum was stale)
    NotFound,
    /// A unique constraint rejected the write
    Duplicate,
}

impl DaoOutcome {
    pub fn is_successful(self) -> bool {
        self == DaoOutcome::Successful
    }
}

/// Generic DAO for BOs of type `T` stored in a single table
pub struct GenericBoDao<T, E> {
    mapper: Arc<RowMapper<T>>,
    executor: E,
    config: DaoConfig,
}

impl<T, E> GenericBoDao<T, E>
where
    T: Bo + Send + 'static,
    E: SqlExecutor,
{
    pub fn new(mapper: Arc<RowMapper<T>>, executor: E, config: DaoConfig) -> Self {
        Self {
            mapper,
            executor,
            config,
        }
    }

    pub fn mapper(&self) -> &Arc<RowMapper<T>> {
        &self.mapper
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    pub fn config(&self) -> &DaoConfig {
        &self.config
    }

    pub fn table_name(&self) -> &str {
        &self.config.table_name
    }

    // ========================================================================
    // Mutations
    // ========================================================================

    /// Insert `bo`; on success it is marked clean
    #[instrument(skip_all, fields(operation = "create", table = %self.config.table_name))]
    pub async fn create(&self, bo: &mut T) -> Result<DaoOutcome> {
        let sql = self.mapper.generate_insert(self.table_name());
        let params = self
            .mapper
            .values_for_columns(bo, self.mapper.insert_columns())?;

        match self.execute(Operation::Create, &sql, params).await {
            Ok(0) => Ok(DaoOutcome::NotCreated),
            Ok(_) => {
                self.mapper.mark_persisted(bo)?;
                Ok(DaoOutcome::Successful)
            }
            Err(e) if e.is_unique_violation() => {
                debug!(error = %e, "Insert rejected as duplicate");
                Ok(DaoOutcome::Duplicate)
            }
            Err(e) => Err(e),
        }
    }

    /// Update `bo` by primary key
    ///
    /// With a checksum column configured the row must also still carry the
    /// checksum observed when `bo` was loaded or last saved; a stale checksum
    /// yields [`DaoOutcome::NotFound`]. Without any non-null checksum to
    /// match, the call fails with [`DaoError::Configuration`].
    #[instrument(skip_all, fields(operation = "update", table = %self.config.table_name))]
    pub async fn update(&self, bo: &mut T) -> Result<DaoOutcome> {
        if self.mapper.update_columns().is_empty() {
            return Err(DaoError::configuration(format!(
                "No update columns configured for table '{}'",
                self.table_name()
            )));
        }

        let mut params = self
            .mapper
            .values_for_columns(bo, self.mapper.update_columns())?;
        params.extend(self.mapper.primary_key_values(bo)?);

        let sql = if let Some(column) = self.mapper.checksum_column() {
            // `checksum=?` never matches a NULL checksum
            let expected = self
                .mapper
                .expected_checksum(bo)?
                .filter(|v| !v.is_null())
                .ok_or_else(|| {
                    DaoError::configuration(format!(
                        "Checked update on table '{}' needs a non-null '{}' value",
                        self.table_name(),
                        column
                    ))
                })?;
            params.push(expected);
            self.mapper.generate_update_checked(self.table_name())?
        } else {
            self.mapper.generate_update(self.table_name())
        };

        match self.execute(Operation::Update, &sql, params).await {
            Ok(0) => {
                debug!("No row matched key or checksum");
                Ok(DaoOutcome::NotFound)
            }
            Ok(_) => {
                self.mapper.mark_persisted(bo)?;
                Ok(DaoOutcome::Successful)
            }
            Err(e) if e.is_unique_violation() => {
                debug!(error = %e, "Update rejected as duplicate");
                Ok(DaoOutcome::Duplicate)
            }
            Err(e) => Err(e),
        }
    }

    /// Delete the row with `bo`'s primary key
    #[instrument(skip_all, fields(operation = "delete", table = %self.config.table_name))]
    pub async fn delete(&self, bo: &T) -> Result<DaoOutcome> {
        let sql = self.mapper.generate_delete(self.table_name());
        let params = self.mapper.primary_key_values(bo)?;

        match self.execute(Operation::Delete, &sql, params).await? {
            0 => Ok(DaoOutcome::NotFound),
            _ => Ok(DaoOutcome::Successful),
        }
    }

    /// Create, falling back to update when the key already exists
    pub async fn create_or_update(&self, bo: &mut T) -> Result<DaoOutcome> {
        match self.create(bo).await? {
            DaoOutcome::Duplicate => self.update(bo).await,
            outcome => Ok(outcome),
        }
    }

    /// Update, falling back to create when no row matched
    pub async fn update_or_create(&self, bo: &mut T) -> Result<DaoOutcome> {
        match self.update(bo).await? {
            DaoOutcome::NotFound => self.create(bo).await,
            outcome => Ok(outcome),
        }
    }

    // ========================================================================
    // Reads
    // ========================================================================

    /// Fetch one BO by primary key
    #[instrument(skip_all, fields(operation = "get", table = %self.config.table_name))]
    pub async fn get(&self, id: &BoId) -> Result<Option<T>> {
        self.check_id(id)?;
        let sql = self.mapper.generate_select(self.table_name());
        let found = self
            .select(Operation::Get, &sql, id.values().to_vec())
            .await?;
        Ok(found.into_iter().next())
    }

    /// Fetch several BOs by primary key, in `ids` order; absent ids are skipped
    pub async fn get_many(&self, ids: &[BoId]) -> Result<Vec<T>> {
        let mut result = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(bo) = self.get(id).await? {
                result.push(bo);
            }
        }
        Ok(result)
    }

    /// Stream every row in the table, in no particular order
    ///
    /// The stream is single-pass; dropping it early releases the underlying
    /// cursor.
    pub fn get_all(&self) -> impl Stream<Item = Result<T>> + Send + use<T, E> {
        let sql = self.mapper.generate_select_all_unsorted(self.table_name());
        self.stream(sql)
    }

    /// Stream every row in the table, ordered by primary key
    pub fn get_all_sorted(&self) -> impl Stream<Item = Result<T>> + Send + use<T, E> {
        let sql = self.mapper.generate_select_all(self.table_name());
        self.stream(sql)
    }

    /// Fetch every BO matching `filter`, ordered by primary key
    ///
    /// A filter that renders to nothing (such as an empty combinator)
    /// matches every row.
    #[instrument(skip_all, fields(operation = "find", table = %self.config.table_name))]
    pub async fn find(&self, filter: &Filter) -> Result<Vec<T>> {
        let rendered = filter.render();
        let sql = self
            .mapper
            .generate_select_where(self.table_name(), &rendered.where_clause());
        self.select(Operation::Find, &sql, rendered.bind_values).await
    }

    /// Count rows, optionally restricted by `filter`
    #[instrument(skip_all, fields(operation = "count", table = %self.config.table_name))]
    pub async fn count(&self, filter: Option<&Filter>) -> Result<i64> {
        let rendered = filter.map(Filter::render).unwrap_or_default();
        let sql = self
            .mapper
            .generate_count(self.table_name(), &rendered.where_clause());

        let rows = self
            .query(Operation::Count, &sql, rendered.bind_values)
            .await?;
        match rows.first() {
            Some(row) => Ok(row.get_i64("total")?.unwrap_or(0)),
            None => Ok(0),
        }
    }

    // ========================================================================
    // Execution helpers
    // ========================================================================

    fn check_id(&self, id: &BoId) -> Result<()> {
        let expected = self.mapper.primary_key_columns().len();
        if id.len() != expected {
            return Err(DaoError::configuration(format!(
                "Id has {} value(s) but table '{}' has {} primary-key column(s)",
                id.len(),
                self.table_name(),
                expected
            )));
        }
        Ok(())
    }

    fn context(&self, operation: Operation, sql: &str, params: Vec<SqlValue>) -> ExecutionContext {
        ExecutionContext::new(operation, self.table_name(), sql, params)
    }

    async fn execute(&self, operation: Operation, sql: &str, params: Vec<SqlValue>) -> Result<u64> {
        trace!(sql, params = ?params, "Binding statement");
        let started = Instant::now();

        match self.executor.execute(sql, &params).await {
            Ok(rows) => {
                debug!(
                    sql,
                    binds = params.len(),
                    rows,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Statement executed"
                );
                Ok(rows)
            }
            Err(source) => Err(DaoError::execution(
                self.context(operation, sql, params),
                source,
            )),
        }
    }

    async fn query(
        &self,
        operation: Operation,
        sql: &str,
        params: Vec<SqlValue>,
    ) -> Result<Vec<E::Row>> {
        trace!(sql, params = ?params, "Binding query");
        let started = Instant::now();

        match self.executor.execute_select(sql, &params).await {
            Ok(rows) => {
                debug!(
                    sql,
                    binds = params.len(),
                    rows = rows.len(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Query executed"
                );
                Ok(rows)
            }
            Err(source) => Err(DaoError::execution(
                self.context(operation, sql, params),
                source,
            )),
        }
    }

    async fn select(&self, operation: Operation, sql: &str, params: Vec<SqlValue>) -> Result<Vec<T>> {
        self.query(operation, sql, params)
            .await?
            .iter()
            .map(|row| self.mapper.map_row(row))
            .collect()
    }

    fn stream(&self, sql: Arc<str>) -> impl Stream<Item = Result<T>> + Send + use<T, E> {
        debug!(sql = %sql, table = %self.table_name(), "Streaming rows");
        let rows = self.executor.execute_select_stream(&sql, &[]);
        let mapper = Arc::clone(&self.mapper);
        let table = self.config.table_name.clone();

        rows.map(move |row| match row {
            Ok(row) => mapper.map_row(&row),
            Err(source) => Err(DaoError::execution(
                ExecutionContext::new(Operation::GetAll, table.as_str(), &*sql, Vec::new()),
                source,
            )),
        })
    }
}

impl<T, E: std::fmt::Debug> std::fmt::Debug for GenericBoDao<T, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenericBoDao")
            .field("table", &self.config.table_name)
            .field("mapper", &self.mapper)
            .field("executor", &self.executor)
            .finish()
    }
}
