//! Row mapper: entity <-> row conversion and CRUD statement generation
//!
//! A [`RowMapper`] is built once per BO type and shared (usually behind an
//! `Arc`) by every DAO that stores that type. Generated statements are
//! memoized per table name.
//!
//! ```rust
//! use runtara_bo_dao::{AttrType, Bo, MappingTable, RowMapper, SqlValue};
//!
//! #[derive(Default)]
//! struct User {
//!     id: i64,
//!     name: String,
//! }
//!
//! impl Bo for User {}
//!
//! let mapper = RowMapper::builder(User::default)
//!     .mapping(
//!         MappingTable::builder()
//!             .column("id", "id", AttrType::BigInt, |u: &User| u.id, |u: &mut User, v| u.id = v)
//!             .column("name", "name", AttrType::String, |u: &User| u.name.clone(), |u: &mut User, v| u.name = v)
//!             .build()
//!             .unwrap(),
//!     )
//!     .primary_keys(["id"])
//!     .update_columns(["name"])
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(&*mapper.generate_update("users"), "UPDATE users SET name=? WHERE id=?");
//!
//! let user = User { id: 7, name: "Ann".into() };
//! assert_eq!(
//!     mapper.values_for_columns(&user, &["name", "id"]).unwrap(),
//!     vec![SqlValue::from("Ann"), SqlValue::BigInt(7)]
//! );
//! ```

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use tracing::warn;

use crate::entity::Bo;
use crate::error::{DaoError, Result};
use crate::mapping::MappingTable;
use crate::row::SqlRow;
use crate::sql::template::{StatementKind, TemplateCache, TemplateKey};
use crate::types::SqlValue;

type Factory<T> = Box<dyn Fn() -> T + Send + Sync>;

/// Converts rows into BOs and generates the CRUD statements for one BO type
pub struct RowMapper<T> {
    factory: Factory<T>,
    mapping: MappingTable<T>,
    primary_keys: Vec<String>,
    update_columns: Vec<String>,
    insert_columns: Vec<String>,
    all_columns: Vec<String>,
    checksum_column: Option<String>,
    templates: TemplateCache,
}

impl<T: 'static> RowMapper<T> {
    /// Start building a mapper; `factory` creates the blank BO each row is
    /// mapped into
    pub fn builder<F>(factory: F) -> RowMapperBuilder<T>
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        RowMapperBuilder::new(factory)
    }
}

impl<T> RowMapper<T> {
    pub fn mapping(&self) -> &MappingTable<T> {
        &self.mapping
    }

    pub fn primary_key_columns(&self) -> &[String] {
        &self.primary_keys
    }

    pub fn update_columns(&self) -> &[String] {
        &self.update_columns
    }

    /// Every mapped column, in mapping declaration order
    pub fn all_columns(&self) -> &[String] {
        &self.all_columns
    }

    /// Columns written by INSERT; all columns unless overridden
    pub fn insert_columns(&self) -> &[String] {
        &self.insert_columns
    }

    pub fn checksum_column(&self) -> Option<&str> {
        self.checksum_column.as_deref()
    }

    /// Number of statement templates generated so far
    pub fn cached_templates(&self) -> usize {
        self.templates.len()
    }

    // ========================================================================
    // Statement generation
    // ========================================================================

    /// `SELECT c1,c2 FROM t WHERE pk1=? AND pk2=?`
    pub fn generate_select(&self, table: &str) -> Arc<str> {
        self.cached(StatementKind::Select, table, || {
            format!(
                "SELECT {} FROM {} WHERE {}",
                self.all_columns.join(","),
                table,
                self.pk_condition()
            )
        })
    }

    /// `SELECT c1,c2 FROM t ORDER BY pk1,pk2`
    pub fn generate_select_all(&self, table: &str) -> Arc<str> {
        self.cached(StatementKind::SelectAll, table, || {
            format!(
                "SELECT {} FROM {} ORDER BY {}",
                self.all_columns.join(","),
                table,
                self.primary_keys.join(",")
            )
        })
    }

    /// `SELECT c1,c2 FROM t`, no ordering guarantee
    pub fn generate_select_all_unsorted(&self, table: &str) -> Arc<str> {
        self.cached(StatementKind::SelectAllUnsorted, table, || {
            format!("SELECT {} FROM {}", self.all_columns.join(","), table)
        })
    }

    /// `INSERT INTO t (c1,c2) VALUES (?,?)` over the insert columns
    pub fn generate_insert(&self, table: &str) -> Arc<str> {
        self.cached(StatementKind::Insert, table, || {
            format!(
                "INSERT INTO {} ({}) VALUES ({})",
                table,
                self.insert_columns.join(","),
                vec!["?"; self.insert_columns.len()].join(",")
            )
        })
    }

    /// `UPDATE t SET u1=?,u2=? WHERE pk1=? AND pk2=?`
    pub fn generate_update(&self, table: &str) -> Arc<str> {
        self.cached(StatementKind::Update, table, || {
            format!(
                "UPDATE {} SET {} WHERE {}",
                table,
                self.set_clause(),
                self.pk_condition()
            )
        })
    }

    /// Like [`generate_update`](Self::generate_update), additionally matching
    /// the checksum column: `... WHERE pk1=? AND checksum=?`
    pub fn generate_update_checked(&self, table: &str) -> Result<Arc<str>> {
        let checksum = self.checksum_column.as_deref().ok_or_else(|| {
            DaoError::configuration("Checked update requires a checksum column")
        })?;
        Ok(self.cached(StatementKind::UpdateChecked, table, || {
            format!(
                "UPDATE {} SET {} WHERE {} AND {}=?",
                table,
                self.set_clause(),
                self.pk_condition(),
                checksum
            )
        }))
    }

    /// `DELETE FROM t WHERE pk1=? AND pk2=?`
    pub fn generate_delete(&self, table: &str) -> Arc<str> {
        self.cached(StatementKind::Delete, table, || {
            format!("DELETE FROM {} WHERE {}", table, self.pk_condition())
        })
    }

    /// `SELECT c1,c2 FROM t<where_clause> ORDER BY pk1,pk2`
    ///
    /// `where_clause` is either empty or starts with ` WHERE `, as produced by
    /// [`Rendered::where_clause`](crate::sql::Rendered::where_clause). Not
    /// cached.
    pub fn generate_select_where(&self, table: &str, where_clause: &str) -> String {
        format!(
            "SELECT {} FROM {}{} ORDER BY {}",
            self.all_columns.join(","),
            table,
            where_clause,
            self.primary_keys.join(",")
        )
    }

    /// `SELECT COUNT(*) AS total FROM t<where_clause>`. Not cached.
    pub fn generate_count(&self, table: &str, where_clause: &str) -> String {
        format!("SELECT COUNT(*) AS total FROM {}{}", table, where_clause)
    }

    fn cached(&self, kind: StatementKind, table: &str, generate: impl FnOnce() -> String) -> Arc<str> {
        self.templates
            .get_or_generate(TemplateKey::new(kind, table), generate)
    }

    fn pk_condition(&self) -> String {
        self.primary_keys
            .iter()
            .map(|c| format!("{}=?", c))
            .collect::<Vec<_>>()
            .join(" AND ")
    }

    fn set_clause(&self) -> String {
        self.update_columns
            .iter()
            .map(|c| format!("{}=?", c))
            .collect::<Vec<_>>()
            .join(",")
    }

    // ========================================================================
    // Entity -> values
    // ========================================================================

    /// Bind values for `columns`, in order; unmapped columns yield NULL
    ///
    /// Each value is converted to its column's declared type; a value that
    /// does not fit is a [`DaoError::Mapping`].
    pub fn values_for_columns<S: AsRef<str>>(&self, bo: &T, columns: &[S]) -> Result<Vec<SqlValue>> {
        columns
            .iter()
            .map(|c| match self.mapping.get(c.as_ref()) {
                Some(attr) => attr.get(bo),
                None => Ok(SqlValue::null()),
            })
            .collect()
    }

    pub fn primary_key_values(&self, bo: &T) -> Result<Vec<SqlValue>> {
        self.values_for_columns(bo, &self.primary_keys)
    }

    /// Current value of the checksum attribute, if a checksum column is set
    pub fn checksum_value(&self, bo: &T) -> Result<Option<SqlValue>> {
        let Some(column) = self.checksum_column.as_deref() else {
            return Ok(None);
        };
        self.mapping.get(column).map(|attr| attr.get(bo)).transpose()
    }
}

impl<T: Bo> RowMapper<T> {
    /// Build a BO from a result row
    ///
    /// Every mapped column is read with the accessor for its attribute type.
    /// On success the BO is marked clean; on any failure the partially
    /// populated BO is dropped.
    pub fn map_row<R: SqlRow + ?Sized>(&self, row: &R) -> Result<T> {
        let mut bo = (self.factory)();
        for attr in self.mapping.attrs() {
            let value = row.get_value(attr.column(), attr.attr_type())?;
            attr.set(&mut bo, value)?;
        }
        self.mark_persisted(&mut bo)?;
        Ok(bo)
    }

    /// Mark `bo` clean and snapshot its checksum as the stored one
    pub fn mark_persisted(&self, bo: &mut T) -> Result<()> {
        let checksum = self.checksum_value(bo)?.filter(|v| !v.is_null());
        if let Some(state) = bo.state_mut() {
            state.mark_clean();
            state.set_checksum(checksum);
        }
        Ok(())
    }

    /// Checksum the stored row is expected to carry: the snapshot taken at
    /// load/save time, else the BO's current checksum attribute
    pub fn expected_checksum(&self, bo: &T) -> Result<Option<SqlValue>> {
        match bo.state().and_then(|s| s.checksum()) {
            Some(snapshot) => Ok(Some(snapshot.clone())),
            None => self.checksum_value(bo),
        }
    }
}

impl<T> fmt::Debug for RowMapper<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RowMapper")
            .field("primary_keys", &self.primary_keys)
            .field("update_columns", &self.update_columns)
            .field("insert_columns", &self.insert_columns)
            .field("checksum_column", &self.checksum_column)
            .field("mapping", &self.mapping)
            .finish_non_exhaustive()
    }
}

/// Builder for RowMapper
pub struct RowMapperBuilder<T> {
    factory: Factory<T>,
    mapping: Option<MappingTable<T>>,
    primary_keys: Vec<String>,
    update_columns: Option<Vec<String>>,
    insert_columns: Option<Vec<String>>,
    checksum_column: Option<String>,
}

impl<T: 'static> RowMapperBuilder<T> {
    pub fn new<F>(factory: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        Self {
            factory: Box::new(factory),
            mapping: None,
            primary_keys: Vec::new(),
            update_columns: None,
            insert_columns: None,
            checksum_column: None,
        }
    }

    pub fn mapping(mut self, mapping: MappingTable<T>) -> Self {
        self.mapping = Some(mapping);
        self
    }

    pub fn primary_keys<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.primary_keys = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Columns written by UPDATE (default: every non-key column)
    pub fn update_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.update_columns = Some(columns.into_iter().map(Into::into).collect());
        self
    }

    /// Columns written by INSERT (default: every mapped column)
    pub fn insert_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.insert_columns = Some(columns.into_iter().map(Into::into).collect());
        self
    }

    /// Enable optimistic concurrency checks on update
    pub fn checksum_column(mut self, column: impl Into<String>) -> Self {
        self.checksum_column = Some(column.into());
        self
    }

    pub fn build(self) -> Result<RowMapper<T>> {
        self.try_build()
            .inspect_err(|e| warn!(error = %e, "Row mapper configuration rejected"))
    }

    fn try_build(self) -> Result<RowMapper<T>> {
        let mapping = self
            .mapping
            .ok_or_else(|| DaoError::configuration("Row mapper requires a mapping table"))?;

        if self.primary_keys.is_empty() {
            return Err(DaoError::configuration(
                "Row mapper requires at least one primary-key column",
            ));
        }

        let all_columns: Vec<String> = mapping.columns().map(str::to_string).collect();
        let update_columns = self.update_columns.unwrap_or_else(|| {
            all_columns
                .iter()
                .filter(|c| !self.primary_keys.contains(*c))
                .cloned()
                .collect()
        });
        let insert_columns = self.insert_columns.unwrap_or_else(|| all_columns.clone());

        check_columns(&mapping, "primary-key", &self.primary_keys)?;
        check_columns(&mapping, "update", &update_columns)?;
        check_columns(&mapping, "insert", &insert_columns)?;
        if insert_columns.is_empty() {
            return Err(DaoError::configuration("Insert column list cannot be empty"));
        }
        if let Some(checksum) = &self.checksum_column {
            check_columns(&mapping, "checksum", std::slice::from_ref(checksum))?;
        }

        Ok(RowMapper {
            factory: self.factory,
            mapping,
            primary_keys: self.primary_keys,
            update_columns,
            insert_columns,
            all_columns,
            checksum_column: self.checksum_column,
            templates: TemplateCache::new(),
        })
    }
}

fn check_columns<T>(mapping: &MappingTable<T>, role: &str, columns: &[String]) -> Result<()> {
    let mut seen = HashSet::with_capacity(columns.len());
    for column in columns {
        if !mapping.contains(column) {
            return Err(DaoError::configuration(format!(
                "Unknown {} column '{}': not in mapping table",
                role, column
            )));
        }
        if !seen.insert(column.as_str()) {
            return Err(DaoError::configuration(format!(
                "Duplicate {} column '{}'",
                role, column
            )));
        }
    }
    Ok(())
}
