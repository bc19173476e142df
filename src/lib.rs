//! # runtara-bo-dao
//!
//! A generic business-object (BO) data-access layer.
//!
//! This crate maps plain Rust structs onto relational table rows and back,
//! generates parameterized CRUD statements for them, and composes filter
//! predicates for dynamic queries. Statement execution is delegated to a
//! [`SqlExecutor`]; a PostgreSQL implementation over `sqlx` is included.
//!
//! ## Features
//!
//! - **Mapping Tables**: Column-to-attribute mappings with typed, compile-time accessors
//! - **Cached SQL Generation**: SELECT/INSERT/UPDATE/DELETE templates memoized per table
//! - **Predicate Trees**: AND/OR filter composition with ordered bind values
//! - **Upsert Helpers**: `create_or_update` / `update_or_create` built on explicit outcomes
//! - **Optimistic Concurrency**: Checksum-guarded updates report stale writes as `NotFound`
//! - **Lazy Streaming**: `get_all` yields BOs one row at a time
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use futures_util::StreamExt;
//! use runtara_bo_dao::{
//!     AttrType, Bo, BoId, DaoConfig, DaoOutcome, GenericBoDao, MappingTable, PgExecutor, RowMapper,
//! };
//! use runtara_bo_dao::sql::filter;
//!
//! #[derive(Debug, Default)]
//! struct User {
//!     id: i64,
//!     name: String,
//! }
//!
//! impl Bo for User {}
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mapper = RowMapper::builder(User::default)
//!         .mapping(
//!             MappingTable::builder()
//!                 .column("id", "id", AttrType::BigInt, |u: &User| u.id, |u: &mut User, v| u.id = v)
//!                 .column("name", "name", AttrType::String, |u: &User| u.name.clone(), |u: &mut User, v| u.name = v)
//!                 .build()?,
//!         )
//!         .primary_keys(["id"])
//!         .update_columns(["name"])
//!         .build()?;
//!
//!     let executor = PgExecutor::connect("postgres://localhost/mydb").await?;
//!     let dao = GenericBoDao::new(Arc::new(mapper), executor, DaoConfig::builder("users").build()?);
//!
//!     let mut ann = User { id: 7, name: "Ann".into() };
//!     assert_eq!(dao.create_or_update(&mut ann).await?, DaoOutcome::Successful);
//!
//!     let loaded = dao.get(&BoId::from(7)).await?;
//!     let named_ann = dao.find(&filter::eq("name", "Ann")).await?;
//!
//!     let mut all = dao.get_all_sorted();
//!     while let Some(user) = all.next().await {
//!         println!("{:?}", user?);
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Filters
//!
//! Filters render to a WHERE fragment with `?` placeholders plus the bind
//! values in placeholder order:
//!
//! ```rust
//! use runtara_bo_dao::sql::filter::{self, Filter};
//!
//! let rendered = Filter::and(vec![filter::gte("age", 18i64), filter::like("name", "A%")]).render();
//! assert_eq!(rendered.clause.as_deref(), Some("(age >= ?) AND (name LIKE ?)"));
//! assert_eq!(rendered.bind_values.len(), 2);
//! ```
//!
//! An AND/OR combinator with no children renders to nothing and therefore
//! matches every row.
//!
//! ## Logging
//!
//! All DAO calls emit `tracing` spans and events. Statements are logged at
//! `debug` with timings; bind values only at `trace`.

pub mod config;
pub mod dao;
pub mod entity;
pub mod error;
pub mod executor;
pub mod mapper;
pub mod mapping;
pub mod row;
pub mod sql;
pub mod types;

// Re-export main types for convenience
pub use config::{DaoConfig, DaoConfigBuilder};
pub use dao::{DaoOutcome, GenericBoDao};
pub use entity::{Bo, BoId, BoState};
pub use error::{DaoError, ExecutionContext, ExecutorError, Operation, Result, ValueError};
pub use executor::{PgExecutor, SqlExecutor};
pub use mapper::{RowMapper, RowMapperBuilder};
pub use mapping::{ColumnAttr, MappingTable, MappingTableBuilder};
pub use row::{MapRow, SqlRow};
pub use types::{AttrType, FromSqlValue, SqlValue, ToSqlValue};

// Re-export SQL utilities for advanced users
pub use sql::filter::{Combine, DatabaseVendor, Filter, Operand, RawExpression, Rendered};
pub use sql::sanitize::{quote_identifier, validate_identifier, validate_table_name};
