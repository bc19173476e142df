//! Error types for DAO operations

use std::fmt;

use thiserror::Error;

use crate::types::{AttrType, SqlValue};

/// Errors that can occur during mapping and DAO operations
#[derive(Debug, Error)]
pub enum DaoError {
    /// Schema/programming mismatch in a mapping descriptor; never retried
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Row-to-entity conversion failed; the partial entity is discarded
    #[error("Mapping error on column '{column}': {message}")]
    Mapping { column: String, message: String },

    /// The SQL-execution collaborator reported a failure
    #[error("{context} failed: {source}")]
    Execution {
        context: ExecutionContext,
        #[source]
        source: ExecutorError,
    },
}

impl DaoError {
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    pub fn mapping(column: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Mapping {
            column: column.into(),
            message: msg.into(),
        }
    }

    pub fn execution(context: ExecutionContext, source: ExecutorError) -> Self {
        Self::Execution { context, source }
    }

    /// Whether the executor reported a unique-key violation
    pub fn is_unique_violation(&self) -> bool {
        matches!(self, Self::Execution { source, .. } if source.is_unique_violation())
    }

    /// SQL text involved in an execution failure
    pub fn sql(&self) -> Option<&str> {
        match self {
            Self::Execution { context, .. } => Some(context.sql()),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, DaoError>;

/// Errors reported by a SQL-execution collaborator
#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error("Unique constraint violation: {0}")]
    UniqueViolation(String),

    #[error("SQL error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Executor error: {0}")]
    Other(String),
}

impl ExecutorError {
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }

    pub fn is_unique_violation(&self) -> bool {
        matches!(self, Self::UniqueViolation(_))
    }
}

/// Value conversion failure between a [`SqlValue`] and an attribute type
#[derive(Debug, Error)]
pub enum ValueError {
    #[error("expected {expected}, got {found}")]
    Mismatch {
        expected: &'static str,
        found: &'static str,
    },

    #[error("{found} value {value} does not fit {target} without loss")]
    OutOfRange {
        found: &'static str,
        value: String,
        target: AttrType,
    },
}

impl ValueError {
    pub fn mismatch(expected: &'static str, found: &SqlValue) -> Self {
        Self::Mismatch {
            expected,
            found: found.kind(),
        }
    }

    pub fn out_of_range(value: impl fmt::Display, found: &'static str, target: AttrType) -> Self {
        Self::OutOfRange {
            found,
            value: value.to_string(),
            target,
        }
    }
}

/// Kind of DAO operation, recorded on execution failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Create,
    Update,
    Delete,
    Get,
    GetAll,
    Find,
    Count,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::Create => "create",
            Operation::Update => "update",
            Operation::Delete => "delete",
            Operation::Get => "get",
            Operation::GetAll => "get_all",
            Operation::Find => "find",
            Operation::Count => "count",
        };
        f.write_str(name)
    }
}

/// Diagnostic context of a failed statement
///
/// Bind values are kept for diagnostics but never rendered by `Display` or
/// `Debug`, since they may contain sensitive data.
#[derive(Clone)]
pub struct ExecutionContext {
    operation: Operation,
    table: String,
    sql: String,
    bind_values: Vec<SqlValue>,
}

impl ExecutionContext {
    pub fn new(
        operation: Operation,
        table: impl Into<String>,
        sql: impl Into<String>,
        bind_values: Vec<SqlValue>,
    ) -> Self {
        Self {
            operation,
            table: table.into(),
            sql: sql.into(),
            bind_values,
        }
    }

    pub fn operation(&self) -> Operation {
        self.operation
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn bind_values(&self) -> &[SqlValue] {
        &self.bind_values
    }
}

impl fmt::Display for ExecutionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} on table '{}'", self.operation, self.table)
    }
}

impl fmt::Debug for ExecutionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("operation", &self.operation)
            .field("table", &self.table)
            .field("sql", &self.sql)
            .field("bind_values", &format_args!("<{} redacted>", self.bind_values.len()))
            .finish()
    }
}
