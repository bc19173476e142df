//! Typed access to result rows
//!
//! The row mapper reads every column through [`SqlRow`], choosing the
//! accessor from the column's [`AttrType`]. Accessors return `Ok(None)` for
//! SQL NULL.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use rust_decimal::Decimal;
use sqlx::Row;
use sqlx::postgres::PgRow;
use uuid::Uuid;

use crate::error::{DaoError, Result};
use crate::types::{AttrType, FromSqlValue, SqlValue};

/// A single result row with typed, by-name column accessors
pub trait SqlRow {
    fn get_bool(&self, column: &str) -> Result<Option<bool>>;
    fn get_i16(&self, column: &str) -> Result<Option<i16>>;
    fn get_i32(&self, column: &str) -> Result<Option<i32>>;
    fn get_i64(&self, column: &str) -> Result<Option<i64>>;
    fn get_f32(&self, column: &str) -> Result<Option<f32>>;
    fn get_f64(&self, column: &str) -> Result<Option<f64>>;
    fn get_decimal(&self, column: &str) -> Result<Option<Decimal>>;
    fn get_string(&self, column: &str) -> Result<Option<String>>;
    fn get_bytes(&self, column: &str) -> Result<Option<Vec<u8>>>;
    fn get_uuid(&self, column: &str) -> Result<Option<Uuid>>;
    fn get_timestamp(&self, column: &str) -> Result<Option<DateTime<Utc>>>;
    fn get_date(&self, column: &str) -> Result<Option<NaiveDate>>;
    fn get_time(&self, column: &str) -> Result<Option<NaiveTime>>;
    fn get_json(&self, column: &str) -> Result<Option<serde_json::Value>>;

    /// Read `column` with the accessor matching `attr_type`
    ///
    /// Large character objects go through the string accessor and large
    /// binary objects through the byte accessor. NULL comes back as a
    /// NULL typed with `attr_type`.
    fn get_value(&self, column: &str, attr_type: AttrType) -> Result<SqlValue> {
        let value = match attr_type {
            AttrType::Boolean => self.get_bool(column)?.map(SqlValue::Bool),
            AttrType::SmallInt => self.get_i16(column)?.map(SqlValue::SmallInt),
            AttrType::Integer => self.get_i32(column)?.map(SqlValue::Int),
            AttrType::BigInt => self.get_i64(column)?.map(SqlValue::BigInt),
            AttrType::Float => self.get_f32(column)?.map(SqlValue::Float),
            AttrType::Double => self.get_f64(column)?.map(SqlValue::Double),
            AttrType::Decimal => self.get_decimal(column)?.map(SqlValue::Decimal),
            AttrType::String | AttrType::Clob => self.get_string(column)?.map(SqlValue::String),
            AttrType::Bytes | AttrType::Blob => self.get_bytes(column)?.map(SqlValue::Bytes),
            AttrType::Uuid => self.get_uuid(column)?.map(SqlValue::Uuid),
            AttrType::Timestamp => self.get_timestamp(column)?.map(SqlValue::Timestamp),
            AttrType::Date => self.get_date(column)?.map(SqlValue::Date),
            AttrType::Time => self.get_time(column)?.map(SqlValue::Time),
            AttrType::Json => self.get_json(column)?.map(SqlValue::Json),
        };
        Ok(value.unwrap_or(SqlValue::Null(Some(attr_type))))
    }
}

// ============================================================================
// PostgreSQL rows
// ============================================================================

macro_rules! pg_accessors {
    ($($name:ident => $ty:ty),+ $(,)?) => {
        $(
            fn $name(&self, column: &str) -> Result<Option<$ty>> {
                self.try_get::<Option<$ty>, _>(column)
                    .map_err(|e| DaoError::mapping(column, e.to_string()))
            }
        )+
    };
}

impl SqlRow for PgRow {
    pg_accessors! {
        get_bool => bool,
        get_i16 => i16,
        get_i32 => i32,
        get_i64 => i64,
        get_f32 => f32,
        get_f64 => f64,
        get_decimal => Decimal,
        get_string => String,
        get_bytes => Vec<u8>,
        get_uuid => Uuid,
        get_timestamp => DateTime<Utc>,
        get_date => NaiveDate,
        get_time => NaiveTime,
        get_json => serde_json::Value,
    }
}

// ============================================================================
// In-memory rows
// ============================================================================

/// Ordered in-memory row of `(column, value)` pairs
///
/// Useful for adapting drivers other than sqlx and for tests. Integer and
/// floating columns widen losslessly (an `Int` value reads fine through
/// [`SqlRow::get_i64`]).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MapRow {
    columns: Vec<(String, SqlValue)>,
}

impl MapRow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a column, replacing any earlier value under the same name
    pub fn with(mut self, column: impl Into<String>, value: impl Into<SqlValue>) -> Self {
        self.set(column, value);
        self
    }

    pub fn set(&mut self, column: impl Into<String>, value: impl Into<SqlValue>) {
        let column = column.into();
        let value = value.into();
        match self.columns.iter_mut().find(|(name, _)| *name == column) {
            Some((_, existing)) => *existing = value,
            None => self.columns.push((column, value)),
        }
    }

    pub fn get(&self, column: &str) -> Option<&SqlValue> {
        self.columns
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    fn read<V: FromSqlValue>(&self, column: &str) -> Result<Option<V>> {
        let value = self
            .get(column)
            .ok_or_else(|| DaoError::mapping(column, "column not present in row"))?;
        Option::<V>::from_sql_value(value.clone())
            .map_err(|e| DaoError::mapping(column, e.to_string()))
    }
}

impl<C: Into<String>> FromIterator<(C, SqlValue)> for MapRow {
    fn from_iter<I: IntoIterator<Item = (C, SqlValue)>>(iter: I) -> Self {
        let mut row = MapRow::new();
        for (column, value) in iter {
            row.set(column, value);
        }
        row
    }
}

macro_rules! map_accessors {
    ($($name:ident => $ty:ty),+ $(,)?) => {
        $(
            fn $name(&self, column: &str) -> Result<Option<$ty>> {
                self.read::<$ty>(column)
            }
        )+
    };
}

impl SqlRow for MapRow {
    map_accessors! {
        get_bool => bool,
        get_i16 => i16,
        get_i32 => i32,
        get_i64 => i64,
        get_f32 => f32,
        get_f64 => f64,
        get_decimal => Decimal,
        get_string => String,
        get_bytes => Vec<u8>,
        get_uuid => Uuid,
        get_timestamp => DateTime<Utc>,
        get_date => NaiveDate,
        get_time => NaiveTime,
        get_json => serde_json::Value,
    }
}
