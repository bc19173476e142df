//! Core type definitions for the BO mapper
//!
//! Includes attribute semantic types, SQL values, and the conversion traits
//! used by column accessors.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{DaoError, ValueError};

// ============================================================================
// Attribute Semantic Types
// ============================================================================

/// Semantic type of a mapped BO attribute
///
/// Determines which typed row accessor is used when a row is converted into
/// an entity.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum AttrType {
    /// BOOLEAN
    Boolean,
    /// SMALLINT (i16)
    SmallInt,
    /// INTEGER (i32)
    Integer,
    /// BIGINT (i64)
    BigInt,
    /// REAL (f32)
    Float,
    /// DOUBLE PRECISION (f64)
    Double,
    /// NUMERIC
    Decimal,
    /// TEXT / VARCHAR
    String,
    /// BYTEA
    Bytes,
    /// Large binary object, read through the byte-sequence accessor
    Blob,
    /// Large character object, read through the string accessor
    Clob,
    /// UUID
    Uuid,
    /// TIMESTAMP WITH TIME ZONE, always UTC
    Timestamp,
    /// DATE
    Date,
    /// TIME
    Time,
    /// JSONB
    Json,
}

impl AttrType {
    /// Lowercase name, as accepted by [`AttrType::from_str`]
    pub fn name(self) -> &'static str {
        match self {
            AttrType::Boolean => "boolean",
            AttrType::SmallInt => "smallint",
            AttrType::Integer => "integer",
            AttrType::BigInt => "bigint",
            AttrType::Float => "float",
            AttrType::Double => "double",
            AttrType::Decimal => "decimal",
            AttrType::String => "string",
            AttrType::Bytes => "bytes",
            AttrType::Blob => "blob",
            AttrType::Clob => "clob",
            AttrType::Uuid => "uuid",
            AttrType::Timestamp => "timestamp",
            AttrType::Date => "date",
            AttrType::Time => "time",
            AttrType::Json => "json",
        }
    }
}

impl fmt::Display for AttrType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for AttrType {
    type Err = DaoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "boolean" | "bool" => Ok(AttrType::Boolean),
            "smallint" | "short" => Ok(AttrType::SmallInt),
            "integer" | "int" => Ok(AttrType::Integer),
            "bigint" | "long" => Ok(AttrType::BigInt),
            "float" | "real" => Ok(AttrType::Float),
            "double" => Ok(AttrType::Double),
            "decimal" | "numeric" => Ok(AttrType::Decimal),
            "string" | "text" => Ok(AttrType::String),
            "bytes" | "bytea" => Ok(AttrType::Bytes),
            "blob" => Ok(AttrType::Blob),
            "clob" => Ok(AttrType::Clob),
            "uuid" => Ok(AttrType::Uuid),
            "timestamp" => Ok(AttrType::Timestamp),
            "date" => Ok(AttrType::Date),
            "time" => Ok(AttrType::Time),
            "json" | "jsonb" => Ok(AttrType::Json),
            other => Err(DaoError::configuration(format!(
                "Unsupported attribute type '{}'",
                other
            ))),
        }
    }
}

// ============================================================================
// SQL Values
// ============================================================================

/// A bind value or raw column value
///
/// `Null` carries the column's semantic type when it is known so that
/// drivers which type their parameters can bind a correctly typed NULL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum SqlValue {
    Null(Option<AttrType>),
    Bool(bool),
    SmallInt(i16),
    Int(i32),
    BigInt(i64),
    Float(f32),
    Double(f64),
    Decimal(Decimal),
    String(String),
    Bytes(Vec<u8>),
    Uuid(Uuid),
    Timestamp(DateTime<Utc>),
    Date(NaiveDate),
    Time(NaiveTime),
    Json(serde_json::Value),
}

impl SqlValue {
    /// Untyped NULL
    pub const fn null() -> Self {
        SqlValue::Null(None)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null(_))
    }

    /// Name of the variant, used in error messages
    pub fn kind(&self) -> &'static str {
        match self {
            SqlValue::Null(_) => "null",
            SqlValue::Bool(_) => "boolean",
            SqlValue::SmallInt(_) => "smallint",
            SqlValue::Int(_) => "integer",
            SqlValue::BigInt(_) => "bigint",
            SqlValue::Float(_) => "float",
            SqlValue::Double(_) => "double",
            SqlValue::Decimal(_) => "decimal",
            SqlValue::String(_) => "string",
            SqlValue::Bytes(_) => "bytes",
            SqlValue::Uuid(_) => "uuid",
            SqlValue::Timestamp(_) => "timestamp",
            SqlValue::Date(_) => "date",
            SqlValue::Time(_) => "time",
            SqlValue::Json(_) => "json",
        }
    }

    /// Attach a semantic type to an untyped NULL; other values pass through
    pub fn typed(self, attr_type: AttrType) -> Self {
        match self {
            SqlValue::Null(None) => SqlValue::Null(Some(attr_type)),
            other => other,
        }
    }

    /// Convert a value produced by an attribute getter into the variant the
    /// declared column type reads back
    ///
    /// Wider integers narrow to `SmallInt`/`Integer` and `Double` narrows to
    /// `Float` only when no information is lost. NULLs take the column type.
    pub fn coerce(self, attr_type: AttrType) -> Result<Self, ValueError> {
        match (self, attr_type) {
            (SqlValue::Null(_), _) => Ok(SqlValue::Null(Some(attr_type))),
            (SqlValue::BigInt(v), AttrType::Integer) => i32::try_from(v)
                .map(SqlValue::Int)
                .map_err(|_| ValueError::out_of_range(v, "bigint", attr_type)),
            (SqlValue::BigInt(v), AttrType::SmallInt) => i16::try_from(v)
                .map(SqlValue::SmallInt)
                .map_err(|_| ValueError::out_of_range(v, "bigint", attr_type)),
            (SqlValue::Int(v), AttrType::SmallInt) => i16::try_from(v)
                .map(SqlValue::SmallInt)
                .map_err(|_| ValueError::out_of_range(v, "integer", attr_type)),
            (SqlValue::Double(v), AttrType::Float) => {
                let narrowed = v as f32;
                if f64::from(narrowed) == v || v.is_nan() {
                    Ok(SqlValue::Float(narrowed))
                } else {
                    Err(ValueError::out_of_range(v, "double", attr_type))
                }
            }
            (value, _) => Ok(value),
        }
    }
}

impl From<&str> for SqlValue {
    fn from(v: &str) -> Self {
        SqlValue::String(v.to_string())
    }
}

// ============================================================================
// Accessor Conversion Traits
// ============================================================================

/// Converts an attribute value into a bind value
pub trait ToSqlValue {
    fn to_sql_value(&self) -> SqlValue;
}

/// Converts a raw column value into an attribute value
pub trait FromSqlValue: Sized {
    /// Whether values read for a column of `attr_type` can populate `Self`
    fn accepts(attr_type: AttrType) -> bool;

    fn from_sql_value(value: SqlValue) -> Result<Self, ValueError>;
}

macro_rules! impl_sql_value {
    ($ty:ty, $variant:ident, [$($accepts:ident),+]) => {
        impl From<$ty> for SqlValue {
            fn from(v: $ty) -> Self {
                SqlValue::$variant(v)
            }
        }

        impl ToSqlValue for $ty {
            fn to_sql_value(&self) -> SqlValue {
                SqlValue::$variant(self.clone())
            }
        }

        impl FromSqlValue for $ty {
            fn accepts(attr_type: AttrType) -> bool {
                matches!(attr_type, $(AttrType::$accepts)|+)
            }

            fn from_sql_value(value: SqlValue) -> Result<Self, ValueError> {
                match value {
                    SqlValue::$variant(v) => Ok(v),
                    other => Err(ValueError::mismatch(stringify!($ty), &other)),
                }
            }
        }
    };
}

impl_sql_value!(bool, Bool, [Boolean]);
impl_sql_value!(i16, SmallInt, [SmallInt]);
impl_sql_value!(f32, Float, [Float]);
impl_sql_value!(Decimal, Decimal, [Decimal]);
impl_sql_value!(String, String, [String, Clob]);
impl_sql_value!(Vec<u8>, Bytes, [Bytes, Blob]);
impl_sql_value!(Uuid, Uuid, [Uuid]);
impl_sql_value!(DateTime<Utc>, Timestamp, [Timestamp]);
impl_sql_value!(NaiveDate, Date, [Date]);
impl_sql_value!(NaiveTime, Time, [Time]);
impl_sql_value!(serde_json::Value, Json, [Json]);

// Integer and floating types widen losslessly when read.

impl From<i32> for SqlValue {
    fn from(v: i32) -> Self {
        SqlValue::Int(v)
    }
}

impl ToSqlValue for i32 {
    fn to_sql_value(&self) -> SqlValue {
        SqlValue::Int(*self)
    }
}

impl FromSqlValue for i32 {
    fn accepts(attr_type: AttrType) -> bool {
        matches!(attr_type, AttrType::SmallInt | AttrType::Integer)
    }

    fn from_sql_value(value: SqlValue) -> Result<Self, ValueError> {
        match value {
            SqlValue::SmallInt(v) => Ok(i32::from(v)),
            SqlValue::Int(v) => Ok(v),
            other => Err(ValueError::mismatch("i32", &other)),
        }
    }
}

impl From<i64> for SqlValue {
    fn from(v: i64) -> Self {
        SqlValue::BigInt(v)
    }
}

impl ToSqlValue for i64 {
    fn to_sql_value(&self) -> SqlValue {
        SqlValue::BigInt(*self)
    }
}

impl FromSqlValue for i64 {
    fn accepts(attr_type: AttrType) -> bool {
        matches!(
            attr_type,
            AttrType::SmallInt | AttrType::Integer | AttrType::BigInt
        )
    }

    fn from_sql_value(value: SqlValue) -> Result<Self, ValueError> {
        match value {
            SqlValue::SmallInt(v) => Ok(i64::from(v)),
            SqlValue::Int(v) => Ok(i64::from(v)),
            SqlValue::BigInt(v) => Ok(v),
            other => Err(ValueError::mismatch("i64", &other)),
        }
    }
}

impl From<f64> for SqlValue {
    fn from(v: f64) -> Self {
        SqlValue::Double(v)
    }
}

impl ToSqlValue for f64 {
    fn to_sql_value(&self) -> SqlValue {
        SqlValue::Double(*self)
    }
}

impl FromSqlValue for f64 {
    fn accepts(attr_type: AttrType) -> bool {
        matches!(attr_type, AttrType::Float | AttrType::Double)
    }

    fn from_sql_value(value: SqlValue) -> Result<Self, ValueError> {
        match value {
            SqlValue::Float(v) => Ok(f64::from(v)),
            SqlValue::Double(v) => Ok(v),
            other => Err(ValueError::mismatch("f64", &other)),
        }
    }
}

impl<T: ToSqlValue> ToSqlValue for Option<T> {
    fn to_sql_value(&self) -> SqlValue {
        match self {
            Some(v) => v.to_sql_value(),
            None => SqlValue::null(),
        }
    }
}

impl<T: FromSqlValue> FromSqlValue for Option<T> {
    fn accepts(attr_type: AttrType) -> bool {
        T::accepts(attr_type)
    }

    fn from_sql_value(value: SqlValue) -> Result<Self, ValueError> {
        match value {
            SqlValue::Null(_) => Ok(None),
            other => T::from_sql_value(other).map(Some),
        }
    }
}

impl ToSqlValue for SqlValue {
    fn to_sql_value(&self) -> SqlValue {
        self.clone()
    }
}

impl FromSqlValue for SqlValue {
    fn accepts(_attr_type: AttrType) -> bool {
        true
    }

    fn from_sql_value(value: SqlValue) -> Result<Self, ValueError> {
        Ok(value)
    }
}
