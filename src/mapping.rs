//! Column-attribute mapping tables
//!
//! A [`MappingTable`] is the single source of truth for how a BO type maps
//! onto table columns. Accessors are plain closures known at compile time.
//!
//! ```rust
//! use runtara_bo_dao::{AttrType, Bo, MappingTable};
//!
//! #[derive(Default)]
//! struct User {
//!     id: i64,
//!     name: String,
//! }
//!
//! impl Bo for User {}
//!
//! let table = MappingTable::<User>::builder()
//!     .column("id", "id", AttrType::BigInt, |u: &User| u.id, |u: &mut User, v| u.id = v)
//!     .column("name", "name", AttrType::String, |u: &User| u.name.clone(), |u: &mut User, v| u.name = v)
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(table.columns().collect::<Vec<_>>(), vec!["id", "name"]);
//! ```

use std::collections::HashMap;
use std::fmt;

use crate::error::{DaoError, Result, ValueError};
use crate::sql::sanitize::validate_identifier;
use crate::types::{AttrType, FromSqlValue, SqlValue, ToSqlValue};

type Getter<T> = Box<dyn Fn(&T) -> std::result::Result<SqlValue, ValueError> + Send + Sync>;
type Setter<T> = Box<dyn Fn(&mut T, SqlValue) -> std::result::Result<(), ValueError> + Send + Sync>;

/// One table column mapped onto one BO attribute
pub struct ColumnAttr<T> {
    column: String,
    attr: String,
    attr_type: AttrType,
    value_type: &'static str,
    accepts: fn(AttrType) -> bool,
    getter: Getter<T>,
    setter: Setter<T>,
}

impl<T: 'static> ColumnAttr<T> {
    /// Create a mapping from typed accessors
    ///
    /// `V` is the Rust type of the attribute; it must be able to hold values
    /// read for `attr_type` (checked when the table is built).
    pub fn new<V, G, S>(
        column: impl Into<String>,
        attr: impl Into<String>,
        attr_type: AttrType,
        get: G,
        set: S,
    ) -> Self
    where
        V: ToSqlValue + FromSqlValue + 'static,
        G: Fn(&T) -> V + Send + Sync + 'static,
        S: Fn(&mut T, V) + Send + Sync + 'static,
    {
        Self {
            column: column.into(),
            attr: attr.into(),
            attr_type,
            value_type: std::any::type_name::<V>(),
            accepts: V::accepts,
            getter: Box::new(move |bo| get(bo).to_sql_value().coerce(attr_type)),
            setter: Box::new(move |bo, value| {
                set(bo, V::from_sql_value(value)?);
                Ok(())
            }),
        }
    }
}

impl<T> ColumnAttr<T> {
    pub fn column(&self) -> &str {
        &self.column
    }

    pub fn attr(&self) -> &str {
        &self.attr
    }

    pub fn attr_type(&self) -> AttrType {
        self.attr_type
    }

    /// Read the attribute's current value from a BO, converted to the
    /// column's declared type
    pub fn get(&self, bo: &T) -> Result<SqlValue> {
        (self.getter)(bo).map_err(|e| {
            DaoError::mapping(
                &self.column,
                format!("cannot bind attribute '{}': {}", self.attr, e),
            )
        })
    }

    /// Write a raw column value into the BO attribute
    pub fn set(&self, bo: &mut T, value: SqlValue) -> Result<()> {
        (self.setter)(bo, value).map_err(|e| {
            DaoError::mapping(
                &self.column,
                format!("cannot populate attribute '{}': {}", self.attr, e),
            )
        })
    }
}

impl<T> fmt::Debug for ColumnAttr<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ColumnAttr")
            .field("column", &self.column)
            .field("attr", &self.attr)
            .field("attr_type", &self.attr_type)
            .field("value_type", &self.value_type)
            .finish()
    }
}

/// Ordered, immutable `column -> attribute` mapping for one BO type
pub struct MappingTable<T> {
    attrs: Vec<ColumnAttr<T>>,
    by_column: HashMap<String, usize>,
}

impl<T: 'static> MappingTable<T> {
    pub fn builder() -> MappingTableBuilder<T> {
        MappingTableBuilder::new()
    }
}

impl<T> MappingTable<T> {
    /// Column names in declaration order
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.attrs.iter().map(|a| a.column.as_str())
    }

    pub fn attrs(&self) -> &[ColumnAttr<T>] {
        &self.attrs
    }

    pub fn get(&self, column: &str) -> Option<&ColumnAttr<T>> {
        self.by_column.get(column).map(|&i| &self.attrs[i])
    }

    pub fn contains(&self, column: &str) -> bool {
        self.by_column.contains_key(column)
    }

    pub fn len(&self) -> usize {
        self.attrs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attrs.is_empty()
    }
}

impl<T> fmt::Debug for MappingTable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.attrs.iter()).finish()
    }
}

/// Builder for MappingTable
pub struct MappingTableBuilder<T> {
    attrs: Vec<ColumnAttr<T>>,
}

impl<T: 'static> MappingTableBuilder<T> {
    pub fn new() -> Self {
        Self { attrs: Vec::new() }
    }

    /// Map `column` to attribute `attr` through a getter/setter pair
    pub fn column<V, G, S>(
        mut self,
        column: impl Into<String>,
        attr: impl Into<String>,
        attr_type: AttrType,
        get: G,
        set: S,
    ) -> Self
    where
        V: ToSqlValue + FromSqlValue + 'static,
        G: Fn(&T) -> V + Send + Sync + 'static,
        S: Fn(&mut T, V) + Send + Sync + 'static,
    {
        self.attrs
            .push(ColumnAttr::new(column, attr, attr_type, get, set));
        self
    }

    /// Add a prepared ColumnAttr
    pub fn attr(mut self, attr: ColumnAttr<T>) -> Self {
        self.attrs.push(attr);
        self
    }

    /// Validate and freeze the table
    pub fn build(self) -> Result<MappingTable<T>> {
        if self.attrs.is_empty() {
            return Err(DaoError::configuration(
                "Mapping table must contain at least one column",
            ));
        }

        let mut by_column = HashMap::with_capacity(self.attrs.len());
        for (i, attr) in self.attrs.iter().enumerate() {
            validate_identifier(&attr.column, &[]).map_err(DaoError::Configuration)?;

            if !(attr.accepts)(attr.attr_type) {
                return Err(DaoError::configuration(format!(
                    "Attribute '{}' of type {} cannot hold values of column '{}' ({})",
                    attr.attr, attr.value_type, attr.column, attr.attr_type
                )));
            }

            if by_column.insert(attr.column.clone(), i).is_some() {
                return Err(DaoError::configuration(format!(
                    "Column '{}' is mapped more than once",
                    attr.column
                )));
            }
        }

        Ok(MappingTable {
            attrs: self.attrs,
            by_column,
        })
    }
}

impl<T: 'static> Default for MappingTableBuilder<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default, PartialEq)]
    struct Item {
        id: i64,
        label: Option<String>,
        active: bool,
    }

    fn item_table() -> MappingTableBuilder<Item> {
        MappingTable::<Item>::builder()
            .column("id", "id", AttrType::BigInt, |i: &Item| i.id, |i: &mut Item, v| i.id = v)
            .column(
                "label",
                "label",
                AttrType::String,
                |i: &Item| i.label.clone(),
                |i: &mut Item, v| i.label = v,
            )
            .column(
                "active",
                "active",
                AttrType::Boolean,
                |i: &Item| i.active,
                |i: &mut Item, v| i.active = v,
            )
    }

    // =========================================================================
    // Build Validation Tests
    // =========================================================================

    #[test]
    fn test_build_preserves_declaration_order() {
        let table = item_table().build().unwrap();
        assert_eq!(
            table.columns().collect::<Vec<_>>(),
            vec!["id", "label", "active"]
        );
        assert_eq!(table.len(), 3);
        assert!(table.contains("label"));
        assert!(!table.contains("missing"));
    }

    #[test]
    fn test_build_rejects_empty_table() {
        let err = MappingTable::<Item>::builder().build().unwrap_err();
        assert!(matches!(err, DaoError::Configuration(_)));
    }

    #[test]
    fn test_build_rejects_duplicate_columns() {
        let err = item_table()
            .column("id", "id", AttrType::BigInt, |i: &Item| i.id, |i: &mut Item, v| i.id = v)
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("mapped more than once"));
    }

    #[test]
    fn test_build_rejects_incompatible_accessor() {
        let err = MappingTable::<Item>::builder()
            .column("id", "id", AttrType::String, |i: &Item| i.id, |i: &mut Item, v| i.id = v)
            .build()
            .unwrap_err();
        assert!(matches!(err, DaoError::Configuration(_)));
        assert!(err.to_string().contains("cannot hold values"));
    }

    #[test]
    fn test_build_rejects_invalid_column_name() {
        let err = MappingTable::<Item>::builder()
            .column("Id", "id", AttrType::BigInt, |i: &Item| i.id, |i: &mut Item, v| i.id = v)
            .build()
            .unwrap_err();
        assert!(matches!(err, DaoError::Configuration(_)));
    }

    // =========================================================================
    // Accessor Tests
    // =========================================================================

    #[test]
    fn test_get_reads_typed_values() {
        let table = item_table().build().unwrap();
        let item = Item {
            id: 3,
            label: None,
            active: true,
        };

        assert_eq!(table.get("id").unwrap().get(&item).unwrap(), SqlValue::BigInt(3));
        assert_eq!(
            table.get("label").unwrap().get(&item).unwrap(),
            SqlValue::Null(Some(AttrType::String))
        );
        assert_eq!(
            table.get("active").unwrap().get(&item).unwrap(),
            SqlValue::Bool(true)
        );
    }

    #[test]
    fn test_get_narrows_to_declared_column_type() {
        let table = MappingTable::<Item>::builder()
            .column("id", "id", AttrType::Integer, |i: &Item| i.id, |i: &mut Item, v| i.id = v)
            .build()
            .unwrap();
        let attr = table.get("id").unwrap();

        let small = Item {
            id: 42,
            ..Item::default()
        };
        assert_eq!(attr.get(&small).unwrap(), SqlValue::Int(42));

        let huge = Item {
            id: i64::MAX,
            ..Item::default()
        };
        let err = attr.get(&huge).unwrap_err();
        assert!(matches!(err, DaoError::Mapping { ref column, .. } if column == "id"));
        assert!(err.to_string().contains("does not fit integer"));
    }

    #[test]
    fn test_set_writes_values() {
        let table = item_table().build().unwrap();
        let mut item = Item::default();

        table
            .get("label")
            .unwrap()
            .set(&mut item, SqlValue::from("hello"))
            .unwrap();
        assert_eq!(item.label.as_deref(), Some("hello"));
    }

    #[test]
    fn test_set_type_mismatch_is_mapping_error() {
        let table = item_table().build().unwrap();
        let mut item = Item::default();

        let err = table
            .get("active")
            .unwrap()
            .set(&mut item, SqlValue::from("yes"))
            .unwrap_err();
        assert!(matches!(err, DaoError::Mapping { ref column, .. } if column == "active"));
    }
}
