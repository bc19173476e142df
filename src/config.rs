//! Configuration for GenericBoDao
//!
//! Provides a builder pattern for configuring a DAO instance.

use crate::error::{DaoError, Result};
use crate::sql::filter::DatabaseVendor;
use crate::sql::sanitize::validate_table_name;

/// Configuration for one DAO instance
#[derive(Debug, Clone)]
pub struct DaoConfig {
    /// Target table, optionally schema-qualified (`schema.table`)
    pub table_name: String,
    /// Database vendor the DAO talks to (metadata only)
    pub vendor: DatabaseVendor,
}

impl DaoConfig {
    /// Create a new configuration builder
    pub fn builder(table_name: impl Into<String>) -> DaoConfigBuilder {
        DaoConfigBuilder::new(table_name)
    }
}

/// Builder for DaoConfig
#[derive(Debug)]
pub struct DaoConfigBuilder {
    table_name: String,
    vendor: DatabaseVendor,
}

impl DaoConfigBuilder {
    /// Create a new builder for `table_name`
    pub fn new(table_name: impl Into<String>) -> Self {
        Self {
            table_name: table_name.into(),
            vendor: DatabaseVendor::default(),
        }
    }

    /// Set the database vendor (default: Unknown)
    pub fn vendor(mut self, vendor: DatabaseVendor) -> Self {
        self.vendor = vendor;
        self
    }

    /// Build the configuration, validating the table name
    pub fn build(self) -> Result<DaoConfig> {
        validate_table_name(&self.table_name).map_err(DaoError::Configuration)?;

        Ok(DaoConfig {
            table_name: self.table_name,
            vendor: self.vendor,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // =========================================================================
    // DaoConfig Default Tests
    // =========================================================================

    #[test]
    fn test_default_config() {
        let config = DaoConfig::builder("users").build().unwrap();

        assert_eq!(config.table_name, "users");
        assert_eq!(config.vendor, DatabaseVendor::Unknown);
    }

    #[test]
    fn test_builder_accepts_string() {
        let config = DaoConfig::builder(String::from("orders")).build().unwrap();
        assert_eq!(config.table_name, "orders");
    }

    #[test]
    fn test_full_custom_config() {
        let config = DaoConfig::builder("billing.invoices")
            .vendor(DatabaseVendor::Postgres)
            .build()
            .unwrap();

        assert_eq!(config.table_name, "billing.invoices");
        assert_eq!(config.vendor, DatabaseVendor::Postgres);
    }

    // =========================================================================
    // Table Name Validation Tests
    // =========================================================================

    #[test]
    fn test_rejects_invalid_table_names() {
        for name in ["", "Users", "users;drop", "select", "a.b.c", "bad name"] {
            let result = DaoConfig::builder(name).build();
            assert!(
                matches!(result, Err(DaoError::Configuration(_))),
                "{name:?} should be rejected"
            );
        }
    }

    // =========================================================================
    // Debug / Clone Trait Tests
    // =========================================================================

    #[test]
    fn test_config_debug() {
        let config = DaoConfig::builder("users").build().unwrap();
        let debug_str = format!("{:?}", config);
        assert!(debug_str.contains("DaoConfig"));
        assert!(debug_str.contains("table_name"));
    }

    #[test]
    fn test_config_clone() {
        let config1 = DaoConfig::builder("users")
            .vendor(DatabaseVendor::Sqlite)
            .build()
            .unwrap();
        let config2 = config1.clone();

        assert_eq!(config1.table_name, config2.table_name);
        assert_eq!(config1.vendor, config2.vendor);
    }
}
