//! SQL Identifier Sanitization Utilities
//!
//! Generated statements embed table and column names unquoted, so every
//! identifier is validated once when a mapping or DAO is configured.

use std::sync::LazyLock;

use regex::Regex;

static IDENTIFIER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z][a-z0-9_]*$").expect("identifier pattern is valid"));

/// PostgreSQL reserved keywords that cannot be used as unquoted identifiers
pub const POSTGRES_RESERVED_WORDS: &[&str] = &[
    "ALL",
    "ANALYSE",
    "ANALYZE",
    "AND",
    "ANY",
    "ARRAY",
    "AS",
    "ASC",
    "ASYMMETRIC",
    "BOTH",
    "CASE",
    "CAST",
    "CHECK",
    "COLLATE",
    "COLUMN",
    "CONSTRAINT",
    "CREATE",
    "CURRENT_CATALOG",
    "CURRENT_DATE",
    "CURRENT_ROLE",
    "CURRENT_TIME",
    "CURRENT_TIMESTAMP",
    "CURRENT_USER",
    "DEFAULT",
    "DEFERRABLE",
    "DESC",
    "DISTINCT",
    "DO",
    "ELSE",
    "END",
    "EXCEPT",
    "FALSE",
    "FETCH",
    "FOR",
    "FOREIGN",
    "FROM",
    "GRANT",
    "GROUP",
    "HAVING",
    "IN",
    "INITIALLY",
    "INTERSECT",
    "INTO",
    "LATERAL",
    "LEADING",
    "LIMIT",
    "LOCALTIME",
    "LOCALTIMESTAMP",
    "NOT",
    "NULL",
    "OFFSET",
    "ON",
    "ONLY",
    "OR",
    "ORDER",
    "PLACING",
    "PRIMARY",
    "REFERENCES",
    "RETURNING",
    "SELECT",
    "SESSION_USER",
    "SOME",
    "SYMMETRIC",
    "TABLE",
    "THEN",
    "TO",
    "TRAILING",
    "TRUE",
    "UNION",
    "UNIQUE",
    "USER",
    "USING",
    "VARIADIC",
    "WHEN",
    "WHERE",
    "WINDOW",
    "WITH",
];

/// Quote a SQL identifier to make it safe for use in queries
///
/// # Example
/// ```
/// use runtara_bo_dao::sql::quote_identifier;
///
/// let quoted = quote_identifier("my_table");
/// assert_eq!(quoted, "\"my_table\"");
/// ```
pub fn quote_identifier(identifier: &str) -> String {
    // Escape any double quotes in the identifier by doubling them
    let escaped = identifier.replace('"', "\"\"");
    format!("\"{}\"", escaped)
}

/// Validate a table or column name
///
/// Rules:
/// - Must start with a letter (a-z)
/// - Can only contain lowercase letters, numbers, and underscores
/// - Cannot be a PostgreSQL reserved word
/// - Cannot be one of `reserved_columns`
///
/// # Example
/// ```
/// use runtara_bo_dao::sql::validate_identifier;
///
/// assert!(validate_identifier("products", &[]).is_ok());
/// assert!(validate_identifier("select", &[]).is_err()); // reserved keyword
/// assert!(validate_identifier("id", &["id"]).is_err()); // reserved column
/// ```
pub fn validate_identifier(name: &str, reserved_columns: &[&str]) -> Result<(), String> {
    if name.is_empty() {
        return Err("Identifier cannot be empty".to_string());
    }

    if !IDENTIFIER_RE.is_match(name) {
        return Err(format!(
            "Identifier '{}' is invalid. Must start with a lowercase letter and contain only lowercase letters, numbers, and underscores.",
            name
        ));
    }

    if POSTGRES_RESERVED_WORDS.contains(&name.to_uppercase().as_str()) {
        return Err(format!(
            "Identifier '{}' is a PostgreSQL reserved keyword and cannot be used.",
            name
        ));
    }

    if reserved_columns.contains(&name) {
        return Err(format!(
            "Column name '{}' is reserved and cannot be used.",
            name
        ));
    }

    Ok(())
}

/// Validate a table name, optionally schema-qualified (`schema.table`)
pub fn validate_table_name(name: &str) -> Result<(), String> {
    let segments: Vec<&str> = name.split('.').collect();
    if segments.len() > 2 {
        return Err(format!(
            "Table name '{}' has too many qualifiers; expected 'table' or 'schema.table'",
            name
        ));
    }
    segments
        .iter()
        .try_for_each(|segment| validate_identifier(segment, &[]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_identifier() {
        assert_eq!(quote_identifier("users"), "\"users\"");
        assert_eq!(quote_identifier("a\"b"), "\"a\"\"b\"");
        assert_eq!(quote_identifier(""), "\"\"");
    }

    // =========================================================================
    // validate_identifier Tests
    // =========================================================================

    #[test]
    fn test_validate_identifier_accepts_snake_case() {
        for name in ["users", "pk1", "created_at", "a_b_c"] {
            assert!(validate_identifier(name, &[]).is_ok(), "{name} should be valid");
        }
    }

    #[test]
    fn test_validate_identifier_rejects_malformed() {
        for name in ["", "1users", "_users", "Users", "my-table", "my table", "a.b", "x;drop"] {
            assert!(validate_identifier(name, &[]).is_err(), "{name:?} should be invalid");
        }
    }

    #[test]
    fn test_validate_identifier_rejects_reserved_words() {
        let result = validate_identifier("select", &[]);
        assert!(result.unwrap_err().contains("reserved keyword"));
        assert!(validate_identifier("user", &[]).is_err());
        assert!(validate_identifier("order", &[]).is_err());
    }

    #[test]
    fn test_validate_identifier_reserved_columns() {
        assert!(validate_identifier("checksum", &["checksum"]).is_err());
        assert!(validate_identifier("checksum", &[]).is_ok());
    }

    // =========================================================================
    // validate_table_name Tests
    // =========================================================================

    #[test]
    fn test_validate_table_name_plain_and_qualified() {
        assert!(validate_table_name("users").is_ok());
        assert!(validate_table_name("app.users").is_ok());
    }

    #[test]
    fn test_validate_table_name_rejects_bad_segments() {
        assert!(validate_table_name("a.b.c").is_err());
        assert!(validate_table_name("app.").is_err());
        assert!(validate_table_name("public.user").is_err());
        assert!(validate_table_name("users; DROP TABLE x").is_err());
    }
}
