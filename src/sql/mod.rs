//! SQL utilities for the BO DAO
//!
//! Statement template caching, predicate rendering, placeholder rewriting,
//! and identifier sanitization.

pub mod filter;
pub mod placeholder;
pub mod sanitize;
pub mod template;

pub use filter::{Combine, DatabaseVendor, Filter, Operand, RawExpression, Rendered};
pub use placeholder::{count_placeholders, to_numbered};
pub use sanitize::{
    POSTGRES_RESERVED_WORDS, quote_identifier, validate_identifier, validate_table_name,
};
pub use template::{StatementKind, TemplateCache, TemplateKey};
