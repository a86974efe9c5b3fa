//! Identifier validation and quoting.
//!
//! Database and table names arrive from the command line or from callers and end
//! up inside generated DDL/DML. They are validated against MySQL's identifier
//! rules before any statement is built, and always emitted backtick-quoted.

use crate::error::{SecurityError, SecurityResult};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::warn;

/// MySQL limit for database, table and column names, in characters.
pub const MAX_IDENTIFIER_LENGTH: usize = 64;

/// Database names MySQL uses for its own bookkeeping.
pub const SYSTEM_DATABASES: &[&str] = &[
    "information_schema",
    "mysql",
    "performance_schema",
    "sys",
];

/// Characters MySQL rejects in quoted identifiers (NUL and supplementary planes).
static FORBIDDEN_CHARS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[\x00\x{10000}-\x{10FFFF}]").expect("Invalid regex: forbidden identifier chars")
});

/// Database names map to directories, so they cannot contain path separators.
static DATABASE_FORBIDDEN_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[/\\]").expect("Invalid regex: database name chars"));

/// Validator for schema object names.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentifierValidator;

impl IdentifierValidator {
    pub fn new() -> Self {
        Self
    }

    /// Validates a table or column name.
    pub fn validate_table(&self, name: &str) -> SecurityResult<()> {
        self.validate_common(name)
    }

    /// Validates a database name.
    pub fn validate_database(&self, name: &str) -> SecurityResult<()> {
        self.validate_common(name)?;

        if DATABASE_FORBIDDEN_CHARS.is_match(name) {
            warn!("Rejected database name with a path separator: {}", name);
            return Err(invalid(name, "database names cannot contain '/' or '\\'"));
        }

        Ok(())
    }

    fn validate_common(&self, name: &str) -> SecurityResult<()> {
        if name.is_empty() {
            return Err(invalid(name, "identifier cannot be empty"));
        }

        if name.chars().count() > MAX_IDENTIFIER_LENGTH {
            return Err(invalid(name, "identifier is too long"));
        }

        if name.ends_with(' ') {
            return Err(invalid(name, "identifier cannot end with a space"));
        }

        if FORBIDDEN_CHARS.is_match(name) {
            return Err(invalid(name, "identifier contains a forbidden character"));
        }

        Ok(())
    }
}

fn invalid(name: &str, reason: &'static str) -> SecurityError {
    SecurityError::InvalidIdentifier {
        identifier: name.to_string(),
        reason,
    }
}

/// Whether `name` is one of MySQL's own schemas.
pub fn is_system_database(name: &str) -> bool {
    SYSTEM_DATABASES
        .iter()
        .any(|db| db.eq_ignore_ascii_case(name))
}

/// Wraps an identifier in backticks, doubling embedded backticks.
pub fn quote_identifier(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}
