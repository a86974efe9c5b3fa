//! Error types for the export and status core.
//!
//! Uses `thiserror` for ergonomic error definitions with automatic `From` conversions.

use std::borrow::Cow;
use thiserror::Error;

/// Main error type for the crate.
#[derive(Debug, Error)]
pub enum AdminError {
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Export error: {0}")]
    Export(#[from] ExportError),

    #[error("Security error: {0}")]
    Security(#[from] SecurityError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Database-related errors.
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("No active database connection")]
    NotConnected,

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Query execution failed: {0}")]
    QueryFailed(String),

    #[error("Query timeout after {0}ms")]
    Timeout(u64),

    #[error("Database not found: {0}")]
    DatabaseNotFound(String),

    #[error("Table not found: {database}.{table}")]
    TableNotFound { database: String, table: String },

    #[error("Unsupported column type: {0}")]
    UnsupportedType(String),
}

/// Export pipeline errors.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Unsupported export format: {0}. Valid formats: csv, sql, json")]
    UnsupportedFormat(String),

    #[error("Nothing to export: {0}")]
    EmptyScope(Cow<'static, str>),

    #[error("Invalid row limit: {0}")]
    InvalidRowLimit(Cow<'static, str>),

    #[error("Options for {options} cannot be used with {format} export")]
    OptionsMismatch {
        format: &'static str,
        options: &'static str,
    },

    #[error("Failed to render {format} output: {message}")]
    Render {
        format: &'static str,
        message: String,
    },
}

/// Security-related errors.
#[derive(Debug, Error)]
pub enum SecurityError {
    #[error("Invalid identifier '{identifier}': {reason}")]
    InvalidIdentifier {
        identifier: String,
        reason: &'static str,
    },
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required field: {0}")]
    MissingField(Cow<'static, str>),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue {
        field: Cow<'static, str>,
        message: Cow<'static, str>,
    },

    #[error("Invalid database URL: {0}")]
    InvalidDatabaseUrl(String),
}

/// Result type alias for AdminError.
pub type Result<T> = std::result::Result<T, AdminError>;

/// Result type alias for DatabaseError.
pub type DbResult<T> = std::result::Result<T, DatabaseError>;

/// Result type alias for ExportError.
pub type ExportResult<T> = std::result::Result<T, ExportError>;

/// Result type alias for SecurityError.
pub type SecurityResult<T> = std::result::Result<T, SecurityError>;

impl From<std::fmt::Error> for ExportError {
    fn from(e: std::fmt::Error) -> Self {
        Self::Render {
            format: "text",
            message: e.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_conversion() {
        let db_error = DatabaseError::ConnectionFailed("refused".into());
        let err: AdminError = db_error.into();
        assert!(matches!(err, AdminError::Database(_)));

        let export_error = ExportError::EmptyScope("no databases selected".into());
        let err: AdminError = export_error.into();
        assert!(matches!(err, AdminError::Export(ExportError::EmptyScope(_))));
    }

    #[test]
    fn test_table_not_found_message() {
        let err = DatabaseError::TableNotFound {
            database: "shop".into(),
            table: "orders".into(),
        };
        assert_eq!(err.to_string(), "Table not found: shop.orders");
    }

    #[test]
    fn test_options_mismatch_message() {
        let err = ExportError::OptionsMismatch {
            format: "csv",
            options: "sql",
        };
        assert_eq!(
            err.to_string(),
            "Options for sql cannot be used with csv export"
        );
    }
}
