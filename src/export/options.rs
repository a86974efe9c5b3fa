//! Typed, per-format export options.

use crate::config::DEFAULT_MAX_STATEMENT_SIZE;
use crate::export::ExportFormat;
use serde::{Deserialize, Serialize};

/// Options for one export, tagged by format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "format", rename_all = "lowercase")]
pub enum ExportOptions {
    Csv(CsvOptions),
    Sql(SqlOptions),
    Json(JsonOptions),
}

impl ExportOptions {
    /// Default options for a format.
    pub fn for_format(format: ExportFormat) -> Self {
        match format {
            ExportFormat::Csv => Self::Csv(CsvOptions::default()),
            ExportFormat::Sql => Self::Sql(SqlOptions::default()),
            ExportFormat::Json => Self::Json(JsonOptions::default()),
        }
    }

    pub fn format(&self) -> ExportFormat {
        match self {
            Self::Csv(_) => ExportFormat::Csv,
            Self::Sql(_) => ExportFormat::Sql,
            Self::Json(_) => ExportFormat::Json,
        }
    }
}

impl From<CsvOptions> for ExportOptions {
    fn from(options: CsvOptions) -> Self {
        Self::Csv(options)
    }
}

impl From<SqlOptions> for ExportOptions {
    fn from(options: SqlOptions) -> Self {
        Self::Sql(options)
    }
}

impl From<JsonOptions> for ExportOptions {
    fn from(options: JsonOptions) -> Self {
        Self::Json(options)
    }
}

/// CSV dialect.
///
/// All values are enclosed; NULL is written as `null_as` without enclosure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CsvOptions {
    pub separator: String,
    pub enclosure: String,
    /// Escapes the enclosure inside a value. Equal to `enclosure` means doubling.
    pub escape: String,
    pub terminator: String,
    pub null_as: String,
    /// Emit a first row holding the column names.
    pub columns_header: bool,
    /// Strip CR and LF characters from values.
    pub remove_crlf: bool,
}

impl Default for CsvOptions {
    fn default() -> Self {
        Self {
            separator: ",".into(),
            enclosure: "\"".into(),
            escape: "\"".into(),
            terminator: "\n".into(),
            null_as: "NULL".into(),
            columns_header: false,
            remove_crlf: false,
        }
    }
}

impl CsvOptions {
    pub fn separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = separator.into();
        self
    }

    pub fn enclosure(mut self, enclosure: impl Into<String>) -> Self {
        self.enclosure = enclosure.into();
        self
    }

    pub fn escape(mut self, escape: impl Into<String>) -> Self {
        self.escape = escape.into();
        self
    }

    pub fn terminator(mut self, terminator: impl Into<String>) -> Self {
        self.terminator = terminator.into();
        self
    }

    pub fn null_as(mut self, null_as: impl Into<String>) -> Self {
        self.null_as = null_as.into();
        self
    }

    pub fn columns_header(mut self, enabled: bool) -> Self {
        self.columns_header = enabled;
        self
    }

    pub fn remove_crlf(mut self, enabled: bool) -> Self {
        self.remove_crlf = enabled;
        self
    }
}

/// What a SQL dump contains.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StructureOrData {
    Structure,
    Data,
    #[default]
    StructureAndData,
}

impl StructureOrData {
    pub fn includes_structure(self) -> bool {
        matches!(self, Self::Structure | Self::StructureAndData)
    }

    pub fn includes_data(self) -> bool {
        matches!(self, Self::Data | Self::StructureAndData)
    }
}

/// Shape of generated `INSERT` statements.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsertSyntax {
    /// Many tuples per statement.
    #[default]
    Extended,
    /// One statement per row.
    SingleRow,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SqlOptions {
    pub structure_or_data: StructureOrData,
    /// `CREATE TABLE IF NOT EXISTS` instead of `CREATE TABLE`.
    pub if_not_exists: bool,
    /// Precede each `CREATE` with `DROP TABLE IF EXISTS` / `DROP VIEW IF EXISTS`.
    pub drop_table: bool,
    /// Emit `CREATE DATABASE` + `USE` for each database. Always on for server exports.
    pub create_database: bool,
    pub include_comments: bool,
    pub insert_syntax: InsertSyntax,
    /// Upper bound in bytes for one extended `INSERT`; `0` disables splitting.
    pub max_statement_size: usize,
}

impl Default for SqlOptions {
    fn default() -> Self {
        Self {
            structure_or_data: StructureOrData::default(),
            if_not_exists: false,
            drop_table: false,
            create_database: false,
            include_comments: true,
            insert_syntax: InsertSyntax::default(),
            max_statement_size: DEFAULT_MAX_STATEMENT_SIZE,
        }
    }
}

impl SqlOptions {
    pub fn structure_or_data(mut self, value: StructureOrData) -> Self {
        self.structure_or_data = value;
        self
    }

    pub fn if_not_exists(mut self, enabled: bool) -> Self {
        self.if_not_exists = enabled;
        self
    }

    pub fn drop_table(mut self, enabled: bool) -> Self {
        self.drop_table = enabled;
        self
    }

    pub fn create_database(mut self, enabled: bool) -> Self {
        self.create_database = enabled;
        self
    }

    pub fn include_comments(mut self, enabled: bool) -> Self {
        self.include_comments = enabled;
        self
    }

    pub fn insert_syntax(mut self, syntax: InsertSyntax) -> Self {
        self.insert_syntax = syntax;
        self
    }

    pub fn max_statement_size(mut self, size: usize) -> Self {
        self.max_statement_size = size;
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct JsonOptions {
    /// Indent row objects.
    pub pretty_print: bool,
}

impl JsonOptions {
    pub fn pretty_print(mut self, enabled: bool) -> Self {
        self.pretty_print = enabled;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_csv_defaults() {
        let options = CsvOptions::default();
        assert_eq!(options.separator, ",");
        assert_eq!(options.enclosure, "\"");
        assert_eq!(options.null_as, "NULL");
        assert!(!options.columns_header);
    }

    #[test]
    fn test_sql_defaults() {
        let options = SqlOptions::default();
        assert_eq!(options.structure_or_data, StructureOrData::StructureAndData);
        assert_eq!(options.insert_syntax, InsertSyntax::Extended);
        assert_eq!(options.max_statement_size, 50_000);
        assert!(options.include_comments);
        assert!(!options.if_not_exists);
    }

    #[test]
    fn test_structure_or_data() {
        assert!(StructureOrData::Structure.includes_structure());
        assert!(!StructureOrData::Structure.includes_data());
        assert!(StructureOrData::Data.includes_data());
        assert!(StructureOrData::StructureAndData.includes_structure());
    }

    #[test]
    fn test_options_format() {
        assert_eq!(
            ExportOptions::for_format(ExportFormat::Sql).format(),
            ExportFormat::Sql
        );
        let options: ExportOptions = JsonOptions::default().pretty_print(true).into();
        assert_eq!(options.format(), ExportFormat::Json);
    }

    #[test]
    fn test_options_deserialize_with_defaults() {
        let options: ExportOptions =
            serde_json::from_str(r#"{"format":"sql","if_not_exists":true}"#).unwrap();
        match options {
            ExportOptions::Sql(sql) => {
                assert!(sql.if_not_exists);
                assert_eq!(sql.max_statement_size, 50_000);
            }
            other => panic!("unexpected options: {other:?}"),
        }
    }
}
