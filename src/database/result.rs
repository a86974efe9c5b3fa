//! Query result types and schema structures.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::security::quote_identifier;

/// Rows fetched from one table, in source iteration order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResult {
    pub columns: Vec<Column>,
    pub rows: Vec<Row>,
    pub row_count: usize,
    pub execution_time_ms: u64,
}

impl QueryResult {
    pub fn new(columns: Vec<Column>, rows: Vec<Row>, execution_time_ms: u64) -> Self {
        let row_count = rows.len();
        Self {
            columns,
            rows,
            row_count,
            execution_time_ms,
        }
    }

    /// Column names in result order.
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }
}

/// Column metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub data_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nullable: Option<bool>,
}

impl Column {
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            nullable: None,
        }
    }

    pub fn with_nullable(mut self, nullable: bool) -> Self {
        self.nullable = Some(nullable);
        self
    }
}

/// One row, values in the order of [`QueryResult::columns`].
pub type Row = Vec<CellValue>;

/// Cell value that can hold the MySQL column types.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Decimal(Decimal),
    String(String),
    Date(NaiveDate),
    Time(NaiveTime),
    DateTime(NaiveDateTime),
    Bytes(Vec<u8>),
}

impl CellValue {
    /// Textual form as the server would send it over the text protocol.
    ///
    /// Returns `None` for NULL.
    pub fn to_text(&self) -> Option<String> {
        let text = match self {
            Self::Null => return None,
            Self::Bool(b) => if *b { "1" } else { "0" }.to_string(),
            Self::Int(i) => i.to_string(),
            Self::UInt(u) => u.to_string(),
            Self::Float(f) => f.to_string(),
            Self::Decimal(d) => d.to_string(),
            Self::String(s) => s.clone(),
            Self::Date(d) => d.format("%Y-%m-%d").to_string(),
            Self::Time(t) => t.format("%H:%M:%S").to_string(),
            Self::DateTime(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
            Self::Bytes(b) => String::from_utf8_lossy(b).into_owned(),
        };
        Some(text)
    }
}

impl From<()> for CellValue {
    fn from(_: ()) -> Self {
        Self::Null
    }
}

impl From<bool> for CellValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for CellValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<i32> for CellValue {
    fn from(v: i32) -> Self {
        Self::Int(v as i64)
    }
}

impl From<u64> for CellValue {
    fn from(v: u64) -> Self {
        Self::UInt(v)
    }
}

impl From<f64> for CellValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<Decimal> for CellValue {
    fn from(v: Decimal) -> Self {
        Self::Decimal(v)
    }
}

impl From<String> for CellValue {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<&str> for CellValue {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<Vec<u8>> for CellValue {
    fn from(v: Vec<u8>) -> Self {
        Self::Bytes(v)
    }
}

impl<T: Into<CellValue>> From<Option<T>> for CellValue {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(v) => v.into(),
            None => Self::Null,
        }
    }
}

/// Table information.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableInfo {
    pub database: String,
    pub name: String,
    pub table_type: TableType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub row_count: Option<u64>,
}

/// Table type enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TableType {
    Table,
    View,
    SystemView,
}

impl TableType {
    /// Maps `information_schema.TABLES.TABLE_TYPE`.
    pub fn from_information_schema(value: &str) -> Self {
        match value.to_uppercase().as_str() {
            "VIEW" => Self::View,
            "SYSTEM VIEW" => Self::SystemView,
            _ => Self::Table,
        }
    }

    /// Whether rows can be dumped as data.
    pub fn has_data(self) -> bool {
        matches!(self, Self::Table)
    }
}

/// Table schema with columns and the server's own DDL when available.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableSchema {
    pub database: String,
    pub name: String,
    pub table_type: TableType,
    pub columns: Vec<ColumnSchema>,
    pub primary_key: Option<PrimaryKey>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub engine: Option<String>,
    /// Output of `SHOW CREATE TABLE` / `SHOW CREATE VIEW`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub create_statement: Option<String>,
}

impl TableSchema {
    /// The `CREATE` statement for this table without a trailing semicolon.
    ///
    /// Uses the server-provided DDL when present and synthesizes one from the
    /// column list otherwise.
    pub fn create_table_statement(&self) -> String {
        if let Some(statement) = &self.create_statement {
            return statement.trim_end().trim_end_matches(';').to_string();
        }

        let mut definitions: Vec<String> = self
            .columns
            .iter()
            .map(ColumnSchema::definition)
            .collect();

        if let Some(pk) = &self.primary_key
            && !pk.columns.is_empty()
        {
            let cols: Vec<String> = pk.columns.iter().map(|c| quote_identifier(c)).collect();
            definitions.push(format!("PRIMARY KEY ({})", cols.join(",")));
        }

        let mut statement = format!("CREATE TABLE {} (\n", quote_identifier(&self.name));
        let body: Vec<String> = definitions.iter().map(|d| format!("  {d}")).collect();
        statement.push_str(&body.join(",\n"));
        statement.push_str("\n)");
        if let Some(engine) = &self.engine {
            statement.push_str(" ENGINE=");
            statement.push_str(engine);
        }
        statement
    }
}

/// Column schema information.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnSchema {
    pub name: String,
    /// Full column type as reported by `COLUMN_TYPE`, e.g. `int(11)`.
    pub data_type: String,
    pub nullable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,
    pub is_primary_key: bool,
    pub is_auto_increment: bool,
    /// `VIRTUAL GENERATED` / `STORED GENERATED`; the server rejects explicit values.
    #[serde(default)]
    pub is_generated: bool,
}

impl ColumnSchema {
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            nullable: true,
            default_value: None,
            is_primary_key: false,
            is_auto_increment: false,
            is_generated: false,
        }
    }

    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    pub fn primary_key(mut self) -> Self {
        self.is_primary_key = true;
        self.nullable = false;
        self
    }

    pub fn auto_increment(mut self) -> Self {
        self.is_auto_increment = true;
        self
    }

    pub fn generated(mut self) -> Self {
        self.is_generated = true;
        self
    }

    pub fn default_value(mut self, value: impl Into<String>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    fn definition(&self) -> String {
        let mut def = format!("{} {}", quote_identifier(&self.name), self.data_type);
        def.push_str(if self.nullable { " DEFAULT NULL" } else { " NOT NULL" });
        if let Some(default) = &self.default_value {
            if self.nullable {
                // replace the implicit NULL default
                def.truncate(def.len() - " DEFAULT NULL".len());
            }
            def.push_str(&format!(" DEFAULT '{}'", default.replace('\'', "''")));
        }
        if self.is_auto_increment {
            def.push_str(" AUTO_INCREMENT");
        }
        def
    }
}

/// A schema and its defaults, from `information_schema.SCHEMATA`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseInfo {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub character_set: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collation: Option<String>,
}

impl DatabaseInfo {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            character_set: None,
            collation: None,
        }
    }

    pub fn with_charset(
        mut self,
        character_set: impl Into<String>,
        collation: impl Into<String>,
    ) -> Self {
        self.character_set = Some(character_set.into());
        self.collation = Some(collation.into());
        self
    }
}

/// Primary key information.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrimaryKey {
    pub name: String,
    pub columns: Vec<String>,
}

/// Identity of the connected server.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerInfo {
    pub host: String,
    pub version: String,
}

/// Binary log coordinates reported by `SHOW MASTER STATUS`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrimaryStatus {
    pub binlog_file: String,
    pub position: u64,
}

/// Replica thread state reported by `SHOW REPLICA STATUS`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplicaStatus {
    pub source_host: String,
    pub io_running: bool,
    pub sql_running: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seconds_behind: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_result_creation() {
        let columns = vec![Column::new("id", "int"), Column::new("name", "varchar")];
        let row = vec![CellValue::Int(1), CellValue::String("test".into())];

        let result = QueryResult::new(columns, vec![row], 100);
        assert_eq!(result.row_count, 1);
        assert_eq!(result.column_names().collect::<Vec<_>>(), ["id", "name"]);
    }

    #[test]
    fn test_cell_value_to_text() {
        assert_eq!(CellValue::Null.to_text(), None);
        assert_eq!(CellValue::Bool(true).to_text().as_deref(), Some("1"));
        assert_eq!(CellValue::Int(-4).to_text().as_deref(), Some("-4"));
        assert_eq!(CellValue::UInt(7).to_text().as_deref(), Some("7"));
        let dt = NaiveDate::from_ymd_opt(2024, 2, 29)
            .unwrap()
            .and_hms_opt(13, 5, 0)
            .unwrap();
        assert_eq!(
            CellValue::DateTime(dt).to_text().as_deref(),
            Some("2024-02-29 13:05:00")
        );
    }

    #[test]
    fn test_cell_value_conversions() {
        assert_eq!(CellValue::from(()), CellValue::Null);
        assert_eq!(CellValue::from(Option::<i64>::None), CellValue::Null);

        assert_eq!(CellValue::from(42i64), CellValue::Int(42));
        assert_eq!(CellValue::from("hello"), CellValue::String("hello".into()));
    }

    #[test]
    fn test_synthesized_create_statement_with_default() {
        let schema = TableSchema {
            database: "db".into(),
            name: "t".into(),
            table_type: TableType::Table,
            columns: vec![ColumnSchema::new("state", "varchar(8)").default_value("new")],
            primary_key: None,
            engine: None,
            create_statement: None,
        };
        assert_eq!(
            schema.create_table_statement(),
            "CREATE TABLE `t` (\n  `state` varchar(8) DEFAULT 'new'\n)"
        );
    }

    #[test]
    fn test_synthesized_create_statement() {
        let schema = TableSchema {
            database: "db".into(),
            name: "test_table".into(),
            table_type: TableType::Table,
            columns: vec![
                ColumnSchema::new("id", "int(11)")
                    .primary_key()
                    .auto_increment(),
                ColumnSchema::new("val", "int(11)").not_null(),
                ColumnSchema::new("note", "varchar(20)"),
            ],
            primary_key: Some(PrimaryKey {
                name: "PRIMARY".into(),
                columns: vec!["id".into()],
            }),
            engine: Some("InnoDB".into()),
            create_statement: None,
        };

        let ddl = schema.create_table_statement();
        assert!(ddl.starts_with("CREATE TABLE `test_table` (\n"));
        assert!(ddl.contains("  `id` int(11) NOT NULL AUTO_INCREMENT,\n"));
        assert!(ddl.contains("  `note` varchar(20) DEFAULT NULL,\n"));
        assert!(ddl.contains("  PRIMARY KEY (`id`)\n"));
        assert!(ddl.ends_with(") ENGINE=InnoDB"));
    }

    #[test]
    fn test_server_create_statement_preferred() {
        let schema = TableSchema {
            database: "db".into(),
            name: "t".into(),
            table_type: TableType::Table,
            columns: vec![],
            primary_key: None,
            engine: None,
            create_statement: Some("CREATE TABLE `t` (\n  `a` int\n);".into()),
        };
        assert_eq!(
            schema.create_table_statement(),
            "CREATE TABLE `t` (\n  `a` int\n)"
        );
    }

    #[test]
    fn test_table_type_mapping() {
        assert_eq!(TableType::from_information_schema("BASE TABLE"), TableType::Table);
        assert_eq!(TableType::from_information_schema("VIEW"), TableType::View);
        assert!(!TableType::View.has_data());
    }
}
