//! SQL dump export.
//!
//! Output is a replayable script: session settings, then per table an optional
//! `DROP`, the `CREATE` statement and `INSERT` statements with explicit column
//! lists, wrapped in a single transaction.

use crate::database::{CellValue, Column, DatabaseInfo, Row, TableSchema, TableType};
use crate::error::ExportResult;
use crate::export::options::{InsertSyntax, SqlOptions};
use crate::export::plugin::ExportPlugin;
use crate::export::{ExportContext, ExportFormat};
use crate::security::quote_identifier;
use std::fmt::Write as _;

const SEPARATOR: &str = "-- --------------------------------------------------------";

/// Insert state of the table whose data is being written.
struct InsertTarget {
    prefix: String,
    /// Row positions written into tuples; generated columns are left out.
    included: Vec<usize>,
    /// Length of the open extended statement, zero when none is open.
    statement_len: usize,
}

pub struct SqlExporter {
    options: SqlOptions,
    target: Option<InsertTarget>,
}

impl SqlExporter {
    pub fn new(options: SqlOptions) -> Self {
        Self {
            options,
            target: None,
        }
    }

    fn comment(&self, out: &mut String, text: &str) -> ExportResult<()> {
        if self.options.include_comments {
            if text.is_empty() {
                out.push_str("--\n");
            } else {
                writeln!(out, "-- {text}")?;
            }
        }
        Ok(())
    }

    fn comment_block(&self, out: &mut String, text: &str) -> ExportResult<()> {
        if self.options.include_comments {
            out.push('\n');
            self.comment(out, "")?;
            self.comment(out, text)?;
            self.comment(out, "")?;
            out.push('\n');
        }
        Ok(())
    }

    /// `CREATE TABLE` with the existence guard applied.
    fn create_statement(&self, schema: &TableSchema) -> String {
        let statement = schema.create_table_statement();
        if self.options.if_not_exists
            && schema.table_type == TableType::Table
            && statement.strip_prefix("CREATE TABLE IF NOT EXISTS ").is_none()
            && let Some(rest) = statement.strip_prefix("CREATE TABLE ")
        {
            return format!("CREATE TABLE IF NOT EXISTS {rest}");
        }
        statement
    }

    /// Result positions of the columns an `INSERT` can assign.
    fn insertable(schema: &TableSchema, columns: &[Column]) -> Vec<usize> {
        columns
            .iter()
            .enumerate()
            .filter(|(_, column)| {
                !schema
                    .columns
                    .iter()
                    .any(|c| c.name == column.name && c.is_generated)
            })
            .map(|(index, _)| index)
            .collect()
    }

    fn tuple(included: &[usize], row: &Row) -> String {
        let values: Vec<String> = included
            .iter()
            .map(|&index| row.get(index).map_or_else(|| "NULL".to_string(), sql_literal))
            .collect();
        format!("({})", values.join(", "))
    }

    fn close_statement(out: &mut String, target: &mut InsertTarget) {
        if target.statement_len > 0 {
            out.push_str(";\n");
            target.statement_len = 0;
        }
    }
}

impl ExportPlugin for SqlExporter {
    fn format(&self) -> ExportFormat {
        ExportFormat::Sql
    }

    fn wants_structure(&self) -> bool {
        self.options.structure_or_data.includes_structure()
    }

    fn wants_data(&self) -> bool {
        self.options.structure_or_data.includes_data()
    }

    fn header(&mut self, out: &mut String, ctx: &ExportContext) -> ExportResult<()> {
        self.comment(out, &format!("{} SQL Dump", ctx.generator))?;
        self.comment(out, &format!("version {}", ctx.version))?;
        self.comment(out, "")?;
        self.comment(out, &format!("Host: {}", ctx.host))?;
        let generated_at = ctx.generated_at.format("%b %d, %Y at %I:%M %p");
        self.comment(out, &format!("Generation Time: {generated_at}"))?;
        self.comment(out, &format!("Server version: {}", ctx.server_version))?;
        if self.options.include_comments {
            out.push('\n');
        }

        out.push_str("SET SQL_MODE = \"NO_AUTO_VALUE_ON_ZERO\";\n");
        out.push_str("START TRANSACTION;\n");
        out.push_str("SET time_zone = \"+00:00\";\n");
        Ok(())
    }

    fn database_header(&mut self, out: &mut String, database: &DatabaseInfo) -> ExportResult<()> {
        let name = quote_identifier(&database.name);
        self.comment_block(out, &format!("Database: {name}"))?;
        if !self.options.include_comments {
            out.push('\n');
        }

        if self.options.create_database {
            let mut create = format!("CREATE DATABASE IF NOT EXISTS {name}");
            if let Some(charset) = &database.character_set {
                write!(create, " DEFAULT CHARACTER SET {charset}")?;
            }
            if let Some(collation) = &database.collation {
                write!(create, " COLLATE {collation}")?;
            }
            writeln!(out, "{create};")?;
            writeln!(out, "USE {name};")?;
        }
        Ok(())
    }

    fn table_structure(&mut self, out: &mut String, schema: &TableSchema) -> ExportResult<()> {
        let table = quote_identifier(&schema.name);
        let (kind, drop) = match schema.table_type {
            TableType::Table => ("table", "TABLE"),
            TableType::View | TableType::SystemView => ("view", "VIEW"),
        };

        if self.options.include_comments {
            out.push('\n');
            out.push_str(SEPARATOR);
            out.push('\n');
        }
        self.comment_block(out, &format!("Table structure for {kind} {table}"))?;
        if !self.options.include_comments {
            out.push('\n');
        }

        if self.options.drop_table {
            writeln!(out, "DROP {drop} IF EXISTS {table};")?;
        }
        writeln!(out, "{};", self.create_statement(schema))?;
        Ok(())
    }

    fn table_data_start(
        &mut self,
        out: &mut String,
        schema: &TableSchema,
        columns: &[Column],
    ) -> ExportResult<()> {
        let table = quote_identifier(&schema.name);
        self.comment_block(out, &format!("Dumping data for table {table}"))?;
        if !self.options.include_comments {
            out.push('\n');
        }

        let included = Self::insertable(schema, columns);
        self.target = if included.is_empty() {
            None
        } else {
            let names: Vec<String> = included
                .iter()
                .map(|&index| quote_identifier(&columns[index].name))
                .collect();
            Some(InsertTarget {
                prefix: format!("INSERT INTO {table} ({}) VALUES", names.join(", ")),
                included,
                statement_len: 0,
            })
        };
        Ok(())
    }

    fn table_rows(&mut self, out: &mut String, rows: &[Row]) -> ExportResult<()> {
        let Some(target) = self.target.as_mut() else {
            return Ok(());
        };

        match self.options.insert_syntax {
            InsertSyntax::SingleRow => {
                for row in rows {
                    let tuple = Self::tuple(&target.included, row);
                    writeln!(out, "{} {tuple};", target.prefix)?;
                }
            }
            InsertSyntax::Extended => {
                let limit = self.options.max_statement_size;

                for row in rows {
                    let tuple = Self::tuple(&target.included, row);
                    // ",\n" + tuple
                    let grows = tuple.len() + 2;

                    let too_long = limit > 0 && target.statement_len + grows > limit;
                    if too_long && target.statement_len > 0 {
                        Self::close_statement(out, target);
                    }

                    if target.statement_len == 0 {
                        out.push_str(&target.prefix);
                        out.push('\n');
                        target.statement_len = target.prefix.len() + 1;
                    } else {
                        out.push_str(",\n");
                    }

                    out.push_str(&tuple);
                    target.statement_len += grows;
                }
            }
        }
        Ok(())
    }

    fn table_data_end(&mut self, out: &mut String, _schema: &TableSchema) -> ExportResult<()> {
        if let Some(mut target) = self.target.take() {
            Self::close_statement(out, &mut target);
        }
        Ok(())
    }

    fn footer(&mut self, out: &mut String) -> ExportResult<()> {
        out.push_str("COMMIT;\n");
        Ok(())
    }
}

/// Renders a value as a MySQL literal.
pub fn sql_literal(value: &CellValue) -> String {
    match value {
        CellValue::Null => "NULL".to_string(),
        CellValue::Bool(b) => if *b { "1" } else { "0" }.to_string(),
        CellValue::Int(i) => i.to_string(),
        CellValue::UInt(u) => u.to_string(),
        CellValue::Float(f) if f.is_finite() => f.to_string(),
        CellValue::Float(_) => "NULL".to_string(),
        CellValue::Decimal(d) => d.to_string(),
        CellValue::Bytes(b) if b.is_empty() => "''".to_string(),
        CellValue::Bytes(b) => {
            let hex: String = b.iter().map(|byte| format!("{byte:02x}")).collect();
            format!("0x{hex}")
        }
        other => format!("'{}'", escape_string(&other.to_text().unwrap_or_default())),
    }
}

/// Escapes a string for use inside single quotes, the way `mysql_real_escape_string` does.
pub fn escape_string(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\0' => escaped.push_str("\\0"),
            '\n' => escaped.push_str("\\n"),
            '\r' => escaped.push_str("\\r"),
            '\\' => escaped.push_str("\\\\"),
            '\'' => escaped.push_str("\\'"),
            '"' => escaped.push_str("\\\""),
            '\x1a' => escaped.push_str("\\Z"),
            c => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::{ColumnSchema, PrimaryKey};
    use chrono::{NaiveDate, TimeZone, Utc};

    fn schema() -> TableSchema {
        TableSchema {
            database: "db".into(),
            name: "test_table".into(),
            table_type: TableType::Table,
            columns: vec![
                ColumnSchema::new("id", "int(11)").primary_key().auto_increment(),
                ColumnSchema::new("val", "int(11)").not_null(),
            ],
            primary_key: Some(PrimaryKey {
                name: "PRIMARY".into(),
                columns: vec!["id".into()],
            }),
            engine: Some("InnoDB".into()),
            create_statement: None,
        }
    }

    fn columns() -> Vec<Column> {
        vec![Column::new("id", "int"), Column::new("val", "int")]
    }

    fn rows(values: &[(i64, i64)]) -> Vec<Row> {
        values
            .iter()
            .map(|(id, val)| vec![CellValue::Int(*id), CellValue::Int(*val)])
            .collect()
    }

    fn data_only(options: SqlOptions, pages: &[Vec<Row>]) -> String {
        let mut exporter = SqlExporter::new(options.include_comments(false));
        let mut out = String::new();
        exporter.table_data_start(&mut out, &schema(), &columns()).unwrap();
        for page in pages {
            exporter.table_rows(&mut out, page).unwrap();
        }
        exporter.table_data_end(&mut out, &schema()).unwrap();
        out
    }

    #[test]
    fn test_extended_insert() {
        let out = data_only(SqlOptions::default(), &[rows(&[(1, 2), (2, 3)])]);
        assert_eq!(
            out,
            "\nINSERT INTO `test_table` (`id`, `val`) VALUES\n(1, 2),\n(2, 3);\n"
        );
    }

    #[test]
    fn test_extended_insert_spans_pages() {
        let paged = data_only(
            SqlOptions::default(),
            &[rows(&[(1, 2)]), rows(&[(2, 3)]), vec![]],
        );
        let whole = data_only(SqlOptions::default(), &[rows(&[(1, 2), (2, 3)])]);
        assert_eq!(paged, whole);
    }

    #[test]
    fn test_single_row_insert() {
        let options = SqlOptions::default().insert_syntax(InsertSyntax::SingleRow);
        let out = data_only(options, &[rows(&[(1, 2), (2, 3)])]);
        assert!(out.contains("INSERT INTO `test_table` (`id`, `val`) VALUES (1, 2);\n"));
        assert!(out.contains("INSERT INTO `test_table` (`id`, `val`) VALUES (2, 3);\n"));
    }

    #[test]
    fn test_max_statement_size_splits_inserts() {
        let options = SqlOptions::default().max_statement_size(60);
        let out = data_only(options, &[rows(&[(1, 2), (2, 3), (3, 4)])]);
        assert_eq!(out.matches("INSERT INTO").count(), 3);
        assert!(out.contains("(1, 2);\nINSERT INTO"));
        assert!(out.ends_with("(3, 4);\n"));
    }

    #[test]
    fn test_empty_table_has_no_insert() {
        let out = data_only(SqlOptions::default(), &[vec![]]);
        assert!(!out.contains("INSERT"));
        assert!(!out.contains(';'));
    }

    #[test]
    fn test_generated_columns_left_out_of_insert() {
        let schema = TableSchema {
            columns: vec![
                ColumnSchema::new("id", "int(11)").primary_key(),
                ColumnSchema::new("val", "int(11)").generated(),
            ],
            ..schema()
        };
        let mut exporter = SqlExporter::new(SqlOptions::default().include_comments(false));
        let mut out = String::new();
        exporter.table_data_start(&mut out, &schema, &columns()).unwrap();
        exporter.table_rows(&mut out, &rows(&[(1, 2), (2, 4)])).unwrap();
        exporter.table_data_end(&mut out, &schema).unwrap();

        assert_eq!(out, "\nINSERT INTO `test_table` (`id`) VALUES\n(1),\n(2);\n");
    }

    #[test]
    fn test_create_if_not_exists() {
        let options = SqlOptions::default().if_not_exists(true).drop_table(true);
        let mut exporter = SqlExporter::new(options);
        let mut out = String::new();
        exporter.table_structure(&mut out, &schema()).unwrap();

        assert!(out.contains("-- Table structure for table `test_table`\n"));
        assert!(out.contains("DROP TABLE IF EXISTS `test_table`;\n"));
        assert!(out.contains("CREATE TABLE IF NOT EXISTS `test_table` (\n"));
        assert!(out.contains(") ENGINE=InnoDB;\n"));
    }

    #[test]
    fn test_guard_added_despite_comment_text() {
        let commented = TableSchema {
            create_statement: Some(
                "CREATE TABLE `t` (\n  `a` int COMMENT 'IF NOT EXISTS'\n) ENGINE=InnoDB".into(),
            ),
            name: "t".into(),
            ..schema()
        };
        let exporter = SqlExporter::new(SqlOptions::default().if_not_exists(true));
        assert!(
            exporter
                .create_statement(&commented)
                .starts_with("CREATE TABLE IF NOT EXISTS `t` (")
        );

        let guarded = TableSchema {
            create_statement: Some("CREATE TABLE IF NOT EXISTS `t` (`a` int)".into()),
            ..commented
        };
        assert_eq!(
            exporter.create_statement(&guarded),
            "CREATE TABLE IF NOT EXISTS `t` (`a` int)"
        );
    }

    #[test]
    fn test_view_structure() {
        let view = TableSchema {
            table_type: TableType::View,
            create_statement: Some("CREATE VIEW `v` AS select 1 AS `a`".into()),
            name: "v".into(),
            ..schema()
        };
        let options = SqlOptions::default().if_not_exists(true).drop_table(true);
        let mut exporter = SqlExporter::new(options);
        let mut out = String::new();
        exporter.table_structure(&mut out, &view).unwrap();

        assert!(out.contains("DROP VIEW IF EXISTS `v`;\n"));
        assert!(out.contains("CREATE VIEW `v` AS select 1 AS `a`;\n"));
    }

    #[test]
    fn test_header_and_footer() {
        let ctx = ExportContext::default()
            .with_generated_at(Utc.with_ymd_and_hms(2024, 3, 5, 14, 7, 0).unwrap());
        let mut exporter = SqlExporter::new(SqlOptions::default());
        let mut out = String::new();
        exporter.header(&mut out, &ctx).unwrap();
        exporter.footer(&mut out).unwrap();

        assert!(out.contains("-- Generation Time: Mar 05, 2024 at 02:07 PM\n"));
        assert!(out.contains("START TRANSACTION;\n"));
        assert!(out.ends_with("COMMIT;\n"));
    }

    #[test]
    fn test_create_database() {
        let mut exporter = SqlExporter::new(SqlOptions::default().create_database(true));
        let mut out = String::new();
        let shop = DatabaseInfo::new("shop").with_charset("latin1", "latin1_swedish_ci");
        exporter.database_header(&mut out, &shop).unwrap();
        assert!(out.contains("-- Database: `shop`\n"));
        assert!(out.contains(
            "CREATE DATABASE IF NOT EXISTS `shop` \
             DEFAULT CHARACTER SET latin1 COLLATE latin1_swedish_ci;\n"
        ));
        assert!(out.contains("USE `shop`;\n"));
    }

    #[test]
    fn test_create_database_without_charset() {
        let mut exporter = SqlExporter::new(SqlOptions::default().create_database(true));
        let mut out = String::new();
        exporter.database_header(&mut out, &DatabaseInfo::new("shop")).unwrap();
        assert!(out.contains("CREATE DATABASE IF NOT EXISTS `shop`;\n"));
    }

    #[test]
    fn test_literals() {
        assert_eq!(sql_literal(&CellValue::Null), "NULL");
        assert_eq!(sql_literal(&CellValue::Int(-5)), "-5");
        assert_eq!(sql_literal(&CellValue::Bool(true)), "1");
        assert_eq!(sql_literal(&CellValue::String("it's".into())), "'it\\'s'");
        assert_eq!(sql_literal(&CellValue::Bytes(vec![0xde, 0xad])), "0xdead");
        assert_eq!(sql_literal(&CellValue::Bytes(vec![])), "''");

        let date = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        assert_eq!(sql_literal(&CellValue::Date(date)), "'2024-01-02'");
    }

    #[test]
    fn test_escape_string() {
        assert_eq!(
            escape_string("a\0b\nc\rd\\e\"f\x1a"),
            "a\\0b\\nc\\rd\\\\e\\\"f\\Z"
        );
    }
}
