//! Export pipeline: server, database or table scope to CSV, SQL or JSON.
//!
//! [`run_to`] resolves the requested scope through a [`DataSource`] and feeds each
//! database and table to the format's [`ExportPlugin`], reading rows in pages of
//! [`ExportRequest::page_size`] and writing each page out before the next query.
//! [`run`] collects the same output into memory.
//!
//! # Example
//!
//! ```no_run
//! use r3nz_mysql_admin::database::MemorySource;
//! use r3nz_mysql_admin::export::{self, ExportContext, ExportFormat, ExportRequest, ExportScope};
//!
//! # async fn demo(source: MemorySource) -> r3nz_mysql_admin::Result<()> {
//! let ctx = ExportContext::from_source(&source).await?;
//! let request = ExportRequest::new(ExportScope::database("shop"), ExportFormat::Csv);
//! let artifact = export::run(&source, &ctx, &request).await?;
//! println!("{}", artifact.content);
//! # Ok(())
//! # }
//! ```

pub mod csv;
pub mod json;
pub mod options;
pub mod plugin;
pub mod sql;

pub use self::csv::CsvExporter;
pub use self::json::JsonExporter;
pub use options::{
    CsvOptions, ExportOptions, InsertSyntax, JsonOptions, SqlOptions, StructureOrData,
};
pub use plugin::ExportPlugin;
pub use sql::SqlExporter;

use crate::database::{DataSource, DatabaseInfo, RowLimit, ServerInfo, TableInfo, TableSchema};
use crate::error::{DatabaseError, ExportError, Result};
use crate::security::{IdentifierValidator, is_system_database};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;
use std::io::Write;
use std::path::PathBuf;
use std::str::FromStr;
use tracing::{debug, info, instrument, warn};

/// Supported export formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Csv,
    Sql,
    Json,
}

impl ExportFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Sql => "sql",
            Self::Json => "json",
        }
    }

    pub fn extension(self) -> &'static str {
        self.as_str()
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExportFormat {
    type Err = ExportError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "sql" => Ok(Self::Sql),
            "json" => Ok(Self::Json),
            _ => Err(ExportError::UnsupportedFormat(s.to_string())),
        }
    }
}

/// What to export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "scope", rename_all = "lowercase")]
pub enum ExportScope {
    /// Several databases; empty means every non-system database.
    Server { databases: Vec<String> },
    /// One database; empty `tables` means every table.
    Database {
        database: String,
        tables: Vec<String>,
    },
    /// One table, optionally limited to a window of rows.
    Table {
        database: String,
        table: String,
        rows: Option<RowLimit>,
    },
}

impl ExportScope {
    pub fn server() -> Self {
        Self::Server {
            databases: Vec::new(),
        }
    }

    pub fn database(database: impl Into<String>) -> Self {
        Self::Database {
            database: database.into(),
            tables: Vec::new(),
        }
    }

    pub fn table(database: impl Into<String>, table: impl Into<String>) -> Self {
        Self::Table {
            database: database.into(),
            table: table.into(),
            rows: None,
        }
    }

    /// Restricts a table scope to a row window. Other scopes are returned unchanged.
    pub fn with_limit(self, limit: RowLimit) -> Self {
        match self {
            Self::Table {
                database, table, ..
            } => Self::Table {
                database,
                table,
                rows: Some(limit),
            },
            other => other,
        }
    }

    fn file_stem(&self, host: &str) -> String {
        match self {
            Self::Server { .. } => host.to_string(),
            Self::Database { database, .. } => database.clone(),
            Self::Table { table, .. } => table.clone(),
        }
    }
}

/// Rows fetched per query while a table is exported.
pub const DEFAULT_PAGE_SIZE: u64 = 10_000;

fn default_page_size() -> u64 {
    DEFAULT_PAGE_SIZE
}

/// A validated-on-run export job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportRequest {
    pub scope: ExportScope,
    pub format: ExportFormat,
    pub options: ExportOptions,
    /// Rows read per query.
    #[serde(default = "default_page_size")]
    pub page_size: u64,
}

impl ExportRequest {
    /// A request with the format's default options.
    pub fn new(scope: ExportScope, format: ExportFormat) -> Self {
        Self {
            scope,
            format,
            options: ExportOptions::for_format(format),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    pub fn with_page_size(mut self, page_size: u64) -> Self {
        self.page_size = page_size;
        self
    }

    /// `<stem>_<YYYYmmdd_HHMMSS>.<ext>`, the stem being the host, database or table.
    pub fn suggested_file_name(&self, ctx: &ExportContext) -> String {
        ExportArtifact::default_file_name(
            &self.scope.file_stem(&ctx.host),
            self.format,
            ctx.generated_at,
        )
    }

    pub fn with_options(mut self, options: impl Into<ExportOptions>) -> Self {
        self.options = options.into();
        self
    }

    /// Checks identifiers, the row limit, the page size and that options match the format.
    pub fn validate(&self) -> Result<()> {
        if self.options.format() != self.format {
            return Err(ExportError::OptionsMismatch {
                format: self.format.as_str(),
                options: self.options.format().as_str(),
            }
            .into());
        }
        if self.page_size == 0 {
            return Err(ExportError::InvalidRowLimit("page size must be at least 1".into()).into());
        }

        let validator = IdentifierValidator::new();
        match &self.scope {
            ExportScope::Server { databases } => {
                for database in databases {
                    validator.validate_database(database)?;
                }
            }
            ExportScope::Database { database, tables } => {
                validator.validate_database(database)?;
                for table in tables {
                    validator.validate_table(table)?;
                }
            }
            ExportScope::Table {
                database,
                table,
                rows,
            } => {
                validator.validate_database(database)?;
                validator.validate_table(table)?;
                if let Some(limit) = rows
                    && limit.count == 0
                {
                    let reason = "row limit must be at least 1";
                    return Err(ExportError::InvalidRowLimit(reason.into()).into());
                }
            }
        }
        Ok(())
    }
}

/// Request-scoped facts written into dump headers.
#[derive(Debug, Clone)]
pub struct ExportContext {
    pub generator: Cow<'static, str>,
    pub version: Cow<'static, str>,
    pub host: String,
    pub server_version: String,
    pub generated_at: DateTime<Utc>,
}

impl Default for ExportContext {
    fn default() -> Self {
        Self::new(ServerInfo::default())
    }
}

impl ExportContext {
    pub fn new(server: ServerInfo) -> Self {
        Self {
            generator: Cow::Borrowed(env!("CARGO_PKG_NAME")),
            version: Cow::Borrowed(env!("CARGO_PKG_VERSION")),
            host: server.host,
            server_version: server.version,
            generated_at: Utc::now(),
        }
    }

    /// Reads host and version from the source.
    pub async fn from_source(source: &dyn DataSource) -> Result<Self> {
        Ok(Self::new(source.server_info().await?))
    }

    pub fn with_generated_at(mut self, at: DateTime<Utc>) -> Self {
        self.generated_at = at;
        self
    }
}

/// Counts reported by a finished export.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExportSummary {
    /// Tables and views visited.
    pub tables: usize,
    /// Data rows written.
    pub rows: usize,
    /// Bytes written to the output.
    pub bytes: usize,
}

/// The rendered output of one export.
#[derive(Debug, Clone)]
pub struct ExportArtifact {
    pub format: ExportFormat,
    pub content: String,
    pub suggested_file_name: String,
    /// Tables and views visited.
    pub tables: usize,
    /// Data rows written.
    pub rows: usize,
}

impl ExportArtifact {
    /// `<stem>_<YYYYmmdd_HHMMSS>.<ext>`
    pub fn default_file_name(stem: &str, format: ExportFormat, at: DateTime<Utc>) -> String {
        let stamp = at.format("%Y%m%d_%H%M%S");
        format!("{stem}_{stamp}.{}", format.extension())
    }

    /// Writes the content into `target` and returns the file written.
    pub fn write_to(&self, target: &OutputTarget) -> Result<PathBuf> {
        let path = target.resolve(&self.suggested_file_name)?;
        std::fs::write(&path, self.content.as_bytes())?;

        debug!("Wrote {} bytes to {}", self.content.len(), path.display());
        Ok(path)
    }
}

/// Where a saved export goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputTarget {
    /// A file path. An existing directory receives the suggested file name.
    Path(PathBuf),
    /// A directory, created if missing, that receives the suggested file name.
    Directory(PathBuf),
}

impl OutputTarget {
    /// The file to write for `file_name`. Missing parent directories are created.
    pub fn resolve(&self, file_name: &str) -> Result<PathBuf> {
        let target = match self {
            Self::Directory(dir) => {
                std::fs::create_dir_all(dir)?;
                dir.join(file_name)
            }
            Self::Path(path) if path.is_dir() => path.join(file_name),
            Self::Path(path) => path.clone(),
        };

        if let Some(parent) = target.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        Ok(target)
    }
}

struct DatabasePlan {
    info: DatabaseInfo,
    tables: Vec<TableInfo>,
}

/// Expands the scope into databases and their tables, in output order.
async fn resolve(source: &dyn DataSource, scope: &ExportScope) -> Result<Vec<DatabasePlan>> {
    match scope {
        ExportScope::Server { databases } => {
            let names: Vec<String> = if databases.is_empty() {
                source
                    .list_databases()
                    .await?
                    .into_iter()
                    .filter(|db| !is_system_database(db))
                    .collect()
            } else {
                databases.clone()
            };

            if names.is_empty() {
                return Err(ExportError::EmptyScope("no databases selected".into()).into());
            }

            let mut plans = Vec::with_capacity(names.len());
            for name in names {
                let info = source.database_info(&name).await?;
                let tables = source.list_tables(&name).await?;
                plans.push(DatabasePlan { info, tables });
            }
            Ok(plans)
        }
        ExportScope::Database { database, tables } => {
            let info = source.database_info(database).await?;
            let available = source.list_tables(database).await?;
            let tables = if tables.is_empty() {
                available
            } else {
                tables
                    .iter()
                    .map(|wanted| {
                        available
                            .iter()
                            .find(|t| &t.name == wanted)
                            .cloned()
                            .ok_or_else(|| DatabaseError::TableNotFound {
                                database: database.clone(),
                                table: wanted.clone(),
                            })
                    })
                    .collect::<std::result::Result<Vec<_>, _>>()?
            };
            Ok(vec![DatabasePlan { info, tables }])
        }
        ExportScope::Table {
            database, table, ..
        } => {
            let info = source.database_info(database).await?;
            let schema = source.table_schema(database, table).await?;
            Ok(vec![DatabasePlan {
                info,
                tables: vec![TableInfo {
                    database: schema.database,
                    name: schema.name,
                    table_type: schema.table_type,
                    row_count: None,
                }],
            }])
        }
    }
}

fn plugin_for(request: &ExportRequest) -> Box<dyn ExportPlugin> {
    match &request.options {
        ExportOptions::Csv(options) => Box::new(CsvExporter::new(options.clone())),
        ExportOptions::Sql(options) => {
            let mut options = options.clone();
            if matches!(request.scope, ExportScope::Server { .. }) {
                options.create_database = true;
            }
            Box::new(SqlExporter::new(options))
        }
        ExportOptions::Json(options) => Box::new(JsonExporter::new(options.clone())),
    }
}

/// Plugin output held in memory until the next flush.
struct Output<'a> {
    writer: &'a mut (dyn Write + Send),
    buffer: String,
    bytes: usize,
}

impl Output<'_> {
    fn flush(&mut self) -> Result<()> {
        self.writer.write_all(self.buffer.as_bytes())?;
        self.bytes += self.buffer.len();
        self.buffer.clear();
        Ok(())
    }
}

/// Feeds a table's rows to the plugin page by page, within the optional window.
async fn export_table_data(
    source: &dyn DataSource,
    plugin: &mut dyn ExportPlugin,
    output: &mut Output<'_>,
    schema: &TableSchema,
    window: Option<RowLimit>,
    page_size: u64,
) -> Result<usize> {
    let mut offset = window.map_or(0, |w| w.offset);
    let mut remaining = window.map(|w| w.count);
    let mut written = 0usize;
    let mut started = false;

    loop {
        let count = remaining.map_or(page_size, |left| left.min(page_size));
        let limit = RowLimit::first(count).with_offset(offset);
        let page = source.fetch_rows(schema, Some(limit)).await?;
        debug!(
            "Table {}.{}: {} rows at offset {} in {}ms",
            schema.database, schema.name, page.row_count, offset, page.execution_time_ms
        );

        if !started {
            plugin.table_data_start(&mut output.buffer, schema, &page.columns)?;
            started = true;
        }
        plugin.table_rows(&mut output.buffer, &page.rows)?;
        output.flush()?;

        let fetched = page.rows.len() as u64;
        written += page.rows.len();
        offset += fetched;
        if let Some(left) = remaining.as_mut() {
            *left = left.saturating_sub(fetched);
        }
        if fetched < count || remaining == Some(0) {
            break;
        }
    }

    plugin.table_data_end(&mut output.buffer, schema)?;
    Ok(written)
}

/// Runs an export, writing the output to `out` as it is produced.
///
/// Rows are read `request.page_size` at a time, so memory use does not grow with
/// table size. On error, `out` holds whatever was written before the failure.
///
/// # Errors
///
/// - [`ExportError`] for invalid requests or an empty server scope
/// - [`DatabaseError::DatabaseNotFound`] / [`DatabaseError::TableNotFound`] for unknown targets
/// - any source error while reading schemas or rows
/// - [`std::io::Error`] from `out`
#[instrument(
    skip(source, ctx, request, out),
    fields(format = %request.format, source = source.name())
)]
pub async fn run_to(
    source: &dyn DataSource,
    ctx: &ExportContext,
    request: &ExportRequest,
    out: &mut (dyn Write + Send),
) -> Result<ExportSummary> {
    request.validate()?;

    let plan = resolve(source, &request.scope).await?;
    let window = match &request.scope {
        ExportScope::Table { rows, .. } => *rows,
        _ => None,
    };

    let mut plugin = plugin_for(request);
    let mut output = Output {
        writer: out,
        buffer: String::new(),
        bytes: 0,
    };
    let mut summary = ExportSummary::default();

    plugin.header(&mut output.buffer, ctx)?;

    for database in &plan {
        let name = &database.info.name;
        debug!("Exporting database {} ({} tables)", name, database.tables.len());
        plugin.database_header(&mut output.buffer, &database.info)?;

        for table in &database.tables {
            let schema = source.table_schema(name, &table.name).await?;
            summary.tables += 1;

            if plugin.wants_structure() {
                plugin.table_structure(&mut output.buffer, &schema)?;
            }

            if plugin.wants_data() {
                if schema.table_type.has_data() {
                    summary.rows += export_table_data(
                        source,
                        plugin.as_mut(),
                        &mut output,
                        &schema,
                        window,
                        request.page_size,
                    )
                    .await?;
                } else {
                    debug!("Skipping data of view {}.{}", name, table.name);
                }
            }
            output.flush()?;
        }

        if database.tables.is_empty() {
            warn!("Database {} has no tables", name);
        }
        plugin.database_footer(&mut output.buffer, &database.info)?;
    }

    plugin.footer(&mut output.buffer)?;
    output.flush()?;
    output.writer.flush()?;
    summary.bytes = output.bytes;

    info!(
        "Exported {} tables, {} rows as {} ({} bytes)",
        summary.tables, summary.rows, request.format, summary.bytes
    );
    Ok(summary)
}

/// Runs an export and returns the rendered artifact.
///
/// # Errors
///
/// Same as [`run_to`].
pub async fn run(
    source: &dyn DataSource,
    ctx: &ExportContext,
    request: &ExportRequest,
) -> Result<ExportArtifact> {
    let mut buffer = Vec::new();
    let summary = run_to(source, ctx, request, &mut buffer).await?;
    let content = String::from_utf8(buffer).map_err(|e| ExportError::Render {
        format: request.format.as_str(),
        message: e.to_string(),
    })?;

    Ok(ExportArtifact {
        format: request.format,
        content,
        suggested_file_name: request.suggested_file_name(ctx),
        tables: summary.tables,
        rows: summary.rows,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::{ColumnSchema, DatabaseInfo, MemorySource, MemoryTable};
    use crate::error::{AdminError, SecurityError};
    use chrono::TimeZone;

    const DB: &str = "phpmyadmin_test";

    fn test_table() -> MemoryTable {
        MemoryTable::new(DB, "test_table")
            .column(ColumnSchema::new("id", "int(11)").primary_key().auto_increment())
            .column(ColumnSchema::new("val", "int(11)").not_null())
    }

    fn source() -> MemorySource {
        MemorySource::new()
            .with_database("mysql")
            .with_table(test_table().row([1, 2]))
    }

    fn two_row_source() -> MemorySource {
        MemorySource::new().with_table(test_table().row([1, 2]).row([2, 3]))
    }

    fn three_row_source() -> MemorySource {
        MemorySource::new().with_table(test_table().row([1, 2]).row([2, 3]).row([3, 4]))
    }

    fn ctx() -> ExportContext {
        ExportContext::new(ServerInfo {
            host: "localhost".into(),
            version: "8.0.36".into(),
        })
        .with_generated_at(Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap())
    }

    fn scopes() -> Vec<ExportScope> {
        vec![
            ExportScope::Server {
                databases: vec![DB.into()],
            },
            ExportScope::database(DB),
            ExportScope::table(DB, "test_table"),
        ]
    }

    fn sql_if_not_exists() -> SqlOptions {
        SqlOptions::default()
            .structure_or_data(StructureOrData::StructureAndData)
            .if_not_exists(true)
    }

    async fn export(source: &MemorySource, request: ExportRequest) -> ExportArtifact {
        run(source, &ctx(), &request).await.unwrap()
    }

    #[tokio::test]
    async fn test_csv_every_scope() {
        let source = source();
        for scope in scopes() {
            let artifact = export(&source, ExportRequest::new(scope, ExportFormat::Csv)).await;
            assert!(artifact.content.contains("\"1\",\"2\""), "{}", artifact.content);
        }
    }

    #[tokio::test]
    async fn test_sql_every_scope() {
        let source = source();
        for scope in scopes() {
            let request =
                ExportRequest::new(scope, ExportFormat::Sql).with_options(sql_if_not_exists());
            let content = export(&source, request).await.content;

            assert!(content.contains("CREATE TABLE IF NOT EXISTS `test_table`"), "{content}");
            assert!(content.contains("INSERT INTO `test_table` (`id`, `val`) VALUES"));
            assert!(content.contains("(1, 2)"));
        }
    }

    #[tokio::test]
    async fn test_json_every_scope() {
        let source = source();
        for scope in scopes() {
            let artifact = export(&source, ExportRequest::new(scope, ExportFormat::Json)).await;
            assert!(artifact.content.contains(r#"{"id":"1","val":"2"}"#), "{}", artifact.content);
        }
    }

    #[tokio::test]
    async fn test_table_row_limit() {
        let source = two_row_source();
        let scope = ExportScope::table(DB, "test_table").with_limit(RowLimit::first(1));

        let csv = export(&source, ExportRequest::new(scope.clone(), ExportFormat::Csv)).await;
        assert_eq!(csv.content, "\"1\",\"2\"\n");
        assert_eq!(csv.rows, 1);

        let sql = export(&source, ExportRequest::new(scope, ExportFormat::Sql)).await;
        assert!(sql.content.contains("(1, 2);"));
        assert!(!sql.content.contains("(2, 3)"));
    }

    #[tokio::test]
    async fn test_row_offset() {
        let source = two_row_source();
        let scope =
            ExportScope::table(DB, "test_table").with_limit(RowLimit::first(1).with_offset(1));
        let csv = export(&source, ExportRequest::new(scope, ExportFormat::Csv)).await;
        assert_eq!(csv.content, "\"2\",\"3\"\n");
    }

    #[tokio::test]
    async fn test_zero_limit_rejected() {
        let scope = ExportScope::table(DB, "test_table").with_limit(RowLimit::first(0));
        let err = run(&source(), &ctx(), &ExportRequest::new(scope, ExportFormat::Csv))
            .await
            .unwrap_err();
        assert!(matches!(err, AdminError::Export(ExportError::InvalidRowLimit(_))));

        let request =
            ExportRequest::new(ExportScope::database(DB), ExportFormat::Csv).with_page_size(0);
        let err = run(&source(), &ctx(), &request).await.unwrap_err();
        assert!(matches!(err, AdminError::Export(ExportError::InvalidRowLimit(_))));
    }

    #[tokio::test]
    async fn test_paged_output_matches_single_page() {
        let source = three_row_source();
        let formats = [
            ExportRequest::new(ExportScope::database(DB), ExportFormat::Csv),
            ExportRequest::new(ExportScope::database(DB), ExportFormat::Sql)
                .with_options(sql_if_not_exists()),
            ExportRequest::new(ExportScope::database(DB), ExportFormat::Json),
        ];

        for request in formats {
            let whole = export(&source, request.clone()).await;
            for page_size in [1, 2, 3] {
                let paged = export(&source, request.clone().with_page_size(page_size)).await;
                assert_eq!(paged.content, whole.content, "page size {page_size}");
                assert_eq!(paged.rows, 3);
            }
        }
    }

    #[tokio::test]
    async fn test_row_window_across_pages() {
        let scope =
            ExportScope::table(DB, "test_table").with_limit(RowLimit::first(2).with_offset(1));
        let request = ExportRequest::new(scope, ExportFormat::Csv).with_page_size(1);
        let csv = export(&three_row_source(), request).await;

        assert_eq!(csv.content, "\"2\",\"3\"\n\"3\",\"4\"\n");
        assert_eq!(csv.rows, 2);
    }

    #[tokio::test]
    async fn test_run_to_writer() {
        let request = ExportRequest::new(ExportScope::database(DB), ExportFormat::Sql);
        let mut out = Vec::new();
        let summary = run_to(&two_row_source(), &ctx(), &request, &mut out)
            .await
            .unwrap();

        assert_eq!(summary.tables, 1);
        assert_eq!(summary.rows, 2);
        assert_eq!(summary.bytes, out.len());
        assert!(String::from_utf8(out).unwrap().ends_with("COMMIT;\n"));
    }

    #[tokio::test]
    async fn test_generated_column_not_inserted() {
        let source = MemorySource::new().with_table(
            MemoryTable::new(DB, "items")
                .column(ColumnSchema::new("price", "int(11)"))
                .column(ColumnSchema::new("total", "int(11)").generated())
                .row([10, 12]),
        );
        let request = ExportRequest::new(ExportScope::table(DB, "items"), ExportFormat::Sql);
        let content = export(&source, request).await.content;

        assert!(content.contains("INSERT INTO `items` (`price`) VALUES\n(10);\n"), "{content}");
        assert!(!content.contains("(10, 12)"));
    }

    #[tokio::test]
    async fn test_unknown_table() {
        let request = ExportRequest::new(ExportScope::table(DB, "missing"), ExportFormat::Csv);
        let err = run(&source(), &ctx(), &request).await.unwrap_err();
        assert!(matches!(
            err,
            AdminError::Database(DatabaseError::TableNotFound { .. })
        ));

        let request = ExportRequest::new(
            ExportScope::Database {
                database: DB.into(),
                tables: vec!["missing".into()],
            },
            ExportFormat::Csv,
        );
        let err = run(&source(), &ctx(), &request).await.unwrap_err();
        assert!(matches!(
            err,
            AdminError::Database(DatabaseError::TableNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_empty_server_scope() {
        let source = MemorySource::new().with_database("mysql");
        let request = ExportRequest::new(ExportScope::server(), ExportFormat::Sql);
        let err = run(&source, &ctx(), &request).await.unwrap_err();
        assert!(matches!(err, AdminError::Export(ExportError::EmptyScope(_))));
    }

    #[tokio::test]
    async fn test_server_scope_uses_database_charset() {
        let source = MemorySource::new()
            .with_database_info(DatabaseInfo::new(DB).with_charset("latin1", "latin1_bin"))
            .with_table(test_table().row([1, 2]));
        let request = ExportRequest::new(ExportScope::server(), ExportFormat::Sql);
        let content = export(&source, request).await.content;

        assert!(content.contains(
            "CREATE DATABASE IF NOT EXISTS `phpmyadmin_test` \
             DEFAULT CHARACTER SET latin1 COLLATE latin1_bin;"
        ));
    }

    #[tokio::test]
    async fn test_server_scope_skips_system_databases() {
        let request = ExportRequest::new(ExportScope::server(), ExportFormat::Sql);
        let artifact = export(&source(), request).await;

        assert!(artifact.content.contains("CREATE DATABASE IF NOT EXISTS `phpmyadmin_test`"));
        assert!(artifact.content.contains("USE `phpmyadmin_test`;"));
        assert!(!artifact.content.contains("`mysql`"));
        assert_eq!(artifact.suggested_file_name, "localhost_20240102_030405.sql");
    }

    #[tokio::test]
    async fn test_views_export_structure_only() {
        let source = source().with_table(MemoryTable::view(
            DB,
            "v_items",
            "CREATE VIEW `v_items` AS select `id` from `test_table`",
        ));
        let request = ExportRequest::new(ExportScope::database(DB), ExportFormat::Sql);
        let artifact = export(&source, request).await;

        assert!(artifact.content.contains("CREATE VIEW `v_items`"));
        assert!(!artifact.content.contains("Dumping data for table `v_items`"));
        assert_eq!(artifact.tables, 2);
        assert_eq!(artifact.rows, 1);
    }

    #[tokio::test]
    async fn test_structure_only_has_no_inserts() {
        let options = SqlOptions::default().structure_or_data(StructureOrData::Structure);
        let request =
            ExportRequest::new(ExportScope::database(DB), ExportFormat::Sql).with_options(options);
        let artifact = export(&source(), request).await;

        assert!(artifact.content.contains("CREATE TABLE `test_table`"));
        assert!(!artifact.content.contains("INSERT"));
    }

    #[tokio::test]
    async fn test_options_mismatch() {
        let request = ExportRequest::new(ExportScope::database(DB), ExportFormat::Csv)
            .with_options(JsonOptions::default());
        let err = run(&source(), &ctx(), &request).await.unwrap_err();
        assert!(matches!(
            err,
            AdminError::Export(ExportError::OptionsMismatch { format: "csv", options: "json" })
        ));
    }

    #[tokio::test]
    async fn test_invalid_identifier() {
        let request = ExportRequest::new(ExportScope::database("a/b"), ExportFormat::Csv);
        let err = run(&source(), &ctx(), &request).await.unwrap_err();
        assert!(matches!(
            err,
            AdminError::Security(SecurityError::InvalidIdentifier { .. })
        ));
    }

    #[test]
    fn test_format_parse() {
        assert_eq!("CSV".parse::<ExportFormat>().unwrap(), ExportFormat::Csv);
        assert_eq!("sql".parse::<ExportFormat>().unwrap(), ExportFormat::Sql);
        assert!(matches!(
            "xlsx".parse::<ExportFormat>(),
            Err(ExportError::UnsupportedFormat(_))
        ));
    }

    #[tokio::test]
    async fn test_write_to_directory() {
        let dir = tempfile::tempdir().unwrap();
        let request = ExportRequest::new(ExportScope::table(DB, "test_table"), ExportFormat::Json);
        let artifact = export(&source(), request).await;

        let path = artifact
            .write_to(&OutputTarget::Path(dir.path().to_path_buf()))
            .unwrap();
        assert_eq!(
            path.file_name().unwrap().to_str().unwrap(),
            "test_table_20240102_030405.json"
        );
        assert_eq!(std::fs::read_to_string(path).unwrap(), artifact.content);
    }

    #[tokio::test]
    async fn test_write_to_creates_parents() {
        let dir = tempfile::tempdir().unwrap();
        let artifact = export(
            &source(),
            ExportRequest::new(ExportScope::database(DB), ExportFormat::Csv),
        )
        .await;

        let target = dir.path().join("nested/out.csv");
        let path = artifact.write_to(&OutputTarget::Path(target.clone())).unwrap();
        assert_eq!(path, target);
        assert!(target.exists());
    }

    #[test]
    fn test_missing_output_directory_is_created() {
        let dir = tempfile::tempdir().unwrap();
        let exports = dir.path().join("exports");

        let path = OutputTarget::Directory(exports.clone())
            .resolve("shop_20240102_030405.sql")
            .unwrap();

        assert!(exports.is_dir());
        assert_eq!(path, exports.join("shop_20240102_030405.sql"));
    }

    #[test]
    fn test_missing_output_path_is_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("dump.sql");

        let path = OutputTarget::Path(target.clone()).resolve("ignored.sql").unwrap();
        assert_eq!(path, target);
    }
}
