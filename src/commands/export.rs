//! `export` command: stream the export pipeline into a file or stdout.

use crate::config::ExportSettings;
use crate::database::{DataSource, RowLimit};
use crate::error::ConfigError;
use crate::export::{
    self, CsvOptions, ExportContext, ExportFormat, ExportOptions, ExportRequest, ExportScope,
    InsertSyntax, JsonOptions, OutputTarget, SqlOptions, StructureOrData,
};
use anyhow::{Context, Result};
use clap::Args;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use tracing::{info, warn};

#[derive(Args, Debug, Clone)]
pub struct ExportArgs {
    /// Output format: csv, sql or json
    #[arg(long, short = 'f')]
    pub format: ExportFormat,
    /// Export a single database (or one table of it with --table)
    #[arg(long, short = 'd')]
    pub database: Option<String>,
    /// Export a single table; requires --database
    #[arg(long, short = 't', requires = "database")]
    pub table: Option<String>,
    /// Databases for a server export (comma-separated, default: all non-system)
    #[arg(long, value_delimiter = ',', conflicts_with = "database")]
    pub databases: Vec<String>,
    /// Tables of --database to export (comma-separated, default: all)
    #[arg(long, value_delimiter = ',', requires = "database", conflicts_with = "table")]
    pub tables: Vec<String>,
    /// Export only the first N rows of --table
    #[arg(long, requires = "table")]
    pub limit: Option<u64>,
    /// Skip the first M rows of --table
    #[arg(long, default_value_t = 0, requires = "limit")]
    pub offset: u64,
    /// SQL: dump structure only
    #[arg(long, conflicts_with = "data_only")]
    pub structure_only: bool,
    /// SQL: dump data only
    #[arg(long)]
    pub data_only: bool,
    /// SQL: CREATE TABLE IF NOT EXISTS
    #[arg(long)]
    pub if_not_exists: bool,
    /// SQL: add DROP TABLE / DROP VIEW before each CREATE
    #[arg(long)]
    pub drop_table: bool,
    /// SQL: add CREATE DATABASE / USE statements
    #[arg(long)]
    pub create_database: bool,
    /// SQL: omit comment lines
    #[arg(long)]
    pub no_comments: bool,
    /// SQL: one INSERT per row instead of extended inserts
    #[arg(long)]
    pub single_row_inserts: bool,
    /// CSV: field separator
    #[arg(long)]
    pub csv_separator: Option<String>,
    /// CSV: put column names in the first row
    #[arg(long)]
    pub csv_header: bool,
    /// JSON: indent row objects
    #[arg(long)]
    pub pretty: bool,
    /// Write to this file or directory instead of stdout
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,
}

impl ExportArgs {
    pub fn scope(&self) -> Result<ExportScope, ConfigError> {
        match (&self.database, &self.table) {
            (Some(database), Some(table)) => {
                let scope = ExportScope::table(database, table);
                Ok(match self.limit {
                    Some(count) => {
                        scope.with_limit(RowLimit::first(count).with_offset(self.offset))
                    }
                    None => scope,
                })
            }
            (Some(database), None) => Ok(ExportScope::Database {
                database: database.clone(),
                tables: self.tables.clone(),
            }),
            (None, Some(_)) => Err(ConfigError::MissingField("database".into())),
            (None, None) => Ok(ExportScope::Server {
                databases: self.databases.clone(),
            }),
        }
    }

    pub fn options(&self, settings: &ExportSettings) -> ExportOptions {
        match self.format {
            ExportFormat::Csv => {
                let mut options = CsvOptions::default().columns_header(self.csv_header);
                if let Some(separator) = &self.csv_separator {
                    options = options.separator(separator);
                }
                options.into()
            }
            ExportFormat::Sql => {
                let structure_or_data = if self.structure_only {
                    StructureOrData::Structure
                } else if self.data_only {
                    StructureOrData::Data
                } else {
                    StructureOrData::StructureAndData
                };
                let insert_syntax = if self.single_row_inserts {
                    InsertSyntax::SingleRow
                } else {
                    InsertSyntax::Extended
                };
                SqlOptions::default()
                    .structure_or_data(structure_or_data)
                    .if_not_exists(self.if_not_exists)
                    .drop_table(self.drop_table)
                    .create_database(self.create_database)
                    .include_comments(!self.no_comments)
                    .insert_syntax(insert_syntax)
                    .max_statement_size(settings.max_statement_size)
                    .into()
            }
            ExportFormat::Json => JsonOptions::default().pretty_print(self.pretty).into(),
        }
    }

    pub fn request(&self, settings: &ExportSettings) -> Result<ExportRequest, ConfigError> {
        Ok(ExportRequest::new(self.scope()?, self.format).with_options(self.options(settings)))
    }

    /// `--output` may name a file or a directory; `EXPORT_OUTPUT_DIR` is always a directory.
    pub fn target(&self, settings: &ExportSettings) -> Option<OutputTarget> {
        match (&self.output, &settings.output_dir) {
            (Some(path), _) => Some(OutputTarget::Path(path.clone())),
            (None, Some(dir)) => Some(OutputTarget::Directory(dir.clone())),
            (None, None) => None,
        }
    }
}

/// Runs an export against `source`.
///
/// Output goes to `--output`, else into `EXPORT_OUTPUT_DIR`, else to stdout. A file
/// left incomplete by a failed export is removed.
pub async fn export(
    source: &dyn DataSource,
    settings: &ExportSettings,
    args: &ExportArgs,
) -> Result<()> {
    let request = args.request(settings)?;

    let ctx = ExportContext::from_source(source)
        .await
        .context("Failed to read server information")?;

    let Some(target) = args.target(settings) else {
        let mut stdout = BufWriter::new(std::io::stdout());
        export::run_to(source, &ctx, &request, &mut stdout)
            .await
            .context("Export failed")?;
        stdout.flush()?;
        return Ok(());
    };

    let path = target
        .resolve(&request.suggested_file_name(&ctx))
        .context("Failed to prepare the output location")?;
    let file = File::create(&path).with_context(|| format!("Failed to create {}", path.display()))?;
    let mut writer = BufWriter::new(file);

    let summary = match export::run_to(source, &ctx, &request, &mut writer).await {
        Ok(summary) => summary,
        Err(e) => {
            drop(writer);
            if let Err(remove) = std::fs::remove_file(&path) {
                warn!("Failed to remove {}: {}", path.display(), remove);
            }
            return Err(e).context("Export failed");
        }
    };
    writer
        .flush()
        .with_context(|| format!("Failed to write {}", path.display()))?;

    info!(
        "Wrote {} ({} tables, {} rows)",
        path.display(),
        summary.tables,
        summary.rows
    );
    Ok(())
}
