//! Export plugin trait.

use crate::database::{Column, DatabaseInfo, Row, TableSchema};
use crate::error::ExportResult;
use crate::export::{ExportContext, ExportFormat};

/// One output format.
///
/// The pipeline calls the hooks in document order:
///
/// ```text
/// header
///   database_header          (per database)
///     table_structure        (per table, if wants_structure)
///     table_data_start       (per table with data, if wants_data)
///       table_rows           (per page of rows)
///     table_data_end
///   database_footer
/// footer
/// ```
///
/// Every hook appends to `out`, which the pipeline flushes between pages. Hooks a
/// format does not need default to no-ops.
pub trait ExportPlugin: Send {
    fn format(&self) -> ExportFormat;

    fn wants_structure(&self) -> bool {
        false
    }

    fn wants_data(&self) -> bool {
        true
    }

    fn header(&mut self, _out: &mut String, _ctx: &ExportContext) -> ExportResult<()> {
        Ok(())
    }

    fn database_header(&mut self, _out: &mut String, _database: &DatabaseInfo) -> ExportResult<()> {
        Ok(())
    }

    fn table_structure(&mut self, _out: &mut String, _schema: &TableSchema) -> ExportResult<()> {
        Ok(())
    }

    /// Opens the data section of a table. Row values arrive in `columns` order.
    fn table_data_start(
        &mut self,
        _out: &mut String,
        _schema: &TableSchema,
        _columns: &[Column],
    ) -> ExportResult<()> {
        Ok(())
    }

    /// Serializes one page of rows of the table opened by `table_data_start`.
    fn table_rows(&mut self, out: &mut String, rows: &[Row]) -> ExportResult<()>;

    fn table_data_end(&mut self, _out: &mut String, _schema: &TableSchema) -> ExportResult<()> {
        Ok(())
    }

    fn database_footer(&mut self, _out: &mut String, _database: &DatabaseInfo) -> ExportResult<()> {
        Ok(())
    }

    fn footer(&mut self, _out: &mut String) -> ExportResult<()> {
        Ok(())
    }
}
