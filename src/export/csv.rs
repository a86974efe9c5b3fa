//! CSV export.

use crate::database::{CellValue, Column, Row, TableSchema};
use crate::error::ExportResult;
use crate::export::ExportFormat;
use crate::export::options::CsvOptions;
use crate::export::plugin::ExportPlugin;

pub struct CsvExporter {
    options: CsvOptions,
}

impl CsvExporter {
    pub fn new(options: CsvOptions) -> Self {
        Self { options }
    }

    fn enclose(&self, value: &str) -> String {
        let CsvOptions {
            enclosure, escape, ..
        } = &self.options;

        let mut value = if self.options.remove_crlf {
            value.replace(['\r', '\n'], "")
        } else {
            value.to_string()
        };

        if enclosure.is_empty() {
            return value;
        }

        // without an escape sequence the enclosure is doubled
        let escape = if escape.is_empty() { enclosure } else { escape };
        if escape != enclosure {
            value = value.replace(escape.as_str(), &format!("{escape}{escape}"));
        }
        let escaped = value.replace(enclosure.as_str(), &format!("{escape}{enclosure}"));
        format!("{enclosure}{escaped}{enclosure}")
    }

    fn field(&self, value: &CellValue) -> String {
        match value.to_text() {
            Some(text) => self.enclose(&text),
            None => self.options.null_as.clone(),
        }
    }

    fn write_line<I>(&self, out: &mut String, fields: I)
    where
        I: IntoIterator<Item = String>,
    {
        let line: Vec<String> = fields.into_iter().collect();
        out.push_str(&line.join(&self.options.separator));
        out.push_str(&self.options.terminator);
    }
}

impl ExportPlugin for CsvExporter {
    fn format(&self) -> ExportFormat {
        ExportFormat::Csv
    }

    fn table_data_start(
        &mut self,
        out: &mut String,
        _schema: &TableSchema,
        columns: &[Column],
    ) -> ExportResult<()> {
        if self.options.columns_header {
            self.write_line(out, columns.iter().map(|c| self.enclose(&c.name)));
        }
        Ok(())
    }

    fn table_rows(&mut self, out: &mut String, rows: &[Row]) -> ExportResult<()> {
        for row in rows {
            self.write_line(out, row.iter().map(|v| self.field(v)));
        }
        Ok(())
    }
}
