//! JSON export.
//!
//! The document is an array of typed objects: one header, then a `database`
//! object per database followed by a `table` object per table holding its rows.
//! Every non-NULL cell is written as a string.

use crate::database::{CellValue, Column, DatabaseInfo, Row, TableSchema};
use crate::error::{ExportError, ExportResult};
use crate::export::options::JsonOptions;
use crate::export::plugin::ExportPlugin;
use crate::export::{ExportContext, ExportFormat};
use serde_json::{Map, Value, json};

pub struct JsonExporter {
    options: JsonOptions,
    /// Whether a top-level element has been written already.
    started: bool,
    /// Column names of the table whose rows are being written.
    columns: Vec<String>,
    rows_written: usize,
}

impl JsonExporter {
    pub fn new(options: JsonOptions) -> Self {
        Self {
            options,
            started: false,
            columns: Vec::new(),
            rows_written: 0,
        }
    }

    fn begin_element(&mut self, out: &mut String) {
        if self.started {
            out.push_str(",\n");
        }
        self.started = true;
    }

    fn row_object(&self, row: &Row) -> Value {
        let object: Map<String, Value> = self
            .columns
            .iter()
            .zip(row)
            .map(|(name, value)| (name.clone(), cell_to_json(value)))
            .collect();
        Value::Object(object)
    }

    fn encode(&self, value: &Value) -> ExportResult<String> {
        let encoded = if self.options.pretty_print {
            serde_json::to_string_pretty(value)
        } else {
            serde_json::to_string(value)
        };
        encoded.map_err(render_error)
    }
}

fn render_error(e: serde_json::Error) -> ExportError {
    ExportError::Render {
        format: "json",
        message: e.to_string(),
    }
}

fn cell_to_json(value: &CellValue) -> Value {
    match value.to_text() {
        Some(text) => Value::String(text),
        None => Value::Null,
    }
}

impl ExportPlugin for JsonExporter {
    fn format(&self) -> ExportFormat {
        ExportFormat::Json
    }

    fn header(&mut self, out: &mut String, ctx: &ExportContext) -> ExportResult<()> {
        out.push_str("[\n");
        self.begin_element(out);
        let header = json!({
            "type": "header",
            "version": ctx.version,
            "comment": format!("Export to JSON plugin for {}", ctx.generator),
        });
        out.push_str(&serde_json::to_string(&header).map_err(render_error)?);
        Ok(())
    }

    fn database_header(&mut self, out: &mut String, database: &DatabaseInfo) -> ExportResult<()> {
        self.begin_element(out);
        let object = json!({ "type": "database", "name": database.name });
        out.push_str(&serde_json::to_string(&object).map_err(render_error)?);
        Ok(())
    }

    fn table_data_start(
        &mut self,
        out: &mut String,
        schema: &TableSchema,
        columns: &[Column],
    ) -> ExportResult<()> {
        self.begin_element(out);

        let name = serde_json::to_string(&schema.name).map_err(render_error)?;
        let database = serde_json::to_string(&schema.database).map_err(render_error)?;
        out.push_str(&format!(
            "{{\"type\":\"table\",\"name\":{name},\"database\":{database},\"data\":\n[\n"
        ));

        self.columns = columns.iter().map(|c| c.name.clone()).collect();
        self.rows_written = 0;
        Ok(())
    }

    fn table_rows(&mut self, out: &mut String, rows: &[Row]) -> ExportResult<()> {
        for row in rows {
            if self.rows_written > 0 {
                out.push_str(",\n");
            }
            out.push_str(&self.encode(&self.row_object(row))?);
            self.rows_written += 1;
        }
        Ok(())
    }

    fn table_data_end(&mut self, out: &mut String, _schema: &TableSchema) -> ExportResult<()> {
        out.push_str("\n]\n}");
        self.columns.clear();
        Ok(())
    }

    fn footer(&mut self, out: &mut String) -> ExportResult<()> {
        if !self.started {
            out.push('[');
        }
        out.push_str("\n]\n");
        Ok(())
    }
}
