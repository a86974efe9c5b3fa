//! In-memory data source.
//!
//! Holds a fixed catalog of databases, tables, rows and status counters. Used for
//! tests and for exporting fixtures without a running server.

use crate::database::result::*;
use crate::database::traits::{DataSource, RowLimit, StatusVariables};
use crate::error::{DatabaseError, DbResult};
use async_trait::async_trait;
use std::time::Instant;
use tracing::{debug, instrument};

/// A table and its rows.
#[derive(Debug, Clone)]
pub struct MemoryTable {
    schema: TableSchema,
    rows: Vec<Row>,
}

impl MemoryTable {
    pub fn new(database: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            schema: TableSchema {
                database: database.into(),
                name: name.into(),
                table_type: TableType::Table,
                columns: Vec::new(),
                primary_key: None,
                engine: Some("InnoDB".into()),
                create_statement: None,
            },
            rows: Vec::new(),
        }
    }

    /// A view; views carry structure but never rows.
    pub fn view(
        database: impl Into<String>,
        name: impl Into<String>,
        create_statement: impl Into<String>,
    ) -> Self {
        let mut table = Self::new(database, name);
        table.schema.table_type = TableType::View;
        table.schema.engine = None;
        table.schema.create_statement = Some(create_statement.into());
        table
    }

    pub fn column(mut self, column: ColumnSchema) -> Self {
        if column.is_primary_key {
            let pk = self.schema.primary_key.get_or_insert_with(|| PrimaryKey {
                name: "PRIMARY".into(),
                columns: Vec::new(),
            });
            pk.columns.push(column.name.clone());
        }
        self.schema.columns.push(column);
        self
    }

    pub fn create_statement(mut self, statement: impl Into<String>) -> Self {
        self.schema.create_statement = Some(statement.into());
        self
    }

    /// Appends a row; values are matched to columns by position and missing
    /// trailing values read as NULL.
    pub fn row<I, V>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<CellValue>,
    {
        let mut row: Row = values
            .into_iter()
            .take(self.schema.columns.len())
            .map(Into::into)
            .collect();
        row.resize(self.schema.columns.len(), CellValue::Null);
        self.rows.push(row);
        self
    }

    fn info(&self) -> TableInfo {
        TableInfo {
            database: self.schema.database.clone(),
            name: self.schema.name.clone(),
            table_type: self.schema.table_type,
            row_count: self
                .schema
                .table_type
                .has_data()
                .then_some(self.rows.len() as u64),
        }
    }
}

/// Data source backed by in-process fixtures.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    server: ServerInfo,
    databases: Vec<DatabaseInfo>,
    tables: Vec<MemoryTable>,
    status: StatusVariables,
    primary: Option<PrimaryStatus>,
    replica: Option<ReplicaStatus>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self {
            server: ServerInfo {
                host: "localhost".into(),
                version: "8.0.36".into(),
            },
            ..Default::default()
        }
    }

    pub fn with_server(mut self, host: impl Into<String>, version: impl Into<String>) -> Self {
        self.server = ServerInfo {
            host: host.into(),
            version: version.into(),
        };
        self
    }

    /// Registers an empty database without charset defaults.
    pub fn with_database(self, name: impl Into<String>) -> Self {
        self.with_database_info(DatabaseInfo::new(name))
    }

    /// Registers a database, replacing the defaults of an existing one.
    pub fn with_database_info(mut self, info: DatabaseInfo) -> Self {
        match self.databases.iter_mut().find(|d| d.name == info.name) {
            Some(existing) => *existing = info,
            None => self.databases.push(info),
        }
        self
    }

    /// Registers a table, creating its database if needed.
    pub fn with_table(mut self, table: MemoryTable) -> Self {
        if !self.has_database(&table.schema.database) {
            self = self.with_database(table.schema.database.clone());
        }
        self.tables.push(table);
        self
    }

    pub fn with_status(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        self.status.insert(name.into(), value.to_string());
        self
    }

    pub fn with_primary(mut self, status: PrimaryStatus) -> Self {
        self.primary = Some(status);
        self
    }

    pub fn with_replica(mut self, status: ReplicaStatus) -> Self {
        self.replica = Some(status);
        self
    }

    fn has_database(&self, name: &str) -> bool {
        self.databases.iter().any(|d| d.name == name)
    }

    fn find_table(&self, database: &str, table: &str) -> DbResult<&MemoryTable> {
        self.tables
            .iter()
            .find(|t| t.schema.database == database && t.schema.name == table)
            .ok_or_else(|| DatabaseError::TableNotFound {
                database: database.to_string(),
                table: table.to_string(),
            })
    }
}

#[async_trait]
impl DataSource for MemorySource {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn server_info(&self) -> DbResult<ServerInfo> {
        Ok(self.server.clone())
    }

    async fn list_databases(&self) -> DbResult<Vec<String>> {
        Ok(self.databases.iter().map(|d| d.name.clone()).collect())
    }

    async fn database_info(&self, database: &str) -> DbResult<DatabaseInfo> {
        self.databases
            .iter()
            .find(|d| d.name == database)
            .cloned()
            .ok_or_else(|| DatabaseError::DatabaseNotFound(database.to_string()))
    }

    async fn list_tables(&self, database: &str) -> DbResult<Vec<TableInfo>> {
        if !self.has_database(database) {
            return Err(DatabaseError::DatabaseNotFound(database.to_string()));
        }

        Ok(self
            .tables
            .iter()
            .filter(|t| t.schema.database == database)
            .map(MemoryTable::info)
            .collect())
    }

    async fn table_schema(&self, database: &str, table: &str) -> DbResult<TableSchema> {
        self.find_table(database, table).map(|t| t.schema.clone())
    }

    #[instrument(skip(self, schema), fields(source = "memory", table = %schema.name))]
    async fn fetch_rows(
        &self,
        schema: &TableSchema,
        limit: Option<RowLimit>,
    ) -> DbResult<QueryResult> {
        let start = Instant::now();
        let found = self.find_table(&schema.database, &schema.name)?;

        let rows: Vec<Row> = match limit {
            Some(limit) => found
                .rows
                .iter()
                .skip(limit.offset as usize)
                .take(limit.count as usize)
                .cloned()
                .collect(),
            None => found.rows.clone(),
        };

        debug!("Fetched {} of {} rows", rows.len(), found.rows.len());

        let columns = found
            .schema
            .columns
            .iter()
            .map(|c| Column::new(&c.name, &c.data_type).with_nullable(c.nullable))
            .collect();
        let elapsed = start.elapsed().as_millis() as u64;
        Ok(QueryResult::new(columns, rows, elapsed))
    }

    async fn global_status(&self) -> DbResult<StatusVariables> {
        Ok(self.status.clone())
    }

    async fn primary_status(&self) -> DbResult<Option<PrimaryStatus>> {
        Ok(self.primary.clone())
    }

    async fn replica_status(&self) -> DbResult<Option<ReplicaStatus>> {
        Ok(self.replica.clone())
    }
}
