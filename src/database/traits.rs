//! Data source trait.

use crate::database::result::{
    DatabaseInfo, PrimaryStatus, QueryResult, ReplicaStatus, ServerInfo, TableInfo, TableSchema,
};
use crate::error::DbResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Raw `SHOW GLOBAL STATUS` output: variable name to value.
pub type StatusVariables = HashMap<String, String>;

/// A window over a table's rows: skip `offset`, then take `count`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowLimit {
    pub count: u64,
    #[serde(default)]
    pub offset: u64,
}

impl RowLimit {
    pub fn first(count: u64) -> Self {
        Self { count, offset: 0 }
    }

    pub fn with_offset(mut self, offset: u64) -> Self {
        self.offset = offset;
        self
    }
}

/// Async handle to a MySQL-compatible server.
///
/// Every export and status operation receives one explicitly instead of reaching
/// for process-wide state. Implementations:
/// [`MySqlSource`](crate::database::MySqlSource) (feature `mysql`) and
/// [`MemorySource`](crate::database::MemorySource).
#[async_trait]
pub trait DataSource: Send + Sync {
    /// Returns the source name (e.g., "mysql", "memory").
    fn name(&self) -> &'static str;

    /// Host and version of the server, for dump headers.
    async fn server_info(&self) -> DbResult<ServerInfo>;

    /// Lists the databases visible to the connected user, in server order.
    async fn list_databases(&self) -> DbResult<Vec<String>>;

    /// Default character set and collation of a database.
    ///
    /// # Errors
    ///
    /// Returns [`DatabaseError::DatabaseNotFound`](crate::error::DatabaseError::DatabaseNotFound)
    /// if the database does not exist.
    async fn database_info(&self, database: &str) -> DbResult<DatabaseInfo>;

    /// Lists tables and views of a database, in server order.
    ///
    /// # Errors
    ///
    /// Returns [`DatabaseError::DatabaseNotFound`](crate::error::DatabaseError::DatabaseNotFound)
    /// if the database does not exist.
    async fn list_tables(&self, database: &str) -> DbResult<Vec<TableInfo>>;

    /// Gets the column layout and DDL of a table or view.
    ///
    /// # Errors
    ///
    /// Returns [`DatabaseError::TableNotFound`](crate::error::DatabaseError::TableNotFound)
    /// if the table does not exist.
    async fn table_schema(&self, database: &str, table: &str) -> DbResult<TableSchema>;

    /// Reads a table's rows in a stable order, so consecutive windows neither skip
    /// nor repeat rows.
    ///
    /// Result columns follow the schema's column order, also when no row matches.
    ///
    /// # Arguments
    ///
    /// * `schema` - Table to read, as returned by [`DataSource::table_schema`]
    /// * `limit` - Optional window; `None` reads every row
    async fn fetch_rows(
        &self,
        schema: &TableSchema,
        limit: Option<RowLimit>,
    ) -> DbResult<QueryResult>;

    /// Reads the server's global status counters.
    async fn global_status(&self) -> DbResult<StatusVariables>;

    /// Binary log coordinates if this server acts as a replication primary.
    async fn primary_status(&self) -> DbResult<Option<PrimaryStatus>>;

    /// Replica thread state if this server replicates from another.
    async fn replica_status(&self) -> DbResult<Option<ReplicaStatus>>;
}
