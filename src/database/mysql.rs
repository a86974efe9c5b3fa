//! MySQL/MariaDB data source using `sqlx`.

use crate::config::DatabaseConfig;
use crate::database::result::*;
use crate::database::traits::{DataSource, RowLimit, StatusVariables};
use crate::error::{DatabaseError, DbResult};
use crate::security::quote_identifier;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rust_decimal::Decimal;
use sqlx::mysql::types::MySqlTime;
use sqlx::mysql::{
    MySqlConnectOptions, MySqlDatabaseError, MySqlPool, MySqlPoolOptions, MySqlRow,
};
use sqlx::{Column as _, Row as _, TypeInfo as _, ValueRef as _};
use std::future::Future;
use std::time::Instant;
use tokio::time::timeout;
use tracing::{debug, info, instrument, warn};

const ER_PARSE_ERROR: u16 = 1064;
const ER_NO_SUCH_TABLE: u16 = 1146;
const ER_SPECIFIC_ACCESS_DENIED: u16 = 1227;

const ZERO_DATE: &str = "0000-00-00";
const ZERO_DATETIME: &str = "0000-00-00 00:00:00";

/// How a result column is read, chosen from the driver's type name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CellDecoder {
    Signed,
    Unsigned,
    /// `TINYINT(1)`, reported as `BOOLEAN` but holding any tinyint value.
    Boolean,
    Year,
    Bit,
    Float,
    Decimal,
    Date,
    Time,
    DateTime,
    Json,
    Binary,
    Text,
}

fn decoder_for(type_name: &str) -> CellDecoder {
    let unsigned = type_name.ends_with(" UNSIGNED");
    match type_name.trim_end_matches(" UNSIGNED") {
        "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "BIGINT" if unsigned => {
            CellDecoder::Unsigned
        }
        "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "BIGINT" => CellDecoder::Signed,
        "BOOLEAN" => CellDecoder::Boolean,
        "YEAR" => CellDecoder::Year,
        "BIT" => CellDecoder::Bit,
        "FLOAT" | "DOUBLE" => CellDecoder::Float,
        "DECIMAL" => CellDecoder::Decimal,
        "DATE" => CellDecoder::Date,
        "TIME" => CellDecoder::Time,
        "DATETIME" | "TIMESTAMP" => CellDecoder::DateTime,
        "JSON" => CellDecoder::Json,
        "BINARY" | "VARBINARY" | "TINYBLOB" | "BLOB" | "MEDIUMBLOB" | "LONGBLOB" | "GEOMETRY" => {
            CellDecoder::Binary
        }
        _ => CellDecoder::Text,
    }
}

/// What to do when a replication status statement fails.
#[derive(Debug, PartialEq, Eq)]
enum StatusFallback {
    /// The server does not know this syntax; try the older spelling.
    TryNext,
    /// The user may not run it; report the role as not configured.
    NotPermitted,
    Fail,
}

fn status_fallback(error_number: Option<u16>) -> StatusFallback {
    match error_number {
        Some(ER_PARSE_ERROR) => StatusFallback::TryNext,
        Some(ER_SPECIFIC_ACCESS_DENIED) => StatusFallback::NotPermitted,
        _ => StatusFallback::Fail,
    }
}

fn error_number(error: &sqlx::Error) -> Option<u16> {
    match error {
        sqlx::Error::Database(db) => db
            .try_downcast_ref::<MySqlDatabaseError>()
            .map(MySqlDatabaseError::number),
        _ => None,
    }
}

/// `EXTRA` marks computed columns as `VIRTUAL GENERATED`, `STORED GENERATED` or,
/// on MariaDB, `PERSISTENT GENERATED`. `DEFAULT_GENERATED` is an expression default.
fn is_generated_column(extra: &str) -> bool {
    let extra = extra.to_ascii_uppercase();
    ["VIRTUAL GENERATED", "STORED GENERATED", "PERSISTENT GENERATED"]
        .iter()
        .any(|marker| extra.contains(marker))
}

fn connect_options(config: &DatabaseConfig) -> MySqlConnectOptions {
    let mut options = MySqlConnectOptions::new()
        .host(&config.host)
        .port(config.port)
        .username(&config.username);
    if !config.password.is_empty() {
        options = options.password(&config.password);
    }
    if !config.database.is_empty() {
        options = options.database(&config.database);
    }
    options
}

/// MySQL data source backed by a connection pool.
pub struct MySqlSource {
    pool: MySqlPool,
    config: DatabaseConfig,
}

impl MySqlSource {
    /// Create a new pool and verify it with a first connection.
    pub async fn new(config: DatabaseConfig) -> DbResult<Self> {
        info!(
            "Connecting to MySQL: {}:{}/{}",
            config.host, config.port, config.database
        );

        let pool = MySqlPoolOptions::new()
            .max_connections(config.pool_size)
            .acquire_timeout(config.connection_timeout)
            .connect_with(connect_options(&config))
            .await
            .map_err(|e| DatabaseError::ConnectionFailed(e.to_string()))?;

        info!(
            "MySQL connection pool created with max size {}",
            config.pool_size
        );

        Ok(Self { pool, config })
    }

    /// Runs a query under the configured query timeout, keeping the driver error.
    async fn timed<T, F>(&self, fut: F) -> DbResult<Result<T, sqlx::Error>>
    where
        F: Future<Output = Result<T, sqlx::Error>>,
    {
        let limit = self.config.query_timeout;
        timeout(limit, fut)
            .await
            .map_err(|_| DatabaseError::Timeout(limit.as_millis() as u64))
    }

    async fn with_timeout<T, F>(&self, fut: F) -> DbResult<T>
    where
        F: Future<Output = Result<T, sqlx::Error>>,
    {
        self.timed(fut)
            .await?
            .map_err(|e| DatabaseError::QueryFailed(e.to_string()))
    }

    async fn fetch_all(&self, sql: &str) -> DbResult<Vec<MySqlRow>> {
        debug!("Executing query: {}", sql);
        self.with_timeout(sqlx::query(sql).fetch_all(&self.pool))
            .await
    }

    /// Runs the first statement the server understands.
    ///
    /// Replication statements were renamed across MySQL versions. A missing
    /// privilege yields `None`; timeouts and connection failures propagate.
    async fn fetch_first_supported(
        &self,
        statements: &[&str],
    ) -> DbResult<Option<Vec<MySqlRow>>> {
        for sql in statements {
            debug!("Executing query: {}", sql);
            let error = match self.timed(sqlx::query(sql).fetch_all(&self.pool)).await? {
                Ok(rows) => return Ok(Some(rows)),
                Err(e) => e,
            };

            match status_fallback(error_number(&error)) {
                StatusFallback::TryNext => debug!("'{}' not supported: {}", sql, error),
                StatusFallback::NotPermitted => {
                    warn!("Not permitted to run '{}': {}", sql, error);
                    return Ok(None);
                }
                StatusFallback::Fail => {
                    return Err(DatabaseError::QueryFailed(error.to_string()));
                }
            }
        }
        warn!("None of {:?} is supported by this server", statements);
        Ok(None)
    }

    /// Information schema columns may come back as binary strings.
    fn get_string(row: &MySqlRow, column: &str) -> Option<String> {
        if let Ok(value) = row.try_get::<Option<String>, _>(column) {
            return value;
        }
        row.try_get::<Option<Vec<u8>>, _>(column)
            .ok()
            .flatten()
            .map(|b| String::from_utf8_lossy(&b).into_owned())
    }

    fn get_string_at(row: &MySqlRow, index: usize) -> Option<String> {
        if let Ok(value) = row.try_get::<Option<String>, _>(index) {
            return value;
        }
        row.try_get::<Option<Vec<u8>>, _>(index)
            .ok()
            .flatten()
            .map(|b| String::from_utf8_lossy(&b).into_owned())
    }

    fn get_u64(row: &MySqlRow, column: &str) -> Option<u64> {
        row.try_get::<Option<u64>, _>(column)
            .ok()
            .flatten()
            .or_else(|| {
                row.try_get::<Option<i64>, _>(column)
                    .ok()
                    .flatten()
                    .and_then(|v| u64::try_from(v).ok())
            })
            .or_else(|| Self::get_string(row, column).and_then(|s| s.parse().ok()))
    }

    /// Extract a cell value from a MySQL row.
    fn get_cell_value(
        row: &MySqlRow,
        index: usize,
        decoder: CellDecoder,
    ) -> Result<CellValue, sqlx::Error> {
        if row.try_get_raw(index)?.is_null() {
            return Ok(CellValue::Null);
        }

        let value = match decoder {
            CellDecoder::Signed => CellValue::Int(row.try_get(index)?),
            CellDecoder::Unsigned => CellValue::UInt(row.try_get(index)?),
            // the unsigned flag is not part of these type names
            CellDecoder::Boolean | CellDecoder::Year => match row.try_get::<i64, _>(index) {
                Ok(v) => CellValue::Int(v),
                Err(_) => CellValue::UInt(row.try_get(index)?),
            },
            CellDecoder::Bit => match row.try_get::<u64, _>(index) {
                Ok(v) => CellValue::UInt(v),
                Err(_) => CellValue::Bytes(row.try_get_unchecked(index)?),
            },
            CellDecoder::Float => match row.try_get::<f64, _>(index) {
                Ok(v) => CellValue::Float(v),
                Err(_) => CellValue::Float(row.try_get::<f32, _>(index)? as f64),
            },
            // wider than rust_decimal's 28 digits
            CellDecoder::Decimal => match row.try_get::<Decimal, _>(index) {
                Ok(v) => CellValue::Decimal(v),
                Err(_) => CellValue::String(row.try_get_unchecked(index)?),
            },
            CellDecoder::Date => match row.try_get::<NaiveDate, _>(index) {
                Ok(v) => CellValue::Date(v),
                Err(e) => Self::zero_temporal(row, index, ZERO_DATE, e)?,
            },
            // durations beyond 00:00..24:00 and negative values
            CellDecoder::Time => match row.try_get::<NaiveTime, _>(index) {
                Ok(v) => CellValue::Time(v),
                Err(_) => CellValue::String(row.try_get::<MySqlTime, _>(index)?.to_string()),
            },
            CellDecoder::DateTime => match row.try_get::<NaiveDateTime, _>(index) {
                Ok(v) => CellValue::DateTime(v),
                Err(e) => match row.try_get::<DateTime<Utc>, _>(index) {
                    Ok(v) => CellValue::DateTime(v.naive_utc()),
                    Err(_) => Self::zero_temporal(row, index, ZERO_DATETIME, e)?,
                },
            },
            CellDecoder::Json => CellValue::String(row.try_get_unchecked(index)?),
            CellDecoder::Binary => CellValue::Bytes(row.try_get(index)?),
            CellDecoder::Text => match row.try_get::<String, _>(index) {
                Ok(v) => CellValue::String(v),
                Err(_) => CellValue::Bytes(row.try_get_unchecked(index)?),
            },
        };
        Ok(value)
    }

    /// Zero dates arrive empty (binary protocol) or as literal zeros (text protocol).
    fn zero_temporal(
        row: &MySqlRow,
        index: usize,
        zero: &'static str,
        error: sqlx::Error,
    ) -> Result<CellValue, sqlx::Error> {
        let raw: Vec<u8> = row.try_get_unchecked(index)?;
        if raw.is_empty() || raw.starts_with(ZERO_DATE.as_bytes()) {
            Ok(CellValue::String(zero.to_string()))
        } else {
            Err(error)
        }
    }

    fn convert_rows(
        rows: &[MySqlRow],
        schema: &TableSchema,
    ) -> DbResult<(Vec<Column>, Vec<Row>)> {
        let Some(first) = rows.first() else {
            // no rows: fall back to the declared column list
            let columns = schema
                .columns
                .iter()
                .map(|c| Column::new(&c.name, &c.data_type).with_nullable(c.nullable))
                .collect();
            return Ok((columns, Vec::new()));
        };

        let columns: Vec<Column> = first
            .columns()
            .iter()
            .map(|c| Column::new(c.name(), c.type_info().name()))
            .collect();
        let decoders: Vec<CellDecoder> =
            columns.iter().map(|c| decoder_for(&c.data_type)).collect();

        let converted = rows
            .iter()
            .map(|row| {
                decoders
                    .iter()
                    .enumerate()
                    .map(|(i, decoder)| {
                        Self::get_cell_value(row, i, *decoder).map_err(|e| {
                            DatabaseError::UnsupportedType(format!(
                                "{} column {}.{}: {}",
                                columns[i].data_type, schema.name, columns[i].name, e
                            ))
                        })
                    })
                    .collect::<DbResult<Row>>()
            })
            .collect::<DbResult<Vec<Row>>>()?;

        Ok((columns, converted))
    }
}

#[async_trait]
impl DataSource for MySqlSource {
    fn name(&self) -> &'static str {
        "mysql"
    }

    async fn server_info(&self) -> DbResult<ServerInfo> {
        let row = self
            .with_timeout(sqlx::query("SELECT VERSION() AS version").fetch_one(&self.pool))
            .await?;

        Ok(ServerInfo {
            host: self.config.host.clone(),
            version: Self::get_string(&row, "version").unwrap_or_default(),
        })
    }

    #[instrument(skip(self), fields(db = "mysql"))]
    async fn list_databases(&self) -> DbResult<Vec<String>> {
        let rows = self.fetch_all("SHOW DATABASES").await?;
        Ok(rows
            .iter()
            .filter_map(|r| Self::get_string_at(r, 0))
            .collect())
    }

    #[instrument(skip(self), fields(db = "mysql"))]
    async fn database_info(&self, database: &str) -> DbResult<DatabaseInfo> {
        let rows = self
            .with_timeout(
                sqlx::query(
                    r#"
                    SELECT DEFAULT_CHARACTER_SET_NAME AS charset,
                           DEFAULT_COLLATION_NAME AS collation
                    FROM information_schema.SCHEMATA
                    WHERE SCHEMA_NAME = ?
                    "#,
                )
                .bind(database)
                .fetch_all(&self.pool),
            )
            .await?;

        let Some(row) = rows.first() else {
            return Err(DatabaseError::DatabaseNotFound(database.to_string()));
        };

        Ok(DatabaseInfo {
            name: database.to_string(),
            character_set: Self::get_string(row, "charset"),
            collation: Self::get_string(row, "collation"),
        })
    }

    #[instrument(skip(self), fields(db = "mysql"))]
    async fn list_tables(&self, database: &str) -> DbResult<Vec<TableInfo>> {
        let rows = self
            .with_timeout(
                sqlx::query(
                    r#"
                    SELECT TABLE_NAME AS name, TABLE_TYPE AS kind, TABLE_ROWS AS row_count
                    FROM information_schema.TABLES
                    WHERE TABLE_SCHEMA = ?
                    ORDER BY TABLE_NAME
                    "#,
                )
                .bind(database)
                .fetch_all(&self.pool),
            )
            .await?;

        if rows.is_empty() {
            // distinguishes an empty database from a missing one
            self.database_info(database).await?;
        }

        Ok(rows
            .iter()
            .map(|r| TableInfo {
                database: database.to_string(),
                name: Self::get_string(r, "name").unwrap_or_default(),
                table_type: TableType::from_information_schema(
                    &Self::get_string(r, "kind").unwrap_or_default(),
                ),
                row_count: Self::get_u64(r, "row_count"),
            })
            .collect())
    }

    #[instrument(skip(self), fields(db = "mysql"))]
    async fn table_schema(&self, database: &str, table: &str) -> DbResult<TableSchema> {
        let table_rows = self
            .with_timeout(
                sqlx::query(
                    r#"
                    SELECT TABLE_TYPE AS kind, ENGINE AS engine
                    FROM information_schema.TABLES
                    WHERE TABLE_SCHEMA = ? AND TABLE_NAME = ?
                    "#,
                )
                .bind(database)
                .bind(table)
                .fetch_all(&self.pool),
            )
            .await?;

        let Some(table_row) = table_rows.first() else {
            return Err(DatabaseError::TableNotFound {
                database: database.to_string(),
                table: table.to_string(),
            });
        };

        let kind = Self::get_string(table_row, "kind").unwrap_or_default();
        let table_type = TableType::from_information_schema(&kind);
        let engine = Self::get_string(table_row, "engine");

        let column_rows = self
            .with_timeout(
                sqlx::query(
                    r#"
                    SELECT COLUMN_NAME AS name, COLUMN_TYPE AS column_type,
                           IS_NULLABLE AS nullable, COLUMN_DEFAULT AS default_value,
                           COLUMN_KEY AS column_key, EXTRA AS extra
                    FROM information_schema.COLUMNS
                    WHERE TABLE_SCHEMA = ? AND TABLE_NAME = ?
                    ORDER BY ORDINAL_POSITION
                    "#,
                )
                .bind(database)
                .bind(table)
                .fetch_all(&self.pool),
            )
            .await?;

        let columns: Vec<ColumnSchema> = column_rows
            .iter()
            .map(|r| {
                let extra = Self::get_string(r, "extra").unwrap_or_default();
                ColumnSchema {
                    name: Self::get_string(r, "name").unwrap_or_default(),
                    data_type: Self::get_string(r, "column_type").unwrap_or_default(),
                    nullable: Self::get_string(r, "nullable").as_deref() == Some("YES"),
                    default_value: Self::get_string(r, "default_value"),
                    is_primary_key: Self::get_string(r, "column_key").as_deref() == Some("PRI"),
                    is_auto_increment: extra.contains("auto_increment"),
                    is_generated: is_generated_column(&extra),
                }
            })
            .collect();

        let pk_columns: Vec<String> = columns
            .iter()
            .filter(|c| c.is_primary_key)
            .map(|c| c.name.clone())
            .collect();
        let primary_key = (!pk_columns.is_empty()).then(|| PrimaryKey {
            name: "PRIMARY".into(),
            columns: pk_columns,
        });

        let show_create = format!(
            "SHOW CREATE TABLE {}.{}",
            quote_identifier(database),
            quote_identifier(table)
        );
        let create_statement = self
            .fetch_all(&show_create)
            .await?
            .first()
            .and_then(|r| Self::get_string_at(r, 1));

        Ok(TableSchema {
            database: database.to_string(),
            name: table.to_string(),
            table_type,
            columns,
            primary_key,
            engine,
            create_statement,
        })
    }

    #[instrument(skip(self, schema), fields(db = "mysql", table = %schema.name))]
    async fn fetch_rows(
        &self,
        schema: &TableSchema,
        limit: Option<RowLimit>,
    ) -> DbResult<QueryResult> {
        let start = Instant::now();

        let mut sql = format!(
            "SELECT * FROM {}.{}",
            quote_identifier(&schema.database),
            quote_identifier(&schema.name)
        );
        if let Some(pk) = &schema.primary_key
            && !pk.columns.is_empty()
        {
            let order: Vec<String> = pk.columns.iter().map(|c| quote_identifier(c)).collect();
            sql.push_str(&format!(" ORDER BY {}", order.join(", ")));
        }
        if let Some(limit) = limit {
            sql.push_str(&format!(" LIMIT {} OFFSET {}", limit.count, limit.offset));
        }

        debug!("Executing query: {}", sql);
        let rows = self
            .timed(sqlx::query(&sql).fetch_all(&self.pool))
            .await?
            .map_err(|e| match error_number(&e) {
                Some(ER_NO_SUCH_TABLE) => DatabaseError::TableNotFound {
                    database: schema.database.clone(),
                    table: schema.name.clone(),
                },
                _ => DatabaseError::QueryFailed(e.to_string()),
            })?;

        let (columns, converted) = Self::convert_rows(&rows, schema)?;
        let elapsed = start.elapsed().as_millis() as u64;
        Ok(QueryResult::new(columns, converted, elapsed))
    }

    #[instrument(skip(self), fields(db = "mysql"))]
    async fn global_status(&self) -> DbResult<StatusVariables> {
        let rows = self.fetch_all("SHOW GLOBAL STATUS").await?;

        Ok(rows
            .iter()
            .filter_map(|r| {
                let name = Self::get_string(r, "Variable_name")?;
                let value = Self::get_string(r, "Value").unwrap_or_default();
                Some((name, value))
            })
            .collect())
    }

    async fn primary_status(&self) -> DbResult<Option<PrimaryStatus>> {
        let Some(rows) = self
            .fetch_first_supported(&["SHOW BINARY LOG STATUS", "SHOW MASTER STATUS"])
            .await?
        else {
            return Ok(None);
        };

        Ok(rows.first().and_then(|r| {
            Some(PrimaryStatus {
                binlog_file: Self::get_string(r, "File")?,
                position: Self::get_u64(r, "Position").unwrap_or(0),
            })
        }))
    }

    async fn replica_status(&self) -> DbResult<Option<ReplicaStatus>> {
        let Some(rows) = self
            .fetch_first_supported(&["SHOW REPLICA STATUS", "SHOW SLAVE STATUS"])
            .await?
        else {
            return Ok(None);
        };

        Ok(rows.first().map(|r| {
            let running = |new: &str, old: &str| {
                Self::get_string(r, new)
                    .or_else(|| Self::get_string(r, old))
                    .is_some_and(|v| v.eq_ignore_ascii_case("yes"))
            };
            ReplicaStatus {
                source_host: Self::get_string(r, "Source_Host")
                    .or_else(|| Self::get_string(r, "Master_Host"))
                    .unwrap_or_default(),
                io_running: running("Replica_IO_Running", "Slave_IO_Running"),
                sql_running: running("Replica_SQL_Running", "Slave_SQL_Running"),
                seconds_behind: Self::get_u64(r, "Seconds_Behind_Source")
                    .or_else(|| Self::get_u64(r, "Seconds_Behind_Master")),
            }
        }))
    }
}
