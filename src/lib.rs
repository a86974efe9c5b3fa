//! MySQL/MariaDB export pipeline and server status reporting.
//!
//! Exports a server, database or table to CSV, SQL or JSON, and turns global
//! status counters into a readable traffic/connection/replication report. All
//! operations receive their [`DataSource`](database::DataSource) explicitly.
//!
//! # Example
//!
//! ```no_run
//! use r3nz_mysql_admin::{
//!     config::DatabaseConfigBuilder,
//!     database::ConnectionManager,
//!     export::{
//!         self, ExportContext, ExportFormat, ExportRequest, ExportScope, OutputTarget, SqlOptions,
//!     },
//! };
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = DatabaseConfigBuilder::new().from_env()?.build()?;
//!
//!     let manager = ConnectionManager::new();
//!     manager.connect(config).await?;
//!     let source = manager.source()?;
//!
//!     let request = ExportRequest::new(ExportScope::database("shop"), ExportFormat::Sql)
//!         .with_options(SqlOptions::default().if_not_exists(true));
//!     let ctx = ExportContext::from_source(source.as_ref()).await?;
//!     let artifact = export::run(source.as_ref(), &ctx, &request).await?;
//!
//!     artifact.write_to(&OutputTarget::Directory("/tmp/exports".into()))?;
//!     Ok(())
//! }
//! ```

pub mod commands;
pub mod config;
pub mod database;
pub mod error;
pub mod export;
pub mod security;
pub mod status;

pub use config::{AppConfig, DatabaseConfig, DatabaseConfigBuilder, ExportSettings};
pub use database::{ConnectionManager, DataSource, MemorySource, connect_source};
#[cfg(feature = "mysql")]
pub use database::MySqlSource;
pub use error::{AdminError, Result};
pub use export::{
    ExportArtifact, ExportContext, ExportFormat, ExportRequest, ExportScope, OutputTarget,
};
pub use status::{ReplicationInfo, StatusReport, StatusSnapshot};
