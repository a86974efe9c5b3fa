//! Database abstraction layer.
//!
//! Export and status code talks to the server only through [`DataSource`].
//!
//! # Feature Flags
//!
//! - `mysql` - Enable the `sqlx` MySQL/MariaDB source (enabled by default)
//!
//! Without `mysql`, only [`MemorySource`] is available:
//!
//! ```toml
//! [dependencies]
//! r3nz-mysql-admin = { version = "0.1", default-features = false }
//! ```

pub mod connection;
pub mod memory;
#[cfg(feature = "mysql")]
pub mod mysql;
pub mod result;
pub mod traits;

pub use connection::{ConnectionManager, ConnectionMetadata};
pub use memory::{MemorySource, MemoryTable};
#[cfg(feature = "mysql")]
pub use mysql::MySqlSource;
pub use result::*;
pub use traits::{DataSource, RowLimit, StatusVariables};

use crate::config::DatabaseConfig;
#[cfg(not(feature = "mysql"))]
use crate::error::DatabaseError;
use crate::error::DbResult;
use std::sync::Arc;

/// Open a data source for the given configuration.
///
/// # Errors
///
/// Returns [`DatabaseError::UnsupportedType`] if the `mysql` feature is disabled.
pub async fn connect_source(config: DatabaseConfig) -> DbResult<Arc<dyn DataSource>> {
    #[cfg(feature = "mysql")]
    {
        let source = MySqlSource::new(config).await?;
        Ok(Arc::new(source))
    }
    #[cfg(not(feature = "mysql"))]
    {
        let _ = config;
        Err(DatabaseError::UnsupportedType(
            "MySQL support not enabled. Enable the 'mysql' feature.".to_string(),
        ))
    }
}
