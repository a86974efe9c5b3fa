//! Holds the active data source behind `Arc<RwLock<Option<ActiveSource>>>`.

use crate::config::DatabaseConfig;
use crate::database::{DataSource, connect_source};
use crate::error::{DatabaseError, DbResult};
use parking_lot::RwLock;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info};

struct ActiveSource {
    source: Arc<dyn DataSource>,
    metadata: ConnectionMetadata,
}

/// What the manager is currently connected to.
#[derive(Debug, Clone, Serialize)]
pub struct ConnectionMetadata {
    pub connected: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

impl ConnectionMetadata {
    pub fn disconnected() -> Self {
        Self {
            connected: false,
            source: None,
            host: None,
            port: None,
            database: None,
            username: None,
        }
    }

    fn from_config(source: &'static str, config: &DatabaseConfig) -> Self {
        Self {
            connected: true,
            source: Some(source),
            host: Some(config.host.clone()),
            port: Some(config.port),
            database: (!config.database.is_empty()).then(|| config.database.clone()),
            username: Some(config.username.clone()),
        }
    }
}

/// Owns the single data source of the process and hands out shared handles.
#[derive(Clone, Default)]
pub struct ConnectionManager {
    state: Arc<RwLock<Option<ActiveSource>>>,
}

impl ConnectionManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_connected(&self) -> bool {
        self.state.read().is_some()
    }

    pub fn metadata(&self) -> ConnectionMetadata {
        match &*self.state.read() {
            Some(active) => active.metadata.clone(),
            None => ConnectionMetadata::disconnected(),
        }
    }

    /// Returns `NotConnected` error if no active connection.
    pub fn source(&self) -> DbResult<Arc<dyn DataSource>> {
        self.state
            .read()
            .as_ref()
            .map(|a| Arc::clone(&a.source))
            .ok_or(DatabaseError::NotConnected)
    }

    /// If already connected, disconnects first.
    pub async fn connect(&self, config: DatabaseConfig) -> DbResult<ConnectionMetadata> {
        if self.is_connected() {
            debug!("Disconnecting existing connection before new connection");
            self.disconnect();
        }

        let source = connect_source(config.clone()).await?;
        let metadata = ConnectionMetadata::from_config(source.name(), &config);
        self.install(source, metadata.clone());

        info!(
            "Connected to {} on {}",
            metadata.database.as_deref().unwrap_or("server"),
            metadata.host.as_deref().unwrap_or("unknown")
        );

        Ok(metadata)
    }

    /// Installs an already constructed source, e.g. a
    /// [`MemorySource`](crate::database::MemorySource).
    pub fn attach(&self, source: Arc<dyn DataSource>) -> ConnectionMetadata {
        let metadata = ConnectionMetadata {
            connected: true,
            source: Some(source.name()),
            ..ConnectionMetadata::disconnected()
        };
        self.install(source, metadata.clone());
        metadata
    }

    fn install(&self, source: Arc<dyn DataSource>, metadata: ConnectionMetadata) {
        *self.state.write() = Some(ActiveSource { source, metadata });
    }

    pub fn disconnect(&self) -> ConnectionMetadata {
        match self.state.write().take() {
            Some(active) => {
                info!(
                    "Disconnected from {}",
                    active.metadata.host.as_deref().unwrap_or(active.source.name())
                );
                active.metadata
            }
            None => ConnectionMetadata::disconnected(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::MemorySource;

    #[test]
    fn test_connection_manager_initial_state() {
        let manager = ConnectionManager::new();
        assert!(!manager.is_connected());
        assert!(matches!(manager.source(), Err(DatabaseError::NotConnected)));
    }

    #[test]
    fn test_attach_and_disconnect() {
        let manager = ConnectionManager::new();
        let metadata = manager.attach(Arc::new(MemorySource::new()));
        assert!(metadata.connected);
        assert_eq!(metadata.source, Some("memory"));

        // clones share state
        let other = manager.clone();
        assert_eq!(other.source().unwrap().name(), "memory");

        let old = other.disconnect();
        assert!(old.connected);
        assert!(!manager.is_connected());
    }

    #[test]
    fn test_metadata_from_config() {
        let config = DatabaseConfig::default();
        let metadata = ConnectionMetadata::from_config("mysql", &config);
        assert_eq!(metadata.host.as_deref(), Some("localhost"));
        assert_eq!(metadata.port, Some(3306));
        assert!(metadata.database.is_none());

        let json = serde_json::to_string(&metadata).unwrap();
        assert!(json.contains("\"connected\":true"));
        assert!(!json.contains("\"database\""));
    }
}
