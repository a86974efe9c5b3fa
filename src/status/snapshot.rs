//! Point-in-time server counters.

use crate::database::StatusVariables;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tracing::warn;

/// Immutable capture of the counters the status report needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusSnapshot {
    uptime: u64,
    bytes_received: u64,
    bytes_sent: u64,
    max_used_connections: u64,
    aborted_connects: u64,
    connections: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    aborted_clients: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    threads_connected: Option<u64>,
    captured_at: DateTime<Utc>,
}

impl StatusSnapshot {
    pub fn builder() -> StatusSnapshotBuilder {
        StatusSnapshotBuilder::default()
    }

    /// Builds a snapshot from `SHOW GLOBAL STATUS` output.
    ///
    /// Missing or non-numeric counters read as zero.
    pub fn from_variables(variables: &StatusVariables) -> Self {
        let get = |name: &str| -> Option<u64> {
            let raw = variables.get(name)?;
            match raw.trim().parse::<u64>() {
                Ok(value) => Some(value),
                Err(_) => {
                    warn!("Ignoring non-numeric status variable {}={}", name, raw);
                    None
                }
            }
        };

        Self {
            uptime: get("Uptime").unwrap_or(0),
            bytes_received: get("Bytes_received").unwrap_or(0),
            bytes_sent: get("Bytes_sent").unwrap_or(0),
            max_used_connections: get("Max_used_connections").unwrap_or(0),
            aborted_connects: get("Aborted_connects").unwrap_or(0),
            connections: get("Connections").unwrap_or(0),
            aborted_clients: get("Aborted_clients"),
            threads_connected: get("Threads_connected"),
            captured_at: Utc::now(),
        }
    }

    /// Seconds since the server started.
    pub fn uptime(&self) -> u64 {
        self.uptime
    }

    pub fn bytes_received(&self) -> u64 {
        self.bytes_received
    }

    pub fn bytes_sent(&self) -> u64 {
        self.bytes_sent
    }

    pub fn max_used_connections(&self) -> u64 {
        self.max_used_connections
    }

    /// Failed connection attempts.
    pub fn aborted_connects(&self) -> u64 {
        self.aborted_connects
    }

    /// Connection attempts, successful or not.
    pub fn connections(&self) -> u64 {
        self.connections
    }

    /// Connections dropped without a proper close.
    pub fn aborted_clients(&self) -> Option<u64> {
        self.aborted_clients
    }

    pub fn threads_connected(&self) -> Option<u64> {
        self.threads_connected
    }

    pub fn captured_at(&self) -> DateTime<Utc> {
        self.captured_at
    }

    pub fn total_traffic(&self) -> u64 {
        self.bytes_received.saturating_add(self.bytes_sent)
    }

    /// Capture time minus uptime.
    pub fn started_at(&self) -> DateTime<Utc> {
        let uptime = i64::try_from(self.uptime).unwrap_or(i64::MAX);
        Duration::try_seconds(uptime)
            .and_then(|d| self.captured_at.checked_sub_signed(d))
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }

    /// Multiplier turning a since-startup total into a per-hour rate; zero when uptime is zero.
    pub fn hour_factor(&self) -> f64 {
        if self.uptime == 0 {
            0.0
        } else {
            3600.0 / self.uptime as f64
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct StatusSnapshotBuilder {
    uptime: u64,
    bytes_received: u64,
    bytes_sent: u64,
    max_used_connections: u64,
    aborted_connects: u64,
    connections: u64,
    aborted_clients: Option<u64>,
    threads_connected: Option<u64>,
    captured_at: Option<DateTime<Utc>>,
}

impl StatusSnapshotBuilder {
    pub fn uptime(mut self, seconds: u64) -> Self {
        self.uptime = seconds;
        self
    }

    pub fn bytes_received(mut self, bytes: u64) -> Self {
        self.bytes_received = bytes;
        self
    }

    pub fn bytes_sent(mut self, bytes: u64) -> Self {
        self.bytes_sent = bytes;
        self
    }

    pub fn max_used_connections(mut self, count: u64) -> Self {
        self.max_used_connections = count;
        self
    }

    pub fn aborted_connects(mut self, count: u64) -> Self {
        self.aborted_connects = count;
        self
    }

    pub fn connections(mut self, count: u64) -> Self {
        self.connections = count;
        self
    }

    pub fn aborted_clients(mut self, count: u64) -> Self {
        self.aborted_clients = Some(count);
        self
    }

    pub fn threads_connected(mut self, count: u64) -> Self {
        self.threads_connected = Some(count);
        self
    }

    pub fn captured_at(mut self, at: DateTime<Utc>) -> Self {
        self.captured_at = Some(at);
        self
    }

    pub fn build(self) -> StatusSnapshot {
        StatusSnapshot {
            uptime: self.uptime,
            bytes_received: self.bytes_received,
            bytes_sent: self.bytes_sent,
            max_used_connections: self.max_used_connections,
            aborted_connects: self.aborted_connects,
            connections: self.connections,
            aborted_clients: self.aborted_clients,
            threads_connected: self.threads_connected,
            captured_at: self.captured_at.unwrap_or_else(Utc::now),
        }
    }
}
