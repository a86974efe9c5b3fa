//! Replication role detection.

use crate::database::{PrimaryStatus, ReplicaStatus};
use serde::Serialize;
use std::fmt;

/// Replication state read alongside a [`StatusSnapshot`](crate::status::StatusSnapshot).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReplicationInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub primary: Option<PrimaryStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replica: Option<ReplicaStatus>,
}

impl ReplicationInfo {
    pub fn new(primary: Option<PrimaryStatus>, replica: Option<ReplicaStatus>) -> Self {
        Self { primary, replica }
    }

    pub fn role(&self) -> ReplicationRole {
        match (&self.primary, &self.replica) {
            (Some(_), Some(_)) => ReplicationRole::PrimaryAndReplica,
            (Some(_), None) => ReplicationRole::Primary,
            (None, Some(_)) => ReplicationRole::Replica,
            (None, None) => ReplicationRole::Standalone,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplicationRole {
    Primary,
    Replica,
    PrimaryAndReplica,
    Standalone,
}

impl ReplicationRole {
    /// Summary line for the status report.
    pub fn summary(self) -> &'static str {
        match self {
            Self::Primary => "This MySQL server works as primary in replication process.",
            Self::Replica => "This MySQL server works as replica in replication process.",
            Self::PrimaryAndReplica => {
                "This MySQL server works as primary and replica in replication process."
            }
            Self::Standalone => "This MySQL server is not configured for replication.",
        }
    }
}

impl fmt::Display for ReplicationRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Primary => "primary",
            Self::Replica => "replica",
            Self::PrimaryAndReplica => "primary and replica",
            Self::Standalone => "standalone",
        })
    }
}
