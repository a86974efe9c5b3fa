//! Server status: counter capture, replication role and the derived report.

pub mod format;
pub mod replication;
pub mod report;
pub mod snapshot;

pub use format::{format_byte_down, format_bytes, format_number, timespan_format};
pub use replication::{ReplicationInfo, ReplicationRole};
pub use report::{ConnectionRow, OVERRUN_HINT, StatusReport, TrafficRow};
pub use snapshot::{StatusSnapshot, StatusSnapshotBuilder};

use crate::database::DataSource;
use crate::error::Result;
use tracing::{debug, instrument};

/// Reads global status counters and replication state from the source.
#[instrument(skip(source), fields(source = source.name()))]
pub async fn capture(source: &dyn DataSource) -> Result<(StatusSnapshot, ReplicationInfo)> {
    let variables = source.global_status().await?;
    debug!("Read {} status variables", variables.len());

    let snapshot = StatusSnapshot::from_variables(&variables);
    let replication = ReplicationInfo::new(
        source.primary_status().await?,
        source.replica_status().await?,
    );

    Ok((snapshot, replication))
}
