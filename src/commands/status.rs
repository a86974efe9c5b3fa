//! `status` command: print the server status report.

use crate::database::DataSource;
use crate::status::{self, StatusReport};
use anyhow::{Context, Result};
use clap::Args;

#[derive(Args, Debug, Clone, Default)]
pub struct StatusArgs {
    /// Print the report as JSON instead of text
    #[arg(long)]
    pub json: bool,
}

/// Captures counters from `source` and renders the report.
pub async fn status_report(source: &dyn DataSource, args: &StatusArgs) -> Result<String> {
    let (snapshot, replication) = status::capture(source)
        .await
        .context("Failed to read server status")?;
    let report = StatusReport::new(&snapshot, &replication);

    if args.json {
        Ok(serde_json::to_string_pretty(&report)?)
    } else {
        Ok(report.render())
    }
}

pub async fn status(source: &dyn DataSource, args: &StatusArgs) -> Result<()> {
    let output = status_report(source, args).await?;
    println!("{output}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::MemorySource;

    fn source() -> MemorySource {
        MemorySource::new()
            .with_status("Uptime", 7200)
            .with_status("Bytes_received", 4096)
            .with_status("Bytes_sent", 1024)
            .with_status("Connections", 20)
    }

    #[tokio::test]
    async fn test_text_report() {
        let text = status_report(&source(), &StatusArgs::default()).await.unwrap();
        assert!(text.contains("Network traffic since startup: 5.0 KiB"));
        assert!(text.contains("0 days, 2 hours, 0 minutes and 0 seconds"));
        assert!(text.contains("not configured for replication"));
    }

    #[tokio::test]
    async fn test_json_report() {
        let json = status_report(&source(), &StatusArgs { json: true }).await.unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["role"], "standalone");
        assert_eq!(value["traffic"][0]["label"], "Received");
    }
}
