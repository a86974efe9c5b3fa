//! Derived status values and their plain-text rendering.

use crate::status::format::{format_bytes, format_number, timespan_format};
use crate::status::{ReplicationInfo, ReplicationRole, StatusSnapshot};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

pub const OVERRUN_HINT: &str = "On a busy server, the byte counters may overrun, so those \
     statistics as reported by the MySQL server may be incorrect.";

const NOT_APPLICABLE: &str = "---";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrafficRow {
    pub label: &'static str,
    pub value: String,
    pub per_hour: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectionRow {
    pub label: &'static str,
    pub value: String,
    pub per_hour: String,
    pub percentage: String,
}

/// Display values computed from one snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    pub total_traffic: String,
    pub uptime: String,
    pub started_at: DateTime<Utc>,
    pub role: ReplicationRole,
    pub traffic: Vec<TrafficRow>,
    pub connections: Vec<ConnectionRow>,
}

impl StatusReport {
    pub fn new(snapshot: &StatusSnapshot, replication: &ReplicationInfo) -> Self {
        let hour_factor = snapshot.hour_factor();

        let traffic_row = |label, bytes: u64| TrafficRow {
            label,
            value: format_bytes(bytes as f64, 3, 1),
            per_hour: format_bytes(bytes as f64 * hour_factor, 3, 1),
        };

        let total_connections = snapshot.connections();
        let percentage = |count: u64| {
            if total_connections == 0 {
                NOT_APPLICABLE.to_string()
            } else {
                let pct = count as f64 * 100.0 / total_connections as f64;
                format!("{}%", format_number(pct, 2))
            }
        };
        let counted_row = |label, count: u64| ConnectionRow {
            label,
            value: format_number(count as f64, 0),
            per_hour: format_number(count as f64 * hour_factor, 2),
            percentage: percentage(count),
        };

        let mut connections = vec![
            ConnectionRow {
                label: "Max. concurrent connections",
                value: format_number(snapshot.max_used_connections() as f64, 0),
                per_hour: NOT_APPLICABLE.to_string(),
                percentage: NOT_APPLICABLE.to_string(),
            },
            counted_row("Failed attempts", snapshot.aborted_connects()),
        ];
        if let Some(aborted) = snapshot.aborted_clients() {
            connections.push(counted_row("Aborted", aborted));
        }
        connections.push(counted_row("Total", total_connections));

        Self {
            total_traffic: format_bytes(snapshot.total_traffic() as f64, 3, 1),
            uptime: timespan_format(snapshot.uptime()),
            started_at: snapshot.started_at(),
            role: replication.role(),
            traffic: vec![
                traffic_row("Received", snapshot.bytes_received()),
                traffic_row("Sent", snapshot.bytes_sent()),
                traffic_row("Total", snapshot.total_traffic()),
            ],
            connections,
        }
    }

    /// Plain-text report, one section per block.
    pub fn render(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for StatusReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Network traffic since startup: {}", self.total_traffic)?;
        writeln!(
            f,
            "This MySQL server has been running for {}. It started up on {}.",
            self.uptime,
            self.started_at.format("%b %d, %Y at %I:%M %p")
        )?;
        writeln!(f, "{}", self.role.summary())?;
        writeln!(f)?;

        let traffic: Vec<Vec<String>> = self
            .traffic
            .iter()
            .map(|r| vec![r.label.to_string(), r.value.clone(), r.per_hour.clone()])
            .collect();
        write_table(f, &["Traffic", "#", "ø per hour"], &traffic)?;
        writeln!(f, "{OVERRUN_HINT}")?;
        writeln!(f)?;

        let connections: Vec<Vec<String>> = self
            .connections
            .iter()
            .map(|r| {
                vec![
                    r.label.to_string(),
                    r.value.clone(),
                    r.per_hour.clone(),
                    r.percentage.clone(),
                ]
            })
            .collect();
        write_table(f, &["Connections", "#", "ø per hour", "%"], &connections)
    }
}

/// First column left-aligned, the rest right-aligned.
fn write_table(f: &mut fmt::Formatter<'_>, headers: &[&str], rows: &[Vec<String>]) -> fmt::Result {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            widths[i] = widths[i].max(cell.chars().count());
        }
    }

    let line = |cells: &[&str]| {
        let mut text = String::new();
        for (i, cell) in cells.iter().enumerate() {
            if i > 0 {
                text.push_str("  ");
            }
            let pad = widths[i].saturating_sub(cell.chars().count());
            if i == 0 {
                text.push_str(cell);
                text.push_str(&" ".repeat(pad));
            } else {
                text.push_str(&" ".repeat(pad));
                text.push_str(cell);
            }
        }
        text.trim_end().to_string()
    };

    writeln!(f, "{}", line(headers))?;
    for row in rows {
        let cells: Vec<&str> = row.iter().map(String::as_str).collect();
        writeln!(f, "{}", line(&cells))?;
    }
    Ok(())
}
