//! Failover events handed to notification sinks
//!
//! An event is a snapshot of one completed record transition. It is built by
//! the reconciliation worker after a successful record replacement and fanned
//! out to every configured notifier on a detached task.

use chrono::{DateTime, Utc};

use crate::config::RecordType;

/// Snapshot of a record-set transition for one origin
#[derive(Debug, Clone)]
pub struct FailoverEvent {
    /// Record name of the origin
    pub origin_name: String,
    /// Zone the origin belongs to
    pub zone_name: String,
    /// Record type of the origin
    pub record_type: RecordType,

    /// Record set served before the transition
    pub old_ips: Vec<String>,
    /// Record set served after the transition
    pub new_ips: Vec<String>,

    /// Priority level served before the transition
    pub old_priority: i64,
    /// Priority level served after the transition
    pub new_priority: i64,
    /// Highest configured priority for the origin
    pub max_priority: i64,

    /// Human-readable summary of why the transition happened
    pub reason: String,
    /// When the transition completed
    pub timestamp: DateTime<Utc>,

    /// True iff the new level is the highest configured level
    pub is_priority_ip: bool,
    /// True iff the new level is below the highest configured level
    pub is_failover_ip: bool,
    /// The origin's return-to-priority policy flag
    pub return_to_priority: bool,
}

impl FailoverEvent {
    /// First IP of the old set, for single-value display fields
    pub fn old_ip(&self) -> &str {
        self.old_ips.first().map(String::as_str).unwrap_or("")
    }

    /// First IP of the new set, for single-value display fields
    pub fn new_ip(&self) -> &str {
        self.new_ips.first().map(String::as_str).unwrap_or("")
    }

    /// All new IPs joined for display
    pub fn new_ips_display(&self) -> String {
        if self.new_ips.is_empty() {
            return self.new_ip().to_string();
        }
        self.new_ips.join(", ")
    }

    /// Origin identity as `name.zone (TYPE)`
    pub fn origin_display(&self) -> String {
        format!("{}.{} ({})", self.origin_name, self.zone_name, self.record_type)
    }
}
