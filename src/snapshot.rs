//! Queue-level snapshot types.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Point-in-time view of one named queue.
///
/// Counts are signed so that inconsistent engine data passes through
/// unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueStateSnapshot {
    /// Name of the queue
    pub queue: String,
    /// Total number of tasks in the queue
    pub size: i64,
    /// Number of active tasks
    pub active: i64,
    /// Number of pending tasks
    pub pending: i64,
    /// Number of scheduled tasks
    pub scheduled: i64,
    /// Number of tasks waiting for a retry
    pub retry: i64,
    /// Number of dead tasks
    pub dead: i64,
    /// Tasks processed today, succeeded and failed alike
    pub processed: i64,
    /// Processed tasks that succeeded (`processed - failed`)
    pub succeeded: i64,
    /// Processed tasks that failed
    pub failed: i64,
    /// When true the queue admits no new processing
    pub paused: bool,
    /// When the counts were read
    pub timestamp: DateTime<Utc>,
}

impl QueueStateSnapshot {
    /// Sum of the five per-state counts
    pub fn state_total(&self) -> i64 {
        [self.pending, self.scheduled, self.retry, self.dead]
            .into_iter()
            .fold(self.active, i64::saturating_add)
    }

    /// Whether the processed/succeeded/failed counters agree
    pub fn is_consistent(&self) -> bool {
        self.succeeded >= 0 && self.succeeded.checked_add(self.failed) == Some(self.processed)
    }
}

/// Processed/failed rollup for one queue and one calendar day
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyStats {
    pub queue: String,
    pub processed: i64,
    pub succeeded: i64,
    pub failed: i64,
    /// The day this bucket covers
    pub date: NaiveDate,
}

impl DailyStats {
    /// Whether the processed/succeeded/failed counters agree
    pub fn is_consistent(&self) -> bool {
        self.succeeded >= 0 && self.succeeded.checked_add(self.failed) == Some(self.processed)
    }
}

/// Broker details for a dashboard's server page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerInfo {
    pub address: String,
    pub version: String,
    /// Key/value details, sorted by key
    pub info: BTreeMap<String, String>,
    pub timestamp: DateTime<Utc>,
}
