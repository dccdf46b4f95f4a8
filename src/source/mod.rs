//! Source records and the engine query seam.
//!
//! The queue engine owns the real state. taskmon only reads it through an
//! [`InspectorBackend`], which hands back the plain records defined here.
//! Those records are then projected into the snapshot types.
//!
//! # Examples
//!
//! ```rust
//! use taskmon::source::{InMemoryInspector, InspectorBackend, ListOptions};
//! use serde_json::json;
//!
//! # tokio_test::block_on(async {
//! let engine = InMemoryInspector::new();
//! engine.enqueue("email", "send_email", json!({"to": "a@example.com"}).into()).await;
//!
//! let stats = engine.current_stats("email").await?;
//! assert_eq!(stats.pending, 1);
//!
//! let pending = engine.list_pending_tasks("email", ListOptions::default()).await?;
//! assert_eq!(pending.len(), 1);
//! # Ok::<(), taskmon::TaskmonError>(())
//! # }).unwrap();
//! ```

use crate::error::TaskmonResult;
use crate::task::{Payload, TaskId};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use std::collections::BTreeMap;

pub mod memory;
pub use memory::InMemoryInspector;

/// Aggregate statistics for one queue as reported by the engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueStats {
    /// Name of the queue
    pub queue: String,
    /// Total number of tasks in the queue
    pub size: i64,
    pub active: i64,
    pub pending: i64,
    pub scheduled: i64,
    pub retry: i64,
    pub dead: i64,
    /// Tasks processed today, including failures
    pub processed: i64,
    /// Tasks that failed today
    pub failed: i64,
    /// Whether the queue is paused
    pub paused: bool,
    /// When the statistics were read
    pub timestamp: DateTime<Utc>,
}

/// Processed/failed counters for one queue and day
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DailyStats {
    pub queue: String,
    pub processed: i64,
    pub failed: i64,
    pub date: NaiveDate,
}

/// Task being processed by a worker
#[derive(Debug, Clone, PartialEq)]
pub struct ActiveTask {
    pub id: TaskId,
    pub task_type: String,
    pub payload: Payload,
    pub queue: String,
}

/// Task waiting for a worker
#[derive(Debug, Clone, PartialEq)]
pub struct PendingTask {
    pub id: TaskId,
    pub task_type: String,
    pub payload: Payload,
    pub queue: String,
}

/// Task scheduled for a future time
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduledTask {
    pub id: TaskId,
    pub task_type: String,
    pub payload: Payload,
    pub queue: String,
    pub next_process_at: DateTime<Utc>,
}

/// Failed task waiting for a retry
#[derive(Debug, Clone, PartialEq)]
pub struct RetryTask {
    pub id: TaskId,
    pub task_type: String,
    pub payload: Payload,
    pub queue: String,
    pub next_process_at: DateTime<Utc>,
    pub max_retry: i64,
    pub retried: i64,
    pub error_msg: String,
}

/// Task that exhausted its retries
#[derive(Debug, Clone, PartialEq)]
pub struct DeadTask {
    pub id: TaskId,
    pub task_type: String,
    pub payload: Payload,
    pub queue: String,
    pub max_retry: i64,
    pub retried: i64,
    pub error_msg: String,
    pub last_failed_at: DateTime<Utc>,
}

/// Engine and broker details as reported by the engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerInfo {
    /// Where the engine's broker lives
    pub address: String,
    /// Broker software version
    pub version: String,
    /// Free-form key/value details (memory, uptime, clients, ...)
    pub info: BTreeMap<String, String>,
    /// When the details were read
    pub timestamp: DateTime<Utc>,
}

/// Paging for task listings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListOptions {
    /// 1-based page number; 0 is read as 1
    pub page: usize,
    /// Maximum number of records per page
    pub page_size: usize,
}

impl Default for ListOptions {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: 20,
        }
    }
}

impl ListOptions {
    /// Options for a specific page with the default page size.
    pub fn page(page: usize) -> Self {
        Self {
            page,
            ..Default::default()
        }
    }

    /// Set the page size.
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    /// Index of the first record on this page
    pub fn offset(&self) -> usize {
        self.page.max(1).saturating_sub(1).saturating_mul(self.page_size)
    }

    /// Select this page out of an ordered slice
    pub fn slice<'a, T>(&self, items: &'a [T]) -> &'a [T] {
        let start = self.offset().min(items.len());
        let end = start.saturating_add(self.page_size).min(items.len());
        &items[start..end]
    }
}

/// Read-only query API of the queue engine.
///
/// Implementations return records already materialized; every record handed
/// back is owned by the caller.
#[async_trait]
pub trait InspectorBackend: Send + Sync {
    /// Names of all known queues, sorted
    async fn queues(&self) -> TaskmonResult<Vec<String>>;

    /// Current aggregate statistics of a queue
    async fn current_stats(&self, queue: &str) -> TaskmonResult<QueueStats>;

    /// Daily counters for the last `days` days, newest first, today included
    async fn history(&self, queue: &str, days: u32) -> TaskmonResult<Vec<DailyStats>>;

    /// Tasks currently being processed
    async fn list_active_tasks(
        &self,
        queue: &str,
        opts: ListOptions,
    ) -> TaskmonResult<Vec<ActiveTask>>;

    /// Tasks waiting for a worker
    async fn list_pending_tasks(
        &self,
        queue: &str,
        opts: ListOptions,
    ) -> TaskmonResult<Vec<PendingTask>>;

    /// Tasks scheduled for later
    async fn list_scheduled_tasks(
        &self,
        queue: &str,
        opts: ListOptions,
    ) -> TaskmonResult<Vec<ScheduledTask>>;

    /// Tasks waiting for a retry
    async fn list_retry_tasks(
        &self,
        queue: &str,
        opts: ListOptions,
    ) -> TaskmonResult<Vec<RetryTask>>;

    /// Tasks that exhausted their retries
    async fn list_dead_tasks(
        &self,
        queue: &str,
        opts: ListOptions,
    ) -> TaskmonResult<Vec<DeadTask>>;

    /// Details about the engine's broker
    async fn server_info(&self) -> TaskmonResult<ServerInfo>;

    /// Health check for the engine connection
    async fn health_check(&self) -> TaskmonResult<()>;
}
