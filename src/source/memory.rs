//! In-memory inspector backend.
//!
//! Holds task records and daily counters in process memory and answers the
//! same queries a real engine would. It does not process anything: records
//! are placed into a state directly and stay there until replaced.
//! Useful for development, demos and tests.

use super::{
    ActiveTask, DailyStats, DeadTask, InspectorBackend, ListOptions, PendingTask, QueueStats,
    RetryTask, ScheduledTask, ServerInfo,
};
use crate::error::{TaskmonError, TaskmonResult};
use crate::task::{Payload, TaskId};
use async_trait::async_trait;
use chrono::{DateTime, Days, NaiveDate, Utc};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Everything stored for a single queue
#[derive(Debug, Default)]
struct QueueRecord {
    paused: bool,
    active: Vec<ActiveTask>,
    pending: Vec<PendingTask>,
    scheduled: Vec<ScheduledTask>,
    retry: Vec<RetryTask>,
    dead: Vec<DeadTask>,
    /// (processed, failed) per day
    daily: BTreeMap<NaiveDate, (i64, i64)>,
}

impl QueueRecord {
    fn size(&self) -> i64 {
        (self.active.len()
            + self.pending.len()
            + self.scheduled.len()
            + self.retry.len()
            + self.dead.len()) as i64
    }
}

/// In-memory backend implementation
#[derive(Debug, Clone, Default)]
pub struct InMemoryInspector {
    queues: Arc<RwLock<HashMap<String, QueueRecord>>>,
    /// Pinned read time; wall clock when unset
    fixed_now: Option<DateTime<Utc>>,
}

impl InMemoryInspector {
    /// Create an empty backend
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty backend whose reads all happen at `now`
    pub fn with_fixed_time(now: DateTime<Utc>) -> Self {
        Self {
            fixed_now: Some(now),
            ..Self::default()
        }
    }

    fn now(&self) -> DateTime<Utc> {
        self.fixed_now.unwrap_or_else(Utc::now)
    }

    /// Register a queue with no tasks. No-op if it already exists.
    pub async fn create_queue(&self, queue: &str) {
        let mut queues = self.queues.write().await;
        queues.entry(queue.to_string()).or_default();
    }

    /// Mark a queue as paused
    pub async fn pause(&self, queue: &str) -> TaskmonResult<()> {
        self.set_paused(queue, true).await
    }

    /// Clear the paused flag of a queue
    pub async fn resume(&self, queue: &str) -> TaskmonResult<()> {
        self.set_paused(queue, false).await
    }

    async fn set_paused(&self, queue: &str, paused: bool) -> TaskmonResult<()> {
        let mut queues = self.queues.write().await;
        let record = queues
            .get_mut(queue)
            .ok_or_else(|| TaskmonError::queue_not_found(queue))?;
        record.paused = paused;
        tracing::debug!("Queue {} paused={}", queue, paused);
        Ok(())
    }

    /// Add a new pending task with a generated id and return the id
    pub async fn enqueue(&self, queue: &str, task_type: &str, payload: Payload) -> TaskId {
        let id = uuid::Uuid::new_v4().to_string();
        self.add_pending(PendingTask {
            id: id.clone(),
            task_type: task_type.to_string(),
            payload,
            queue: queue.to_string(),
        })
        .await;
        id
    }

    /// Store an active task under its queue
    pub async fn add_active(&self, task: ActiveTask) {
        let mut queues = self.queues.write().await;
        queues.entry(task.queue.clone()).or_default().active.push(task);
    }

    /// Store a pending task under its queue
    pub async fn add_pending(&self, task: PendingTask) {
        let mut queues = self.queues.write().await;
        queues.entry(task.queue.clone()).or_default().pending.push(task);
    }

    /// Store a scheduled task under its queue
    pub async fn add_scheduled(&self, task: ScheduledTask) {
        let mut queues = self.queues.write().await;
        queues
            .entry(task.queue.clone())
            .or_default()
            .scheduled
            .push(task);
    }

    /// Store a retry task under its queue
    pub async fn add_retry(&self, task: RetryTask) {
        let mut queues = self.queues.write().await;
        queues.entry(task.queue.clone()).or_default().retry.push(task);
    }

    /// Store a dead task under its queue
    pub async fn add_dead(&self, task: DeadTask) {
        let mut queues = self.queues.write().await;
        queues.entry(task.queue.clone()).or_default().dead.push(task);
    }

    /// Overwrite the processed/failed counters of a queue for one day
    pub async fn record_daily(&self, queue: &str, date: NaiveDate, processed: i64, failed: i64) {
        let mut queues = self.queues.write().await;
        queues
            .entry(queue.to_string())
            .or_default()
            .daily
            .insert(date, (processed, failed));
    }

    /// Run `f` against a queue, or fail if the queue is unknown
    async fn with_queue<T>(
        &self,
        queue: &str,
        f: impl FnOnce(&QueueRecord) -> T,
    ) -> TaskmonResult<T> {
        let queues = self.queues.read().await;
        queues
            .get(queue)
            .map(f)
            .ok_or_else(|| TaskmonError::queue_not_found(queue))
    }
}

#[async_trait]
impl InspectorBackend for InMemoryInspector {
    async fn queues(&self) -> TaskmonResult<Vec<String>> {
        let queues = self.queues.read().await;
        let mut names: Vec<String> = queues.keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    async fn current_stats(&self, queue: &str) -> TaskmonResult<QueueStats> {
        let now = self.now();
        let today = now.date_naive();

        self.with_queue(queue, |record| {
            let (processed, failed) = record.daily.get(&today).copied().unwrap_or((0, 0));
            QueueStats {
                queue: queue.to_string(),
                size: record.size(),
                active: record.active.len() as i64,
                pending: record.pending.len() as i64,
                scheduled: record.scheduled.len() as i64,
                retry: record.retry.len() as i64,
                dead: record.dead.len() as i64,
                processed,
                failed,
                paused: record.paused,
                timestamp: now,
            }
        })
        .await
    }

    async fn history(&self, queue: &str, days: u32) -> TaskmonResult<Vec<DailyStats>> {
        let today = self.now().date_naive();

        self.with_queue(queue, |record| {
            (0..days)
                .filter_map(|back| today.checked_sub_days(Days::new(u64::from(back))))
                .map(|date| {
                    let (processed, failed) = record.daily.get(&date).copied().unwrap_or((0, 0));
                    DailyStats {
                        queue: queue.to_string(),
                        processed,
                        failed,
                        date,
                    }
                })
                .collect()
        })
        .await
    }

    async fn list_active_tasks(
        &self,
        queue: &str,
        opts: ListOptions,
    ) -> TaskmonResult<Vec<ActiveTask>> {
        self.with_queue(queue, |record| opts.slice(&record.active).to_vec())
            .await
    }

    async fn list_pending_tasks(
        &self,
        queue: &str,
        opts: ListOptions,
    ) -> TaskmonResult<Vec<PendingTask>> {
        self.with_queue(queue, |record| opts.slice(&record.pending).to_vec())
            .await
    }

    async fn list_scheduled_tasks(
        &self,
        queue: &str,
        opts: ListOptions,
    ) -> TaskmonResult<Vec<ScheduledTask>> {
        self.with_queue(queue, |record| opts.slice(&record.scheduled).to_vec())
            .await
    }

    async fn list_retry_tasks(
        &self,
        queue: &str,
        opts: ListOptions,
    ) -> TaskmonResult<Vec<RetryTask>> {
        self.with_queue(queue, |record| opts.slice(&record.retry).to_vec())
            .await
    }

    async fn list_dead_tasks(
        &self,
        queue: &str,
        opts: ListOptions,
    ) -> TaskmonResult<Vec<DeadTask>> {
        self.with_queue(queue, |record| opts.slice(&record.dead).to_vec())
            .await
    }

    async fn server_info(&self) -> TaskmonResult<ServerInfo> {
        let queues = self.queues.read().await;
        let tasks: i64 = queues.values().map(QueueRecord::size).sum();
        let paused = queues.values().filter(|record| record.paused).count();

        let info = BTreeMap::from([
            ("queues".to_string(), queues.len().to_string()),
            ("paused_queues".to_string(), paused.to_string()),
            ("tasks".to_string(), tasks.to_string()),
        ]);

        Ok(ServerInfo {
            address: "memory".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            info,
            timestamp: self.now(),
        })
    }

    async fn health_check(&self) -> TaskmonResult<()> {
        Ok(())
    }
}
