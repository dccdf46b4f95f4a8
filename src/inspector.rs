//! The inspector facade.
//!
//! [`Inspector`] is the main entry point for an API or dashboard layer. It
//! queries an [`InspectorBackend`] and returns projected snapshots, applying
//! the configured derived-metric policy and request bounds.

use crate::config::TaskmonConfig;
use crate::error::{TaskmonError, TaskmonResult};
use crate::projector::{self, Projector};
use crate::snapshot::{DailyStats, QueueStateSnapshot, ServerInfo};
use crate::source::{InMemoryInspector, InspectorBackend, ListOptions};
use crate::task::{
    ActiveTask, DeadTask, PendingTask, RetryTask, ScheduledTask, TaskSnapshot, TaskState,
};
use futures::future::try_join_all;
use std::sync::Arc;

/// Read-side facade over a queue engine.
///
/// # Examples
///
/// ```rust
/// use taskmon::prelude::*;
/// use serde_json::json;
///
/// # tokio_test::block_on(async {
/// let engine = InMemoryInspector::new();
/// engine.enqueue("email", "send_email", json!({"to": "a@example.com"}).into()).await;
///
/// let inspector = Inspector::new(TaskmonConfig::default(), engine)?;
/// let snapshot = inspector.queue_snapshot("email").await?;
/// assert_eq!(snapshot.pending, 1);
/// # Ok::<(), TaskmonError>(())
/// # }).unwrap();
/// ```
#[derive(Clone)]
pub struct Inspector {
    backend: Arc<dyn InspectorBackend>,
    projector: Projector,
    config: TaskmonConfig,
}

impl std::fmt::Debug for Inspector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Inspector")
            .field("projector", &self.projector)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Inspector {
    /// Create an inspector over the given backend.
    pub fn new<B: InspectorBackend + 'static>(
        config: TaskmonConfig,
        backend: B,
    ) -> TaskmonResult<Self> {
        Self::with_shared_backend(config, Arc::new(backend))
    }

    /// Create an inspector over a backend that is shared with other owners.
    pub fn with_shared_backend(
        config: TaskmonConfig,
        backend: Arc<dyn InspectorBackend>,
    ) -> TaskmonResult<Self> {
        config
            .validate()
            .map_err(|errors| TaskmonError::config(errors.join("; ")))?;

        Ok(Self {
            backend,
            projector: Projector::new(config.projection.derived_metrics),
            config,
        })
    }

    /// Create an inspector over a fresh in-memory backend, returning both.
    pub fn in_memory(config: TaskmonConfig) -> TaskmonResult<(Self, InMemoryInspector)> {
        let engine = InMemoryInspector::new();
        let inspector = Self::new(config, engine.clone())?;
        Ok((inspector, engine))
    }

    pub fn config(&self) -> &TaskmonConfig {
        &self.config
    }

    pub fn projector(&self) -> Projector {
        self.projector
    }

    /// Names of all queues known to the engine
    pub async fn queues(&self) -> TaskmonResult<Vec<String>> {
        self.backend.queues().await
    }

    /// Current snapshot of one queue
    pub async fn queue_snapshot(&self, queue: &str) -> TaskmonResult<QueueStateSnapshot> {
        tracing::debug!("Reading stats for queue {}", queue);
        let stats = self.backend.current_stats(queue).await?;
        self.projector.queue_snapshot(&stats)
    }

    /// Snapshots of every queue, in the order the engine lists them
    pub async fn all_queue_snapshots(&self) -> TaskmonResult<Vec<QueueStateSnapshot>> {
        let queues = self.backend.queues().await?;
        tracing::debug!("Reading stats for {} queues", queues.len());
        try_join_all(queues.iter().map(|queue| self.queue_snapshot(queue))).await
    }

    /// Daily stats for the last `days` days, newest first.
    ///
    /// 0 days means the configured default; requests above the configured
    /// maximum are clamped.
    pub async fn queue_history(&self, queue: &str, days: u32) -> TaskmonResult<Vec<DailyStats>> {
        let days = self.history_days(days);
        tracing::debug!("Reading {} days of history for queue {}", days, queue);
        let history = self.backend.history(queue, days).await?;
        self.projector.daily_stats_list(&history)
    }

    pub async fn active_tasks(
        &self,
        queue: &str,
        opts: ListOptions,
    ) -> TaskmonResult<Vec<ActiveTask>> {
        let tasks = self
            .backend
            .list_active_tasks(queue, self.list_options(opts))
            .await?;
        Ok(projector::project_active_tasks(&tasks))
    }

    pub async fn pending_tasks(
        &self,
        queue: &str,
        opts: ListOptions,
    ) -> TaskmonResult<Vec<PendingTask>> {
        let tasks = self
            .backend
            .list_pending_tasks(queue, self.list_options(opts))
            .await?;
        Ok(projector::project_pending_tasks(&tasks))
    }

    pub async fn scheduled_tasks(
        &self,
        queue: &str,
        opts: ListOptions,
    ) -> TaskmonResult<Vec<ScheduledTask>> {
        let tasks = self
            .backend
            .list_scheduled_tasks(queue, self.list_options(opts))
            .await?;
        Ok(projector::project_scheduled_tasks(&tasks))
    }

    pub async fn retry_tasks(
        &self,
        queue: &str,
        opts: ListOptions,
    ) -> TaskmonResult<Vec<RetryTask>> {
        let tasks = self
            .backend
            .list_retry_tasks(queue, self.list_options(opts))
            .await?;
        Ok(projector::project_retry_tasks(&tasks))
    }

    pub async fn dead_tasks(&self, queue: &str, opts: ListOptions) -> TaskmonResult<Vec<DeadTask>> {
        let tasks = self
            .backend
            .list_dead_tasks(queue, self.list_options(opts))
            .await?;
        Ok(projector::project_dead_tasks(&tasks))
    }

    /// Tasks of a queue in the given state, as tagged snapshots
    pub async fn tasks(
        &self,
        queue: &str,
        state: TaskState,
        opts: ListOptions,
    ) -> TaskmonResult<Vec<TaskSnapshot>> {
        tracing::debug!("Listing {} tasks of queue {}", state, queue);
        let snapshots = match state {
            TaskState::Active => into_snapshots(self.active_tasks(queue, opts).await?),
            TaskState::Pending => into_snapshots(self.pending_tasks(queue, opts).await?),
            TaskState::Scheduled => into_snapshots(self.scheduled_tasks(queue, opts).await?),
            TaskState::Retry => into_snapshots(self.retry_tasks(queue, opts).await?),
            TaskState::Dead => into_snapshots(self.dead_tasks(queue, opts).await?),
        };
        Ok(snapshots)
    }

    /// Broker details of the engine
    pub async fn server_info(&self) -> TaskmonResult<ServerInfo> {
        tracing::debug!("Reading server info");
        let info = self.backend.server_info().await?;
        Ok(projector::project_server_info(&info))
    }

    /// Health check for the engine connection
    pub async fn health_check(&self) -> TaskmonResult<()> {
        self.backend.health_check().await
    }

    fn history_days(&self, days: u32) -> u32 {
        let projection = &self.config.projection;
        if days == 0 {
            projection.default_history_days
        } else {
            days.min(projection.max_history_days)
        }
    }

    fn list_options(&self, opts: ListOptions) -> ListOptions {
        let listing = &self.config.listing;
        let page_size = if opts.page_size == 0 {
            listing.default_page_size
        } else {
            opts.page_size.min(listing.max_page_size)
        };

        ListOptions {
            page: opts.page.max(1),
            page_size,
        }
    }
}

fn into_snapshots<T: Into<TaskSnapshot>>(tasks: Vec<T>) -> Vec<TaskSnapshot> {
    tasks.into_iter().map(Into::into).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DerivedMetricPolicy;
    use crate::source::{self, QueueStats};
    use crate::task::Payload;
    use async_trait::async_trait;
    use chrono::{DateTime, Days, Duration, TimeZone, Utc};
    use serde_json::json;

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 23, 59, 59).unwrap()
    }

    fn fixed_inspector(config: TaskmonConfig) -> (Inspector, InMemoryInspector) {
        let engine = InMemoryInspector::with_fixed_time(fixed_now());
        let inspector = Inspector::new(config, engine.clone()).unwrap();
        (inspector, engine)
    }

    fn create_dead_task(id: &str) -> source::DeadTask {
        source::DeadTask {
            id: id.to_string(),
            task_type: "send_email".to_string(),
            payload: json!({"to": "a@example.com"}).into(),
            queue: "email".to_string(),
            max_retry: 3,
            retried: 3,
            error_msg: "mailbox unavailable".to_string(),
            last_failed_at: Utc::now() - Duration::hours(1),
        }
    }

    /// Backend that reports counters where failed exceeds processed
    struct InconsistentBackend;

    #[async_trait]
    impl InspectorBackend for InconsistentBackend {
        async fn queues(&self) -> TaskmonResult<Vec<String>> {
            Ok(vec!["email".to_string()])
        }

        async fn current_stats(&self, queue: &str) -> TaskmonResult<QueueStats> {
            Ok(QueueStats {
                queue: queue.to_string(),
                size: 0,
                active: 0,
                pending: 0,
                scheduled: 0,
                retry: 0,
                dead: 0,
                processed: 3,
                failed: 5,
                paused: false,
                timestamp: Utc::now(),
            })
        }

        async fn history(
            &self,
            _queue: &str,
            _days: u32,
        ) -> TaskmonResult<Vec<source::DailyStats>> {
            Ok(Vec::new())
        }

        async fn list_active_tasks(
            &self,
            _queue: &str,
            _opts: ListOptions,
        ) -> TaskmonResult<Vec<source::ActiveTask>> {
            Ok(Vec::new())
        }

        async fn list_pending_tasks(
            &self,
            _queue: &str,
            _opts: ListOptions,
        ) -> TaskmonResult<Vec<source::PendingTask>> {
            Ok(Vec::new())
        }

        async fn list_scheduled_tasks(
            &self,
            _queue: &str,
            _opts: ListOptions,
        ) -> TaskmonResult<Vec<source::ScheduledTask>> {
            Ok(Vec::new())
        }

        async fn list_retry_tasks(
            &self,
            _queue: &str,
            _opts: ListOptions,
        ) -> TaskmonResult<Vec<source::RetryTask>> {
            Ok(Vec::new())
        }

        async fn list_dead_tasks(
            &self,
            _queue: &str,
            _opts: ListOptions,
        ) -> TaskmonResult<Vec<source::DeadTask>> {
            Ok(Vec::new())
        }

        async fn server_info(&self) -> TaskmonResult<source::ServerInfo> {
            Err(TaskmonError::Backend {
                message: "engine offline".to_string(),
                source: None,
            })
        }

        async fn health_check(&self) -> TaskmonResult<()> {
            Err(TaskmonError::Backend {
                message: "engine offline".to_string(),
                source: None,
            })
        }
    }

    #[tokio::test]
    async fn test_queue_snapshot_projects_stats() {
        let (inspector, engine) = fixed_inspector(TaskmonConfig::testing());
        let today = fixed_now().date_naive();
        engine.enqueue("email", "send_email", Payload::default()).await;
        engine.add_dead(create_dead_task("d-1")).await;
        engine.record_daily("email", today - Days::new(1), 50, 50).await;
        engine.record_daily("email", today, 100, 7).await;
        engine.record_daily("email", today + Days::new(1), 1, 0).await;
        engine.pause("email").await.unwrap();

        let snapshot = inspector.queue_snapshot("email").await.unwrap();
        assert_eq!(snapshot.queue, "email");
        assert_eq!(snapshot.size, 2);
        assert_eq!(snapshot.pending, 1);
        assert_eq!(snapshot.dead, 1);
        assert_eq!(snapshot.processed, 100);
        assert_eq!(snapshot.succeeded, 93);
        assert_eq!(snapshot.failed, 7);
        assert!(snapshot.paused);
        assert_eq!(snapshot.state_total(), snapshot.size);
        assert_eq!(snapshot.timestamp, fixed_now());
    }

    #[tokio::test]
    async fn test_server_info_projects_backend_details() {
        let (inspector, engine) = fixed_inspector(TaskmonConfig::default());
        engine.enqueue("email", "send_email", Payload::default()).await;
        engine.create_queue("low").await;

        let info = inspector.server_info().await.unwrap();
        assert_eq!(info.address, "memory");
        assert_eq!(info.info["queues"], "2");
        assert_eq!(info.info["tasks"], "1");
        assert_eq!(info.timestamp, fixed_now());

        let value = serde_json::to_value(&info).unwrap();
        assert_eq!(value["info"]["paused_queues"], "0");

        let offline = Inspector::new(TaskmonConfig::default(), InconsistentBackend).unwrap();
        assert!(matches!(
            offline.server_info().await,
            Err(TaskmonError::Backend { .. })
        ));
    }

    #[tokio::test]
    async fn test_all_queue_snapshots_keep_queue_order() {
        let (inspector, engine) = Inspector::in_memory(TaskmonConfig::default()).unwrap();
        engine.create_queue("low").await;
        engine.create_queue("critical").await;
        engine.enqueue("default", "report", Payload::default()).await;

        let snapshots = inspector.all_queue_snapshots().await.unwrap();
        let names: Vec<_> = snapshots.iter().map(|s| s.queue.as_str()).collect();
        assert_eq!(names, vec!["critical", "default", "low"]);
        assert_eq!(snapshots[1].pending, 1);
    }

    #[tokio::test]
    async fn test_all_queue_snapshots_empty_engine() {
        let (inspector, _engine) = Inspector::in_memory(TaskmonConfig::default()).unwrap();
        let snapshots = inspector.all_queue_snapshots().await.unwrap();
        assert!(snapshots.is_empty());
    }

    #[tokio::test]
    async fn test_queue_history_bounds() {
        let (inspector, engine) = fixed_inspector(TaskmonConfig::testing());
        engine
            .record_daily("email", fixed_now().date_naive(), 12, 2)
            .await;

        // 0 days falls back to the default window
        let history = inspector.queue_history("email", 0).await.unwrap();
        assert_eq!(history.len(), 3);
        assert_eq!(history[0].succeeded, 10);

        // requests above the maximum are clamped
        let history = inspector.queue_history("email", 400).await.unwrap();
        assert_eq!(history.len(), 10);
        assert!(history.iter().all(|d| d.is_consistent()));
    }

    #[tokio::test]
    async fn test_listing_options_are_normalized() {
        let (inspector, engine) = Inspector::in_memory(TaskmonConfig::testing()).unwrap();
        for _ in 0..12 {
            engine.enqueue("email", "send_email", Payload::default()).await;
        }

        let zero = ListOptions::page(0).with_page_size(0);
        assert_eq!(inspector.pending_tasks("email", zero).await.unwrap().len(), 5);

        let huge = ListOptions::page(1).with_page_size(1000);
        assert_eq!(inspector.pending_tasks("email", huge).await.unwrap().len(), 10);

        let past_end = ListOptions::page(9).with_page_size(5);
        assert!(inspector.pending_tasks("email", past_end).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_tasks_by_state() {
        let (inspector, engine) = Inspector::in_memory(TaskmonConfig::default()).unwrap();
        engine.add_dead(create_dead_task("d-1")).await;
        engine.add_dead(create_dead_task("d-2")).await;
        engine.enqueue("email", "send_email", Payload::default()).await;

        let dead = inspector
            .tasks("email", TaskState::Dead, ListOptions::default())
            .await
            .unwrap();
        assert_eq!(dead.len(), 2);
        assert!(dead.iter().all(|t| t.state() == TaskState::Dead));
        assert_eq!(dead[0].base().id, "d-1");
        assert_eq!(dead[1].base().id, "d-2");

        let scheduled = inspector
            .tasks("email", TaskState::Scheduled, ListOptions::default())
            .await
            .unwrap();
        assert!(scheduled.is_empty());

        let typed = inspector
            .dead_tasks("email", ListOptions::default())
            .await
            .unwrap();
        assert_eq!(typed[0].error_message, "mailbox unavailable");
    }

    #[tokio::test]
    async fn test_unknown_queue_propagates() {
        let (inspector, _engine) = Inspector::in_memory(TaskmonConfig::default()).unwrap();
        let err = inspector
            .retry_tasks("missing", ListOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, TaskmonError::QueueNotFound { .. }));
    }

    #[tokio::test]
    async fn test_policy_applies_to_backend_stats() {
        let passthrough = Inspector::new(TaskmonConfig::default(), InconsistentBackend).unwrap();
        assert_eq!(
            passthrough.queue_snapshot("email").await.unwrap().succeeded,
            -2
        );

        let clamp = Inspector::new(TaskmonConfig::production(), InconsistentBackend).unwrap();
        assert_eq!(clamp.queue_snapshot("email").await.unwrap().succeeded, 0);

        let reject = Inspector::new(TaskmonConfig::development(), InconsistentBackend).unwrap();
        assert_eq!(
            reject.projector().policy(),
            DerivedMetricPolicy::Reject
        );
        let err = reject.all_queue_snapshots().await.unwrap_err();
        assert!(matches!(err, TaskmonError::DataIntegrity { .. }));
    }

    #[tokio::test]
    async fn test_health_check_propagates() {
        let inspector = Inspector::new(TaskmonConfig::default(), InconsistentBackend).unwrap();
        assert!(inspector.health_check().await.is_err());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = TaskmonConfig::default();
        config.listing.default_page_size = 0;
        let err = Inspector::new(config, InMemoryInspector::new()).unwrap_err();
        assert!(matches!(err, TaskmonError::ConfigError { .. }));
    }

    #[test]
    fn test_blocking_snapshot() {
        let (inspector, engine) = Inspector::in_memory(TaskmonConfig::default()).unwrap();
        tokio_test::block_on(async {
            engine.create_queue("email").await;
            let snapshot = inspector.queue_snapshot("email").await.unwrap();
            assert_eq!(snapshot.size, 0);
            assert!(snapshot.is_consistent());
        });
    }
}
