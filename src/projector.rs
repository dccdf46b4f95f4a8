//! Projection from engine records to snapshot values.
//!
//! The free functions in this module are total: they copy fields, derive
//! `succeeded = processed - failed` without any guard (wrapping on overflow),
//! and never fail.
//! List projections keep input order and length.
//!
//! [`Projector`] adds a [`DerivedMetricPolicy`] on top of the queue and daily
//! projections for callers that want inconsistent counters clamped or
//! rejected instead of passed through.

use crate::config::DerivedMetricPolicy;
use crate::error::{TaskmonError, TaskmonResult};
use crate::snapshot::{DailyStats, QueueStateSnapshot, ServerInfo};
use crate::source;
use crate::task::{ActiveTask, BaseTask, DeadTask, PendingTask, RetryTask, ScheduledTask};

fn base_task(id: &str, task_type: &str, payload: &crate::task::Payload, queue: &str) -> BaseTask {
    BaseTask {
        id: id.to_string(),
        task_type: task_type.to_string(),
        payload: payload.clone(),
        queue: queue.to_string(),
    }
}

/// Project aggregate queue statistics into a snapshot.
pub fn project_queue_snapshot(stats: &source::QueueStats) -> QueueStateSnapshot {
    QueueStateSnapshot {
        queue: stats.queue.clone(),
        size: stats.size,
        active: stats.active,
        pending: stats.pending,
        scheduled: stats.scheduled,
        retry: stats.retry,
        dead: stats.dead,
        processed: stats.processed,
        succeeded: stats.processed.wrapping_sub(stats.failed),
        failed: stats.failed,
        paused: stats.paused,
        timestamp: stats.timestamp,
    }
}

/// Project one day of queue counters.
pub fn project_daily_stats(stats: &source::DailyStats) -> DailyStats {
    DailyStats {
        queue: stats.queue.clone(),
        processed: stats.processed,
        succeeded: stats.processed.wrapping_sub(stats.failed),
        failed: stats.failed,
        date: stats.date,
    }
}

/// Project engine broker details.
pub fn project_server_info(info: &source::ServerInfo) -> ServerInfo {
    ServerInfo {
        address: info.address.clone(),
        version: info.version.clone(),
        info: info.info.clone(),
        timestamp: info.timestamp,
    }
}

/// Project an active task record.
pub fn project_active_task(task: &source::ActiveTask) -> ActiveTask {
    ActiveTask {
        base: base_task(&task.id, &task.task_type, &task.payload, &task.queue),
    }
}

/// Project a pending task record.
pub fn project_pending_task(task: &source::PendingTask) -> PendingTask {
    PendingTask {
        base: base_task(&task.id, &task.task_type, &task.payload, &task.queue),
    }
}

/// Project a scheduled task record, keeping its next processing time.
pub fn project_scheduled_task(task: &source::ScheduledTask) -> ScheduledTask {
    ScheduledTask {
        base: base_task(&task.id, &task.task_type, &task.payload, &task.queue),
        next_process_at: task.next_process_at,
    }
}

/// Project a retry task record, keeping its retry bookkeeping.
pub fn project_retry_task(task: &source::RetryTask) -> RetryTask {
    RetryTask {
        base: base_task(&task.id, &task.task_type, &task.payload, &task.queue),
        next_process_at: task.next_process_at,
        max_retry: task.max_retry,
        retried: task.retried,
        error_message: task.error_msg.clone(),
    }
}

/// Project a dead task record, keeping its last failure.
pub fn project_dead_task(task: &source::DeadTask) -> DeadTask {
    DeadTask {
        base: base_task(&task.id, &task.task_type, &task.payload, &task.queue),
        max_retry: task.max_retry,
        retried: task.retried,
        error_message: task.error_msg.clone(),
        last_failed_at: task.last_failed_at,
    }
}

/// Apply `project` to every element, preserving order and length.
pub fn project_list<S, T>(sources: &[S], project: impl Fn(&S) -> T) -> Vec<T> {
    sources.iter().map(project).collect()
}

/// Project active task records in order.
pub fn project_active_tasks(tasks: &[source::ActiveTask]) -> Vec<ActiveTask> {
    project_list(tasks, project_active_task)
}

/// Project pending task records in order.
pub fn project_pending_tasks(tasks: &[source::PendingTask]) -> Vec<PendingTask> {
    project_list(tasks, project_pending_task)
}

/// Project scheduled task records in order.
pub fn project_scheduled_tasks(tasks: &[source::ScheduledTask]) -> Vec<ScheduledTask> {
    project_list(tasks, project_scheduled_task)
}

/// Project retry task records in order.
pub fn project_retry_tasks(tasks: &[source::RetryTask]) -> Vec<RetryTask> {
    project_list(tasks, project_retry_task)
}

/// Project dead task records in order.
pub fn project_dead_tasks(tasks: &[source::DeadTask]) -> Vec<DeadTask> {
    project_list(tasks, project_dead_task)
}

/// Projects counters under a [`DerivedMetricPolicy`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Projector {
    policy: DerivedMetricPolicy,
}

impl Projector {
    pub fn new(policy: DerivedMetricPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> DerivedMetricPolicy {
        self.policy
    }

    /// Project queue statistics, applying the policy to `succeeded`.
    pub fn queue_snapshot(&self, stats: &source::QueueStats) -> TaskmonResult<QueueStateSnapshot> {
        let mut snapshot = project_queue_snapshot(stats);
        snapshot.succeeded = self.succeeded(&stats.queue, stats.processed, stats.failed)?;
        Ok(snapshot)
    }

    /// Project one day of counters, applying the policy to `succeeded`.
    pub fn daily_stats(&self, stats: &source::DailyStats) -> TaskmonResult<DailyStats> {
        let mut daily = project_daily_stats(stats);
        daily.succeeded = self.succeeded(&stats.queue, stats.processed, stats.failed)?;
        Ok(daily)
    }

    /// Project a run of daily counters. Under `Reject` the first
    /// inconsistent day fails the whole list.
    pub fn daily_stats_list(&self, stats: &[source::DailyStats]) -> TaskmonResult<Vec<DailyStats>> {
        stats.iter().map(|s| self.daily_stats(s)).collect()
    }

    fn succeeded(&self, queue: &str, processed: i64, failed: i64) -> TaskmonResult<i64> {
        if let Some(succeeded) = processed.checked_sub(failed).filter(|s| *s >= 0) {
            return Ok(succeeded);
        }

        match self.policy {
            DerivedMetricPolicy::Passthrough => Ok(processed.wrapping_sub(failed)),
            DerivedMetricPolicy::Clamp => {
                tracing::warn!(
                    "Clamping succeeded count for queue {}: failed ({}) exceeds processed ({})",
                    queue,
                    failed,
                    processed
                );
                Ok(0)
            }
            DerivedMetricPolicy::Reject => Err(TaskmonError::DataIntegrity {
                queue: queue.to_string(),
                processed,
                failed,
            }),
        }
    }
}
