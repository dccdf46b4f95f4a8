//! Task snapshot types.
//!
//! A task observed by the monitor is always in exactly one of five states.
//! Each state has its own snapshot type; all of them embed a [`BaseTask`]
//! carrying the shared identity, flattened into the same JSON object on the
//! wire. [`TaskSnapshot`] is the tagged union over the five.

use crate::error::{TaskmonError, TaskmonResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Unique identifier for a task within its queue
pub type TaskId = String;

/// Lifecycle state of a task at observation time
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum TaskState {
    /// Currently being processed by a worker
    Active,
    /// Enqueued and waiting for a worker
    Pending,
    /// Waiting for a future processing time
    Scheduled,
    /// Failed before and waiting for its next attempt
    Retry,
    /// Retry budget exhausted, kept for inspection
    Dead,
}

impl TaskState {
    /// Every state, in lifecycle order
    pub const ALL: [TaskState; 5] = [
        TaskState::Active,
        TaskState::Pending,
        TaskState::Scheduled,
        TaskState::Retry,
        TaskState::Dead,
    ];

    /// Lowercase name used in URLs and JSON
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskState::Active => "active",
            TaskState::Pending => "pending",
            TaskState::Scheduled => "scheduled",
            TaskState::Retry => "retry",
            TaskState::Dead => "dead",
        }
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskState {
    type Err = TaskmonError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TaskState::ALL
            .into_iter()
            .find(|state| state.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| TaskmonError::InvalidTaskState(s.to_string()))
    }
}

/// Opaque task payload.
///
/// The engine that produced the payload owns its meaning. This layer only
/// carries it from source record to snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Payload(serde_json::Value);

impl Payload {
    /// Wrap an already decoded value
    pub fn new(value: serde_json::Value) -> Self {
        Self(value)
    }

    /// Decode a payload from raw bytes holding a JSON document
    pub fn from_slice(bytes: &[u8]) -> TaskmonResult<Self> {
        Ok(Self(serde_json::from_slice(bytes)?))
    }

    /// Borrow the wrapped value
    pub fn as_value(&self) -> &serde_json::Value {
        &self.0
    }

    /// Unwrap into the inner value
    pub fn into_inner(self) -> serde_json::Value {
        self.0
    }
}

impl From<serde_json::Value> for Payload {
    fn from(value: serde_json::Value) -> Self {
        Self(value)
    }
}

/// Identity shared by every task snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaseTask {
    /// Task identifier
    pub id: TaskId,
    /// Handler type name
    #[serde(rename = "type")]
    pub task_type: String,
    /// Opaque payload
    pub payload: Payload,
    /// Owning queue
    pub queue: String,
}

/// Task currently being processed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActiveTask {
    #[serde(flatten)]
    pub base: BaseTask,
}

/// Task waiting for a worker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingTask {
    #[serde(flatten)]
    pub base: BaseTask,
}

/// Task waiting for its processing time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledTask {
    #[serde(flatten)]
    pub base: BaseTask,
    /// When the task becomes eligible for processing
    pub next_process_at: DateTime<Utc>,
}

/// Task waiting for its next retry attempt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryTask {
    #[serde(flatten)]
    pub base: BaseTask,
    /// When the next attempt is due
    pub next_process_at: DateTime<Utc>,
    /// Retry budget
    pub max_retry: i64,
    /// Retries already consumed
    pub retried: i64,
    /// Error reported by the last attempt (may be empty)
    pub error_message: String,
}

/// Task whose retry budget is exhausted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeadTask {
    #[serde(flatten)]
    pub base: BaseTask,
    /// Retry budget
    pub max_retry: i64,
    /// Retries consumed
    pub retried: i64,
    /// Error reported by the last attempt (may be empty)
    pub error_message: String,
    /// When the last attempt failed
    pub last_failed_at: DateTime<Utc>,
}

/// Common view over the five state variants
pub trait StateTask {
    /// The state this variant represents
    const STATE: TaskState;

    /// Shared identity
    fn base(&self) -> &BaseTask;

    /// Task identifier
    fn id(&self) -> &str {
        &self.base().id
    }

    /// Owning queue
    fn queue(&self) -> &str {
        &self.base().queue
    }
}

macro_rules! impl_state_task {
    ($ty:ty, $state:expr) => {
        impl StateTask for $ty {
            const STATE: TaskState = $state;

            fn base(&self) -> &BaseTask {
                &self.base
            }
        }
    };
}

impl_state_task!(ActiveTask, TaskState::Active);
impl_state_task!(PendingTask, TaskState::Pending);
impl_state_task!(ScheduledTask, TaskState::Scheduled);
impl_state_task!(RetryTask, TaskState::Retry);
impl_state_task!(DeadTask, TaskState::Dead);

/// A task snapshot in any of the five states.
///
/// Serialized as the variant's own fields plus a `state` discriminator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum TaskSnapshot {
    Active(ActiveTask),
    Pending(PendingTask),
    Scheduled(ScheduledTask),
    Retry(RetryTask),
    Dead(DeadTask),
}

impl TaskSnapshot {
    /// The state of the wrapped task
    pub fn state(&self) -> TaskState {
        match self {
            TaskSnapshot::Active(_) => TaskState::Active,
            TaskSnapshot::Pending(_) => TaskState::Pending,
            TaskSnapshot::Scheduled(_) => TaskState::Scheduled,
            TaskSnapshot::Retry(_) => TaskState::Retry,
            TaskSnapshot::Dead(_) => TaskState::Dead,
        }
    }

    /// Shared identity of the wrapped task
    pub fn base(&self) -> &BaseTask {
        match self {
            TaskSnapshot::Active(t) => t.base(),
            TaskSnapshot::Pending(t) => t.base(),
            TaskSnapshot::Scheduled(t) => t.base(),
            TaskSnapshot::Retry(t) => t.base(),
            TaskSnapshot::Dead(t) => t.base(),
        }
    }
}

impl From<ActiveTask> for TaskSnapshot {
    fn from(task: ActiveTask) -> Self {
        TaskSnapshot::Active(task)
    }
}

impl From<PendingTask> for TaskSnapshot {
    fn from(task: PendingTask) -> Self {
        TaskSnapshot::Pending(task)
    }
}

impl From<ScheduledTask> for TaskSnapshot {
    fn from(task: ScheduledTask) -> Self {
        TaskSnapshot::Scheduled(task)
    }
}

impl From<RetryTask> for TaskSnapshot {
    fn from(task: RetryTask) -> Self {
        TaskSnapshot::Retry(task)
    }
}

impl From<DeadTask> for TaskSnapshot {
    fn from(task: DeadTask) -> Self {
        TaskSnapshot::Dead(task)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn base(id: &str) -> BaseTask {
        BaseTask {
            id: id.to_string(),
            task_type: "send_email".to_string(),
            payload: json!({"to": "a@example.com"}).into(),
            queue: "email".to_string(),
        }
    }

    #[test]
    fn test_task_state_parse_and_display() {
        for state in TaskState::ALL {
            let parsed: TaskState = state.to_string().parse().unwrap();
            assert_eq!(parsed, state);
        }
        assert_eq!("RETRY".parse::<TaskState>().unwrap(), TaskState::Retry);
        assert_eq!(" dead ".parse::<TaskState>().unwrap(), TaskState::Dead);

        let err = "archived".parse::<TaskState>().unwrap_err();
        assert!(matches!(err, TaskmonError::InvalidTaskState(s) if s == "archived"));
    }

    #[test]
    fn test_payload_from_slice() {
        let payload = Payload::from_slice(br#"{"user_id": 42}"#).unwrap();
        assert_eq!(payload.as_value(), &json!({"user_id": 42}));
        assert!(Payload::from_slice(b"\x00\x01").is_err());
    }

    #[test]
    fn test_active_task_wire_shape() {
        let task = ActiveTask { base: base("abc") };
        let value = serde_json::to_value(&task).unwrap();
        assert_eq!(
            value,
            json!({
                "id": "abc",
                "type": "send_email",
                "payload": {"to": "a@example.com"},
                "queue": "email",
            })
        );
    }

    #[test]
    fn test_retry_task_wire_shape() {
        let next = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let task = RetryTask {
            base: base("abc"),
            next_process_at: next,
            max_retry: 5,
            retried: 2,
            error_message: "smtp timeout".to_string(),
        };
        let value = serde_json::to_value(&task).unwrap();
        assert_eq!(value["type"], "send_email");
        assert_eq!(value["next_process_at"], "2024-03-01T12:00:00Z");
        assert_eq!(value["max_retry"], 5);
        assert_eq!(value["retried"], 2);
        assert_eq!(value["error_message"], "smtp timeout");
        assert!(value.get("base").is_none());

        let back: RetryTask = serde_json::from_value(value).unwrap();
        assert_eq!(back, task);
    }

    #[test]
    fn test_task_snapshot_tagging() {
        let failed_at = Utc.with_ymd_and_hms(2024, 3, 1, 8, 30, 0).unwrap();
        let snapshot = TaskSnapshot::from(DeadTask {
            base: base("xyz"),
            max_retry: 3,
            retried: 3,
            error_message: String::new(),
            last_failed_at: failed_at,
        });

        assert_eq!(snapshot.state(), TaskState::Dead);
        assert_eq!(snapshot.base().id, "xyz");

        let value = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(value["state"], "dead");
        assert_eq!(value["id"], "xyz");
        assert_eq!(value["last_failed_at"], "2024-03-01T08:30:00Z");
    }

    #[test]
    fn test_state_task_accessors() {
        let task = PendingTask { base: base("p-1") };
        assert_eq!(task.id(), "p-1");
        assert_eq!(task.queue(), "email");
        assert_eq!(PendingTask::STATE, TaskState::Pending);
    }
}
