//! # taskmon
//!
//! Read-model snapshots of a distributed task queue, for monitoring APIs and
//! dashboards.
//!
//! taskmon does not run tasks or store them. It reads statistics and task
//! records from the queue engine and projects them into stable, serializable
//! values.
//!
//! ## Features
//!
//! - **Queue snapshots**: per-state counts, today's processed/succeeded/failed
//!   counters and the paused flag, captured at a point in time
//! - **Daily history**: one processed/succeeded/failed bucket per calendar day
//! - **Task snapshots**: active, pending, scheduled, retry and dead tasks, each
//!   sharing a common identity block, plus a tagged union over all five
//! - **Derived-metric policy**: pass inconsistent counters through, clamp
//!   them, or reject them
//!
//! ## Quick Start
//!
//! ```rust
//! use taskmon::prelude::*;
//! use serde_json::json;
//!
//! # tokio_test::block_on(async {
//! let (inspector, engine) = Inspector::in_memory(TaskmonConfig::default())?;
//! engine.enqueue("email", "send_email", json!({"to": "a@example.com"}).into()).await;
//!
//! let snapshot = inspector.queue_snapshot("email").await?;
//! assert_eq!(snapshot.size, 1);
//!
//! let pending = inspector.tasks("email", TaskState::Pending, ListOptions::default()).await?;
//! println!("{}", serde_json::to_string_pretty(&pending)?);
//! # Ok::<(), TaskmonError>(())
//! # }).unwrap();
//! ```

pub mod config;
pub mod error;
pub mod inspector;
pub mod projector;
pub mod snapshot;
pub mod source;
pub mod task;

pub mod prelude {
    pub use crate::config::*;
    pub use crate::error::{TaskmonError, TaskmonResult};
    pub use crate::inspector::Inspector;
    pub use crate::projector::Projector;
    pub use crate::snapshot::{DailyStats, QueueStateSnapshot, ServerInfo};
    pub use crate::source::{InMemoryInspector, InspectorBackend, ListOptions};
    pub use crate::task::{
        ActiveTask, BaseTask, DeadTask, Payload, PendingTask, RetryTask, ScheduledTask,
        StateTask, TaskId, TaskSnapshot, TaskState,
    };
    pub use async_trait::async_trait;
}

pub use crate::config::*;
pub use crate::error::{TaskmonError, TaskmonResult};
pub use crate::inspector::Inspector;
pub use crate::projector::Projector;
pub use crate::snapshot::{DailyStats, QueueStateSnapshot, ServerInfo};
pub use crate::source::{InMemoryInspector, InspectorBackend, ListOptions};
pub use crate::task::{
    ActiveTask, BaseTask, DeadTask, Payload, PendingTask, RetryTask, ScheduledTask, StateTask,
    TaskId, TaskSnapshot, TaskState,
};
pub use async_trait::async_trait;
