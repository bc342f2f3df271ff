use std::future::Future;
use std::pin::Pin;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;
use uuid::Uuid;
use velo_core::traits::CancellationToken;
use velo_core::VeloResult;

/// Execution priority. Higher tiers always run before lower ones,
/// regardless of submission order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskPriority {
    Low,
    Medium,
    High,
}

/// Scheduler-visible lifecycle of a task.
///
/// A timed-out attempt is a retryable failure, not a resting state; a task
/// only ends in `Succeeded`, `Failed`, or `Cancelled`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskState {
    Queued,
    Running,
    Succeeded,
    Failed,
    Cancelled,
}

impl TaskState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::Cancelled)
    }
}

/// What a task is for. Opaque to the scheduler; used in logs and summaries.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskDescriptor {
    /// Work kind, e.g. "prefetch" or "suspend_tab".
    pub kind: String,
    /// Optional object of the work: a URL, a tab id.
    pub target: Option<String>,
}

impl TaskDescriptor {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            target: None,
        }
    }

    pub fn with_target(kind: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            target: Some(target.into()),
        }
    }
}

/// A fresh future for one execution attempt.
pub type TaskFuture = Pin<Box<dyn Future<Output = VeloResult<()>> + Send>>;

/// Builds the attempt future. Invoked once per attempt so each retry
/// starts clean; the token must be polled at the body's safe points.
pub type TaskBody = Box<dyn Fn(CancellationToken) -> TaskFuture + Send + Sync>;

/// Everything needed to submit work.
pub struct TaskSpec {
    pub descriptor: TaskDescriptor,
    pub priority: TaskPriority,
    /// None falls back to the scheduler's configured default.
    pub max_attempts: Option<u32>,
    /// None falls back to the scheduler's configured default.
    pub max_duration: Option<std::time::Duration>,
    pub body: TaskBody,
}

impl TaskSpec {
    pub fn new(descriptor: TaskDescriptor, priority: TaskPriority, body: TaskBody) -> Self {
        Self {
            descriptor,
            priority,
            max_attempts: None,
            max_duration: None,
            body,
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }

    pub fn with_max_duration(mut self, max_duration: std::time::Duration) -> Self {
        self.max_duration = Some(max_duration);
        self
    }
}

/// Terminal report delivered to the submitter.
#[derive(Debug, Clone)]
pub struct TaskCompletion {
    pub task_id: Uuid,
    pub descriptor: TaskDescriptor,
    pub state: TaskState,
    pub attempt_count: u32,
    /// Present when `state` is Failed or Cancelled.
    pub error: Option<String>,
}

/// Submission receipt with a one-shot completion channel.
#[derive(Debug)]
pub struct TaskHandle {
    pub task_id: Uuid,
    pub priority: TaskPriority,
    completion: oneshot::Receiver<TaskCompletion>,
}

impl TaskHandle {
    pub(crate) fn new(
        task_id: Uuid,
        priority: TaskPriority,
        completion: oneshot::Receiver<TaskCompletion>,
    ) -> Self {
        Self {
            task_id,
            priority,
            completion,
        }
    }

    /// Wait for the terminal state. `None` if the scheduler dropped the
    /// task without completing it (e.g. shutdown).
    pub async fn completion(self) -> Option<TaskCompletion> {
        self.completion.await.ok()
    }
}

/// Public snapshot of a task's registry record.
#[derive(Debug, Clone, Serialize)]
pub struct ScheduledTaskInfo {
    pub task_id: Uuid,
    pub descriptor: TaskDescriptor,
    pub priority: TaskPriority,
    pub state: TaskState,
    pub attempt_count: u32,
    pub max_attempts: u32,
    pub submitted_at: DateTime<Utc>,
    /// When the next retry becomes due, if one is scheduled.
    pub next_run_at: Option<DateTime<Utc>>,
}

/// Aggregate counts for the monitoring façade.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskSummary {
    pub queued: usize,
    pub running: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub cancelled: usize,
}
