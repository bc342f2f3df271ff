/// Background-task failures surfaced to submitters.
#[derive(Debug, thiserror::Error)]
pub enum TaskError {
    /// Terminal: the task failed on its final permitted attempt.
    #[error("task {task_id} failed after {attempts} attempts: {last_error}")]
    RetriesExhausted {
        task_id: String,
        attempts: u32,
        last_error: String,
    },

    /// Retryable: an attempt exceeded the task's max duration. The worker
    /// slot is freed even though the underlying work may still be running.
    #[error("task {task_id} timed out after {max_duration_ms}ms")]
    TimedOut { task_id: String, max_duration_ms: u64 },

    /// The task was cancelled before it completed.
    #[error("task {task_id} cancelled")]
    Cancelled { task_id: String },

    /// The façade was asked to build a task body for a kind it does not know.
    #[error("unsupported task kind: {kind}")]
    UnsupportedKind { kind: String },

    /// A task body failed for a reason the body itself describes.
    #[error("task execution failed: {reason}")]
    ExecutionFailed { reason: String },
}
