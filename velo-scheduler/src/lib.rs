//! # velo-scheduler
//!
//! Priority queue feeding a bounded worker pool, with retry/backoff,
//! cooperative cancellation, and per-attempt timeouts.
//!
//! Cancellation is cooperative only: a running attempt is signalled
//! through its token and unwinds at its own safe points; the scheduler
//! never force-kills work, so tab and cache state is never left
//! half-mutated. A timed-out attempt frees its worker slot even though the
//! underlying future may keep running until it next observes the token —
//! its eventual result is discarded. That leak window is a documented,
//! accepted risk, not hidden behavior.

pub mod backoff;
pub mod queue;
pub mod task;

pub use backoff::RetryPolicy;
pub use task::{
    ScheduledTaskInfo, TaskBody, TaskCompletion, TaskDescriptor, TaskFuture, TaskHandle,
    TaskPriority, TaskSpec, TaskState, TaskSummary,
};

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tokio::sync::{oneshot, Notify};
use tracing::{debug, info, warn};
use uuid::Uuid;
use velo_core::config::SchedulerConfig;
use velo_core::errors::TaskError;
use velo_core::traits::{Cancellable, CancellationToken};

use crate::queue::PriorityQueue;

/// Registry record for one submitted task.
struct ScheduledTask {
    descriptor: TaskDescriptor,
    priority: TaskPriority,
    /// Submission sequence; kept across retries so a retried task retains
    /// its original FIFO position within its tier.
    seq: u64,
    state: TaskState,
    attempt_count: u32,
    max_attempts: u32,
    max_duration: Duration,
    submitted_at: DateTime<Utc>,
    next_run_at: Option<DateTime<Utc>>,
    body: Arc<TaskBody>,
    token: CancellationToken,
    completion_tx: Option<oneshot::Sender<TaskCompletion>>,
    last_error: Option<String>,
}

struct SchedulerInner {
    config: SchedulerConfig,
    policy: RetryPolicy,
    queue: Mutex<PriorityQueue>,
    tasks: DashMap<Uuid, ScheduledTask>,
    work_available: Notify,
    next_seq: AtomicU64,
    shutdown: AtomicBool,
}

impl SchedulerInner {
    fn queue(&self) -> MutexGuard<'_, PriorityQueue> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn push_ready(&self, priority: TaskPriority, seq: u64, task_id: Uuid) {
        self.queue().push(priority, seq, task_id);
        self.work_available.notify_one();
    }

    /// Set a terminal state and fire the completion channel.
    fn finalize(record: &mut ScheduledTask, task_id: Uuid, state: TaskState, error: Option<String>) {
        record.state = state;
        record.next_run_at = None;
        if let Some(tx) = record.completion_tx.take() {
            let _ = tx.send(TaskCompletion {
                task_id,
                descriptor: record.descriptor.clone(),
                state,
                attempt_count: record.attempt_count,
                error: error.clone(),
            });
        }
        record.last_error = error;
    }
}

/// Priority-queued, bounded worker pool.
#[derive(Clone)]
pub struct BackgroundTaskScheduler {
    inner: Arc<SchedulerInner>,
}

impl BackgroundTaskScheduler {
    /// Start the scheduler and spawn its worker pool.
    ///
    /// Must be called from within a tokio runtime. Parallelism is bounded
    /// by `config.concurrency`; excess work queues.
    pub fn start(config: SchedulerConfig) -> Self {
        let policy = RetryPolicy::from_config(&config);
        let concurrency = config.concurrency.max(1);
        let inner = Arc::new(SchedulerInner {
            config,
            policy,
            queue: Mutex::new(PriorityQueue::new()),
            tasks: DashMap::new(),
            work_available: Notify::new(),
            next_seq: AtomicU64::new(0),
            shutdown: AtomicBool::new(false),
        });
        for worker_id in 0..concurrency {
            tokio::spawn(worker_loop(Arc::clone(&inner), worker_id));
        }
        info!(concurrency, "background task scheduler started");
        Self { inner }
    }

    /// Enqueue work. Returns immediately with a handle carrying the task
    /// id and a one-shot completion channel.
    pub fn submit(&self, spec: TaskSpec) -> TaskHandle {
        let task_id = Uuid::new_v4();
        let seq = self.inner.next_seq.fetch_add(1, Ordering::Relaxed);
        let (completion_tx, completion_rx) = oneshot::channel();
        let max_attempts = spec
            .max_attempts
            .unwrap_or(self.inner.config.default_max_attempts)
            .max(1);
        let max_duration = spec
            .max_duration
            .unwrap_or(Duration::from_millis(self.inner.config.default_max_duration_ms));
        let priority = spec.priority;
        debug!(
            %task_id,
            kind = %spec.descriptor.kind,
            ?priority,
            max_attempts,
            "task submitted"
        );
        let record = ScheduledTask {
            descriptor: spec.descriptor,
            priority,
            seq,
            state: TaskState::Queued,
            attempt_count: 0,
            max_attempts,
            max_duration,
            submitted_at: Utc::now(),
            next_run_at: Some(Utc::now()),
            body: Arc::new(spec.body),
            token: CancellationToken::new(),
            completion_tx: Some(completion_tx),
            last_error: None,
        };
        self.inner.tasks.insert(task_id, record);
        self.inner.push_ready(priority, seq, task_id);
        TaskHandle::new(task_id, priority, completion_rx)
    }

    /// Cancel a task.
    ///
    /// Effective immediately while `Queued` (including between retries). A
    /// `Running` task only receives the cooperative signal through its
    /// token; the scheduler never force-kills work. Returns false for
    /// unknown or already-terminal tasks.
    pub fn cancel(&self, task_id: Uuid) -> bool {
        let Some(mut record) = self.inner.tasks.get_mut(&task_id) else {
            return false;
        };
        match record.state {
            TaskState::Queued => {
                record.token.cancel();
                let error = TaskError::Cancelled {
                    task_id: task_id.to_string(),
                }
                .to_string();
                SchedulerInner::finalize(&mut record, task_id, TaskState::Cancelled, Some(error));
                // Any stale heap entry is skipped by the workers.
                debug!(%task_id, "queued task cancelled");
                true
            }
            TaskState::Running => {
                record.token.cancel();
                debug!(%task_id, "cancellation signalled to running task");
                true
            }
            _ => false,
        }
    }

    pub fn status(&self, task_id: Uuid) -> Option<TaskState> {
        self.inner.tasks.get(&task_id).map(|record| record.state)
    }

    pub fn info(&self, task_id: Uuid) -> Option<ScheduledTaskInfo> {
        self.inner.tasks.get(&task_id).map(|record| ScheduledTaskInfo {
            task_id,
            descriptor: record.descriptor.clone(),
            priority: record.priority,
            state: record.state,
            attempt_count: record.attempt_count,
            max_attempts: record.max_attempts,
            submitted_at: record.submitted_at,
            next_run_at: record.next_run_at,
        })
    }

    /// Aggregate counts across the registry.
    pub fn summary(&self) -> TaskSummary {
        let mut summary = TaskSummary::default();
        for record in self.inner.tasks.iter() {
            match record.state {
                TaskState::Queued => summary.queued += 1,
                TaskState::Running => summary.running += 1,
                TaskState::Succeeded => summary.succeeded += 1,
                TaskState::Failed => summary.failed += 1,
                TaskState::Cancelled => summary.cancelled += 1,
            }
        }
        summary
    }

    /// Drop terminal records to keep the registry bounded. Returns how
    /// many were removed.
    pub fn prune_finished(&self) -> usize {
        let before = self.inner.tasks.len();
        self.inner.tasks.retain(|_, record| !record.state.is_terminal());
        before - self.inner.tasks.len()
    }

    pub fn concurrency(&self) -> usize {
        self.inner.config.concurrency.max(1)
    }

    /// Stop accepting queued work and wind the workers down. Running
    /// attempts finish on their own.
    pub fn shutdown(&self) {
        self.inner.shutdown.store(true, Ordering::SeqCst);
        self.inner.work_available.notify_waiters();
        info!("background task scheduler shutting down");
    }
}

async fn worker_loop(inner: Arc<SchedulerInner>, worker_id: usize) {
    loop {
        if inner.shutdown.load(Ordering::SeqCst) {
            break;
        }
        let next = inner.queue().pop();
        match next {
            Some(task_id) => run_one(&inner, worker_id, task_id).await,
            None => {
                // Register for the notification before the shutdown
                // re-check so neither signal can be missed.
                let notified = inner.work_available.notified();
                if inner.shutdown.load(Ordering::SeqCst) {
                    break;
                }
                notified.await;
            }
        }
    }
    debug!(worker_id, "worker stopped");
}

async fn run_one(inner: &Arc<SchedulerInner>, worker_id: usize, task_id: Uuid) {
    // Claim the task. Entries cancelled while queued are skipped here.
    let (body, token, max_duration, attempt) = {
        let Some(mut record) = inner.tasks.get_mut(&task_id) else {
            return;
        };
        if record.state != TaskState::Queued {
            return;
        }
        if record.token.is_cancelled() {
            let error = TaskError::Cancelled {
                task_id: task_id.to_string(),
            }
            .to_string();
            SchedulerInner::finalize(&mut record, task_id, TaskState::Cancelled, Some(error));
            return;
        }
        record.state = TaskState::Running;
        record.next_run_at = None;
        record.attempt_count += 1;
        (
            Arc::clone(&record.body),
            record.token.clone(),
            record.max_duration,
            record.attempt_count,
        )
        // The registry guard drops here; it is never held across an await.
    };

    debug!(worker_id, %task_id, attempt, "task attempt started");
    let outcome = tokio::time::timeout(max_duration, (*body)(token.clone())).await;

    match outcome {
        Ok(Ok(())) => {
            if let Some(mut record) = inner.tasks.get_mut(&task_id) {
                SchedulerInner::finalize(&mut record, task_id, TaskState::Succeeded, None);
                debug!(%task_id, attempt, "task succeeded");
            }
        }
        Ok(Err(error)) => {
            if token.is_cancelled() {
                if let Some(mut record) = inner.tasks.get_mut(&task_id) {
                    let reason = TaskError::Cancelled {
                        task_id: task_id.to_string(),
                    }
                    .to_string();
                    SchedulerInner::finalize(&mut record, task_id, TaskState::Cancelled, Some(reason));
                }
                return;
            }
            handle_failure(inner, task_id, error.to_string());
        }
        Err(_elapsed) => {
            let reason = TaskError::TimedOut {
                task_id: task_id.to_string(),
                max_duration_ms: max_duration.as_millis() as u64,
            }
            .to_string();
            warn!(
                %task_id,
                max_duration_ms = max_duration.as_millis() as u64,
                "attempt timed out; slot reclaimed, underlying work may still be running"
            );
            handle_failure(inner, task_id, reason);
        }
    }
}

/// Record a failed attempt: either schedule the backoff retry or finalize
/// the task as Failed.
fn handle_failure(inner: &Arc<SchedulerInner>, task_id: Uuid, reason: String) {
    let Some(mut record) = inner.tasks.get_mut(&task_id) else {
        return;
    };
    if record.token.is_cancelled() {
        let error = TaskError::Cancelled {
            task_id: task_id.to_string(),
        }
        .to_string();
        SchedulerInner::finalize(&mut record, task_id, TaskState::Cancelled, Some(error));
        return;
    }
    if record.attempt_count >= record.max_attempts {
        let error = TaskError::RetriesExhausted {
            task_id: task_id.to_string(),
            attempts: record.attempt_count,
            last_error: reason,
        }
        .to_string();
        warn!(%task_id, attempts = record.attempt_count, %error, "task failed permanently");
        SchedulerInner::finalize(&mut record, task_id, TaskState::Failed, Some(error));
        return;
    }

    let delay = inner.policy.delay_after_failure(record.attempt_count);
    record.state = TaskState::Queued;
    record.next_run_at = Some(Utc::now() + chrono::Duration::milliseconds(delay.as_millis() as i64));
    record.last_error = Some(reason.clone());
    debug!(
        %task_id,
        attempt = record.attempt_count,
        delay_ms = delay.as_millis() as u64,
        error = %reason,
        "retrying after backoff"
    );
    let (priority, seq) = (record.priority, record.seq);
    drop(record);

    // The retry waits on a timer task, never on a worker slot.
    let inner = Arc::clone(inner);
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        let still_queued = inner
            .tasks
            .get(&task_id)
            .map(|record| record.state == TaskState::Queued && !record.token.is_cancelled())
            .unwrap_or(false);
        if still_queued {
            inner.push_ready(priority, seq, task_id);
        }
    });
}
