use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::Notify;
use velo_core::config::SchedulerConfig;
use velo_core::errors::TaskError;
use velo_core::traits::Cancellable;
use velo_scheduler::{
    BackgroundTaskScheduler, TaskDescriptor, TaskFuture, TaskPriority, TaskSpec, TaskState,
};

fn test_config(concurrency: usize) -> SchedulerConfig {
    SchedulerConfig {
        concurrency,
        backoff_jitter: 0.0,
        ..SchedulerConfig::default()
    }
}

#[tokio::test(start_paused = true)]
async fn failing_task_backs_off_then_fails_permanently() {
    let scheduler = BackgroundTaskScheduler::start(test_config(2));
    let attempts: Arc<Mutex<Vec<tokio::time::Instant>>> = Arc::new(Mutex::new(Vec::new()));

    let attempts_for_body = Arc::clone(&attempts);
    let handle = scheduler.submit(
        TaskSpec::new(
            TaskDescriptor::new("always-fails"),
            TaskPriority::Medium,
            Box::new(move |_token| -> TaskFuture {
                let attempts = Arc::clone(&attempts_for_body);
                Box::pin(async move {
                    attempts.lock().unwrap().push(tokio::time::Instant::now());
                    Err(TaskError::ExecutionFailed {
                        reason: "boom".into(),
                    }
                    .into())
                })
            }),
        )
        .with_max_attempts(3),
    );

    let completion = handle.completion().await.unwrap();
    assert_eq!(completion.state, TaskState::Failed);
    assert_eq!(completion.attempt_count, 3);
    assert!(completion.error.unwrap().contains("after 3 attempts"));

    // Attempts at t≈0, 1s, 3s: backoff delays of 1s then 2s.
    {
        let attempts = attempts.lock().unwrap();
        assert_eq!(attempts.len(), 3);
        let first_gap = attempts[1] - attempts[0];
        let second_gap = attempts[2] - attempts[1];
        assert!(
            first_gap >= Duration::from_millis(1_000) && first_gap < Duration::from_millis(1_500),
            "first retry gap was {first_gap:?}"
        );
        assert!(
            second_gap >= Duration::from_millis(2_000) && second_gap < Duration::from_millis(2_500),
            "second retry gap was {second_gap:?}"
        );
    }

    // No fourth attempt ever happens.
    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(attempts.lock().unwrap().len(), 3);
}

#[tokio::test]
async fn high_priority_runs_before_earlier_low_priority() {
    // Pool size 1: with the worker occupied, a later-submitted High task
    // must still run before an earlier Low one.
    let scheduler = BackgroundTaskScheduler::start(test_config(1));
    let gate = Arc::new(Notify::new());
    let order: Arc<Mutex<Vec<&'static str>>> = Arc::new(Mutex::new(Vec::new()));

    let gate_for_body = Arc::clone(&gate);
    let blocker = scheduler.submit(TaskSpec::new(
        TaskDescriptor::new("blocker"),
        TaskPriority::High,
        Box::new(move |_token| -> TaskFuture {
            let gate = Arc::clone(&gate_for_body);
            Box::pin(async move {
                gate.notified().await;
                Ok(())
            })
        }),
    ));

    let order_for_low = Arc::clone(&order);
    let low = scheduler.submit(TaskSpec::new(
        TaskDescriptor::new("low"),
        TaskPriority::Low,
        Box::new(move |_token| -> TaskFuture {
            let order = Arc::clone(&order_for_low);
            Box::pin(async move {
                order.lock().unwrap().push("low");
                Ok(())
            })
        }),
    ));

    let order_for_high = Arc::clone(&order);
    let high = scheduler.submit(TaskSpec::new(
        TaskDescriptor::new("high"),
        TaskPriority::High,
        Box::new(move |_token| -> TaskFuture {
            let order = Arc::clone(&order_for_high);
            Box::pin(async move {
                order.lock().unwrap().push("high");
                Ok(())
            })
        }),
    ));

    gate.notify_one();
    assert_eq!(blocker.completion().await.unwrap().state, TaskState::Succeeded);
    assert_eq!(high.completion().await.unwrap().state, TaskState::Succeeded);
    assert_eq!(low.completion().await.unwrap().state, TaskState::Succeeded);
    assert_eq!(*order.lock().unwrap(), vec!["high", "low"]);
}

#[tokio::test(start_paused = true)]
async fn cancel_between_retries_is_effective() {
    let scheduler = BackgroundTaskScheduler::start(test_config(1));
    let handle = scheduler.submit(TaskSpec::new(
        TaskDescriptor::new("fails-once"),
        TaskPriority::Medium,
        Box::new(move |_token| -> TaskFuture {
            Box::pin(async move {
                Err(TaskError::ExecutionFailed {
                    reason: "transient".into(),
                }
                .into())
            })
        }),
    ));
    let task_id = handle.task_id;

    // Let the first attempt fail; the retry timer is now pending (1s away).
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(scheduler.status(task_id), Some(TaskState::Queued));
    assert!(scheduler.cancel(task_id));

    let completion = handle.completion().await.unwrap();
    assert_eq!(completion.state, TaskState::Cancelled);
    assert_eq!(completion.attempt_count, 1);
}

#[tokio::test(start_paused = true)]
async fn running_task_observes_cooperative_cancellation() {
    let scheduler = BackgroundTaskScheduler::start(test_config(1));
    let handle = scheduler.submit(TaskSpec::new(
        TaskDescriptor::new("long-runner"),
        TaskPriority::Medium,
        Box::new(move |token| -> TaskFuture {
            Box::pin(async move {
                // Poll the token at safe points between steps.
                for _ in 0..600 {
                    if token.is_cancelled() {
                        return Err(TaskError::ExecutionFailed {
                            reason: "observed cancellation".into(),
                        }
                        .into());
                    }
                    tokio::time::sleep(Duration::from_millis(50)).await;
                }
                Ok(())
            })
        }),
    ));
    let task_id = handle.task_id;

    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(scheduler.status(task_id), Some(TaskState::Running));
    assert!(scheduler.cancel(task_id));

    let completion = handle.completion().await.unwrap();
    assert_eq!(completion.state, TaskState::Cancelled);
}

#[tokio::test(start_paused = true)]
async fn timeout_is_a_retryable_failure() {
    let scheduler = BackgroundTaskScheduler::start(test_config(1));
    let handle = scheduler.submit(
        TaskSpec::new(
            TaskDescriptor::new("too-slow"),
            TaskPriority::Medium,
            Box::new(move |_token| -> TaskFuture {
                Box::pin(async move {
                    // Never observes its token; the slot is reclaimed anyway.
                    tokio::time::sleep(Duration::from_secs(600)).await;
                    Ok(())
                })
            }),
        )
        .with_max_attempts(2)
        .with_max_duration(Duration::from_millis(100)),
    );

    let completion = handle.completion().await.unwrap();
    assert_eq!(completion.state, TaskState::Failed);
    assert_eq!(completion.attempt_count, 2);
    assert!(completion.error.unwrap().contains("timed out"));
}

#[tokio::test]
async fn succeeding_task_completes_with_one_attempt() {
    let scheduler = BackgroundTaskScheduler::start(test_config(2));
    let handle = scheduler.submit(TaskSpec::new(
        TaskDescriptor::with_target("prefetch", "https://a.example"),
        TaskPriority::Medium,
        Box::new(move |_token| -> TaskFuture { Box::pin(async move { Ok(()) }) }),
    ));
    let completion = handle.completion().await.unwrap();
    assert_eq!(completion.state, TaskState::Succeeded);
    assert_eq!(completion.attempt_count, 1);
    assert!(completion.error.is_none());
    assert_eq!(completion.descriptor.target.as_deref(), Some("https://a.example"));
}

#[tokio::test]
async fn summary_and_prune_track_terminal_states() {
    let scheduler = BackgroundTaskScheduler::start(test_config(2));
    let ok = scheduler.submit(TaskSpec::new(
        TaskDescriptor::new("ok"),
        TaskPriority::Low,
        Box::new(move |_token| -> TaskFuture { Box::pin(async move { Ok(()) }) }),
    ));
    let bad = scheduler.submit(
        TaskSpec::new(
            TaskDescriptor::new("bad"),
            TaskPriority::Low,
            Box::new(move |_token| -> TaskFuture {
                Box::pin(async move {
                    Err(TaskError::ExecutionFailed {
                        reason: "nope".into(),
                    }
                    .into())
                })
            }),
        )
        .with_max_attempts(1),
    );
    ok.completion().await.unwrap();
    bad.completion().await.unwrap();

    let summary = scheduler.summary();
    assert_eq!(summary.succeeded, 1);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.running, 0);

    assert_eq!(scheduler.prune_finished(), 2);
    assert_eq!(scheduler.summary(), velo_scheduler::TaskSummary::default());
}

#[tokio::test]
async fn cancel_unknown_or_finished_task_returns_false() {
    let scheduler = BackgroundTaskScheduler::start(test_config(1));
    assert!(!scheduler.cancel(uuid::Uuid::new_v4()));

    let handle = scheduler.submit(TaskSpec::new(
        TaskDescriptor::new("done"),
        TaskPriority::High,
        Box::new(move |_token| -> TaskFuture { Box::pin(async move { Ok(()) }) }),
    ));
    let task_id = handle.task_id;
    handle.completion().await.unwrap();
    assert!(!scheduler.cancel(task_id));
}
