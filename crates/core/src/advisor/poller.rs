//! Fixed-interval polling of a started task.
//!
//! The loop issues at most `max_attempts` status requests, sleeping `interval`
//! between them. A failed request only costs one attempt; the backend's
//! `error` status, an unknown task, or running out of attempts end the loop.

use super::error::AdvisorError;
use super::{AdvisorBackend, PollStatus};
use crate::domain::{Task, TaskErrorReason, TaskState};
use anyhow::ensure;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 30;
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    max_attempts: u32,
    interval: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            interval: DEFAULT_INTERVAL,
        }
    }
}

impl PollConfig {
    pub fn new(max_attempts: u32, interval: Duration) -> anyhow::Result<Self> {
        ensure!(max_attempts > 0, "poll attempt budget must be at least 1");
        Ok(Self {
            max_attempts,
            interval,
        })
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}

pub struct Poller<'a, B: ?Sized> {
    backend: &'a B,
    config: PollConfig,
}

impl<'a, B: AdvisorBackend + ?Sized> Poller<'a, B> {
    pub fn new(backend: &'a B, config: PollConfig) -> Self {
        Self { backend, config }
    }

    /// Drive `task` to a terminal state.
    ///
    /// Returns the completed task, or the typed error for whichever terminal
    /// state was reached. Cancelling `cancel` abandons the in-flight request or
    /// sleep and yields [`AdvisorError::Cancelled`].
    pub async fn run(&self, mut task: Task, cancel: &CancellationToken) -> Result<Task, AdvisorError> {
        if task.is_terminal() {
            return task.into_outcome();
        }

        let max_attempts = self.config.max_attempts;
        tracing::info!(task_id = %task.id, max_attempts, "polling for task result");

        while task.attempts < max_attempts {
            task.attempts += 1;
            let attempt = task.attempts;

            let status = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    return Err(cancelled(&task));
                }
                status = self.backend.fetch_status(&task.id) => status,
            };

            match status {
                Ok(PollStatus::Completed(result)) => {
                    tracing::info!(task_id = %task.id, attempt, "task completed");
                    task.state = TaskState::Completed { result };
                    return task.into_outcome();
                }
                Ok(PollStatus::Failed(message)) => {
                    tracing::error!(task_id = %task.id, attempt, error = %message, "task failed");
                    task.state = TaskState::Error {
                        reason: TaskErrorReason::Backend(message),
                    };
                    return task.into_outcome();
                }
                Ok(PollStatus::NotFound) => {
                    tracing::error!(task_id = %task.id, attempt, "task not found");
                    task.state = TaskState::Error {
                        reason: TaskErrorReason::NotFound,
                    };
                    return task.into_outcome();
                }
                Ok(PollStatus::Processing) => {
                    tracing::debug!(task_id = %task.id, attempt, max_attempts, "task still processing");
                }
                Err(err) => {
                    tracing::warn!(
                        task_id = %task.id,
                        attempt,
                        max_attempts,
                        error = %err,
                        "poll attempt failed; will retry"
                    );
                }
            }

            if task.attempts < max_attempts {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => {
                        return Err(cancelled(&task));
                    }
                    _ = tokio::time::sleep(self.config.interval) => {}
                }
            }
        }

        tracing::warn!(task_id = %task.id, attempts = task.attempts, "task timed out");
        task.state = TaskState::TimedOut;
        task.into_outcome()
    }
}

fn cancelled(task: &Task) -> AdvisorError {
    tracing::info!(task_id = %task.id, attempts = task.attempts, "polling cancelled");
    AdvisorError::Cancelled {
        task_id: task.id.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::advisor::error::PollAttemptError;
    use crate::advisor::testing::ScriptedBackend;
    use crate::domain::TaskId;
    use serde_json::json;

    fn task() -> Task {
        Task::processing(TaskId::new("abc123").unwrap())
    }

    fn config(max_attempts: u32) -> PollConfig {
        PollConfig::new(max_attempts, Duration::from_millis(1)).unwrap()
    }

    fn transient() -> Result<PollStatus, PollAttemptError> {
        Err(PollAttemptError::Status { status: 503 })
    }

    #[test]
    fn rejects_zero_budget() {
        assert!(PollConfig::new(0, Duration::from_secs(1)).is_err());
        assert_eq!(PollConfig::default().max_attempts(), 30);
        assert_eq!(PollConfig::default().interval(), Duration::from_secs(10));
    }

    #[tokio::test]
    async fn completes_on_nth_poll() {
        let backend = ScriptedBackend::new(vec![
            Ok(PollStatus::Processing),
            Ok(PollStatus::Processing),
            Ok(PollStatus::Processing),
            Ok(PollStatus::Completed(json!({"allocations": {"Bonds": 1.0}}))),
        ]);

        let done = Poller::new(&backend, config(30))
            .run(task(), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(done.attempts, 4);
        assert_eq!(backend.polls(), 4);
        assert_eq!(done.result(), Some(&json!({"allocations": {"Bonds": 1.0}})));
    }

    #[tokio::test]
    async fn times_out_after_exact_budget() {
        let backend = ScriptedBackend::new(Vec::new());

        let err = Poller::new(&backend, config(7))
            .run(task(), &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, AdvisorError::TimedOut { attempts: 7, .. }));
        assert_eq!(backend.polls(), 7);
    }

    #[tokio::test]
    async fn not_found_stops_immediately() {
        let backend = ScriptedBackend::new(vec![Ok(PollStatus::NotFound)]);

        let err = Poller::new(&backend, config(30))
            .run(task(), &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, AdvisorError::TaskNotFound { .. }));
        assert_eq!(backend.polls(), 1);
    }

    #[tokio::test]
    async fn backend_error_carries_message() {
        let backend = ScriptedBackend::new(vec![
            Ok(PollStatus::Processing),
            Ok(PollStatus::Processing),
            Ok(PollStatus::Failed("bad risk profile".into())),
        ]);

        let err = Poller::new(&backend, config(30))
            .run(task(), &CancellationToken::new())
            .await
            .unwrap_err();

        match err {
            AdvisorError::TaskError { message, task_id } => {
                assert_eq!(message, "bad risk profile");
                assert_eq!(task_id.as_str(), "abc123");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(backend.polls(), 3);
    }

    #[tokio::test]
    async fn transient_failure_does_not_abort() {
        let backend = ScriptedBackend::new(vec![
            Ok(PollStatus::Processing),
            transient(),
            Ok(PollStatus::Processing),
            Ok(PollStatus::Completed(json!({"ok": true}))),
        ]);

        let done = Poller::new(&backend, config(30))
            .run(task(), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(done.attempts, 4);
        assert_eq!(done.result(), Some(&json!({"ok": true})));
    }

    #[tokio::test]
    async fn transient_failures_still_respect_budget() {
        let backend = ScriptedBackend::new((0..10).map(|_| transient()).collect());

        let err = Poller::new(&backend, config(5))
            .run(task(), &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, AdvisorError::TimedOut { attempts: 5, .. }));
        assert_eq!(backend.polls(), 5);
    }

    #[tokio::test]
    async fn cancelled_before_start_makes_no_requests() {
        let backend = ScriptedBackend::new(Vec::new());
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = Poller::new(&backend, config(30))
            .run(task(), &cancel)
            .await
            .unwrap_err();

        assert!(matches!(err, AdvisorError::Cancelled { .. }));
        assert_eq!(backend.polls(), 0);
    }

    #[tokio::test]
    async fn cancellation_interrupts_the_sleep() {
        let backend = ScriptedBackend::new(Vec::new());
        let cancel = CancellationToken::new();
        let slow = PollConfig::new(30, Duration::from_secs(3600)).unwrap();

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let err = Poller::new(&backend, slow)
            .run(task(), &cancel)
            .await
            .unwrap_err();

        assert!(matches!(err, AdvisorError::Cancelled { .. }));
        assert_eq!(backend.polls(), 1);
    }

    #[tokio::test]
    async fn cancellation_abandons_in_flight_request() {
        let backend = ScriptedBackend::hanging_polls();
        let cancel = CancellationToken::new();

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let err = tokio::time::timeout(
            Duration::from_secs(5),
            Poller::new(&backend, config(30)).run(task(), &cancel),
        )
        .await
        .expect("cancellation should end the poll loop")
        .unwrap_err();

        assert!(matches!(err, AdvisorError::Cancelled { .. }));
        assert_eq!(backend.polls(), 1);
    }

    #[tokio::test]
    async fn terminal_task_is_returned_without_polling() {
        let backend = ScriptedBackend::new(Vec::new());
        let mut done = task();
        done.state = TaskState::Completed { result: json!(1) };

        let out = Poller::new(&backend, config(30))
            .run(done, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(out.result(), Some(&json!(1)));
        assert_eq!(backend.polls(), 0);
    }
}
