//! Client side of the remote recommendation engine: start a task for a
//! profile, then poll it until the backend reports a terminal state.

pub mod error;
pub mod http;
pub mod poller;

use crate::domain::{Task, TaskId, UserProfile};
use error::{AdvisorError, PollAttemptError, SubmitError};
use poller::{PollConfig, Poller};
use serde_json::Value;
use tokio_util::sync::CancellationToken;

/// Status of a task as reported by one poll.
#[derive(Debug, Clone, PartialEq)]
pub enum PollStatus {
    Processing,
    Completed(Value),
    Failed(String),
    NotFound,
}

#[async_trait::async_trait]
pub trait AdvisorBackend: Send + Sync {
    async fn start_task(&self, profile: &UserProfile) -> Result<TaskId, SubmitError>;

    async fn fetch_status(&self, task_id: &TaskId) -> Result<PollStatus, PollAttemptError>;
}

/// Result of a full submit-and-poll run.
#[derive(Debug, Clone, PartialEq)]
pub struct Analysis {
    pub task_id: TaskId,
    pub attempts: u32,
    pub result: Value,
}

pub struct Advisor<B> {
    backend: B,
    poll_config: PollConfig,
}

impl<B: AdvisorBackend> Advisor<B> {
    pub fn new(backend: B, poll_config: PollConfig) -> Self {
        Self {
            backend,
            poll_config,
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Start one backend job. The returned task is in `Processing` state.
    pub async fn submit(&self, profile: UserProfile) -> Result<Task, AdvisorError> {
        let task_id = self.backend.start_task(&profile).await.map_err(|err| {
            tracing::error!(error = %err, "failed to start analysis task");
            AdvisorError::SubmissionFailed(err)
        })?;

        tracing::info!(
            task_id = %task_id,
            objective = %profile.objective,
            risk = %profile.risk,
            "analysis task started"
        );
        Ok(Task::processing(task_id))
    }

    pub async fn poll(&self, task: Task, cancel: &CancellationToken) -> Result<Task, AdvisorError> {
        Poller::new(&self.backend, self.poll_config)
            .run(task, cancel)
            .await
    }

    pub async fn analyze(
        &self,
        profile: UserProfile,
        cancel: &CancellationToken,
    ) -> Result<Analysis, AdvisorError> {
        let task = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::info!("analysis cancelled before the task started");
                return Err(AdvisorError::SubmissionCancelled);
            }
            task = self.submit(profile) => task?,
        };

        let task = self.poll(task, cancel).await?;
        let task_id = task.id.clone();
        let attempts = task.attempts;
        let Some(result) = task.into_result() else {
            unreachable!("poll returned a task that is not completed: {task_id}");
        };

        Ok(Analysis {
            task_id,
            attempts,
            result,
        })
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    /// Replays a fixed sequence of poll replies. Once the script runs out it
    /// keeps answering `Processing`.
    pub struct ScriptedBackend {
        submit: Mutex<Option<Result<TaskId, SubmitError>>>,
        script: Mutex<VecDeque<Result<PollStatus, PollAttemptError>>>,
        polls: AtomicU32,
        hang_submit: bool,
        hang_polls: bool,
    }

    impl ScriptedBackend {
        pub fn new(script: Vec<Result<PollStatus, PollAttemptError>>) -> Self {
            Self {
                submit: Mutex::new(Some(Ok(TaskId::new("abc123").unwrap()))),
                script: Mutex::new(script.into()),
                polls: AtomicU32::new(0),
                hang_submit: false,
                hang_polls: false,
            }
        }

        /// `start_task` never answers.
        pub fn hanging_submit() -> Self {
            Self {
                hang_submit: true,
                ..Self::new(Vec::new())
            }
        }

        /// Every status request is counted and then never answers.
        pub fn hanging_polls() -> Self {
            Self {
                hang_polls: true,
                ..Self::new(Vec::new())
            }
        }

        pub fn failing_submit(err: SubmitError) -> Self {
            let backend = Self::new(Vec::new());
            *backend.submit.lock().unwrap() = Some(Err(err));
            backend
        }

        pub fn polls(&self) -> u32 {
            self.polls.load(Ordering::SeqCst)
        }
    }

    #[async_trait::async_trait]
    impl AdvisorBackend for ScriptedBackend {
        async fn start_task(&self, _profile: &UserProfile) -> Result<TaskId, SubmitError> {
            if self.hang_submit {
                std::future::pending::<()>().await;
            }
            self.submit
                .lock()
                .unwrap()
                .take()
                .unwrap_or_else(|| Ok(TaskId::new("abc123").unwrap()))
        }

        async fn fetch_status(&self, _task_id: &TaskId) -> Result<PollStatus, PollAttemptError> {
            self.polls.fetch_add(1, Ordering::SeqCst);
            if self.hang_polls {
                std::future::pending::<()>().await;
            }
            self.script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Ok(PollStatus::Processing))
        }
    }
}
