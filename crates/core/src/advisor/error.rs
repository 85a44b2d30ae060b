use crate::domain::TaskId;

/// Terminal failures of the submit-and-poll flow. Every variant reaches the
/// caller; nothing here is retried by the core.
#[derive(Debug, thiserror::Error)]
pub enum AdvisorError {
    #[error("analysis could not be started: {0}")]
    SubmissionFailed(#[from] SubmitError),

    #[error("task {task_id} not found")]
    TaskNotFound { task_id: TaskId },

    #[error("task {task_id} failed: {message}")]
    TaskError { task_id: TaskId, message: String },

    #[error("task {task_id} still processing after {attempts} attempts")]
    TimedOut { task_id: TaskId, attempts: u32 },

    #[error("polling for task {task_id} was cancelled")]
    Cancelled { task_id: TaskId },

    #[error("analysis was cancelled before a task was started")]
    SubmissionCancelled,
}

impl AdvisorError {
    /// Short text for the error banner.
    pub fn user_message(&self) -> String {
        match self {
            AdvisorError::SubmissionFailed(_) => "analysis could not be started".to_string(),
            AdvisorError::TaskNotFound { .. } => "task not found, please retry".to_string(),
            AdvisorError::TaskError { message, .. } => message.clone(),
            AdvisorError::TimedOut { .. } => "taking longer than expected".to_string(),
            AdvisorError::Cancelled { .. } | AdvisorError::SubmissionCancelled => {
                "analysis cancelled".to_string()
            }
        }
    }

    /// The caller gave up; not a failure of the backend or the client.
    pub fn is_cancelled(&self) -> bool {
        matches!(
            self,
            AdvisorError::Cancelled { .. } | AdvisorError::SubmissionCancelled
        )
    }

    pub fn task_id(&self) -> Option<&TaskId> {
        match self {
            AdvisorError::SubmissionFailed(_) | AdvisorError::SubmissionCancelled => None,
            AdvisorError::TaskNotFound { task_id }
            | AdvisorError::TaskError { task_id, .. }
            | AdvisorError::TimedOut { task_id, .. }
            | AdvisorError::Cancelled { task_id } => Some(task_id),
        }
    }
}

/// Why the start-task request failed.
#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    #[error("start task request failed: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("start task returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("start task response is malformed: {detail}")]
    MalformedBody { detail: String },
}

/// A single failed status request. Polling logs it and moves on to the next
/// attempt.
#[derive(Debug, thiserror::Error)]
pub enum PollAttemptError {
    #[error("status request failed: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("status request returned HTTP {status}")]
    Status { status: u16 },

    #[error("status response is malformed: {detail}")]
    MalformedBody { detail: String },
}
