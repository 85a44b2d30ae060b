use crate::advisor::error::AdvisorError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Backend-assigned identifier of one analysis job. Kept byte-for-byte as the
/// backend sent it; blank ids are rejected.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TaskId(String);

impl TaskId {
    pub fn new(id: impl Into<String>) -> Option<Self> {
        let id = id.into();
        if id.trim().is_empty() {
            return None;
        }
        Some(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for TaskId {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        TaskId::new(value).ok_or_else(|| "task id must be non-empty".to_string())
    }
}

impl From<TaskId> for String {
    fn from(value: TaskId) -> Self {
        value.0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TaskState {
    Processing,
    Completed { result: Value },
    Error { reason: TaskErrorReason },
    /// Produced locally once the poll budget runs out.
    TimedOut,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TaskErrorReason {
    NotFound,
    Backend(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Task {
    pub id: TaskId,
    pub state: TaskState,
    /// Status requests issued so far.
    pub attempts: u32,
}

impl Task {
    pub fn processing(id: TaskId) -> Self {
        Self {
            id,
            state: TaskState::Processing,
            attempts: 0,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self.state, TaskState::Processing)
    }

    pub fn result(&self) -> Option<&Value> {
        match &self.state {
            TaskState::Completed { result } => Some(result),
            _ => None,
        }
    }

    /// The payload of a completed task. `None` for every other state.
    pub fn into_result(self) -> Option<Value> {
        match self.state {
            TaskState::Completed { result } => Some(result),
            _ => None,
        }
    }

    /// Turn a failed terminal state into its typed error. Completed and
    /// still-processing tasks come back unchanged.
    pub fn into_outcome(self) -> Result<Task, AdvisorError> {
        match self.state {
            TaskState::Processing | TaskState::Completed { .. } => Ok(self),
            TaskState::Error {
                reason: TaskErrorReason::NotFound,
            } => Err(AdvisorError::TaskNotFound { task_id: self.id }),
            TaskState::Error {
                reason: TaskErrorReason::Backend(message),
            } => Err(AdvisorError::TaskError {
                task_id: self.id,
                message,
            }),
            TaskState::TimedOut => Err(AdvisorError::TimedOut {
                task_id: self.id,
                attempts: self.attempts,
            }),
        }
    }
}
