use thiserror::Error;

use crate::{TaskId, TaskType};

/// Failure classes reported by the reasoning-service collaborator.
///
/// Rate-limit and auth failures are kept distinct so callers can decide
/// whether a retry makes sense.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ReasoningFailure {
    RateLimited,
    Auth,
    Other,
}

/// Unified error taxonomy for the orchestration core.
#[derive(Clone, Debug, Error)]
pub enum PilotError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("security policy rejected request: {0}")]
    Security(String),

    #[error("no executor registered for task type {0:?}")]
    NoExecutorFound(TaskType),

    #[error("executor {executor} declined task {task}")]
    ExecutorMismatch { executor: String, task: TaskId },

    #[error("execution timed out after {timeout_ms}ms")]
    ExecutionTimeout { timeout_ms: u64 },

    #[error("gave up after {attempts} attempts: {last_error}")]
    MaxRetriesExceeded { attempts: u32, last_error: String },

    #[error("task {0} was cancelled")]
    TaskCancelled(TaskId),

    #[error("browser failure: {0}")]
    Browser(String),

    #[error("content extraction failed: {0}")]
    ContentExtraction(String),

    #[error("reasoning service failure: {message}")]
    Reasoning {
        kind: ReasoningFailure,
        message: String,
    },
}

impl PilotError {
    pub fn reasoning(kind: ReasoningFailure, message: impl Into<String>) -> Self {
        Self::Reasoning {
            kind,
            message: message.into(),
        }
    }

    /// Stable machine-readable code for surfaced results and metrics labels.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Security(_) => "SECURITY_ERROR",
            Self::NoExecutorFound(_) => "NO_EXECUTOR_FOUND",
            Self::ExecutorMismatch { .. } => "EXECUTOR_MISMATCH",
            Self::ExecutionTimeout { .. } => "EXECUTION_TIMEOUT",
            Self::MaxRetriesExceeded { .. } => "MAX_RETRIES_EXCEEDED",
            Self::TaskCancelled(_) => "TASK_CANCELLED",
            Self::Browser(_) => "BROWSER_ERROR",
            Self::ContentExtraction(_) => "CONTENT_EXTRACTION_ERROR",
            Self::Reasoning { .. } => "REASONING_ERROR",
        }
    }

    /// Validation and security errors are terminal; transient I/O classes may
    /// be retried with backoff before being surfaced.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Browser(_) | Self::ExecutionTimeout { .. } => true,
            Self::Reasoning { kind, .. } => matches!(kind, ReasoningFailure::RateLimited),
            _ => false,
        }
    }
}

pub type PilotResult<T> = Result<T, PilotError>;
