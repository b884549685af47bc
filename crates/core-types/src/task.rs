use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{ExecutionId, GoalId, PilotError, TaskId, UserId};

/// Closed set of task capabilities. Adding a variant forces every dispatch
/// site to handle it at compile time.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    Navigate,
    ExtractContent,
    Summarize,
    Search,
    BookHotel,
    FindProduct,
    SendEmail,
}

impl TaskType {
    pub const ALL: [TaskType; 7] = [
        TaskType::Navigate,
        TaskType::ExtractContent,
        TaskType::Summarize,
        TaskType::Search,
        TaskType::BookHotel,
        TaskType::FindProduct,
        TaskType::SendEmail,
    ];

    pub fn index(self) -> usize {
        match self {
            TaskType::Navigate => 0,
            TaskType::ExtractContent => 1,
            TaskType::Summarize => 2,
            TaskType::Search => 3,
            TaskType::BookHotel => 4,
            TaskType::FindProduct => 5,
            TaskType::SendEmail => 6,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TaskType::Navigate => "navigate",
            TaskType::ExtractContent => "extract_content",
            TaskType::Summarize => "summarize",
            TaskType::Search => "search",
            TaskType::BookHotel => "book_hotel",
            TaskType::FindProduct => "find_product",
            TaskType::SendEmail => "send_email",
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    Cancelled,
}

impl TaskStatus {
    /// The status state machine only moves forward; terminal states accept no
    /// further transitions.
    pub fn can_transition_to(self, next: TaskStatus) -> bool {
        use TaskStatus::*;
        matches!(
            (self, next),
            (Pending, Processing)
                | (Pending, Cancelled)
                | (Processing, Completed)
                | (Processing, Failed)
                | (Processing, Cancelled)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TaskStatus::Completed | TaskStatus::Failed | TaskStatus::Cancelled
        )
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskPriority {
    Low,
    Medium,
    High,
    Critical,
}

impl Default for TaskPriority {
    fn default() -> Self {
        TaskPriority::Medium
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct TaskPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default)]
    pub options: HashMap<String, Value>,
}

impl TaskPayload {
    pub fn with_url(url: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            ..Self::default()
        }
    }

    pub fn with_query(query: impl Into<String>) -> Self {
        Self {
            query: Some(query.into()),
            ..Self::default()
        }
    }
}

pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// A single typed unit of work. Owned by the orchestrator's in-flight map for
/// the duration of execution.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    #[serde(rename = "type")]
    pub task_type: TaskType,
    pub user_id: UserId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub goal_id: Option<GoalId>,
    pub payload: TaskPayload,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub retry_count: u32,
    pub max_retries: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Task {
    pub fn new(task_type: TaskType, user_id: UserId, payload: TaskPayload) -> Self {
        let now = Utc::now();
        Self {
            id: TaskId::new(),
            task_type,
            user_id,
            goal_id: None,
            payload,
            status: TaskStatus::Pending,
            priority: TaskPriority::default(),
            retry_count: 0,
            max_retries: DEFAULT_MAX_RETRIES,
            created_at: now,
            updated_at: now,
            completed_at: None,
            error: None,
        }
    }

    pub fn with_priority(mut self, priority: TaskPriority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_goal(mut self, goal_id: GoalId) -> Self {
        self.goal_id = Some(goal_id);
        self
    }

    /// Advance the status, enforcing the forward-only state machine.
    pub fn advance(&mut self, next: TaskStatus) -> Result<(), PilotError> {
        if !self.status.can_transition_to(next) {
            return Err(PilotError::Validation(format!(
                "illegal task status transition {:?} -> {:?}",
                self.status, next
            )));
        }
        self.status = next;
        self.updated_at = Utc::now();
        if next.is_terminal() {
            self.completed_at = Some(self.updated_at);
        }
        Ok(())
    }
}

/// Metadata describing who executed a task and when.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ResultMetadata {
    pub executor: String,
    pub execution_id: ExecutionId,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

/// Exactly one result exists per completed execution attempt; cancelled tasks
/// produce none.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TaskResult {
    pub task_id: TaskId,
    pub success: bool,
    pub data: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<String>,
    pub metadata: ResultMetadata,
    pub duration_ms: u64,
}

impl TaskResult {
    pub fn failure(task_id: TaskId, executor: impl Into<String>, err: &PilotError) -> Self {
        let now = Utc::now();
        Self {
            task_id,
            success: false,
            data: Value::Null,
            error: Some(err.to_string()),
            error_kind: Some(err.kind().to_string()),
            metadata: ResultMetadata {
                executor: executor.into(),
                execution_id: ExecutionId::new(),
                started_at: now,
                finished_at: now,
            },
            duration_ms: 0,
        }
    }
}
