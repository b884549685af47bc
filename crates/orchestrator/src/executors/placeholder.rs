use async_trait::async_trait;
use browserpilot_core_types::{PilotError, Task, TaskType};
use serde_json::{json, Value};
use tracing::info;

use crate::executor::TaskExecutor;
use crate::model::ExecutionContext;

/// Stand-in for capabilities that exist in the task taxonomy but have no real
/// implementation yet. Keeps the dispatch table total so these task types
/// resolve instead of falling into NO_EXECUTOR_FOUND.
pub struct PlaceholderExecutor {
    task_type: TaskType,
}

impl PlaceholderExecutor {
    pub fn new(task_type: TaskType) -> Self {
        Self { task_type }
    }
}

#[async_trait]
impl TaskExecutor for PlaceholderExecutor {
    fn name(&self) -> &str {
        self.task_type.as_str()
    }

    fn can_handle(&self, task: &Task) -> bool {
        task.task_type == self.task_type
    }

    async fn perform(&self, task: &Task, _ctx: &ExecutionContext) -> Result<Value, PilotError> {
        info!(task = %task.id, capability = self.name(), "placeholder executor acknowledged task");
        Ok(json!({
            "implemented": false,
            "capability": self.name(),
            "message": format!("capability '{}' is acknowledged but not implemented", self.name()),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use browserpilot_core_types::{TaskPayload, UserId};

    #[tokio::test]
    async fn placeholder_acknowledges_without_doing_work() {
        let executor = PlaceholderExecutor::new(TaskType::BookHotel);
        let task = Task::new(
            TaskType::BookHotel,
            UserId::from("u1"),
            TaskPayload::default(),
        );
        let ctx = ExecutionContext::new(UserId::from("u1"), "conv-1");
        let result = executor.execute(&task, &ctx).await;
        assert!(result.success);
        assert_eq!(result.data["implemented"], false);
    }

    #[tokio::test]
    async fn placeholder_declines_other_types() {
        let executor = PlaceholderExecutor::new(TaskType::SendEmail);
        let task = Task::new(
            TaskType::Navigate,
            UserId::from("u1"),
            TaskPayload::default(),
        );
        assert!(!executor.can_handle(&task));
    }
}
