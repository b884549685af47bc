use std::sync::Arc;

use browserpilot_core_types::{PilotError, Task, TaskType};

use crate::executor::TaskExecutor;

/// Closed dispatch table: one slot per task type, indexed by
/// `TaskType::index()`. There is no runtime registry to miss silently; an
/// unpopulated slot is an explicit NO_EXECUTOR_FOUND.
#[derive(Default)]
pub struct ExecutorSet {
    slots: [Option<Arc<dyn TaskExecutor>>; TaskType::ALL.len()],
}

impl ExecutorSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, task_type: TaskType, executor: Arc<dyn TaskExecutor>) -> Self {
        self.slots[task_type.index()] = Some(executor);
        self
    }

    pub fn get(&self, task_type: TaskType) -> Option<Arc<dyn TaskExecutor>> {
        self.slots[task_type.index()].clone()
    }

    /// Resolve the executor for a task, with no side effects on failure.
    pub fn resolve(&self, task: &Task) -> Result<Arc<dyn TaskExecutor>, PilotError> {
        let executor = self
            .get(task.task_type)
            .ok_or(PilotError::NoExecutorFound(task.task_type))?;
        if !executor.can_handle(task) {
            return Err(PilotError::ExecutorMismatch {
                executor: executor.name().to_string(),
                task: task.id.clone(),
            });
        }
        Ok(executor)
    }

    /// Registered (type, executor) pairs, for health reporting.
    pub fn registered(&self) -> impl Iterator<Item = (TaskType, Arc<dyn TaskExecutor>)> + '_ {
        TaskType::ALL
            .iter()
            .filter_map(|ty| self.get(*ty).map(|e| (*ty, e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::test_support::ScriptedExecutor;
    use browserpilot_core_types::{Task, TaskPayload, UserId};

    #[test]
    fn empty_slot_is_no_executor_found() {
        let set = ExecutorSet::new();
        let task = Task::new(
            TaskType::SendEmail,
            UserId::from("u1"),
            TaskPayload::default(),
        );
        let err = set.resolve(&task).err().unwrap();
        assert_eq!(err.kind(), "NO_EXECUTOR_FOUND");
    }

    #[test]
    fn declined_task_is_executor_mismatch() {
        // Executor registered under Navigate but only handling Search.
        let set = ExecutorSet::new().with(
            TaskType::Navigate,
            Arc::new(ScriptedExecutor::succeeding(TaskType::Search)),
        );
        let task = Task::new(
            TaskType::Navigate,
            UserId::from("u1"),
            TaskPayload::default(),
        );
        let err = set.resolve(&task).err().unwrap();
        assert_eq!(err.kind(), "EXECUTOR_MISMATCH");
    }

    #[test]
    fn populated_slot_resolves() {
        let set = ExecutorSet::new().with(
            TaskType::Search,
            Arc::new(ScriptedExecutor::succeeding(TaskType::Search)),
        );
        let task = Task::new(TaskType::Search, UserId::from("u1"), TaskPayload::default());
        assert!(set.resolve(&task).is_ok());
        assert_eq!(set.registered().count(), 1);
    }
}
