use std::time::Duration;

use async_trait::async_trait;
use browserpilot_core_types::{
    ExecutionId, PilotError, ResultMetadata, Task, TaskResult,
};
use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde_json::Value;
use tokio::time::sleep;
use tracing::warn;

use crate::metrics;
use crate::model::{ExecutionContext, ExecutorConfig};

/// Backoff for transient failures: 1s, 2s, 4s, ... capped at 10s.
fn backoff_delay(attempt: u32) -> Duration {
    let exp = attempt.saturating_sub(1).min(10);
    Duration::from_millis((1000u64 << exp).min(10_000))
}

fn validate_shape(task: &Task) -> Result<(), PilotError> {
    if task.id.0.trim().is_empty() {
        return Err(PilotError::Validation("task id must be present".into()));
    }
    if task.user_id.0.trim().is_empty() {
        return Err(PilotError::Validation("task user id must be present".into()));
    }
    Ok(())
}

/// One capability implementation per task type. `perform` is the only
/// required work method; the provided `execute` wraps it in validation and
/// the retry discipline, and `execute_batch` adds chunked concurrency.
#[async_trait]
pub trait TaskExecutor: Send + Sync {
    fn name(&self) -> &str;

    fn config(&self) -> ExecutorConfig {
        ExecutorConfig::default()
    }

    fn can_handle(&self, task: &Task) -> bool;

    /// The executor-specific work. Transient failures (retryable per the
    /// error taxonomy) are retried by `execute`; terminal ones surface as-is.
    async fn perform(&self, task: &Task, ctx: &ExecutionContext) -> Result<Value, PilotError>;

    async fn execute(&self, task: &Task, ctx: &ExecutionContext) -> TaskResult {
        if let Err(err) = validate_shape(task) {
            return TaskResult::failure(task.id.clone(), self.name(), &err);
        }
        if !self.can_handle(task) {
            let err = PilotError::ExecutorMismatch {
                executor: self.name().to_string(),
                task: task.id.clone(),
            };
            return TaskResult::failure(task.id.clone(), self.name(), &err);
        }

        let config = self.config();
        let execution_id = ExecutionId::new();
        let started_at = Utc::now();
        metrics::record_started(self.name());

        let attempts = config.max_retries.max(1);
        let mut last_error = String::new();
        for attempt in 1..=attempts {
            match self.perform(task, ctx).await {
                Ok(data) => {
                    metrics::record_completed(self.name());
                    return self.finished(task, execution_id, started_at, Ok(data));
                }
                Err(err) if !err.is_retryable() => {
                    metrics::record_failed(self.name());
                    return self.finished(task, execution_id, started_at, Err(err));
                }
                Err(err) => {
                    warn!(
                        task = %task.id,
                        executor = self.name(),
                        attempt,
                        "transient failure: {}",
                        err
                    );
                    last_error = err.to_string();
                    if attempt < attempts {
                        metrics::record_retried(self.name());
                        sleep(backoff_delay(attempt)).await;
                    }
                }
            }
        }

        metrics::record_failed(self.name());
        let err = PilotError::MaxRetriesExceeded {
            attempts,
            last_error,
        };
        self.finished(task, execution_id, started_at, Err(err))
    }

    /// Chunked batch execution: members of a chunk run concurrently, each
    /// settling independently so one failure never aborts its siblings.
    async fn execute_batch(&self, tasks: &[Task], ctx: &ExecutionContext) -> Vec<TaskResult> {
        let concurrency = self.config().concurrency.max(1);
        let mut results = Vec::with_capacity(tasks.len());
        for chunk in tasks.chunks(concurrency) {
            let settled = join_all(chunk.iter().map(|task| self.execute(task, ctx))).await;
            results.extend(settled);
        }
        results
    }

    async fn health_check(&self) -> bool {
        true
    }

    /// Assemble the final result with real timing metadata.
    fn finished(
        &self,
        task: &Task,
        execution_id: ExecutionId,
        started_at: DateTime<Utc>,
        outcome: Result<Value, PilotError>,
    ) -> TaskResult {
        let finished_at = Utc::now();
        let duration_ms = (finished_at - started_at).num_milliseconds().max(0) as u64;
        let metadata = ResultMetadata {
            executor: self.name().to_string(),
            execution_id,
            started_at,
            finished_at,
        };
        match outcome {
            Ok(data) => TaskResult {
                task_id: task.id.clone(),
                success: true,
                data,
                error: None,
                error_kind: None,
                metadata,
                duration_ms,
            },
            Err(err) => TaskResult {
                task_id: task.id.clone(),
                success: false,
                data: Value::Null,
                error: Some(err.to_string()),
                error_kind: Some(err.kind().to_string()),
                metadata,
                duration_ms,
            },
        }
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::ScriptedExecutor;
    use super::*;
    use browserpilot_core_types::{TaskPayload, TaskType, UserId};
    use std::sync::atomic::Ordering;

    fn task(ty: TaskType) -> Task {
        Task::new(ty, UserId::from("u1"), TaskPayload::default())
    }

    fn ctx() -> ExecutionContext {
        ExecutionContext::new(UserId::from("u1"), "conv-1")
    }

    #[test]
    fn backoff_is_exponential_and_capped() {
        assert_eq!(backoff_delay(1), Duration::from_millis(1000));
        assert_eq!(backoff_delay(2), Duration::from_millis(2000));
        assert_eq!(backoff_delay(3), Duration::from_millis(4000));
        assert_eq!(backoff_delay(5), Duration::from_millis(10_000));
        assert_eq!(backoff_delay(20), Duration::from_millis(10_000));
    }

    #[tokio::test(start_paused = true)]
    async fn transient_failures_retry_then_succeed() {
        let executor = ScriptedExecutor::failing_first(TaskType::Search, 2);
        let result = executor.execute(&task(TaskType::Search), &ctx()).await;
        assert!(result.success);
        assert_eq!(executor.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_retries_surface_max_retries_exceeded() {
        let executor = ScriptedExecutor::failing_first(TaskType::Search, 10);
        let result = executor.execute(&task(TaskType::Search), &ctx()).await;
        assert!(!result.success);
        assert_eq!(result.error_kind.as_deref(), Some("MAX_RETRIES_EXCEEDED"));
        assert_eq!(executor.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn mismatched_task_is_rejected_without_work() {
        let executor = ScriptedExecutor::succeeding(TaskType::Search);
        let result = executor.execute(&task(TaskType::Navigate), &ctx()).await;
        assert!(!result.success);
        assert_eq!(result.error_kind.as_deref(), Some("EXECUTOR_MISMATCH"));
        assert_eq!(executor.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn blank_task_id_fails_validation() {
        let executor = ScriptedExecutor::succeeding(TaskType::Search);
        let mut bad = task(TaskType::Search);
        bad.id = browserpilot_core_types::TaskId::from("");
        let result = executor.execute(&bad, &ctx()).await;
        assert_eq!(result.error_kind.as_deref(), Some("VALIDATION_ERROR"));
    }

    #[tokio::test]
    async fn batch_settles_members_independently() {
        let executor = ScriptedExecutor::succeeding(TaskType::Search);
        let tasks = vec![
            task(TaskType::Search),
            task(TaskType::Navigate),
            task(TaskType::Search),
        ];
        let results = executor.execute_batch(&tasks, &ctx()).await;
        assert_eq!(results.len(), 3);
        assert!(results[0].success);
        assert!(!results[1].success);
        assert!(results[2].success);
        for (task, result) in tasks.iter().zip(&results) {
            assert_eq!(task.id, result.task_id);
        }
    }
}
