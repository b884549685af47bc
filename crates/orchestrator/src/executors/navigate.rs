use std::sync::Arc;

use async_trait::async_trait;
use browserpilot_core_types::{PageId, PilotError, SessionId, Task, TaskType};
use browserpilot_session_pool::{NavigateOptions, SessionPool};
use serde_json::{json, Value};
use tracing::debug;

use crate::executor::TaskExecutor;
use crate::model::ExecutionContext;

pub struct NavigateExecutor {
    pool: Arc<SessionPool>,
}

impl NavigateExecutor {
    pub fn new(pool: Arc<SessionPool>) -> Self {
        Self { pool }
    }

    async fn visit(&self, session: &SessionId, page: &PageId, url: &str) -> Result<Value, PilotError> {
        self.pool
            .navigate(page, url, &NavigateOptions::default())
            .await?;
        let content = self.pool.content(page).await?;
        debug!(%session, url, title = %content.title, "navigation complete");
        Ok(json!({
            "url": content.url,
            "title": content.title,
            "text_length": content.text.chars().count(),
        }))
    }
}

#[async_trait]
impl TaskExecutor for NavigateExecutor {
    fn name(&self) -> &str {
        "navigate"
    }

    fn can_handle(&self, task: &Task) -> bool {
        task.task_type == TaskType::Navigate
    }

    async fn perform(&self, task: &Task, ctx: &ExecutionContext) -> Result<Value, PilotError> {
        let url = task
            .payload
            .url
            .as_deref()
            .ok_or_else(|| PilotError::Validation("navigate task requires a url".into()))?;

        let session = self
            .pool
            .create_session(ctx.user_id.clone(), ctx.conversation_id.clone())
            .await?;
        let outcome = match self.pool.create_page(&session).await {
            Ok(page) => self.visit(&session, &page, url).await,
            Err(err) => Err(err.into()),
        };
        // Session teardown happens in every outcome.
        let _ = self.pool.close_session(&session).await;
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use browserpilot_core_types::{TaskPayload, UserId};
    use browserpilot_session_pool::{PoolConfig, StubEngine};

    fn setup() -> (NavigateExecutor, ExecutionContext) {
        let pool = Arc::new(SessionPool::new(
            Arc::new(StubEngine::new()),
            PoolConfig::default(),
        ));
        (
            NavigateExecutor::new(pool),
            ExecutionContext::new(UserId::from("u1"), "conv-1"),
        )
    }

    #[tokio::test]
    async fn navigation_reports_page_metadata() {
        let (executor, ctx) = setup();
        let task = Task::new(
            TaskType::Navigate,
            UserId::from("u1"),
            TaskPayload::with_url("https://example.com"),
        );
        let data = executor.perform(&task, &ctx).await.unwrap();
        assert_eq!(data["url"], "https://example.com");
        assert!(data["title"].as_str().unwrap().contains("example.com"));
    }

    #[tokio::test]
    async fn missing_url_is_a_validation_error() {
        let (executor, ctx) = setup();
        let task = Task::new(TaskType::Navigate, UserId::from("u1"), TaskPayload::default());
        let err = executor.perform(&task, &ctx).await.unwrap_err();
        assert_eq!(err.kind(), "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn sessions_are_released_after_each_run() {
        let (executor, ctx) = setup();
        let task = Task::new(
            TaskType::Navigate,
            UserId::from("u1"),
            TaskPayload::with_url("https://example.com"),
        );
        executor.perform(&task, &ctx).await.unwrap();
        assert_eq!(executor.pool.session_count(), 0);
    }
}
