use std::sync::Arc;

use async_trait::async_trait;
use browserpilot_core_types::{PilotError, Task, TaskType};
use browserpilot_extract::{ContentExtractor, ExtractionReport, MIN_CONTENT_LENGTH};
use browserpilot_session_pool::{NavigateOptions, SessionPool};
use serde_json::{json, Value};

use crate::executor::TaskExecutor;
use crate::model::ExecutionContext;

/// Runs the readability collaborator over inline HTML or a fetched page.
/// The extraction report (success flag and confidence) is the task's data;
/// a short page is a reported outcome, not an execution failure.
pub struct ExtractContentExecutor {
    pool: Arc<SessionPool>,
    extractor: Arc<dyn ContentExtractor>,
}

impl ExtractContentExecutor {
    pub fn new(pool: Arc<SessionPool>, extractor: Arc<dyn ContentExtractor>) -> Self {
        Self { pool, extractor }
    }

    async fn fetch_html(&self, ctx: &ExecutionContext, url: &str) -> Result<String, PilotError> {
        let session = self
            .pool
            .create_session(ctx.user_id.clone(), ctx.conversation_id.clone())
            .await?;
        let outcome = async {
            let page = self.pool.create_page(&session).await?;
            self.pool
                .navigate(&page, url, &NavigateOptions::default())
                .await?;
            let content = self.pool.content(&page).await?;
            Ok::<_, PilotError>(content.html)
        }
        .await;
        let _ = self.pool.close_session(&session).await;
        outcome
    }

    fn min_length(task: &Task) -> usize {
        task.payload
            .options
            .get("min_content_length")
            .and_then(Value::as_u64)
            .map(|n| n as usize)
            .unwrap_or(MIN_CONTENT_LENGTH)
    }
}

#[async_trait]
impl TaskExecutor for ExtractContentExecutor {
    fn name(&self) -> &str {
        "extract_content"
    }

    fn can_handle(&self, task: &Task) -> bool {
        task.task_type == TaskType::ExtractContent
    }

    async fn perform(&self, task: &Task, ctx: &ExecutionContext) -> Result<Value, PilotError> {
        let (html, source_url) = match (&task.payload.content, &task.payload.url) {
            (Some(html), url) => (html.clone(), url.clone().unwrap_or_default()),
            (None, Some(url)) => (self.fetch_html(ctx, url).await?, url.clone()),
            (None, None) => {
                return Err(PilotError::Validation(
                    "extract_content task requires a url or inline content".into(),
                ))
            }
        };

        let report = ExtractionReport::assess(
            self.extractor.extract(&html, &source_url),
            Self::min_length(task),
        );
        Ok(json!({
            "url": source_url,
            "success": report.success,
            "confidence": report.confidence,
            "content": report.content,
        }))
    }
}
