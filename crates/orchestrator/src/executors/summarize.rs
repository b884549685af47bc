use std::sync::Arc;

use async_trait::async_trait;
use browserpilot_core_types::{PilotError, Task, TaskType};
use browserpilot_extract::{
    ContentExtractor, ExtractionReport, PageSummarizer, MIN_CONTENT_LENGTH,
};
use browserpilot_session_pool::{NavigateOptions, PageContent, SessionPool};
use serde_json::{json, Value};

use crate::executor::TaskExecutor;
use crate::model::ExecutionContext;

/// Fetch (or accept) page content, extract the readable core, and summarize
/// it through the reasoning collaborator. Summaries go through the TTL cache.
pub struct SummarizeExecutor {
    pool: Arc<SessionPool>,
    extractor: Arc<dyn ContentExtractor>,
    summarizer: Arc<PageSummarizer>,
}

impl SummarizeExecutor {
    pub fn new(
        pool: Arc<SessionPool>,
        extractor: Arc<dyn ContentExtractor>,
        summarizer: Arc<PageSummarizer>,
    ) -> Self {
        Self {
            pool,
            extractor,
            summarizer,
        }
    }

    async fn fetch_page(
        &self,
        ctx: &ExecutionContext,
        url: &str,
    ) -> Result<PageContent, PilotError> {
        let session = self
            .pool
            .create_session(ctx.user_id.clone(), ctx.conversation_id.clone())
            .await?;
        let outcome = async {
            let page = self.pool.create_page(&session).await?;
            self.pool
                .navigate(&page, url, &NavigateOptions::default())
                .await?;
            Ok::<_, PilotError>(self.pool.content(&page).await?)
        }
        .await;
        let _ = self.pool.close_session(&session).await;
        outcome
    }
}

#[async_trait]
impl TaskExecutor for SummarizeExecutor {
    fn name(&self) -> &str {
        "summarize"
    }

    fn can_handle(&self, task: &Task) -> bool {
        task.task_type == TaskType::Summarize
    }

    async fn perform(&self, task: &Task, ctx: &ExecutionContext) -> Result<Value, PilotError> {
        let page = match (&task.payload.content, &task.payload.url) {
            (Some(content), url) => PageContent {
                url: url.clone().unwrap_or_default(),
                title: String::new(),
                html: content.clone(),
                text: content.clone(),
            },
            (None, Some(url)) => self.fetch_page(ctx, url).await?,
            (None, None) => {
                return Err(PilotError::Validation(
                    "summarize task requires a url or inline content".into(),
                ))
            }
        };

        let report = ExtractionReport::assess(
            self.extractor.extract(&page.html, &page.url),
            MIN_CONTENT_LENGTH,
        );
        let (title, text) = match &report.content {
            Some(content) => (
                if content.title.is_empty() {
                    page.title.clone()
                } else {
                    content.title.clone()
                },
                content.text.clone(),
            ),
            None => {
                return Err(PilotError::ContentExtraction(format!(
                    "no readable content at {}",
                    page.url
                )))
            }
        };

        let summary = self.summarizer.summarize(&page.url, &title, &text).await?;
        Ok(json!({
            "url": page.url,
            "title": title,
            "summary": summary.text,
            "cached": summary.cached,
            "confidence": report.confidence,
        }))
    }
}
