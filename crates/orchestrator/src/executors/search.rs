use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use browserpilot_core_types::{PageId, PilotError, Task, TaskType};
use browserpilot_extract::PageSummarizer;
use browserpilot_session_pool::{NavigateOptions, SessionPool};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::time::{sleep, Instant};
use tracing::{debug, warn};

use crate::executor::TaskExecutor;
use crate::model::ExecutionContext;

/// Budget for each result-container marker.
const MARKER_WAIT: Duration = Duration::from_secs(5);
/// Re-probe interval while waiting for a marker to render.
const MARKER_POLL: Duration = Duration::from_millis(250);
/// Fallback settle delay when no marker ever appears.
const FALLBACK_DELAY: Duration = Duration::from_secs(2);
/// How many top results the optional summarization pass covers.
const SUMMARIZE_TOP_N: usize = 3;

/// Supported engines; the first is the default.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchEngine {
    Google,
    Bing,
    DuckDuckGo,
}

impl SearchEngine {
    pub const SUPPORTED: [SearchEngine; 3] =
        [SearchEngine::Google, SearchEngine::Bing, SearchEngine::DuckDuckGo];

    pub fn default_engine() -> Self {
        Self::SUPPORTED[0]
    }

    pub fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "google" => Some(Self::Google),
            "bing" => Some(Self::Bing),
            "duckduckgo" | "ddg" => Some(Self::DuckDuckGo),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Google => "google",
            Self::Bing => "bing",
            Self::DuckDuckGo => "duckduckgo",
        }
    }

    fn search_url(self, query: &str) -> String {
        let encoded: String = url::form_urlencoded::byte_serialize(query.as_bytes()).collect();
        match self {
            Self::Google => format!("https://www.google.com/search?q={encoded}"),
            Self::Bing => format!("https://www.bing.com/search?q={encoded}"),
            Self::DuckDuckGo => format!("https://duckduckgo.com/?q={encoded}"),
        }
    }

    /// Known result-container markers, probed in order; first match wins.
    fn result_markers(self) -> &'static [&'static str] {
        match self {
            Self::Google => &["#search", "#rso", "div.g"],
            Self::Bing => &["#b_results", "li.b_algo"],
            Self::DuckDuckGo => &["#links", "article[data-testid='result']"],
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SearchResult {
    pub title: String,
    pub url: String,
    pub snippet: String,
    pub score: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

/// Relevance heuristic: positional decay plus small boosts for titles and
/// snippets in a useful length band, clamped to [0.1, 1.0].
fn rank_score(position: usize, title: &str, snippet: &str) -> f64 {
    let mut score = 1.0 - 0.05 * position as f64;
    let title_len = title.chars().count();
    if (20..=100).contains(&title_len) {
        score += 0.1;
    }
    let snippet_len = snippet.chars().count();
    if (50..=300).contains(&snippet_len) {
        score += 0.1;
    }
    score.clamp(0.1, 1.0)
}

pub struct SearchExecutor {
    pool: Arc<SessionPool>,
    summarizer: Arc<PageSummarizer>,
}

impl SearchExecutor {
    pub fn new(pool: Arc<SessionPool>, summarizer: Arc<PageSummarizer>) -> Self {
        Self { pool, summarizer }
    }

    fn engine_for(task: &Task) -> SearchEngine {
        task.payload
            .options
            .get("engine")
            .and_then(Value::as_str)
            .and_then(SearchEngine::parse)
            .unwrap_or_else(SearchEngine::default_engine)
    }

    fn wants_summaries(task: &Task) -> bool {
        task.payload
            .options
            .get("summarize_results")
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    /// Poll each known marker until it renders or its budget elapses; fall
    /// back to a fixed settle delay when none ever appears. A single probe is
    /// not enough: evaluate returns immediately, and the container may not
    /// have rendered yet.
    async fn wait_for_results(&self, page: &PageId, engine: SearchEngine) {
        for marker in engine.result_markers() {
            let probe = format!("!!document.querySelector('{marker}')");
            let deadline = Instant::now() + MARKER_WAIT;
            loop {
                match self.pool.evaluate(page, &probe).await {
                    Ok(value) if value.as_bool() == Some(true) => {
                        debug!(marker, "result container present");
                        return;
                    }
                    Ok(_) => {}
                    Err(err) => {
                        warn!(marker, "marker probe failed: {}", err);
                        break;
                    }
                }
                if Instant::now() + MARKER_POLL > deadline {
                    break;
                }
                sleep(MARKER_POLL).await;
            }
        }
        debug!("no result marker matched; settling with fixed delay");
        sleep(FALLBACK_DELAY).await;
    }

    async fn collect_results(
        &self,
        page: &PageId,
        engine: SearchEngine,
    ) -> Result<Vec<SearchResult>, PilotError> {
        // One expression per engine would be more precise; the generic shape
        // {title, url, snippet}[] is what every engine page reduces to.
        let raw = self
            .pool
            .evaluate(page, "window.__pilotCollectSearchResults()")
            .await?;
        let entries = raw.as_array().cloned().unwrap_or_default();

        let mut results = Vec::with_capacity(entries.len());
        for (position, entry) in entries.iter().enumerate() {
            let title = entry
                .get("title")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .trim()
                .to_string();
            let url = entry
                .get("url")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .trim()
                .to_string();
            if title.is_empty() || url.is_empty() {
                continue;
            }
            let snippet = entry
                .get("snippet")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .trim()
                .to_string();
            results.push(SearchResult {
                score: rank_score(position, &title, &snippet),
                title,
                url,
                snippet,
                summary: None,
            });
        }
        debug!(engine = engine.as_str(), count = results.len(), "collected search results");
        Ok(results)
    }

    /// Best-effort enrichment of the top results; a summarization failure
    /// never fails the search itself.
    async fn summarize_top(&self, results: &mut [SearchResult]) {
        for result in results.iter_mut().take(SUMMARIZE_TOP_N) {
            match self
                .summarizer
                .summarize(&result.url, &result.title, &result.snippet)
                .await
            {
                Ok(summary) => result.summary = Some(summary.text),
                Err(err) => {
                    warn!(url = %result.url, "result summarization failed: {}", err);
                    break;
                }
            }
        }
    }

    async fn run_search(
        &self,
        task: &Task,
        ctx: &ExecutionContext,
        query: &str,
    ) -> Result<Value, PilotError> {
        let engine = Self::engine_for(task);
        let session = self
            .pool
            .create_session(ctx.user_id.clone(), ctx.conversation_id.clone())
            .await?;

        let outcome = async {
            let page = self.pool.create_page(&session).await?;
            self.pool
                .navigate(&page, &engine.search_url(query), &NavigateOptions::default())
                .await?;
            self.wait_for_results(&page, engine).await;
            let mut results = self.collect_results(&page, engine).await?;
            if Self::wants_summaries(task) {
                self.summarize_top(&mut results).await;
            }
            Ok(json!({
                "query": query,
                "engine": engine.as_str(),
                "count": results.len(),
                "results": results,
            }))
        }
        .await;

        // Close the session whatever happened above.
        let _ = self.pool.close_session(&session).await;
        outcome
    }
}

#[async_trait]
impl TaskExecutor for SearchExecutor {
    fn name(&self) -> &str {
        "search"
    }

    fn can_handle(&self, task: &Task) -> bool {
        task.task_type == TaskType::Search
    }

    async fn perform(&self, task: &Task, ctx: &ExecutionContext) -> Result<Value, PilotError> {
        let query = task
            .payload
            .query
            .as_deref()
            .filter(|q| !q.trim().is_empty())
            .ok_or_else(|| PilotError::Validation("search task requires a query".into()))?;
        self.run_search(task, ctx, query).await
    }
}
