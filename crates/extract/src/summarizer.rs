use std::sync::Arc;
use std::time::{Duration, Instant};

use browserpilot_core_types::PilotResult;
use browserpilot_reasoning::{ChatMessage, ChatRequest, ReasoningClient};
use dashmap::DashMap;
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::debug;

const SUMMARY_SYSTEM_PROMPT: &str = "You are a precise web-page summarizer. \
Summarize the supplied page content in 3-5 sentences. Mention concrete facts \
(names, numbers, dates) when present. Reply with the summary text only.";

/// How much of the page text participates in the cache key. Two pages whose
/// URL, title, and leading snippet all match are considered the same page.
const SNIPPET_LEN: usize = 200;

#[derive(Clone, Debug)]
pub struct SummarizerConfig {
    pub ttl: Duration,
    pub model: Option<String>,
}

impl Default for SummarizerConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(24 * 60 * 60),
            model: None,
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct Summary {
    pub text: String,
    pub cached: bool,
}

struct CacheEntry {
    summary: String,
    created_at: Instant,
}

/// Reasoning-backed page summarizer with a TTL cache so repeated requests for
/// the same page content cost zero collaborator calls.
pub struct PageSummarizer {
    reasoning: Arc<dyn ReasoningClient>,
    config: SummarizerConfig,
    cache: DashMap<String, CacheEntry>,
}

impl PageSummarizer {
    pub fn new(reasoning: Arc<dyn ReasoningClient>, config: SummarizerConfig) -> Self {
        Self {
            reasoning,
            config,
            cache: DashMap::new(),
        }
    }

    pub async fn summarize(&self, url: &str, title: &str, text: &str) -> PilotResult<Summary> {
        let key = Self::cache_key(url, title, text);

        if let Some(entry) = self.cache.get(&key) {
            if entry.created_at.elapsed() < self.config.ttl {
                debug!(url, "summary cache hit");
                return Ok(Summary {
                    text: entry.summary.clone(),
                    cached: true,
                });
            }
        }
        self.cache.remove(&key);

        let body = format!("URL: {url}\nTitle: {title}\n\n{text}");
        let mut request = ChatRequest::new(SUMMARY_SYSTEM_PROMPT, vec![ChatMessage::user(body)]);
        if let Some(model) = &self.config.model {
            request = request.with_model(model.clone());
        }
        let summary = self.reasoning.complete(request).await?;

        self.cache.insert(
            key,
            CacheEntry {
                summary: summary.clone(),
                created_at: Instant::now(),
            },
        );
        Ok(Summary {
            text: summary,
            cached: false,
        })
    }

    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }

    fn cache_key(url: &str, title: &str, text: &str) -> String {
        let snippet: String = text.chars().take(SNIPPET_LEN).collect();
        let mut hasher = Sha256::new();
        hasher.update(url.as_bytes());
        hasher.update([0u8]);
        hasher.update(title.as_bytes());
        hasher.update([0u8]);
        hasher.update(snippet.as_bytes());
        format!("{:x}", hasher.finalize())
    }
}
