use std::time::Duration;

use async_trait::async_trait;
use browserpilot_core_types::{PageId, SessionId};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::errors::PoolError;

/// Snapshot of a rendered page.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PageContent {
    pub url: String,
    pub title: String,
    pub html: String,
    pub text: String,
}

/// Minimal browser capability surface required by the pool and executors.
/// All operations are fallible I/O; implementations decide what "browser"
/// means (real CDP transport, remote grid, or the in-process stub).
#[async_trait]
pub trait BrowserEngine: Send + Sync {
    async fn create_context(&self, session: &SessionId) -> Result<(), PoolError>;
    async fn open_page(&self, session: &SessionId, page: &PageId) -> Result<(), PoolError>;
    async fn navigate(
        &self,
        page: &PageId,
        url: &str,
        deadline: Duration,
    ) -> Result<(), PoolError>;
    /// Wait for a minimal structural marker (document body present).
    async fn wait_for_body(&self, page: &PageId, deadline: Duration) -> Result<(), PoolError>;
    async fn content(&self, page: &PageId) -> Result<PageContent, PoolError>;
    async fn evaluate(&self, page: &PageId, expression: &str) -> Result<Value, PoolError>;
    async fn screenshot(&self, page: &PageId) -> Result<Vec<u8>, PoolError>;
    async fn close_page(&self, page: &PageId) -> Result<(), PoolError>;
    async fn close_context(&self, session: &SessionId) -> Result<(), PoolError>;
}

/// Deterministic in-process engine used for tests and engine-less bring-up.
/// Pages remember the last navigated URL and serve canned content.
#[derive(Default)]
pub struct StubEngine {
    pages: DashMap<PageId, String>,
    canned: DashMap<String, PageContent>,
    canned_eval: DashMap<String, Value>,
}

impl StubEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register fixed content for a URL prefix.
    pub fn stub_content(&self, url_prefix: impl Into<String>, content: PageContent) {
        self.canned.insert(url_prefix.into(), content);
    }

    /// Register a fixed evaluation result for a URL prefix.
    pub fn stub_eval(&self, url_prefix: impl Into<String>, value: Value) {
        self.canned_eval.insert(url_prefix.into(), value);
    }

    fn current_url(&self, page: &PageId) -> Result<String, PoolError> {
        self.pages
            .get(page)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| PoolError::PageNotFound(page.0.clone()))
    }
}

#[async_trait]
impl BrowserEngine for StubEngine {
    async fn create_context(&self, _session: &SessionId) -> Result<(), PoolError> {
        Ok(())
    }

    async fn open_page(&self, _session: &SessionId, page: &PageId) -> Result<(), PoolError> {
        self.pages.insert(page.clone(), "about:blank".to_string());
        Ok(())
    }

    async fn navigate(
        &self,
        page: &PageId,
        url: &str,
        _deadline: Duration,
    ) -> Result<(), PoolError> {
        if !self.pages.contains_key(page) {
            return Err(PoolError::PageNotFound(page.0.clone()));
        }
        if url.contains("unreachable") {
            return Err(PoolError::Engine(format!("connection refused: {}", url)));
        }
        self.pages.insert(page.clone(), url.to_string());
        Ok(())
    }

    async fn wait_for_body(&self, page: &PageId, _deadline: Duration) -> Result<(), PoolError> {
        self.current_url(page).map(|_| ())
    }

    async fn content(&self, page: &PageId) -> Result<PageContent, PoolError> {
        let url = self.current_url(page)?;
        for entry in self.canned.iter() {
            if url.starts_with(entry.key()) {
                return Ok(entry.value().clone());
            }
        }
        Ok(PageContent {
            url: url.clone(),
            title: format!("Stub page for {}", url),
            html: format!("<html><body><p>stub content for {}</p></body></html>", url),
            text: format!("stub content for {}", url),
        })
    }

    async fn evaluate(&self, page: &PageId, _expression: &str) -> Result<Value, PoolError> {
        let url = self.current_url(page)?;
        for entry in self.canned_eval.iter() {
            if url.starts_with(entry.key()) {
                return Ok(entry.value().clone());
            }
        }
        Ok(json!(null))
    }

    async fn screenshot(&self, page: &PageId) -> Result<Vec<u8>, PoolError> {
        self.current_url(page)?;
        // 1x1 transparent PNG header stand-in.
        Ok(vec![0x89, b'P', b'N', b'G'])
    }

    async fn close_page(&self, page: &PageId) -> Result<(), PoolError> {
        self.pages.remove(page);
        Ok(())
    }

    async fn close_context(&self, _session: &SessionId) -> Result<(), PoolError> {
        Ok(())
    }
}
