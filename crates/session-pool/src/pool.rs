use std::sync::Arc;
use std::time::Instant;

use browserpilot_core_types::{PageId, SessionId, UserId};
use dashmap::DashMap;
use parking_lot::RwLock;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout, Duration};
use tracing::{debug, info, warn};

use crate::engine::{BrowserEngine, PageContent};
use crate::errors::PoolError;
use crate::model::{
    LifeState, NavigateOptions, PageCtx, PoolConfig, SessionCtx, PER_PAGE_COST,
};

/// Bounded pool of browser contexts. Sessions are owned here exclusively;
/// executors borrow page ids and must not retain them past task completion.
pub struct SessionPool {
    engine: Arc<dyn BrowserEngine>,
    config: PoolConfig,
    sessions: DashMap<SessionId, Arc<RwLock<SessionCtx>>>,
    pages: DashMap<PageId, Arc<RwLock<PageCtx>>>,
    reaper: Mutex<Option<JoinHandle<()>>>,
}

impl SessionPool {
    pub fn new(engine: Arc<dyn BrowserEngine>, config: PoolConfig) -> Self {
        Self {
            engine,
            config,
            sessions: DashMap::new(),
            pages: DashMap::new(),
            reaper: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// Admit a new session, evicting the least-recently-used one first when
    /// the pool is at capacity.
    pub async fn create_session(
        &self,
        user_id: UserId,
        logical_id: impl Into<String>,
    ) -> Result<SessionId, PoolError> {
        while self.sessions.len() >= self.config.max_sessions {
            match self.least_recently_used() {
                Some(victim) => {
                    info!(session = %victim, "pool at capacity; evicting LRU session");
                    self.close_session(&victim).await?;
                }
                None => break,
            }
        }

        let (id, ctx) = SessionCtx::new(user_id, logical_id);
        self.engine.create_context(&id).await?;
        self.sessions.insert(id.clone(), Arc::new(RwLock::new(ctx)));
        debug!(session = %id, live = self.sessions.len(), "session created");
        Ok(id)
    }

    pub async fn create_page(&self, session: &SessionId) -> Result<PageId, PoolError> {
        let ctx = self.ensure_session(session)?;
        let (page_id, mut page_ctx) = PageCtx::new(session.clone());
        self.engine.open_page(session, &page_id).await?;
        page_ctx.state = LifeState::Ready;
        self.pages
            .insert(page_id.clone(), Arc::new(RwLock::new(page_ctx)));
        {
            let mut guard = ctx.write();
            guard.page_count += 1;
            guard.approx_memory_bytes += PER_PAGE_COST;
            guard.touch();
        }
        Ok(page_id)
    }

    /// Navigate with bounded retries. Each attempt waits for the document
    /// body with its own short timeout, independent of the navigation
    /// deadline; between attempts the pool backs off `2^attempt` seconds.
    pub async fn navigate(
        &self,
        page: &PageId,
        url: &str,
        opts: &NavigateOptions,
    ) -> Result<(), PoolError> {
        self.validate_url(url)?;
        let page_ctx = self.ensure_page(page)?;
        let deadline = opts.timeout.unwrap_or(self.config.navigate_timeout);

        let mut last_error = String::new();
        for attempt in 1..=self.config.navigate_retries {
            match self.engine.navigate(page, url, deadline).await {
                Ok(()) => {
                    match timeout(
                        self.config.body_wait,
                        self.engine.wait_for_body(page, self.config.body_wait),
                    )
                    .await
                    {
                        Ok(Ok(())) => {}
                        Ok(Err(err)) => warn!(page = %page, url, "body wait failed: {}", err),
                        Err(_) => warn!(page = %page, url, "body wait timed out"),
                    }
                    {
                        let mut guard = page_ctx.write();
                        guard.url = Some(url.to_string());
                        guard.state = LifeState::Active;
                        guard.last_active_at = Instant::now();
                    }
                    self.touch_session_of(page);
                    return Ok(());
                }
                Err(err) => {
                    last_error = err.to_string();
                    warn!(page = %page, url, attempt, "navigation attempt failed: {}", err);
                    if attempt < self.config.navigate_retries {
                        sleep(Duration::from_secs(1 << attempt)).await;
                    }
                }
            }
        }

        Err(PoolError::NavigationFailed {
            url: url.to_string(),
            attempts: self.config.navigate_retries,
            last_error,
        })
    }

    pub async fn content(&self, page: &PageId) -> Result<PageContent, PoolError> {
        let page_ctx = self.ensure_page(page)?;
        let content = self.engine.content(page).await?;
        {
            let mut guard = page_ctx.write();
            guard.title = Some(content.title.clone());
            guard.last_active_at = Instant::now();
        }
        self.touch_session_of(page);
        Ok(content)
    }

    pub async fn evaluate(
        &self,
        page: &PageId,
        expression: &str,
    ) -> Result<serde_json::Value, PoolError> {
        self.ensure_page(page)?;
        let value = self.engine.evaluate(page, expression).await?;
        self.touch_session_of(page);
        Ok(value)
    }

    pub async fn screenshot(&self, page: &PageId) -> Result<Vec<u8>, PoolError> {
        self.ensure_page(page)?;
        let bytes = self.engine.screenshot(page).await?;
        self.touch_session_of(page);
        Ok(bytes)
    }

    pub async fn close_session(&self, session: &SessionId) -> Result<(), PoolError> {
        let Some((_, ctx)) = self.sessions.remove(session) else {
            return Ok(());
        };
        ctx.write().state = LifeState::Closing;

        let child_pages: Vec<PageId> = self
            .pages
            .iter()
            .filter(|entry| entry.value().read().session == *session)
            .map(|entry| entry.key().clone())
            .collect();
        for page in child_pages {
            self.pages.remove(&page);
            if let Err(err) = self.engine.close_page(&page).await {
                warn!(page = %page, "failed to close page during session teardown: {}", err);
            }
        }

        if let Err(err) = self.engine.close_context(session).await {
            warn!(session = %session, "engine close_context failed: {}", err);
        }
        debug!(session = %session, live = self.sessions.len(), "session closed");
        Ok(())
    }

    pub fn live_sessions(&self) -> Vec<SessionCtx> {
        self.sessions
            .iter()
            .map(|entry| entry.value().read().clone())
            .collect()
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Start the background sweep that closes sessions idle longer than the
    /// configured threshold, regardless of pool pressure. Idempotent.
    pub async fn spawn_reaper(self: &Arc<Self>) {
        let mut guard = self.reaper.lock().await;
        if guard.is_some() {
            return;
        }
        let pool = Arc::clone(self);
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(pool.config.sweep_interval);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                pool.reap_idle().await;
            }
        });
        *guard = Some(handle);
    }

    pub async fn reap_idle(&self) {
        let idle: Vec<SessionId> = self
            .sessions
            .iter()
            .filter(|entry| entry.value().read().idle_for() >= self.config.idle_timeout)
            .map(|entry| entry.key().clone())
            .collect();
        for session in idle {
            info!(session = %session, "reaping idle session");
            if let Err(err) = self.close_session(&session).await {
                warn!(session = %session, "idle reap failed: {}", err);
            }
        }
    }

    pub async fn shutdown(&self) {
        if let Some(handle) = self.reaper.lock().await.take() {
            handle.abort();
        }
        let all: Vec<SessionId> = self.sessions.iter().map(|e| e.key().clone()).collect();
        for session in all {
            let _ = self.close_session(&session).await;
        }
    }

    fn validate_url(&self, raw: &str) -> Result<(), PoolError> {
        let parsed = url::Url::parse(raw)
            .map_err(|e| PoolError::Blocked(format!("unparseable URL '{}': {}", raw, e)))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(PoolError::Blocked(format!(
                "disallowed URL scheme '{}'",
                parsed.scheme()
            )));
        }
        if let Some(host) = parsed.host_str() {
            for blocked in &self.config.blocked_domains {
                if host == blocked || host.ends_with(&format!(".{}", blocked)) {
                    return Err(PoolError::Blocked(format!("blocked domain '{}'", host)));
                }
            }
        }
        Ok(())
    }

    fn least_recently_used(&self) -> Option<SessionId> {
        let mut selected: Option<(SessionId, Instant)> = None;
        for entry in self.sessions.iter() {
            let last_used = entry.value().read().last_used;
            match &selected {
                Some((_, ts)) if last_used >= *ts => {}
                _ => selected = Some((entry.key().clone(), last_used)),
            }
        }
        selected.map(|(id, _)| id)
    }

    fn ensure_session(&self, session: &SessionId) -> Result<Arc<RwLock<SessionCtx>>, PoolError> {
        self.sessions
            .get(session)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| PoolError::SessionNotFound(session.0.clone()))
    }

    fn ensure_page(&self, page: &PageId) -> Result<Arc<RwLock<PageCtx>>, PoolError> {
        self.pages
            .get(page)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| PoolError::PageNotFound(page.0.clone()))
    }

    fn touch_session_of(&self, page: &PageId) {
        let session = self
            .pages
            .get(page)
            .map(|entry| entry.value().read().session.clone());
        if let Some(session) = session {
            if let Some(entry) = self.sessions.get(&session) {
                entry.value().write().touch();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::StubEngine;

    fn pool_with_capacity(max: usize) -> Arc<SessionPool> {
        let config = PoolConfig {
            max_sessions: max,
            ..PoolConfig::default()
        };
        Arc::new(SessionPool::new(Arc::new(StubEngine::new()), config))
    }

    #[tokio::test]
    async fn capacity_is_enforced_with_lru_eviction() {
        let pool = pool_with_capacity(3);
        let user = UserId::from("u1");

        let first = pool.create_session(user.clone(), "conv").await.unwrap();
        tokio::time::sleep(Duration::from_millis(2)).await;
        let second = pool.create_session(user.clone(), "conv").await.unwrap();
        tokio::time::sleep(Duration::from_millis(2)).await;
        let third = pool.create_session(user.clone(), "conv").await.unwrap();
        tokio::time::sleep(Duration::from_millis(2)).await;

        // Touch the oldest so the second-oldest becomes the LRU victim.
        let page = pool.create_page(&first).await.unwrap();
        pool.navigate(&page, "https://example.com", &NavigateOptions::default())
            .await
            .unwrap();

        let fourth = pool.create_session(user.clone(), "conv").await.unwrap();

        assert_eq!(pool.session_count(), 3);
        let live: Vec<SessionId> = pool.live_sessions().into_iter().map(|s| s.id).collect();
        assert!(live.contains(&first));
        assert!(!live.contains(&second), "LRU session should be evicted");
        assert!(live.contains(&third));
        assert!(live.contains(&fourth));
    }

    #[tokio::test]
    async fn eviction_closes_child_pages() {
        let pool = pool_with_capacity(1);
        let user = UserId::from("u1");
        let session = pool.create_session(user.clone(), "conv").await.unwrap();
        let page = pool.create_page(&session).await.unwrap();

        let _replacement = pool.create_session(user, "conv").await.unwrap();
        assert_eq!(pool.session_count(), 1);
        assert!(pool.content(&page).await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn navigation_retries_then_surfaces_failure() {
        let pool = pool_with_capacity(2);
        let session = pool
            .create_session(UserId::from("u1"), "conv")
            .await
            .unwrap();
        let page = pool.create_page(&session).await.unwrap();

        let err = pool
            .navigate(
                &page,
                "https://unreachable.invalid",
                &NavigateOptions::default(),
            )
            .await
            .unwrap_err();
        match err {
            PoolError::NavigationFailed { attempts, .. } => assert_eq!(attempts, 3),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn disallowed_schemes_are_blocked_without_engine_calls() {
        let pool = pool_with_capacity(2);
        let session = pool
            .create_session(UserId::from("u1"), "conv")
            .await
            .unwrap();
        let page = pool.create_page(&session).await.unwrap();

        let err = pool
            .navigate(&page, "file:///etc/passwd", &NavigateOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, PoolError::Blocked(_)));
    }

    #[tokio::test]
    async fn blocked_domains_are_rejected() {
        let config = PoolConfig {
            blocked_domains: vec!["evil.test".to_string()],
            ..PoolConfig::default()
        };
        let pool = Arc::new(SessionPool::new(Arc::new(StubEngine::new()), config));
        let session = pool
            .create_session(UserId::from("u1"), "conv")
            .await
            .unwrap();
        let page = pool.create_page(&session).await.unwrap();

        for url in ["https://evil.test/x", "https://sub.evil.test/x"] {
            let err = pool
                .navigate(&page, url, &NavigateOptions::default())
                .await
                .unwrap_err();
            assert!(matches!(err, PoolError::Blocked(_)), "{url}");
        }
    }

    #[tokio::test]
    async fn idle_sessions_are_reaped() {
        let config = PoolConfig {
            idle_timeout: Duration::from_millis(0),
            ..PoolConfig::default()
        };
        let pool = Arc::new(SessionPool::new(Arc::new(StubEngine::new()), config));
        pool.create_session(UserId::from("u1"), "conv").await.unwrap();
        pool.create_session(UserId::from("u1"), "conv").await.unwrap();

        pool.reap_idle().await;
        assert_eq!(pool.session_count(), 0);
    }

    #[tokio::test]
    async fn content_refreshes_last_used() {
        let pool = pool_with_capacity(2);
        let session = pool
            .create_session(UserId::from("u1"), "conv")
            .await
            .unwrap();
        let page = pool.create_page(&session).await.unwrap();
        pool.navigate(&page, "https://example.com", &NavigateOptions::default())
            .await
            .unwrap();

        let before = pool.live_sessions()[0].last_used;
        tokio::time::sleep(Duration::from_millis(5)).await;
        pool.content(&page).await.unwrap();
        let after = pool.live_sessions()[0].last_used;
        assert!(after > before);
    }
}
