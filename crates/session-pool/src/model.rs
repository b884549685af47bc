use std::time::{Duration, Instant};

use browserpilot_core_types::{PageId, SessionId, UserId};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum LifeState {
    Init,
    Ready,
    Active,
    Closing,
}

/// One pooled browser context.
#[derive(Clone, Debug)]
pub struct SessionCtx {
    pub id: SessionId,
    pub user_id: UserId,
    /// Logical conversation the session belongs to; several goals may share it.
    pub logical_id: String,
    pub created_at: Instant,
    pub last_used: Instant,
    pub page_count: usize,
    /// Rough per-session memory estimate used for introspection only.
    pub approx_memory_bytes: u64,
    pub state: LifeState,
}

impl SessionCtx {
    pub fn new(user_id: UserId, logical_id: impl Into<String>) -> (SessionId, Self) {
        let id = SessionId::new();
        let now = Instant::now();
        let ctx = Self {
            id: id.clone(),
            user_id,
            logical_id: logical_id.into(),
            created_at: now,
            last_used: now,
            page_count: 0,
            approx_memory_bytes: BASE_SESSION_COST,
            state: LifeState::Ready,
        };
        (id, ctx)
    }

    pub fn touch(&mut self) {
        self.last_used = Instant::now();
    }

    pub fn idle_for(&self) -> Duration {
        self.last_used.elapsed()
    }
}

// Rough cost model: an empty context plus a per-page increment.
pub const BASE_SESSION_COST: u64 = 12 * 1024 * 1024;
pub const PER_PAGE_COST: u64 = 8 * 1024 * 1024;

#[derive(Clone, Debug)]
pub struct PageCtx {
    pub id: PageId,
    pub session: SessionId,
    pub url: Option<String>,
    pub title: Option<String>,
    pub last_active_at: Instant,
    pub state: LifeState,
}

impl PageCtx {
    pub fn new(session: SessionId) -> (PageId, Self) {
        let id = PageId::new();
        let ctx = Self {
            id: id.clone(),
            session,
            url: None,
            title: None,
            last_active_at: Instant::now(),
            state: LifeState::Init,
        };
        (id, ctx)
    }
}

#[derive(Clone, Debug)]
pub struct PoolConfig {
    /// Hard cap on concurrent sessions; admission past this evicts the LRU.
    pub max_sessions: usize,
    pub idle_timeout: Duration,
    pub sweep_interval: Duration,
    pub navigate_retries: u32,
    /// Per-attempt wait for the document body, independent of the overall
    /// navigation timeout.
    pub body_wait: Duration,
    pub navigate_timeout: Duration,
    pub blocked_domains: Vec<String>,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_sessions: 5,
            idle_timeout: Duration::from_secs(30 * 60),
            sweep_interval: Duration::from_secs(5 * 60),
            navigate_retries: 3,
            body_wait: Duration::from_secs(3),
            navigate_timeout: Duration::from_secs(30),
            blocked_domains: Vec::new(),
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct NavigateOptions {
    /// Override the pool-level navigation timeout for this call.
    pub timeout: Option<Duration>,
}
