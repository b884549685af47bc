use std::collections::VecDeque;

use browserpilot_core_types::{TaskResult, UserId};
use dashmap::DashMap;

pub const DEFAULT_HISTORY_CAP: usize = 100;

/// Per-user bounded result ring. Eviction is strictly FIFO; recency of
/// insertion is the only criterion.
pub struct HistoryStore {
    cap: usize,
    inner: DashMap<UserId, VecDeque<TaskResult>>,
}

impl Default for HistoryStore {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAP)
    }
}

impl HistoryStore {
    pub fn new(cap: usize) -> Self {
        Self {
            cap: cap.max(1),
            inner: DashMap::new(),
        }
    }

    pub fn record(&self, user: &UserId, result: TaskResult) {
        let mut ring = self.inner.entry(user.clone()).or_default();
        if ring.len() == self.cap {
            ring.pop_front();
        }
        ring.push_back(result);
    }

    /// Results for one user, oldest first.
    pub fn for_user(&self, user: &UserId) -> Vec<TaskResult> {
        self.inner
            .get(user)
            .map(|ring| ring.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn len_for(&self, user: &UserId) -> usize {
        self.inner.get(user).map(|ring| ring.len()).unwrap_or(0)
    }
}
