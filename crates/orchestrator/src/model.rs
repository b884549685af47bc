use std::collections::HashMap;
use std::time::Duration;

use browserpilot_core_types::UserId;
use serde_json::Value;

/// Per-executor execution discipline.
#[derive(Clone, Debug)]
pub struct ExecutorConfig {
    /// Orchestrator-level timeout racing the executor's work.
    pub timeout: Duration,
    /// Attempts before MAX_RETRIES_EXCEEDED; only transient failures retry.
    pub max_retries: u32,
    /// Concurrency ceiling for batch chunks.
    pub concurrency: usize,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            max_retries: 3,
            concurrency: 3,
        }
    }
}

/// Caller-scoped context threaded through every execution.
#[derive(Clone, Debug)]
pub struct ExecutionContext {
    pub user_id: UserId,
    /// Logical conversation the work belongs to; sessions are keyed by it.
    pub conversation_id: String,
    pub metadata: HashMap<String, Value>,
}

impl ExecutionContext {
    pub fn new(user_id: UserId, conversation_id: impl Into<String>) -> Self {
        Self {
            user_id,
            conversation_id: conversation_id.into(),
            metadata: HashMap::new(),
        }
    }
}
