//! Reasoning-service collaborator.
//!
//! The core never assumes the reply is well-formed JSON; every call site owns
//! a degrade-to-default path. This crate only carries the transport.

mod client;
mod model;

pub use client::{validate_base_url, OpenAiCompatClient, ReasoningConfig};
pub use model::{ChatMessage, ChatRequest, Role};

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use browserpilot_core_types::{PilotError, PilotResult, ReasoningFailure};

/// Abstraction over LLM-backed reasoning so multiple vendors can plug in.
#[async_trait]
pub trait ReasoningClient: Send + Sync {
    /// Send one chat-style request and return the raw reply text.
    async fn complete(&self, request: ChatRequest) -> PilotResult<String>;
}

/// Deterministic client used for tests and offline development. Counts calls
/// so tests can assert that a cache hit skipped the collaborator entirely.
#[derive(Debug, Default, Clone)]
pub struct MockReasoningClient {
    reply: Option<String>,
    scripted: Arc<Mutex<VecDeque<String>>>,
    fail: bool,
    calls: Arc<AtomicUsize>,
}

impl MockReasoningClient {
    pub fn with_reply(reply: impl Into<String>) -> Self {
        Self {
            reply: Some(reply.into()),
            ..Self::default()
        }
    }

    /// Replies served in order, one per call; falls back to the fixed reply
    /// (or the echo default) once exhausted.
    pub fn with_replies<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            scripted: Arc::new(Mutex::new(
                replies.into_iter().map(Into::into).collect(),
            )),
            ..Self::default()
        }
    }

    /// A client whose every call fails with a generic reasoning error.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ReasoningClient for MockReasoningClient {
    async fn complete(&self, request: ChatRequest) -> PilotResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(PilotError::Reasoning {
                kind: ReasoningFailure::Other,
                message: "mock reasoning failure".to_string(),
            });
        }
        if let Some(next) = self.scripted.lock().ok().and_then(|mut q| q.pop_front()) {
            return Ok(next);
        }
        Ok(self.reply.clone().unwrap_or_else(|| {
            format!(
                "{{\"echo\": {}}}",
                serde_json::to_string(&request.last_user_text().unwrap_or_default())
                    .unwrap_or_else(|_| "\"\"".to_string())
            )
        }))
    }
}
