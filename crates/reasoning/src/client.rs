use std::time::Duration;

use async_trait::async_trait;
use browserpilot_core_types::{PilotError, PilotResult, ReasoningFailure};
use reqwest::Client;
use serde_json::{json, Value};
use tracing::{debug, error, warn};

use crate::{ChatRequest, ReasoningClient, Role};

#[derive(Clone, Debug)]
pub struct ReasoningConfig {
    pub base_url: String,
    pub api_key: String,
    pub request_timeout: Duration,
}

impl Default for ReasoningConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            api_key: String::new(),
            request_timeout: Duration::from_secs(120),
        }
    }
}

/// Validate the reasoning endpoint URL. HTTPS is required for remote hosts so
/// the API key is never sent in cleartext; HTTP is allowed only for localhost.
pub fn validate_base_url(base_url: &str) -> Result<(), String> {
    let parsed = url::Url::parse(base_url)
        .map_err(|e| format!("invalid base_url '{}': {}", base_url, e))?;
    let host = parsed.host_str().unwrap_or("");
    match parsed.scheme() {
        "https" => Ok(()),
        "http" => {
            let is_localhost =
                host == "localhost" || host == "127.0.0.1" || host == "[::1]" || host == "::1";
            if is_localhost {
                warn!(base_url, "using unencrypted HTTP for local reasoning endpoint");
                Ok(())
            } else {
                Err(format!(
                    "HTTP is not allowed for remote reasoning endpoints ('{}'); use HTTPS",
                    base_url
                ))
            }
        }
        other => Err(format!("unsupported URL scheme '{}'", other)),
    }
}

/// OpenAI-compatible `/chat/completions` client.
pub struct OpenAiCompatClient {
    client: Client,
    config: ReasoningConfig,
}

impl OpenAiCompatClient {
    pub fn new(config: ReasoningConfig) -> PilotResult<Self> {
        validate_base_url(&config.base_url).map_err(PilotError::Security)?;
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| {
                PilotError::reasoning(
                    ReasoningFailure::Other,
                    format!("failed to build HTTP client: {}", e),
                )
            })?;
        Ok(Self {
            client,
            config: ReasoningConfig {
                base_url: config.base_url.trim_end_matches('/').to_string(),
                ..config
            },
        })
    }

    fn classify_status(status: u16, body: &str) -> PilotError {
        let kind = match status {
            429 => ReasoningFailure::RateLimited,
            401 | 403 => ReasoningFailure::Auth,
            _ => ReasoningFailure::Other,
        };
        // Body is truncated so upstream stack dumps never reach callers.
        let summary: String = body.chars().take(200).collect();
        PilotError::reasoning(kind, format!("upstream returned {}: {}", status, summary))
    }
}

#[async_trait]
impl ReasoningClient for OpenAiCompatClient {
    async fn complete(&self, request: ChatRequest) -> PilotResult<String> {
        let mut messages = vec![json!({"role": "system", "content": request.system})];
        for message in &request.messages {
            let role = match message.role {
                Role::System => "system",
                Role::User => "user",
                Role::Assistant => "assistant",
            };
            messages.push(json!({"role": role, "content": message.content}));
        }

        let body = json!({
            "model": request.model,
            "messages": messages,
            "max_tokens": request.max_tokens,
            "temperature": request.temperature,
        });

        let url = format!("{}/chat/completions", self.config.base_url);
        debug!(model = %request.model, url = %url, "calling reasoning service");

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                error!("reasoning request failed: {}", e);
                PilotError::reasoning(ReasoningFailure::Other, format!("transport error: {}", e))
            })?;

        let status = response.status();
        let text = response.text().await.map_err(|e| {
            PilotError::reasoning(ReasoningFailure::Other, format!("body read error: {}", e))
        })?;

        if !status.is_success() {
            return Err(Self::classify_status(status.as_u16(), &text));
        }

        let data: Value = serde_json::from_str(&text).map_err(|e| {
            PilotError::reasoning(ReasoningFailure::Other, format!("malformed envelope: {}", e))
        })?;
        let content = data["choices"]
            .get(0)
            .and_then(|choice| choice["message"]["content"].as_str())
            .ok_or_else(|| {
                PilotError::reasoning(ReasoningFailure::Other, "no choices in response")
            })?;

        Ok(content.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn https_accepted() {
        assert!(validate_base_url("https://api.openai.com/v1").is_ok());
    }

    #[test]
    fn http_localhost_accepted() {
        assert!(validate_base_url("http://localhost:11434/v1").is_ok());
        assert!(validate_base_url("http://127.0.0.1:1234").is_ok());
    }

    #[test]
    fn http_remote_rejected() {
        let err = validate_base_url("http://api.example.com").unwrap_err();
        assert!(err.contains("HTTP is not allowed"));
    }

    #[test]
    fn odd_schemes_rejected() {
        assert!(validate_base_url("ftp://example.com").is_err());
        assert!(validate_base_url("not a url").is_err());
    }

    #[test]
    fn status_classification() {
        assert!(matches!(
            OpenAiCompatClient::classify_status(429, "slow down"),
            PilotError::Reasoning {
                kind: ReasoningFailure::RateLimited,
                ..
            }
        ));
        assert!(matches!(
            OpenAiCompatClient::classify_status(401, "bad key"),
            PilotError::Reasoning {
                kind: ReasoningFailure::Auth,
                ..
            }
        ));
        assert!(matches!(
            OpenAiCompatClient::classify_status(500, "boom"),
            PilotError::Reasoning {
                kind: ReasoningFailure::Other,
                ..
            }
        ));
    }
}
