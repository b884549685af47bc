//! Application configuration: defaults, optional JSON file, environment
//! overrides, in that order.

use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use browserpilot_session_pool::PoolConfig;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8788,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolSettings {
    pub max_sessions: usize,
    pub idle_timeout_secs: u64,
    pub sweep_interval_secs: u64,
    pub navigate_retries: u32,
    pub blocked_domains: Vec<String>,
}

impl Default for PoolSettings {
    fn default() -> Self {
        let defaults = PoolConfig::default();
        Self {
            max_sessions: defaults.max_sessions,
            idle_timeout_secs: defaults.idle_timeout.as_secs(),
            sweep_interval_secs: defaults.sweep_interval.as_secs(),
            navigate_retries: defaults.navigate_retries,
            blocked_domains: Vec::new(),
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ReasoningSettings {
    /// OpenAI-compatible endpoint; when unset the service runs with the
    /// offline mock client.
    pub base_url: Option<String>,
    /// Usually injected via BROWSERPILOT_REASONING_API_KEY, never the file.
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub model: Option<String>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub pool: PoolSettings,
    pub reasoning: ReasoningSettings,
}

impl AppConfig {
    /// Defaults, then the JSON file (when given), then `BROWSERPILOT_*`
    /// environment variables.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let mut config = match path {
            Some(path) => {
                let raw = std::fs::read_to_string(path)
                    .with_context(|| format!("reading config file {}", path.display()))?;
                serde_json::from_str(&raw)
                    .with_context(|| format!("parsing config file {}", path.display()))?
            }
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Environment overrides through an injectable lookup, so tests never
    /// touch the process environment.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("BROWSERPILOT_HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("BROWSERPILOT_PORT").and_then(|v| v.parse().ok()) {
            self.server.port = port;
        }
        if let Some(max) = lookup("BROWSERPILOT_MAX_SESSIONS").and_then(|v| v.parse().ok()) {
            self.pool.max_sessions = max;
        }
        if let Some(domains) = lookup("BROWSERPILOT_BLOCKED_DOMAINS") {
            self.pool.blocked_domains = domains
                .split(',')
                .map(|d| d.trim().to_string())
                .filter(|d| !d.is_empty())
                .collect();
        }
        if let Some(url) = lookup("BROWSERPILOT_REASONING_BASE_URL") {
            self.reasoning.base_url = Some(url);
        }
        if let Some(key) = lookup("BROWSERPILOT_REASONING_API_KEY") {
            self.reasoning.api_key = Some(key);
        }
        if let Some(model) = lookup("BROWSERPILOT_MODEL") {
            self.reasoning.model = Some(model);
        }
    }

    pub fn pool_config(&self) -> PoolConfig {
        PoolConfig {
            max_sessions: self.pool.max_sessions,
            idle_timeout: Duration::from_secs(self.pool.idle_timeout_secs),
            sweep_interval: Duration::from_secs(self.pool.sweep_interval_secs),
            navigate_retries: self.pool.navigate_retries,
            blocked_domains: self.pool.blocked_domains.clone(),
            ..PoolConfig::default()
        }
    }
}
