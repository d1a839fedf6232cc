//! `[provider]` configuration.

use std::time::Duration;

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct ProviderConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_cookie_url")]
    pub cookie_url: String,
    /// Per-call timeout, covering pool wait and the upstream request.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Maximum concurrent blocking provider calls.
    #[serde(default = "default_max_workers")]
    pub max_workers: usize,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_base_url() -> String {
    "https://query1.finance.yahoo.com".to_string()
}

fn default_cookie_url() -> String {
    "https://fc.yahoo.com".to_string()
}

fn default_timeout_ms() -> u64 {
    15_000
}

fn default_max_workers() -> usize {
    4
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36".to_string()
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            cookie_url: default_cookie_url(),
            timeout_ms: default_timeout_ms(),
            max_workers: default_max_workers(),
            user_agent: default_user_agent(),
        }
    }
}

impl ProviderConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}
