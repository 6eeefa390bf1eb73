//! Outgoing webhook delivery configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Settings for outgoing webhook requests
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryConfig {
    /// Per-task timeout in seconds when the enqueue request names none
    #[serde(default = "default_timeout_secs")]
    pub default_timeout_secs: u32,
    /// Request headers carrying this prefix are forwarded to the webhook
    /// with the prefix stripped
    #[serde(default = "default_proxy_header_prefix")]
    pub proxy_header_prefix: String,
    /// TCP connect timeout in milliseconds
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    /// User agent presented to webhooks
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

const fn default_timeout_secs() -> u32 {
    20
}

fn default_proxy_header_prefix() -> String {
    "x-hook-".to_string()
}

const fn default_connect_timeout_ms() -> u64 {
    10_000
}

fn default_user_agent() -> String {
    format!("WebhookQ/{}", env!("CARGO_PKG_VERSION"))
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            default_timeout_secs: default_timeout_secs(),
            proxy_header_prefix: default_proxy_header_prefix(),
            connect_timeout_ms: default_connect_timeout_ms(),
            user_agent: default_user_agent(),
        }
    }
}

impl DeliveryConfig {
    /// The connect timeout as a duration
    #[must_use]
    pub const fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = DeliveryConfig::default();
        assert_eq!(config.default_timeout_secs, 20);
        assert_eq!(config.proxy_header_prefix, "x-hook-");
        assert_eq!(config.connect_timeout(), Duration::from_secs(10));
        assert!(config.user_agent.starts_with("WebhookQ/"));
    }
}
