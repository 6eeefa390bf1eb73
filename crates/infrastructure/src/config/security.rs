//! Security configuration

use serde::{Deserialize, Serialize};

/// Authentication settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    /// Require a valid API key on every request
    ///
    /// When false, all requests run as the bootstrap application so tasks
    /// still have an owning app and a synthesizable access decision.
    #[serde(default)]
    pub require_auth: bool,
    /// Name of the application created at startup when none exists
    #[serde(default = "default_bootstrap_app")]
    pub bootstrap_app: String,
}

fn default_bootstrap_app() -> String {
    "default".to_string()
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            require_auth: false,
            bootstrap_app: default_bootstrap_app(),
        }
    }
}
