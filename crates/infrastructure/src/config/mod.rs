//! Application configuration
//!
//! Split into focused sub-modules by domain:
//! - `server`: HTTP server settings
//! - `database`: SQLite database settings
//! - `worker`: worker pool, polling backoff and due scanner
//! - `delivery`: outgoing webhook requests
//! - `security`: API key authentication
//!
//! Loaded from defaults, an optional `config.toml`, and `WEBHOOKQ_`-prefixed
//! environment variables, in that order of precedence.

mod database;
mod delivery;
mod security;
mod server;
mod worker;

use serde::{Deserialize, Serialize};

pub use database::DatabaseConfig;
pub use delivery::DeliveryConfig;
pub use security::SecurityConfig;
pub use server::ServerConfig;
pub use worker::{ScannerConfig, WorkerConfig};

/// Shared default for boolean `true` fields across config structs
pub(crate) const fn default_true() -> bool {
    true
}

/// Which instruction broker implementation to run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BrokerSelection {
    /// Durable queue in the task database (default)
    #[default]
    Sqlite,
    /// In-process FIFO; lost on restart, recovered by the due scanner
    Memory,
}

impl std::fmt::Display for BrokerSelection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite => write!(f, "sqlite"),
            Self::Memory => write!(f, "memory"),
        }
    }
}

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Instruction broker selection
    #[serde(default)]
    pub broker: BrokerSelection,

    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Database configuration
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Worker pool and polling configuration
    #[serde(default)]
    pub worker: WorkerConfig,

    /// Due scanner configuration
    #[serde(default)]
    pub scanner: ScannerConfig,

    /// Outgoing webhook delivery configuration
    #[serde(default)]
    pub delivery: DeliveryConfig,

    /// Security configuration
    #[serde(default)]
    pub security: SecurityConfig,
}

impl AppConfig {
    /// Load configuration from environment and optional file
    pub fn load() -> Result<Self, config::ConfigError> {
        let builder = config::Config::builder()
            // Start with defaults
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8090)?
            // Load from file if exists
            .add_source(config::File::with_name("config").required(false))
            // Override with environment variables (e.g., WEBHOOKQ_SERVER_PORT)
            .add_source(
                config::Environment::with_prefix("WEBHOOKQ")
                    .separator("_")
                    .try_parsing(true),
            );

        let config = builder.build()?;
        config.try_deserialize()
    }
}
