//! Infrastructure layer - Adapters for persistence, brokering and delivery
//!
//! Implements the application-layer ports: SQLite task and application
//! stores (sqlx), in-memory and durable instruction brokers, the reqwest
//! webhook client, and configuration loading.

pub mod broker;
pub mod config;
pub mod persistence;
pub mod webhook;

pub use broker::{MemoryBroker, SqliteBroker};
pub use config::{
    AppConfig, BrokerSelection, DatabaseConfig, DeliveryConfig, ScannerConfig, SecurityConfig,
    ServerConfig, WorkerConfig,
};
pub use persistence::{AsyncDatabase, SqliteApplicationStore, SqliteTaskStore};
pub use webhook::WebhookClient;
