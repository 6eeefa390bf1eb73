//! Persistence layer
//!
//! Async SQLite access through sqlx: the task store, the application and
//! API key store, and the shared connection pool with embedded schema.

mod application_store;
mod async_connection;
mod error;
mod task_store;

pub use application_store::SqliteApplicationStore;
pub use async_connection::{AsyncDatabase, AsyncDatabaseError};
pub use error::map_sqlx_error;
pub use task_store::SqliteTaskStore;
