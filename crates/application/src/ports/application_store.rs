//! Application store port
//!
//! Ordinary CRUD over applications and their API keys. Only the pieces the
//! authorization path needs are surfaced here.

use async_trait::async_trait;
use domain::{ApiKey, AppId, Application};
#[cfg(test)]
use mockall::automock;

use crate::error::ApplicationError;

/// Port for application and API key persistence
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ApplicationStore: Send + Sync {
    /// Create an application with one freshly generated active key
    async fn create(&self, name: &str) -> Result<(Application, ApiKey), ApplicationError>;

    /// Fetch an application by id
    async fn get(&self, id: AppId) -> Result<Option<Application>, ApplicationError>;

    /// Fetch an application by name
    async fn find_by_name(&self, name: &str) -> Result<Option<Application>, ApplicationError>;

    /// Resolve an active application through one of its active key values
    async fn lookup_by_key(&self, key_value: &str)
    -> Result<Option<Application>, ApplicationError>;

    /// All active key values belonging to an application
    async fn active_key_values(&self, app_id: AppId) -> Result<Vec<String>, ApplicationError>;
}
