//! Application and API key entities
//!
//! An application is the authorization scope of its tasks: any active API
//! key belonging to the owning application may read a task's status.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::value_objects::{AppId, KeyId};

/// A client application that enqueues and owns tasks
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Application {
    /// Unique identifier
    pub id: AppId,
    /// Human-readable name
    pub name: String,
    /// Inactive applications cannot authenticate
    pub active: bool,
    /// When this application was created
    pub created_at: DateTime<Utc>,
}

impl Application {
    /// Create a new active application
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: AppId::new(),
            name: name.into(),
            active: true,
            created_at: Utc::now(),
        }
    }
}

impl std::fmt::Display for Application {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.name, self.id)
    }
}

/// An API key belonging to an application
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiKey {
    /// Unique identifier
    pub id: KeyId,
    /// Owning application
    pub app_id: AppId,
    /// The secret presented by clients
    pub value: String,
    /// Revoked keys stay on record but no longer authenticate
    pub active: bool,
    /// When this key was created
    pub created_at: DateTime<Utc>,
}

impl ApiKey {
    /// Generate a fresh active key for an application
    #[must_use]
    pub fn generate(app_id: AppId) -> Self {
        Self {
            id: KeyId::new(),
            app_id,
            value: Uuid::new_v4().simple().to_string(),
            active: true,
            created_at: Utc::now(),
        }
    }
}
