//! SQLite application and API key store

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::{debug, info, instrument};

use application::error::ApplicationError;
use application::ports::ApplicationStore;
use domain::{ApiKey, AppId, Application};

use super::error::map_sqlx_error;

/// Row type for application queries
#[derive(sqlx::FromRow)]
struct ApplicationRow {
    id: String,
    name: String,
    active: i64,
    created_at: String,
}

impl ApplicationRow {
    fn into_application(self) -> Application {
        Application {
            id: AppId::parse(&self.id).unwrap_or_else(|_| AppId::from_uuid(uuid::Uuid::nil())),
            name: self.name,
            active: self.active != 0,
            created_at: parse_datetime(&self.created_at),
        }
    }
}

/// Application store backed by SQLite (via sqlx)
#[derive(Clone)]
pub struct SqliteApplicationStore {
    pool: SqlitePool,
}

impl std::fmt::Debug for SqliteApplicationStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteApplicationStore")
            .finish_non_exhaustive()
    }
}

impl SqliteApplicationStore {
    /// Create a new application store over the shared pool
    #[must_use]
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ApplicationStore for SqliteApplicationStore {
    #[instrument(skip(self))]
    async fn create(&self, name: &str) -> Result<(Application, ApiKey), ApplicationError> {
        let app = Application::new(name);
        let key = ApiKey::generate(app.id);

        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;
        sqlx::query("INSERT INTO applications (id, name, active, created_at) VALUES ($1, $2, $3, $4)")
            .bind(app.id.to_string())
            .bind(&app.name)
            .bind(i64::from(app.active))
            .bind(app.created_at.to_rfc3339())
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;
        sqlx::query(
            "INSERT INTO api_keys (id, app_id, value, active, created_at) VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(key.id.to_string())
        .bind(key.app_id.to_string())
        .bind(&key.value)
        .bind(i64::from(key.active))
        .bind(key.created_at.to_rfc3339())
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;
        tx.commit().await.map_err(map_sqlx_error)?;

        info!(app_id = %app.id, name = %app.name, "application created");
        Ok((app, key))
    }

    async fn get(&self, id: AppId) -> Result<Option<Application>, ApplicationError> {
        let row: Option<ApplicationRow> =
            sqlx::query_as("SELECT id, name, active, created_at FROM applications WHERE id = $1")
                .bind(id.to_string())
                .fetch_optional(&self.pool)
                .await
                .map_err(map_sqlx_error)?;
        Ok(row.map(ApplicationRow::into_application))
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<Application>, ApplicationError> {
        let row: Option<ApplicationRow> =
            sqlx::query_as("SELECT id, name, active, created_at FROM applications WHERE name = $1")
                .bind(name)
                .fetch_optional(&self.pool)
                .await
                .map_err(map_sqlx_error)?;
        Ok(row.map(ApplicationRow::into_application))
    }

    async fn lookup_by_key(
        &self,
        key_value: &str,
    ) -> Result<Option<Application>, ApplicationError> {
        let row: Option<ApplicationRow> = sqlx::query_as(
            "SELECT a.id, a.name, a.active, a.created_at
             FROM applications a
             JOIN api_keys k ON k.app_id = a.id
             WHERE k.value = $1 AND k.active = 1 AND a.active = 1",
        )
        .bind(key_value)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;
        if row.is_none() {
            debug!("API key did not resolve to an active application");
        }
        Ok(row.map(ApplicationRow::into_application))
    }

    async fn active_key_values(&self, app_id: AppId) -> Result<Vec<String>, ApplicationError> {
        let values: Vec<String> =
            sqlx::query_scalar("SELECT value FROM api_keys WHERE app_id = $1 AND active = 1")
                .bind(app_id.to_string())
                .fetch_all(&self.pool)
                .await
                .map_err(map_sqlx_error)?;
        Ok(values)
    }
}

/// Parse ISO8601 datetime string
fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s).map_or_else(|_| Utc::now(), |dt| dt.with_timezone(&Utc))
}
