use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use monetra_core::repository::{RepoError, SourceRepository};
use monetra_core::{Source, SyncStatus};

pub struct PostgresSourceRepository {
    pub pool: PgPool,
}

fn row_to_source(row: &PgRow) -> Result<Source, sqlx::Error> {
    let status: String = row.try_get("last_sync_status")?;
    Ok(Source {
        id: row.try_get("id")?,
        plugin_slug: row.try_get("plugin_slug")?,
        name: row.try_get("name")?,
        config: row.try_get("config")?,
        is_active: row.try_get("is_active")?,
        last_synced_at: row.try_get("last_synced_at")?,
        last_sync_status: status.parse().unwrap_or(SyncStatus::Never),
        last_sync_error: row.try_get("last_sync_error")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

const SOURCE_COLUMNS: &str = "id, plugin_slug, name, config, is_active, last_synced_at, \
     last_sync_status, last_sync_error, created_at, updated_at";

#[async_trait]
impl SourceRepository for PostgresSourceRepository {
    async fn get_source(&self, id: Uuid) -> Result<Option<Source>, RepoError> {
        let row = sqlx::query(&format!("SELECT {SOURCE_COLUMNS} FROM sources WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(row_to_source).transpose().map_err(Into::into)
    }

    async fn list_active_sources(&self) -> Result<Vec<Source>, RepoError> {
        let rows = sqlx::query(&format!(
            "SELECT {SOURCE_COLUMNS} FROM sources WHERE is_active = TRUE ORDER BY created_at"
        ))
        .fetch_all(&self.pool)
        .await?;
        rows.iter()
            .map(row_to_source)
            .collect::<Result<Vec<_>, _>>()
            .map_err(Into::into)
    }

    async fn update_sync_state(
        &self,
        id: Uuid,
        status: SyncStatus,
        error: Option<String>,
        synced_at: DateTime<Utc>,
    ) -> Result<(), RepoError> {
        sqlx::query(
            "UPDATE sources SET last_sync_status = $2, last_sync_error = $3, \
             last_synced_at = $4, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(status.to_string())
        .bind(error)
        .bind(synced_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
