use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use monetra_core::repository::{ClickRepository, ConversionStats, RepoError};
use monetra_core::Click;

pub struct PostgresClickRepository {
    pub pool: PgPool,
}

fn row_to_click(row: &PgRow) -> Result<Click, sqlx::Error> {
    Ok(Click {
        id: row.try_get("id")?,
        offer_id: row.try_get("offer_id")?,
        session_id: row.try_get("session_id")?,
        user_id: row.try_get("user_id")?,
        offer_slug: row.try_get("offer_slug")?,
        offer_title: row.try_get("offer_title")?,
        offer_category: row.try_get("offer_category")?,
        commission_rate: row.try_get("commission_rate")?,
        context: row.try_get("context")?,
        created_at: row.try_get("created_at")?,
        redirected_at: row.try_get("redirected_at")?,
        conversion_tracked: row.try_get("conversion_tracked")?,
        conversion_value: row.try_get("conversion_value")?,
        conversion_type: row.try_get("conversion_type")?,
        converted_at: row.try_get("converted_at")?,
    })
}

const CLICK_COLUMNS: &str = "id, offer_id, session_id, user_id, offer_slug, offer_title, \
     offer_category, commission_rate, context, created_at, redirected_at, conversion_tracked, \
     conversion_value, conversion_type, converted_at";

#[async_trait]
impl ClickRepository for PostgresClickRepository {
    async fn insert_click(&self, click: &Click) -> Result<(), RepoError> {
        sqlx::query(
            r#"
            INSERT INTO clicks (
                id, offer_id, session_id, user_id, offer_slug, offer_title, offer_category,
                commission_rate, context, created_at, redirected_at, conversion_tracked,
                conversion_value, conversion_type, converted_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            "#,
        )
        .bind(click.id)
        .bind(click.offer_id)
        .bind(&click.session_id)
        .bind(&click.user_id)
        .bind(&click.offer_slug)
        .bind(&click.offer_title)
        .bind(&click.offer_category)
        .bind(click.commission_rate)
        .bind(&click.context)
        .bind(click.created_at)
        .bind(click.redirected_at)
        .bind(click.conversion_tracked)
        .bind(click.conversion_value)
        .bind(&click.conversion_type)
        .bind(click.converted_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_click(&self, id: Uuid) -> Result<Option<Click>, RepoError> {
        let row = sqlx::query(&format!("SELECT {CLICK_COLUMNS} FROM clicks WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(row_to_click).transpose().map_err(Into::into)
    }

    async fn latest_click_for_session(
        &self,
        session_id: &str,
    ) -> Result<Option<Click>, RepoError> {
        let row = sqlx::query(&format!(
            "SELECT {CLICK_COLUMNS} FROM clicks WHERE session_id = $1 \
             ORDER BY created_at DESC LIMIT 1"
        ))
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(row_to_click).transpose().map_err(Into::into)
    }

    async fn mark_redirected(&self, id: Uuid, at: DateTime<Utc>) -> Result<(), RepoError> {
        sqlx::query("UPDATE clicks SET redirected_at = $2 WHERE id = $1")
            .bind(id)
            .bind(at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn record_conversion(
        &self,
        id: Uuid,
        value: f64,
        conversion_type: Option<String>,
        at: DateTime<Utc>,
    ) -> Result<(), RepoError> {
        sqlx::query(
            "UPDATE clicks SET conversion_tracked = TRUE, conversion_value = $2, \
             conversion_type = $3, converted_at = $4 WHERE id = $1",
        )
        .bind(id)
        .bind(value)
        .bind(conversion_type)
        .bind(at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn conversion_stats_for_offer(
        &self,
        offer_id: Uuid,
    ) -> Result<ConversionStats, RepoError> {
        let row = sqlx::query(
            "SELECT COUNT(*) FILTER (WHERE conversion_tracked) AS conversions, \
             COALESCE(SUM(conversion_value) FILTER (WHERE conversion_tracked), 0) AS value_total \
             FROM clicks WHERE offer_id = $1",
        )
        .bind(offer_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(ConversionStats {
            conversions: row.try_get("conversions")?,
            value_total: row.try_get("value_total")?,
        })
    }

    async fn list_offer_clicks(
        &self,
        offer_id: Uuid,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Result<Vec<Click>, RepoError> {
        let rows = sqlx::query(&format!(
            "SELECT {CLICK_COLUMNS} FROM clicks WHERE offer_id = $1 \
             AND ($2::timestamptz IS NULL OR created_at >= $2) \
             AND ($3::timestamptz IS NULL OR created_at <= $3) \
             ORDER BY created_at"
        ))
        .bind(offer_id)
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;
        rows.iter()
            .map(row_to_click)
            .collect::<Result<Vec<_>, _>>()
            .map_err(Into::into)
    }
}
