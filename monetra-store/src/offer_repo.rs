use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use monetra_core::repository::{OfferRepository, RepoError, UpsertOutcome};
use monetra_core::Offer;

pub struct PostgresOfferRepository {
    pub pool: PgPool,
}

fn row_to_offer(row: &PgRow) -> Result<Offer, sqlx::Error> {
    Ok(Offer {
        id: row.try_get("id")?,
        source_id: row.try_get("source_id")?,
        slug: row.try_get("slug")?,
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        merchant: row.try_get("merchant")?,
        category: row.try_get("category")?,
        tags: row.try_get("tags")?,
        badges: row.try_get("badges")?,
        disclaimer: row.try_get("disclaimer")?,
        price: row.try_get("price")?,
        old_price: row.try_get("old_price")?,
        currency: row.try_get("currency")?,
        commission_rate: row.try_get("commission_rate")?,
        rating: row.try_get("rating")?,
        quality_score: row.try_get("quality_score")?,
        trust_score: row.try_get("trust_score")?,
        region: row.try_get("region")?,
        emotion: row.try_get("emotion")?,
        is_active: row.try_get("is_active")?,
        is_featured: row.try_get("is_featured")?,
        priority: row.try_get("priority")?,
        valid_from: row.try_get("valid_from")?,
        valid_until: row.try_get("valid_until")?,
        click_count: row.try_get("click_count")?,
        conversion_count: row.try_get("conversion_count")?,
        conversion_rate: row.try_get("conversion_rate")?,
        target_url: row.try_get("target_url")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

const OFFER_COLUMNS: &str = "id, source_id, slug, title, description, merchant, category, tags, \
     badges, disclaimer, price, old_price, currency, commission_rate, rating, quality_score, \
     trust_score, region, emotion, is_active, is_featured, priority, valid_from, valid_until, \
     click_count, conversion_count, conversion_rate, target_url, created_at, updated_at";

#[async_trait]
impl OfferRepository for PostgresOfferRepository {
    async fn upsert_offer(&self, offer: &Offer) -> Result<UpsertOutcome, RepoError> {
        // Engagement counters and created_at survive updates; catalog fields
        // are refreshed from the incoming offer.
        let row = sqlx::query(
            r#"
            INSERT INTO offers (
                id, source_id, slug, title, description, merchant, category, tags,
                badges, disclaimer, price, old_price, currency, commission_rate, rating,
                quality_score, trust_score, region, emotion, is_active, is_featured,
                priority, valid_from, valid_until, click_count, conversion_count,
                conversion_rate, target_url, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15,
                    $16, $17, $18, $19, $20, $21, $22, $23, $24, $25, $26, $27, $28, $29, $30)
            ON CONFLICT (source_id, slug) DO UPDATE SET
                title = EXCLUDED.title,
                description = EXCLUDED.description,
                merchant = EXCLUDED.merchant,
                category = EXCLUDED.category,
                tags = EXCLUDED.tags,
                badges = EXCLUDED.badges,
                disclaimer = EXCLUDED.disclaimer,
                price = EXCLUDED.price,
                old_price = EXCLUDED.old_price,
                currency = EXCLUDED.currency,
                commission_rate = EXCLUDED.commission_rate,
                rating = EXCLUDED.rating,
                quality_score = EXCLUDED.quality_score,
                trust_score = EXCLUDED.trust_score,
                region = EXCLUDED.region,
                emotion = EXCLUDED.emotion,
                is_active = EXCLUDED.is_active,
                is_featured = EXCLUDED.is_featured,
                priority = EXCLUDED.priority,
                valid_from = EXCLUDED.valid_from,
                valid_until = EXCLUDED.valid_until,
                target_url = EXCLUDED.target_url,
                updated_at = EXCLUDED.updated_at
            RETURNING (xmax = 0) AS inserted
            "#,
        )
        .bind(offer.id)
        .bind(offer.source_id)
        .bind(&offer.slug)
        .bind(&offer.title)
        .bind(&offer.description)
        .bind(&offer.merchant)
        .bind(&offer.category)
        .bind(&offer.tags)
        .bind(&offer.badges)
        .bind(&offer.disclaimer)
        .bind(offer.price)
        .bind(offer.old_price)
        .bind(&offer.currency)
        .bind(offer.commission_rate)
        .bind(offer.rating)
        .bind(offer.quality_score)
        .bind(offer.trust_score)
        .bind(&offer.region)
        .bind(&offer.emotion)
        .bind(offer.is_active)
        .bind(offer.is_featured)
        .bind(offer.priority)
        .bind(offer.valid_from)
        .bind(offer.valid_until)
        .bind(offer.click_count)
        .bind(offer.conversion_count)
        .bind(offer.conversion_rate)
        .bind(&offer.target_url)
        .bind(offer.created_at)
        .bind(offer.updated_at)
        .fetch_one(&self.pool)
        .await?;

        let inserted: bool = row.try_get("inserted")?;
        Ok(if inserted {
            UpsertOutcome::Inserted
        } else {
            UpsertOutcome::Updated
        })
    }

    async fn get_offer(&self, id: Uuid) -> Result<Option<Offer>, RepoError> {
        let row = sqlx::query(&format!("SELECT {OFFER_COLUMNS} FROM offers WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(row_to_offer).transpose().map_err(Into::into)
    }

    async fn get_offer_by_slug(&self, slug: &str) -> Result<Option<Offer>, RepoError> {
        let row = sqlx::query(&format!(
            "SELECT {OFFER_COLUMNS} FROM offers WHERE slug = $1"
        ))
        .bind(slug)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(row_to_offer).transpose().map_err(Into::into)
    }

    async fn list_active_offers(&self) -> Result<Vec<Offer>, RepoError> {
        let rows = sqlx::query(&format!(
            "SELECT {OFFER_COLUMNS} FROM offers WHERE is_active = TRUE \
             ORDER BY priority DESC, quality_score DESC"
        ))
        .fetch_all(&self.pool)
        .await?;
        rows.iter()
            .map(row_to_offer)
            .collect::<Result<Vec<_>, _>>()
            .map_err(Into::into)
    }

    async fn list_source_offers(&self, source_id: Uuid) -> Result<Vec<Offer>, RepoError> {
        let rows = sqlx::query(&format!(
            "SELECT {OFFER_COLUMNS} FROM offers WHERE source_id = $1"
        ))
        .bind(source_id)
        .fetch_all(&self.pool)
        .await?;
        rows.iter()
            .map(row_to_offer)
            .collect::<Result<Vec<_>, _>>()
            .map_err(Into::into)
    }

    async fn deactivate_offer(&self, id: Uuid) -> Result<(), RepoError> {
        sqlx::query("UPDATE offers SET is_active = FALSE, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn apply_remediation(
        &self,
        id: Uuid,
        title: Option<String>,
        price: Option<f64>,
    ) -> Result<(), RepoError> {
        sqlx::query(
            "UPDATE offers SET title = COALESCE($2, title), price = COALESCE($3, price), \
             updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(title)
        .bind(price)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn increment_click_count(&self, id: Uuid) -> Result<(), RepoError> {
        sqlx::query(
            "UPDATE offers SET click_count = click_count + 1, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn record_performance(
        &self,
        id: Uuid,
        conversion_count: i64,
        conversion_rate: f64,
        quality_score: f64,
        trust_score: f64,
    ) -> Result<(), RepoError> {
        sqlx::query(
            "UPDATE offers SET conversion_count = $2, conversion_rate = $3, \
             quality_score = $4, trust_score = $5, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(conversion_count)
        .bind(conversion_rate)
        .bind(quality_score)
        .bind(trust_score)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
