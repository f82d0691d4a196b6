//! In-memory repository implementations backed by `tokio::sync::RwLock`.
//! Used by tests and by deployments that run without Postgres.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use monetra_compliance::{ComplianceRule, RuleRepository};
use monetra_core::repository::{
    ClickRepository, ConversionStats, OfferRepository, RepoError, SourceRepository, UpsertOutcome,
};
use monetra_core::{Click, Offer, Source, SyncStatus};

#[derive(Default)]
pub struct MemoryOfferRepository {
    offers: RwLock<HashMap<Uuid, Offer>>,
}

impl MemoryOfferRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl OfferRepository for MemoryOfferRepository {
    async fn upsert_offer(&self, offer: &Offer) -> Result<UpsertOutcome, RepoError> {
        let mut offers = self.offers.write().await;
        if let Some(existing) = offers
            .values_mut()
            .find(|o| o.source_id == offer.source_id && o.slug == offer.slug)
        {
            let mut updated = offer.clone();
            updated.id = existing.id;
            updated.click_count = existing.click_count;
            updated.conversion_count = existing.conversion_count;
            updated.conversion_rate = existing.conversion_rate;
            updated.created_at = existing.created_at;
            *existing = updated;
            Ok(UpsertOutcome::Updated)
        } else {
            offers.insert(offer.id, offer.clone());
            Ok(UpsertOutcome::Inserted)
        }
    }

    async fn get_offer(&self, id: Uuid) -> Result<Option<Offer>, RepoError> {
        Ok(self.offers.read().await.get(&id).cloned())
    }

    async fn get_offer_by_slug(&self, slug: &str) -> Result<Option<Offer>, RepoError> {
        Ok(self
            .offers
            .read()
            .await
            .values()
            .find(|o| o.slug == slug)
            .cloned())
    }

    async fn list_active_offers(&self) -> Result<Vec<Offer>, RepoError> {
        let mut active: Vec<Offer> = self
            .offers
            .read()
            .await
            .values()
            .filter(|o| o.is_active)
            .cloned()
            .collect();
        active.sort_by(|a, b| {
            b.priority.cmp(&a.priority).then(
                b.quality_score
                    .partial_cmp(&a.quality_score)
                    .unwrap_or(std::cmp::Ordering::Equal),
            )
        });
        Ok(active)
    }

    async fn list_source_offers(&self, source_id: Uuid) -> Result<Vec<Offer>, RepoError> {
        Ok(self
            .offers
            .read()
            .await
            .values()
            .filter(|o| o.source_id == source_id)
            .cloned()
            .collect())
    }

    async fn deactivate_offer(&self, id: Uuid) -> Result<(), RepoError> {
        if let Some(offer) = self.offers.write().await.get_mut(&id) {
            offer.is_active = false;
            offer.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn apply_remediation(
        &self,
        id: Uuid,
        title: Option<String>,
        price: Option<f64>,
    ) -> Result<(), RepoError> {
        if let Some(offer) = self.offers.write().await.get_mut(&id) {
            if let Some(title) = title {
                offer.title = title;
            }
            if let Some(price) = price {
                offer.price = Some(price);
            }
            offer.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn increment_click_count(&self, id: Uuid) -> Result<(), RepoError> {
        if let Some(offer) = self.offers.write().await.get_mut(&id) {
            offer.click_count += 1;
            offer.updated_at = Utc::now();
        }
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
        if let Some(offer) = self.offers.write().await.get_mut(&id) {
            offer.conversion_count = conversion_count;
            offer.conversion_rate = conversion_rate;
            offer.quality_score = quality_score;
            offer.trust_score = trust_score;
            offer.updated_at = Utc::now();
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryClickRepository {
    clicks: RwLock<HashMap<Uuid, Click>>,
}

impl MemoryClickRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ClickRepository for MemoryClickRepository {
    async fn insert_click(&self, click: &Click) -> Result<(), RepoError> {
        self.clicks.write().await.insert(click.id, click.clone());
        Ok(())
    }

    async fn get_click(&self, id: Uuid) -> Result<Option<Click>, RepoError> {
        Ok(self.clicks.read().await.get(&id).cloned())
    }

    async fn latest_click_for_session(
        &self,
        session_id: &str,
    ) -> Result<Option<Click>, RepoError> {
        Ok(self
            .clicks
            .read()
            .await
            .values()
            .filter(|c| c.session_id == session_id)
            .max_by_key(|c| c.created_at)
            .cloned())
    }

    async fn mark_redirected(&self, id: Uuid, at: DateTime<Utc>) -> Result<(), RepoError> {
        if let Some(click) = self.clicks.write().await.get_mut(&id) {
            click.redirected_at = Some(at);
        }
        Ok(())
    }

    async fn record_conversion(
        &self,
        id: Uuid,
        value: f64,
        conversion_type: Option<String>,
        at: DateTime<Utc>,
    ) -> Result<(), RepoError> {
        if let Some(click) = self.clicks.write().await.get_mut(&id) {
            click.conversion_tracked = true;
            click.conversion_value = Some(value);
            click.conversion_type = conversion_type;
            click.converted_at = Some(at);
        }
        Ok(())
    }

    async fn conversion_stats_for_offer(
        &self,
        offer_id: Uuid,
    ) -> Result<ConversionStats, RepoError> {
        let clicks = self.clicks.read().await;
        let mut stats = ConversionStats::default();
        for click in clicks.values() {
            if click.offer_id == offer_id && click.conversion_tracked {
                stats.conversions += 1;
                stats.value_total += click.conversion_value.unwrap_or(0.0);
            }
        }
        Ok(stats)
    }

    async fn list_offer_clicks(
        &self,
        offer_id: Uuid,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Result<Vec<Click>, RepoError> {
        let mut clicks: Vec<Click> = self
            .clicks
            .read()
            .await
            .values()
            .filter(|c| c.offer_id == offer_id)
            .filter(|c| from.map_or(true, |f| c.created_at >= f))
            .filter(|c| to.map_or(true, |t| c.created_at <= t))
            .cloned()
            .collect();
        clicks.sort_by_key(|c| c.created_at);
        Ok(clicks)
    }
}

#[derive(Default)]
pub struct MemorySourceRepository {
    sources: RwLock<HashMap<Uuid, Source>>,
}

impl MemorySourceRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed or replace a source record.
    pub async fn put_source(&self, source: Source) {
        self.sources.write().await.insert(source.id, source);
    }
}

#[async_trait]
impl SourceRepository for MemorySourceRepository {
    async fn get_source(&self, id: Uuid) -> Result<Option<Source>, RepoError> {
        Ok(self.sources.read().await.get(&id).cloned())
    }

    async fn list_active_sources(&self) -> Result<Vec<Source>, RepoError> {
        let mut active: Vec<Source> = self
            .sources
            .read()
            .await
            .values()
            .filter(|s| s.is_active)
            .cloned()
            .collect();
        active.sort_by_key(|s| s.created_at);
        Ok(active)
    }

    async fn update_sync_state(
        &self,
        id: Uuid,
        status: SyncStatus,
        error: Option<String>,
        synced_at: DateTime<Utc>,
    ) -> Result<(), RepoError> {
        if let Some(source) = self.sources.write().await.get_mut(&id) {
            source.last_sync_status = status;
            source.last_sync_error = error;
            source.last_synced_at = Some(synced_at);
            source.updated_at = Utc::now();
        }
        Ok(())
    }
}

pub struct MemoryRuleRepository {
    rules: RwLock<Vec<ComplianceRule>>,
}

impl MemoryRuleRepository {
    pub fn new(rules: Vec<ComplianceRule>) -> Self {
        Self {
            rules: RwLock::new(rules),
        }
    }

    pub async fn replace_rules(&self, rules: Vec<ComplianceRule>) {
        *self.rules.write().await = rules;
    }
}

#[async_trait]
impl RuleRepository for MemoryRuleRepository {
    async fn list_active_rules(&self) -> Result<Vec<ComplianceRule>, RepoError> {
        Ok(self
            .rules
            .read()
            .await
            .iter()
            .filter(|r| r.is_active)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn offer(source_id: Uuid, slug: &str) -> Offer {
        Offer::new(
            source_id,
            slug.to_string(),
            slug.replace('-', " "),
            format!("https://merchant.example/{slug}"),
        )
    }

    #[tokio::test]
    async fn upsert_preserves_engagement_counters() {
        let repo = MemoryOfferRepository::new();
        let source_id = Uuid::new_v4();

        let first = offer(source_id, "camping-stove");
        assert_eq!(
            repo.upsert_offer(&first).await.unwrap(),
            UpsertOutcome::Inserted
        );
        repo.increment_click_count(first.id).await.unwrap();
        repo.increment_click_count(first.id).await.unwrap();

        let mut refreshed = offer(source_id, "camping-stove");
        refreshed.title = "Camping Stove Mk2".to_string();
        assert_eq!(
            repo.upsert_offer(&refreshed).await.unwrap(),
            UpsertOutcome::Updated
        );

        let stored = repo.get_offer(first.id).await.unwrap().unwrap();
        assert_eq!(stored.title, "Camping Stove Mk2");
        assert_eq!(stored.click_count, 2);
    }

    #[tokio::test]
    async fn latest_click_wins_for_session() {
        let repo = MemoryClickRepository::new();
        let o = offer(Uuid::new_v4(), "yoga-mat");

        let mut older = Click::record(&o, "sess-1".to_string(), None, serde_json::json!({}));
        older.created_at = Utc::now() - chrono::Duration::minutes(10);
        let newer = Click::record(&o, "sess-1".to_string(), None, serde_json::json!({}));

        repo.insert_click(&older).await.unwrap();
        repo.insert_click(&newer).await.unwrap();

        let latest = repo.latest_click_for_session("sess-1").await.unwrap().unwrap();
        assert_eq!(latest.id, newer.id);
    }

    #[tokio::test]
    async fn repeat_conversion_overwrites_value() {
        let repo = MemoryClickRepository::new();
        let o = offer(Uuid::new_v4(), "espresso-machine");
        let click = Click::record(&o, "sess-9".to_string(), None, serde_json::json!({}));
        repo.insert_click(&click).await.unwrap();

        repo.record_conversion(click.id, 49.99, None, Utc::now())
            .await
            .unwrap();
        repo.record_conversion(click.id, 20.00, None, Utc::now())
            .await
            .unwrap();

        let stored = repo.get_click(click.id).await.unwrap().unwrap();
        assert!(stored.conversion_tracked);
        assert_eq!(stored.conversion_value, Some(20.00));

        let stats = repo.conversion_stats_for_offer(o.id).await.unwrap();
        assert_eq!(stats.conversions, 1);
        assert!((stats.value_total - 20.0).abs() < f64::EPSILON);
    }
}
