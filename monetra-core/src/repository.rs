use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::click::Click;
use crate::offer::Offer;
use crate::source::{Source, SyncStatus};

pub type RepoError = Box<dyn std::error::Error + Send + Sync>;

/// Whether an upsert created a new row or refreshed an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    Updated,
}

/// Aggregated conversion figures for one offer.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConversionStats {
    pub conversions: i64,
    pub value_total: f64,
}

#[async_trait]
pub trait OfferRepository: Send + Sync {
    /// Insert or refresh an offer keyed by (source_id, slug). Updates keep
    /// the stored engagement counters and scores; only catalog fields from
    /// the incoming offer are applied.
    async fn upsert_offer(&self, offer: &Offer) -> Result<UpsertOutcome, RepoError>;

    async fn get_offer(&self, id: Uuid) -> Result<Option<Offer>, RepoError>;

    async fn get_offer_by_slug(&self, slug: &str) -> Result<Option<Offer>, RepoError>;

    async fn list_active_offers(&self) -> Result<Vec<Offer>, RepoError>;

    async fn list_source_offers(&self, source_id: Uuid) -> Result<Vec<Offer>, RepoError>;

    async fn deactivate_offer(&self, id: Uuid) -> Result<(), RepoError>;

    /// Apply compliance remediation fields. `None` leaves a field untouched.
    async fn apply_remediation(
        &self,
        id: Uuid,
        title: Option<String>,
        price: Option<f64>,
    ) -> Result<(), RepoError>;

    async fn increment_click_count(&self, id: Uuid) -> Result<(), RepoError>;

    /// Persist recomputed performance figures after a conversion.
    async fn record_performance(
        &self,
        id: Uuid,
        conversion_count: i64,
        conversion_rate: f64,
        quality_score: f64,
        trust_score: f64,
    ) -> Result<(), RepoError>;
}

#[async_trait]
pub trait ClickRepository: Send + Sync {
    async fn insert_click(&self, click: &Click) -> Result<(), RepoError>;

    async fn get_click(&self, id: Uuid) -> Result<Option<Click>, RepoError>;

    /// Most recent click for a session, used when the caller cannot carry a
    /// click id through the funnel.
    async fn latest_click_for_session(&self, session_id: &str)
        -> Result<Option<Click>, RepoError>;

    async fn mark_redirected(&self, id: Uuid, at: DateTime<Utc>) -> Result<(), RepoError>;

    /// Write conversion fields onto the click. Repeat calls overwrite the
    /// previous value.
    async fn record_conversion(
        &self,
        id: Uuid,
        value: f64,
        conversion_type: Option<String>,
        at: DateTime<Utc>,
    ) -> Result<(), RepoError>;

    async fn conversion_stats_for_offer(
        &self,
        offer_id: Uuid,
    ) -> Result<ConversionStats, RepoError>;

    async fn list_offer_clicks(
        &self,
        offer_id: Uuid,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Result<Vec<Click>, RepoError>;
}

#[async_trait]
pub trait SourceRepository: Send + Sync {
    async fn get_source(&self, id: Uuid) -> Result<Option<Source>, RepoError>;

    async fn list_active_sources(&self) -> Result<Vec<Source>, RepoError>;

    async fn update_sync_state(
        &self,
        id: Uuid,
        status: SyncStatus,
        error: Option<String>,
        synced_at: DateTime<Utc>,
    ) -> Result<(), RepoError>;
}
