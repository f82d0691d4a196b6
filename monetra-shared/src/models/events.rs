use uuid::Uuid;

use crate::pii::Masked;

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct OffersServedEvent {
    pub context_key: String,
    pub offer_count: usize,
    pub strategy: String,
    pub cache_hit: bool,
    pub timestamp: i64,
}

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct ClickRecordedEvent {
    pub click_id: Uuid,
    pub offer_id: Uuid,
    pub offer_slug: String,
    pub session_id: Masked<String>,
    pub page_slug: Option<String>,
    pub timestamp: i64,
}

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct ConversionRecordedEvent {
    pub click_id: Uuid,
    pub offer_id: Uuid,
    pub conversion_value: f64,
    pub conversion_type: Option<String>,
    pub timestamp: i64,
}

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct SourceSyncedEvent {
    pub source_id: Uuid,
    pub plugin_slug: String,
    pub processed: usize,
    pub added: usize,
    pub updated: usize,
    pub removed: usize,
    pub error_count: usize,
    pub timestamp: i64,
}

/// Envelope published to the analytics channel.
#[derive(Debug, serde::Serialize, Clone)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum AnalyticsEvent {
    OffersServed(OffersServedEvent),
    ClickRecorded(ClickRecordedEvent),
    ConversionRecorded(ConversionRecordedEvent),
    SourceSynced(SourceSyncedEvent),
}

/// Fan-out point for analytics events. The engine only emits; collection
/// plumbing lives with external collaborators.
pub trait AnalyticsSink: Send + Sync {
    fn publish(&self, event: AnalyticsEvent);
}
