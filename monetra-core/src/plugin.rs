use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::offer::Offer;

/// Errors surfaced by source plugins.
#[derive(Debug, thiserror::Error)]
pub enum PluginError {
    #[error("invalid plugin configuration: {0}")]
    Config(String),
    #[error("upstream connection failed: {0}")]
    Connection(String),
    #[error("offer failed validation: {0}")]
    Validation(String),
}

/// An offer as delivered by an upstream network, before validation and
/// normalization. Field names follow the common denominator across networks;
/// everything the plugin cannot map lands in `extra`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawOffer {
    pub external_id: String,
    pub title: String,
    pub description: Option<String>,
    pub merchant: Option<String>,
    pub category: Option<String>,
    pub price: Option<f64>,
    pub old_price: Option<f64>,
    pub currency: Option<String>,
    pub commission_rate: Option<f64>,
    pub rating: Option<f64>,
    pub review_count: Option<i64>,
    pub badges: Vec<String>,
    pub target_url: String,
    #[serde(default)]
    pub extra: serde_json::Value,
}

/// Counters accumulated over one sync run. Per-offer failures are collected
/// in `errors` rather than aborting the run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SyncReport {
    pub processed: usize,
    pub added: usize,
    pub updated: usize,
    pub removed: usize,
    pub errors: Vec<String>,
}

/// Contract every offer source plugin implements. The orchestrator drives
/// initialize -> sync_offers -> validate_offer -> transform_offer per source.
#[async_trait]
pub trait SourcePlugin: Send + Sync {
    /// Stable identifier used to bind sources to this plugin.
    fn slug(&self) -> &str;

    fn name(&self) -> &str;

    /// Validate and absorb the source configuration. Returns false when the
    /// configuration is syntactically fine but the plugin cannot operate
    /// with it (e.g. missing credentials).
    async fn initialize(&self, config: &serde_json::Value) -> Result<bool, PluginError>;

    /// Cheap reachability probe against the upstream network.
    async fn test_connection(&self) -> Result<bool, PluginError>;

    /// Pull the current offer set for a source from upstream.
    async fn sync_offers(&self, source_id: Uuid) -> Result<Vec<RawOffer>, PluginError>;

    /// Structural checks on a single raw record. Invalid records are skipped
    /// and counted, never fatal for the run.
    fn validate_offer(&self, raw: &RawOffer) -> bool;

    /// Map a validated raw record into a catalog offer for the given source.
    fn transform_offer(&self, raw: &RawOffer, source_id: Uuid) -> Result<Offer, PluginError>;
}
