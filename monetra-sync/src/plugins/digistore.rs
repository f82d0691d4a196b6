use std::sync::RwLock;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;
use uuid::Uuid;

use monetra_core::{scoring, Offer, PluginError, RawOffer, SourcePlugin};

use super::{slugify, structurally_valid};

#[derive(Debug, Clone, Deserialize)]
struct DigistoreConfig {
    api_key: String,
    affiliate_id: String,
    #[serde(default)]
    endpoint: Option<String>,
    /// Inline offer records, used instead of the endpoint when present.
    #[serde(default)]
    items: Vec<RawOffer>,
}

/// Digistore24 source plugin for digital products. Commission rates run far
/// higher than physical retail, so the default is 25% when upstream omits it.
pub struct DigistorePlugin {
    http: reqwest::Client,
    state: RwLock<Option<DigistoreConfig>>,
}

impl DigistorePlugin {
    pub fn new() -> Self {
        Self {
            http: reqwest::Client::new(),
            state: RwLock::new(None),
        }
    }

    fn config(&self) -> Result<DigistoreConfig, PluginError> {
        self.state
            .read()
            .ok()
            .and_then(|guard| guard.as_ref().cloned())
            .ok_or_else(|| PluginError::Config("plugin not initialized".to_string()))
    }
}

impl Default for DigistorePlugin {
    fn default() -> Self {
        Self::new()
    }
}

fn initial_quality(rating: Option<f64>, review_count: Option<i64>) -> f64 {
    let rating_component = rating.unwrap_or(2.5).clamp(0.0, 5.0) / 5.0 * 70.0;
    let review_component =
        ((review_count.unwrap_or(0).max(0) as f64 + 1.0).log10() * 10.0).clamp(0.0, 30.0);
    (rating_component + review_component).clamp(0.0, 100.0)
}

#[async_trait]
impl SourcePlugin for DigistorePlugin {
    fn slug(&self) -> &str {
        "digistore"
    }

    fn name(&self) -> &str {
        "Digistore24"
    }

    async fn initialize(&self, config: &serde_json::Value) -> Result<bool, PluginError> {
        let parsed: DigistoreConfig = serde_json::from_value(config.clone())
            .map_err(|e| PluginError::Config(e.to_string()))?;
        if parsed.api_key.trim().is_empty() || parsed.affiliate_id.trim().is_empty() {
            return Ok(false);
        }
        if parsed.endpoint.is_none() && parsed.items.is_empty() {
            return Ok(false);
        }
        if let Ok(mut guard) = self.state.write() {
            *guard = Some(parsed);
        }
        Ok(true)
    }

    async fn test_connection(&self) -> Result<bool, PluginError> {
        let config = self.config()?;
        let Some(endpoint) = config.endpoint else {
            return Ok(true);
        };
        let response = self
            .http
            .get(&endpoint)
            .header("X-DS-API-KEY", config.api_key)
            .send()
            .await
            .map_err(|e| PluginError::Connection(e.to_string()))?;
        Ok(response.status().is_success())
    }

    async fn sync_offers(&self, source_id: Uuid) -> Result<Vec<RawOffer>, PluginError> {
        let config = self.config()?;
        if !config.items.is_empty() {
            debug!(%source_id, count = config.items.len(), "serving inline digistore catalog");
            return Ok(config.items);
        }
        let endpoint = config
            .endpoint
            .ok_or_else(|| PluginError::Config("no endpoint or inline items".to_string()))?;
        let response = self
            .http
            .get(&endpoint)
            .header("X-DS-API-KEY", config.api_key)
            .send()
            .await
            .map_err(|e| PluginError::Connection(e.to_string()))?;
        if !response.status().is_success() {
            return Err(PluginError::Connection(format!(
                "upstream returned {}",
                response.status()
            )));
        }
        response
            .json::<Vec<RawOffer>>()
            .await
            .map_err(|e| PluginError::Connection(e.to_string()))
    }

    fn validate_offer(&self, raw: &RawOffer) -> bool {
        structurally_valid(raw)
            && raw.commission_rate.map_or(true, |c| (0.0..=1.0).contains(&c))
    }

    fn transform_offer(&self, raw: &RawOffer, source_id: Uuid) -> Result<Offer, PluginError> {
        let config = self.config()?;

        let mut target = url::Url::parse(&raw.target_url)
            .map_err(|e| PluginError::Validation(format!("bad target url: {e}")))?;
        target
            .query_pairs_mut()
            .append_pair("aff", &config.affiliate_id);

        let slug = format!(
            "{}-{}",
            slugify(&raw.title),
            raw.external_id.to_lowercase()
        );
        let mut offer = Offer::new(source_id, slug, raw.title.clone(), target.to_string());
        offer.description = raw.description.clone();
        offer.merchant = raw.merchant.clone();
        offer.category = raw.category.clone();
        offer.price = raw.price;
        offer.old_price = raw.old_price;
        offer.currency = raw.currency.clone().unwrap_or_else(|| "EUR".to_string());
        offer.commission_rate = raw.commission_rate.unwrap_or(0.25);
        offer.rating = raw.rating;
        offer.badges = raw.badges.clone();
        offer.quality_score = initial_quality(raw.rating, raw.review_count);
        offer.trust_score = scoring::trust_score(&offer);
        Ok(offer)
    }
}
