use std::sync::RwLock;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;
use uuid::Uuid;

use monetra_core::{scoring, Offer, PluginError, RawOffer, SourcePlugin};

use super::{slugify, structurally_valid};

#[derive(Debug, Clone, Deserialize)]
struct AmazonConfig {
    partner_tag: String,
    #[serde(default)]
    endpoint: Option<String>,
    #[serde(default)]
    currency: Option<String>,
    /// Inline offer records, used instead of the endpoint when present.
    #[serde(default)]
    items: Vec<RawOffer>,
}

/// Amazon PartnerNet source plugin. Appends the partner tag to every target
/// URL and derives an initial quality score from rating, review volume and
/// Prime eligibility.
pub struct AmazonPartnersPlugin {
    http: reqwest::Client,
    state: RwLock<Option<AmazonConfig>>,
}

impl AmazonPartnersPlugin {
    pub fn new() -> Self {
        Self {
            http: reqwest::Client::new(),
            state: RwLock::new(None),
        }
    }

    fn config(&self) -> Result<AmazonConfig, PluginError> {
        self.state
            .read()
            .ok()
            .and_then(|guard| guard.as_ref().cloned())
            .ok_or_else(|| PluginError::Config("plugin not initialized".to_string()))
    }
}

impl Default for AmazonPartnersPlugin {
    fn default() -> Self {
        Self::new()
    }
}

fn is_prime(raw: &RawOffer) -> bool {
    raw.badges.iter().any(|b| b.eq_ignore_ascii_case("prime"))
        || raw.extra["is_prime"].as_bool() == Some(true)
}

/// Initial quality from upstream signals, before any engagement data exists.
fn initial_quality(rating: Option<f64>, review_count: Option<i64>, prime: bool) -> f64 {
    let rating_component = rating.unwrap_or(0.0).clamp(0.0, 5.0) / 5.0 * 70.0;
    let prime_component = if prime { 20.0 } else { 0.0 };
    let review_component =
        ((review_count.unwrap_or(0).max(0) as f64 + 1.0).log10() * 2.0).clamp(0.0, 10.0);
    (rating_component + prime_component + review_component).clamp(0.0, 100.0)
}

#[async_trait]
impl SourcePlugin for AmazonPartnersPlugin {
    fn slug(&self) -> &str {
        "amazon_partners"
    }

    fn name(&self) -> &str {
        "Amazon PartnerNet"
    }

    async fn initialize(&self, config: &serde_json::Value) -> Result<bool, PluginError> {
        let parsed: AmazonConfig = serde_json::from_value(config.clone())
            .map_err(|e| PluginError::Config(e.to_string()))?;
        if parsed.partner_tag.trim().is_empty() {
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
            // Inline catalogs have no upstream to probe.
            return Ok(true);
        };
        let response = self
            .http
            .get(&endpoint)
            .send()
            .await
            .map_err(|e| PluginError::Connection(e.to_string()))?;
        Ok(response.status().is_success())
    }

    async fn sync_offers(&self, source_id: Uuid) -> Result<Vec<RawOffer>, PluginError> {
        let config = self.config()?;
        if !config.items.is_empty() {
            debug!(%source_id, count = config.items.len(), "serving inline amazon catalog");
            return Ok(config.items);
        }
        let endpoint = config
            .endpoint
            .ok_or_else(|| PluginError::Config("no endpoint or inline items".to_string()))?;
        let response = self
            .http
            .get(&endpoint)
            .query(&[("partner_tag", config.partner_tag.as_str())])
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
        structurally_valid(raw) && raw.rating.map_or(true, |r| (0.0..=5.0).contains(&r))
    }

    fn transform_offer(&self, raw: &RawOffer, source_id: Uuid) -> Result<Offer, PluginError> {
        let config = self.config()?;
        let prime = is_prime(raw);

        let mut target = url::Url::parse(&raw.target_url)
            .map_err(|e| PluginError::Validation(format!("bad target url: {e}")))?;
        target
            .query_pairs_mut()
            .append_pair("tag", &config.partner_tag);

        let slug = format!(
            "{}-{}",
            slugify(&raw.title),
            raw.external_id.to_lowercase()
        );
        let mut offer = Offer::new(source_id, slug, raw.title.clone(), target.to_string());
        offer.description = raw.description.clone();
        offer.merchant = Some(raw.merchant.clone().unwrap_or_else(|| "Amazon".to_string()));
        offer.category = raw.category.clone();
        offer.price = raw.price;
        offer.old_price = raw.old_price;
        offer.currency = raw
            .currency
            .clone()
            .or(config.currency)
            .unwrap_or_else(|| "EUR".to_string());
        offer.commission_rate = raw.commission_rate.unwrap_or(0.03);
        offer.rating = raw.rating;
        offer.badges = raw.badges.clone();
        if prime && !offer.badges.iter().any(|b| b.eq_ignore_ascii_case("prime")) {
            offer.badges.push("prime".to_string());
        }
        offer.quality_score = initial_quality(raw.rating, raw.review_count, prime);
        offer.trust_score = scoring::trust_score(&offer);
        Ok(offer)
    }
}
