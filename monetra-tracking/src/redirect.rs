use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, warn};
use url::Url;
use uuid::Uuid;

use monetra_core::repository::{ClickRepository, OfferRepository};

use crate::TrackingError;

#[derive(Debug, Clone)]
pub struct ResolvedRedirect {
    /// Final merchant URL the caller should 302 to.
    pub location: String,
}

/// Resolves cloaked redirect URLs back to the merchant target.
pub struct RedirectResolver {
    offers: Arc<dyn OfferRepository>,
    clicks: Arc<dyn ClickRepository>,
}

impl RedirectResolver {
    pub fn new(offers: Arc<dyn OfferRepository>, clicks: Arc<dyn ClickRepository>) -> Self {
        Self { offers, clicks }
    }

    /// Look up the active offer behind `slug` and rebuild its merchant URL
    /// with every inbound tracking parameter re-projected onto it. Inactive
    /// and unknown slugs are a hard NotFound; a redirect must never land on
    /// a retired offer.
    pub async fn resolve(
        &self,
        slug: &str,
        params: &[(String, String)],
    ) -> Result<ResolvedRedirect, TrackingError> {
        let offer = self
            .offers
            .get_offer_by_slug(slug)
            .await?
            .filter(|o| o.is_active)
            .ok_or_else(|| TrackingError::OfferNotFound(slug.to_string()))?;

        if let Some(click_id) = params
            .iter()
            .find(|(k, _)| k == "click_id")
            .and_then(|(_, v)| Uuid::parse_str(v).ok())
        {
            // Best effort and off the request path; losing the redirect
            // timestamp must not delay or fail the hop to the merchant.
            let clicks = self.clicks.clone();
            tokio::spawn(async move {
                if let Err(err) = clicks.mark_redirected(click_id, Utc::now()).await {
                    warn!(%click_id, error = %err, "failed to mark click redirected");
                }
            });
        }

        let mut target = Url::parse(&offer.target_url)?;
        {
            let mut pairs = target.query_pairs_mut();
            for (key, value) in params {
                pairs.append_pair(key, value);
            }
        }
        debug!(%slug, "redirect resolved");

        Ok(ResolvedRedirect {
            location: target.into(),
        })
    }
}
