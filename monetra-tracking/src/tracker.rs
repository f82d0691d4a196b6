use std::sync::Arc;

use chrono::Utc;
use tracing::info;
use url::Url;
use uuid::Uuid;

use monetra_core::repository::{ClickRepository, OfferRepository};
use monetra_core::Click;
use monetra_shared::models::events::ClickRecordedEvent;
use monetra_shared::{AnalyticsEvent, AnalyticsSink};

use crate::TrackingError;

#[derive(Debug, Clone, serde::Serialize)]
pub struct TrackedClick {
    pub click_id: Uuid,
    pub tracking_url: String,
}

/// Records outbound clicks and hands back the redirect URL the caller
/// should send the visitor through.
pub struct ClickTracker {
    offers: Arc<dyn OfferRepository>,
    clicks: Arc<dyn ClickRepository>,
    analytics: Arc<dyn AnalyticsSink>,
    base_url: String,
}

impl ClickTracker {
    pub fn new(
        offers: Arc<dyn OfferRepository>,
        clicks: Arc<dyn ClickRepository>,
        analytics: Arc<dyn AnalyticsSink>,
        base_url: String,
    ) -> Self {
        Self {
            offers,
            clicks,
            analytics,
            base_url,
        }
    }

    pub async fn track_click(
        &self,
        offer_id: Uuid,
        session_id: String,
        user_id: Option<String>,
        page_slug: Option<String>,
        context: serde_json::Value,
    ) -> Result<TrackedClick, TrackingError> {
        let offer = self
            .offers
            .get_offer(offer_id)
            .await?
            .filter(|o| o.is_active)
            .ok_or_else(|| TrackingError::OfferNotFound(offer_id.to_string()))?;

        let click = Click::record(&offer, session_id.clone(), user_id, context);
        self.clicks.insert_click(&click).await?;
        // Counter bump is its own statement so a concurrent conversion
        // update can never erase it.
        self.offers.increment_click_count(offer.id).await?;

        let tracking_url = self.tracking_url(&click, page_slug.as_deref())?;

        self.analytics
            .publish(AnalyticsEvent::ClickRecorded(ClickRecordedEvent {
                click_id: click.id,
                offer_id: offer.id,
                offer_slug: offer.slug.clone(),
                session_id: session_id.into(),
                page_slug,
                timestamp: Utc::now().timestamp(),
            }));
        info!(click_id = %click.id, offer_slug = %offer.slug, "click recorded");

        Ok(TrackedClick {
            click_id: click.id,
            tracking_url,
        })
    }

    fn tracking_url(
        &self,
        click: &Click,
        page_slug: Option<&str>,
    ) -> Result<String, TrackingError> {
        let mut url = Url::parse(&self.base_url)?;
        url.path_segments_mut()
            .map_err(|_| TrackingError::CannotBeABase)?
            .pop_if_empty()
            .extend(["redirect", &click.offer_slug]);
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("click_id", &click.id.to_string());
            pairs.append_pair("utm_source", "monetra");
            pairs.append_pair("utm_medium", "affiliate");
            pairs.append_pair(
                "utm_campaign",
                click.offer_category.as_deref().unwrap_or("general"),
            );
            if let Some(page) = page_slug {
                pairs.append_pair("ref", page);
            }
        }
        Ok(url.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use monetra_core::Offer;
    use monetra_store::memory::{MemoryClickRepository, MemoryOfferRepository};

    struct NullSink;

    impl AnalyticsSink for NullSink {
        fn publish(&self, _event: AnalyticsEvent) {}
    }

    fn offer(slug: &str) -> Offer {
        let mut o = Offer::new(
            Uuid::new_v4(),
            slug.to_string(),
            slug.replace('-', " "),
            format!("https://merchant.example/{slug}"),
        );
        o.category = Some("office".to_string());
        o
    }

    fn tracker(
        offers: Arc<MemoryOfferRepository>,
        clicks: Arc<MemoryClickRepository>,
    ) -> ClickTracker {
        ClickTracker::new(
            offers,
            clicks,
            Arc::new(NullSink),
            "https://offers.example".to_string(),
        )
    }

    #[tokio::test]
    async fn click_is_persisted_and_counter_bumped() {
        let offers = Arc::new(MemoryOfferRepository::new());
        let clicks = Arc::new(MemoryClickRepository::new());
        let o = offer("standing-desk");
        offers.upsert_offer(&o).await.unwrap();

        let tracked = tracker(offers.clone(), clicks.clone())
            .track_click(
                o.id,
                "sess-1".to_string(),
                None,
                Some("desk-guide".to_string()),
                serde_json::json!({}),
            )
            .await
            .unwrap();

        let stored = clicks.get_click(tracked.click_id).await.unwrap().unwrap();
        assert_eq!(stored.offer_slug, "standing-desk");
        assert_eq!(
            offers.get_offer(o.id).await.unwrap().unwrap().click_count,
            1
        );
    }

    #[tokio::test]
    async fn tracking_url_embeds_click_id_and_utm_parameters() {
        let offers = Arc::new(MemoryOfferRepository::new());
        let clicks = Arc::new(MemoryClickRepository::new());
        let o = offer("ergonomic-chair");
        offers.upsert_offer(&o).await.unwrap();

        let tracked = tracker(offers, clicks)
            .track_click(
                o.id,
                "sess-2".to_string(),
                None,
                Some("chair-roundup".to_string()),
                serde_json::json!({}),
            )
            .await
            .unwrap();

        let url = Url::parse(&tracked.tracking_url).unwrap();
        assert_eq!(url.path(), "/redirect/ergonomic-chair");
        let pairs: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        assert!(pairs.contains(&("click_id".to_string(), tracked.click_id.to_string())));
        assert!(pairs.contains(&("utm_source".to_string(), "monetra".to_string())));
        assert!(pairs.contains(&("utm_campaign".to_string(), "office".to_string())));
        assert!(pairs.contains(&("ref".to_string(), "chair-roundup".to_string())));
    }

    #[tokio::test]
    async fn inactive_offer_is_rejected() {
        let offers = Arc::new(MemoryOfferRepository::new());
        let clicks = Arc::new(MemoryClickRepository::new());
        let mut o = offer("retired-offer");
        o.is_active = false;
        offers.upsert_offer(&o).await.unwrap();

        let err = tracker(offers, clicks)
            .track_click(o.id, "sess-3".to_string(), None, None, serde_json::json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, TrackingError::OfferNotFound(_)));
    }
}
