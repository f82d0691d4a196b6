use std::sync::Arc;

use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use monetra_core::repository::{ClickRepository, OfferRepository};
use monetra_core::scoring;
use monetra_shared::models::events::ConversionRecordedEvent;
use monetra_shared::{AnalyticsEvent, AnalyticsSink};

use crate::TrackingError;

/// How the caller identifies the originating click. Session resolution picks
/// the most recent click for that session, which can misattribute when a
/// session clicked several offers.
#[derive(Debug, Clone)]
pub enum ClickRef {
    Id(Uuid),
    Session(String),
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct Conversion {
    pub conversion_id: Uuid,
    pub offer_id: Uuid,
    pub conversion_value: f64,
}

/// Attributes conversions to clicks and feeds the outcome back into the
/// offer's performance scores.
pub struct ConversionTracker {
    offers: Arc<dyn OfferRepository>,
    clicks: Arc<dyn ClickRepository>,
    analytics: Arc<dyn AnalyticsSink>,
}

impl ConversionTracker {
    pub fn new(
        offers: Arc<dyn OfferRepository>,
        clicks: Arc<dyn ClickRepository>,
        analytics: Arc<dyn AnalyticsSink>,
    ) -> Self {
        Self {
            offers,
            clicks,
            analytics,
        }
    }

    /// Record a conversion against the referenced click. Re-reporting the
    /// same click overwrites the stored value instead of accumulating.
    pub async fn track_conversion(
        &self,
        click_ref: ClickRef,
        value: f64,
        conversion_type: Option<String>,
    ) -> Result<Conversion, TrackingError> {
        let click = match &click_ref {
            ClickRef::Id(id) => self
                .clicks
                .get_click(*id)
                .await?
                .ok_or_else(|| TrackingError::ClickNotFound(id.to_string()))?,
            ClickRef::Session(session_id) => self
                .clicks
                .latest_click_for_session(session_id)
                .await?
                .ok_or_else(|| TrackingError::ClickNotFound(session_id.clone()))?,
        };

        self.clicks
            .record_conversion(click.id, value, conversion_type.clone(), Utc::now())
            .await?;
        self.refresh_offer_scores(click.offer_id).await?;

        self.analytics
            .publish(AnalyticsEvent::ConversionRecorded(ConversionRecordedEvent {
                click_id: click.id,
                offer_id: click.offer_id,
                conversion_value: value,
                conversion_type,
                timestamp: Utc::now().timestamp(),
            }));
        info!(click_id = %click.id, offer_id = %click.offer_id, value, "conversion recorded");

        Ok(Conversion {
            conversion_id: click.id,
            offer_id: click.offer_id,
            conversion_value: value,
        })
    }

    /// Recompute conversion rate, quality and trust from the stored click
    /// history and patch them onto the offer.
    async fn refresh_offer_scores(&self, offer_id: Uuid) -> Result<(), TrackingError> {
        let Some(offer) = self.offers.get_offer(offer_id).await? else {
            // The click snapshot outlives the offer row only if someone
            // hard-deleted it outside this core; nothing left to score.
            return Ok(());
        };
        let stats = self.clicks.conversion_stats_for_offer(offer_id).await?;

        let conversion_rate = if offer.click_count > 0 {
            (stats.conversions as f64 / offer.click_count as f64 * 100.0).min(100.0)
        } else {
            0.0
        };
        let avg_order_value = if stats.conversions > 0 {
            stats.value_total / stats.conversions as f64
        } else {
            0.0
        };
        let quality = scoring::quality_score(offer.click_count, conversion_rate, avg_order_value);
        let trust = scoring::trust_score(&offer);

        self.offers
            .record_performance(offer_id, stats.conversions, conversion_rate, quality, trust)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use monetra_core::{Click, Offer};
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
        o.merchant = Some("Acme GmbH".to_string());
        o
    }

    struct Fixture {
        offers: Arc<MemoryOfferRepository>,
        clicks: Arc<MemoryClickRepository>,
        tracker: ConversionTracker,
    }

    fn fixture() -> Fixture {
        let offers = Arc::new(MemoryOfferRepository::new());
        let clicks = Arc::new(MemoryClickRepository::new());
        let tracker = ConversionTracker::new(offers.clone(), clicks.clone(), Arc::new(NullSink));
        Fixture {
            offers,
            clicks,
            tracker,
        }
    }

    #[tokio::test]
    async fn conversion_by_click_id_sets_tracked_and_value() {
        let f = fixture();
        let o = offer("espresso-machine");
        f.offers.upsert_offer(&o).await.unwrap();
        f.offers.increment_click_count(o.id).await.unwrap();
        let click = Click::record(&o, "sess-1".to_string(), None, serde_json::json!({}));
        f.clicks.insert_click(&click).await.unwrap();

        let conversion = f
            .tracker
            .track_conversion(ClickRef::Id(click.id), 49.99, Some("sale".to_string()))
            .await
            .unwrap();
        assert_eq!(conversion.offer_id, o.id);
        assert!((conversion.conversion_value - 49.99).abs() < f64::EPSILON);

        let stored = f.clicks.get_click(click.id).await.unwrap().unwrap();
        assert!(stored.conversion_tracked);
        assert_eq!(stored.conversion_value, Some(49.99));
    }

    #[tokio::test]
    async fn session_fallback_resolves_the_latest_click() {
        let f = fixture();
        let o = offer("wool-blanket");
        f.offers.upsert_offer(&o).await.unwrap();
        f.offers.increment_click_count(o.id).await.unwrap();
        f.offers.increment_click_count(o.id).await.unwrap();

        let mut older = Click::record(&o, "sess-2".to_string(), None, serde_json::json!({}));
        older.created_at = Utc::now() - chrono::Duration::minutes(30);
        let newer = Click::record(&o, "sess-2".to_string(), None, serde_json::json!({}));
        f.clicks.insert_click(&older).await.unwrap();
        f.clicks.insert_click(&newer).await.unwrap();

        let conversion = f
            .tracker
            .track_conversion(ClickRef::Session("sess-2".to_string()), 25.0, None)
            .await
            .unwrap();
        assert_eq!(conversion.conversion_id, newer.id);

        let untouched = f.clicks.get_click(older.id).await.unwrap().unwrap();
        assert!(!untouched.conversion_tracked);
    }

    #[tokio::test]
    async fn conversion_refreshes_offer_performance() {
        let f = fixture();
        let o = offer("mechanical-keyboard");
        f.offers.upsert_offer(&o).await.unwrap();
        for _ in 0..4 {
            f.offers.increment_click_count(o.id).await.unwrap();
        }
        let click = Click::record(&o, "sess-3".to_string(), None, serde_json::json!({}));
        f.clicks.insert_click(&click).await.unwrap();

        f.tracker
            .track_conversion(ClickRef::Id(click.id), 120.0, None)
            .await
            .unwrap();

        let updated = f.offers.get_offer(o.id).await.unwrap().unwrap();
        assert_eq!(updated.conversion_count, 1);
        assert!((updated.conversion_rate - 25.0).abs() < f64::EPSILON);
        assert!(updated.quality_score > 0.0);
        // Merchant name is the only trust signal on this record.
        assert!((updated.trust_score - 60.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn unknown_click_reference_is_rejected() {
        let f = fixture();
        let err = f
            .tracker
            .track_conversion(ClickRef::Id(Uuid::new_v4()), 10.0, None)
            .await
            .unwrap_err();
        assert!(matches!(err, TrackingError::ClickNotFound(_)));
    }
}
