use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use monetra_core::repository::{OfferRepository, RepoError, SourceRepository, UpsertOutcome};
use monetra_core::{PluginError, SyncReport, SyncStatus};
use monetra_shared::{AnalyticsEvent, AnalyticsSink};
use monetra_shared::models::events::SourceSyncedEvent;

use crate::registry::PluginRegistry;

#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("source {0} not found")]
    SourceNotFound(Uuid),
    #[error("no plugin registered for slug '{0}'")]
    UnknownPlugin(String),
    #[error("plugin '{0}' rejected the source configuration")]
    ConfigRejected(String),
    #[error(transparent)]
    Plugin(#[from] PluginError),
    #[error("storage failure: {0}")]
    Storage(#[from] RepoError),
}

/// Drives plugin syncs: initialize, pull, validate, transform, upsert.
/// Per-record failures are collected; only connection and storage failures
/// abort a source's run.
pub struct SyncOrchestrator {
    registry: Arc<PluginRegistry>,
    offers: Arc<dyn OfferRepository>,
    sources: Arc<dyn SourceRepository>,
    analytics: Arc<dyn AnalyticsSink>,
}

impl SyncOrchestrator {
    pub fn new(
        registry: Arc<PluginRegistry>,
        offers: Arc<dyn OfferRepository>,
        sources: Arc<dyn SourceRepository>,
        analytics: Arc<dyn AnalyticsSink>,
    ) -> Self {
        Self {
            registry,
            offers,
            sources,
            analytics,
        }
    }

    /// Sync one source end to end. Offers missing from the refreshed feed
    /// are deactivated, never deleted.
    pub async fn sync_source(&self, source_id: Uuid) -> Result<SyncReport, SyncError> {
        let source = self
            .sources
            .get_source(source_id)
            .await?
            .ok_or(SyncError::SourceNotFound(source_id))?;

        let Some(plugin) = self.registry.get(&source.plugin_slug) else {
            let err = SyncError::UnknownPlugin(source.plugin_slug.clone());
            self.record_failure(source_id, &err.to_string()).await;
            return Err(err);
        };

        match plugin.initialize(&source.config).await {
            Ok(true) => {}
            Ok(false) => {
                let err = SyncError::ConfigRejected(source.plugin_slug.clone());
                self.record_failure(source_id, &err.to_string()).await;
                return Err(err);
            }
            Err(e) => {
                self.record_failure(source_id, &e.to_string()).await;
                return Err(e.into());
            }
        }

        let raws = match plugin.sync_offers(source_id).await {
            Ok(raws) => raws,
            Err(e) => {
                self.record_failure(source_id, &e.to_string()).await;
                return Err(e.into());
            }
        };

        let mut report = SyncReport::default();
        let mut seen: HashSet<String> = HashSet::new();

        for raw in &raws {
            report.processed += 1;

            if !plugin.validate_offer(raw) {
                report
                    .errors
                    .push(format!("{}: failed validation", raw.external_id));
                continue;
            }

            let offer = match plugin.transform_offer(raw, source_id) {
                Ok(offer) => offer,
                Err(e) => {
                    report.errors.push(format!("{}: {e}", raw.external_id));
                    continue;
                }
            };

            let slug = offer.slug.clone();
            match self.offers.upsert_offer(&offer).await {
                Ok(UpsertOutcome::Inserted) => report.added += 1,
                Ok(UpsertOutcome::Updated) => report.updated += 1,
                Err(e) => {
                    self.record_failure(source_id, &e.to_string()).await;
                    return Err(SyncError::Storage(e));
                }
            }
            seen.insert(slug);
        }

        for existing in self.offers.list_source_offers(source_id).await? {
            if existing.is_active && !seen.contains(&existing.slug) {
                self.offers.deactivate_offer(existing.id).await?;
                report.removed += 1;
            }
        }

        let now = Utc::now();
        self.sources
            .update_sync_state(source_id, SyncStatus::Ok, None, now)
            .await?;

        self.analytics
            .publish(AnalyticsEvent::SourceSynced(SourceSyncedEvent {
                source_id,
                plugin_slug: source.plugin_slug.clone(),
                processed: report.processed,
                added: report.added,
                updated: report.updated,
                removed: report.removed,
                error_count: report.errors.len(),
                timestamp: now.timestamp(),
            }));

        info!(
            %source_id,
            plugin = %source.plugin_slug,
            processed = report.processed,
            added = report.added,
            updated = report.updated,
            removed = report.removed,
            errors = report.errors.len(),
            "source sync finished"
        );
        Ok(report)
    }

    /// Sync every active source, one at a time. A failing source never
    /// prevents the remaining sources from running.
    pub async fn sync_all(&self) -> Vec<(Uuid, Result<SyncReport, SyncError>)> {
        let sources = match self.sources.list_active_sources().await {
            Ok(sources) => sources,
            Err(e) => {
                warn!(error = %e, "could not list active sources");
                return Vec::new();
            }
        };

        let mut results = Vec::with_capacity(sources.len());
        for source in sources {
            let result = self.sync_source(source.id).await;
            if let Err(e) = &result {
                warn!(source_id = %source.id, error = %e, "source sync failed");
            }
            results.push((source.id, result));
        }
        results
    }

    async fn record_failure(&self, source_id: Uuid, message: &str) {
        if let Err(e) = self
            .sources
            .update_sync_state(source_id, SyncStatus::Failed, Some(message.to_string()), Utc::now())
            .await
        {
            warn!(%source_id, error = %e, "could not record sync failure");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::DateTime;
    use monetra_core::repository::ConversionStats;
    use monetra_core::{Offer, RawOffer, Source};
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    struct MemOffers {
        inner: Mutex<HashMap<Uuid, Offer>>,
    }

    #[async_trait]
    impl OfferRepository for MemOffers {
        async fn upsert_offer(&self, offer: &Offer) -> Result<UpsertOutcome, RepoError> {
            let mut map = self.inner.lock().unwrap();
            if let Some(existing) = map
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
                map.insert(offer.id, offer.clone());
                Ok(UpsertOutcome::Inserted)
            }
        }

        async fn get_offer(&self, id: Uuid) -> Result<Option<Offer>, RepoError> {
            Ok(self.inner.lock().unwrap().get(&id).cloned())
        }

        async fn get_offer_by_slug(&self, slug: &str) -> Result<Option<Offer>, RepoError> {
            Ok(self
                .inner
                .lock()
                .unwrap()
                .values()
                .find(|o| o.slug == slug)
                .cloned())
        }

        async fn list_active_offers(&self) -> Result<Vec<Offer>, RepoError> {
            Ok(self
                .inner
                .lock()
                .unwrap()
                .values()
                .filter(|o| o.is_active)
                .cloned()
                .collect())
        }

        async fn list_source_offers(&self, source_id: Uuid) -> Result<Vec<Offer>, RepoError> {
            Ok(self
                .inner
                .lock()
                .unwrap()
                .values()
                .filter(|o| o.source_id == source_id)
                .cloned()
                .collect())
        }

        async fn deactivate_offer(&self, id: Uuid) -> Result<(), RepoError> {
            if let Some(offer) = self.inner.lock().unwrap().get_mut(&id) {
                offer.is_active = false;
            }
            Ok(())
        }

        async fn apply_remediation(
            &self,
            _id: Uuid,
            _title: Option<String>,
            _price: Option<f64>,
        ) -> Result<(), RepoError> {
            Ok(())
        }

        async fn increment_click_count(&self, _id: Uuid) -> Result<(), RepoError> {
            Ok(())
        }

        async fn record_performance(
            &self,
            _id: Uuid,
            _conversion_count: i64,
            _conversion_rate: f64,
            _quality_score: f64,
            _trust_score: f64,
        ) -> Result<(), RepoError> {
            Ok(())
        }
    }

    struct MemSources {
        inner: Mutex<HashMap<Uuid, Source>>,
    }

    #[async_trait]
    impl SourceRepository for MemSources {
        async fn get_source(&self, id: Uuid) -> Result<Option<Source>, RepoError> {
            Ok(self.inner.lock().unwrap().get(&id).cloned())
        }

        async fn list_active_sources(&self) -> Result<Vec<Source>, RepoError> {
            Ok(self
                .inner
                .lock()
                .unwrap()
                .values()
                .filter(|s| s.is_active)
                .cloned()
                .collect())
        }

        async fn update_sync_state(
            &self,
            id: Uuid,
            status: SyncStatus,
            error: Option<String>,
            synced_at: DateTime<Utc>,
        ) -> Result<(), RepoError> {
            if let Some(source) = self.inner.lock().unwrap().get_mut(&id) {
                source.last_sync_status = status;
                source.last_sync_error = error;
                source.last_synced_at = Some(synced_at);
            }
            Ok(())
        }
    }

    #[derive(Default)]
    struct CapturingSink {
        events: Mutex<Vec<AnalyticsEvent>>,
    }

    impl AnalyticsSink for CapturingSink {
        fn publish(&self, event: AnalyticsEvent) {
            self.events.lock().unwrap().push(event);
        }
    }

    fn raw(id: &str, title: &str) -> RawOffer {
        RawOffer {
            external_id: id.to_string(),
            title: title.to_string(),
            description: None,
            merchant: None,
            category: None,
            price: Some(49.0),
            old_price: None,
            currency: None,
            commission_rate: None,
            rating: Some(4.0),
            review_count: Some(25),
            badges: Vec::new(),
            target_url: format!("https://www.amazon.de/dp/{id}"),
            extra: json!({}),
        }
    }

    struct Fixture {
        orchestrator: SyncOrchestrator,
        offers: Arc<MemOffers>,
        sources: Arc<MemSources>,
        sink: Arc<CapturingSink>,
        source_id: Uuid,
    }

    fn fixture(items: Vec<RawOffer>) -> Fixture {
        let source = Source::new(
            "amazon_partners".to_string(),
            "Amazon DE".to_string(),
            json!({"partner_tag": "monetra-21", "items": items}),
        );
        let source_id = source.id;
        let sources = Arc::new(MemSources {
            inner: Mutex::new(HashMap::from([(source_id, source)])),
        });
        let offers = Arc::new(MemOffers::default());
        let sink = Arc::new(CapturingSink::default());
        let orchestrator = SyncOrchestrator::new(
            Arc::new(PluginRegistry::with_defaults()),
            offers.clone(),
            sources.clone(),
            sink.clone(),
        );
        Fixture {
            orchestrator,
            offers,
            sources,
            sink,
            source_id,
        }
    }

    #[tokio::test]
    async fn partial_failure_keeps_the_batch_going() {
        let mut invalid = raw("X1", "Broken");
        invalid.target_url = "not a url".to_string();
        let items = vec![raw("A1", "Desk Lamp"), invalid, raw("A2", "Desk Mat")];
        let f = fixture(items);

        let report = f.orchestrator.sync_source(f.source_id).await.unwrap();
        assert_eq!(report.processed, 3);
        assert_eq!(report.added, 2);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.removed, 0);

        assert_eq!(f.offers.list_active_offers().await.unwrap().len(), 2);
        assert_eq!(f.sink.events.lock().unwrap().len(), 1);

        let source = f.sources.get_source(f.source_id).await.unwrap().unwrap();
        assert_eq!(source.last_sync_status, SyncStatus::Ok);
        assert!(source.last_synced_at.is_some());
    }

    #[tokio::test]
    async fn missing_offers_are_deactivated_not_deleted() {
        let items = vec![raw("A1", "Desk Lamp"), raw("A2", "Desk Mat")];
        let f = fixture(items);
        f.orchestrator.sync_source(f.source_id).await.unwrap();

        // Shrink the feed to a single item and sync again.
        f.sources
            .inner
            .lock()
            .unwrap()
            .get_mut(&f.source_id)
            .unwrap()
            .config = json!({"partner_tag": "monetra-21", "items": [raw("A1", "Desk Lamp")]});

        let report = f.orchestrator.sync_source(f.source_id).await.unwrap();
        assert_eq!(report.updated, 1);
        assert_eq!(report.removed, 1);

        let all = f.offers.list_source_offers(f.source_id).await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all.iter().filter(|o| o.is_active).count(), 1);
    }

    #[tokio::test]
    async fn unknown_plugin_marks_source_failed() {
        let source = Source::new(
            "ghost_network".to_string(),
            "Ghost".to_string(),
            json!({}),
        );
        let source_id = source.id;
        let sources = Arc::new(MemSources {
            inner: Mutex::new(HashMap::from([(source_id, source)])),
        });
        let orchestrator = SyncOrchestrator::new(
            Arc::new(PluginRegistry::with_defaults()),
            Arc::new(MemOffers::default()),
            sources.clone(),
            Arc::new(CapturingSink::default()),
        );

        let err = orchestrator.sync_source(source_id).await.unwrap_err();
        assert!(matches!(err, SyncError::UnknownPlugin(_)));

        let source = sources.get_source(source_id).await.unwrap().unwrap();
        assert_eq!(source.last_sync_status, SyncStatus::Failed);
        assert!(source.last_sync_error.is_some());
    }
}
