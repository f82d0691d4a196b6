use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;
use serde::Serialize;
use tracing::{debug, warn};

use monetra_compliance::{ComplianceEngine, RuleRepository};
use monetra_core::repository::{OfferRepository, RepoError};
use monetra_core::{Offer, SelectionContext};
use monetra_shared::models::events::OffersServedEvent;
use monetra_shared::{AnalyticsEvent, AnalyticsSink};

use crate::cache::SelectionCache;
use crate::ranker::{self, PerformanceMetric, RankStrategy};

#[derive(Debug, Clone)]
pub struct SelectionOptions {
    pub max_offers_per_page: usize,
    pub rating_threshold: f64,
    pub strategy: RankStrategy,
    pub performance_metric: PerformanceMetric,
    pub cache_ttl: Duration,
}

impl Default for SelectionOptions {
    fn default() -> Self {
        Self {
            max_offers_per_page: 6,
            rating_threshold: 3.0,
            strategy: RankStrategy::Performance,
            performance_metric: PerformanceMetric::Revenue,
            cache_ttl: Duration::from_secs(300),
        }
    }
}

impl SelectionOptions {
    /// Build options from the string form carried by the config file.
    /// Unknown names fall back to the defaults with a warning rather than
    /// refusing to start.
    pub fn from_settings(
        max_offers_per_page: usize,
        rating_threshold: f64,
        strategy: &str,
        performance_metric: &str,
        cache_ttl: Duration,
    ) -> Self {
        let strategy = RankStrategy::from_str(strategy).unwrap_or_else(|err| {
            warn!(%err, "falling back to performance strategy");
            RankStrategy::Performance
        });
        let performance_metric =
            PerformanceMetric::from_str(performance_metric).unwrap_or_else(|err| {
                warn!(%err, "falling back to revenue metric");
                PerformanceMetric::Revenue
            });
        Self {
            max_offers_per_page,
            rating_threshold,
            strategy,
            performance_metric,
            cache_ttl,
        }
    }
}

/// What a `get_offers` call served and how it was produced.
#[derive(Debug, Clone, Serialize)]
pub struct SelectionResult {
    pub offers: Vec<Offer>,
    pub strategy: RankStrategy,
    pub filters_applied: Vec<String>,
    pub cache_hit: bool,
    pub generated_at: DateTime<Utc>,
}

/// Context-aware filter, rank, cache and rotate pipeline. One instance is
/// shared between request handlers and the rotation task.
pub struct SelectionEngine {
    offers: Arc<dyn OfferRepository>,
    rules: Arc<dyn RuleRepository>,
    analytics: Arc<dyn AnalyticsSink>,
    cache: SelectionCache,
    opts: SelectionOptions,
}

impl SelectionEngine {
    pub fn new(
        offers: Arc<dyn OfferRepository>,
        rules: Arc<dyn RuleRepository>,
        analytics: Arc<dyn AnalyticsSink>,
        opts: SelectionOptions,
    ) -> Self {
        let cache = SelectionCache::new(opts.cache_ttl);
        Self {
            offers,
            rules,
            analytics,
            cache,
            opts,
        }
    }

    /// Serve a ranked, bounded offer list for the given context. Fetch
    /// failures degrade to the last cached baseline slice; the caller never
    /// sees an error.
    pub async fn get_offers(&self, context: &SelectionContext) -> SelectionResult {
        let key = context.cache_key();

        if let Some(cached) = self.cache.get(&key).await {
            let offers = self.display_slice(cached);
            debug!(context_key = %key, count = offers.len(), "serving offers from cache");
            return self.finish(key, offers, Vec::new(), true);
        }

        let (ranked, filters) = match self.build_slice(context).await {
            Ok(built) => built,
            Err(err) => {
                warn!(context_key = %key, error = %err, "candidate fetch failed, degrading to cached baseline");
                let fallback = self
                    .cache
                    .get_stale(&SelectionContext::default().cache_key())
                    .await
                    .unwrap_or_default();
                let offers = self.display_slice(fallback);
                return self.finish(key, offers, vec!["degraded".to_string()], false);
            }
        };

        self.cache.put(key.clone(), ranked.clone()).await;
        let offers = self.display_slice(ranked);
        self.finish(key, offers, filters, false)
    }

    /// Invalidate every cached slice. Called when display rules change.
    pub async fn invalidate(&self) {
        self.cache.clear().await;
    }

    /// Rotation tick: clear the cache in one swap, then eagerly warm the
    /// baseline slice and one slice per category seen in the catalog.
    /// Returns the number of slices warmed.
    pub async fn rotate(&self) -> Result<usize, RepoError> {
        self.cache.clear().await;

        let baseline_ctx = SelectionContext::default();
        let (baseline, _) = self.build_slice(&baseline_ctx).await?;

        let mut categories: Vec<String> = baseline
            .iter()
            .filter_map(|o| o.category.clone())
            .map(|c| c.to_lowercase())
            .collect();
        categories.sort();
        categories.dedup();

        let mut warmed = 1;
        self.cache
            .put(baseline_ctx.cache_key(), baseline.clone())
            .await;
        for category in categories {
            let slice: Vec<Offer> = baseline
                .iter()
                .filter(|o| {
                    o.category
                        .as_deref()
                        .is_some_and(|c| c.eq_ignore_ascii_case(&category))
                })
                .cloned()
                .collect();
            let ctx = SelectionContext {
                category: Some(category),
                ..Default::default()
            };
            self.cache.put(ctx.cache_key(), slice).await;
            warmed += 1;
        }
        debug!(slices = warmed, "rotated selection cache");
        Ok(warmed)
    }

    /// Fetch, hard-filter, soft-narrow and rank the full candidate list for
    /// a context. The returned list is uncapped; capping and display
    /// shuffling happen at serve time.
    async fn build_slice(
        &self,
        context: &SelectionContext,
    ) -> Result<(Vec<Offer>, Vec<String>), RepoError> {
        let candidates = self.offers.list_active_offers().await?;
        let rules = self.rules.list_active_rules().await?;
        let now = Utc::now();

        let mut offers: Vec<Offer> = candidates
            .into_iter()
            .filter(|o| o.is_active)
            .filter(|o| o.rating.map_or(true, |r| r >= self.opts.rating_threshold))
            .filter(|o| o.is_within_validity(now))
            .filter(|o| ComplianceEngine::evaluate(o, &rules).is_compliant)
            .collect();
        let mut filters = vec![
            "active".to_string(),
            "rating".to_string(),
            "validity".to_string(),
            "compliance".to_string(),
        ];

        if let Some(category) = normalized(&context.category) {
            if narrow(&mut offers, |o| {
                o.category
                    .as_deref()
                    .is_some_and(|c| c.eq_ignore_ascii_case(&category))
            }) {
                filters.push("category".to_string());
            }
        }

        if let Some(archetype) = normalized(&context.archetype) {
            if narrow(&mut offers, |o| {
                o.emotion
                    .as_deref()
                    .is_some_and(|e| e.eq_ignore_ascii_case(&archetype))
                    || o.tags.iter().any(|t| t.eq_ignore_ascii_case(&archetype))
            }) {
                filters.push("archetype".to_string());
            }
        }

        if let Some(topic) = normalized(&context.topic) {
            if narrow(&mut offers, |o| {
                o.title.to_lowercase().contains(&topic)
                    || o.tags.iter().any(|t| t.to_lowercase().contains(&topic))
            }) {
                filters.push("topic".to_string());
            }
        }

        ranker::rank(&mut offers, self.opts.strategy, self.opts.performance_metric);
        Ok((offers, filters))
    }

    /// Cap the ranked slice at the page size, then randomize display order
    /// inside that window.
    fn display_slice(&self, mut offers: Vec<Offer>) -> Vec<Offer> {
        offers.truncate(self.opts.max_offers_per_page);
        offers.shuffle(&mut rand::thread_rng());
        offers
    }

    fn finish(
        &self,
        key: String,
        offers: Vec<Offer>,
        filters_applied: Vec<String>,
        cache_hit: bool,
    ) -> SelectionResult {
        self.analytics
            .publish(AnalyticsEvent::OffersServed(OffersServedEvent {
                context_key: key,
                offer_count: offers.len(),
                strategy: self.opts.strategy.as_str().to_string(),
                cache_hit,
                timestamp: Utc::now().timestamp(),
            }));
        SelectionResult {
            offers,
            strategy: self.opts.strategy,
            filters_applied,
            cache_hit,
            generated_at: Utc::now(),
        }
    }
}

fn normalized(field: &Option<String>) -> Option<String> {
    field
        .as_deref()
        .map(|v| v.trim().to_lowercase())
        .filter(|v| !v.is_empty())
}

/// Keep the filtered set only when it is non-empty; an empty match keeps the
/// previous set untouched. Returns whether the filter narrowed anything.
fn narrow<F>(offers: &mut Vec<Offer>, pred: F) -> bool
where
    F: Fn(&Offer) -> bool,
{
    let matched: Vec<Offer> = offers.iter().filter(|o| pred(o)).cloned().collect();
    if matched.is_empty() {
        false
    } else {
        *offers = matched;
        true
    }
}
