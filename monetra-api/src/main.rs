use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast::error::RecvError;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use monetra_api::{app, AppState};
use monetra_compliance::ComplianceEngine;
use monetra_selection::{RotationScheduler, SelectionEngine, SelectionOptions};
use monetra_shared::AnalyticsSink;
use monetra_store::click_repo::PostgresClickRepository;
use monetra_store::offer_repo::PostgresOfferRepository;
use monetra_store::rule_repo::PostgresRuleRepository;
use monetra_store::source_repo::PostgresSourceRepository;
use monetra_store::{AnalyticsProducer, Config, DbClient};
use monetra_sync::{PluginRegistry, SyncOrchestrator};
use monetra_tracking::{ClickTracker, ConversionTracker, RedirectResolver, StatsService};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "monetra_api=debug,tower_http=debug,axum::rejection=trace".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load().expect("Failed to load config");
    tracing::info!("Starting Monetra API on port {}", config.server.port);

    let db = DbClient::new(&config.database.url, config.database.max_connections)
        .await
        .expect("Failed to connect to Postgres");
    db.migrate().await.expect("Failed to run migrations");

    let offers = Arc::new(PostgresOfferRepository {
        pool: db.pool.clone(),
    });
    let clicks = Arc::new(PostgresClickRepository {
        pool: db.pool.clone(),
    });
    let sources = Arc::new(PostgresSourceRepository {
        pool: db.pool.clone(),
    });
    let rules = Arc::new(PostgresRuleRepository {
        pool: db.pool.clone(),
    });

    let producer = AnalyticsProducer::new(config.analytics.channel_capacity);
    spawn_analytics_logger(&producer);
    let analytics: Arc<dyn AnalyticsSink> = Arc::new(producer);

    let selection_opts = SelectionOptions::from_settings(
        config.selection.max_offers_per_page,
        config.selection.rating_threshold,
        &config.selection.strategy,
        &config.selection.performance_metric,
        Duration::from_secs(config.selection.cache_ttl_secs),
    );
    let selection = Arc::new(SelectionEngine::new(
        offers.clone(),
        rules.clone(),
        analytics.clone(),
        selection_opts,
    ));
    let _rotation = RotationScheduler::start(
        selection.clone(),
        Duration::from_secs(config.selection.rotation_interval_secs),
    );

    let registry = Arc::new(PluginRegistry::with_defaults());

    let state = AppState {
        selection,
        clicks: Arc::new(ClickTracker::new(
            offers.clone(),
            clicks.clone(),
            analytics.clone(),
            config.server.base_url.clone(),
        )),
        redirects: Arc::new(RedirectResolver::new(offers.clone(), clicks.clone())),
        conversions: Arc::new(ConversionTracker::new(
            offers.clone(),
            clicks.clone(),
            analytics.clone(),
        )),
        stats: Arc::new(StatsService::new(offers.clone(), clicks.clone())),
        compliance: Arc::new(ComplianceEngine::new(offers.clone(), rules.clone())),
        sync: Arc::new(SyncOrchestrator::new(registry, offers, sources, analytics)),
    };

    let app = app(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}

/// Drains the analytics channel into the log so events are visible even
/// without a downstream consumer attached.
fn spawn_analytics_logger(producer: &AnalyticsProducer) {
    let mut rx = producer.subscribe();
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(event) => tracing::debug!(?event, "analytics event"),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "analytics logger lagged")
                }
                Err(RecvError::Closed) => break,
            }
        }
    });
}
