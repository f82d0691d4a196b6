use axum::{
    http::Method,
    routing::{get, post},
    Json, Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod compliance;
pub mod error;
pub mod offers;
pub mod state;
pub mod sync;
pub mod tracking;

pub use state::AppState;

pub fn app(state: AppState) -> Router {
    // CORS Middleware
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            axum::http::header::CONTENT_TYPE,
            axum::http::header::USER_AGENT,
        ]);

    Router::new()
        .route("/health", get(health))
        .route("/offers", get(offers::get_offers).post(offers::post_offers))
        .route("/click", post(tracking::track_click))
        .route("/redirect/{slug}", get(tracking::redirect))
        .route("/conversion", post(tracking::track_conversion))
        .route("/stats/{offer_id}", get(tracking::offer_stats))
        .route("/sync/{source_id}", post(sync::sync_source))
        .route("/compliance/{offer_id}", get(compliance::check_offer))
        .route("/compliance/{offer_id}/fix", post(compliance::fix_offer))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}
