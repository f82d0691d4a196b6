use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

use monetra_tracking::{ClickRef, Conversion, OfferStats, TrackedClick};

use crate::error::AppError;
use crate::state::AppState;

// ============================================================================
// Request Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct TrackClickRequest {
    pub offer_id: Uuid,
    pub session_id: String,
    pub user_id: Option<String>,
    pub page_slug: Option<String>,
    #[serde(default)]
    pub context: serde_json::Value,
}

#[derive(Debug, Deserialize)]
pub struct TrackConversionRequest {
    pub click_id: Option<Uuid>,
    pub session_id: Option<String>,
    pub conversion_value: f64,
    pub conversion_type: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StatsWindow {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /click
pub async fn track_click(
    State(state): State<AppState>,
    Json(req): Json<TrackClickRequest>,
) -> Result<Json<TrackedClick>, AppError> {
    let tracked = state
        .clicks
        .track_click(
            req.offer_id,
            req.session_id,
            req.user_id,
            req.page_slug,
            req.context,
        )
        .await?;
    Ok(Json(tracked))
}

/// GET /redirect/{slug}
/// 302 to the merchant with every inbound query parameter preserved.
pub async fn redirect(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Query(params): Query<Vec<(String, String)>>,
) -> Result<Response, AppError> {
    let resolved = state.redirects.resolve(&slug, &params).await?;
    Ok((StatusCode::FOUND, [(header::LOCATION, resolved.location)]).into_response())
}

/// POST /conversion
/// Accepts a click id or falls back to session attribution.
pub async fn track_conversion(
    State(state): State<AppState>,
    Json(req): Json<TrackConversionRequest>,
) -> Result<Json<Conversion>, AppError> {
    let click_ref = match (req.click_id, req.session_id) {
        (Some(id), _) => ClickRef::Id(id),
        (None, Some(session)) => ClickRef::Session(session),
        (None, None) => {
            return Err(AppError::ValidationError(
                "click_id or session_id is required".to_string(),
            ))
        }
    };

    let conversion = state
        .conversions
        .track_conversion(click_ref, req.conversion_value, req.conversion_type)
        .await?;
    Ok(Json(conversion))
}

/// GET /stats/{offer_id}?from&to
pub async fn offer_stats(
    State(state): State<AppState>,
    Path(offer_id): Path<Uuid>,
    Query(window): Query<StatsWindow>,
) -> Result<Json<OfferStats>, AppError> {
    let stats = state
        .stats
        .offer_stats(offer_id, window.from, window.to)
        .await?;
    Ok(Json(stats))
}
