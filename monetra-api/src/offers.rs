use axum::{
    extract::{Query, State},
    Json,
};

use monetra_core::SelectionContext;
use monetra_selection::SelectionResult;

use crate::state::AppState;

/// GET /offers
/// Context dimensions arrive as query parameters, e.g. `?category=fitness`.
pub async fn get_offers(
    State(state): State<AppState>,
    Query(context): Query<SelectionContext>,
) -> Json<SelectionResult> {
    Json(state.selection.get_offers(&context).await)
}

/// POST /offers
/// Same selection pipeline, but the context comes as a JSON body so callers
/// can attach quiz results.
pub async fn post_offers(
    State(state): State<AppState>,
    Json(context): Json<SelectionContext>,
) -> Json<SelectionResult> {
    Json(state.selection.get_offers(&context).await)
}
