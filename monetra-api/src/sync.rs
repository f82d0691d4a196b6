use axum::{
    extract::{Path, State},
    Json,
};
use uuid::Uuid;

use monetra_core::SyncReport;

use crate::error::AppError;
use crate::state::AppState;

/// POST /sync/{source_id}
/// Runs one source sync inline and returns its report. A refreshed catalog
/// invalidates every cached selection slice.
pub async fn sync_source(
    State(state): State<AppState>,
    Path(source_id): Path<Uuid>,
) -> Result<Json<SyncReport>, AppError> {
    let report = state.sync.sync_source(source_id).await?;
    state.selection.invalidate().await;
    Ok(Json(report))
}
