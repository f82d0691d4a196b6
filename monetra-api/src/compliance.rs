use axum::{
    extract::{Path, State},
    Json,
};
use uuid::Uuid;

use monetra_compliance::{ComplianceReport, FixReport};

use crate::error::AppError;
use crate::state::AppState;

/// GET /compliance/{offer_id}
pub async fn check_offer(
    State(state): State<AppState>,
    Path(offer_id): Path<Uuid>,
) -> Result<Json<ComplianceReport>, AppError> {
    let report = state.compliance.check_offer(offer_id).await?;
    Ok(Json(report))
}

/// POST /compliance/{offer_id}/fix
/// A fix that changed the offer makes cached selection slices stale.
pub async fn fix_offer(
    State(state): State<AppState>,
    Path(offer_id): Path<Uuid>,
) -> Result<Json<FixReport>, AppError> {
    let report = state.compliance.auto_fix(offer_id).await?;
    if report.changed {
        state.selection.invalidate().await;
    }
    Ok(Json(report))
}
