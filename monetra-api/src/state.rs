use std::sync::Arc;

use monetra_compliance::ComplianceEngine;
use monetra_selection::SelectionEngine;
use monetra_sync::SyncOrchestrator;
use monetra_tracking::{ClickTracker, ConversionTracker, RedirectResolver, StatsService};

#[derive(Clone)]
pub struct AppState {
    pub selection: Arc<SelectionEngine>,
    pub clicks: Arc<ClickTracker>,
    pub redirects: Arc<RedirectResolver>,
    pub conversions: Arc<ConversionTracker>,
    pub stats: Arc<StatsService>,
    pub compliance: Arc<ComplianceEngine>,
    pub sync: Arc<SyncOrchestrator>,
}
