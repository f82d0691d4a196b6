pub mod conversion;
pub mod redirect;
pub mod stats;
pub mod tracker;

pub use conversion::{ClickRef, Conversion, ConversionTracker};
pub use redirect::{RedirectResolver, ResolvedRedirect};
pub use stats::{DailyStats, OfferStats, StatsService};
pub use tracker::{ClickTracker, TrackedClick};

use monetra_core::repository::RepoError;

#[derive(Debug, thiserror::Error)]
pub enum TrackingError {
    #[error("offer '{0}' not found or inactive")]
    OfferNotFound(String),
    #[error("no click found for '{0}'")]
    ClickNotFound(String),
    #[error("invalid tracking url: {0}")]
    Url(#[from] url::ParseError),
    #[error("base url cannot carry path segments")]
    CannotBeABase,
    #[error("storage failure: {0}")]
    Storage(#[from] RepoError),
}
