pub mod models;
pub mod pii;

pub use models::events::{AnalyticsEvent, AnalyticsSink};
pub use pii::Masked;
