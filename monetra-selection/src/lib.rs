pub mod cache;
pub mod cloak;
pub mod engine;
pub mod ranker;
pub mod rotation;

pub use cache::SelectionCache;
pub use cloak::{cloaked_link, CloakError};
pub use engine::{SelectionEngine, SelectionOptions, SelectionResult};
pub use ranker::{PerformanceMetric, RankStrategy};
pub use rotation::RotationScheduler;
