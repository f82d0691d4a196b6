pub mod click;
pub mod context;
pub mod offer;
pub mod plugin;
pub mod repository;
pub mod scoring;
pub mod source;

pub use click::Click;
pub use context::SelectionContext;
pub use offer::Offer;
pub use plugin::{PluginError, RawOffer, SourcePlugin, SyncReport};
pub use source::{Source, SyncStatus};
