pub mod orchestrator;
pub mod plugins;
pub mod registry;

pub use orchestrator::{SyncError, SyncOrchestrator};
pub use registry::PluginRegistry;
