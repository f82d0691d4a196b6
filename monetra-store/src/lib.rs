pub mod app_config;
pub mod click_repo;
pub mod database;
pub mod events;
pub mod memory;
pub mod offer_repo;
pub mod rule_repo;
pub mod source_repo;

pub use app_config::Config;
pub use database::DbClient;
pub use events::AnalyticsProducer;
