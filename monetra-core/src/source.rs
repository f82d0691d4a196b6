use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Outcome of the most recent sync for a source.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SyncStatus {
    Never,
    Ok,
    Failed,
}

impl std::fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SyncStatus::Never => "NEVER",
            SyncStatus::Ok => "OK",
            SyncStatus::Failed => "FAILED",
        };
        f.write_str(s)
    }
}

impl std::str::FromStr for SyncStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "NEVER" => Ok(SyncStatus::Never),
            "OK" => Ok(SyncStatus::Ok),
            "FAILED" => Ok(SyncStatus::Failed),
            other => Err(format!("unknown sync status '{other}'")),
        }
    }
}

/// A configured upstream offer source bound to a plugin.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Source {
    pub id: Uuid,
    pub plugin_slug: String,
    pub name: String,
    /// Plugin-specific configuration, validated by the plugin on initialize.
    pub config: serde_json::Value,
    pub is_active: bool,
    pub last_synced_at: Option<DateTime<Utc>>,
    pub last_sync_status: SyncStatus,
    pub last_sync_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Source {
    pub fn new(plugin_slug: String, name: String, config: serde_json::Value) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            plugin_slug,
            name,
            config,
            is_active: true,
            last_synced_at: None,
            last_sync_status: SyncStatus::Never,
            last_sync_error: None,
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_source_has_never_synced() {
        let source = Source::new(
            "amazon_partners".to_string(),
            "Amazon DE".to_string(),
            serde_json::json!({"partner_tag": "monetra-21"}),
        );
        assert_eq!(source.last_sync_status, SyncStatus::Never);
        assert!(source.last_synced_at.is_none());
        assert!(source.is_active);
    }
}
