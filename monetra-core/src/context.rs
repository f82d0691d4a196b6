use serde::{Deserialize, Serialize};

/// Visitor context driving offer selection. All fields are optional; absent
/// dimensions fall back to broad defaults when building the cache key.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SelectionContext {
    pub category: Option<String>,
    pub archetype: Option<String>,
    pub topic: Option<String>,
    pub experience_level: Option<String>,
    pub device: Option<String>,
    /// Raw quiz answers, forwarded to ranking strategies that use them.
    #[serde(default)]
    pub quiz_results: serde_json::Value,
}

impl SelectionContext {
    /// Canonical cache key for this context. Two contexts that differ only in
    /// casing or in fields outside the key dimensions share a cache slot.
    pub fn cache_key(&self) -> String {
        let part = |value: &Option<String>, fallback: &str| {
            value
                .as_deref()
                .map(|v| v.trim().to_lowercase())
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| fallback.to_string())
        };
        format!(
            "{}|{}|{}|{}",
            part(&self.category, "all"),
            part(&self.archetype, "general"),
            part(&self.topic, "general"),
            part(&self.experience_level, "all"),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_key_defaults_for_empty_context() {
        let ctx = SelectionContext::default();
        assert_eq!(ctx.cache_key(), "all|general|general|all");
    }

    #[test]
    fn cache_key_is_case_insensitive() {
        let upper = SelectionContext {
            category: Some("Fitness".to_string()),
            archetype: Some("ACHIEVER".to_string()),
            ..Default::default()
        };
        let lower = SelectionContext {
            category: Some("fitness".to_string()),
            archetype: Some("achiever".to_string()),
            ..Default::default()
        };
        assert_eq!(upper.cache_key(), lower.cache_key());
    }

    #[test]
    fn cache_key_ignores_device_and_quiz() {
        let a = SelectionContext {
            category: Some("travel".to_string()),
            device: Some("mobile".to_string()),
            quiz_results: serde_json::json!({"q1": "b"}),
            ..Default::default()
        };
        let b = SelectionContext {
            category: Some("travel".to_string()),
            ..Default::default()
        };
        assert_eq!(a.cache_key(), b.cache_key());
    }
}
