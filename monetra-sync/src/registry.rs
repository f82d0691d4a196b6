use std::collections::HashMap;
use std::sync::Arc;

use monetra_core::SourcePlugin;

use crate::plugins::{AmazonPartnersPlugin, DigistorePlugin};

/// Slug-keyed lookup of source plugins. Adding a network means registering
/// another implementation here; the orchestrator stays untouched.
pub struct PluginRegistry {
    plugins: HashMap<String, Arc<dyn SourcePlugin>>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self {
            plugins: HashMap::new(),
        }
    }

    /// Registry preloaded with the built-in network plugins.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(AmazonPartnersPlugin::new()));
        registry.register(Arc::new(DigistorePlugin::new()));
        registry
    }

    pub fn register(&mut self, plugin: Arc<dyn SourcePlugin>) {
        self.plugins.insert(plugin.slug().to_string(), plugin);
    }

    pub fn get(&self, slug: &str) -> Option<Arc<dyn SourcePlugin>> {
        self.plugins.get(slug).cloned()
    }

    pub fn slugs(&self) -> Vec<String> {
        let mut slugs: Vec<String> = self.plugins.keys().cloned().collect();
        slugs.sort();
        slugs
    }
}

impl Default for PluginRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_registry_exposes_builtin_plugins() {
        let registry = PluginRegistry::with_defaults();
        assert_eq!(registry.slugs(), vec!["amazon_partners", "digistore"]);
        assert!(registry.get("amazon_partners").is_some());
        assert!(registry.get("unknown_network").is_none());
    }
}
