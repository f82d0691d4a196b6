use std::collections::HashMap;
use std::time::{Duration, Instant};

use tokio::sync::RwLock;

use monetra_core::Offer;

struct Entry {
    offers: Vec<Offer>,
    cached_at: Instant,
}

/// Keyed store of ranked offer slices with a fixed TTL. Concurrent handlers
/// and the rotation task share one instance; repopulation races are benign
/// because recomputation is idempotent and last write wins.
pub struct SelectionCache {
    ttl: Duration,
    entries: RwLock<HashMap<String, Entry>>,
}

impl SelectionCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Fetch a slice that is still inside its TTL.
    pub async fn get(&self, key: &str) -> Option<Vec<Offer>> {
        let entries = self.entries.read().await;
        entries
            .get(key)
            .filter(|e| e.cached_at.elapsed() < self.ttl)
            .map(|e| e.offers.clone())
    }

    /// Fetch a slice regardless of age. Degraded serving path when a fresh
    /// candidate fetch fails.
    pub async fn get_stale(&self, key: &str) -> Option<Vec<Offer>> {
        let entries = self.entries.read().await;
        entries.get(key).map(|e| e.offers.clone())
    }

    pub async fn put(&self, key: String, offers: Vec<Offer>) {
        let mut entries = self.entries.write().await;
        entries.insert(
            key,
            Entry {
                offers,
                cached_at: Instant::now(),
            },
        );
    }

    /// Drop every entry in one swap so readers never observe a
    /// partially-cleared map.
    pub async fn clear(&self) {
        let mut entries = self.entries.write().await;
        *entries = HashMap::new();
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}
