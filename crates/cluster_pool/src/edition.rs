use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};

/// Inferred NGINX Gateway Fabric edition, cached with an asymmetric TTL since
/// a mis-detected `Community` result is cheap to revisit but an `Enterprise`
/// determination is stable for the life of the cluster (§4.1 "Edition cache").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Edition {
    Community,
    Enterprise,
    Unknown,
}

impl Edition {
    fn ttl(self) -> Duration {
        match self {
            Edition::Unknown => Duration::from_secs(5),
            Edition::Community => Duration::from_secs(30),
            Edition::Enterprise => Duration::from_secs(300),
        }
    }
}

impl std::fmt::Display for Edition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Edition::Community => "community",
            Edition::Enterprise => "enterprise",
            Edition::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

struct CacheEntry {
    edition: Edition,
    expires_at: Instant,
}

/// Per-cluster edition cache. One instance shared by the health supervisor;
/// keyed by cluster name (§4.1).
#[derive(Default)]
pub struct EditionCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
}

impl EditionCache {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the cached edition for `cluster` if its TTL has not elapsed.
    pub fn get(&self, cluster: &str) -> Option<Edition> {
        let entries = self.entries.read().expect("edition cache lock poisoned");
        entries.get(cluster).and_then(|entry| {
            if Instant::now() < entry.expires_at {
                Some(entry.edition)
            } else {
                None
            }
        })
    }

    /// Records a freshly determined edition, starting its TTL from now.
    pub fn set(&self, cluster: &str, edition: Edition) {
        let mut entries = self.entries.write().expect("edition cache lock poisoned");
        entries.insert(
            cluster.to_string(),
            CacheEntry {
                edition,
                expires_at: Instant::now() + edition.ttl(),
            },
        );
    }

    pub fn remove(&self, cluster: &str) {
        self.entries.write().expect("edition cache lock poisoned").remove(cluster);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn miss_on_empty_cache() {
        let cache = EditionCache::new();
        assert_eq!(cache.get("prod-a"), None);
    }

    #[test]
    fn hit_immediately_after_set() {
        let cache = EditionCache::new();
        cache.set("prod-a", Edition::Enterprise);
        assert_eq!(cache.get("prod-a"), Some(Edition::Enterprise));
    }

    #[test]
    fn unknown_entries_expire_quickly() {
        let cache = EditionCache::new();
        cache.set("prod-a", Edition::Unknown);
        std::thread::sleep(Duration::from_millis(10));

        let mut entries = cache.entries.write().unwrap();
        entries.get_mut("prod-a").unwrap().expires_at = Instant::now() - Duration::from_millis(1);
        drop(entries);

        assert_eq!(cache.get("prod-a"), None);
    }

    #[test]
    fn remove_clears_entry() {
        let cache = EditionCache::new();
        cache.set("prod-a", Edition::Community);
        cache.remove("prod-a");
        assert_eq!(cache.get("prod-a"), None);
    }
}
