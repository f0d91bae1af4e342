//! Bounded artifact store.
//!
//! LRU over content-addressed keys with a byte-size ceiling and a per-entry
//! TTL. Entries are immutable: a `put` for an existing key is ignored.

use std::sync::Mutex;
use std::time::{Duration, Instant};

use lru::LruCache;

use dg_core::RenderedArtifact;

/// A finished artifact as stored in the cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedEntry {
    /// The rendered artifact.
    pub artifact: RenderedArtifact,
    /// Public URL, when the artifact was uploaded.
    pub public_url: Option<String>,
    /// Strategy that produced the artifact (`svg_template`, `mermaid`,
    /// `chart`).
    pub generation_method: String,
}

struct StoredEntry {
    entry: CachedEntry,
    inserted_at: Instant,
    size: usize,
}

struct CacheInner {
    map: LruCache<String, StoredEntry>,
    bytes: usize,
}

/// Bounded, TTL-evicting artifact cache.
pub struct DiagramCache {
    inner: Mutex<CacheInner>,
    max_bytes: usize,
    ttl: Duration,
}

impl DiagramCache {
    /// Create a cache with the given byte ceiling and entry TTL.
    #[must_use]
    pub fn new(max_bytes: usize, ttl: Duration) -> Self {
        Self {
            inner: Mutex::new(CacheInner {
                map: LruCache::unbounded(),
                bytes: 0,
            }),
            max_bytes,
            ttl,
        }
    }

    /// Look up an entry, refreshing its LRU position.
    ///
    /// Expired entries are removed and reported as misses.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<CachedEntry> {
        let mut inner = self.inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let expired = inner
            .map
            .get(key)
            .is_some_and(|stored| stored.inserted_at.elapsed() >= self.ttl);
        if expired {
            if let Some(stored) = inner.map.pop(key) {
                inner.bytes -= stored.size;
            }
            return None;
        }
        inner.map.get(key).map(|stored| stored.entry.clone())
    }

    /// Insert an entry.
    ///
    /// Idempotent: if the key is already present the existing entry wins.
    /// Evicts least-recently-used entries until the byte ceiling holds.
    pub fn put(&self, key: &str, entry: CachedEntry) {
        let mut inner = self.inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        if inner.map.contains(key) {
            return;
        }

        let size = key.len()
            + entry.artifact.size()
            + entry.generation_method.len()
            + entry.public_url.as_ref().map_or(0, String::len);
        inner.map.push(
            key.to_owned(),
            StoredEntry {
                entry,
                inserted_at: Instant::now(),
                size,
            },
        );
        inner.bytes += size;

        while inner.bytes > self.max_bytes {
            let Some((_, evicted)) = inner.map.pop_lru() else {
                break;
            };
            inner.bytes -= evicted.size;
        }
    }

    /// Number of cached entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .map
            .len()
    }

    /// Whether the cache is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total bytes currently held.
    #[must_use]
    pub fn bytes(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .bytes
    }
}

#[cfg(test)]
mod tests {
    use dg_core::OutputType;
    use pretty_assertions::assert_eq;

    use super::*;

    fn entry(body: &str) -> CachedEntry {
        CachedEntry {
            artifact: RenderedArtifact::svg(body.to_owned(), OutputType::Svg),
            public_url: None,
            generation_method: "svg_template".to_owned(),
        }
    }

    fn cache() -> DiagramCache {
        DiagramCache::new(1024 * 1024, Duration::from_secs(3600))
    }

    #[test]
    fn test_put_get_round_trip() {
        let cache = cache();
        cache.put("k1", entry("<svg>one</svg>"));
        assert_eq!(cache.get("k1"), Some(entry("<svg>one</svg>")));
        assert_eq!(cache.get("k2"), None);
    }

    #[test]
    fn test_put_is_idempotent() {
        let cache = cache();
        cache.put("k", entry("first"));
        cache.put("k", entry("second"));
        // First write wins, entries are immutable
        assert_eq!(cache.get("k"), Some(entry("first")));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_byte_ceiling_evicts_lru() {
        // Each entry is 38 bytes; a 120-byte ceiling holds three
        let cache = DiagramCache::new(120, Duration::from_secs(3600));
        cache.put("a", entry("0123456789012345678901234"));
        cache.put("b", entry("0123456789012345678901234"));
        cache.put("c", entry("0123456789012345678901234"));
        cache.put("d", entry("0123456789012345678901234"));
        assert!(cache.bytes() <= 120);
        // The oldest key was evicted
        assert_eq!(cache.get("a"), None);
        assert!(cache.get("d").is_some());
    }

    #[test]
    fn test_ttl_expiry() {
        let cache = DiagramCache::new(1024, Duration::from_millis(10));
        cache.put("k", entry("soon gone"));
        assert!(cache.get("k").is_some());
        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(cache.get("k"), None);
        assert_eq!(cache.len(), 0);
        assert_eq!(cache.bytes(), 0);
    }

    #[test]
    fn test_get_refreshes_recency() {
        let cache = DiagramCache::new(120, Duration::from_secs(3600));
        cache.put("a", entry("0123456789012345678901234"));
        cache.put("b", entry("0123456789012345678901234"));
        cache.put("c", entry("0123456789012345678901234"));
        // Touch "a" so "b" becomes the eviction candidate
        let _ = cache.get("a");
        cache.put("d", entry("0123456789012345678901234"));
        assert!(cache.get("a").is_some());
        assert_eq!(cache.get("b"), None);
    }
}
