//! Page cache storage.
//!
//! Rendered responses keyed by [`PageKey`], each carrying its own deadline.
//! Expired entries are dropped lazily on the next lookup.

use std::sync::RwLock;
use std::time::{Duration, Instant};

use bytes::Bytes;
use lru::LruCache;

use super::config::CacheConfig;
use super::keys::PageKey;
use super::lock::{rw_read, rw_write};

const SOURCE: &str = "cache::store";

/// Cached HTTP response.
#[derive(Clone)]
pub struct CachedResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
}

struct Entry {
    response: CachedResponse,
    expires_at: Instant,
}

/// Page cache storage for rendered listing responses.
pub struct PageCache {
    entries: RwLock<LruCache<PageKey, Entry>>,
}

impl PageCache {
    /// Create a new page cache with the given configuration.
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            entries: RwLock::new(LruCache::new(config.response_limit_non_zero())),
        }
    }

    /// Look up a still-valid entry. An expired entry is removed and treated
    /// as a miss.
    pub fn get(&self, key: &PageKey) -> Option<CachedResponse> {
        let mut entries = rw_write(&self.entries, SOURCE, "get");
        match entries.get(key) {
            Some(entry) if entry.expires_at > Instant::now() => Some(entry.response.clone()),
            Some(_) => {
                entries.pop(key);
                None
            }
            None => None,
        }
    }

    pub fn set(&self, key: PageKey, response: CachedResponse, ttl: Duration) {
        let entry = Entry {
            response,
            expires_at: Instant::now() + ttl,
        };
        rw_write(&self.entries, SOURCE, "set").put(key, entry);
    }

    /// Drop every cached response.
    pub fn clear(&self) {
        rw_write(&self.entries, SOURCE, "clear").clear();
    }

    /// Get the number of cached responses.
    pub fn len(&self) -> usize {
        rw_read(&self.entries, SOURCE, "len").len()
    }

    /// Check if the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
