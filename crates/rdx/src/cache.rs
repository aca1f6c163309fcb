//! 🗄️ Response cache: remembers what the API said so we don't ask twice in a row.
//!
//! 🎬 *[Morty asks the same question again. Rick burps. Rick answers from memory.]*
//!
//! The cache is a service object handed to the [`ApiClient`](crate::pipeline::ApiClient)
//! rather than a process-wide global, so every test gets a fresh, private one and
//! nobody's leftovers leak into anybody else's assertions. 🦆
//!
//! 🧠 Knowledge graph:
//! - Keys are full request URLs. Values are raw (pre-validation) JSON bodies.
//! - `get` drops an expired entry on sight, and every `set` sweeps out the rest.
//! - A TTL too large to add to "now" means the entry never expires.
//! - Only successful fetches get stored. Errors are not worth remembering.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde_json::Value;
use tokio::time::Instant;
use tracing::trace;

/// 🗄️ Anything that can hold responses for a while.
pub trait ResponseCache: Send + Sync + std::fmt::Debug {
    fn get(&self, key: &str) -> Option<Value>;
    fn set(&self, key: &str, value: Value, ttl: Duration);
    fn clear(&self);
}

/// ⏳ In-memory TTL cache. Clone it freely; clones share the same map.
#[derive(Debug, Default, Clone)]
pub struct TtlCache {
    entries: Arc<Mutex<HashMap<String, Entry>>>,
}

#[derive(Debug)]
struct Entry {
    value: Value,
    // -- ♾️ None = forever
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.is_none_or(|deadline| now < deadline)
    }
}

impl TtlCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// 📊 Entry count. Expired entries linger until the next `set` or a `get` on them.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Entry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ResponseCache for TtlCache {
    fn get(&self, key: &str) -> Option<Value> {
        let mut entries = self.lock();
        match entries.get(key) {
            Some(entry) if entry.is_live(Instant::now()) => {
                trace!(key, "🗄️ cache hit");
                Some(entry.value.clone())
            }
            Some(_) => {
                // -- 🗑️ stale. evict on sight.
                entries.remove(key);
                trace!(key, "⌛ cache entry expired");
                None
            }
            None => None,
        }
    }

    fn set(&self, key: &str, value: Value, ttl: Duration) {
        let now = Instant::now();
        let mut entries = self.lock();
        let before = entries.len();
        entries.retain(|_, entry| entry.is_live(now));
        if entries.len() < before {
            trace!(swept = before - entries.len(), "🧹 swept expired cache entries");
        }
        entries.insert(
            key.to_string(),
            Entry {
                value,
                expires_at: now.checked_add(ttl),
            },
        );
    }

    fn clear(&self) {
        self.lock().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test(start_paused = true)]
    async fn the_one_where_entries_expire_after_their_ttl() {
        let cache = TtlCache::new();
        cache.set("k", json!({"rick": true}), Duration::from_secs(5));
        assert_eq!(cache.get("k"), Some(json!({"rick": true})));

        tokio::time::advance(Duration::from_secs(6)).await;
        assert_eq!(cache.get("k"), None);
        assert!(cache.is_empty(), "expired entry should be evicted on read");
    }

    #[test]
    fn the_one_where_clear_forgets_everything() {
        let cache = TtlCache::new();
        cache.set("a", json!(1), Duration::from_secs(60));
        cache.set("b", json!(2), Duration::from_secs(60));
        assert_eq!(cache.len(), 2);
        cache.clear();
        assert_eq!(cache.get("a"), None);
        assert!(cache.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn the_one_where_old_searches_do_not_pile_up() {
        let cache = TtlCache::new();
        for i in 0..1_000 {
            cache.set(&format!("page-{i}"), json!(i), Duration::from_secs(1));
        }
        assert_eq!(cache.len(), 1_000);

        tokio::time::advance(Duration::from_secs(10)).await;
        cache.set("fresh", json!("rick"), Duration::from_secs(60));
        assert_eq!(cache.len(), 1, "every expired entry should be swept on set");
        assert_eq!(cache.get("fresh"), Some(json!("rick")));
    }

    #[tokio::test(start_paused = true)]
    async fn the_one_where_a_huge_ttl_means_forever() {
        let cache = TtlCache::new();
        cache.set("k", json!(1), Duration::from_secs(u64::MAX));

        tokio::time::advance(Duration::from_secs(60 * 60 * 24 * 365)).await;
        assert_eq!(cache.get("k"), Some(json!(1)));
        cache.set("other", json!(2), Duration::from_secs(u64::MAX));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn the_one_where_a_poisoned_lock_still_serves() {
        let cache = TtlCache::new();
        cache.set("before", json!(1), Duration::from_secs(60));

        let twin = cache.clone();
        let panicked = std::thread::spawn(move || {
            let _guard = twin.entries.lock().unwrap();
            panic!("💥 died holding the cache lock");
        })
        .join();
        assert!(panicked.is_err());
        assert!(cache.entries.is_poisoned());

        assert_eq!(cache.get("before"), Some(json!(1)));
        cache.set("after", json!(2), Duration::from_secs(60));
        assert_eq!(cache.get("after"), Some(json!(2)));
        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn the_one_where_clones_share_a_brain() {
        let cache = TtlCache::new();
        let twin = cache.clone();
        twin.set("shared", json!("memory"), Duration::from_secs(60));
        assert_eq!(cache.get("shared"), Some(json!("memory")));
    }
}
