//! Bounded memoization for enrichment lookups.
//!
//! Remote identities are append-only for the life of the process, so entries
//! never go stale and no freshness invalidation exists. The only policy is a
//! capacity cap with arbitrary-entry eviction.

use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;

use tokio::sync::Mutex;

pub struct LookupCache<K, V> {
    capacity: usize,
    entries: Mutex<HashMap<K, V>>,
}

impl<K, V> LookupCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Memoize `fetch()` under `key`. A failed fetch propagates to the caller
    /// without poisoning the cache; the next call retries.
    ///
    /// The lock is not held across the fetch, so two concurrent misses on the
    /// same key may both fetch. The single-writer tick discipline makes that
    /// a non-issue here.
    pub async fn get_or_fetch<F, Fut>(&self, key: K, fetch: F) -> anyhow::Result<V>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = anyhow::Result<V>>,
    {
        if let Some(hit) = self.entries.lock().await.get(&key) {
            return Ok(hit.clone());
        }

        let value = fetch().await?;

        let mut entries = self.entries.lock().await;
        if entries.len() >= self.capacity && !entries.contains_key(&key) {
            if let Some(evict) = entries.keys().next().cloned() {
                entries.remove(&evict);
            }
        }
        entries.insert(key, value.clone());
        Ok(value)
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn memoizes_fetch_per_key() {
        let cache: LookupCache<String, u32> = LookupCache::new(8);
        let fetches = AtomicUsize::new(0);

        for _ in 0..3 {
            let value = cache
                .get_or_fetch("k".to_string(), || async {
                    fetches.fetch_add(1, Ordering::SeqCst);
                    Ok(7)
                })
                .await
                .unwrap();
            assert_eq!(value, 7);
        }
        assert_eq!(fetches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failed_fetch_is_not_cached() {
        let cache: LookupCache<String, u32> = LookupCache::new(8);

        let err = cache
            .get_or_fetch("k".to_string(), || async { anyhow::bail!("remote down") })
            .await;
        assert!(err.is_err());
        assert_eq!(cache.len().await, 0);

        // The retry succeeds and is cached normally.
        let value = cache
            .get_or_fetch("k".to_string(), || async { Ok(9) })
            .await
            .unwrap();
        assert_eq!(value, 9);
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn capacity_is_bounded() {
        let cache: LookupCache<u32, u32> = LookupCache::new(4);
        for i in 0..20u32 {
            cache.get_or_fetch(i, || async move { Ok(i) }).await.unwrap();
        }
        assert_eq!(cache.len().await, 4);
    }
}
