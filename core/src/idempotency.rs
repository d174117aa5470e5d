//! Bounded, TTL-evicting idempotency cache (`spec.md` §5, §4.4).
//!
//! Keyed by the client-supplied `Idempotency-Key` header, this lets a
//! write handler replay a recent successful response byte-identically
//! instead of re-executing the write. Capacity and TTL match §5's
//! "bounded LRU (10 000 entries, 10 min TTL)".

use std::collections::HashMap;
use std::time::{Duration, Instant};

use tokio::sync::RwLock;

/// Default max entries, per `spec.md` §5.
pub const DEFAULT_MAX_ENTRIES: usize = 10_000;
/// Default TTL, per `spec.md` §5 and §4.4 ("window: 10 minutes").
pub const DEFAULT_TTL: Duration = Duration::from_secs(600);

struct Entry {
    inserted_at: Instant,
    status: u16,
    body: Vec<u8>,
}

/// A cached successful response, keyed by idempotency key.
pub struct IdempotencyCache {
    entries: RwLock<HashMap<String, Entry>>,
    ttl: Duration,
    max_entries: usize,
}

impl IdempotencyCache {
    /// Build a cache with the spec defaults.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_MAX_ENTRIES, DEFAULT_TTL)
    }

    /// Build a cache with explicit capacity/TTL (used in tests).
    pub fn with_capacity(max_entries: usize, ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
            max_entries,
        }
    }

    /// Look up a previously recorded response for `key`, if still fresh.
    pub async fn get(&self, key: &str) -> Option<(u16, Vec<u8>)> {
        let entries = self.entries.read().await;
        let entry = entries.get(key)?;
        if entry.inserted_at.elapsed() > self.ttl {
            return None;
        }
        Some((entry.status, entry.body.clone()))
    }

    /// Record a response for `key`, evicting expired and, if still over
    /// capacity, the single oldest entry.
    pub async fn put(&self, key: String, status: u16, body: Vec<u8>) {
        let mut entries = self.entries.write().await;
        let cutoff = Instant::now() - self.ttl;
        entries.retain(|_, v| v.inserted_at > cutoff);

        if entries.len() >= self.max_entries {
            if let Some(oldest) = entries
                .iter()
                .min_by_key(|(_, v)| v.inserted_at)
                .map(|(k, _)| k.clone())
            {
                entries.remove(&oldest);
            }
        }

        entries.insert(
            key,
            Entry {
                inserted_at: Instant::now(),
                status,
                body,
            },
        );
    }
}

impl Default for IdempotencyCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn replays_within_ttl() {
        let cache = IdempotencyCache::with_capacity(10, Duration::from_secs(60));
        cache.put("key-1".to_string(), 200, b"hello".to_vec()).await;
        let hit = cache.get("key-1").await;
        assert_eq!(hit, Some((200, b"hello".to_vec())));
    }

    #[tokio::test]
    async fn expires_after_ttl() {
        let cache = IdempotencyCache::with_capacity(10, Duration::from_millis(10));
        cache.put("key-1".to_string(), 200, b"hello".to_vec()).await;
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(cache.get("key-1").await.is_none());
    }

    #[tokio::test]
    async fn evicts_oldest_over_capacity() {
        let cache = IdempotencyCache::with_capacity(2, Duration::from_secs(60));
        cache.put("a".to_string(), 200, vec![]).await;
        tokio::time::sleep(Duration::from_millis(5)).await;
        cache.put("b".to_string(), 200, vec![]).await;
        tokio::time::sleep(Duration::from_millis(5)).await;
        cache.put("c".to_string(), 200, vec![]).await;
        assert!(cache.get("a").await.is_none());
        assert!(cache.get("b").await.is_some());
        assert!(cache.get("c").await.is_some());
    }
}
