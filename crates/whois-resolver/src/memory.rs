// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! In-process cache backend
//!
//! Entries expire lazily: an expired entry is dropped the next time it is read
//! or TTL-checked, and every size probe purges whatever has expired since. Scan cursors are positions in a fixed hash order of keys, so
//! deleting keys between pages never causes a remaining key to be skipped.

use std::{
    collections::hash_map::DefaultHasher,
    hash::{Hash, Hasher},
    time::Duration,
};

use dashmap::DashMap;
use tokio::time::Instant;
use tracing::debug;

use crate::{
    backend::{CacheBackend, KeyTtl, ScanPage},
    error::CacheResult,
};

#[derive(Debug, Clone)]
struct MemoryEntry {
    value: String,
    expires_at: Instant,
}

impl MemoryEntry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at <= now
    }
}

/// DashMap-backed store with per-entry expiry
#[derive(Debug, Default)]
pub struct MemoryBackend {
    entries: DashMap<String, MemoryEntry>,
}

impl MemoryBackend {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop every expired entry, returning how many were removed
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired(now));
        before.saturating_sub(self.entries.len())
    }

    fn live_ttl(&self, key: &str, now: Instant) -> KeyTtl {
        let expired = match self.entries.get(key) {
            None => return KeyTtl::Missing,
            Some(entry) if !entry.is_expired(now) => {
                return KeyTtl::Expires(entry.expires_at.duration_since(now));
            }
            Some(_) => true,
        };
        if expired {
            self.entries.remove_if(key, |_, entry| entry.is_expired(now));
        }
        KeyTtl::Missing
    }

    fn scan_position(key: &str) -> u64 {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        hasher.finish()
    }

    fn matches(pattern: &str, key: &str) -> bool {
        match pattern.strip_suffix('*') {
            Some(prefix) => key.starts_with(prefix),
            None => key == pattern,
        }
    }
}

impl CacheBackend for MemoryBackend {
    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        let now = Instant::now();
        if self.live_ttl(key, now) == KeyTtl::Missing {
            return Ok(None);
        }
        Ok(self.entries.get(key).map(|entry| entry.value.clone()))
    }

    async fn set_with_ttl(&self, key: &str, value: String, ttl: Duration) -> CacheResult<()> {
        self.entries.insert(
            key.to_string(),
            MemoryEntry {
                value,
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(())
    }

    async fn exists(&self, key: &str) -> CacheResult<bool> {
        Ok(self.live_ttl(key, Instant::now()) != KeyTtl::Missing)
    }

    async fn ttl(&self, key: &str) -> CacheResult<KeyTtl> {
        Ok(self.live_ttl(key, Instant::now()))
    }

    async fn scan(&self, cursor: u64, pattern: &str, count: usize) -> CacheResult<ScanPage> {
        let now = Instant::now();
        let mut positioned: Vec<(u64, String)> = self
            .entries
            .iter()
            .filter(|item| !item.value().is_expired(now) && Self::matches(pattern, item.key()))
            .map(|item| (Self::scan_position(item.key()), item.key().clone()))
            .filter(|(position, _)| *position >= cursor)
            .collect();
        positioned.sort_unstable();

        let take = count.max(1);
        // 0 is reserved for "scan complete"
        let next = positioned
            .get(take)
            .map_or(0, |(position, _)| (*position).max(1));
        positioned.truncate(take);

        Ok(ScanPage {
            cursor: next,
            keys: positioned.into_iter().map(|(_, key)| key).collect(),
        })
    }

    async fn delete(&self, keys: &[String]) -> CacheResult<u64> {
        Ok(keys
            .iter()
            .filter(|key| self.entries.remove(key.as_str()).is_some())
            .count() as u64)
    }

    async fn ttls(&self, keys: &[String]) -> CacheResult<Vec<KeyTtl>> {
        let now = Instant::now();
        Ok(keys.iter().map(|key| self.live_ttl(key, now)).collect())
    }

    async fn approximate_len(&self) -> CacheResult<u64> {
        let purged = self.purge_expired();
        if purged > 0 {
            debug!(purged, "dropped expired entries");
        }
        Ok(self.entries.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINUTE: Duration = Duration::from_secs(60);

    #[tokio::test(start_paused = true)]
    async fn entries_expire() {
        let backend = MemoryBackend::new();
        backend
            .set_with_ttl("whois:a.com", "{}".to_string(), MINUTE)
            .await
            .unwrap();

        assert!(backend.exists("whois:a.com").await.unwrap());
        assert_eq!(
            backend.ttl("whois:a.com").await.unwrap(),
            KeyTtl::Expires(MINUTE)
        );

        tokio::time::advance(MINUTE).await;
        assert_eq!(backend.get("whois:a.com").await.unwrap(), None);
        assert_eq!(backend.ttl("whois:a.com").await.unwrap(), KeyTtl::Missing);
        assert_eq!(backend.approximate_len().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn scan_pages_through_prefix() {
        let backend = MemoryBackend::new();
        for i in 0..5 {
            backend
                .set_with_ttl(&format!("whois:{i}.com"), String::new(), MINUTE)
                .await
                .unwrap();
        }
        backend
            .set_with_ttl("session:x", String::new(), MINUTE)
            .await
            .unwrap();

        let mut cursor = 0;
        let mut seen = Vec::new();
        loop {
            let page = backend.scan(cursor, "whois:*", 2).await.unwrap();
            assert!(page.keys.len() <= 2);
            seen.extend(page.keys);
            cursor = page.cursor;
            if cursor == 0 {
                break;
            }
        }
        assert_eq!(seen.len(), 5);
        assert!(seen.iter().all(|key| key.starts_with("whois:")));
    }

    #[tokio::test]
    async fn deleting_between_pages_skips_nothing() {
        let backend = MemoryBackend::new();
        for i in 0..9 {
            backend
                .set_with_ttl(&format!("whois:{i}.net"), String::new(), MINUTE)
                .await
                .unwrap();
        }

        let mut cursor = 0;
        let mut deleted = 0;
        loop {
            let page = backend.scan(cursor, "whois:*", 2).await.unwrap();
            deleted += backend.delete(&page.keys).await.unwrap();
            cursor = page.cursor;
            if cursor == 0 {
                break;
            }
        }
        assert_eq!(deleted, 9);
        assert_eq!(backend.approximate_len().await.unwrap(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn size_probe_excludes_expired_entries() {
        let backend = MemoryBackend::new();
        for i in 0..4 {
            backend
                .set_with_ttl(&format!("whois:{i}.org"), String::new(), MINUTE)
                .await
                .unwrap();
        }
        backend
            .set_with_ttl("whois:kept.org", String::new(), MINUTE * 10)
            .await
            .unwrap();
        assert_eq!(backend.approximate_len().await.unwrap(), 5);

        // never read again, so only the size probe can reclaim them
        tokio::time::advance(MINUTE * 2).await;
        assert_eq!(backend.approximate_len().await.unwrap(), 1);
        assert!(backend.exists("whois:kept.org").await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn purge_and_batch_operations() {
        let backend = MemoryBackend::new();
        backend.set_with_ttl("k1", String::new(), MINUTE).await.unwrap();
        backend
            .set_with_ttl("k2", String::new(), MINUTE * 10)
            .await
            .unwrap();

        let keys = vec!["k1".to_string(), "k2".to_string(), "k3".to_string()];
        let ttls = backend.ttls(&keys).await.unwrap();
        assert_eq!(ttls[0], KeyTtl::Expires(MINUTE));
        assert_eq!(ttls[2], KeyTtl::Missing);

        tokio::time::advance(MINUTE * 2).await;
        assert_eq!(backend.purge_expired(), 1);
        assert_eq!(backend.delete(&keys).await.unwrap(), 1);
        assert_eq!(backend.approximate_len().await.unwrap(), 0);
    }
}
