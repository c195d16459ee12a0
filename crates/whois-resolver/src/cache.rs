// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Record cache
//!
//! Maps a normalized domain to its serialized [`WhoisRecord`] under a fixed
//! key prefix. TTLs come from a three-way classification (registered,
//! unregistered, error) perturbed by symmetric random jitter so entries written
//! together do not expire together.
//!
//! Before every write the approximate entry count is checked against the
//! ceiling. When it is exceeded the namespace is scanned page by page and
//! entries whose remaining TTL is below the freshness floor are deleted. A
//! failed page is logged and skipped.
//!
//! Backend failures never reach the caller of [`RecordCache::get`]: a read
//! error or an undecodable payload is a miss.

use std::time::Duration;

use dashmap::DashMap;
use rand::Rng;
use serde::Serialize;
use shared_types::WhoisRecord;
use tracing::{debug, info, trace, warn};

use crate::{
    backend::{CacheBackend, KeyTtl},
    config::CachePolicy,
    error::CacheResult,
};

/// TTL tier of a cache write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordClass {
    /// Domain is registered
    Registered,
    /// Domain is not registered
    Unregistered,
    /// Entry records a failed lookup
    Error,
}

impl RecordClass {
    /// Classify a write; an error tag wins over registration state
    pub fn classify(is_registered: bool, had_error: bool) -> Self {
        match (had_error, is_registered) {
            (true, _) => Self::Error,
            (false, true) => Self::Registered,
            (false, false) => Self::Unregistered,
        }
    }

    fn label(self) -> &'static str {
        match self {
            Self::Registered => "registered",
            Self::Unregistered => "unregistered",
            Self::Error => "error",
        }
    }
}

/// Trim, lower-case and strip the trailing root dot
pub fn normalize_domain(domain: &str) -> String {
    domain.trim().trim_end_matches('.').to_ascii_lowercase()
}

/// Counters describing cache activity
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CacheStats {
    /// Lookups answered from the cache
    pub hits: u64,
    /// Lookups that fell through
    pub misses: u64,
    /// Payloads that failed to decode
    pub corrupt: u64,
    /// Successful writes
    pub stores: u64,
    /// Entries removed by eviction
    pub evictions: u64,
    /// Eviction passes run
    pub eviction_passes: u64,
    /// Backend failures of any kind
    pub errors: u64,
    /// Hits over total lookups
    pub hit_rate: f64,
}

/// Outcome of one eviction pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EvictionReport {
    /// Pages scanned
    pub pages: usize,
    /// Keys inspected
    pub scanned: usize,
    /// Keys deleted
    pub evicted: u64,
    /// Pages that failed and were skipped
    pub failed_pages: usize,
}

/// TTL-tiered record cache over any [`CacheBackend`]
#[derive(Debug)]
pub struct RecordCache<B> {
    backend: B,
    policy: CachePolicy,
    stats: DashMap<&'static str, u64>,
}

impl<B: CacheBackend> RecordCache<B> {
    /// Create a cache over `backend`
    pub fn new(backend: B, policy: CachePolicy) -> Self {
        Self {
            backend,
            policy,
            stats: DashMap::new(),
        }
    }

    /// Underlying backend
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Active policy
    pub fn policy(&self) -> &CachePolicy {
        &self.policy
    }

    /// Deterministic key for `domain`
    pub fn key_for(&self, domain: &str) -> String {
        format!("{}{}", self.policy.key_prefix, normalize_domain(domain))
    }

    /// Cached record for `domain`, if present and decodable
    pub async fn get(&self, domain: &str) -> Option<WhoisRecord> {
        let key = self.key_for(domain);
        let payload = match self.backend.get(&key).await {
            Ok(Some(payload)) => payload,
            Ok(None) => {
                self.increment_stat("misses");
                return None;
            }
            Err(error) => {
                self.increment_stat("errors");
                self.increment_stat("misses");
                warn!(key, error = %error, "cache read failed, treating as miss");
                return None;
            }
        };

        match serde_json::from_str(&payload) {
            Ok(record) => {
                self.increment_stat("hits");
                trace!(key, "cache hit");
                Some(record)
            }
            Err(error) => {
                self.increment_stat("corrupt");
                self.increment_stat("misses");
                warn!(key, error = %error, "undecodable cache entry, treating as miss");
                None
            }
        }
    }

    /// Store `record` for `domain`, returning the TTL used
    ///
    /// The size bound is enforced first; the write goes ahead regardless of
    /// whether eviction ran.
    ///
    /// # Errors
    ///
    /// Returns an error if the record cannot be encoded or the backend write fails
    pub async fn put(
        &self,
        domain: &str,
        record: &WhoisRecord,
        is_registered: bool,
        had_error: bool,
    ) -> CacheResult<Duration> {
        let key = self.key_for(domain);
        let class = RecordClass::classify(is_registered, had_error);
        let payload = serde_json::to_string(record)?;
        let ttl = self.ttl_for(class);

        self.enforce_size_bound().await;

        if let Err(error) = self.backend.set_with_ttl(&key, payload, ttl).await {
            self.increment_stat("errors");
            return Err(error);
        }
        self.increment_stat("stores");
        debug!(
            key,
            class = class.label(),
            ttl_seconds = ttl.as_secs(),
            "stored record in cache"
        );
        Ok(ttl)
    }

    /// Remaining TTL for `domain`
    ///
    /// # Errors
    ///
    /// Returns an error if the backend call fails
    pub async fn remaining_ttl(&self, domain: &str) -> CacheResult<KeyTtl> {
        self.backend.ttl(&self.key_for(domain)).await
    }

    /// Whether an entry exists for `domain`
    ///
    /// # Errors
    ///
    /// Returns an error if the backend call fails
    pub async fn contains(&self, domain: &str) -> CacheResult<bool> {
        self.backend.exists(&self.key_for(domain)).await
    }

    /// Base TTL of a tier before jitter
    pub fn base_ttl(&self, class: RecordClass) -> Duration {
        match class {
            RecordClass::Registered => self.policy.registered_ttl,
            RecordClass::Unregistered => self.policy.unregistered_ttl,
            RecordClass::Error => self.policy.error_ttl,
        }
    }

    /// Jittered TTL for a tier, uniform in `[base - jitter, base + jitter]`, at least one second
    pub fn ttl_for(&self, class: RecordClass) -> Duration {
        let base = i64::try_from(self.base_ttl(class).as_secs()).unwrap_or(i64::MAX);
        let jitter = i64::try_from(self.policy.jitter.as_secs()).unwrap_or(0);
        let offset = if jitter == 0 {
            0
        } else {
            rand::rng().random_range(-jitter..=jitter)
        };
        Duration::from_secs(base.saturating_add(offset).max(1).unsigned_abs())
    }

    /// Run an eviction pass if the entry count exceeds the ceiling
    ///
    /// Returns `None` when the cache is within bounds or its size is unknown.
    pub async fn enforce_size_bound(&self) -> Option<EvictionReport> {
        let size = match self.backend.approximate_len().await {
            Ok(size) => size,
            Err(error) => {
                self.increment_stat("errors");
                warn!(error = %error, "failed to read cache size, skipping eviction check");
                return None;
            }
        };
        if size <= self.policy.max_entries {
            return None;
        }

        info!(
            size,
            max_entries = self.policy.max_entries,
            "cache above entry ceiling, evicting entries near expiry"
        );
        Some(self.evict_near_expiry().await)
    }

    /// Delete every entry in the namespace whose remaining TTL is below the freshness floor
    pub async fn evict_near_expiry(&self) -> EvictionReport {
        let pattern = format!("{}*", self.policy.key_prefix);
        let floor = self.policy.freshness_floor;
        let mut report = EvictionReport::default();
        let mut cursor = 0;

        while report.pages < self.policy.max_scan_pages {
            let page = match self
                .backend
                .scan(cursor, &pattern, self.policy.scan_page_size)
                .await
            {
                Ok(page) => page,
                Err(error) => {
                    // no cursor to resume from
                    self.increment_stat("errors");
                    report.failed_pages += 1;
                    warn!(cursor, error = %error, "cache scan failed, stopping eviction pass");
                    break;
                }
            };
            report.pages += 1;
            report.scanned += page.keys.len();

            match self.evict_page(&page.keys, floor).await {
                Ok(evicted) => report.evicted += evicted,
                Err(error) => {
                    self.increment_stat("errors");
                    report.failed_pages += 1;
                    warn!(cursor, error = %error, "eviction page failed, continuing");
                }
            }

            cursor = page.cursor;
            if cursor == 0 {
                break;
            }
        }

        self.increment_stat("eviction_passes");
        self.add_stat("evictions", report.evicted);
        info!(
            pages = report.pages,
            scanned = report.scanned,
            evicted = report.evicted,
            failed_pages = report.failed_pages,
            "eviction pass complete"
        );
        report
    }

    async fn evict_page(&self, keys: &[String], floor: Duration) -> CacheResult<u64> {
        if keys.is_empty() {
            return Ok(0);
        }
        let ttls = self.backend.ttls(keys).await?;
        let expiring: Vec<String> = keys
            .iter()
            .zip(ttls)
            .filter(|(_, ttl)| ttl.expires_within(floor))
            .map(|(key, _)| key.clone())
            .collect();
        if expiring.is_empty() {
            return Ok(0);
        }
        self.backend.delete(&expiring).await
    }

    /// Snapshot of the cache counters
    #[allow(clippy::cast_precision_loss)]
    pub fn stats(&self) -> CacheStats {
        let hits = self.get_stat("hits");
        let misses = self.get_stat("misses");
        let total = hits + misses;
        CacheStats {
            hits,
            misses,
            corrupt: self.get_stat("corrupt"),
            stores: self.get_stat("stores"),
            evictions: self.get_stat("evictions"),
            eviction_passes: self.get_stat("eviction_passes"),
            errors: self.get_stat("errors"),
            hit_rate: if total > 0 {
                hits as f64 / total as f64
            } else {
                0.0
            },
        }
    }

    fn increment_stat(&self, key: &'static str) {
        self.add_stat(key, 1);
    }

    fn add_stat(&self, key: &'static str, amount: u64) {
        *self.stats.entry(key).or_insert(0) += amount;
    }

    fn get_stat(&self, key: &'static str) -> u64 {
        self.stats.get(key).map_or(0, |v| *v)
    }
}
