// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Key-value backend abstraction for the record cache
//!
//! Any store offering get, set-with-TTL, existence, remaining TTL, cursor
//! scans, batch delete and batched TTL lookups can back the cache.

use std::time::Duration;

use crate::error::CacheResult;

/// Remaining lifetime of a key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyTtl {
    /// Key does not exist
    Missing,
    /// Key exists without an expiry
    Persistent,
    /// Key expires after the given duration
    Expires(Duration),
}

impl KeyTtl {
    /// Interpret a Redis `TTL` reply (`-2` missing, `-1` persistent, seconds otherwise)
    pub fn from_redis_seconds(seconds: i64) -> Self {
        match seconds {
            -2 => KeyTtl::Missing,
            s if s < 0 => KeyTtl::Persistent,
            s => KeyTtl::Expires(Duration::from_secs(s.unsigned_abs())),
        }
    }

    /// Remaining duration when the key expires
    pub fn remaining(self) -> Option<Duration> {
        match self {
            KeyTtl::Expires(remaining) => Some(remaining),
            KeyTtl::Missing | KeyTtl::Persistent => None,
        }
    }

    /// Whether the key expires in less than `floor`
    pub fn expires_within(self, floor: Duration) -> bool {
        self.remaining().is_some_and(|remaining| remaining < floor)
    }
}

/// One page of a cursor scan
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanPage {
    /// Cursor for the next page, `0` when the scan is complete
    pub cursor: u64,
    /// Keys on this page
    pub keys: Vec<String>,
}

/// Storage primitives required by [`crate::cache::RecordCache`]
pub trait CacheBackend: Send + Sync {
    /// Fetch the payload stored under `key`
    fn get(&self, key: &str) -> impl Future<Output = CacheResult<Option<String>>> + Send;

    /// Store `value` under `key`, expiring after `ttl`
    fn set_with_ttl(
        &self,
        key: &str,
        value: String,
        ttl: Duration,
    ) -> impl Future<Output = CacheResult<()>> + Send;

    /// Whether `key` exists
    fn exists(&self, key: &str) -> impl Future<Output = CacheResult<bool>> + Send;

    /// Remaining lifetime of `key`
    fn ttl(&self, key: &str) -> impl Future<Output = CacheResult<KeyTtl>> + Send;

    /// Scan keys matching a `prefix*` glob, starting at `cursor` (0 to begin)
    fn scan(
        &self,
        cursor: u64,
        pattern: &str,
        count: usize,
    ) -> impl Future<Output = CacheResult<ScanPage>> + Send;

    /// Delete `keys`, returning how many existed
    fn delete(&self, keys: &[String]) -> impl Future<Output = CacheResult<u64>> + Send;

    /// Remaining lifetime of every key, in input order, in one round trip
    fn ttls(&self, keys: &[String]) -> impl Future<Output = CacheResult<Vec<KeyTtl>>> + Send;

    /// Approximate number of live entries
    fn approximate_len(&self) -> impl Future<Output = CacheResult<u64>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redis_ttl_replies() {
        assert_eq!(KeyTtl::from_redis_seconds(-2), KeyTtl::Missing);
        assert_eq!(KeyTtl::from_redis_seconds(-1), KeyTtl::Persistent);
        assert_eq!(
            KeyTtl::from_redis_seconds(90),
            KeyTtl::Expires(Duration::from_secs(90))
        );
    }

    #[test]
    fn only_expiring_keys_fall_under_floor() {
        let floor = Duration::from_secs(60);
        assert!(KeyTtl::Expires(Duration::from_secs(59)).expires_within(floor));
        assert!(!KeyTtl::Expires(Duration::from_secs(60)).expires_within(floor));
        assert!(!KeyTtl::Persistent.expires_within(floor));
        assert!(!KeyTtl::Missing.expires_within(floor));
    }
}
