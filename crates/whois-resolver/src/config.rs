// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Resolver and cache policy configuration

use std::time::Duration;

use crate::error::{ResolverError, ResolverResult};

/// Consecutive failures after which a provider is disabled
pub const DEFAULT_MAX_RETRIES: u32 = 2;
/// Time after last use before a disabled provider becomes eligible again
pub const DEFAULT_COOLDOWN: Duration = Duration::from_secs(5 * 60);

const HOUR: u64 = 60 * 60;
const DAY: u64 = 24 * HOUR;

/// Namespace prefix for cache keys
pub const DEFAULT_KEY_PREFIX: &str = "whois:";
/// TTL base for registered domains
pub const DEFAULT_REGISTERED_TTL: Duration = Duration::from_secs(30 * DAY);
/// TTL base for unregistered domains
pub const DEFAULT_UNREGISTERED_TTL: Duration = Duration::from_secs(7 * DAY);
/// TTL base for error-tagged entries
pub const DEFAULT_ERROR_TTL: Duration = Duration::from_secs(DAY);
/// Symmetric jitter bound applied to every TTL
pub const DEFAULT_JITTER: Duration = Duration::from_secs(6 * HOUR);
/// Entry ceiling that triggers eviction
pub const DEFAULT_MAX_ENTRIES: u64 = 10_000;
/// Entries with less remaining TTL than this are evicted first
pub const DEFAULT_FRESHNESS_FLOOR: Duration = Duration::from_secs(DAY);
/// Keys requested per scan page during eviction
pub const DEFAULT_SCAN_PAGE_SIZE: usize = 100;
/// Upper bound on scan pages walked by one eviction pass
pub const DEFAULT_MAX_SCAN_PAGES: usize = 1_000;

/// Provider health policy plus cache policy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolverConfig {
    /// Consecutive errors that disable a provider
    pub max_retries: u32,
    /// Cooldown before a disabled provider is re-enabled
    pub cooldown: Duration,
    /// Record cache policy
    pub cache: CachePolicy,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            cooldown: DEFAULT_COOLDOWN,
            cache: CachePolicy::default(),
        }
    }
}

impl ResolverConfig {
    /// Validate every field
    ///
    /// # Errors
    ///
    /// Returns a configuration error describing the first invalid field
    pub fn validate(&self) -> ResolverResult<()> {
        if self.max_retries == 0 {
            return Err(ResolverError::config("max_retries must be at least 1"));
        }
        if self.cooldown.is_zero() {
            return Err(ResolverError::config("cooldown must be greater than 0"));
        }
        self.cache.validate()
    }
}

/// TTL tiers, jitter and size bound for the record cache
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachePolicy {
    /// Prefix prepended to the normalized domain to build a key
    pub key_prefix: String,
    /// TTL base for registered domains
    pub registered_ttl: Duration,
    /// TTL base for unregistered domains
    pub unregistered_ttl: Duration,
    /// TTL base for error-tagged entries
    pub error_ttl: Duration,
    /// Jitter bound, applied in `[-jitter, +jitter]`
    pub jitter: Duration,
    /// Approximate entry count above which eviction runs
    pub max_entries: u64,
    /// Remaining-TTL threshold below which entries are evicted
    pub freshness_floor: Duration,
    /// Keys per scan page
    pub scan_page_size: usize,
    /// Maximum pages per eviction pass
    pub max_scan_pages: usize,
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self {
            key_prefix: DEFAULT_KEY_PREFIX.to_string(),
            registered_ttl: DEFAULT_REGISTERED_TTL,
            unregistered_ttl: DEFAULT_UNREGISTERED_TTL,
            error_ttl: DEFAULT_ERROR_TTL,
            jitter: DEFAULT_JITTER,
            max_entries: DEFAULT_MAX_ENTRIES,
            freshness_floor: DEFAULT_FRESHNESS_FLOOR,
            scan_page_size: DEFAULT_SCAN_PAGE_SIZE,
            max_scan_pages: DEFAULT_MAX_SCAN_PAGES,
        }
    }
}

impl CachePolicy {
    /// Validate TTL tiers and scan bounds
    ///
    /// # Errors
    ///
    /// Returns a configuration error describing the first invalid field
    pub fn validate(&self) -> ResolverResult<()> {
        if self.key_prefix.trim().is_empty() {
            return Err(ResolverError::config("cache key prefix cannot be empty"));
        }
        for (name, ttl) in [
            ("registered_ttl", self.registered_ttl),
            ("unregistered_ttl", self.unregistered_ttl),
            ("error_ttl", self.error_ttl),
        ] {
            if ttl <= self.jitter {
                return Err(ResolverError::config(format!(
                    "{name} ({}s) must exceed the jitter bound ({}s)",
                    ttl.as_secs(),
                    self.jitter.as_secs()
                )));
            }
        }
        if self.max_entries == 0 {
            return Err(ResolverError::config("max_entries must be greater than 0"));
        }
        if self.scan_page_size == 0 || self.max_scan_pages == 0 {
            return Err(ResolverError::config("scan bounds must be greater than 0"));
        }
        Ok(())
    }
}
