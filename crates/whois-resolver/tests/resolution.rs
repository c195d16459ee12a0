// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! End-to-end resolution through the public API with the in-memory store

use std::{
    sync::atomic::{AtomicUsize, Ordering},
    time::Duration,
};

use api_client::{ApiError, WhoisProvider};
use shared_types::{CacheStatus, WhoisRecord};
use tokio_test::{assert_err, assert_ok};
use whois_resolver::{
    BackendConfig, CacheBackend, CacheStore, KeyTtl, ProviderRegistry, RecordCache,
    ResolverConfig, ResolverError, WhoisResolver,
};

const DAY: u64 = 24 * 60 * 60;
const SIX_HOURS: u64 = 6 * 60 * 60;

/// Answers every domain as unregistered, or fails when `broken`
#[derive(Debug)]
struct StaticProvider {
    name: &'static str,
    broken: bool,
    calls: AtomicUsize,
}

impl StaticProvider {
    fn new(name: &'static str, broken: bool) -> Self {
        Self {
            name,
            broken,
            calls: AtomicUsize::new(0),
        }
    }
}

impl WhoisProvider for StaticProvider {
    async fn query(&self, domain: &str) -> Result<WhoisRecord, ApiError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.broken {
            return Err(ApiError::Timeout { timeout_seconds: 10 });
        }
        Ok(WhoisRecord {
            available: true,
            ..WhoisRecord::new(domain)
        })
    }

    fn name(&self) -> &str {
        self.name
    }
}

async fn build(providers: Vec<StaticProvider>) -> WhoisResolver<StaticProvider, CacheStore> {
    let config = ResolverConfig::default();
    let registry = ProviderRegistry::with_providers(&config, providers).unwrap();
    let store = CacheStore::connect(&BackendConfig::Memory).await.unwrap();
    WhoisResolver::new(registry, RecordCache::new(store, config.cache))
}

#[tokio::test(start_paused = true)]
async fn unregistered_domain_is_cached_in_its_tier() {
    let resolver = build(vec![StaticProvider::new("primary", false)]).await;

    let resolution = assert_ok!(resolver.resolve("free-name.io").await);
    assert_eq!(resolution.cache_status, CacheStatus::Miss);
    assert!(resolution.record.available);

    let ttl = assert_ok!(resolver.cache().backend().ttl("whois:free-name.io").await);
    let KeyTtl::Expires(remaining) = ttl else {
        panic!("expected an expiring entry, got {ttl:?}");
    };
    assert!(remaining >= Duration::from_secs(7 * DAY - SIX_HOURS));
    assert!(remaining <= Duration::from_secs(7 * DAY + SIX_HOURS));
}

#[tokio::test(start_paused = true)]
async fn cached_answer_skips_providers_until_expiry() {
    let resolver = build(vec![StaticProvider::new("primary", false)]).await;

    assert_ok!(resolver.resolve("example.com").await);
    let hit = assert_ok!(resolver.resolve("example.com").await);
    assert_eq!(hit.cache_status, CacheStatus::Hit);
    assert_eq!(
        resolver.registry().providers()[0]
            .calls
            .load(Ordering::SeqCst),
        1
    );

    tokio::time::advance(Duration::from_secs(7 * DAY + SIX_HOURS + 1)).await;
    let refreshed = assert_ok!(resolver.resolve("example.com").await);
    assert_eq!(refreshed.cache_status, CacheStatus::Miss);
}

#[tokio::test(start_paused = true)]
async fn failed_resolution_reports_every_provider_health() {
    let resolver = build(vec![
        StaticProvider::new("primary", true),
        StaticProvider::new("secondary", true),
    ])
    .await;

    let err = assert_err!(resolver.resolve("example.com").await);
    assert!(matches!(err, ResolverError::AllProvidersFailed { .. }));

    let health = resolver.provider_health().await;
    assert_eq!(health.len(), 2);
    assert!(health.iter().all(|h| h.consecutive_errors == 1 && h.available));
    assert_eq!(resolver.cache().stats().stores, 0);
}
