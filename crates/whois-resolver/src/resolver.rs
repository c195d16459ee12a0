// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Resolution orchestrator
//!
//! `resolve` walks `CacheCheck -> ProviderSelect -> Query` and ends in one of
//! `Success`, `Failover` or `Exhausted`:
//!
//! 1. A cache hit returns immediately without touching providers or health.
//! 2. The selector picks the primary; no candidate is a request failure.
//! 3. The primary is queried. On failure the remaining providers are tried in
//!    registration order, skipping the primary and any unavailable provider.
//!    Health is updated after every attempt.
//! 4. The first success is written through to the cache. If every attempt
//!    fails the last error is returned and nothing is cached.
//!
//! Concurrent misses for the same domain are not coalesced; each issues its
//! own upstream query.

use api_client::{ApiError, WhoisProvider};
use shared_types::{CacheStatus, WhoisRecord};
use tracing::{debug, info, instrument, warn};

use crate::{
    backend::CacheBackend,
    cache::{RecordCache, normalize_domain},
    error::{ResolverError, ResolverResult},
    health::ProviderHealthSnapshot,
    registry::ProviderRegistry,
};

/// Successful resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// Resolved record
    pub record: WhoisRecord,
    /// Whether the record came from the cache
    pub cache_status: CacheStatus,
    /// Provider that answered, `None` on a cache hit
    pub provider: Option<String>,
}

/// Cache-first, failover-capable WHOIS resolver
#[derive(Debug)]
pub struct WhoisResolver<P, B> {
    registry: ProviderRegistry<P>,
    cache: RecordCache<B>,
}

impl<P, B> WhoisResolver<P, B>
where
    P: WhoisProvider,
    B: CacheBackend,
{
    /// Create a resolver over a populated registry and a cache
    pub fn new(registry: ProviderRegistry<P>, cache: RecordCache<B>) -> Self {
        Self { registry, cache }
    }

    /// Provider registry
    pub fn registry(&self) -> &ProviderRegistry<P> {
        &self.registry
    }

    /// Record cache
    pub fn cache(&self) -> &RecordCache<B> {
        &self.cache
    }

    /// Health of every provider in registration order
    pub async fn provider_health(&self) -> Vec<ProviderHealthSnapshot> {
        self.registry.health_snapshot().await
    }

    /// Resolve `domain`, from the cache when possible
    ///
    /// # Errors
    ///
    /// Returns [`ResolverError::NoAvailableProvider`] when no provider is eligible,
    /// or [`ResolverError::AllProvidersFailed`] with the last provider error once
    /// failover is exhausted
    #[instrument(skip_all, fields(domain = %domain))]
    pub async fn resolve(&self, domain: &str) -> ResolverResult<Resolution> {
        let domain = normalize_domain(domain);

        if let Some(record) = self.cache.get(&domain).await {
            debug!("resolved from cache");
            return Ok(Resolution {
                record,
                cache_status: CacheStatus::Hit,
                provider: None,
            });
        }

        let Some(primary) = self.registry.select().await else {
            warn!("no available provider");
            return Err(ResolverError::NoAvailableProvider);
        };

        let mut last_failure = match self.attempt(primary, &domain).await {
            Ok(record) => return Ok(self.complete(&domain, record, primary.name()).await),
            Err(error) => (primary.name().to_string(), error),
        };

        for provider in self.registry.providers() {
            let name = provider.name();
            if name == primary.name() {
                continue;
            }
            if !self.registry.is_available(name).await {
                debug!(provider = name, "skipping unavailable provider during failover");
                continue;
            }

            info!(provider = name, failed = %last_failure.0, "failing over");
            match self.attempt(provider, &domain).await {
                Ok(record) => return Ok(self.complete(&domain, record, name).await),
                Err(error) => last_failure = (name.to_string(), error),
            }
        }

        let (provider, source) = last_failure;
        warn!(
            last_provider = %provider,
            error = %source,
            "all providers failed"
        );
        Err(ResolverError::AllProvidersFailed { provider, source })
    }

    /// Query one provider and record the outcome against its health
    async fn attempt(&self, provider: &P, domain: &str) -> Result<WhoisRecord, ApiError> {
        let name = provider.name();
        match provider.query(domain).await {
            Ok(record) => {
                self.registry.record_success(name).await;
                Ok(record)
            }
            Err(error) => {
                let health = self.registry.record_failure(name).await;
                warn!(
                    provider = name,
                    kind = error.kind(),
                    error = %error,
                    consecutive_errors = health.map(|h| h.consecutive_errors),
                    available = health.map(|h| h.available),
                    "provider query failed"
                );
                Err(error)
            }
        }
    }

    /// Write through to the cache and build the response
    async fn complete(&self, domain: &str, record: WhoisRecord, provider: &str) -> Resolution {
        if let Err(error) = self
            .cache
            .put(domain, &record, record.is_registered(), false)
            .await
        {
            warn!(error = %error, "failed to cache record");
        }
        info!(provider, available = record.available, "resolved from provider");
        Resolution {
            record,
            cache_status: CacheStatus::Miss,
            provider: Some(provider.to_string()),
        }
    }
}
