// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! WHOIS resolution engine
//!
//! Given a domain, the resolver answers from the record cache when it can and
//! otherwise picks an upstream provider by health score, fails over across the
//! remaining providers, and writes the result back with a tiered, jittered TTL.
//!
//! # Architecture
//!
//! - **Health**: [`health::HealthTracker`] keeps per-provider call and error bookkeeping
//! - **Selection**: [`selector::ProviderSelector`] scores available providers
//! - **Registry**: [`registry::ProviderRegistry`] owns providers in priority order
//! - **Caching**: [`cache::RecordCache`] over a [`backend::CacheBackend`]
//!   ([`memory::MemoryBackend`] or [`redis_store::RedisBackend`], chosen via [`store::CacheStore`])
//! - **Orchestration**: [`resolver::WhoisResolver`] ties the pieces together
//!
//! # Usage
//!
//! ```rust,no_run
//! use api_client::WhoisProvider;
//! use whois_resolver::{
//!     BackendConfig, CacheStore, ProviderRegistry, RecordCache, ResolverConfig, WhoisResolver,
//! };
//!
//! async fn build<P: WhoisProvider>(providers: Vec<P>) -> anyhow::Result<WhoisResolver<P, CacheStore>> {
//!     let config = ResolverConfig::default();
//!     let registry = ProviderRegistry::with_providers(&config, providers)?;
//!     let store = CacheStore::connect(&BackendConfig::Memory).await?;
//!     Ok(WhoisResolver::new(registry, RecordCache::new(store, config.cache)))
//! }
//! ```

pub mod backend;
pub mod cache;
pub mod config;
pub mod error;
pub mod health;
pub mod memory;
pub mod redis_store;
pub mod registry;
pub mod resolver;
pub mod selector;
pub mod store;

#[cfg(test)]
mod test_support;

pub use backend::{CacheBackend, KeyTtl, ScanPage};
pub use cache::{CacheStats, EvictionReport, RecordCache, RecordClass, normalize_domain};
pub use config::{CachePolicy, ResolverConfig};
pub use error::{CacheError, CacheResult, ResolverError, ResolverResult};
pub use health::{HealthTracker, ProviderHealth, ProviderHealthSnapshot};
pub use memory::MemoryBackend;
pub use redis_store::RedisBackend;
pub use registry::ProviderRegistry;
pub use resolver::{Resolution, WhoisResolver};
pub use selector::ProviderSelector;
pub use store::{BackendConfig, CacheStore};
