// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Backend selection
//!
//! [`CacheStore`] is built once at startup from [`BackendConfig`] and handed to
//! the record cache; dropping it closes the underlying connection.

use std::time::Duration;

use tracing::info;

use crate::{
    backend::{CacheBackend, KeyTtl, ScanPage},
    error::CacheResult,
    memory::MemoryBackend,
    redis_store::RedisBackend,
};

/// Which backend to construct
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendConfig {
    /// In-process store
    Memory,
    /// Redis at the given URL
    Redis {
        /// Connection URL, e.g. `redis://localhost:6379/0`
        url: String,
    },
}

/// Configured cache backend
#[derive(Debug)]
pub enum CacheStore {
    /// In-process store
    Memory(MemoryBackend),
    /// Redis store
    Redis(RedisBackend),
}

impl CacheStore {
    /// Construct the backend described by `config`
    ///
    /// # Errors
    ///
    /// Returns a connection error when Redis cannot be reached
    pub async fn connect(config: &BackendConfig) -> CacheResult<Self> {
        match config {
            BackendConfig::Memory => {
                info!(backend = "memory", "initialized cache backend");
                Ok(Self::Memory(MemoryBackend::new()))
            }
            BackendConfig::Redis { url } => {
                let backend = RedisBackend::connect(url).await?;
                info!(backend = "redis", "initialized cache backend");
                Ok(Self::Redis(backend))
            }
        }
    }

    /// Short backend label for logs and health output
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Memory(_) => "memory",
            Self::Redis(_) => "redis",
        }
    }
}

impl CacheBackend for CacheStore {
    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        match self {
            Self::Memory(backend) => backend.get(key).await,
            Self::Redis(backend) => backend.get(key).await,
        }
    }

    async fn set_with_ttl(&self, key: &str, value: String, ttl: Duration) -> CacheResult<()> {
        match self {
            Self::Memory(backend) => backend.set_with_ttl(key, value, ttl).await,
            Self::Redis(backend) => backend.set_with_ttl(key, value, ttl).await,
        }
    }

    async fn exists(&self, key: &str) -> CacheResult<bool> {
        match self {
            Self::Memory(backend) => backend.exists(key).await,
            Self::Redis(backend) => backend.exists(key).await,
        }
    }

    async fn ttl(&self, key: &str) -> CacheResult<KeyTtl> {
        match self {
            Self::Memory(backend) => backend.ttl(key).await,
            Self::Redis(backend) => backend.ttl(key).await,
        }
    }

    async fn scan(&self, cursor: u64, pattern: &str, count: usize) -> CacheResult<ScanPage> {
        match self {
            Self::Memory(backend) => backend.scan(cursor, pattern, count).await,
            Self::Redis(backend) => backend.scan(cursor, pattern, count).await,
        }
    }

    async fn delete(&self, keys: &[String]) -> CacheResult<u64> {
        match self {
            Self::Memory(backend) => backend.delete(keys).await,
            Self::Redis(backend) => backend.delete(keys).await,
        }
    }

    async fn ttls(&self, keys: &[String]) -> CacheResult<Vec<KeyTtl>> {
        match self {
            Self::Memory(backend) => backend.ttls(keys).await,
            Self::Redis(backend) => backend.ttls(keys).await,
        }
    }

    async fn approximate_len(&self) -> CacheResult<u64> {
        match self {
            Self::Memory(backend) => backend.approximate_len().await,
            Self::Redis(backend) => backend.approximate_len().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_store_round_trips_through_dispatch() {
        let store = CacheStore::connect(&BackendConfig::Memory).await.unwrap();
        assert_eq!(store.kind(), "memory");

        store
            .set_with_ttl("whois:x.org", "v".to_string(), Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(store.get("whois:x.org").await.unwrap().as_deref(), Some("v"));
        assert_eq!(store.approximate_len().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn invalid_redis_url_is_a_connection_error() {
        let result = CacheStore::connect(&BackendConfig::Redis {
            url: "not-a-redis-url".to_string(),
        })
        .await;
        assert!(matches!(
            result,
            Err(crate::error::CacheError::Connection { .. })
        ));
    }
}
