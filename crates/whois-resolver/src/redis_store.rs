// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Redis cache backend
//!
//! Uses a `ConnectionManager`, which reconnects transparently and is cheap to
//! clone per command. Batched TTL lookups go through a single pipeline.

use std::time::Duration;

use redis::{AsyncCommands, Client, aio::ConnectionManager};
use tracing::info;

use crate::{
    backend::{CacheBackend, KeyTtl, ScanPage},
    error::{CacheError, CacheResult},
};

/// Redis-backed store
#[derive(Clone)]
pub struct RedisBackend {
    connection: ConnectionManager,
}

impl std::fmt::Debug for RedisBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisBackend").finish_non_exhaustive()
    }
}

impl RedisBackend {
    /// Connect to `url` and verify the server answers `PING`
    ///
    /// # Errors
    ///
    /// Returns a connection error if the URL is invalid or the server is unreachable
    pub async fn connect(url: &str) -> CacheResult<Self> {
        let client = Client::open(url).map_err(|e| CacheError::Connection {
            message: format!("invalid redis url: {e}"),
        })?;
        let mut connection = ConnectionManager::new(client).await?;
        let _: String = redis::cmd("PING").query_async(&mut connection).await?;
        info!("connected to redis cache backend");
        Ok(Self { connection })
    }

    fn connection(&self) -> ConnectionManager {
        self.connection.clone()
    }
}

impl CacheBackend for RedisBackend {
    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        let mut connection = self.connection();
        Ok(connection.get(key).await?)
    }

    async fn set_with_ttl(&self, key: &str, value: String, ttl: Duration) -> CacheResult<()> {
        let mut connection = self.connection();
        let _: () = connection.set_ex(key, value, ttl.as_secs().max(1)).await?;
        Ok(())
    }

    async fn exists(&self, key: &str) -> CacheResult<bool> {
        let mut connection = self.connection();
        Ok(connection.exists(key).await?)
    }

    async fn ttl(&self, key: &str) -> CacheResult<KeyTtl> {
        let mut connection = self.connection();
        let seconds: i64 = connection.ttl(key).await?;
        Ok(KeyTtl::from_redis_seconds(seconds))
    }

    async fn scan(&self, cursor: u64, pattern: &str, count: usize) -> CacheResult<ScanPage> {
        let mut connection = self.connection();
        let (cursor, keys): (u64, Vec<String>) = redis::cmd("SCAN")
            .arg(cursor)
            .arg("MATCH")
            .arg(pattern)
            .arg("COUNT")
            .arg(count)
            .query_async(&mut connection)
            .await?;
        Ok(ScanPage { cursor, keys })
    }

    async fn delete(&self, keys: &[String]) -> CacheResult<u64> {
        if keys.is_empty() {
            return Ok(0);
        }
        let mut connection = self.connection();
        Ok(connection.del(keys).await?)
    }

    async fn ttls(&self, keys: &[String]) -> CacheResult<Vec<KeyTtl>> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }
        let mut pipeline = redis::pipe();
        for key in keys {
            pipeline.cmd("TTL").arg(key);
        }
        let mut connection = self.connection();
        let replies: Vec<i64> = pipeline.query_async(&mut connection).await?;
        Ok(replies.into_iter().map(KeyTtl::from_redis_seconds).collect())
    }

    async fn approximate_len(&self) -> CacheResult<u64> {
        let mut connection = self.connection();
        Ok(redis::cmd("DBSIZE").query_async(&mut connection).await?)
    }
}
