// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Server state management module
//!
//! This module provides shared application state for the WHOIS API server:
//! configuration, the resolver and a cancellation token for coordinated shutdown.

use std::{collections::BTreeMap, sync::Arc};

use external_apis::UpstreamProvider;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::warn;
use utoipa::ToSchema;
use whois_resolver::{CacheBackend, CacheStore, WhoisResolver};

use crate::config::{Environment, ServerConfig};

/// Resolver over the configured upstream providers and cache backend
pub type SharedResolver = Arc<WhoisResolver<UpstreamProvider, CacheStore>>;

/// Shared application state with cancellation token support
#[derive(Debug, Clone)]
pub struct ServerState {
    /// Server configuration
    config: ServerConfig,
    /// WHOIS resolver shared across requests
    resolver: SharedResolver,
    /// Cancellation token for coordinated shutdown
    pub cancellation_token: CancellationToken,
}

impl ServerState {
    /// Create new server state
    pub fn new(
        config: ServerConfig,
        resolver: SharedResolver,
        cancellation_token: CancellationToken,
    ) -> Self {
        Self {
            config,
            resolver,
            cancellation_token,
        }
    }

    /// Server configuration
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// WHOIS resolver
    pub fn resolver(&self) -> &SharedResolver {
        &self.resolver
    }

    /// Aggregate provider and cache health
    ///
    /// The service is `Up` when every provider is healthy, `Degraded` while at
    /// least one provider is still available, and `Down` otherwise.
    pub async fn health_check(&self) -> HealthCheck {
        let snapshots = self.resolver.provider_health().await;

        let available = snapshots.iter().filter(|s| s.available).count();
        let healthy = snapshots
            .iter()
            .filter(|s| s.status() == api_client::HealthStatus::Up)
            .count();
        let status = if snapshots.is_empty() {
            HealthStatus::Down {
                reason: Box::from("no providers configured"),
            }
        } else if available == 0 {
            HealthStatus::Down {
                reason: Box::from("all providers are disabled"),
            }
        } else if healthy < snapshots.len() {
            HealthStatus::Degraded {
                reason: format!("{healthy} of {} providers healthy", snapshots.len())
                    .into_boxed_str(),
            }
        } else {
            HealthStatus::Up
        };

        let providers = snapshots
            .iter()
            .map(|snapshot| {
                (
                    snapshot.name.clone(),
                    ProviderHealth {
                        status: Self::convert_health_status(snapshot.status()),
                        call_count: snapshot.call_count,
                        consecutive_errors: snapshot.consecutive_errors,
                        idle_seconds: snapshot.idle_seconds,
                    },
                )
            })
            .collect();

        HealthCheck {
            status,
            version: Box::from(env!("CARGO_PKG_VERSION")),
            environment: self.config.environment,
            timestamp: chrono::Utc::now().to_rfc3339(),
            providers,
            cache: self.cache_health().await,
        }
    }

    async fn cache_health(&self) -> CacheHealth {
        let cache = self.resolver.cache();
        let entries = match cache.backend().approximate_len().await {
            Ok(entries) => Some(entries),
            Err(e) => {
                warn!(error = %e, "cache backend unreachable during health check");
                None
            }
        };
        let stats = cache.stats();

        CacheHealth {
            backend: cache.backend().kind().to_string(),
            reachable: entries.is_some(),
            entries,
            hits: stats.hits,
            misses: stats.misses,
            hit_rate: stats.hit_rate,
        }
    }

    /// Convert provider health status to the reporting status
    fn convert_health_status(status: api_client::HealthStatus) -> HealthStatus {
        match status {
            api_client::HealthStatus::Up => HealthStatus::Up,
            api_client::HealthStatus::Degraded { reason } => HealthStatus::Degraded {
                reason: reason.into_boxed_str(),
            },
            api_client::HealthStatus::Down { reason } => HealthStatus::Down {
                reason: reason.into_boxed_str(),
            },
        }
    }
}

/// Health status of a service or dependency
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
pub enum HealthStatus {
    /// Service is fully operational and responding normally
    Up,

    /// Service is not operational or has critical failures
    Down {
        /// Human-readable explanation of why the service is down
        reason: Box<str>,
    },

    /// Service is operational but experiencing performance issues or partial failures
    Degraded {
        /// Human-readable explanation of the degradation condition
        reason: Box<str>,
    },
}

impl HealthStatus {
    /// Whether requests can still be served
    pub fn is_serving(&self) -> bool {
        !matches!(self, Self::Down { .. })
    }
}

/// Health of one upstream provider
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ProviderHealth {
    /// Provider status
    pub status: HealthStatus,
    /// Queries issued so far
    pub call_count: u64,
    /// Failures since the last success
    pub consecutive_errors: u32,
    /// Seconds since the provider was last used
    pub idle_seconds: u64,
}

/// Cache backend health and counters
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CacheHealth {
    /// Backend kind, `memory` or `redis`
    pub backend: String,
    /// Whether the backend answered the size probe
    pub reachable: bool,
    /// Approximate number of entries
    pub entries: Option<u64>,
    /// Cache hits since startup
    pub hits: u64,
    /// Cache misses since startup
    pub misses: u64,
    /// Hit ratio (0.0 to 1.0)
    pub hit_rate: f64,
}

/// Health check status
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthCheck {
    /// Service status
    pub status: HealthStatus,
    /// Service version
    pub version: Box<str>,
    /// Environment
    pub environment: Environment,
    /// Timestamp
    pub timestamp: String,
    /// Status of individual providers, keyed by name
    #[schema(value_type = Object)]
    pub providers: BTreeMap<String, ProviderHealth>,
    /// Cache backend status
    pub cache: CacheHealth,
}
