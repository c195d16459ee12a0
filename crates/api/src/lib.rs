// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! WHOIS API Server Implementation
//!
//! This crate provides the HTTP server for the WHOIS lookup service, built with Axum
//! on top of the `whois-resolver` engine. It wires configured upstream providers and
//! a cache backend into a resolver and exposes it over a small JSON API.
//!
//! # Module Structure
//!
//! - [`config`]: Server configuration and environment management with hierarchical loading
//! - [`domain`]: Domain name validation for incoming lookups
//! - [`error`]: Error types and HTTP response handling with proper status codes
//! - [`extractors`]: JSON body extraction with descriptive error messages
//! - [`state`]: Shared application state and aggregated health reporting
//! - [`server`]: Main server implementation, lifecycle, and coordinated shutdown
//! - [`routes`]: Route configuration and HTTP request handlers
//! - [`middleware`]: Rate limiting and request path validation
//! - [`metrics`]: Prometheus metrics for lookups and the record cache
//! - [`openapi`]: `OpenAPI` specification and Swagger UI endpoints for API documentation
//!
//! # Key Features
//!
//! - **Provider Failover**: Lookups try providers in priority order with health-based cooldown
//! - **Record Caching**: Memory or Redis backed cache with classified TTLs and bounded size
//! - **Graceful Shutdown**: Coordinated termination using `CancellationToken`
//! - **Rate Limiting**: IP-based request limiting with configurable requests per minute
//! - **Health Monitoring**: Per-provider health and cache statistics on `/health`

pub mod config;
pub mod docs;
pub mod domain;
pub mod error;
pub mod extractors;
pub mod metrics;
pub mod middleware;
pub mod openapi;
pub mod routes;
pub mod server;
pub mod state;

pub use config::{Environment, ServerConfig};
pub use error::{ServerError, ServerResult};
pub use server::{Server, ShutdownConfig};
pub use shared_types::{CacheStatus, WhoisRecord};
pub use state::{HealthCheck, ServerState};
