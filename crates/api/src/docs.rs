// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! `OpenAPI` document definition

use shared_types::{CacheStatus, Contact, WhoisRecord};
use utoipa::OpenApi;

use crate::{
    config::Environment,
    error::ErrorBody,
    routes::handlers::{self, QueryRequest},
    state::{CacheHealth, HealthCheck, HealthStatus, ProviderHealth},
};

/// `OpenAPI` document for the WHOIS API
#[derive(Debug, OpenApi)]
#[openapi(
    info(
        title = "WHOIS API",
        description = "WHOIS lookups with multi-provider failover and record caching"
    ),
    paths(
        handlers::health_handler,
        handlers::whois_handler,
        handlers::query_handler
    ),
    components(schemas(
        WhoisRecord,
        Contact,
        CacheStatus,
        QueryRequest,
        ErrorBody,
        HealthCheck,
        HealthStatus,
        ProviderHealth,
        CacheHealth,
        Environment
    )),
    tags(
        (name = "health", description = "Service and provider health"),
        (name = "whois", description = "WHOIS lookups")
    )
)]
pub struct ApiDoc;
