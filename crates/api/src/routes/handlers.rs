// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! HTTP request handlers module
//!
//! This module provides HTTP request handlers for the WHOIS API server: the
//! health check and the two lookup endpoints. Lookups abandon their work when
//! the server starts shutting down.

use std::time::Instant;

use axum::{
    Json,
    extract::{Path, State},
    http::{HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use shared_types::WhoisRecord;
use tracing::info;
use utoipa::ToSchema;
use whois_resolver::ResolverError;

use crate::{
    domain::DomainName,
    error::{ErrorBody, ServerError},
    extractors::JsonExtractor,
    metrics,
    state::{HealthCheck, ServerState},
};

/// Response header reporting whether the record came from the cache
pub const X_CACHE: HeaderName = HeaderName::from_static("x-cache");

/// Health check endpoint handler
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    summary = "Health check endpoint",
    description = "Returns the service status, version, environment, the health of every upstream WHOIS provider and the state of the record cache.",
    responses(
        (status = 200, description = "At least one provider is available", body = HealthCheck),
        (status = 503, description = "No provider is available", body = HealthCheck)
    )
)]
pub async fn health_handler(State(state): State<ServerState>) -> impl IntoResponse {
    let health = state.health_check().await;
    let status = if health.status.is_serving() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(health))
}

/// Lookup request body
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct QueryRequest {
    /// Domain to look up
    #[schema(example = "example.com")]
    pub domain: String,
}

/// Look up a domain given in the path
///
/// # Errors
///
/// Returns `ServerError` if the domain is invalid or resolution fails.
#[utoipa::path(
    get,
    path = "/v1/whois/{domain}",
    tag = "whois",
    summary = "Look up WHOIS data for a domain",
    description = "Returns the WHOIS record for the domain, served from the cache when possible. The X-Cache response header is HIT or MISS.",
    params(("domain" = String, Path, description = "Domain name, e.g. example.com")),
    responses(
        (status = 200, description = "WHOIS record", body = WhoisRecord,
            headers(("x-cache" = String, description = "HIT or MISS"))),
        (status = 400, description = "Invalid domain", body = ErrorBody),
        (status = 429, description = "Rate limit exceeded", body = ErrorBody),
        (status = 502, description = "Every provider failed", body = ErrorBody),
        (status = 503, description = "No provider is available", body = ErrorBody)
    )
)]
pub async fn whois_handler(
    State(state): State<ServerState>,
    Path(domain): Path<String>,
) -> Result<Response, ServerError> {
    let domain: DomainName = domain.parse()?;
    lookup(&state, &domain).await
}

/// Look up a domain given in the request body
///
/// # Errors
///
/// Returns `ServerError` if the body or domain is invalid or resolution fails.
#[utoipa::path(
    post,
    path = "/v1/query",
    tag = "whois",
    summary = "Look up WHOIS data for a domain",
    description = "Same as GET /v1/whois/{domain} with the domain in a JSON body.",
    request_body = QueryRequest,
    responses(
        (status = 200, description = "WHOIS record", body = WhoisRecord,
            headers(("x-cache" = String, description = "HIT or MISS"))),
        (status = 400, description = "Invalid body or domain", body = ErrorBody),
        (status = 429, description = "Rate limit exceeded", body = ErrorBody),
        (status = 502, description = "Every provider failed", body = ErrorBody),
        (status = 503, description = "No provider is available", body = ErrorBody)
    )
)]
pub async fn query_handler(
    State(state): State<ServerState>,
    JsonExtractor(request): JsonExtractor<QueryRequest>,
) -> Result<Response, ServerError> {
    let domain: DomainName = request.domain.parse()?;
    lookup(&state, &domain).await
}

async fn lookup(state: &ServerState, domain: &DomainName) -> Result<Response, ServerError> {
    let started = Instant::now();

    let outcome = tokio::select! {
        outcome = state.resolver().resolve(domain.as_str()) => outcome,
        () = state.cancellation_token.cancelled() => {
            info!(%domain, "lookup abandoned during shutdown");
            return Err(ServerError::ShuttingDown);
        }
    };
    let elapsed = started.elapsed().as_secs_f64();

    match outcome {
        Ok(resolution) => {
            let label = if resolution.cache_status.is_hit() {
                "hit"
            } else {
                "miss"
            };
            metrics::inc_lookups(label);
            metrics::observe_resolution_duration(label, elapsed);
            info!(
                %domain,
                cache = %resolution.cache_status,
                provider = resolution.provider.as_deref().unwrap_or("cache"),
                "lookup served"
            );

            let mut response = Json(resolution.record).into_response();
            response.headers_mut().insert(
                X_CACHE,
                HeaderValue::from_static(resolution.cache_status.as_header_value()),
            );
            Ok(response)
        }
        Err(error) => {
            let label = match &error {
                ResolverError::NoAvailableProvider => "no_provider",
                ResolverError::AllProvidersFailed { .. } => "exhausted",
                ResolverError::Configuration { .. } => "configuration",
            };
            metrics::inc_lookups("error");
            metrics::observe_resolution_duration(label, elapsed);
            Err(error.into())
        }
    }
}
