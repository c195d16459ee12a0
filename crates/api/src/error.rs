// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Error handling module
//!
//! This module provides error types for server operations and their HTTP
//! response mapping. Resolution failures are reported with a generic message;
//! the upstream detail is logged, never returned to the client.

use std::net::SocketAddr;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, warn};
use utoipa::ToSchema;
use whois_resolver::ResolverError;

/// JSON body of every error response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    /// Client-facing message
    pub error: String,
    /// HTTP status code
    pub status: u16,
}

impl ErrorBody {
    /// Build a body for `status`
    pub fn new(status: StatusCode, error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            status: status.as_u16(),
        }
    }
}

/// Error types for server operations
#[derive(Error, Debug)]
pub enum ServerError {
    /// Configuration validation errors
    #[error("Configuration error: {message}")]
    Config {
        /// Error message
        message: String,
    },

    /// Network binding errors
    #[error("Failed to bind to {address}: {source}")]
    Bind {
        /// Socket address that failed to bind
        address: SocketAddr,
        /// Underlying IO error
        source: std::io::Error,
    },

    /// Server startup errors
    #[error("Server startup failed: {source}")]
    Startup {
        /// Underlying IO error
        source: std::io::Error,
    },

    /// Server shutdown errors
    #[error("Server shutdown failed: {source}")]
    Shutdown {
        /// Underlying IO error
        source: std::io::Error,
    },

    /// A dependency (provider client or cache backend) could not be constructed
    #[error("Dependency error: {message}")]
    Dependency {
        /// Error message
        message: String,
    },

    /// The server is shutting down and abandoned the request
    #[error("Server is shutting down")]
    ShuttingDown,

    /// Input validation errors
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// JSON parsing errors with detailed context
    #[error("Invalid JSON request: {message}")]
    JsonError {
        /// Detailed error message
        message: String,
    },

    /// WHOIS resolution failed
    #[error(transparent)]
    Resolution(#[from] ResolverError),
}

/// Result type for server operations
pub type ServerResult<T> = Result<T, ServerError>;

impl ServerError {
    /// HTTP status for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Config { .. }
            | Self::Bind { .. }
            | Self::Startup { .. }
            | Self::Shutdown { .. }
            | Self::Resolution(ResolverError::Configuration { .. }) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Self::Dependency { .. }
            | Self::ShuttingDown
            | Self::Resolution(ResolverError::NoAvailableProvider) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            Self::Resolution(ResolverError::AllProvidersFailed { .. }) => StatusCode::BAD_GATEWAY,
            Self::ValidationError(..) | Self::JsonError { .. } => StatusCode::BAD_REQUEST,
        }
    }

    /// Message safe to return to clients
    fn public_message(&self) -> String {
        match self {
            Self::Resolution(ResolverError::NoAvailableProvider) => {
                "no WHOIS provider is currently available, try again later".to_string()
            }
            Self::Resolution(ResolverError::AllProvidersFailed { .. }) => {
                "WHOIS lookup failed, upstream providers did not return a result".to_string()
            }
            Self::Resolution(ResolverError::Configuration { .. }) => {
                "internal server error".to_string()
            }
            other => other.to_string(),
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        match &self {
            Self::Resolution(ResolverError::AllProvidersFailed { provider, source }) => {
                warn!(
                    last_provider = %provider,
                    error_kind = source.kind(),
                    error = %source,
                    "resolution failed after failover"
                );
            }
            other if status.is_server_error() => error!(error = %other, "request failed"),
            _ => {}
        }

        let body = ErrorBody::new(status, self.public_message());
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use api_client::ApiError;

    use super::*;

    #[test]
    fn resolution_failures_map_to_gateway_statuses() {
        let unavailable = ServerError::from(ResolverError::NoAvailableProvider);
        assert_eq!(unavailable.status_code(), StatusCode::SERVICE_UNAVAILABLE);

        let exhausted = ServerError::from(ResolverError::AllProvidersFailed {
            provider: "whoisxml".to_string(),
            source: ApiError::ServiceUnavailable {
                message: "upstream said: key abc123 revoked".to_string(),
            },
        });
        assert_eq!(exhausted.status_code(), StatusCode::BAD_GATEWAY);
        assert!(!exhausted.public_message().contains("abc123"));
        assert!(!exhausted.public_message().contains("whoisxml"));
    }

    #[test]
    fn client_errors_keep_their_message() {
        let err = ServerError::ValidationError("domain must contain a dot".to_string());
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert!(err.public_message().contains("must contain a dot"));
    }

    #[tokio::test]
    async fn response_body_carries_status() {
        let response = ServerError::from(ResolverError::NoAvailableProvider).into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: ErrorBody = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body.status, 503);
        assert!(body.error.contains("no WHOIS provider"));
    }
}
