// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Provider traits and error types for upstream WHOIS integrations
//!
//! This crate provides the abstraction every upstream WHOIS data source
//! implements, so the resolver can select, query and fail over between
//! providers without knowing their wire formats.
//!
//! # Core Abstractions
//!
//! - **`WhoisProvider` Trait**: Async lookup of a single domain plus a stable provider name
//! - **Health Reporting**: `Up`, `Degraded` and `Down` statuses for provider summaries
//! - **Error Handling**: `ApiError` classifies transient provider failures

use shared_types::WhoisRecord;
use thiserror::Error;

pub mod health;

pub use health::*;

/// Common interface for upstream WHOIS data sources
///
/// A provider may return a record with `available = true` for an unregistered
/// domain; that is a successful lookup, not an error.
pub trait WhoisProvider: Send + Sync {
    /// Look up WHOIS data for `domain`
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure, timeout, non-success upstream
    /// status, or an upstream body that cannot be mapped to a record
    fn query(&self, domain: &str) -> impl Future<Output = Result<WhoisRecord, ApiError>> + Send;

    /// Stable, unique name used to key health state
    fn name(&self) -> &str;
}

/// Transient failures reported by a provider
#[derive(Debug, Error)]
#[allow(missing_docs)]
pub enum ApiError {
    /// HTTP request failed
    #[error("HTTP request failed: {message}")]
    Http { message: String },

    /// Rate limit exceeded
    #[error("Rate limit exceeded, retry after {retry_after_seconds} seconds")]
    RateLimitExceeded { retry_after_seconds: u64 },

    /// Authentication failed
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    /// Invalid response format
    #[error("Invalid response format: {message}")]
    InvalidResponse { message: String },

    /// Service unavailable
    #[error("Service unavailable: {message}")]
    ServiceUnavailable { message: String },

    /// Configuration error
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// Network timeout
    #[error("Request timeout after {timeout_seconds} seconds")]
    Timeout { timeout_seconds: u64 },

    /// Client independent error
    #[error(transparent)]
    Custom { error: anyhow::Error },
}

impl ApiError {
    /// Short machine-readable label, used for logs and metrics
    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::Http { .. } => "http",
            ApiError::RateLimitExceeded { .. } => "rate_limited",
            ApiError::Authentication { .. } => "authentication",
            ApiError::InvalidResponse { .. } => "invalid_response",
            ApiError::ServiceUnavailable { .. } => "service_unavailable",
            ApiError::Configuration { .. } => "configuration",
            ApiError::Timeout { .. } => "timeout",
            ApiError::Custom { .. } => "custom",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_kinds_are_stable() {
        assert_eq!(ApiError::Timeout { timeout_seconds: 10 }.kind(), "timeout");
        assert_eq!(
            ApiError::RateLimitExceeded {
                retry_after_seconds: 60
            }
            .kind(),
            "rate_limited"
        );
        assert_eq!(
            ApiError::Custom {
                error: anyhow::anyhow!("boom")
            }
            .kind(),
            "custom"
        );
    }

    #[test]
    fn error_messages() {
        let err = ApiError::Timeout { timeout_seconds: 30 };
        assert_eq!(err.to_string(), "Request timeout after 30 seconds");

        let err = ApiError::Authentication {
            message: "invalid key".to_string(),
        };
        assert_eq!(err.to_string(), "Authentication failed: invalid key");
    }
}
