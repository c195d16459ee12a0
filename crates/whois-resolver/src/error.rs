// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Error types for resolution and caching
//!
//! Provider failures are recorded against health state and only surface once
//! failover is exhausted. Cache failures are soft: callers log them and carry on.

use api_client::ApiError;
use thiserror::Error;

/// Result type alias for resolver operations
pub type ResolverResult<T> = Result<T, ResolverError>;

/// Result type alias for cache backend operations
pub type CacheResult<T> = Result<T, CacheError>;

/// Request-level resolution failures
#[derive(Debug, Error)]
pub enum ResolverError {
    /// Selection found no eligible provider
    #[error("No available provider")]
    NoAvailableProvider,

    /// Every eligible provider was tried and failed
    #[error("All providers failed, last error from {provider}: {source}")]
    AllProvidersFailed {
        /// Name of the last provider attempted
        provider: String,
        /// Error returned by that provider
        #[source]
        source: ApiError,
    },

    /// Invalid resolver or registry configuration
    #[error("Configuration error: {message}")]
    Configuration {
        /// Description of the problem
        message: String,
    },
}

impl ResolverError {
    /// Create a configuration error
    pub fn config<T: ToString>(message: T) -> Self {
        Self::Configuration {
            message: message.to_string(),
        }
    }

    /// Whether the failure came from upstream providers rather than setup
    pub fn is_provider_failure(&self) -> bool {
        matches!(
            self,
            Self::NoAvailableProvider | Self::AllProvidersFailed { .. }
        )
    }
}

/// Cache backend failures
#[derive(Debug, Error)]
pub enum CacheError {
    /// Backend could not be reached
    #[error("Cache connection error: {message}")]
    Connection {
        /// Description of the problem
        message: String,
    },

    /// Backend rejected or failed a command
    #[error("Cache backend error: {message}")]
    Backend {
        /// Description of the problem
        message: String,
    },

    /// Stored payload could not be encoded or decoded
    #[error("Cache serialization error: {message}")]
    Serialization {
        /// Description of the problem
        message: String,
    },
}

impl CacheError {
    /// Create a backend error
    pub fn backend<T: ToString>(message: T) -> Self {
        Self::Backend {
            message: message.to_string(),
        }
    }
}

impl From<redis::RedisError> for CacheError {
    fn from(error: redis::RedisError) -> Self {
        if error.is_connection_refusal() || error.is_connection_dropped() || error.is_io_error() {
            Self::Connection {
                message: error.to_string(),
            }
        } else {
            Self::Backend {
                message: error.to_string(),
            }
        }
    }
}

impl From<serde_json::Error> for CacheError {
    fn from(error: serde_json::Error) -> Self {
        Self::Serialization {
            message: error.to_string(),
        }
    }
}
