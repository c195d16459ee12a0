// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! WhoisFreaks API integration
//!
//! This module provides an implementation of the `WhoisProvider` trait for the
//! WhoisFreaks live WHOIS endpoint.

use std::time::Duration;

use api_client::{ApiError, WhoisProvider};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use shared_types::WhoisRecord;
use thiserror::Error;
use tokio::time::timeout;
use tracing::{debug, warn};
use url::Url;

use crate::{NonEmptyString, USER_AGENT, first_non_blank};

/// Default WhoisFreaks API endpoint
pub const WHOISFREAKS_DEFAULT_BASE_URL: &str = "https://api.whoisfreaks.com";

/// Default request deadline for WhoisFreaks
pub const WHOISFREAKS_DEFAULT_TIMEOUT_SECONDS: u64 = 30;

/// Configuration for the WhoisFreaks API client
#[derive(Debug, Clone)]
pub struct WhoisFreaksConfig {
    /// Base URL for the WhoisFreaks API
    pub base_url: String,
    /// API key for authentication
    pub api_key: NonEmptyString,
    /// Request timeout in seconds
    pub timeout_seconds: u64,
}

impl WhoisFreaksConfig {
    /// Configuration with the public endpoint and default timeout
    pub fn new(api_key: NonEmptyString) -> Self {
        Self {
            base_url: WHOISFREAKS_DEFAULT_BASE_URL.to_string(),
            api_key,
            timeout_seconds: WHOISFREAKS_DEFAULT_TIMEOUT_SECONDS,
        }
    }
}

/// WhoisFreaks API client implementation
#[derive(Debug)]
pub struct WhoisFreaksClient {
    client: Client,
    endpoint: Url,
    config: WhoisFreaksConfig,
}

/// Errors specific to the WhoisFreaks API client
#[derive(Debug, Error)]
#[allow(missing_docs)]
pub enum WhoisFreaksError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing failed
    #[error("JSON parsing failed: {0}")]
    Json(#[from] serde_json::Error),

    /// API returned an error response
    #[error("API error: {status} - {message}")]
    ApiError { status: u16, message: String },

    /// Rate limit exceeded
    #[error("Rate limit exceeded")]
    RateLimited,

    /// Authentication failed
    #[error("Authentication failed")]
    Unauthorized,

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Timeout error
    #[error("Request timeout")]
    Timeout { seconds: u64 },
}

impl From<WhoisFreaksError> for ApiError {
    fn from(value: WhoisFreaksError) -> Self {
        match value {
            WhoisFreaksError::Http(error) => ApiError::Http {
                message: error.to_string(),
            },
            WhoisFreaksError::Json(error) => ApiError::InvalidResponse {
                message: error.to_string(),
            },
            WhoisFreaksError::ApiError { status, message } if status >= 500 => {
                ApiError::ServiceUnavailable {
                    message: format!("{status}: {message}"),
                }
            }
            WhoisFreaksError::ApiError { status, message } => ApiError::Http {
                message: format!("{status}: {message}"),
            },
            WhoisFreaksError::RateLimited => ApiError::RateLimitExceeded {
                retry_after_seconds: 60,
            },
            WhoisFreaksError::Unauthorized => ApiError::Authentication {
                message: value.to_string(),
            },
            WhoisFreaksError::Config(message) => ApiError::Configuration { message },
            WhoisFreaksError::Timeout { seconds } => ApiError::Timeout {
                timeout_seconds: seconds,
            },
        }
    }
}

/// Response body of the live WHOIS endpoint
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
#[allow(missing_docs)]
pub struct WhoisFreaksResponse {
    pub domain_name: String,
    /// `"yes"` when the domain is registered
    pub domain_registered: String,
    pub create_date: String,
    pub update_date: String,
    pub expiry_date: String,
    pub domain_registrar: WhoisFreaksRegistrar,
    pub name_servers: Vec<String>,
    pub domain_status: Vec<String>,
    pub whois_server: String,
}

/// Registrar block of a WhoisFreaks response
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
#[allow(missing_docs)]
pub struct WhoisFreaksRegistrar {
    pub registrar_name: String,
}

impl WhoisFreaksResponse {
    /// Map the upstream body to a record, using `queried` when the body omits the domain
    pub fn into_record(self, queried: &str) -> WhoisRecord {
        WhoisRecord {
            available: self.domain_registered != "yes",
            domain: first_non_blank(self.domain_name, queried.to_string()),
            registrar: self.domain_registrar.registrar_name,
            creation_date: self.create_date,
            expiry_date: self.expiry_date,
            status: self.domain_status,
            name_servers: self.name_servers,
            updated_date: self.update_date,
            whois_server: crate::non_blank(self.whois_server),
            ..WhoisRecord::default()
        }
    }
}

impl WhoisFreaksClient {
    /// Create a new WhoisFreaks API client
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL is invalid or the HTTP client cannot be created
    pub fn new(config: WhoisFreaksConfig) -> Result<Self, WhoisFreaksError> {
        if config.timeout_seconds == 0 {
            return Err(WhoisFreaksError::Config(
                "Timeout must be greater than 0".to_string(),
            ));
        }

        let endpoint = Url::parse(config.base_url.trim_end_matches('/'))
            .and_then(|base| base.join("/v1.0/whois"))
            .map_err(|e| WhoisFreaksError::Config(format!("Invalid base URL: {e}")))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent(USER_AGENT)
            .build()
            .map_err(WhoisFreaksError::Http)?;

        Ok(Self {
            client,
            endpoint,
            config,
        })
    }

    /// Fetch the live WHOIS body for `domain`
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails, times out, or the body cannot be parsed
    pub async fn lookup(&self, domain: &str) -> Result<WhoisFreaksResponse, WhoisFreaksError> {
        debug!(domain, provider = "whoisfreaks", "querying live whois");

        let request = self
            .client
            .get(self.endpoint.clone())
            .query(&[
                ("apiKey", self.config.api_key.as_str()),
                ("whois", "live"),
                ("domainName", domain),
            ])
            .header("accept", "application/json");

        let seconds = self.config.timeout_seconds;
        let response = timeout(Duration::from_secs(seconds), request.send())
            .await
            .map_err(|_| WhoisFreaksError::Timeout { seconds })?
            .map_err(|e| classify_transport_error(e, seconds))?;

        match response.status() {
            StatusCode::OK => {
                let body = timeout(Duration::from_secs(seconds), response.text())
                    .await
                    .map_err(|_| WhoisFreaksError::Timeout { seconds })?
                    .map_err(|e| classify_transport_error(e, seconds))?;
                Ok(serde_json::from_str(&body)?)
            }
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(WhoisFreaksError::Unauthorized),
            StatusCode::TOO_MANY_REQUESTS => Err(WhoisFreaksError::RateLimited),
            status => {
                let error_text = response
                    .text()
                    .await
                    .unwrap_or_else(|_| "Unknown error".to_string());
                warn!(
                    status = status.as_u16(),
                    body = %error_text,
                    "WhoisFreaks API error"
                );
                Err(WhoisFreaksError::ApiError {
                    status: status.as_u16(),
                    message: error_text,
                })
            }
        }
    }
}

fn classify_transport_error(error: reqwest::Error, seconds: u64) -> WhoisFreaksError {
    if error.is_timeout() {
        WhoisFreaksError::Timeout { seconds }
    } else {
        WhoisFreaksError::Http(error)
    }
}

impl WhoisProvider for WhoisFreaksClient {
    async fn query(&self, domain: &str) -> Result<WhoisRecord, ApiError> {
        let response = self.lookup(domain).await?;
        Ok(response.into_record(domain))
    }

    fn name(&self) -> &str {
        "whoisfreaks"
    }
}
