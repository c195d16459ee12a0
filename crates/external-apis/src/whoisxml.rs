// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! WhoisXML API integration
//!
//! This module provides an implementation of the `WhoisProvider` trait for the
//! WhoisXML `WhoisService` endpoint. The top-level record is preferred and the
//! nested `registryData` block fills any field the registrar left empty.

use std::time::Duration;

use api_client::{ApiError, WhoisProvider};
use reqwest::{Client, StatusCode, header::CONTENT_TYPE};
use serde::Deserialize;
use shared_types::{Contact, WhoisRecord};
use thiserror::Error;
use tokio::time::timeout;
use tracing::{debug, warn};
use url::Url;

use crate::{NonEmptyString, USER_AGENT, first_non_blank, non_blank};

/// Default WhoisXML API endpoint
pub const WHOISXML_DEFAULT_BASE_URL: &str = "https://www.whoisxmlapi.com";

/// Default request deadline for WhoisXML
pub const WHOISXML_DEFAULT_TIMEOUT_SECONDS: u64 = 10;

/// Configuration for the WhoisXML API client
#[derive(Debug, Clone)]
pub struct WhoisXmlConfig {
    /// Base URL for the WhoisXML API
    pub base_url: String,
    /// API key for authentication
    pub api_key: NonEmptyString,
    /// Request timeout in seconds
    pub timeout_seconds: u64,
}

impl WhoisXmlConfig {
    /// Configuration with the public endpoint and default timeout
    pub fn new(api_key: NonEmptyString) -> Self {
        Self {
            base_url: WHOISXML_DEFAULT_BASE_URL.to_string(),
            api_key,
            timeout_seconds: WHOISXML_DEFAULT_TIMEOUT_SECONDS,
        }
    }
}

/// WhoisXML API client implementation
#[derive(Debug)]
pub struct WhoisXmlClient {
    client: Client,
    endpoint: Url,
    config: WhoisXmlConfig,
}

/// Errors specific to the WhoisXML API client
#[derive(Debug, Error)]
#[allow(missing_docs)]
pub enum WhoisXmlError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing failed
    #[error("JSON parsing failed: {0}")]
    Json(#[from] serde_json::Error),

    /// API returned a non-200 response
    #[error("API error: {status} - {message}")]
    ApiError { status: u16, message: String },

    /// Body was not JSON
    #[error("Unexpected content type: {content_type}")]
    UnexpectedContentType { content_type: String },

    /// Response carried no domain name
    #[error("Domain not found or API error")]
    MissingDomain,

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

impl From<WhoisXmlError> for ApiError {
    fn from(value: WhoisXmlError) -> Self {
        match value {
            WhoisXmlError::Http(error) => ApiError::Http {
                message: error.to_string(),
            },
            WhoisXmlError::Json(error) => ApiError::InvalidResponse {
                message: error.to_string(),
            },
            WhoisXmlError::UnexpectedContentType { .. } | WhoisXmlError::MissingDomain => {
                ApiError::InvalidResponse {
                    message: value.to_string(),
                }
            }
            WhoisXmlError::ApiError { status, message } if status >= 500 => {
                ApiError::ServiceUnavailable {
                    message: format!("{status}: {message}"),
                }
            }
            WhoisXmlError::ApiError { status, message } => ApiError::Http {
                message: format!("{status}: {message}"),
            },
            WhoisXmlError::RateLimited => ApiError::RateLimitExceeded {
                retry_after_seconds: 60,
            },
            WhoisXmlError::Unauthorized => ApiError::Authentication {
                message: value.to_string(),
            },
            WhoisXmlError::Config(message) => ApiError::Configuration { message },
            WhoisXmlError::Timeout { seconds } => ApiError::Timeout {
                timeout_seconds: seconds,
            },
        }
    }
}

/// Envelope of a `WhoisService` response
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
#[allow(missing_docs)]
pub struct WhoisXmlResponse {
    #[serde(rename = "WhoisRecord")]
    pub whois_record: WhoisXmlRecord,
}

/// Registrar-level record
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
#[allow(missing_docs)]
pub struct WhoisXmlRecord {
    pub domain_name: String,
    pub registrar_name: String,
    pub created_date: String,
    pub expires_date: String,
    pub updated_date: String,
    /// Whitespace separated EPP status codes
    pub status: String,
    pub whois_server: String,
    pub contact_email: String,
    pub name_servers: WhoisXmlNameServers,
    pub registrant: WhoisXmlContact,
    pub registry_data: WhoisXmlRegistryData,
    pub estimated_domain_age: Option<i64>,
}

/// Registry-level record used as a fallback
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
#[allow(missing_docs)]
pub struct WhoisXmlRegistryData {
    pub status: String,
    pub created_date: String,
    pub expires_date: String,
    pub updated_date: String,
    pub whois_server: String,
    pub name_servers: WhoisXmlNameServers,
    pub registrant: WhoisXmlContact,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
#[allow(missing_docs)]
pub struct WhoisXmlNameServers {
    pub host_names: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
#[allow(missing_docs)]
pub struct WhoisXmlContact {
    pub name: String,
    pub organization: String,
    pub email: String,
    pub telephone: String,
    pub country: String,
    pub state: String,
    pub city: String,
}

impl From<WhoisXmlContact> for Contact {
    fn from(value: WhoisXmlContact) -> Self {
        Contact {
            name: non_blank(value.name),
            organization: non_blank(value.organization),
            email: non_blank(value.email),
            phone: non_blank(value.telephone),
            country: non_blank(value.country),
            province: non_blank(value.state),
            city: non_blank(value.city),
        }
    }
}

impl WhoisXmlRecord {
    /// Map to a record, filling blanks from `registryData`
    ///
    /// # Errors
    ///
    /// Returns [`WhoisXmlError::MissingDomain`] when the upstream omitted the domain name,
    /// which is how the API reports lookups it could not perform
    pub fn into_record(self) -> Result<WhoisRecord, WhoisXmlError> {
        if self.domain_name.trim().is_empty() {
            return Err(WhoisXmlError::MissingDomain);
        }

        let registry = self.registry_data;
        let status: Vec<String> = first_non_blank(self.status, registry.status)
            .split_whitespace()
            .map(str::to_string)
            .collect();

        let name_servers = if self.name_servers.host_names.is_empty() {
            registry.name_servers.host_names
        } else {
            self.name_servers.host_names
        };

        let registrant = if self.registrant.name.is_empty() && self.registrant.email.is_empty() {
            Contact {
                name: non_blank(registry.registrant.name),
                email: non_blank(registry.registrant.email),
                ..Contact::default()
            }
        } else {
            Contact::from(self.registrant)
        };

        Ok(WhoisRecord {
            available: status.is_empty(),
            domain: self.domain_name,
            registrar: self.registrar_name,
            creation_date: first_non_blank(self.created_date, registry.created_date),
            expiry_date: first_non_blank(self.expires_date, registry.expires_date),
            status,
            name_servers,
            updated_date: first_non_blank(self.updated_date, registry.updated_date),
            registrant: (!registrant.is_empty()).then_some(registrant),
            whois_server: non_blank(first_non_blank(self.whois_server, registry.whois_server)),
            domain_age: self.estimated_domain_age.filter(|age| *age > 0),
            contact_email: non_blank(self.contact_email),
            ..WhoisRecord::default()
        })
    }
}

impl WhoisXmlClient {
    /// Create a new WhoisXML API client
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL is invalid or the HTTP client cannot be created
    pub fn new(config: WhoisXmlConfig) -> Result<Self, WhoisXmlError> {
        if config.timeout_seconds == 0 {
            return Err(WhoisXmlError::Config(
                "Timeout must be greater than 0".to_string(),
            ));
        }

        let endpoint = Url::parse(config.base_url.trim_end_matches('/'))
            .and_then(|base| base.join("/whoisserver/WhoisService"))
            .map_err(|e| WhoisXmlError::Config(format!("Invalid base URL: {e}")))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent(USER_AGENT)
            .build()
            .map_err(WhoisXmlError::Http)?;

        Ok(Self {
            client,
            endpoint,
            config,
        })
    }

    /// Fetch the `WhoisService` body for `domain`
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure, non-200 status, non-JSON content type,
    /// or a body that cannot be parsed
    pub async fn lookup(&self, domain: &str) -> Result<WhoisXmlResponse, WhoisXmlError> {
        debug!(domain, provider = "whoisxml", "querying whois service");

        let request = self
            .client
            .get(self.endpoint.clone())
            .query(&[
                ("apiKey", self.config.api_key.as_str()),
                ("domainName", domain),
                ("outputFormat", "JSON"),
            ])
            .header("accept", "application/json");

        let seconds = self.config.timeout_seconds;
        let response = timeout(Duration::from_secs(seconds), request.send())
            .await
            .map_err(|_| WhoisXmlError::Timeout { seconds })?
            .map_err(|e| {
                if e.is_timeout() {
                    WhoisXmlError::Timeout { seconds }
                } else {
                    WhoisXmlError::Http(e)
                }
            })?;

        match response.status() {
            StatusCode::OK => {}
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                return Err(WhoisXmlError::Unauthorized);
            }
            StatusCode::TOO_MANY_REQUESTS => return Err(WhoisXmlError::RateLimited),
            status => {
                let error_text = response
                    .text()
                    .await
                    .unwrap_or_else(|_| "Unknown error".to_string());
                warn!(
                    status = status.as_u16(),
                    body = %error_text,
                    "WhoisXML API error"
                );
                return Err(WhoisXmlError::ApiError {
                    status: status.as_u16(),
                    message: error_text,
                });
            }
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
            .to_string();
        if !content_type.contains("application/json") {
            warn!(content_type, "WhoisXML API returned a non-JSON body");
            return Err(WhoisXmlError::UnexpectedContentType { content_type });
        }

        let body = timeout(Duration::from_secs(seconds), response.text())
            .await
            .map_err(|_| WhoisXmlError::Timeout { seconds })??;
        Ok(serde_json::from_str(&body)?)
    }
}

impl WhoisProvider for WhoisXmlClient {
    async fn query(&self, domain: &str) -> Result<WhoisRecord, ApiError> {
        let response = self.lookup(domain).await?;
        Ok(response.whois_record.into_record()?)
    }

    fn name(&self) -> &str {
        "whoisxml"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(body: &str) -> WhoisXmlRecord {
        serde_json::from_str::<WhoisXmlResponse>(body)
            .unwrap()
            .whois_record
    }

    #[test]
    fn splits_status_and_prefers_top_level_fields() {
        let record = parse(
            r#"{"WhoisRecord":{
                "domainName":"example.com",
                "registrarName":"Example Registrar, Inc.",
                "createdDate":"1995-08-14T04:00:00Z",
                "status":"clientDeleteProhibited clientTransferProhibited",
                "nameServers":{"hostNames":["a.iana-servers.net","b.iana-servers.net"]},
                "registryData":{"createdDate":"2000-01-01T00:00:00Z","expiresDate":"2030-08-13T04:00:00Z"},
                "estimatedDomainAge":10000
            }}"#,
        )
        .into_record()
        .unwrap();

        assert!(!record.available);
        assert_eq!(
            record.status,
            vec!["clientDeleteProhibited", "clientTransferProhibited"]
        );
        assert_eq!(record.creation_date, "1995-08-14T04:00:00Z");
        assert_eq!(record.expiry_date, "2030-08-13T04:00:00Z");
        assert_eq!(record.name_servers.len(), 2);
        assert_eq!(record.domain_age, Some(10000));
        assert_eq!(record.registrant, None);
    }

    #[test]
    fn falls_back_to_registry_data() {
        let record = parse(
            r#"{"WhoisRecord":{
                "domainName":"example.net",
                "registryData":{
                    "status":"ok",
                    "whoisServer":"whois.verisign-grs.com",
                    "nameServers":{"hostNames":["ns1.example.net"]},
                    "registrant":{"name":"Registry Holder","email":"holder@example.net"}
                }
            }}"#,
        )
        .into_record()
        .unwrap();

        assert_eq!(record.status, vec!["ok"]);
        assert_eq!(record.name_servers, vec!["ns1.example.net"]);
        assert_eq!(record.whois_server.as_deref(), Some("whois.verisign-grs.com"));
        let registrant = record.registrant.unwrap();
        assert_eq!(registrant.name.as_deref(), Some("Registry Holder"));
        assert_eq!(registrant.phone, None);
    }

    #[test]
    fn no_status_means_available() {
        let record = parse(r#"{"WhoisRecord":{"domainName":"unclaimed.dev"}}"#)
            .into_record()
            .unwrap();
        assert!(record.available);
    }

    #[test]
    fn empty_domain_is_an_error() {
        let result = parse(r#"{"ErrorMessage":{"msg":"bad key"}}"#).into_record();
        assert!(matches!(result, Err(WhoisXmlError::MissingDomain)));
        let api_error: ApiError = WhoisXmlError::MissingDomain.into();
        assert!(matches!(api_error, ApiError::InvalidResponse { .. }));
    }

    #[test]
    fn rejects_invalid_base_url() {
        let mut config = WhoisXmlConfig::new(NonEmptyString::new("key").unwrap());
        config.base_url = "::".to_string();
        assert!(matches!(
            WhoisXmlClient::new(config),
            Err(WhoisXmlError::Config(_))
        ));
    }
}
