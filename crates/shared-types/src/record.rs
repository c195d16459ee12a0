// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! WHOIS record types
//!
//! Field names serialize in camelCase and optional fields are omitted when
//! absent, which is the contract callers and cached entries rely on.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Normalized WHOIS data for a single domain
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WhoisRecord {
    /// True when the domain is not registered
    pub available: bool,
    /// Domain the record describes
    pub domain: String,
    /// Sponsoring registrar
    #[serde(default)]
    pub registrar: String,
    /// Creation date as reported by the provider
    #[serde(default)]
    pub creation_date: String,
    /// Expiry date as reported by the provider
    #[serde(default)]
    pub expiry_date: String,
    /// EPP status codes
    #[serde(default)]
    pub status: Vec<String>,
    /// Authoritative name servers
    #[serde(default)]
    pub name_servers: Vec<String>,
    /// Last update date as reported by the provider
    #[serde(default)]
    pub updated_date: String,
    /// Registrant contact
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registrant: Option<Contact>,
    /// Administrative contact
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin: Option<Contact>,
    /// Technical contact
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tech: Option<Contact>,
    /// WHOIS server that answered the upstream query
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub whois_server: Option<String>,
    /// Domain age in days
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain_age: Option<i64>,
    /// Abuse or registrant contact email
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_email: Option<String>,
}

impl WhoisRecord {
    /// Create an empty record for `domain`
    pub fn new(domain: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            ..Self::default()
        }
    }

    /// Whether the domain is registered
    pub fn is_registered(&self) -> bool {
        !self.available
    }
}

/// Contact block attached to a record
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[allow(missing_docs)]
pub struct Contact {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub province: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
}

impl Contact {
    /// True when no field carries a value
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_camel_case_and_omits_absent_fields() {
        let mut record = WhoisRecord::new("example.com");
        record.creation_date = "1995-08-14T04:00:00Z".to_string();
        record.name_servers = vec!["a.iana-servers.net".to_string()];

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["creationDate"], "1995-08-14T04:00:00Z");
        assert_eq!(json["nameServers"][0], "a.iana-servers.net");
        assert!(json.get("registrant").is_none());
        assert!(json.get("whoisServer").is_none());
        assert!(json.get("domainAge").is_none());
    }

    #[test]
    fn deserializes_sparse_cached_entry() {
        let record: WhoisRecord =
            serde_json::from_str(r#"{"available":true,"domain":"free.example"}"#).unwrap();
        assert!(record.available);
        assert!(!record.is_registered());
        assert!(record.status.is_empty());
        assert_eq!(record.registrant, None);
    }

    #[test]
    fn contact_emptiness() {
        assert!(Contact::default().is_empty());
        let contact = Contact {
            country: Some("US".to_string()),
            ..Contact::default()
        };
        assert!(!contact.is_empty());
    }
}
