// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Closed set of upstream providers
//!
//! The resolver is generic over [`WhoisProvider`]; the server instantiates it
//! with this enum so every configured client shares one concrete type.

use api_client::{ApiError, WhoisProvider};
use shared_types::WhoisRecord;

use crate::{WhoisFreaksClient, WhoisXmlClient};

/// Every provider the service can be configured with
#[derive(Debug)]
pub enum UpstreamProvider {
    /// WhoisFreaks live lookups
    WhoisFreaks(WhoisFreaksClient),
    /// WhoisXML `WhoisService` lookups
    WhoisXml(WhoisXmlClient),
}

impl WhoisProvider for UpstreamProvider {
    async fn query(&self, domain: &str) -> Result<WhoisRecord, ApiError> {
        match self {
            UpstreamProvider::WhoisFreaks(client) => client.query(domain).await,
            UpstreamProvider::WhoisXml(client) => client.query(domain).await,
        }
    }

    fn name(&self) -> &str {
        match self {
            UpstreamProvider::WhoisFreaks(client) => client.name(),
            UpstreamProvider::WhoisXml(client) => client.name(),
        }
    }
}

impl From<WhoisFreaksClient> for UpstreamProvider {
    fn from(client: WhoisFreaksClient) -> Self {
        UpstreamProvider::WhoisFreaks(client)
    }
}

impl From<WhoisXmlClient> for UpstreamProvider {
    fn from(client: WhoisXmlClient) -> Self {
        UpstreamProvider::WhoisXml(client)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{NonEmptyString, WhoisFreaksConfig, WhoisXmlConfig};

    #[test]
    fn names_are_distinct() {
        let key = NonEmptyString::new("key").unwrap();
        let freaks: UpstreamProvider = WhoisFreaksClient::new(WhoisFreaksConfig::new(key.clone()))
            .unwrap()
            .into();
        let xml: UpstreamProvider = WhoisXmlClient::new(WhoisXmlConfig::new(key))
            .unwrap()
            .into();

        assert_eq!(freaks.name(), "whoisfreaks");
        assert_eq!(xml.name(), "whoisxml");
    }
}
