// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Test fixtures for WHOIS lookups
//!
//! Upstream response bodies and mock mounting helpers shared by the
//! integration tests, plus a helper that starts a server against mock
//! providers.

#![allow(dead_code)]

use std::net::SocketAddr;

use api::{Server, ServerConfig, ShutdownConfig};
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;
use url::Url;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{method, path, query_param},
};

pub const WHOISFREAKS_PATH: &str = "/v1.0/whois";
pub const WHOISXML_PATH: &str = "/whoisserver/WhoisService";

/// Live WhoisFreaks body for a registered domain
pub fn whoisfreaks_registered(domain: &str) -> Value {
    json!({
        "status": true,
        "domain_name": domain,
        "domain_registered": "yes",
        "create_date": "1997-09-15",
        "update_date": "2019-09-09",
        "expiry_date": "2028-09-14",
        "domain_registrar": {
            "iana_id": "292",
            "registrar_name": "MarkMonitor, Inc."
        },
        "name_servers": ["ns1.google.com", "ns2.google.com"],
        "domain_status": ["clientTransferProhibited", "serverDeleteProhibited"],
        "whois_server": "whois.markmonitor.com"
    })
}

/// WhoisXML body for a registered domain
pub fn whoisxml_registered(domain: &str) -> Value {
    json!({
        "WhoisRecord": {
            "domainName": domain,
            "registrarName": "Example Registrar, LLC",
            "createdDate": "2001-02-03T00:00:00Z",
            "expiresDate": "2030-02-03T00:00:00Z",
            "updatedDate": "2024-01-01T00:00:00Z",
            "status": "clientTransferProhibited",
            "nameServers": { "hostNames": ["ns1.example.net"] },
            "estimatedDomainAge": 8400
        }
    })
}

/// Mount a WhoisFreaks responder for `domain`
pub async fn mount_whoisfreaks(server: &MockServer, domain: &str, response: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path(WHOISFREAKS_PATH))
        .and(query_param("domainName", domain))
        .respond_with(response)
        .mount(server)
        .await;
}

/// Mount a WhoisXML responder for `domain`
pub async fn mount_whoisxml(server: &MockServer, domain: &str, response: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path(WHOISXML_PATH))
        .and(query_param("domainName", domain))
        .respond_with(response)
        .mount(server)
        .await;
}

/// Testing configuration with both providers pointed at `upstream`
pub fn config_with_providers(upstream: &MockServer) -> ServerConfig {
    let mut config = ServerConfig::for_testing().expect("testing config");
    let base = Url::parse(&upstream.uri()).expect("mock server uri");
    for (provider, key) in [
        (&mut config.providers.whoisfreaks, "freaks-test-key"),
        (&mut config.providers.whoisxml, "xml-test-key"),
    ] {
        provider.enabled = true;
        provider.base_url = base.clone();
        provider.api_key = Some(key.to_string());
    }
    config
}

/// Start a server and return its address
pub async fn start(config: ServerConfig) -> (SocketAddr, CancellationToken) {
    Server::new(config, ShutdownConfig::default())
        .await
        .expect("Failed to create server")
        .run_for_testing()
        .await
        .expect("Failed to start test server")
}
