// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Upstream WHOIS data providers
//!
//! This crate provides implementations of the `WhoisProvider` trait for the
//! commercial WHOIS APIs the service can fail over between.
//!
//! # Architecture
//!
//! - **Client Implementations**: [`whoisfreaks`], [`whoisxml`] - specific API integrations
//! - **Closed Provider Set**: [`upstream::UpstreamProvider`] - static dispatch over the clients
//! - **Validation Utilities**: [`non_empty_string::NonEmptyString`] - credentials that cannot be blank
//!
//! Both clients apply their timeout twice: as the reqwest client timeout and as an
//! explicit `tokio::time::timeout` around the request, and map upstream failures
//! into [`api_client::ApiError`].

pub mod non_empty_string;
pub mod upstream;
pub mod whoisfreaks;
pub mod whoisxml;

pub use non_empty_string::NonEmptyString;
pub use upstream::UpstreamProvider;
pub use whoisfreaks::*;
pub use whoisxml::*;

/// User agent sent with every upstream request
pub const USER_AGENT: &str = concat!("whois-api/", env!("CARGO_PKG_VERSION"));

/// Drop empty strings so they do not end up as `Some("")` in a record
pub(crate) fn non_blank(value: String) -> Option<String> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value)
    }
}

/// Use `primary` unless it is blank, otherwise `fallback`
pub(crate) fn first_non_blank(primary: String, fallback: String) -> String {
    if primary.trim().is_empty() {
        fallback
    } else {
        primary
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_helpers() {
        assert_eq!(non_blank("  ".to_string()), None);
        assert_eq!(non_blank("x".to_string()), Some("x".to_string()));
        assert_eq!(first_non_blank(String::new(), "b".to_string()), "b");
        assert_eq!(first_non_blank("a".to_string(), "b".to_string()), "a");
    }
}
