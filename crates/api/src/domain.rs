// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Domain name validation
//!
//! Requests are checked here before they reach the resolver, so malformed
//! input never costs an upstream call or a cache key.

use std::{fmt, str::FromStr, sync::LazyLock};

use regex::Regex;
use thiserror::Error;
use whois_resolver::normalize_domain;

use crate::error::ServerError;

/// Longest accepted domain name, in bytes
pub const MAX_DOMAIN_LENGTH: usize = 253;
/// Longest accepted label, in bytes
pub const MAX_LABEL_LENGTH: usize = 63;

#[allow(clippy::expect_used)]
static LABEL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z0-9](?:[a-z0-9-]*[a-z0-9])?$").expect("label pattern should compile")
});

/// Why a domain was rejected
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    /// Nothing left after trimming
    #[error("domain cannot be empty")]
    Empty,
    /// Longer than [`MAX_DOMAIN_LENGTH`]
    #[error("domain is {length} characters long, the maximum is {MAX_DOMAIN_LENGTH}")]
    TooLong {
        /// Length after normalization
        length: usize,
    },
    /// No dot separating a label from the TLD
    #[error("domain must contain at least one dot")]
    MissingDot,
    /// A label with characters outside `[a-z0-9-]`, a leading or trailing hyphen, or bad length
    #[error("invalid domain label '{label}'")]
    InvalidLabel {
        /// Offending label
        label: String,
    },
}

impl From<DomainError> for ServerError {
    fn from(error: DomainError) -> Self {
        ServerError::ValidationError(error.to_string())
    }
}

/// A trimmed, lower-cased, syntactically valid domain name
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DomainName(String);

impl DomainName {
    /// Normalized domain
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for DomainName {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let domain = normalize_domain(s);

        if domain.is_empty() {
            return Err(DomainError::Empty);
        }
        if domain.len() > MAX_DOMAIN_LENGTH {
            return Err(DomainError::TooLong {
                length: domain.len(),
            });
        }
        if !domain.contains('.') {
            return Err(DomainError::MissingDot);
        }
        if let Some(label) = domain
            .split('.')
            .find(|label| label.len() > MAX_LABEL_LENGTH || !LABEL.is_match(label))
        {
            return Err(DomainError::InvalidLabel {
                label: label.to_string(),
            });
        }

        Ok(Self(domain))
    }
}

impl fmt::Display for DomainName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for DomainName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
