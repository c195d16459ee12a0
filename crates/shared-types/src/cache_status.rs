// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Cache hit/miss marker attached to every successful resolution

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Whether a record was served from the cache or fetched from a provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum CacheStatus {
    /// Served from the record cache
    Hit,
    /// Fetched from an upstream provider
    Miss,
}

impl CacheStatus {
    /// Value used for the `X-Cache` response header
    pub fn as_header_value(self) -> &'static str {
        match self {
            CacheStatus::Hit => "HIT",
            CacheStatus::Miss => "MISS",
        }
    }

    /// Check if the record came from the cache
    pub fn is_hit(self) -> bool {
        matches!(self, CacheStatus::Hit)
    }
}

impl std::fmt::Display for CacheStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_header_value())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_values() {
        assert_eq!(CacheStatus::Hit.as_header_value(), "HIT");
        assert_eq!(CacheStatus::Miss.to_string(), "MISS");
        assert!(CacheStatus::Hit.is_hit());
        assert!(!CacheStatus::Miss.is_hit());
    }

    #[test]
    fn serializes_uppercase() {
        assert_eq!(serde_json::to_string(&CacheStatus::Hit).unwrap(), "\"HIT\"");
    }
}
