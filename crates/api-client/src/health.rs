// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Health status reported for upstream providers

use serde::{Deserialize, Serialize};

/// Health status of a provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[allow(missing_docs)]
pub enum HealthStatus {
    /// Provider is eligible and its last call succeeded
    Up,
    /// Provider is eligible but recent calls failed
    Degraded { reason: String },
    /// Provider is disabled until its cooldown elapses
    Down { reason: String },
}

impl HealthStatus {
    /// Check if this health status indicates the provider can be selected
    pub fn is_available(&self) -> bool {
        matches!(self, HealthStatus::Up | HealthStatus::Degraded { .. })
    }

    /// Check if this health status indicates the provider is disabled
    pub fn is_down(&self) -> bool {
        matches!(self, HealthStatus::Down { .. })
    }

    /// Get a human-readable description of the status
    pub fn description(&self) -> &str {
        match self {
            HealthStatus::Up => "Provider is healthy",
            HealthStatus::Degraded { reason } | HealthStatus::Down { reason } => reason,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn health_status_availability() {
        assert!(HealthStatus::Up.is_available());
        assert!(
            HealthStatus::Degraded {
                reason: "1 consecutive error".to_string()
            }
            .is_available()
        );
        assert!(
            !HealthStatus::Down {
                reason: "cooling down".to_string()
            }
            .is_available()
        );
    }

    #[test]
    fn health_status_description() {
        assert_eq!(HealthStatus::Up.description(), "Provider is healthy");
        let down = HealthStatus::Down {
            reason: "cooling down".to_string(),
        };
        assert!(down.is_down());
        assert_eq!(down.description(), "cooling down");
    }
}
