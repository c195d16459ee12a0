// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Per-provider health bookkeeping
//!
//! Health records are created when a provider is registered and live for the
//! whole process. All of them sit behind one `RwLock`; any path that mutates a
//! record, including the cooldown re-enable done during selection, takes the
//! write half. Only [`HealthTracker::snapshot`] and [`HealthTracker::get`] read.

use std::{collections::HashMap, time::Duration};

use api_client::HealthStatus;
use serde::Serialize;
use tokio::{sync::RwLock, time::Instant};
use tracing::{info, warn};

use crate::selector::ProviderSelector;

/// Mutable health state of one provider
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProviderHealth {
    /// Queries issued to the provider
    pub call_count: u64,
    /// When the provider was registered or last queried
    pub last_used_at: Instant,
    /// Failures since the last success
    pub consecutive_errors: u32,
    /// Whether the provider may be selected or used for failover
    pub available: bool,
}

impl ProviderHealth {
    /// Fresh record for a provider registered at `now`
    pub fn new(now: Instant) -> Self {
        Self {
            call_count: 0,
            last_used_at: now,
            consecutive_errors: 0,
            available: true,
        }
    }

    /// Record a successful query
    pub fn record_success(&mut self, now: Instant) {
        self.call_count += 1;
        self.last_used_at = now;
        self.consecutive_errors = 0;
    }

    /// Record a failed query, returning true if this failure disabled the provider
    pub fn record_failure(&mut self, now: Instant, max_retries: u32) -> bool {
        self.call_count += 1;
        self.last_used_at = now;
        self.consecutive_errors = self.consecutive_errors.saturating_add(1);
        if self.available && self.consecutive_errors >= max_retries {
            self.available = false;
            return true;
        }
        false
    }

    /// Time since the provider was last used
    pub fn idle_for(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.last_used_at)
    }

    /// Whether a disabled provider has sat out its cooldown
    pub fn cooldown_elapsed(&self, now: Instant, cooldown: Duration) -> bool {
        !self.available && self.idle_for(now) > cooldown
    }

    /// Re-enable after cooldown, clearing the error streak
    pub fn reenable(&mut self) {
        self.available = true;
        self.consecutive_errors = 0;
    }
}

/// Point-in-time view of a provider's health for reporting
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProviderHealthSnapshot {
    /// Provider name
    pub name: String,
    /// Queries issued so far
    pub call_count: u64,
    /// Failures since the last success
    pub consecutive_errors: u32,
    /// Availability, counting a cooldown that has elapsed but not yet been applied
    pub available: bool,
    /// Seconds since last use
    pub idle_seconds: u64,
}

impl ProviderHealthSnapshot {
    /// Map to the reporting status
    pub fn status(&self) -> HealthStatus {
        if !self.available {
            HealthStatus::Down {
                reason: format!(
                    "disabled after {} consecutive errors",
                    self.consecutive_errors
                ),
            }
        } else if self.consecutive_errors > 0 {
            HealthStatus::Degraded {
                reason: format!("{} consecutive errors", self.consecutive_errors),
            }
        } else {
            HealthStatus::Up
        }
    }
}

/// Shared health records keyed by provider name
#[derive(Debug)]
pub struct HealthTracker {
    records: RwLock<HashMap<String, ProviderHealth>>,
    max_retries: u32,
    cooldown: Duration,
}

impl HealthTracker {
    /// Create an empty tracker
    pub fn new(max_retries: u32, cooldown: Duration) -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
            max_retries,
            cooldown,
        }
    }

    /// Consecutive errors that disable a provider
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Cooldown before re-enable
    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }

    /// Create the record for a newly registered provider
    ///
    /// Takes `&mut self` so registration happens before the tracker is shared.
    pub fn register(&mut self, name: &str, now: Instant) -> bool {
        let records = self.records.get_mut();
        if records.contains_key(name) {
            return false;
        }
        records.insert(name.to_string(), ProviderHealth::new(now));
        true
    }

    /// Run a selection pass over `order`, returning the chosen index
    ///
    /// Cooldown re-enables happen inside the same exclusive section as scoring.
    pub async fn select(
        &self,
        order: &[String],
        selector: &ProviderSelector,
        now: Instant,
    ) -> Option<usize> {
        let mut records = self.records.write().await;

        for name in order {
            if let Some(health) = records.get_mut(name) {
                if health.cooldown_elapsed(now, self.cooldown) {
                    health.reenable();
                    info!(
                        provider = %name,
                        idle_seconds = health.idle_for(now).as_secs(),
                        "provider re-enabled after cooldown"
                    );
                }
            }
        }

        selector.pick(order, &records, now)
    }

    /// Record a successful query against `name`
    pub async fn record_success(&self, name: &str, now: Instant) {
        let mut records = self.records.write().await;
        if let Some(health) = records.get_mut(name) {
            health.record_success(now);
        }
    }

    /// Record a failed query against `name`, returning the updated record
    pub async fn record_failure(&self, name: &str, now: Instant) -> Option<ProviderHealth> {
        let mut records = self.records.write().await;
        let health = records.get_mut(name)?;
        if health.record_failure(now, self.max_retries) {
            warn!(
                provider = name,
                consecutive_errors = health.consecutive_errors,
                cooldown_seconds = self.cooldown.as_secs(),
                "provider disabled after repeated failures"
            );
        }
        Some(*health)
    }

    /// Current availability flag of `name`
    pub async fn is_available(&self, name: &str) -> bool {
        self.records
            .read()
            .await
            .get(name)
            .is_some_and(|health| health.available)
    }

    /// Copy of the record for `name`
    pub async fn get(&self, name: &str) -> Option<ProviderHealth> {
        self.records.read().await.get(name).copied()
    }

    /// Reporting view of every provider in `order`
    pub async fn snapshot(&self, order: &[String], now: Instant) -> Vec<ProviderHealthSnapshot> {
        let records = self.records.read().await;
        order
            .iter()
            .filter_map(|name| {
                let health = records.get(name)?;
                let recovered = health.cooldown_elapsed(now, self.cooldown);
                Some(ProviderHealthSnapshot {
                    name: name.clone(),
                    call_count: health.call_count,
                    consecutive_errors: if recovered {
                        0
                    } else {
                        health.consecutive_errors
                    },
                    available: health.available || recovered,
                    idle_seconds: health.idle_for(now).as_secs(),
                })
            })
            .collect()
    }
}
