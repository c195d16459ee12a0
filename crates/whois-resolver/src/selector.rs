// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Provider scoring
//!
//! Lower scores win:
//!
//! ```text
//! score = call_count + 10 * consecutive_errors + minutes_since_last_use
//!         - 0.5 * (total_providers - call_count)
//! ```
//!
//! Ties go to the earliest provider in registration order.

use std::collections::HashMap;

use tokio::time::Instant;
use tracing::debug;

use crate::health::ProviderHealth;

const ERROR_WEIGHT: f64 = 10.0;
const SPREAD_WEIGHT: f64 = 0.5;

/// Picks the first provider to query for a fresh lookup
#[derive(Debug, Clone, Copy, Default)]
pub struct ProviderSelector;

impl ProviderSelector {
    /// Create a selector
    pub fn new() -> Self {
        Self
    }

    /// Score a single provider
    #[allow(clippy::cast_precision_loss)]
    pub fn score(&self, health: &ProviderHealth, total_providers: usize, now: Instant) -> f64 {
        let calls = health.call_count as f64;
        let minutes_idle = health.idle_for(now).as_secs_f64() / 60.0;
        calls + ERROR_WEIGHT * f64::from(health.consecutive_errors) + minutes_idle
            - SPREAD_WEIGHT * (total_providers as f64 - calls)
    }

    /// Index into `order` of the lowest-scoring available provider
    ///
    /// Providers without a health record or with `available == false` are skipped.
    pub fn pick(
        &self,
        order: &[String],
        records: &HashMap<String, ProviderHealth>,
        now: Instant,
    ) -> Option<usize> {
        let total = order.len();
        let mut best: Option<(usize, f64)> = None;

        for (index, name) in order.iter().enumerate() {
            let Some(health) = records.get(name).filter(|health| health.available) else {
                continue;
            };
            let score = self.score(health, total, now);
            debug!(provider = %name, score, "scored provider");
            if best.is_none_or(|(_, best_score)| score < best_score) {
                best = Some((index, score));
            }
        }

        best.map(|(index, _)| index)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn records(
        entries: &[(&str, ProviderHealth)],
    ) -> (Vec<String>, HashMap<String, ProviderHealth>) {
        let order = entries.iter().map(|(name, _)| (*name).to_string()).collect();
        let map = entries
            .iter()
            .map(|(name, health)| ((*name).to_string(), *health))
            .collect();
        (order, map)
    }

    #[test]
    fn score_formula() {
        let now = Instant::now();
        let mut health = ProviderHealth::new(now);
        health.call_count = 4;
        health.consecutive_errors = 1;
        // 4 + 10 - 0.5 * (2 - 4)
        assert!((ProviderSelector::new().score(&health, 2, now) - 15.0).abs() < f64::EPSILON);
    }

    #[test]
    fn error_streak_loses_to_clean_peer() {
        let now = Instant::now();
        let clean = ProviderHealth::new(now);
        let mut failing = ProviderHealth::new(now);
        failing.consecutive_errors = 1;

        let (order, map) = records(&[("failing", failing), ("clean", clean)]);
        assert_eq!(ProviderSelector::new().pick(&order, &map, now), Some(1));
    }

    #[test]
    fn tie_goes_to_registration_order() {
        let now = Instant::now();
        let (order, map) = records(&[
            ("first", ProviderHealth::new(now)),
            ("second", ProviderHealth::new(now)),
        ]);
        assert_eq!(ProviderSelector::new().pick(&order, &map, now), Some(0));
    }

    #[test]
    fn unavailable_providers_are_skipped() {
        let now = Instant::now();
        let mut down = ProviderHealth::new(now);
        down.available = false;
        let (order, map) = records(&[("down", down)]);
        assert_eq!(ProviderSelector::new().pick(&order, &map, now), None);
        assert_eq!(ProviderSelector::new().pick(&[], &HashMap::new(), now), None);
    }

    #[test]
    fn heavier_use_shifts_load_to_peer() {
        let now = Instant::now();
        let mut busy = ProviderHealth::new(now);
        busy.call_count = 3;
        let (order, map) = records(&[("busy", busy), ("idle", ProviderHealth::new(now))]);
        assert_eq!(ProviderSelector::new().pick(&order, &map, now), Some(1));
    }

    #[tokio::test(start_paused = true)]
    async fn idle_time_adds_to_score() {
        let earlier = Instant::now();
        tokio::time::advance(Duration::from_secs(120)).await;
        let now = Instant::now();

        let stale = ProviderHealth::new(earlier);
        let fresh = ProviderHealth::new(now);
        let selector = ProviderSelector::new();
        assert!(selector.score(&stale, 2, now) > selector.score(&fresh, 2, now));
    }
}
