// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Provider registry
//!
//! Holds the providers in registration order together with their health
//! tracker. Providers are registered once at startup; afterwards the registry
//! is shared immutably and only health records change.

use api_client::WhoisProvider;
use tokio::time::Instant;
use tracing::info;

use crate::{
    config::ResolverConfig,
    error::{ResolverError, ResolverResult},
    health::{HealthTracker, ProviderHealth, ProviderHealthSnapshot},
    selector::ProviderSelector,
};

/// Ordered providers plus their shared health state
#[derive(Debug)]
pub struct ProviderRegistry<P> {
    providers: Vec<P>,
    names: Vec<String>,
    tracker: HealthTracker,
    selector: ProviderSelector,
}

impl<P: WhoisProvider> ProviderRegistry<P> {
    /// Create an empty registry using the health policy from `config`
    pub fn new(config: &ResolverConfig) -> Self {
        Self {
            providers: Vec::new(),
            names: Vec::new(),
            tracker: HealthTracker::new(config.max_retries, config.cooldown),
            selector: ProviderSelector::new(),
        }
    }

    /// Build a registry from providers in priority order
    ///
    /// # Errors
    ///
    /// Returns a configuration error if two providers share a name
    pub fn with_providers(
        config: &ResolverConfig,
        providers: impl IntoIterator<Item = P>,
    ) -> ResolverResult<Self> {
        let mut registry = Self::new(config);
        for provider in providers {
            registry.register(provider)?;
        }
        Ok(registry)
    }

    /// Append a provider; its health record starts available with `last_used_at = now`
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the name is already registered
    pub fn register(&mut self, provider: P) -> ResolverResult<()> {
        let name = provider.name().to_string();
        if !self.tracker.register(&name, Instant::now()) {
            return Err(ResolverError::config(format!(
                "provider {name} is already registered"
            )));
        }
        info!(provider = %name, position = self.providers.len(), "registered provider");
        self.names.push(name);
        self.providers.push(provider);
        Ok(())
    }

    /// Providers in registration order
    pub fn providers(&self) -> &[P] {
        &self.providers
    }

    /// Provider names in registration order
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Number of registered providers
    pub fn len(&self) -> usize {
        self.providers.len()
    }

    /// Whether no provider is registered
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// Run a selection pass and return the chosen provider
    pub async fn select(&self) -> Option<&P> {
        let index = self
            .tracker
            .select(&self.names, &self.selector, Instant::now())
            .await?;
        self.providers.get(index)
    }

    /// Record a successful query
    pub async fn record_success(&self, name: &str) {
        self.tracker.record_success(name, Instant::now()).await;
    }

    /// Record a failed query, returning the updated health record
    pub async fn record_failure(&self, name: &str) -> Option<ProviderHealth> {
        self.tracker.record_failure(name, Instant::now()).await
    }

    /// Whether `name` may currently be used for failover
    pub async fn is_available(&self, name: &str) -> bool {
        self.tracker.is_available(name).await
    }

    /// Health record for `name`
    pub async fn health(&self, name: &str) -> Option<ProviderHealth> {
        self.tracker.get(name).await
    }

    /// Reporting view of every provider, in registration order
    pub async fn health_snapshot(&self) -> Vec<ProviderHealthSnapshot> {
        self.tracker.snapshot(&self.names, Instant::now()).await
    }
}
