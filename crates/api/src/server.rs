// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Server implementation module
//!
//! This module provides the main server struct for the WHOIS API server,
//! including provider and cache construction, router configuration, and
//! coordinated graceful shutdown using `CancellationToken`.

use std::{net::SocketAddr, sync::Arc, time::Duration};

use axum::{
    Router,
    http::{HeaderName, HeaderValue, header},
};
use external_apis::{
    UpstreamProvider, WhoisFreaksClient, WhoisFreaksConfig, WhoisXmlClient, WhoisXmlConfig,
};
use hyper::Request;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower::ServiceBuilder;
use tower_http::{
    cors::CorsLayer,
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    set_header::SetResponseHeaderLayer,
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::{error, info, info_span, warn};
use whois_resolver::{CacheStore, ProviderRegistry, RecordCache, WhoisResolver};

use crate::{
    config::{ProviderConfig, ServerConfig},
    error::{ServerError, ServerResult},
    extractors::MAX_JSON_PAYLOAD_SIZE,
    middleware::{RateLimiter, request_validation_middleware},
    routes::create_routes,
    state::{ServerState, SharedResolver},
};

// Server constants
const REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");
const DEFAULT_GRACEFUL_SHUTDOWN_TIMEOUT_SECONDS: u64 = 30;

const SECURITY_HEADERS: [(HeaderName, &str); 5] = [
    (header::X_CONTENT_TYPE_OPTIONS, "nosniff"),
    (header::X_FRAME_OPTIONS, "DENY"),
    (header::REFERRER_POLICY, "strict-origin-when-cross-origin"),
    (
        header::CONTENT_SECURITY_POLICY,
        "default-src 'self'; script-src 'self' 'unsafe-inline' https://unpkg.com; style-src 'self' 'unsafe-inline' https://unpkg.com; img-src 'self' data:",
    ),
    (
        header::STRICT_TRANSPORT_SECURITY,
        "max-age=31536000; includeSubDomains",
    ),
];

/// Configuration for server shutdown behavior
#[derive(Debug, Clone)]
pub struct ShutdownConfig {
    /// Maximum time to wait for in-flight requests after shutdown begins
    pub graceful_timeout: Duration,
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self {
            graceful_timeout: Duration::from_secs(DEFAULT_GRACEFUL_SHUTDOWN_TIMEOUT_SECONDS),
        }
    }
}

/// Main server struct
#[derive(Debug)]
pub struct Server {
    /// Server configuration
    config: ServerConfig,
    /// Application router
    router: Router,
    /// Server state
    state: ServerState,
    /// Cancellation token for coordinated shutdown
    cancellation_token: CancellationToken,
    /// Configuration for coordinated shutdown
    shutdown_config: ShutdownConfig,
}

impl Server {
    /// Create new server instance, connecting the configured cache backend
    ///
    /// # Errors
    ///
    /// Returns `ServerError::Config` if the configuration is invalid, or
    /// `ServerError::Dependency` if a provider client or the cache backend
    /// cannot be constructed.
    pub async fn new(config: ServerConfig, shutdown_config: ShutdownConfig) -> ServerResult<Self> {
        config.validate().map_err(|e| ServerError::Config {
            message: e.to_string(),
        })?;

        let resolver_config = config.resolver_config();
        let registry = Self::create_provider_registry(&config)?;

        let backend = config.cache.backend_config().map_err(|e| ServerError::Config {
            message: e.to_string(),
        })?;
        let store = CacheStore::connect(&backend)
            .await
            .map_err(|e| ServerError::Dependency {
                message: format!("failed to connect cache backend: {e}"),
            })?;

        let resolver = WhoisResolver::new(registry, RecordCache::new(store, resolver_config.cache));
        Self::with_resolver(config, shutdown_config, Arc::new(resolver))
    }

    /// Register every enabled provider that has an API key, in failover order
    fn create_provider_registry(
        config: &ServerConfig,
    ) -> ServerResult<ProviderRegistry<UpstreamProvider>> {
        let mut registry = ProviderRegistry::new(&config.resolver_config());
        let providers = &config.providers;

        if let Some(api_key) = Self::usable_key("whoisfreaks", &providers.whoisfreaks) {
            let client = WhoisFreaksClient::new(WhoisFreaksConfig {
                base_url: providers.whoisfreaks.base_url.to_string(),
                api_key,
                timeout_seconds: providers.whoisfreaks.timeout_seconds.value().as_secs(),
            })
            .map_err(|e| ServerError::Dependency {
                message: format!("failed to create WhoisFreaks client: {e}"),
            })?;
            Self::register(&mut registry, client.into())?;
        }

        if let Some(api_key) = Self::usable_key("whoisxml", &providers.whoisxml) {
            let client = WhoisXmlClient::new(WhoisXmlConfig {
                base_url: providers.whoisxml.base_url.to_string(),
                api_key,
                timeout_seconds: providers.whoisxml.timeout_seconds.value().as_secs(),
            })
            .map_err(|e| ServerError::Dependency {
                message: format!("failed to create WhoisXML client: {e}"),
            })?;
            Self::register(&mut registry, client.into())?;
        }

        if registry.is_empty() {
            warn!("no WHOIS providers registered, lookups will fail until one is configured");
        }
        Ok(registry)
    }

    fn usable_key(
        name: &str,
        provider: &ProviderConfig,
    ) -> Option<external_apis::NonEmptyString> {
        let key = provider.usable_key();
        if provider.enabled && key.is_none() {
            warn!(provider = name, "provider enabled without an API key, skipping");
        }
        key
    }

    fn register(
        registry: &mut ProviderRegistry<UpstreamProvider>,
        provider: UpstreamProvider,
    ) -> ServerResult<()> {
        let name = api_client::WhoisProvider::name(&provider).to_string();
        registry
            .register(provider)
            .map_err(|e| ServerError::Config {
                message: e.to_string(),
            })?;
        info!(provider = %name, "registered WHOIS provider");
        Ok(())
    }

    /// Create server with a prepared resolver for dependency injection
    ///
    /// # Errors
    ///
    /// Returns `ServerError::Config` if the configuration is invalid.
    pub fn with_resolver(
        config: ServerConfig,
        shutdown_config: ShutdownConfig,
        resolver: SharedResolver,
    ) -> ServerResult<Self> {
        let cancellation_token = CancellationToken::new();
        let state = ServerState::new(config.clone(), resolver, cancellation_token.child_token());
        let router = Self::create_router(state.clone());

        Ok(Self {
            config,
            router,
            state,
            cancellation_token,
            shutdown_config,
        })
    }

    /// Create application router with middleware
    fn create_router(state: ServerState) -> Router {
        let timeout_duration = state.config().timeout_seconds.value();
        let rate_limiter = RateLimiter::new(state.config().rate_limiting.clone());

        let security_headers = SECURITY_HEADERS.map(|(name, value)| {
            SetResponseHeaderLayer::if_not_present(name, HeaderValue::from_static(value))
        });
        let [nosniff, frame_options, referrer_policy, csp, hsts] = security_headers;

        let middleware = ServiceBuilder::new()
            .layer(SetRequestIdLayer::new(REQUEST_ID_HEADER, MakeRequestUuid))
            .layer(
                TraceLayer::new_for_http().make_span_with(|req: &Request<_>| {
                    if let Some(request_id) = req.headers().get(REQUEST_ID_HEADER) {
                        info_span!("http_request", ?request_id, method = %req.method(), uri = %req.uri())
                    } else {
                        error!("failed to extract id from request");
                        info_span!("http_request", request_id = "unknown", method = %req.method(), uri = %req.uri())
                    }
                }),
            )
            .layer(PropagateRequestIdLayer::new(REQUEST_ID_HEADER))
            .layer(nosniff)
            .layer(frame_options)
            .layer(referrer_policy)
            .layer(csp)
            .layer(hsts)
            .layer(CorsLayer::permissive())
            .layer(axum::middleware::from_fn(request_validation_middleware))
            .layer(RequestBodyLimitLayer::new(MAX_JSON_PAYLOAD_SIZE))
            .layer(TimeoutLayer::new(timeout_duration));

        create_routes(rate_limiter)
            .layer(middleware)
            .with_state(state)
    }

    /// Run the server with coordinated graceful shutdown
    ///
    /// # Errors
    ///
    /// Returns `ServerError::Bind` if unable to bind to the configured address,
    /// or `ServerError::Startup` if the server fails to start.
    pub async fn run(self) -> ServerResult<()> {
        let addr = self.config.socket_addr();
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|source| ServerError::Bind {
                address: addr,
                source,
            })?;

        let actual_addr = listener
            .local_addr()
            .map_err(|source| ServerError::Startup { source })?;

        info!(
            address = %actual_addr,
            environment = %self.config.environment,
            providers = ?self.state.resolver().registry().names(),
            cache_backend = self.state.resolver().cache().backend().kind(),
            "WHOIS API server starting",
        );

        let cancellation_token = self.cancellation_token.clone();
        let shutdown_token = cancellation_token.clone();
        tokio::spawn(async move {
            info!("spawning the graceful shutdown task");
            Self::shutdown_signal_handler(shutdown_token).await;
        });

        let graceful_timeout = self.shutdown_config.graceful_timeout;
        let drain_token = cancellation_token.clone();
        let serve = axum::serve(
            listener,
            self.router
                .into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(async move {
            cancellation_token.cancelled().await;
            info!("draining in-flight requests");
        });

        match Self::drain_within(serve.into_future(), drain_token, graceful_timeout).await {
            Some(Err(e)) => {
                error!(error = ?e, "Server error during shutdown");
                Err(ServerError::Shutdown { source: e })
            }
            Some(Ok(())) => {
                info!("WHOIS API server shut down gracefully");
                Ok(())
            }
            None => {
                warn!(
                    graceful_timeout_seconds = graceful_timeout.as_secs(),
                    "graceful shutdown timed out, abandoning in-flight requests"
                );
                Ok(())
            }
        }
    }

    /// Drive `serve` to completion, giving up `deadline` after cancellation
    ///
    /// Returns `None` when the deadline elapsed before the server drained.
    async fn drain_within<F>(
        serve: F,
        cancellation_token: CancellationToken,
        deadline: Duration,
    ) -> Option<std::io::Result<()>>
    where
        F: Future<Output = std::io::Result<()>>,
    {
        tokio::select! {
            result = serve => Some(result),
            () = async {
                cancellation_token.cancelled().await;
                tokio::time::sleep(deadline).await;
            } => None,
        }
    }

    /// Handle shutdown signals and trigger coordinated cancellation
    ///
    /// Listens for SIGINT (Ctrl+C) and SIGTERM, and cancels the token when one
    /// is received.
    async fn shutdown_signal_handler(cancellation_token: CancellationToken) {
        let signal_received = async {
            #[cfg(unix)]
            #[allow(clippy::expect_used)]
            {
                use tokio::signal::unix::{SignalKind, signal};

                let mut sigterm =
                    signal(SignalKind::terminate()).expect("Failed to register SIGTERM handler");
                let mut sigint =
                    signal(SignalKind::interrupt()).expect("Failed to register SIGINT handler");

                tokio::select! {
                    _ = sigterm.recv() => "SIGTERM",
                    _ = sigint.recv() => "SIGINT",
                }
            }

            #[cfg(not(unix))]
            #[allow(clippy::expect_used)]
            {
                tokio::signal::ctrl_c()
                    .await
                    .expect("Failed to install CTRL+C signal handler");
                "CTRL+C"
            }
        };

        tokio::select! {
            signal_name = signal_received => {
                warn!(signal = signal_name, "shutdown signal received, cancelling all operations");
                cancellation_token.cancel();
            },
            () = cancellation_token.cancelled() => {
                warn!("cancellation token already cancelled, shutdown signal handler exiting");
            }
        }
    }

    /// Returns a clone of the cancellation token for coordinated shutdown
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation_token.clone()
    }

    /// Initiates graceful shutdown by cancelling the server's cancellation token
    pub fn shutdown(&self) {
        info!("programmatic shutdown requested");
        self.cancellation_token.cancel();
    }

    /// Run server for testing, returns the bound address
    ///
    /// # Errors
    ///
    /// Returns `ServerError::Bind` if unable to bind to the configured address.
    pub async fn run_for_testing(self) -> ServerResult<(SocketAddr, CancellationToken)> {
        let addr = self.config.socket_addr();

        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|source| ServerError::Bind {
                address: addr,
                source,
            })?;

        let actual_addr = listener
            .local_addr()
            .map_err(|source| ServerError::Startup { source })?;

        let token = self.cancellation_token.clone();
        let task = token.child_token();
        tokio::spawn(async move {
            let _ = axum::serve(
                listener,
                self.router
                    .into_make_service_with_connect_info::<SocketAddr>(),
            )
            .with_graceful_shutdown(async move { task.cancelled().await })
            .await;
        });

        Ok((actual_addr, token))
    }

    /// Get server configuration
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Get server state for testing
    pub fn state(&self) -> &ServerState {
        &self.state
    }
}
