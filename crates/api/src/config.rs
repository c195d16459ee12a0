// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Server configuration module
//!
//! This module provides configuration structures and logic for the WHOIS API server,
//! supporting different environments and validation of configuration parameters.

use std::{
    net::{IpAddr, Ipv4Addr, SocketAddr},
    time::Duration,
};

use anyhow::{Result, anyhow, ensure};
use config::{Config, ConfigError, Environment as ConfigEnv, File};
use external_apis::{
    NonEmptyString, WHOISFREAKS_DEFAULT_BASE_URL, WHOISFREAKS_DEFAULT_TIMEOUT_SECONDS,
    WHOISXML_DEFAULT_BASE_URL, WHOISXML_DEFAULT_TIMEOUT_SECONDS,
};
use serde::{Deserialize, Deserializer, Serialize, de};
use url::Url;
use whois_resolver::{
    BackendConfig, CachePolicy, ResolverConfig,
    config::{
        DEFAULT_COOLDOWN, DEFAULT_KEY_PREFIX, DEFAULT_MAX_ENTRIES, DEFAULT_MAX_RETRIES,
        DEFAULT_MAX_SCAN_PAGES, DEFAULT_SCAN_PAGE_SIZE,
    },
};

use crate::error::{ServerError, ServerResult};

const DEFAULT_REQUEST_TIMEOUT_SECONDS: u64 = 90;
const MAX_TIMEOUT_SECONDS: u64 = 300;
const DEFAULT_REQUESTS_PER_MINUTE: u32 = 60;
const HOUR: u64 = 60 * 60;

/// A validated server port that ensures the value is appropriate for the environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ServerPort {
    port: u16,
    environment: Environment,
}

impl ServerPort {
    /// Create a new `ServerPort`, ensuring it's valid for the given environment
    ///
    /// # Errors
    ///
    /// Returns an error if the port is 0 in non-testing environments
    pub fn new(port: u16, environment: Environment) -> Result<Self> {
        if port == 0 && environment != Environment::Testing {
            return Err(anyhow!("port cannot be 0 in non-testing environments"));
        }
        Ok(Self { port, environment })
    }

    /// Create a safe default port for development
    pub const fn default_development() -> Self {
        Self {
            port: 3000,
            environment: Environment::Development,
        }
    }

    /// Create a safe testing port (port 0)
    pub const fn testing() -> Self {
        Self {
            port: 0,
            environment: Environment::Testing,
        }
    }

    /// Get the port value
    pub fn value(&self) -> u16 {
        self.port
    }
}

impl<'de> Deserialize<'de> for ServerPort {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let port = u16::deserialize(deserializer)?;
        // re-checked in `load` once the environment is known
        Ok(Self {
            port,
            environment: Environment::Development,
        })
    }
}

/// A validated timeout duration in seconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimeoutSeconds(Duration);

impl TimeoutSeconds {
    /// Create a new `TimeoutSeconds`, ensuring the value is within valid bounds
    ///
    /// # Errors
    ///
    /// Returns an error if timeout is 0 or greater than 300 seconds
    pub fn new(seconds: u64) -> Result<Self> {
        ensure!(seconds != 0, "timeout must be greater than 0");
        ensure!(
            seconds <= MAX_TIMEOUT_SECONDS,
            "timeout cannot exceed {MAX_TIMEOUT_SECONDS}"
        );
        Ok(Self(Duration::from_secs(seconds)))
    }

    /// Outer request timeout, long enough for a full provider failover
    pub const fn default_value() -> Self {
        Self(Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECONDS))
    }

    /// Create a safe testing timeout (5 seconds)
    pub const fn testing() -> Self {
        Self(Duration::from_secs(5))
    }

    /// Get the timeout duration
    pub fn value(&self) -> Duration {
        self.0
    }
}

impl<'de> Deserialize<'de> for TimeoutSeconds {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let seconds = u64::deserialize(deserializer)?;
        Self::new(seconds).map_err(|e| de::Error::custom(e.to_string()))
    }
}

impl Default for TimeoutSeconds {
    fn default() -> Self {
        Self::default_value()
    }
}

/// Environment types for configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    /// Production environment
    Production,
    /// Development environment
    Development,
    /// Testing environment
    Testing,
}

/// Per-IP request limiting
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitingConfig {
    /// Whether the limiter is applied to API routes
    pub enabled: bool,
    /// Requests allowed per client IP in each one-minute window
    pub requests_per_minute: u32,
}

impl Default for RateLimitingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            requests_per_minute: DEFAULT_REQUESTS_PER_MINUTE,
        }
    }
}

/// Settings for one upstream WHOIS provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Whether the provider is registered at startup
    pub enabled: bool,
    /// API base URL
    pub base_url: Url,
    /// API key, usually supplied through the provider's environment variable
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,
    /// Per-request deadline
    pub timeout_seconds: TimeoutSeconds,
}

impl ProviderConfig {
    fn disabled(base_url: &str, timeout_seconds: u64) -> Result<Self> {
        Ok(Self {
            enabled: false,
            base_url: Url::parse(base_url)?,
            api_key: None,
            timeout_seconds: TimeoutSeconds::new(timeout_seconds)?,
        })
    }

    /// API key when the provider is enabled and has a non-blank key
    pub fn usable_key(&self) -> Option<NonEmptyString> {
        if !self.enabled {
            return None;
        }
        self.api_key
            .as_deref()
            .and_then(|key| NonEmptyString::new(key).ok())
    }
}

/// Upstream providers in failover priority order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvidersConfig {
    /// WhoisFreaks, the primary provider
    pub whoisfreaks: ProviderConfig,
    /// WhoisXML API
    pub whoisxml: ProviderConfig,
}

impl ProvidersConfig {
    /// Whether at least one provider can be registered
    pub fn any_usable(&self) -> bool {
        self.whoisfreaks.usable_key().is_some() || self.whoisxml.usable_key().is_some()
    }
}

/// Provider health policy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolverSettings {
    /// Consecutive errors before a provider is disabled
    pub max_retries: u32,
    /// Seconds a disabled provider waits before it is re-enabled
    pub cooldown_seconds: u64,
}

/// Cache backend kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackendKind {
    /// In-process map
    Memory,
    /// Shared Redis instance
    Redis,
}

/// Record cache settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheSettings {
    /// Backend to construct at startup
    pub backend: CacheBackendKind,
    /// Redis connection URL, also read from `REDIS_URL`
    #[serde(default, skip_serializing)]
    pub redis_url: Option<String>,
    /// Key namespace
    pub key_prefix: String,
    /// Base TTL for registered domains
    pub registered_ttl_hours: u64,
    /// Base TTL for unregistered domains
    pub unregistered_ttl_hours: u64,
    /// Base TTL for records produced from an error path
    pub error_ttl_hours: u64,
    /// Symmetric jitter applied to every TTL
    pub jitter_hours: u64,
    /// Entry count that triggers eviction
    pub max_entries: u64,
    /// Entries expiring within this window are evicted first
    pub freshness_floor_hours: u64,
    /// Keys requested per scan page
    pub scan_page_size: usize,
    /// Upper bound on pages per eviction pass
    pub max_scan_pages: usize,
}

impl CacheSettings {
    /// Record cache policy built from these settings
    pub fn policy(&self) -> CachePolicy {
        let hours = |h: u64| Duration::from_secs(h.saturating_mul(HOUR));
        CachePolicy {
            key_prefix: self.key_prefix.clone(),
            registered_ttl: hours(self.registered_ttl_hours),
            unregistered_ttl: hours(self.unregistered_ttl_hours),
            error_ttl: hours(self.error_ttl_hours),
            jitter: hours(self.jitter_hours),
            max_entries: self.max_entries,
            freshness_floor: hours(self.freshness_floor_hours),
            scan_page_size: self.scan_page_size,
            max_scan_pages: self.max_scan_pages,
        }
    }

    /// Backend description for `CacheStore::connect`
    ///
    /// # Errors
    ///
    /// Returns an error if the Redis backend is selected without a URL
    pub fn backend_config(&self) -> Result<BackendConfig> {
        match self.backend {
            CacheBackendKind::Memory => Ok(BackendConfig::Memory),
            CacheBackendKind::Redis => {
                let url = self
                    .redis_url
                    .as_deref()
                    .map(str::trim)
                    .filter(|url| !url.is_empty())
                    .ok_or_else(|| {
                        anyhow!("cache.redis_url (or REDIS_URL) is required for the redis backend")
                    })?;
                Ok(BackendConfig::Redis {
                    url: url.to_string(),
                })
            }
        }
    }
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            backend: CacheBackendKind::Memory,
            redis_url: None,
            key_prefix: DEFAULT_KEY_PREFIX.to_string(),
            registered_ttl_hours: 30 * 24,
            unregistered_ttl_hours: 7 * 24,
            error_ttl_hours: 24,
            jitter_hours: 6,
            max_entries: DEFAULT_MAX_ENTRIES,
            freshness_floor_hours: 24,
            scan_page_size: DEFAULT_SCAN_PAGE_SIZE,
            max_scan_pages: DEFAULT_MAX_SCAN_PAGES,
        }
    }
}

/// Server configuration for different environments
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Server host address
    pub host: IpAddr,
    /// Server port (validated for environment compatibility)
    pub port: ServerPort,
    /// Outer request timeout in seconds (validated range: 1-300)
    pub timeout_seconds: TimeoutSeconds,
    /// Environment type
    pub environment: Environment,
    /// Per-IP rate limiting
    pub rate_limiting: RateLimitingConfig,
    /// Upstream WHOIS providers
    pub providers: ProvidersConfig,
    /// Provider health policy
    pub resolver: ResolverSettings,
    /// Record cache
    pub cache: CacheSettings,
}

impl ServerConfig {
    /// Create configuration from environment variables and optional configuration files
    ///
    /// # Errors
    ///
    /// Returns `ServerError::Config` if configuration is invalid or cannot be loaded.
    pub fn from_env() -> ServerResult<Self> {
        let config = Self::load().map_err(|e| ServerError::Config {
            message: format!("failed to load configuration: {e}"),
        })?;
        config.validate().map_err(|e| ServerError::Config {
            message: format!("invalid configuration: {e}"),
        })?;
        Ok(config)
    }

    /// Load configuration using the config crate with hierarchical sources
    ///
    /// Configuration is loaded in the following order (later sources override earlier ones):
    /// 1. Default values
    /// 2. Configuration file (config.json)
    /// 3. Environment-specific files (config.{env}.json)
    /// 4. Environment variables with `SERVER_` prefix, nested keys separated by `__`
    ///    (e.g. `SERVER_CACHE__BACKEND=redis`)
    /// 5. `WHOISFREAKS_API_KEY`, `WHOISXML_API_KEY` and `REDIS_URL`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if configuration cannot be loaded or is invalid.
    pub fn load() -> Result<Self, ConfigError> {
        let env_var = std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string());
        let cache = CacheSettings::default();

        let mut config_builder = Config::builder()
            .set_default("host", "127.0.0.1")?
            .set_default("port", 3000)?
            .set_default("timeout_seconds", DEFAULT_REQUEST_TIMEOUT_SECONDS)?
            .set_default("environment", "development")?
            .set_default("rate_limiting.enabled", true)?
            .set_default(
                "rate_limiting.requests_per_minute",
                u64::from(DEFAULT_REQUESTS_PER_MINUTE),
            )?
            .set_default("providers.whoisfreaks.enabled", true)?
            .set_default("providers.whoisfreaks.base_url", WHOISFREAKS_DEFAULT_BASE_URL)?
            .set_default(
                "providers.whoisfreaks.timeout_seconds",
                WHOISFREAKS_DEFAULT_TIMEOUT_SECONDS,
            )?
            .set_default("providers.whoisxml.enabled", true)?
            .set_default("providers.whoisxml.base_url", WHOISXML_DEFAULT_BASE_URL)?
            .set_default(
                "providers.whoisxml.timeout_seconds",
                WHOISXML_DEFAULT_TIMEOUT_SECONDS,
            )?
            .set_default("resolver.max_retries", u64::from(DEFAULT_MAX_RETRIES))?
            .set_default("resolver.cooldown_seconds", DEFAULT_COOLDOWN.as_secs())?
            .set_default("cache.backend", "memory")?
            .set_default("cache.key_prefix", cache.key_prefix)?
            .set_default("cache.registered_ttl_hours", cache.registered_ttl_hours)?
            .set_default("cache.unregistered_ttl_hours", cache.unregistered_ttl_hours)?
            .set_default("cache.error_ttl_hours", cache.error_ttl_hours)?
            .set_default("cache.jitter_hours", cache.jitter_hours)?
            .set_default("cache.max_entries", cache.max_entries)?
            .set_default("cache.freshness_floor_hours", cache.freshness_floor_hours)?
            .set_default("cache.scan_page_size", cache.scan_page_size as u64)?
            .set_default("cache.max_scan_pages", cache.max_scan_pages as u64)?
            .add_source(File::with_name("config.json").required(false))
            .add_source(
                File::with_name(&format!("config.{}.json", env_var.to_lowercase())).required(false),
            )
            .add_source(
                ConfigEnv::with_prefix("SERVER")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .set_override_option(
                "providers.whoisfreaks.api_key",
                std::env::var("WHOISFREAKS_API_KEY").ok(),
            )?
            .set_override_option(
                "providers.whoisxml.api_key",
                std::env::var("WHOISXML_API_KEY").ok(),
            )?
            .set_override_option("cache.redis_url", std::env::var("REDIS_URL").ok())?;

        if std::env::var("ENVIRONMENT").is_ok() {
            config_builder = config_builder.set_override("environment", env_var.to_lowercase())?;
        }

        let config = config_builder.build()?;
        let mut server_config: Self = config.try_deserialize()?;

        server_config.port = ServerPort::new(server_config.port.value(), server_config.environment)
            .map_err(|e| ConfigError::Message(format!("invalid port configuration: {e}")))?;

        Ok(server_config)
    }

    /// Check cross-field constraints the types cannot express
    ///
    /// # Errors
    ///
    /// Returns an error describing the first violated constraint
    pub fn validate(&self) -> Result<()> {
        ensure!(
            !self.rate_limiting.enabled || self.rate_limiting.requests_per_minute > 0,
            "rate_limiting.requests_per_minute must be greater than 0"
        );
        self.resolver_config().validate()?;
        self.cache.backend_config()?;
        if self.environment == Environment::Production {
            ensure!(
                self.providers.any_usable(),
                "at least one provider must be enabled with an API key in production"
            );
        }
        Ok(())
    }

    /// Resolver configuration derived from the health and cache settings
    pub fn resolver_config(&self) -> ResolverConfig {
        ResolverConfig {
            max_retries: self.resolver.max_retries,
            cooldown: Duration::from_secs(self.resolver.cooldown_seconds),
            cache: self.cache.policy(),
        }
    }

    /// Create configuration optimized for testing
    ///
    /// Providers start disabled; tests point them at a mock server and enable them.
    ///
    /// # Errors
    ///
    /// Returns an error if the built-in provider URLs fail to parse
    pub fn for_testing() -> Result<Self> {
        Ok(Self {
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: ServerPort::testing(), // let OS choose available port
            timeout_seconds: TimeoutSeconds::testing(),
            environment: Environment::Testing,
            rate_limiting: RateLimitingConfig {
                enabled: false,
                requests_per_minute: DEFAULT_REQUESTS_PER_MINUTE,
            },
            providers: ProvidersConfig {
                whoisfreaks: ProviderConfig::disabled(WHOISFREAKS_DEFAULT_BASE_URL, 2)?,
                whoisxml: ProviderConfig::disabled(WHOISXML_DEFAULT_BASE_URL, 2)?,
            },
            resolver: ResolverSettings {
                max_retries: DEFAULT_MAX_RETRIES,
                cooldown_seconds: DEFAULT_COOLDOWN.as_secs(),
            },
            cache: CacheSettings::default(),
        })
    }

    /// Get socket address for binding
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port.value())
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Production => write!(f, "production"),
            Environment::Development => write!(f, "development"),
            Environment::Testing => write!(f, "testing"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_validation() {
        assert!(TimeoutSeconds::new(0).is_err());
        assert!(TimeoutSeconds::new(400).is_err());

        assert!(TimeoutSeconds::new(30).is_ok());
        assert!(TimeoutSeconds::new(1).is_ok());
        assert!(TimeoutSeconds::new(300).is_ok());
        assert_eq!(
            TimeoutSeconds::default().value(),
            Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECONDS)
        );
    }

    #[test]
    fn server_port_validation() {
        // Port 0 should only be valid in testing environment
        assert!(ServerPort::new(0, Environment::Testing).is_ok());
        assert!(ServerPort::new(0, Environment::Development).is_err());
        assert!(ServerPort::new(0, Environment::Production).is_err());

        assert!(ServerPort::new(3000, Environment::Development).is_ok());
        assert!(ServerPort::new(443, Environment::Production).is_ok());
    }

    #[test]
    fn environment_display() {
        assert_eq!(Environment::Production.to_string(), "production");
        assert_eq!(Environment::Development.to_string(), "development");
        assert_eq!(Environment::Testing.to_string(), "testing");
    }

    #[test]
    fn testing_config_is_valid() -> Result<()> {
        let config = ServerConfig::for_testing()?;
        config.validate()?;
        assert!(!config.providers.any_usable());
        assert_eq!(config.resolver_config(), ResolverConfig::default());
        Ok(())
    }

    #[test]
    fn default_cache_settings_match_policy_defaults() {
        assert_eq!(CacheSettings::default().policy(), CachePolicy::default());
    }

    #[test]
    fn provider_key_requires_enabled_and_non_blank() -> Result<()> {
        let mut provider = ProviderConfig::disabled(WHOISFREAKS_DEFAULT_BASE_URL, 30)?;
        provider.api_key = Some("secret".to_string());
        assert!(provider.usable_key().is_none());

        provider.enabled = true;
        assert_eq!(
            provider.usable_key().map(|key| key.as_str().to_string()),
            Some("secret".to_string())
        );

        provider.api_key = Some("   ".to_string());
        assert!(provider.usable_key().is_none());
        Ok(())
    }

    #[test]
    fn redis_backend_requires_url() -> Result<()> {
        let mut config = ServerConfig::for_testing()?;
        config.cache.backend = CacheBackendKind::Redis;
        assert!(config.validate().is_err());

        config.cache.redis_url = Some("redis://127.0.0.1:6379/0".to_string());
        config.validate()?;
        assert_eq!(
            config.cache.backend_config()?,
            BackendConfig::Redis {
                url: "redis://127.0.0.1:6379/0".to_string()
            }
        );
        Ok(())
    }

    #[test]
    fn production_requires_a_provider() -> Result<()> {
        let mut config = ServerConfig::for_testing()?;
        config.environment = Environment::Production;
        assert!(config.validate().is_err());

        config.providers.whoisxml.enabled = true;
        config.providers.whoisxml.api_key = Some("key".to_string());
        config.validate()?;
        Ok(())
    }

    #[test]
    fn jitter_must_stay_below_ttls() -> Result<()> {
        let mut config = ServerConfig::for_testing()?;
        config.cache.jitter_hours = config.cache.error_ttl_hours;
        assert!(config.validate().is_err());
        Ok(())
    }

    #[test]
    fn load_applies_defaults() -> Result<()> {
        let config = ServerConfig::load()?;
        assert_eq!(config.cache.backend, CacheBackendKind::Memory);
        assert_eq!(config.resolver.max_retries, DEFAULT_MAX_RETRIES);
        assert_eq!(
            config.providers.whoisxml.timeout_seconds.value(),
            Duration::from_secs(WHOISXML_DEFAULT_TIMEOUT_SECONDS)
        );
        assert_eq!(config.cache.policy(), CachePolicy::default());
        Ok(())
    }
}
