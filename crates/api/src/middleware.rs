// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Middleware module for HTTP request processing
//!
//! This module provides per-IP rate limiting and request path validation for
//! the WHOIS API server. Security response headers are applied as tower-http
//! layers in [`crate::server`].

use std::{net::IpAddr, sync::Arc, time::Duration};

use axum::{
    Json,
    extract::{ConnectInfo, State},
    http::{HeaderName, HeaderValue, Request, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use dashmap::DashMap;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::{config::RateLimitingConfig, error::ErrorBody};

const RATE_LIMIT_WINDOW: Duration = Duration::from_secs(60);
const MAX_RATE_LIMIT_ENTRIES: usize = 10_000;

/// Longest request path accepted
pub const MAX_PATH_LENGTH: usize = 255;

/// Requests allowed in the current window
pub const RATE_LIMIT_LIMIT_HEADER: HeaderName = HeaderName::from_static("x-ratelimit-limit");
/// Requests left in the current window
pub const RATE_LIMIT_REMAINING_HEADER: HeaderName =
    HeaderName::from_static("x-ratelimit-remaining");

/// Outcome of a rate limit check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
    /// Request admitted
    Allowed {
        /// Requests left in the window
        remaining: u32,
    },
    /// Request rejected until the window resets
    Limited {
        /// Time until the window resets
        retry_after: Duration,
    },
}

/// Fixed-window request limiter keyed by client IP
#[derive(Debug, Clone)]
pub struct RateLimiter {
    config: RateLimitingConfig,
    windows: Arc<DashMap<IpAddr, Window>>,
}

#[derive(Debug, Clone, Copy)]
struct Window {
    count: u32,
    started: Instant,
}

impl RateLimiter {
    /// Create a new rate limiter with the given configuration
    pub fn new(config: RateLimitingConfig) -> Self {
        Self {
            config,
            windows: Arc::new(DashMap::new()),
        }
    }

    /// Check if rate limiting is enabled
    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    /// Requests allowed per window
    pub fn limit(&self) -> u32 {
        self.config.requests_per_minute
    }

    /// Count a request from `ip` and decide whether to admit it
    pub fn check(&self, ip: IpAddr) -> RateDecision {
        if !self.config.enabled {
            return RateDecision::Allowed {
                remaining: self.config.requests_per_minute,
            };
        }

        let now = Instant::now();
        if self.windows.len() > MAX_RATE_LIMIT_ENTRIES {
            self.cleanup_expired_windows(now);
        }

        let window = *self
            .windows
            .entry(ip)
            .and_modify(|window| {
                if now.duration_since(window.started) >= RATE_LIMIT_WINDOW {
                    *window = Window {
                        count: 1,
                        started: now,
                    };
                } else {
                    window.count = window.count.saturating_add(1);
                }
            })
            .or_insert(Window {
                count: 1,
                started: now,
            });

        if window.count > self.config.requests_per_minute {
            let retry_after =
                RATE_LIMIT_WINDOW.saturating_sub(now.duration_since(window.started));
            debug!(%ip, count = window.count, "rate limiting client");
            RateDecision::Limited { retry_after }
        } else {
            RateDecision::Allowed {
                remaining: self.config.requests_per_minute - window.count,
            }
        }
    }

    /// Whether a request from `ip` would be rejected; counts the request
    pub fn is_rate_limited(&self, ip: IpAddr) -> bool {
        matches!(self.check(ip), RateDecision::Limited { .. })
    }

    fn cleanup_expired_windows(&self, now: Instant) {
        let before = self.windows.len();
        self.windows
            .retain(|_, window| now.duration_since(window.started) < RATE_LIMIT_WINDOW);
        let after = self.windows.len();

        if before > after {
            debug!(removed = before - after, "cleaned up expired rate limiter windows");
        }

        if after > MAX_RATE_LIMIT_ENTRIES {
            warn!(
                entries = after,
                "rate limiter still over capacity after cleanup, removing oldest windows"
            );
            let mut oldest: Vec<_> = self
                .windows
                .iter()
                .map(|entry| (*entry.key(), entry.value().started))
                .collect();
            oldest.sort_by_key(|(_, started)| *started);

            let excess = after - MAX_RATE_LIMIT_ENTRIES / 2;
            for (ip, _) in oldest.into_iter().take(excess) {
                self.windows.remove(&ip);
            }
        }
    }
}

/// Rate limiting middleware function
pub async fn rate_limiting_middleware(
    ConnectInfo(addr): ConnectInfo<std::net::SocketAddr>,
    State(rate_limiter): State<RateLimiter>,
    req: Request<axum::body::Body>,
    next: Next,
) -> Response {
    let client_ip = addr.ip();

    match rate_limiter.check(client_ip) {
        RateDecision::Limited { retry_after } => {
            warn!(%client_ip, "rate limit exceeded");
            let seconds = retry_after.as_secs().max(1);
            let mut response = (
                StatusCode::TOO_MANY_REQUESTS,
                Json(ErrorBody::new(
                    StatusCode::TOO_MANY_REQUESTS,
                    "too many requests, slow down",
                )),
            )
                .into_response();
            let headers = response.headers_mut();
            headers.insert(header::RETRY_AFTER, HeaderValue::from(seconds));
            headers.insert(RATE_LIMIT_LIMIT_HEADER, HeaderValue::from(rate_limiter.limit()));
            headers.insert(RATE_LIMIT_REMAINING_HEADER, HeaderValue::from(0_u32));
            response
        }
        RateDecision::Allowed { remaining } => {
            let mut response = next.run(req).await;
            let headers = response.headers_mut();
            headers.insert(RATE_LIMIT_LIMIT_HEADER, HeaderValue::from(rate_limiter.limit()));
            headers.insert(RATE_LIMIT_REMAINING_HEADER, HeaderValue::from(remaining));
            response
        }
    }
}

/// Reason a request path was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathRejection {
    /// Longer than [`MAX_PATH_LENGTH`]
    TooLong,
    /// Contains a `..` sequence
    Traversal,
}

impl PathRejection {
    fn status(self) -> StatusCode {
        match self {
            Self::TooLong => StatusCode::URI_TOO_LONG,
            Self::Traversal => StatusCode::BAD_REQUEST,
        }
    }

    fn message(self) -> &'static str {
        match self {
            Self::TooLong => "request path too long",
            Self::Traversal => "request path contains an invalid sequence",
        }
    }
}

/// Check a raw request path
pub fn check_path(path: &str) -> Result<(), PathRejection> {
    if path.len() > MAX_PATH_LENGTH {
        return Err(PathRejection::TooLong);
    }
    if path.contains("..") {
        return Err(PathRejection::Traversal);
    }
    Ok(())
}

/// Reject over-long paths and traversal sequences before routing
pub async fn request_validation_middleware(
    req: Request<axum::body::Body>,
    next: Next,
) -> Response {
    if let Err(rejection) = check_path(req.uri().path()) {
        warn!(
            path_length = req.uri().path().len(),
            reason = rejection.message(),
            "rejecting request"
        );
        let status = rejection.status();
        return (
            status,
            Json(ErrorBody::new(status, rejection.message())),
        )
            .into_response();
    }

    next.run(req).await
}

#[cfg(test)]
mod tests {
    use axum::{Router, body::Body, middleware, routing::get};
    use tower::ServiceExt;

    use super::*;

    fn limiter(enabled: bool, requests_per_minute: u32) -> RateLimiter {
        RateLimiter::new(RateLimitingConfig {
            enabled,
            requests_per_minute,
        })
    }

    #[test]
    fn rate_limiter_creation() {
        let limiter = limiter(true, 10);
        assert!(limiter.is_enabled());
        assert_eq!(limiter.limit(), 10);
    }

    #[tokio::test]
    async fn rate_limiter_disabled() {
        let limiter = limiter(false, 1);
        let ip = "127.0.0.1".parse().unwrap();
        for _ in 0..10 {
            assert!(!limiter.is_rate_limited(ip));
        }
    }

    #[tokio::test]
    async fn rate_limiter_counts_down_then_limits() {
        let limiter = limiter(true, 3);
        let ip = "127.0.0.1".parse().unwrap();

        assert_eq!(limiter.check(ip), RateDecision::Allowed { remaining: 2 });
        assert_eq!(limiter.check(ip), RateDecision::Allowed { remaining: 1 });
        assert_eq!(limiter.check(ip), RateDecision::Allowed { remaining: 0 });
        assert!(limiter.is_rate_limited(ip));
        assert!(limiter.is_rate_limited(ip));
    }

    #[tokio::test]
    async fn rate_limiter_different_ips() {
        let limiter = limiter(true, 2);
        let ip1 = "127.0.0.1".parse().unwrap();
        let ip2 = "192.168.1.1".parse().unwrap();

        assert!(!limiter.is_rate_limited(ip1));
        assert!(!limiter.is_rate_limited(ip2));
        assert!(!limiter.is_rate_limited(ip1));
        assert!(!limiter.is_rate_limited(ip2));

        assert!(limiter.is_rate_limited(ip1));
        assert!(limiter.is_rate_limited(ip2));
    }

    #[tokio::test(start_paused = true)]
    async fn window_resets_after_a_minute() {
        let limiter = limiter(true, 1);
        let ip = "10.0.0.1".parse().unwrap();

        assert!(!limiter.is_rate_limited(ip));
        tokio::time::advance(Duration::from_secs(20)).await;
        assert_eq!(
            limiter.check(ip),
            RateDecision::Limited {
                retry_after: Duration::from_secs(40)
            }
        );

        tokio::time::advance(Duration::from_secs(40)).await;
        assert!(!limiter.is_rate_limited(ip));
    }

    #[test]
    fn path_checks() {
        assert_eq!(check_path("/v1/whois/example.com"), Ok(()));
        assert_eq!(
            check_path("/v1/whois/../../etc/passwd"),
            Err(PathRejection::Traversal)
        );
        assert_eq!(
            check_path("/v1/whois/a..com"),
            Err(PathRejection::Traversal)
        );

        let long = format!("/v1/whois/{}", "a".repeat(MAX_PATH_LENGTH));
        assert_eq!(check_path(&long), Err(PathRejection::TooLong));
    }

    #[tokio::test]
    async fn validation_middleware_short_circuits() {
        let app = Router::new()
            .route("/{*rest}", get(|| async { "ok" }))
            .layer(middleware::from_fn(request_validation_middleware));

        let ok = app
            .clone()
            .oneshot(Request::get("/v1/whois/example.com").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(ok.status(), StatusCode::OK);

        let traversal = app
            .clone()
            .oneshot(Request::get("/v1/whois/..%2f..").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(traversal.status(), StatusCode::BAD_REQUEST);

        let long = format!("/v1/whois/{}", "a".repeat(MAX_PATH_LENGTH));
        let too_long = app
            .oneshot(Request::get(long.as_str()).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(too_long.status(), StatusCode::URI_TOO_LONG);
    }

    #[tokio::test]
    async fn limited_response_carries_retry_after() {
        let limiter = limiter(true, 1);
        let app = Router::new()
            .route("/", get(|| async { "ok" }))
            .layer(middleware::from_fn_with_state(
                limiter,
                rate_limiting_middleware,
            ));

        let request = || {
            let mut req = Request::get("/").body(Body::empty()).unwrap();
            req.extensions_mut().insert(ConnectInfo(std::net::SocketAddr::from((
                [127, 0, 0, 1],
                4000,
            ))));
            req
        };

        let first = app.clone().oneshot(request()).await.unwrap();
        assert_eq!(first.status(), StatusCode::OK);
        assert_eq!(first.headers()[RATE_LIMIT_REMAINING_HEADER], "0");

        let second = app.oneshot(request()).await.unwrap();
        assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
        assert!(second.headers().contains_key(header::RETRY_AFTER));
        assert_eq!(second.headers()[RATE_LIMIT_LIMIT_HEADER], "1");
    }
}
