//! Rate limiting middleware.
//!
//! Limits public routes per client IP address using a keyed GCRA limiter.
//! The socket peer is the client unless forwarded headers are trusted.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::num::NonZeroU32;
use std::sync::atomic::{AtomicU64, Ordering};

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{header, HeaderMap, HeaderValue, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use governor::{clock::Clock, clock::DefaultClock, DefaultKeyedRateLimiter, Quota, RateLimiter};
use serde_json::json;

use crate::app::AppState;

/// Client address resolved for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientIp(pub IpAddr);

impl ClientIp {
    /// The socket peer. With `trust_forwarded` set (only behind a proxy that
    /// overwrites them), `X-Forwarded-For` (first hop) and `X-Real-IP` win.
    pub fn resolve(headers: &HeaderMap, peer: Option<SocketAddr>, trust_forwarded: bool) -> Self {
        let peer_ip = peer.map(|addr| addr.ip());
        if !trust_forwarded {
            return ClientIp(peer_ip.unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED)));
        }

        let forwarded = headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.split(',').next())
            .and_then(|s| s.trim().parse::<IpAddr>().ok());

        let real_ip = || {
            headers
                .get("x-real-ip")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.trim().parse::<IpAddr>().ok())
        };

        let ip = forwarded
            .or_else(real_ip)
            .or(peer_ip)
            .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED));
        ClientIp(ip)
    }
}

/// Checks between sweeps of idle client keys.
const PRUNE_EVERY: u64 = 1024;

/// Limiter state shared across all requests.
pub struct RateLimiterState {
    limiter: DefaultKeyedRateLimiter<IpAddr>,
    rate_limit_per_minute: u32,
    trust_forwarded: bool,
    checks: AtomicU64,
}

impl RateLimiterState {
    pub fn new(rate_limit_per_minute: u32, trust_forwarded: bool) -> Self {
        let per_minute = NonZeroU32::new(rate_limit_per_minute).unwrap_or(NonZeroU32::MIN);
        Self {
            limiter: RateLimiter::keyed(Quota::per_minute(per_minute)),
            rate_limit_per_minute,
            trust_forwarded,
            checks: AtomicU64::new(0),
        }
    }

    pub fn rate_limit_per_minute(&self) -> u32 {
        self.rate_limit_per_minute
    }

    pub fn client_ip(&self, headers: &HeaderMap, peer: Option<SocketAddr>) -> ClientIp {
        ClientIp::resolve(headers, peer, self.trust_forwarded)
    }

    /// Ok when the request may proceed, otherwise the retry delay in seconds.
    pub fn check(&self, ip: IpAddr) -> Result<(), u64> {
        if self.checks.fetch_add(1, Ordering::Relaxed) % PRUNE_EVERY == PRUNE_EVERY - 1 {
            self.prune();
        }

        self.limiter.check_key(&ip).map_err(|not_until| {
            let wait = not_until.wait_time_from(DefaultClock::default().now());
            wait.as_secs().max(1)
        })
    }

    /// Drops clients whose limit has fully replenished.
    pub fn prune(&self) {
        self.limiter.retain_recent();
        self.limiter.shrink_to_fit();
        tracing::debug!(tracked_clients = self.limiter.len(), "Pruned rate limiter");
    }

    /// Number of client keys currently tracked.
    pub fn tracked_clients(&self) -> usize {
        self.limiter.len()
    }
}

impl std::fmt::Debug for RateLimiterState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiterState")
            .field("rate_limit_per_minute", &self.rate_limit_per_minute)
            .field("trust_forwarded", &self.trust_forwarded)
            .finish_non_exhaustive()
    }
}

/// Middleware that applies the per-IP limit. A no-op when limiting is disabled.
pub async fn rate_limit_middleware(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let Some(rate_limiter) = state.rate_limiter.as_ref() else {
        return next.run(req).await;
    };

    let peer = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let client = rate_limiter.client_ip(req.headers(), peer);

    if let Err(retry_after) = rate_limiter.check(client.0) {
        tracing::debug!(client_ip = %client.0, retry_after, "Rate limit exceeded");
        return rate_limited_response(rate_limiter.rate_limit_per_minute(), retry_after);
    }

    next.run(req).await
}

fn rate_limited_response(limit: u32, retry_after: u64) -> Response {
    let body = json!({
        "error": "rate_limited",
        "message": format!("Rate limit of {} requests/minute exceeded", limit),
        "retryAfter": retry_after
    });

    let mut response = (StatusCode::TOO_MANY_REQUESTS, Json(body)).into_response();
    response
        .headers_mut()
        .insert(header::RETRY_AFTER, HeaderValue::from(retry_after));
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ip(s: &str) -> IpAddr {
        s.parse().unwrap()
    }

    #[test]
    fn test_rate_limiter_allows_then_blocks() {
        let state = RateLimiterState::new(1, false);
        let client = ip("10.0.0.1");

        assert!(state.check(client).is_ok());
        let retry = state.check(client).unwrap_err();
        assert!(retry >= 1);
    }

    #[test]
    fn test_rate_limiter_clients_independent() {
        let state = RateLimiterState::new(1, false);

        assert!(state.check(ip("10.0.0.1")).is_ok());
        assert!(state.check(ip("10.0.0.2")).is_ok());
        assert!(state.check(ip("10.0.0.1")).is_err());
    }

    fn forwarded_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", "203.0.113.7, 10.0.0.1".parse().unwrap());
        headers.insert("x-real-ip", "198.51.100.1".parse().unwrap());
        headers
    }

    #[test]
    fn test_client_ip_ignores_forwarded_headers_by_default() {
        let peer: SocketAddr = "127.0.0.1:5000".parse().unwrap();

        assert_eq!(
            ClientIp::resolve(&forwarded_headers(), Some(peer), false),
            ClientIp(ip("127.0.0.1"))
        );
        assert_eq!(
            ClientIp::resolve(&forwarded_headers(), None, false),
            ClientIp(IpAddr::V4(Ipv4Addr::UNSPECIFIED))
        );
    }

    #[test]
    fn test_client_ip_trusted_proxy_uses_forwarded_for() {
        let peer: SocketAddr = "127.0.0.1:5000".parse().unwrap();

        assert_eq!(
            ClientIp::resolve(&forwarded_headers(), Some(peer), true),
            ClientIp(ip("203.0.113.7"))
        );

        let mut real_ip_only = HeaderMap::new();
        real_ip_only.insert("x-real-ip", "198.51.100.1".parse().unwrap());
        assert_eq!(
            ClientIp::resolve(&real_ip_only, Some(peer), true),
            ClientIp(ip("198.51.100.1"))
        );
    }

    #[test]
    fn test_rotating_forwarded_for_shares_peer_limit() {
        let state = RateLimiterState::new(1, false);
        let peer: SocketAddr = "192.0.2.9:4000".parse().unwrap();

        let mut statuses = Vec::new();
        for n in 0..5 {
            let mut headers = HeaderMap::new();
            headers.insert("x-forwarded-for", format!("10.0.0.{}", n).parse().unwrap());
            let client = state.client_ip(&headers, Some(peer));
            statuses.push(state.check(client.0).is_ok());
        }

        assert_eq!(statuses, [true, false, false, false, false]);
        assert_eq!(state.tracked_clients(), 1);
    }

    #[test]
    fn test_prune_drops_replenished_clients() {
        // 6000/minute replenishes one cell every 10ms.
        let state = RateLimiterState::new(6000, false);
        for n in 0..20 {
            assert!(state.check(ip(&format!("10.0.1.{}", n))).is_ok());
        }
        assert_eq!(state.tracked_clients(), 20);

        std::thread::sleep(std::time::Duration::from_millis(50));
        state.prune();

        assert_eq!(state.tracked_clients(), 0);
    }

    #[test]
    fn test_client_ip_falls_back_to_peer() {
        let headers = HeaderMap::new();
        let peer: SocketAddr = "192.0.2.4:5000".parse().unwrap();

        assert_eq!(
            ClientIp::resolve(&headers, Some(peer), true),
            ClientIp(ip("192.0.2.4"))
        );
    }

    #[test]
    fn test_rate_limited_response() {
        let response = rate_limited_response(10, 5);
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()[header::RETRY_AFTER], "5");
    }
}
