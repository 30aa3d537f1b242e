//! Fixed-window rate limiting per client address.
//!
//! Windows are non-overlapping intervals of `window_secs` counted from the
//! moment the limiter is created. A client's counter resets when the first
//! request of a new window arrives; the sweeper drops counters left behind
//! by past windows so memory stays bounded by the active client set.

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{HeaderMap, HeaderName, HeaderValue, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use dashmap::DashMap;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::config::RateLimitConfig;
use crate::error::ProxyError;
use crate::observability::metrics;

pub static X_RATELIMIT_LIMIT: HeaderName = HeaderName::from_static("x-ratelimit-limit");
pub static X_RATELIMIT_REMAINING: HeaderName = HeaderName::from_static("x-ratelimit-remaining");
const X_FORWARDED_FOR: &str = "x-forwarded-for";

/// Hits recorded for one client in one window.
#[derive(Debug, Clone, Copy)]
struct WindowCounter {
    window: u64,
    hits: u32,
}

/// Outcome of counting one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitDecision {
    pub allowed: bool,
    pub limit: u32,
    pub remaining: u32,
    /// Time until the current window closes.
    pub reset_after: Duration,
}

/// Process-wide fixed-window limiter.
pub struct RateLimiter {
    counters: DashMap<String, WindowCounter>,
    window: Duration,
    max_requests: u32,
    trusted_proxy_hops: usize,
    epoch: Instant,
}

impl RateLimiter {
    pub fn new(config: &RateLimitConfig) -> Self {
        Self::with_epoch(config, Instant::now())
    }

    /// Create a limiter whose first window starts at `epoch`.
    pub fn with_epoch(config: &RateLimitConfig, epoch: Instant) -> Self {
        Self {
            counters: DashMap::new(),
            window: Duration::from_secs(config.window_secs.max(1)),
            max_requests: config.max_requests,
            trusted_proxy_hops: config.trusted_proxy_hops,
            epoch,
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Number of clients with a live counter.
    pub fn tracked_clients(&self) -> usize {
        self.counters.len()
    }

    fn window_index(&self, now: Instant) -> u64 {
        let elapsed = now.saturating_duration_since(self.epoch);
        (elapsed.as_nanos() / self.window.as_nanos()) as u64
    }

    /// Time from `now` until `window` closes. Falls back to a full window
    /// when the boundary is not representable as an `Instant`.
    fn reset_after(&self, now: Instant, window: u64) -> Duration {
        u32::try_from(window.saturating_add(1))
            .ok()
            .and_then(|count| self.window.checked_mul(count))
            .and_then(|span| self.epoch.checked_add(span))
            .map_or(self.window, |window_end| window_end.saturating_duration_since(now))
    }

    /// Count a request from `key` at the current time.
    pub fn check(&self, key: &str) -> RateLimitDecision {
        self.check_at(key, Instant::now())
    }

    /// Count a request from `key` at `now`.
    pub fn check_at(&self, key: &str, now: Instant) -> RateLimitDecision {
        let window = self.window_index(now);

        let hits = {
            let mut counter = self
                .counters
                .entry(key.to_string())
                .or_insert(WindowCounter { window, hits: 0 });
            if counter.window != window {
                *counter = WindowCounter { window, hits: 0 };
            }
            counter.hits = counter.hits.saturating_add(1);
            counter.hits
        };

        RateLimitDecision {
            allowed: hits <= self.max_requests,
            limit: self.max_requests,
            remaining: self.max_requests.saturating_sub(hits),
            reset_after: self.reset_after(now, window),
        }
    }

    /// Drop counters that belong to windows before the one containing `now`.
    pub fn sweep(&self, now: Instant) -> usize {
        let current = self.window_index(now);
        let before = self.counters.len();
        self.counters.retain(|_, counter| counter.window >= current);
        before - self.counters.len()
    }

    /// Sweep once per window until shutdown is signalled.
    pub fn spawn_sweeper(self: Arc<Self>, mut shutdown: broadcast::Receiver<()>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(self.window);
            interval.tick().await;
            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        let removed = self.sweep(Instant::now());
                        if removed > 0 {
                            tracing::debug!(removed, remaining = self.tracked_clients(), "Swept expired rate limit counters");
                        }
                    }
                    _ = shutdown.recv() => {
                        tracing::debug!("Rate limit sweeper stopping");
                        break;
                    }
                }
            }
        })
    }

    /// Identify the client behind `peer`, honoring trusted X-Forwarded-For hops.
    pub fn client_key(&self, headers: &HeaderMap, peer: SocketAddr) -> String {
        client_address(headers, peer.ip(), self.trusted_proxy_hops)
    }
}

/// Walk from the socket peer back through X-Forwarded-For (right to left),
/// trusting `trusted_hops` addresses, and return the first untrusted one.
/// When every address is trusted the left-most one is the client.
pub fn client_address(headers: &HeaderMap, peer: IpAddr, trusted_hops: usize) -> String {
    let mut chain = vec![peer.to_string()];
    if trusted_hops > 0 {
        for value in headers.get_all(X_FORWARDED_FOR) {
            let Ok(value) = value.to_str() else { continue };
            chain.extend(
                value
                    .split(',')
                    .map(str::trim)
                    .filter(|hop| !hop.is_empty())
                    .map(str::to_string),
            );
        }
        // Peer first, then forwarded hops nearest-first.
        chain[1..].reverse();
    }

    let index = trusted_hops.min(chain.len() - 1);
    chain.swap_remove(index)
}

/// Middleware that rejects clients over their window budget.
pub async fn rate_limit_middleware(
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    State(limiter): State<Arc<RateLimiter>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let key = limiter.client_key(request.headers(), addr);
    let decision = limiter.check(&key);

    if !decision.allowed {
        tracing::warn!(client = %key, limit = decision.limit, "Rate limit exceeded");
        metrics::record_rate_limited();
        let mut response = ProxyError::RateLimited {
            retry_after: decision.reset_after,
        }
        .into_response();
        set_limit_headers(response.headers_mut(), &decision);
        return response;
    }

    let mut response = next.run(request).await;
    set_limit_headers(response.headers_mut(), &decision);
    response
}

fn set_limit_headers(headers: &mut HeaderMap, decision: &RateLimitDecision) {
    headers.insert(X_RATELIMIT_LIMIT.clone(), HeaderValue::from(decision.limit));
    headers.insert(X_RATELIMIT_REMAINING.clone(), HeaderValue::from(decision.remaining));
}
