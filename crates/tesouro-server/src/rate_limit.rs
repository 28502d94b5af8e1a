//! Per-client request rate limiting.
//!
//! One token bucket per client IP. A bucket holds up to `burst` tokens and
//! refills continuously; each request takes one token.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{ConnectInfo, Request, State};
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::Response;
use dashmap::DashMap;
use tokio::time::Instant;
use tracing::warn;

use crate::error::ApiError;

const X_REAL_IP: &str = "x-real-ip";
const X_FORWARDED_FOR: &str = "x-forwarded-for";

struct Bucket {
    tokens: f64,
    last_refill: Instant,
}

impl Bucket {
    fn refill(&mut self, now: Instant, capacity: f64, refill_rate: f64) {
        let elapsed = now.saturating_duration_since(self.last_refill);
        self.tokens = (self.tokens + elapsed.as_secs_f64() * refill_rate).min(capacity);
        self.last_refill = now;
    }
}

/// Token-bucket rate limiter keyed by client.
pub struct RateLimiter {
    /// Maximum tokens (burst size).
    capacity: f64,
    /// Tokens added per second.
    refill_rate: f64,
    /// Client key -> bucket.
    buckets: DashMap<String, Bucket>,
}

impl RateLimiter {
    /// Creates a new rate limiter.
    ///
    /// # Arguments
    ///
    /// * `requests_per_second` - Sustained rate per client
    /// * `burst_size` - Requests a fresh client may make at once
    pub fn new(requests_per_second: f64, burst_size: u32) -> Self {
        Self {
            capacity: f64::from(burst_size.max(1)),
            refill_rate: requests_per_second,
            buckets: DashMap::new(),
        }
    }

    /// `limit` requests per client per minute, all available as a burst.
    pub fn per_minute(limit: u32) -> Self {
        Self::new(f64::from(limit) / 60.0, limit)
    }

    /// Take a token for `key`.
    ///
    /// On refusal returns how long until the next token is available.
    pub fn try_acquire(&self, key: &str) -> Result<(), Duration> {
        let now = Instant::now();
        let mut bucket = self.buckets.entry(key.to_string()).or_insert_with(|| Bucket {
            tokens: self.capacity,
            last_refill: now,
        });
        bucket.refill(now, self.capacity, self.refill_rate);

        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            Ok(())
        } else if self.refill_rate > 0.0 {
            Err(Duration::from_secs_f64((1.0 - bucket.tokens) / self.refill_rate))
        } else {
            Err(Duration::MAX)
        }
    }

    /// Drop buckets that have refilled completely. Returns how many were removed.
    pub fn prune(&self) -> usize {
        let now = Instant::now();
        let before = self.buckets.len();
        self.buckets.retain(|_, bucket| {
            bucket.refill(now, self.capacity, self.refill_rate);
            bucket.tokens < self.capacity
        });
        before.saturating_sub(self.buckets.len())
    }

    /// Number of clients with a live bucket.
    pub fn tracked_clients(&self) -> usize {
        self.buckets.len()
    }
}

/// Identify the client: `X-Real-IP`, else the first `X-Forwarded-For` hop,
/// else the peer address.
pub fn client_key(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    };

    if let Some(real_ip) = header(X_REAL_IP) {
        return real_ip.to_string();
    }
    if let Some(first) = header(X_FORWARDED_FOR)
        .and_then(|chain| chain.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
    {
        return first.to_string();
    }
    peer.map(|addr| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Middleware rejecting requests over the client's budget with 429.
pub async fn limit_by_ip(
    State(limiter): State<Arc<RateLimiter>>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|info| info.0);
    let key = client_key(request.headers(), peer);

    if let Err(wait) = limiter.try_acquire(&key) {
        warn!(client = %key, path = %request.uri().path(), "Rate limit exceeded");
        return Err(ApiError::RateLimited(wait));
    }

    Ok(next.run(request).await)
}
