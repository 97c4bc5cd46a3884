//! Rate limiting middleware.
//!
//! In-memory fixed-window counter per client IP address.

use crate::error::ApiError;
use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{HeaderName, HeaderValue, Request},
    middleware::Next,
    response::Response,
};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::warn;

const LIMIT_HEADER: HeaderName = HeaderName::from_static("x-ratelimit-limit");
const REMAINING_HEADER: HeaderName = HeaderName::from_static("x-ratelimit-remaining");

/// Configuration for rate limiting.
#[derive(Clone, Debug)]
pub struct RateLimitConfig {
    /// Maximum requests per window.
    pub max_requests: u32,
    /// Window duration.
    pub window: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 100,
            window: Duration::from_secs(15 * 60),
        }
    }
}

/// Rate limiter state tracking requests per IP.
#[derive(Clone)]
pub struct RateLimitLayer {
    config: RateLimitConfig,
    state: Arc<Mutex<HashMap<IpAddr, RateLimitEntry>>>,
}

struct RateLimitEntry {
    count: u32,
    window_start: Instant,
}

#[derive(Debug, PartialEq, Eq)]
pub enum RateLimitResult {
    Allowed { remaining: u32 },
    Exceeded { retry_after: Duration },
}

impl RateLimitLayer {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            state: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    /// Count a request from `ip` and decide whether it may proceed.
    pub fn check(&self, ip: IpAddr) -> RateLimitResult {
        self.check_at(ip, Instant::now())
    }

    fn check_at(&self, ip: IpAddr, now: Instant) -> RateLimitResult {
        let mut state = self.state.lock();

        let entry = state.entry(ip).or_insert(RateLimitEntry {
            count: 0,
            window_start: now,
        });

        // Reset window if expired
        if now.duration_since(entry.window_start) >= self.config.window {
            entry.count = 0;
            entry.window_start = now;
        }

        entry.count = entry.count.saturating_add(1);

        if entry.count > self.config.max_requests {
            let reset_at = entry.window_start + self.config.window;
            RateLimitResult::Exceeded {
                retry_after: reset_at.saturating_duration_since(now),
            }
        } else {
            RateLimitResult::Allowed {
                remaining: self.config.max_requests - entry.count,
            }
        }
    }

    /// Drop entries whose window has long passed (call from a background task).
    pub fn cleanup(&self) {
        self.cleanup_at(Instant::now());
    }

    fn cleanup_at(&self, now: Instant) {
        let mut state = self.state.lock();
        let window = self.config.window;

        state.retain(|_, entry| now.duration_since(entry.window_start) < window * 2);
    }

    pub fn tracked_clients(&self) -> usize {
        self.state.lock().len()
    }
}

/// Rate limiting middleware function.
pub async fn rate_limit_middleware(
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    State(limiter): State<RateLimitLayer>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let ip = addr.ip();

    match limiter.check(ip) {
        RateLimitResult::Allowed { remaining } => {
            let mut response = next.run(request).await;
            let headers = response.headers_mut();
            headers.insert(
                LIMIT_HEADER,
                HeaderValue::from(limiter.config.max_requests),
            );
            headers.insert(REMAINING_HEADER, HeaderValue::from(remaining));
            Ok(response)
        }
        RateLimitResult::Exceeded { retry_after } => {
            // round up so clients never retry a moment too early
            let retry_after_secs = retry_after.as_secs() + u64::from(retry_after.subsec_nanos() > 0);

            warn!(
                ip = %ip,
                retry_after_secs,
                "Rate limit exceeded"
            );

            Err(ApiError::TooManyRequests { retry_after_secs })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter(max_requests: u32, window_secs: u64) -> RateLimitLayer {
        RateLimitLayer::new(RateLimitConfig {
            max_requests,
            window: Duration::from_secs(window_secs),
        })
    }

    #[test]
    fn test_rate_limit_allows_under_limit() {
        let limiter = limiter(10, 60);
        let ip: IpAddr = "127.0.0.1".parse().unwrap();

        for expected_remaining in (0..10).rev() {
            assert_eq!(
                limiter.check(ip),
                RateLimitResult::Allowed {
                    remaining: expected_remaining
                }
            );
        }
    }

    #[test]
    fn test_rate_limit_rejects_over_limit() {
        let limiter = limiter(3, 60);
        let ip: IpAddr = "127.0.0.1".parse().unwrap();
        let start = Instant::now();

        for _ in 0..3 {
            assert!(matches!(
                limiter.check_at(ip, start),
                RateLimitResult::Allowed { .. }
            ));
        }

        match limiter.check_at(ip, start + Duration::from_secs(10)) {
            RateLimitResult::Exceeded { retry_after } => {
                assert_eq!(retry_after, Duration::from_secs(50));
            }
            other => panic!("Should be exceeded, got {other:?}"),
        }
    }

    #[test]
    fn test_window_resets() {
        let limiter = limiter(1, 60);
        let ip: IpAddr = "127.0.0.1".parse().unwrap();
        let start = Instant::now();

        assert!(matches!(limiter.check_at(ip, start), RateLimitResult::Allowed { .. }));
        assert!(matches!(limiter.check_at(ip, start), RateLimitResult::Exceeded { .. }));
        assert!(matches!(
            limiter.check_at(ip, start + Duration::from_secs(60)),
            RateLimitResult::Allowed { .. }
        ));
    }

    #[test]
    fn test_clients_counted_separately() {
        let limiter = limiter(1, 60);
        let a: IpAddr = "10.0.0.1".parse().unwrap();
        let b: IpAddr = "10.0.0.2".parse().unwrap();

        assert!(matches!(limiter.check(a), RateLimitResult::Allowed { .. }));
        assert!(matches!(limiter.check(b), RateLimitResult::Allowed { .. }));
        assert!(matches!(limiter.check(a), RateLimitResult::Exceeded { .. }));
    }

    #[test]
    fn test_cleanup_drops_stale_entries() {
        let limiter = limiter(5, 60);
        let ip: IpAddr = "127.0.0.1".parse().unwrap();
        let start = Instant::now();

        limiter.check_at(ip, start);
        limiter.cleanup_at(start + Duration::from_secs(30));
        assert_eq!(limiter.tracked_clients(), 1);

        limiter.cleanup_at(start + Duration::from_secs(120));
        assert_eq!(limiter.tracked_clients(), 0);
    }
}
