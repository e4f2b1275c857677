//! services/api/src/web/rate_limit.rs
//!
//! Per-client-IP rate limiting using governor's keyed token buckets.

use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::Response,
};
use governor::{DefaultKeyedRateLimiter, Quota, RateLimiter};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

use crate::error::ApiError;

/// Idle client entries are purged once the table grows past this size.
const MAX_TRACKED_CLIENTS: usize = 10_000;

/// A rate limiter allowing `max` requests per client IP in every `window`.
///
/// Token bucket, not a fixed window: a client may send `max` requests back to
/// back, after which one request is refilled every `window / max`. An emptied
/// bucket is therefore full again after one `window`, and a single window can
/// admit up to `2 * max - 1` requests when it straddles a burst and its refill.
pub struct IpRateLimiter {
    limiter: DefaultKeyedRateLimiter<IpAddr>,
    message: &'static str,
}

impl IpRateLimiter {
    pub fn new(max: u32, window: Duration, message: &'static str) -> Arc<Self> {
        let burst = NonZeroU32::new(max).unwrap_or(NonZeroU32::MIN);
        let quota = Quota::with_period(window / burst.get())
            .unwrap_or_else(|| Quota::per_second(burst))
            .allow_burst(burst);

        Arc::new(Self {
            limiter: RateLimiter::keyed(quota),
            message,
        })
    }

    /// Consumes one request from `client`'s budget.
    pub fn check(&self, client: IpAddr) -> Result<(), ApiError> {
        if self.limiter.len() > MAX_TRACKED_CLIENTS {
            self.limiter.retain_recent();
        }
        self.limiter.check_key(&client).map_err(|_| {
            warn!(%client, "Rate limit exceeded");
            ApiError::TooManyRequests(self.message.to_string())
        })
    }
}

/// Requests arriving without connection info (e.g. in-process tests) share one bucket.
fn client_ip(req: &Request) -> IpAddr {
    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip())
        .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED))
}

/// Rate limiting middleware.
pub async fn rate_limit(
    State(limiter): State<Arc<IpRateLimiter>>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    limiter.check(client_ip(&req))?;
    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn budget_is_tracked_per_client() {
        let limiter = IpRateLimiter::new(2, Duration::from_secs(60), "slow down");
        let a = IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1));
        let b = IpAddr::V4(Ipv4Addr::new(10, 0, 0, 2));

        assert!(limiter.check(a).is_ok());
        assert!(limiter.check(a).is_ok());
        assert!(matches!(limiter.check(a), Err(ApiError::TooManyRequests(msg)) if msg == "slow down"));
        assert!(limiter.check(b).is_ok());
    }

    #[test]
    fn budget_refills_one_request_per_slice_of_the_window() {
        // Two requests per 200ms: one request comes back every 100ms.
        let limiter = IpRateLimiter::new(2, Duration::from_millis(200), "slow down");
        let client = IpAddr::V4(Ipv4Addr::new(10, 0, 0, 3));

        assert!(limiter.check(client).is_ok());
        assert!(limiter.check(client).is_ok());
        assert!(limiter.check(client).is_err());

        std::thread::sleep(Duration::from_millis(150));
        assert!(limiter.check(client).is_ok());
        assert!(limiter.check(client).is_err());
    }
}
