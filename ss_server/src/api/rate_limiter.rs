//! Rate limiting for the login and registration endpoints.
//!
//! Each client address gets its own sliding window; a client over its
//! budget is answered with `429 Too Many Requests` before the handler runs.

use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::collections::{HashMap, VecDeque};
use std::net::{IpAddr, SocketAddr};
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

use super::{AppState, error::ApiError};

/// Sliding-window counter for one client
#[derive(Debug)]
pub struct RateLimiter {
    /// Timestamps of recent requests
    timestamps: VecDeque<Instant>,
    max_requests: usize,
    window: Duration,
}

impl RateLimiter {
    /// Create a new rate limiter
    ///
    /// # Example
    ///
    /// ```
    /// use ss_server::api::rate_limiter::RateLimiter;
    /// use std::time::Duration;
    ///
    /// // Allow 10 requests per minute
    /// let limiter = RateLimiter::new(10, Duration::from_secs(60));
    /// ```
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            timestamps: VecDeque::with_capacity(max_requests),
            max_requests,
            window,
        }
    }

    /// Record a request if the window has room.
    ///
    /// Returns `true` if the request is allowed, `false` if the limit is reached.
    ///
    /// ```
    /// # use ss_server::api::rate_limiter::RateLimiter;
    /// # use std::time::Duration;
    /// let mut limiter = RateLimiter::new(2, Duration::from_secs(1));
    /// assert!(limiter.check());
    /// assert!(limiter.check());
    /// assert!(!limiter.check());
    /// ```
    pub fn check(&mut self) -> bool {
        self.check_at(Instant::now())
    }

    fn check_at(&mut self, now: Instant) -> bool {
        while let Some(ts) = self.timestamps.front() {
            if now.duration_since(*ts) > self.window {
                self.timestamps.pop_front();
            } else {
                break;
            }
        }

        if self.timestamps.len() >= self.max_requests {
            return false;
        }

        self.timestamps.push_back(now);
        true
    }

    /// Requests still allowed in the current window
    pub fn remaining(&self) -> usize {
        self.max_requests.saturating_sub(self.timestamps.len())
    }

    /// Whether every recorded request has left the window.
    fn is_idle(&self, now: Instant) -> bool {
        self.timestamps
            .back()
            .is_none_or(|last| now.duration_since(*last) > self.window)
    }
}

/// One [`RateLimiter`] per client address
#[derive(Debug)]
pub struct ClientRateLimiter {
    clients: Mutex<HashMap<IpAddr, RateLimiter>>,
    max_requests: usize,
    window: Duration,
}

/// Idle windows are swept once the map grows past this many clients.
const SWEEP_THRESHOLD: usize = 10_000;

impl ClientRateLimiter {
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            clients: Mutex::new(HashMap::new()),
            max_requests,
            window,
        }
    }

    /// Record a request from `client`; `false` when it is over budget.
    pub async fn check(&self, client: IpAddr) -> bool {
        let now = Instant::now();
        let mut clients = self.clients.lock().await;
        if clients.len() > SWEEP_THRESHOLD {
            clients.retain(|_, limiter| !limiter.is_idle(now));
        }
        clients
            .entry(client)
            .or_insert_with(|| RateLimiter::new(self.max_requests, self.window))
            .check_at(now)
    }
}

/// Reject clients that exceeded the authentication budget.
///
/// Requests served without connection info (in-process tests) share the
/// loopback address.
pub async fn rate_limit_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let client = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip())
        .unwrap_or(IpAddr::from([127, 0, 0, 1]));

    if state.auth_rate_limiter.check(client).await {
        next.run(request).await
    } else {
        crate::metrics::rate_limit_hits_total(request.uri().path());
        crate::logging::log_security_event(
            "rate_limited",
            None,
            Some(&client.to_string()),
            "Authentication rate limit exceeded",
        );
        ApiError::TooManyRequests.into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limiter_blocks_over_limit() {
        let mut limiter = RateLimiter::new(3, Duration::from_secs(1));

        for _ in 0..3 {
            assert!(limiter.check());
        }

        assert!(!limiter.check(), "Should block request over limit");
        assert_eq!(limiter.remaining(), 0);
    }

    #[test]
    fn test_rate_limiter_window_expiry() {
        let mut limiter = RateLimiter::new(2, Duration::from_millis(100));
        let start = Instant::now();

        assert!(limiter.check_at(start));
        assert!(limiter.check_at(start));
        assert!(!limiter.check_at(start + Duration::from_millis(50)));

        assert!(
            limiter.check_at(start + Duration::from_millis(150)),
            "Should allow after window expires"
        );
        assert!(!limiter.is_idle(start + Duration::from_millis(150)));
        assert!(limiter.is_idle(start + Duration::from_millis(300)));
    }

    #[tokio::test]
    async fn test_clients_have_separate_budgets() {
        let limiter = ClientRateLimiter::new(1, Duration::from_secs(60));
        let alice = IpAddr::from([10, 0, 0, 1]);
        let bob = IpAddr::from([10, 0, 0, 2]);

        assert!(limiter.check(alice).await);
        assert!(!limiter.check(alice).await);
        assert!(limiter.check(bob).await);
    }
}
