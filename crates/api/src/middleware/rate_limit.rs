//! Per-IP rate limiting for the ratings endpoints.
//!
//! Each limiter is a keyed `governor` rate limiter shared by every clone of
//! the router. The client IP resolved here is also attached to the request
//! as a [`ClientIp`] extension so handlers can record it for auditing.

use std::net::SocketAddr;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{ConnectInfo, Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use governor::clock::DefaultClock;
use governor::state::keyed::DefaultKeyedStateStore;
use governor::{Quota, RateLimiter};
use tokio::task::JoinHandle;

use crate::config::RateLimitConfig;
use crate::error::AppError;

/// How often idle keys are dropped from the limiter maps.
pub const PRUNE_INTERVAL: Duration = Duration::from_secs(60);

pub type IpRateLimiter = Arc<RateLimiter<String, DefaultKeyedStateStore<String>, DefaultClock>>;

/// Client address used as the rate-limit key and audit value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientIp(pub String);

/// A named limiter; the name is used in the 429 message and logs.
#[derive(Clone)]
pub struct NamedLimiter {
    pub name: &'static str,
    pub limiter: IpRateLimiter,
    /// Whether `X-Forwarded-For` may be used to resolve the client IP.
    pub trust_forwarded_for: bool,
}

impl NamedLimiter {
    /// Drop keys whose quota is fully replenished. Returns the remaining count.
    pub fn prune(&self) -> usize {
        self.limiter.retain_recent();
        self.limiter.shrink_to_fit();
        self.limiter.len()
    }
}

/// The limiters mounted on the ratings routes.
#[derive(Clone)]
pub struct RateLimiters {
    /// Shared by every ratings endpoint.
    pub ratings: NamedLimiter,
    /// Additional limit on `POST /ratings/submit`.
    pub submissions: NamedLimiter,
}

fn non_zero(n: u32) -> NonZeroU32 {
    NonZeroU32::new(n).unwrap_or(NonZeroU32::MIN)
}

/// Allow `per_minute` requests per minute per IP.
pub fn per_minute_limiter(per_minute: u32) -> IpRateLimiter {
    Arc::new(RateLimiter::keyed(Quota::per_minute(non_zero(per_minute))))
}

/// Allow a burst of `max` requests per IP, replenished evenly over `window`.
pub fn windowed_limiter(max: u32, window: Duration) -> IpRateLimiter {
    let max = non_zero(max);
    let quota = Quota::with_period(window / max.get())
        .map(|q| q.allow_burst(max))
        .unwrap_or_else(|| Quota::per_second(max));
    Arc::new(RateLimiter::keyed(quota))
}

impl RateLimiters {
    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self {
            ratings: NamedLimiter {
                name: "ratings",
                limiter: per_minute_limiter(config.ratings_per_minute),
                trust_forwarded_for: config.trust_forwarded_for,
            },
            submissions: NamedLimiter {
                name: "submissions",
                limiter: windowed_limiter(
                    config.submissions_per_window,
                    Duration::from_secs(config.submission_window_secs),
                ),
                trust_forwarded_for: config.trust_forwarded_for,
            },
        }
    }

    /// Prune both limiters, returning the number of keys still tracked.
    pub fn prune(&self) -> usize {
        self.ratings.prune() + self.submissions.prune()
    }

    /// Prune both limiters every `every` until the task is aborted.
    pub fn spawn_pruning(&self, every: Duration) -> JoinHandle<()> {
        let limiters = self.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            loop {
                interval.tick().await;
                let tracked = limiters.prune();
                tracing::debug!(tracked, "Pruned rate limiter keys");
            }
        })
    }
}

/// Resolve the client IP.
///
/// The socket address is used unless `trust_forwarded_for` is set, in which
/// case the first `X-Forwarded-For` entry takes precedence. Falls back to
/// `"unknown"` when neither is available.
pub fn client_ip(request: &Request, trust_forwarded_for: bool) -> String {
    if trust_forwarded_for {
        let forwarded = request
            .headers()
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|v| !v.is_empty());

        if let Some(ip) = forwarded {
            return ip.to_string();
        }
    }

    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Reject the request with 429 when the client's quota is exhausted.
pub async fn rate_limit(
    State(limiter): State<NamedLimiter>,
    mut request: Request,
    next: Next,
) -> Response {
    let ip = match request.extensions().get::<ClientIp>() {
        Some(ClientIp(ip)) => ip.clone(),
        None => {
            let ip = client_ip(&request, limiter.trust_forwarded_for);
            request.extensions_mut().insert(ClientIp(ip.clone()));
            ip
        }
    };

    match limiter.limiter.check_key(&ip) {
        Ok(()) => next.run(request).await,
        Err(_) => {
            tracing::warn!(ip = %ip, limiter = limiter.name, "Rate limit exceeded");
            AppError::TooManyRequests(format!(
                "Too many {} requests, please try again later",
                limiter.name
            ))
            .into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use axum::body::Body;

    use super::*;

    fn forwarded_request(peer: &str, forwarded: &str) -> Request {
        let mut request = Request::builder()
            .header("x-forwarded-for", forwarded)
            .body(Body::empty())
            .unwrap();
        let addr: SocketAddr = peer.parse().unwrap();
        request.extensions_mut().insert(ConnectInfo(addr));
        request
    }

    #[test]
    fn windowed_limiter_allows_burst_then_blocks() {
        let limiter = windowed_limiter(3, Duration::from_secs(900));
        let key = "10.0.0.1".to_string();
        for _ in 0..3 {
            assert!(limiter.check_key(&key).is_ok());
        }
        assert!(limiter.check_key(&key).is_err());
        assert!(limiter.check_key(&"10.0.0.2".to_string()).is_ok());
    }

    #[test]
    fn per_minute_limiter_counts_per_key() {
        let limiter = per_minute_limiter(2);
        let key = "10.0.0.1".to_string();
        assert!(limiter.check_key(&key).is_ok());
        assert!(limiter.check_key(&key).is_ok());
        assert!(limiter.check_key(&key).is_err());
    }

    #[test]
    fn client_ip_ignores_forwarded_header_by_default() {
        let request = forwarded_request("192.0.2.4:5555", "203.0.113.7");
        assert_eq!(client_ip(&request, false), "192.0.2.4");
    }

    #[test]
    fn client_ip_uses_forwarded_header_when_trusted() {
        let request = forwarded_request("192.0.2.4:5555", "203.0.113.7, 10.0.0.1");
        assert_eq!(client_ip(&request, true), "203.0.113.7");
    }

    #[test]
    fn client_ip_falls_back_to_connect_info() {
        let mut request = Request::builder().body(Body::empty()).unwrap();
        let addr: SocketAddr = "192.0.2.4:5555".parse().unwrap();
        request.extensions_mut().insert(ConnectInfo(addr));
        assert_eq!(client_ip(&request, true), "192.0.2.4");

        let bare = Request::builder().body(Body::empty()).unwrap();
        assert_eq!(client_ip(&bare, false), "unknown");
    }

    #[test]
    fn prune_drops_replenished_keys() {
        let limiters = RateLimiters {
            ratings: NamedLimiter {
                name: "ratings",
                limiter: Arc::new(RateLimiter::keyed(Quota::per_second(non_zero(1000)))),
                trust_forwarded_for: false,
            },
            submissions: NamedLimiter {
                name: "submissions",
                limiter: per_minute_limiter(1),
                trust_forwarded_for: false,
            },
        };
        for i in 0..10 {
            assert!(limiters.ratings.limiter.check_key(&format!("10.0.0.{i}")).is_ok());
        }
        assert!(limiters.submissions.limiter.check_key(&"10.0.0.1".to_string()).is_ok());

        std::thread::sleep(Duration::from_millis(50));

        // Ratings keys have replenished; the submission key is still throttled.
        assert_eq!(limiters.prune(), 1);
        assert_eq!(limiters.ratings.limiter.len(), 0);
    }
}
