//! Fixed-window request limiting keyed by session or client address.
//!
//! Counters live in process memory by default; with `rate_limit_use_redis`
//! set they are kept in Redis so several instances share one window, and
//! the in-memory store becomes a fallback for Redis outages.

use axum::{
    extract::Request,
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use dashmap::DashMap;
use redis::AsyncCommands;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::auth::SESSION_KEY_HEADER;
use crate::config::AppConfig;
use crate::errors::{ApiError, ServiceError};

#[derive(Debug, Clone)]
struct WindowEntry {
    count: u32,
    window_start: Instant,
}

impl WindowEntry {
    fn new() -> Self {
        Self {
            count: 0,
            window_start: Instant::now(),
        }
    }

    /// Counts this request, resetting the window first when it has lapsed.
    fn record(&mut self, window: Duration) -> u32 {
        let now = Instant::now();
        if now.duration_since(self.window_start) >= window {
            self.count = 0;
            self.window_start = now;
        }
        self.count += 1;
        self.count
    }

    fn time_until_reset(&self, window: Duration) -> Duration {
        let elapsed = Instant::now().duration_since(self.window_start);
        window.saturating_sub(elapsed)
    }
}

#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    pub requests_per_window: u32,
    pub window_duration: Duration,
    pub enable_headers: bool,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_window: 100,
            window_duration: Duration::from_secs(60),
            enable_headers: true,
        }
    }
}

impl RateLimitConfig {
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            requests_per_window: config.rate_limit_requests_per_window,
            window_duration: Duration::from_secs(config.rate_limit_window_seconds),
            enable_headers: config.rate_limit_enable_headers,
        }
    }
}

#[derive(Clone)]
enum RateLimitStore {
    InMemory {
        entries: Arc<DashMap<String, WindowEntry>>,
    },
    Redis {
        client: Arc<redis::Client>,
        namespace: String,
        fallback: Arc<DashMap<String, WindowEntry>>,
    },
}

#[derive(Clone)]
pub struct RateLimiter {
    store: RateLimitStore,
    config: RateLimitConfig,
}

#[derive(Debug)]
pub struct RateLimitResult {
    pub allowed: bool,
    pub limit: u32,
    pub remaining: u32,
    pub reset_after: Duration,
}

impl RateLimiter {
    pub fn in_memory(config: RateLimitConfig) -> Self {
        Self {
            store: RateLimitStore::InMemory {
                entries: Arc::new(DashMap::new()),
            },
            config,
        }
    }

    pub fn redis_backed(
        config: RateLimitConfig,
        client: Arc<redis::Client>,
        namespace: String,
    ) -> Self {
        Self {
            store: RateLimitStore::Redis {
                client,
                namespace,
                fallback: Arc::new(DashMap::new()),
            },
            config,
        }
    }

    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    pub async fn check(&self, key: &str) -> RateLimitResult {
        match &self.store {
            RateLimitStore::InMemory { entries } => self.check_in_memory(entries, key),
            RateLimitStore::Redis {
                client,
                namespace,
                fallback,
            } => match client.get_async_connection().await {
                Ok(mut conn) => match self.check_with_redis(&mut conn, namespace, key).await {
                    Ok(result) => result,
                    Err(err) => {
                        warn!("Redis rate limit check failed, using fallback: {}", err);
                        self.check_in_memory(fallback, key)
                    }
                },
                Err(err) => {
                    warn!("Redis unavailable for rate limiting: {}", err);
                    self.check_in_memory(fallback, key)
                }
            },
        }
    }

    fn check_in_memory(&self, entries: &DashMap<String, WindowEntry>, key: &str) -> RateLimitResult {
        let mut entry = entries
            .entry(key.to_string())
            .or_insert_with(WindowEntry::new);

        let count = entry.record(self.config.window_duration);
        let reset_after = entry.time_until_reset(self.config.window_duration);

        RateLimitResult {
            allowed: count <= self.config.requests_per_window,
            limit: self.config.requests_per_window,
            remaining: self.config.requests_per_window.saturating_sub(count),
            reset_after,
        }
    }

    async fn check_with_redis<C>(
        &self,
        conn: &mut C,
        namespace: &str,
        key: &str,
    ) -> Result<RateLimitResult, redis::RedisError>
    where
        C: redis::aio::ConnectionLike + Send,
    {
        let redis_key = format!("{}:{}", namespace, key);
        let window_secs = self.config.window_duration.as_secs().max(1);

        let count: i64 = conn.incr(&redis_key, 1).await?;
        if count == 1 {
            let _: Result<(), _> = conn.expire(&redis_key, window_secs as usize).await;
        }

        let ttl_secs = match conn.ttl::<_, i64>(&redis_key).await {
            Ok(ttl) if ttl > 0 => ttl as u64,
            _ => window_secs,
        };

        let limit = self.config.requests_per_window;
        let allowed = count <= i64::from(limit);
        Ok(RateLimitResult {
            allowed,
            limit,
            remaining: limit.saturating_sub(count.max(0) as u32),
            reset_after: Duration::from_secs(ttl_secs),
        })
    }

    /// Drops in-memory entries whose window has lapsed. Redis entries
    /// expire on their own.
    pub fn cleanup_expired(&self) {
        let entries = match &self.store {
            RateLimitStore::InMemory { entries } => entries,
            RateLimitStore::Redis { fallback, .. } => fallback,
        };
        let window = self.config.window_duration;
        let now = Instant::now();
        entries.retain(|_, entry| now.duration_since(entry.window_start) < window);
    }
}

/// Builds the limiter the configuration asks for. A bad Redis URL falls
/// back to the in-memory store rather than refusing to start.
pub fn build_rate_limiter(config: &AppConfig) -> RateLimiter {
    let limit_config = RateLimitConfig::from_app_config(config);
    if config.rate_limit_use_redis {
        match redis::Client::open(config.redis_url()) {
            Ok(client) => {
                return RateLimiter::redis_backed(
                    limit_config,
                    Arc::new(client),
                    config.rate_limit_namespace.clone(),
                );
            }
            Err(err) => {
                warn!(
                    "Invalid Redis URL for rate limiting, using in-memory store: {}",
                    err
                );
            }
        }
    }
    RateLimiter::in_memory(limit_config)
}

/// Who the request is counted against: the cart session when one is
/// declared, otherwise the forwarded client address.
fn client_key(request: &Request) -> String {
    if let Some(session) = request.headers().get(&SESSION_KEY_HEADER) {
        if let Ok(session) = session.to_str() {
            let session = session.trim();
            if !session.is_empty() {
                return format!("session:{}", session);
            }
        }
    }

    if let Some(forwarded) = request.headers().get("x-forwarded-for") {
        if let Ok(forwarded) = forwarded.to_str() {
            if let Some(ip) = forwarded.split(',').next() {
                return format!("ip:{}", ip.trim());
            }
        }
    }

    if let Some(real_ip) = request.headers().get("x-real-ip") {
        if let Ok(ip) = real_ip.to_str() {
            return format!("ip:{}", ip);
        }
    }

    "ip:unknown".to_string()
}

fn num_header<T: ToString>(n: T) -> HeaderValue {
    HeaderValue::from_str(&n.to_string()).unwrap_or_else(|_| HeaderValue::from_static("0"))
}

fn apply_headers(response: &mut Response, result: &RateLimitResult) {
    let headers = response.headers_mut();
    headers.insert("X-RateLimit-Limit", num_header(result.limit));
    headers.insert("X-RateLimit-Remaining", num_header(result.remaining));
    headers.insert(
        "X-RateLimit-Reset",
        num_header(result.reset_after.as_secs()),
    );
}

#[derive(Clone)]
pub struct RateLimitLayer {
    limiter: RateLimiter,
}

impl RateLimitLayer {
    pub fn new(limiter: RateLimiter) -> Self {
        Self { limiter }
    }
}

impl<S> tower::Layer<S> for RateLimitLayer {
    type Service = RateLimitService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RateLimitService {
            inner,
            limiter: self.limiter.clone(),
        }
    }
}

#[derive(Clone)]
pub struct RateLimitService<S> {
    inner: S,
    limiter: RateLimiter,
}

impl<S> tower::Service<Request> for RateLimitService<S>
where
    S: tower::Service<Request, Response = Response> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = Response;
    type Error = S::Error;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(
        &mut self,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request) -> Self::Future {
        let limiter = self.limiter.clone();
        let mut inner = self.inner.clone();

        Box::pin(async move {
            let path = request.uri().path();
            if path.starts_with("/health")
                || path == "/metrics"
                || path.starts_with("/docs")
                || path.starts_with("/api-docs")
            {
                return inner.call(request).await;
            }

            let key = client_key(&request);
            let result = limiter.check(&key).await;

            if !result.allowed {
                warn!("Rate limit exceeded for {}", key);
                let mut response =
                    ApiError::ServiceError(ServiceError::RateLimitExceeded).into_response();
                if limiter.config().enable_headers {
                    apply_headers(&mut response, &result);
                }
                return Ok(response);
            }

            let mut response = inner.call(request).await?;
            if limiter.config().enable_headers {
                apply_headers(&mut response, &result);
            }
            Ok(response)
        })
    }
}

/// Periodic sweep of lapsed windows so idle keys do not pile up.
pub async fn start_cleanup_task(limiter: RateLimiter, interval: Duration) {
    let mut ticker = tokio::time::interval(interval);
    loop {
        ticker.tick().await;
        limiter.cleanup_expired();
        debug!("Rate limiter cleanup completed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tight_config(limit: u32) -> RateLimitConfig {
        RateLimitConfig {
            requests_per_window: limit,
            window_duration: Duration::from_secs(60),
            enable_headers: true,
        }
    }

    #[tokio::test]
    async fn requests_beyond_the_window_limit_are_denied() {
        let limiter = RateLimiter::in_memory(tight_config(2));

        assert!(limiter.check("session:abc").await.allowed);
        assert!(limiter.check("session:abc").await.allowed);
        assert!(!limiter.check("session:abc").await.allowed);
    }

    #[tokio::test]
    async fn keys_are_counted_independently() {
        let limiter = RateLimiter::in_memory(tight_config(1));

        assert!(limiter.check("ip:10.0.0.1").await.allowed);
        assert!(limiter.check("ip:10.0.0.2").await.allowed);
        assert!(!limiter.check("ip:10.0.0.1").await.allowed);
    }

    #[tokio::test]
    async fn remaining_counts_down_to_zero() {
        let limiter = RateLimiter::in_memory(tight_config(3));

        assert_eq!(limiter.check("k").await.remaining, 2);
        assert_eq!(limiter.check("k").await.remaining, 1);
        assert_eq!(limiter.check("k").await.remaining, 0);
        let denied = limiter.check("k").await;
        assert!(!denied.allowed);
        assert_eq!(denied.remaining, 0);
    }

    #[test]
    fn cleanup_keeps_active_windows() {
        let limiter = RateLimiter::in_memory(tight_config(5));
        if let RateLimitStore::InMemory { entries } = &limiter.store {
            entries.insert("fresh".to_string(), WindowEntry::new());
            let mut stale = WindowEntry::new();
            stale.window_start = Instant::now() - Duration::from_secs(120);
            entries.insert("stale".to_string(), stale);

            limiter.cleanup_expired();
            assert!(entries.contains_key("fresh"));
            assert!(!entries.contains_key("stale"));
        } else {
            unreachable!();
        }
    }
}
