//! Rate limiting service for controlling request frequency.

use crate::{
    config::RateLimitConfig, error::ApiError, services::metrics::AppMetrics,
    utils::http::extract_client_ip,
};
use actix_web::{HttpRequest, web};
use async_trait::async_trait;
use std::{collections::HashMap, sync::Arc, time::Duration};
use tokio::{sync::Mutex, time::Instant};

/// Counter state for one key after an increment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowCount {
    /// Requests counted in the current window, including this one
    pub count: u32,
    /// Time until the current window closes
    pub resets_in: Duration,
}

/// Storage behind the rate limiter
///
/// The in-memory store serves a single process. A multi-instance deployment
/// plugs in a shared key-value store behind the same trait.
#[async_trait]
pub trait RateLimitStore: Send + Sync {
    /// Count one request for `key` in a window of length `window`
    async fn increment(&self, key: &str, window: Duration) -> WindowCount;
}

/// Process-local fixed-window counters keyed by client
#[derive(Clone, Default)]
pub struct MemoryRateLimitStore {
    windows: Arc<Mutex<HashMap<String, (u32, Instant)>>>,
}

impl MemoryRateLimitStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RateLimitStore for MemoryRateLimitStore {
    async fn increment(&self, key: &str, window: Duration) -> WindowCount {
        let mut windows = self.windows.lock().await;
        let now = Instant::now();

        // Clean up expired entries
        windows.retain(|_, (_, started)| now.duration_since(*started) < window);

        let (count, started) = windows.entry(key.to_string()).or_insert((0, now));
        *count += 1;

        WindowCount {
            count: *count,
            resets_in: window.saturating_sub(now.duration_since(*started)),
        }
    }
}

/// Outcome of a rate limit check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitDecision {
    Allowed { remaining: u32 },
    Limited { retry_after_secs: u64 },
}

/// Fixed-window rate limiter
///
/// Allows `max_requests` per key inside each window; the first request of a
/// key opens its window.
#[derive(Clone)]
pub struct RateLimiter {
    config: RateLimitConfig,
    store: Arc<dyn RateLimitStore>,
}

impl RateLimiter {
    /// Create a rate limiter backed by the in-memory store
    pub fn new(config: RateLimitConfig) -> Self {
        Self::with_store(config, Arc::new(MemoryRateLimitStore::new()))
    }

    pub fn with_store(config: RateLimitConfig, store: Arc<dyn RateLimitStore>) -> Self {
        Self { config, store }
    }

    /// Count a request for `key` and decide whether it may proceed
    pub async fn check(&self, key: &str) -> RateLimitDecision {
        let window = Duration::from_secs(self.config.window_seconds);
        let WindowCount { count, resets_in } = self.store.increment(key, window).await;

        if count > self.config.max_requests {
            // Round up so clients never retry before the window closes.
            let retry_after_secs = resets_in
                .as_secs()
                .saturating_add(u64::from(resets_in.subsec_nanos() > 0))
                .clamp(1, self.config.window_seconds);
            RateLimitDecision::Limited { retry_after_secs }
        } else {
            RateLimitDecision::Allowed {
                remaining: self.config.max_requests - count,
            }
        }
    }
}

/// Apply the shared rate limiter to a request
///
/// Requests are bucketed per `scope` and client IP. Without a limiter in
/// app data the request is let through.
pub async fn enforce_rate_limit(req: &HttpRequest, scope: &str) -> Result<(), ApiError> {
    let Some(limiter) = req.app_data::<web::Data<RateLimiter>>() else {
        return Ok(());
    };

    let ip = extract_client_ip(req);
    let key = format!("{scope}:{ip}");

    match limiter.check(&key).await {
        RateLimitDecision::Allowed { .. } => Ok(()),
        RateLimitDecision::Limited { retry_after_secs } => {
            tracing::warn!(
                scope = scope,
                ip_address = %ip,
                retry_after = retry_after_secs,
                "Rate limit exceeded"
            );
            if let Some(metrics) = req.app_data::<web::Data<AppMetrics>>() {
                metrics.record_rate_limited(scope);
            }
            Err(ApiError::rate_limited(retry_after_secs))
        }
    }
}
