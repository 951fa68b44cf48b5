//! Rate limiting configuration.

use super::env_or;

/// Configuration for the fixed-window rate limiter
#[derive(Clone, Debug)]
pub struct RateLimitConfig {
    pub max_requests: u32,
    pub window_seconds: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 10,
            window_seconds: 60,
        }
    }
}

impl RateLimitConfig {
    /// Load configuration from environment variables, falling back to defaults
    pub fn from_env() -> Self {
        Self {
            max_requests: env_or("RATE_LIMIT_MAX_REQUESTS", 10),
            window_seconds: env_or("RATE_LIMIT_WINDOW_SECONDS", 60).max(1),
        }
    }
}
