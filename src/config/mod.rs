//! Configuration structures and loading utilities.
//!
//! Every concern owns a small struct with a `Default` implementation and a
//! `from_env` constructor that falls back to those defaults.

pub mod ai;
pub mod auth;
pub mod backend;
pub mod metrics;
pub mod rate_limit;
pub mod security;
pub mod server;

pub use ai::*;
pub use auth::*;
pub use backend::*;
pub use metrics::*;
pub use rate_limit::*;
pub use security::*;
pub use server::*;

use std::env;

/// Errors raised while assembling configuration at startup
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    #[error("invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

/// Parse an environment variable, falling back to `default` when unset or unparsable
pub(crate) fn env_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

/// Read a boolean flag; only a case-insensitive "true" enables it
pub(crate) fn env_flag(name: &str, default: bool) -> bool {
    env::var(name)
        .map(|v| v.trim().eq_ignore_ascii_case("true"))
        .unwrap_or(default)
}

/// Read an optional, non-empty string variable
pub(crate) fn env_opt(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
pub(crate) mod test_env {
    use std::sync::Mutex;

    // Tests that modify process environment variables must hold this lock.
    pub(crate) static ENV_MUTEX: Mutex<()> = Mutex::new(());
}
