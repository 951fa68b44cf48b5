//! Authentication flow configuration: redirect targets and session cookies.

use super::{env_flag, env_opt, env_or};

/// Configuration for sign-up, password reset and session cookies
#[derive(Clone, Debug)]
pub struct AuthConfig {
    /// Where the confirmation email sends the user after sign-up
    pub signup_redirect_url: Option<String>,
    /// Where the password reset email sends the user
    pub reset_redirect_url: Option<String>,
    /// Mark session cookies `Secure`; disable only for plain-http development
    pub cookie_secure: bool,
    /// Lifetime of the refresh-token cookie
    pub refresh_ttl_days: i64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            signup_redirect_url: None,
            reset_redirect_url: None,
            cookie_secure: true,
            refresh_ttl_days: 30,
        }
    }
}

impl AuthConfig {
    /// Load configuration from environment variables, falling back to defaults
    pub fn from_env() -> Self {
        Self {
            signup_redirect_url: env_opt("AUTH_SIGNUP_REDIRECT_URL"),
            reset_redirect_url: env_opt("AUTH_RESET_REDIRECT_URL"),
            cookie_secure: env_flag("AUTH_COOKIE_SECURE", true),
            refresh_ttl_days: env_or("AUTH_REFRESH_TTL_DAYS", 30),
        }
    }
}
