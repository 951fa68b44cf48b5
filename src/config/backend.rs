//! Hosted backend configuration.

use super::{env_opt, env_or, ConfigError};
use std::env;

/// Which backend implementation serves auth and data requests
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BackendMode {
    /// Hosted Supabase project (GoTrue + PostgREST)
    Supabase,
    /// Process-local store with the same row policies; development and tests only
    Memory,
}

/// Configuration for the hosted auth/data backend
#[derive(Clone, Debug)]
pub struct BackendConfig {
    pub mode: BackendMode,
    pub url: Option<String>,
    pub anon_key: Option<String>,
    pub timeout_seconds: u64,
    pub profile_fetch_attempts: u32,
    pub profile_fetch_delay_ms: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            mode: BackendMode::Memory,
            url: None,
            anon_key: None,
            timeout_seconds: 10,
            profile_fetch_attempts: 3,
            profile_fetch_delay_ms: 150,
        }
    }
}

impl BackendConfig {
    /// Load configuration from environment variables
    ///
    /// Supabase mode is the default and requires both `SUPABASE_URL` and
    /// `SUPABASE_ANON_KEY`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mode = match env::var("BACKEND_MODE")
            .unwrap_or_else(|_| "supabase".to_string())
            .to_lowercase()
            .as_str()
        {
            "supabase" => BackendMode::Supabase,
            "memory" => BackendMode::Memory,
            other => {
                return Err(ConfigError::Invalid {
                    name: "BACKEND_MODE",
                    reason: format!("unknown mode '{other}'"),
                });
            }
        };

        let url = env_opt("SUPABASE_URL");
        let anon_key = env_opt("SUPABASE_ANON_KEY");

        if mode == BackendMode::Supabase {
            let raw = url.as_deref().ok_or(ConfigError::Missing("SUPABASE_URL"))?;
            url::Url::parse(raw).map_err(|e| ConfigError::Invalid {
                name: "SUPABASE_URL",
                reason: e.to_string(),
            })?;
            if anon_key.is_none() {
                return Err(ConfigError::Missing("SUPABASE_ANON_KEY"));
            }
        }

        Ok(Self {
            mode,
            url,
            anon_key,
            timeout_seconds: env_or("BACKEND_TIMEOUT_SECONDS", 10),
            profile_fetch_attempts: env_or("PROFILE_FETCH_ATTEMPTS", 3).max(1),
            profile_fetch_delay_ms: env_or("PROFILE_FETCH_DELAY_MS", 150),
        })
    }
}
