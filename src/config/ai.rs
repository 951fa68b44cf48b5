//! AI-assist gateway configuration.

use super::{env_opt, env_or};
use std::env;

pub const DISABLED_PROVIDER: &str = "disabled";

/// Configuration for the LLM gateway proxy and its usage limits
#[derive(Clone, Debug)]
pub struct AiAssistConfig {
    /// `openrouter` for the real gateway, `mock` for canned replies,
    /// anything else disables the assistant
    pub provider: String,
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub timeout_ms: u64,
    pub max_retries: usize,
    pub retry_base_delay_ms: u64,
    pub daily_limit: u32,
    pub max_tokens: u32,
}

/// Defaults to the `mock` provider; deployments go through [`AiAssistConfig::from_env`]
impl Default for AiAssistConfig {
    fn default() -> Self {
        Self {
            provider: "mock".to_string(),
            api_key: None,
            base_url: "https://openrouter.ai/api/v1".to_string(),
            model: "openai/gpt-4o-mini".to_string(),
            timeout_ms: 20_000,
            max_retries: 2,
            retry_base_delay_ms: 250,
            daily_limit: 50,
            max_tokens: 600,
        }
    }
}

impl AiAssistConfig {
    /// Load configuration from environment variables, falling back to defaults
    ///
    /// Without `AI_PROVIDER` the gateway is used when `OPENROUTER_API_KEY` is
    /// set; otherwise the assistant is disabled. `mock` must be asked for.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let api_key = env_opt("OPENROUTER_API_KEY");
        let provider = env::var("AI_PROVIDER").unwrap_or_else(|_| {
            if api_key.is_some() {
                "openrouter".to_string()
            } else {
                DISABLED_PROVIDER.to_string()
            }
        });

        Self {
            provider: provider.to_lowercase(),
            api_key,
            base_url: env_opt("AI_BASE_URL").unwrap_or(defaults.base_url),
            model: env_opt("AI_MODEL").unwrap_or(defaults.model),
            timeout_ms: env_or("AI_TIMEOUT_MS", defaults.timeout_ms),
            max_retries: env_or("AI_MAX_RETRIES", defaults.max_retries),
            retry_base_delay_ms: env_or("AI_RETRY_BASE_DELAY_MS", defaults.retry_base_delay_ms),
            daily_limit: env_or("AI_DAILY_LIMIT", defaults.daily_limit),
            max_tokens: env_or("AI_MAX_TOKENS", defaults.max_tokens),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Mutex;

    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    fn clear_ai_env() {
        unsafe {
            for key in ["AI_PROVIDER", "OPENROUTER_API_KEY", "AI_DAILY_LIMIT"] {
                env::remove_var(key);
            }
        }
    }

    #[test]
    fn test_from_env_without_settings_is_disabled() {
        let _lock = ENV_MUTEX.lock().unwrap();
        clear_ai_env();

        let config = AiAssistConfig::from_env();
        assert_eq!(config.provider, DISABLED_PROVIDER);
        assert_eq!(config.daily_limit, 50);
    }

    #[test]
    fn test_from_env_provider_selection() {
        let _lock = ENV_MUTEX.lock().unwrap();
        clear_ai_env();

        unsafe { env::set_var("OPENROUTER_API_KEY", "sk-test") };
        assert_eq!(AiAssistConfig::from_env().provider, "openrouter");

        unsafe { env::set_var("AI_PROVIDER", "Mock") };
        assert_eq!(AiAssistConfig::from_env().provider, "mock");

        clear_ai_env();
    }

    #[test]
    fn defaults_use_mock_provider() {
        let config = AiAssistConfig::default();
        assert_eq!(config.provider, "mock");
        assert_eq!(config.daily_limit, 50);
        assert_eq!(config.max_retries, 2);
    }
}
