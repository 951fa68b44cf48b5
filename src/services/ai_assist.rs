//! AI-assist client for an OpenAI-compatible chat completions gateway.
//!
//! Each attempt runs under its own timeout. Timeouts, network failures and
//! 408/429/5xx answers are retried with exponential backoff and jitter.

use crate::{
    config::{AiAssistConfig, DISABLED_PROVIDER},
    error::ApiError,
};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tokio_retry::{
    RetryIf,
    strategy::{ExponentialBackoff, jitter},
};
use tracing::{info, warn};

const SYSTEM_PROMPT: &str = "You are an assistant for software testers. Answer concisely with \
practical test ideas, risks and reproduction steps. Use plain text or short lists.";

const MAX_BACKOFF: Duration = Duration::from_secs(5);

#[derive(Debug, thiserror::Error)]
pub enum AiAssistError {
    #[error("AI assist is not configured: {0}")]
    NotConfigured(String),

    #[error("AI gateway request timed out")]
    Timeout,

    #[error("AI gateway network error: {0}")]
    Network(String),

    #[error("AI gateway returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("AI gateway returned an invalid response: {0}")]
    InvalidResponse(String),
}

impl AiAssistError {
    pub fn is_retryable(&self) -> bool {
        match self {
            AiAssistError::Timeout | AiAssistError::Network(_) => true,
            AiAssistError::Status { status, .. } => {
                matches!(status, 408 | 429) || (500..600).contains(status)
            }
            AiAssistError::NotConfigured(_) | AiAssistError::InvalidResponse(_) => false,
        }
    }
}

impl From<AiAssistError> for ApiError {
    fn from(err: AiAssistError) -> Self {
        match err {
            AiAssistError::NotConfigured(msg) => ApiError::Configuration(msg),
            other => ApiError::Upstream(other.to_string()),
        }
    }
}

/// A completed assist call
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    pub reply: String,
    pub model: String,
    pub tokens: u64,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    model: Option<String>,
    choices: Vec<ChatChoice>,
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    total_tokens: Option<u64>,
}

/// Rough token estimate used when the provider reports none
fn estimate_tokens(text: &str) -> u64 {
    (text.chars().count() as u64).div_ceil(4)
}

fn user_message(prompt: &str, context: Option<&str>) -> String {
    match context {
        Some(context) => format!("{prompt}\n\nContext:\n{context}"),
        None => prompt.to_string(),
    }
}

/// Proxy to the configured LLM provider
pub struct AiAssistant {
    config: AiAssistConfig,
    client: Client,
}

impl AiAssistant {
    pub fn new(config: AiAssistConfig) -> Result<Self, AiAssistError> {
        let client = Client::builder()
            .build()
            .map_err(|e| AiAssistError::NotConfigured(format!("HTTP client: {e}")))?;
        Ok(Self { config, client })
    }

    /// Answer a prompt with the configured provider
    pub async fn assist(
        &self,
        prompt: &str,
        context: Option<&str>,
    ) -> Result<Completion, AiAssistError> {
        info!(
            provider = %self.config.provider,
            prompt_chars = prompt.chars().count(),
            has_context = context.is_some(),
            "Generating AI assist reply"
        );

        match self.config.provider.as_str() {
            "mock" => Ok(self.mock_completion(prompt, context)),
            "openrouter" => self.openrouter_completion(prompt, context).await,
            DISABLED_PROVIDER => Err(AiAssistError::NotConfigured(
                "set AI_PROVIDER or OPENROUTER_API_KEY".to_string(),
            )),
            other => Err(AiAssistError::NotConfigured(format!(
                "unknown provider '{other}'"
            ))),
        }
    }

    fn mock_completion(&self, prompt: &str, context: Option<&str>) -> Completion {
        let topic: String = prompt.split_whitespace().take(8).collect::<Vec<_>>().join(" ");
        let reply = format!(
            "Suggested checks for \"{topic}\":\n\
             - Cover the happy path and the boundary values.\n\
             - Try empty, very long and malformed input.\n\
             - Verify error messages and logging for failures."
        );
        let tokens = estimate_tokens(&user_message(prompt, context)) + estimate_tokens(&reply);
        Completion {
            reply,
            model: "mock".to_string(),
            tokens,
        }
    }

    async fn openrouter_completion(
        &self,
        prompt: &str,
        context: Option<&str>,
    ) -> Result<Completion, AiAssistError> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or_else(|| AiAssistError::NotConfigured("OPENROUTER_API_KEY is not set".to_string()))?;

        let url = format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'));
        let body = json!({
            "model": self.config.model,
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                { "role": "user", "content": user_message(prompt, context) }
            ],
            "max_tokens": self.config.max_tokens,
            "temperature": 0.2
        });
        let timeout = Duration::from_millis(self.config.timeout_ms);

        let strategy = ExponentialBackoff::from_millis(2)
            .factor(self.config.retry_base_delay_ms / 2)
            .max_delay(MAX_BACKOFF)
            .map(jitter)
            .take(self.config.max_retries);

        let mut attempt = 0u32;
        let response = RetryIf::start(
            strategy,
            || {
                attempt += 1;
                let request = self
                    .client
                    .post(&url)
                    .bearer_auth(api_key)
                    .header("X-Title", "QA Toolsmith")
                    .json(&body);
                let current = attempt;
                async move {
                    let result = tokio::time::timeout(timeout, async {
                        let response = request
                            .send()
                            .await
                            .map_err(|e| AiAssistError::Network(e.to_string()))?;
                        let status = response.status();
                        if !status.is_success() {
                            let body = response.text().await.unwrap_or_default();
                            return Err(AiAssistError::Status {
                                status: status.as_u16(),
                                body,
                            });
                        }
                        response
                            .json::<ChatResponse>()
                            .await
                            .map_err(|e| AiAssistError::InvalidResponse(e.to_string()))
                    })
                    .await
                    .unwrap_or(Err(AiAssistError::Timeout));

                    if let Err(e) = &result {
                        warn!(attempt = current, error = %e, "AI gateway attempt failed");
                    }
                    result
                }
            },
            AiAssistError::is_retryable,
        )
        .await?;

        let reply = response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .ok_or_else(|| AiAssistError::InvalidResponse("no completion content".to_string()))?;

        let tokens = response
            .usage
            .and_then(|u| u.total_tokens)
            .unwrap_or_else(|| estimate_tokens(&user_message(prompt, context)) + estimate_tokens(&reply));

        Ok(Completion {
            reply,
            model: response.model.unwrap_or_else(|| self.config.model.clone()),
            tokens,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_provider() {
        let assistant = AiAssistant::new(AiAssistConfig::default()).unwrap();
        let completion = assistant
            .assist("How should I test a login form?", Some("Email and password fields"))
            .await
            .unwrap();
        assert_eq!(completion.model, "mock");
        assert!(completion.reply.contains("How should I test a login form?"));
        assert!(completion.tokens > 0);
    }

    #[tokio::test]
    async fn test_unconfigured_providers() {
        let assistant = AiAssistant::new(AiAssistConfig {
            provider: "openrouter".to_string(),
            api_key: None,
            ..AiAssistConfig::default()
        })
        .unwrap();
        let err = assistant.assist("hello", None).await.unwrap_err();
        assert!(matches!(err, AiAssistError::NotConfigured(_)));
        assert!(matches!(ApiError::from(err), ApiError::Configuration(_)));

        let assistant = AiAssistant::new(AiAssistConfig {
            provider: "disabled".to_string(),
            ..AiAssistConfig::default()
        })
        .unwrap();
        assert!(matches!(
            assistant.assist("hello", None).await,
            Err(AiAssistError::NotConfigured(_))
        ));
    }

    #[test]
    fn test_retryable_errors() {
        assert!(AiAssistError::Timeout.is_retryable());
        assert!(AiAssistError::Network("reset".into()).is_retryable());
        for status in [408, 429, 500, 503] {
            assert!(AiAssistError::Status { status, body: String::new() }.is_retryable());
        }
        for status in [400, 401, 404] {
            assert!(!AiAssistError::Status { status, body: String::new() }.is_retryable());
        }
        assert!(!AiAssistError::InvalidResponse("x".into()).is_retryable());
    }

    #[test]
    fn test_estimate_tokens() {
        assert_eq!(estimate_tokens(""), 0);
        assert_eq!(estimate_tokens("abcde"), 2);
    }
}
