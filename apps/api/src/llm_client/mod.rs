//! Model Gateway: the single point of entry for all generative-model calls.
//!
//! ARCHITECTURAL RULE: No other module may call a provider API directly.
//! All model interactions MUST go through `ModelGateway`.
//!
//! Providers are tried strictly in the configured order. A rejected credential
//! stops the walk; rate limits, server failures and unclassified failures fall
//! through to the next provider. Retry/backoff policy belongs to the caller.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, error, info, warn};

pub mod anthropic;
pub mod gemini;
pub mod openai_compat;
pub mod prompts;

use crate::llm_client::prompts::{PROBE_PROMPT, PROBE_SYSTEM};

/// Sampling temperature sent to every provider.
pub const TEMPERATURE: f32 = 0.1;
/// Output token ceiling sent to every provider.
pub const MAX_OUTPUT_TOKENS: u32 = 2000;
pub const DEFAULT_PROVIDER_TIMEOUT: Duration = Duration::from_secs(60);

/// Classified reason a single provider attempt failed. The message carries the
/// provider's own error text and is for logs only.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    #[error("authentication rejected: {0}")]
    Auth(String),

    #[error("rate limited: {0}")]
    RateLimited(String),

    #[error("provider server error: {0}")]
    Server(String),

    #[error("unclassified provider error: {0}")]
    Unknown(String),
}

/// The classification of a `ProviderError`, without its message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProviderErrorKind {
    Auth,
    RateLimited,
    Server,
    Unknown,
}

impl ProviderError {
    pub fn kind(&self) -> ProviderErrorKind {
        match self {
            ProviderError::Auth(_) => ProviderErrorKind::Auth,
            ProviderError::RateLimited(_) => ProviderErrorKind::RateLimited,
            ProviderError::Server(_) => ProviderErrorKind::Server,
            ProviderError::Unknown(_) => ProviderErrorKind::Unknown,
        }
    }

    /// Classifies a non-success HTTP status returned by a provider.
    pub fn from_status(status: reqwest::StatusCode, message: String) -> Self {
        match status.as_u16() {
            401 | 403 => ProviderError::Auth(format!("{status}: {message}")),
            429 => ProviderError::RateLimited(format!("{status}: {message}")),
            _ if status.is_server_error() => ProviderError::Server(format!("{status}: {message}")),
            _ => ProviderError::Unknown(format!("{status}: {message}")),
        }
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() || e.is_connect() || e.is_request() {
            ProviderError::Server(e.to_string())
        } else if let Some(status) = e.status() {
            ProviderError::from_status(status, e.to_string())
        } else {
            ProviderError::Unknown(e.to_string())
        }
    }
}

/// One attempt against one provider. Successful attempts carry the provider's
/// text already unwrapped from its response envelope.
#[derive(Debug, Clone)]
pub struct ProviderResponse {
    pub provider_id: String,
    pub raw_text: String,
    pub latency: Duration,
    pub error: Option<ProviderError>,
}

impl ProviderResponse {
    fn succeeded(provider_id: &str, raw_text: String, latency: Duration) -> Self {
        Self {
            provider_id: provider_id.to_string(),
            raw_text,
            latency,
            error: None,
        }
    }

    fn failed(provider_id: &str, error: ProviderError, latency: Duration) -> Self {
        Self {
            provider_id: provider_id.to_string(),
            raw_text: String::new(),
            latency,
            error: Some(error),
        }
    }
}

/// A successful gateway call plus every attempt that failed before it.
#[derive(Debug, Clone)]
pub struct Completion {
    pub response: ProviderResponse,
    pub failed_attempts: Vec<ProviderResponse>,
}

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("provider '{provider}' rejected its credentials: {message}")]
    Auth {
        provider: String,
        message: String,
        attempts: Vec<ProviderResponse>,
    },

    #[error("all providers failed ({} attempts)", .attempts.len())]
    AllProvidersFailed { attempts: Vec<ProviderResponse> },
}

impl GatewayError {
    pub fn attempts(&self) -> &[ProviderResponse] {
        match self {
            GatewayError::Auth { attempts, .. } => attempts,
            GatewayError::AllProvidersFailed { attempts } => attempts,
        }
    }
}

/// A generative-text backend. Implementations own their wire format and must
/// return plain text, or a classified `ProviderError`.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    fn id(&self) -> &str;

    async fn complete(&self, system: &str, prompt: &str) -> Result<String, ProviderError>;
}

/// Known provider backends, selectable by name in configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    OpenRouter,
    Gemini,
    Anthropic,
    OpenAi,
}

impl ProviderKind {
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "openrouter" => Some(Self::OpenRouter),
            "gemini" => Some(Self::Gemini),
            "anthropic" => Some(Self::Anthropic),
            "openai" => Some(Self::OpenAi),
            _ => None,
        }
    }

    pub fn id(&self) -> &'static str {
        match self {
            Self::OpenRouter => "openrouter",
            Self::Gemini => "gemini",
            Self::Anthropic => "anthropic",
            Self::OpenAi => "openai",
        }
    }

    /// Prefix of the `<PREFIX>_API_KEY` / `_BASE_URL` / `_MODEL` variables.
    pub fn env_prefix(&self) -> &'static str {
        match self {
            Self::OpenRouter => "OPENROUTER",
            Self::Gemini => "GEMINI",
            Self::Anthropic => "ANTHROPIC",
            Self::OpenAi => "OPENAI",
        }
    }

    pub fn default_endpoint(&self) -> &'static str {
        match self {
            Self::OpenRouter => openai_compat::OPENROUTER_ENDPOINT,
            Self::Gemini => gemini::DEFAULT_ENDPOINT,
            Self::Anthropic => anthropic::DEFAULT_ENDPOINT,
            Self::OpenAi => openai_compat::OPENAI_ENDPOINT,
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            Self::OpenRouter => openai_compat::OPENROUTER_DEFAULT_MODEL,
            Self::Gemini => gemini::DEFAULT_MODEL,
            Self::Anthropic => anthropic::DEFAULT_MODEL,
            Self::OpenAi => openai_compat::OPENAI_DEFAULT_MODEL,
        }
    }
}

/// Opaque per-provider wiring handed to the gateway at construction.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub kind: ProviderKind,
    pub endpoint: String,
    pub api_key: String,
    pub model: String,
    /// Sent as `HTTP-Referer` where the provider uses it for attribution.
    pub referer: Option<String>,
}

/// Ordered provider list plus the per-attempt deadline.
#[derive(Clone)]
pub struct ModelGateway {
    providers: Vec<Arc<dyn LlmProvider>>,
    timeout: Duration,
}

impl ModelGateway {
    pub fn new(providers: Vec<Arc<dyn LlmProvider>>) -> Self {
        Self {
            providers,
            timeout: DEFAULT_PROVIDER_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Builds one HTTP adapter per config entry, preserving order.
    pub fn from_configs(configs: &[ProviderConfig], timeout: Duration) -> reqwest::Result<Self> {
        let mut providers: Vec<Arc<dyn LlmProvider>> = Vec::with_capacity(configs.len());
        for config in configs {
            let provider: Arc<dyn LlmProvider> = match config.kind {
                ProviderKind::OpenRouter | ProviderKind::OpenAi => {
                    Arc::new(openai_compat::OpenAiCompatProvider::new(config, timeout)?)
                }
                ProviderKind::Gemini => Arc::new(gemini::GeminiProvider::new(config, timeout)?),
                ProviderKind::Anthropic => {
                    Arc::new(anthropic::AnthropicProvider::new(config, timeout)?)
                }
            };
            providers.push(provider);
        }
        Ok(Self::new(providers).with_timeout(timeout))
    }

    pub fn provider_ids(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.id()).collect()
    }

    /// Sends the prompt to each provider in order until one returns text.
    pub async fn invoke(&self, system: &str, prompt: &str) -> Result<Completion, GatewayError> {
        let mut failed_attempts = Vec::with_capacity(self.providers.len());

        for provider in &self.providers {
            let response = self.attempt(provider.as_ref(), system, prompt).await;

            let Some(error) = response.error.clone() else {
                debug!(
                    "Provider '{}' answered in {}ms ({} chars)",
                    response.provider_id,
                    response.latency.as_millis(),
                    response.raw_text.len()
                );
                return Ok(Completion {
                    response,
                    failed_attempts,
                });
            };

            match &error {
                ProviderError::Auth(message) => {
                    error!("Provider '{}' rejected credentials: {message}", provider.id());
                    let provider_id = provider.id().to_string();
                    failed_attempts.push(response);
                    return Err(GatewayError::Auth {
                        provider: provider_id,
                        message: message.clone(),
                        attempts: failed_attempts,
                    });
                }
                ProviderError::RateLimited(message) => {
                    warn!("Provider '{}' rate limited, trying next: {message}", provider.id());
                }
                ProviderError::Server(message) => {
                    warn!("Provider '{}' failed, trying next: {message}", provider.id());
                }
                ProviderError::Unknown(message) => {
                    error!(
                        "Provider '{}' failed with UNCLASSIFIED error, trying next: {message}",
                        provider.id()
                    );
                }
            }
            failed_attempts.push(response);
        }

        Err(GatewayError::AllProvidersFailed {
            attempts: failed_attempts,
        })
    }

    /// Sends a fixed tiny prompt to every provider independently, without fallback.
    pub async fn probe(&self) -> Vec<ProviderResponse> {
        let mut results = Vec::with_capacity(self.providers.len());
        for provider in &self.providers {
            let response = self
                .attempt(provider.as_ref(), PROBE_SYSTEM, PROBE_PROMPT)
                .await;
            match &response.error {
                None => info!("Probe: provider '{}' reachable", response.provider_id),
                Some(e) => warn!("Probe: provider '{}' failed: {e}", response.provider_id),
            }
            results.push(response);
        }
        results
    }

    async fn attempt(&self, provider: &dyn LlmProvider, system: &str, prompt: &str) -> ProviderResponse {
        let started = Instant::now();
        let outcome = match tokio::time::timeout(self.timeout, provider.complete(system, prompt)).await {
            Ok(outcome) => outcome,
            Err(_) => Err(ProviderError::Server(format!(
                "no response within {}s",
                self.timeout.as_secs()
            ))),
        };
        let latency = started.elapsed();

        match outcome {
            Ok(text) if text.trim().is_empty() => ProviderResponse::failed(
                provider.id(),
                ProviderError::Unknown("provider returned empty text".to_string()),
                latency,
            ),
            Ok(text) => ProviderResponse::succeeded(provider.id(), text, latency),
            Err(e) => ProviderResponse::failed(provider.id(), e, latency),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedProvider;

    fn gateway(providers: &[&Arc<ScriptedProvider>]) -> ModelGateway {
        ModelGateway::new(
            providers
                .iter()
                .map(|p| Arc::clone(p) as Arc<dyn LlmProvider>)
                .collect(),
        )
    }

    #[tokio::test]
    async fn test_first_provider_success_skips_the_rest() {
        let primary = Arc::new(ScriptedProvider::new("primary").reply("{}"));
        let secondary = Arc::new(ScriptedProvider::new("secondary").reply("{}"));

        let completion = gateway(&[&primary, &secondary])
            .invoke("system", "prompt")
            .await
            .unwrap();

        assert_eq!(completion.response.provider_id, "primary");
        assert!(completion.failed_attempts.is_empty());
        assert_eq!(secondary.calls(), 0);
    }

    #[tokio::test]
    async fn test_rate_limited_primary_falls_back_transparently() {
        let primary = Arc::new(
            ScriptedProvider::new("primary").fail(ProviderError::RateLimited("429".to_string())),
        );
        let secondary = Arc::new(ScriptedProvider::new("secondary").reply("{\"ok\":true}"));

        let completion = gateway(&[&primary, &secondary])
            .invoke("system", "prompt")
            .await
            .unwrap();

        assert_eq!(completion.response.provider_id, "secondary");
        assert_eq!(completion.response.raw_text, "{\"ok\":true}");
        assert_eq!(completion.failed_attempts.len(), 1);
        assert_eq!(primary.calls(), 1);
    }

    #[tokio::test]
    async fn test_server_and_unknown_errors_fall_back() {
        let first = Arc::new(
            ScriptedProvider::new("first").fail(ProviderError::Server("503".to_string())),
        );
        let second = Arc::new(
            ScriptedProvider::new("second").fail(ProviderError::Unknown("weird".to_string())),
        );
        let third = Arc::new(ScriptedProvider::new("third").reply("text"));

        let completion = gateway(&[&first, &second, &third])
            .invoke("system", "prompt")
            .await
            .unwrap();

        assert_eq!(completion.response.provider_id, "third");
        assert_eq!(completion.failed_attempts.len(), 2);
    }

    #[tokio::test]
    async fn test_auth_error_is_fatal_and_stops_fallback() {
        let primary = Arc::new(
            ScriptedProvider::new("primary").fail(ProviderError::Auth("401".to_string())),
        );
        let secondary = Arc::new(ScriptedProvider::new("secondary").reply("{}"));

        let err = gateway(&[&primary, &secondary])
            .invoke("system", "prompt")
            .await
            .unwrap_err();

        assert!(matches!(err, GatewayError::Auth { ref provider, .. } if provider == "primary"));
        assert_eq!(err.attempts().len(), 1);
        assert_eq!(secondary.calls(), 0);
    }

    #[tokio::test]
    async fn test_all_providers_failed_carries_every_attempt() {
        let first = Arc::new(
            ScriptedProvider::new("first").fail(ProviderError::RateLimited("429".to_string())),
        );
        let second = Arc::new(
            ScriptedProvider::new("second").fail(ProviderError::Server("502".to_string())),
        );

        let err = gateway(&[&first, &second])
            .invoke("system", "prompt")
            .await
            .unwrap_err();

        let GatewayError::AllProvidersFailed { attempts } = err else {
            panic!("expected AllProvidersFailed");
        };
        assert_eq!(attempts.len(), 2);
        assert_eq!(attempts[0].provider_id, "first");
        assert!(matches!(attempts[1].error, Some(ProviderError::Server(_))));
    }

    #[tokio::test]
    async fn test_no_providers_fails_with_no_attempts() {
        let err = ModelGateway::new(vec![])
            .invoke("system", "prompt")
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::AllProvidersFailed { ref attempts } if attempts.is_empty()));
    }

    #[tokio::test]
    async fn test_blank_text_counts_as_unknown_failure() {
        let primary = Arc::new(ScriptedProvider::new("primary").reply("   "));
        let secondary = Arc::new(ScriptedProvider::new("secondary").reply("{}"));

        let completion = gateway(&[&primary, &secondary])
            .invoke("system", "prompt")
            .await
            .unwrap();

        assert_eq!(completion.response.provider_id, "secondary");
        assert!(matches!(
            completion.failed_attempts[0].error,
            Some(ProviderError::Unknown(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_is_classified_as_server_error() {
        let slow = Arc::new(
            ScriptedProvider::new("slow")
                .reply("late")
                .with_delay(Duration::from_secs(300)),
        );
        let fast = Arc::new(ScriptedProvider::new("fast").reply("{}"));

        let completion = gateway(&[&slow, &fast])
            .with_timeout(Duration::from_secs(5))
            .invoke("system", "prompt")
            .await
            .unwrap();

        assert_eq!(completion.response.provider_id, "fast");
        assert!(matches!(
            completion.failed_attempts[0].error,
            Some(ProviderError::Server(_))
        ));
    }

    #[tokio::test]
    async fn test_probe_reports_each_provider_without_fallback() {
        let down = Arc::new(
            ScriptedProvider::new("down").fail(ProviderError::Auth("bad key".to_string())),
        );
        let up = Arc::new(ScriptedProvider::new("up").reply("pong"));

        let results = gateway(&[&down, &up]).probe().await;

        assert_eq!(results.len(), 2);
        assert!(matches!(results[0].error, Some(ProviderError::Auth(_))));
        assert!(results[1].error.is_none());
        assert_eq!(up.calls(), 1);
    }

    #[test]
    fn test_status_classification() {
        use reqwest::StatusCode;
        assert!(matches!(
            ProviderError::from_status(StatusCode::UNAUTHORIZED, String::new()),
            ProviderError::Auth(_)
        ));
        assert!(matches!(
            ProviderError::from_status(StatusCode::FORBIDDEN, String::new()),
            ProviderError::Auth(_)
        ));
        assert!(matches!(
            ProviderError::from_status(StatusCode::TOO_MANY_REQUESTS, String::new()),
            ProviderError::RateLimited(_)
        ));
        assert!(matches!(
            ProviderError::from_status(StatusCode::BAD_GATEWAY, String::new()),
            ProviderError::Server(_)
        ));
        assert!(matches!(
            ProviderError::from_status(StatusCode::BAD_REQUEST, String::new()),
            ProviderError::Unknown(_)
        ));
    }

    #[test]
    fn test_provider_kind_parse() {
        assert_eq!(ProviderKind::parse("OpenRouter"), Some(ProviderKind::OpenRouter));
        assert_eq!(ProviderKind::parse(" gemini "), Some(ProviderKind::Gemini));
        assert_eq!(ProviderKind::parse("anthropic"), Some(ProviderKind::Anthropic));
        assert_eq!(ProviderKind::parse("cohere"), None);
    }

    #[test]
    fn test_provider_error_kind_drops_message() {
        let error = ProviderError::RateLimited("429: slow down".to_string());
        assert_eq!(error.kind(), ProviderErrorKind::RateLimited);
        assert_eq!(serde_json::to_value(error.kind()).unwrap(), "RATE_LIMITED");
    }
}
