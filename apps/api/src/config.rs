use std::time::Duration;

use anyhow::{bail, Context, Result};

use crate::llm_client::{ProviderConfig, ProviderKind, DEFAULT_PROVIDER_TIMEOUT};

const DEFAULT_PROVIDER_ORDER: &str = "openrouter,gemini";
const DEFAULT_MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

/// Application configuration loaded from environment variables.
/// Startup fails if a listed provider has no API key.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub rust_log: String,
    /// Providers in preference order.
    pub providers: Vec<ProviderConfig>,
    pub provider_timeout: Duration,
    pub max_upload_bytes: usize,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let order = std::env::var("LLM_PROVIDERS").unwrap_or_else(|_| DEFAULT_PROVIDER_ORDER.to_string());
        // Sent to providers that use it for attribution (OpenRouter).
        let referer = std::env::var("APP_BASE_URL").ok();

        let providers = parse_provider_order(&order)?
            .into_iter()
            .map(|kind| provider_from_env(kind, referer.clone()))
            .collect::<Result<Vec<_>>>()?;

        Ok(Config {
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            providers,
            provider_timeout: match std::env::var("LLM_PROVIDER_TIMEOUT_SECS") {
                Ok(secs) => Duration::from_secs(
                    secs.parse::<u64>()
                        .context("LLM_PROVIDER_TIMEOUT_SECS must be a whole number of seconds")?,
                ),
                Err(_) => DEFAULT_PROVIDER_TIMEOUT,
            },
            max_upload_bytes: match std::env::var("MAX_UPLOAD_BYTES") {
                Ok(bytes) => bytes
                    .parse::<usize>()
                    .context("MAX_UPLOAD_BYTES must be a byte count")?,
                Err(_) => DEFAULT_MAX_UPLOAD_BYTES,
            },
        })
    }
}

/// Parses a comma-separated provider list, e.g. `openrouter,gemini`.
/// Order is preserved; repeats are rejected.
pub fn parse_provider_order(value: &str) -> Result<Vec<ProviderKind>> {
    let mut kinds = Vec::new();
    for name in value.split(',').map(str::trim).filter(|n| !n.is_empty()) {
        let kind = ProviderKind::parse(name)
            .with_context(|| format!("Unknown provider '{name}' in LLM_PROVIDERS"))?;
        if kinds.contains(&kind) {
            bail!("Provider '{name}' is listed twice in LLM_PROVIDERS");
        }
        kinds.push(kind);
    }
    if kinds.is_empty() {
        bail!("LLM_PROVIDERS must name at least one provider");
    }
    Ok(kinds)
}

fn provider_from_env(kind: ProviderKind, referer: Option<String>) -> Result<ProviderConfig> {
    let prefix = kind.env_prefix();
    Ok(ProviderConfig {
        kind,
        endpoint: std::env::var(format!("{prefix}_BASE_URL"))
            .unwrap_or_else(|_| kind.default_endpoint().to_string()),
        api_key: require_env(&format!("{prefix}_API_KEY"))?,
        model: std::env::var(format!("{prefix}_MODEL"))
            .unwrap_or_else(|_| kind.default_model().to_string()),
        referer,
    })
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}
