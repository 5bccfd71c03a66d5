//! OpenAI-compatible chat-completions adapter (OpenRouter, OpenAI).

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::llm_client::{
    LlmProvider, ProviderConfig, ProviderError, ProviderKind, MAX_OUTPUT_TOKENS, TEMPERATURE,
};

pub const OPENROUTER_ENDPOINT: &str = "https://openrouter.ai/api/v1/chat/completions";
pub const OPENROUTER_DEFAULT_MODEL: &str = "google/gemini-2.0-flash-exp:free";
pub const OPENAI_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";
pub const OPENAI_DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Sent as `X-Title` to OpenRouter for request attribution.
const APP_TITLE: &str = "KazeHire AI - Resume Matching System";

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

impl ChatResponse {
    fn into_text(self) -> Option<String> {
        self.choices.into_iter().next().and_then(|c| c.message.content)
    }
}

#[derive(Debug, Deserialize)]
struct ChatError {
    error: ChatErrorBody,
}

#[derive(Debug, Deserialize)]
struct ChatErrorBody {
    message: String,
}

pub struct OpenAiCompatProvider {
    id: &'static str,
    client: Client,
    endpoint: String,
    api_key: String,
    model: String,
    attribution: Option<(String, &'static str)>,
}

impl OpenAiCompatProvider {
    pub fn new(config: &ProviderConfig, timeout: Duration) -> reqwest::Result<Self> {
        let attribution = match config.kind {
            ProviderKind::OpenRouter => Some((
                config
                    .referer
                    .clone()
                    .unwrap_or_else(|| "http://localhost:8080".to_string()),
                APP_TITLE,
            )),
            _ => None,
        };
        Ok(Self {
            id: config.kind.id(),
            client: Client::builder().timeout(timeout).build()?,
            endpoint: config.endpoint.clone(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            attribution,
        })
    }
}

#[async_trait]
impl LlmProvider for OpenAiCompatProvider {
    fn id(&self) -> &str {
        self.id
    }

    async fn complete(&self, system: &str, prompt: &str) -> Result<String, ProviderError> {
        let request_body = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            temperature: TEMPERATURE,
            max_tokens: MAX_OUTPUT_TOKENS,
        };

        let mut request = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request_body);
        if let Some((referer, title)) = &self.attribution {
            request = request.header("HTTP-Referer", referer).header("X-Title", *title);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ChatError>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(ProviderError::from_status(status, message));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Unknown(format!("unreadable response envelope: {e}")))?;

        debug!("{} chat completion received", self.id);

        parsed
            .into_text()
            .ok_or_else(|| ProviderError::Unknown("no content in first choice".to_string()))
    }
}
