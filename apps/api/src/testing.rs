// Test doubles shared by unit tests across modules.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;

use crate::extraction::{finalize_text, DocumentRef, ExtractedText, ExtractionError, TextExtractor};
use crate::llm_client::{LlmProvider, ProviderError};

/// Provider that plays back scripted outcomes in order. Once the script runs
/// out, the last outcome repeats.
pub struct ScriptedProvider {
    id: String,
    script: Mutex<VecDeque<Result<String, ProviderError>>>,
    last: Mutex<Option<Result<String, ProviderError>>>,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl ScriptedProvider {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            script: Mutex::new(VecDeque::new()),
            last: Mutex::new(None),
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn reply(self, text: &str) -> Self {
        self.push(Ok(text.to_string()))
    }

    pub fn fail(self, error: ProviderError) -> Self {
        self.push(Err(error))
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn push(self, outcome: Result<String, ProviderError>) -> Self {
        self.script.lock().unwrap().push_back(outcome);
        self
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    fn id(&self) -> &str {
        &self.id
    }

    async fn complete(&self, _system: &str, _prompt: &str) -> Result<String, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let next = self.script.lock().unwrap().pop_front();
        let mut last = self.last.lock().unwrap();
        match next {
            Some(outcome) => {
                *last = Some(outcome.clone());
                outcome
            }
            None => last
                .clone()
                .unwrap_or_else(|| Err(ProviderError::Unknown("script is empty".to_string()))),
        }
    }
}

/// Treats document bytes as UTF-8 text. Bytes starting with `CORRUPT` fail to parse.
pub struct Utf8Extractor;

#[async_trait]
impl TextExtractor for Utf8Extractor {
    async fn extract(&self, document: &DocumentRef) -> Result<ExtractedText, ExtractionError> {
        if document.bytes.starts_with(b"CORRUPT") {
            return Err(ExtractionError::Corrupt("unreadable test document".to_string()));
        }
        let text = std::str::from_utf8(&document.bytes)
            .map_err(|e| ExtractionError::Corrupt(e.to_string()))?;
        finalize_text(document, text)
    }
}

pub fn document(source_id: &str, file_name: &str, text: &str) -> DocumentRef {
    DocumentRef {
        source_id: source_id.to_string(),
        file_name: file_name.to_string(),
        candidate_name: None,
        bytes: Bytes::from(text.to_string()),
    }
}
