//! Response Decoder: strips code fences from model output and parses JSON.
//!
//! No shape checks happen here; see `validation`.

use serde_json::Value;
use thiserror::Error;

const EXCERPT_CHARS: usize = 200;

#[derive(Debug, Error)]
#[error("model response is not valid JSON: {reason}")]
pub struct ResponseFormatError {
    pub reason: String,
    /// Leading slice of the raw text, for logs only.
    pub excerpt: String,
}

/// Trims, strips an optional code fence and parses the body as JSON.
pub fn decode(raw_text: &str) -> Result<Value, ResponseFormatError> {
    let body = strip_code_fence(raw_text);
    if body.is_empty() {
        return Err(ResponseFormatError {
            reason: "response is empty".to_string(),
            excerpt: excerpt(raw_text),
        });
    }

    serde_json::from_str(body).map_err(|e| ResponseFormatError {
        reason: e.to_string(),
        excerpt: excerpt(raw_text),
    })
}

/// Strips ```json ... ``` or ``` ... ``` code fences from model output.
/// Text after the closing fence is dropped.
pub fn strip_code_fence(text: &str) -> &str {
    let text = text.trim();
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };

    // A language tag may sit on the opening line.
    let rest = match rest.split_once('\n') {
        Some((tag, body)) if is_language_tag(tag) => body,
        _ => rest.trim_start_matches(|c: char| c.is_ascii_alphabetic()),
    };

    let body = match rest.rfind("```") {
        Some(end) => &rest[..end],
        None => rest,
    };
    body.trim()
}

fn is_language_tag(tag: &str) -> bool {
    tag.trim()
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '+'))
}

fn excerpt(text: &str) -> String {
    text.chars().take(EXCERPT_CHARS).collect()
}
