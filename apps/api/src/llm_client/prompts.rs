// Shared prompt constants used across structured tasks.
// Each task's own templates live in pipeline::prompts.

/// Leads every prompt that extracts facts from caller text.
pub const NO_INFERENCE_INSTRUCTION: &str = "\
    CRITICAL: Use ONLY information explicitly present in the provided text. \
    Do NOT infer, guess, or invent values. \
    If something is not mentioned, use null (or an empty list where a list is required).";

pub const PROBE_SYSTEM: &str = "You are a connectivity check. Reply with a short JSON object.";

pub const PROBE_PROMPT: &str = r#"Respond with exactly {"status": "ok"}"#;
