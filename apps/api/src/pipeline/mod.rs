// Structured-task pipeline.
// Flow: [extract] → compile → invoke → decode → validate → [correlate] → result.
// All model calls go through llm_client::ModelGateway.

use std::fmt;

use serde::{Deserialize, Serialize};

pub mod compiler;
pub mod decoder;
pub mod handlers;
pub mod identity;
pub mod models;
pub mod orchestrator;
pub mod prompts;
pub mod validation;

/// The three structured tasks this service supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskType {
    RankCandidates,
    SummarizeConversation,
    DetectBias,
}

impl TaskType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskType::RankCandidates => "RANK_CANDIDATES",
            TaskType::SummarizeConversation => "SUMMARIZE_CONVERSATION",
            TaskType::DetectBias => "DETECT_BIAS",
        }
    }
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
