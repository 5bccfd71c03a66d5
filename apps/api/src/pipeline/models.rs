use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A ranked candidate as the model returned it. `opaque_id` is the per-request
/// token issued by the compiler, not a real record ID.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedCandidate {
    #[serde(rename = "candidate_id")]
    pub opaque_id: String,
    pub candidate_name: String,
    pub fit_score: u8,
    pub strengths: Vec<String>,
    pub concerns: Vec<String>,
    pub technical_skills: Vec<String>,
    pub reasoning: String,
}

/// Validated ranking response, same shape the model is asked to return.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankingPayload {
    pub top_candidates: Vec<RankedCandidate>,
}

/// A ranked candidate carrying the caller's real identity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankingEntry {
    pub candidate_id: String,
    pub candidate_name: String,
    /// 1–10
    pub fit_score: u8,
    pub strengths: Vec<String>,
    pub concerns: Vec<String>,
    pub technical_skills: Vec<String>,
    pub reasoning: String,
}

/// Facts pulled from a recruiter/candidate conversation. `None` means the
/// conversation did not mention it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConversationExtraction {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub min_salary: Option<f64>,
    pub max_salary: Option<f64>,
    /// 1–5
    pub interest_level: Option<u8>,
    pub summary_text: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BiasFlag {
    pub term: String,
    pub justification: String,
}

/// An empty `flags` list means no bias was found.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BiasReport {
    pub flags: Vec<BiasFlag>,
}
