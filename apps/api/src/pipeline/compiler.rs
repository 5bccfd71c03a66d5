//! Prompt Compiler: builds the model prompt for a task.
//!
//! Compilation is pure: the same request always yields the same prompt text and
//! the same identity map. Candidates are listed only under opaque tokens; their
//! real record IDs never reach the model.

use crate::extraction::ExtractedText;
use crate::llm_client::prompts::NO_INFERENCE_INSTRUCTION;
use crate::pipeline::identity::IdentityMap;
use crate::pipeline::prompts::{
    BIAS_PROMPT_TEMPLATE, BIAS_SYSTEM, CONVERSATION_PROMPT_TEMPLATE, CONVERSATION_SYSTEM,
    RANKING_CANDIDATE_TEMPLATE, RANKING_COMMENTS_TEMPLATE, RANKING_PROMPT_TEMPLATE, RANKING_SYSTEM,
};
use crate::pipeline::TaskType;

/// Upper bound on ranked entries requested from the model.
pub const MAX_RANKED: usize = 5;

// Per-field character budgets.
const JOB_TITLE_BUDGET: usize = 200;
const JOB_DESCRIPTION_BUDGET: usize = 4_000;
const RESUME_BUDGET: usize = 3_000;
const COMMENTS_BUDGET: usize = 1_000;
const TRANSCRIPT_BUDGET: usize = 12_000;
const FEEDBACK_BUDGET: usize = 6_000;

const UNSPECIFIED_TITLE: &str = "Not specified";

#[derive(Debug, Clone, Copy)]
pub enum TaskRequest<'a> {
    RankCandidates {
        job_title: &'a str,
        job_description: &'a str,
        candidates: &'a [ExtractedText],
        comments: Option<&'a str>,
    },
    SummarizeConversation {
        transcript: &'a str,
    },
    DetectBias {
        feedback: &'a str,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledPrompt {
    pub response_schema: TaskType,
    pub system: &'static str,
    pub text: String,
    /// Empty for tasks that carry no candidates.
    pub identities: IdentityMap,
}

pub fn compile(request: &TaskRequest<'_>) -> CompiledPrompt {
    match *request {
        TaskRequest::RankCandidates {
            job_title,
            job_description,
            candidates,
            comments,
        } => compile_ranking(job_title, job_description, candidates, comments),

        TaskRequest::SummarizeConversation { transcript } => CompiledPrompt {
            response_schema: TaskType::SummarizeConversation,
            system: CONVERSATION_SYSTEM,
            text: render(
                CONVERSATION_PROMPT_TEMPLATE,
                &[
                    ("no_inference", NO_INFERENCE_INSTRUCTION),
                    ("transcript", truncate_chars(transcript, TRANSCRIPT_BUDGET)),
                ],
            ),
            identities: IdentityMap::default(),
        },

        TaskRequest::DetectBias { feedback } => CompiledPrompt {
            response_schema: TaskType::DetectBias,
            system: BIAS_SYSTEM,
            text: render(
                BIAS_PROMPT_TEMPLATE,
                &[
                    ("no_inference", NO_INFERENCE_INSTRUCTION),
                    ("feedback", truncate_chars(feedback, FEEDBACK_BUDGET)),
                ],
            ),
            identities: IdentityMap::default(),
        },
    }
}

fn compile_ranking(
    job_title: &str,
    job_description: &str,
    candidates: &[ExtractedText],
    comments: Option<&str>,
) -> CompiledPrompt {
    let mut identities = IdentityMap::default();
    let mut candidate_list = String::new();

    for candidate in candidates {
        let issued = identities.issue(&candidate.source_id, &candidate.display_name);
        candidate_list.push_str(&render(
            RANKING_CANDIDATE_TEMPLATE,
            &[
                ("opaque_id", issued.opaque_id.as_str()),
                ("display_name", issued.display_name.as_str()),
                ("resume_text", truncate_chars(&candidate.text, RESUME_BUDGET)),
            ],
        ));
        candidate_list.push('\n');
    }

    let (count_instruction, closing) = count_wording(candidates.len());
    let job_title = match truncate_chars(job_title, JOB_TITLE_BUDGET) {
        "" => UNSPECIFIED_TITLE,
        title => title,
    };

    let mut text = render(
        RANKING_PROMPT_TEMPLATE,
        &[
            ("job_title", job_title),
            ("job_description", truncate_chars(job_description, JOB_DESCRIPTION_BUDGET)),
            ("candidate_list", candidate_list.trim_end()),
            ("count_instruction", count_instruction.as_str()),
            ("closing", closing.as_str()),
        ],
    );

    if let Some(comments) = comments.map(|c| truncate_chars(c, COMMENTS_BUDGET)) {
        if !comments.is_empty() {
            text.push_str(&render(RANKING_COMMENTS_TEMPLATE, &[("comments", comments)]));
        }
    }

    CompiledPrompt {
        response_schema: TaskType::RankCandidates,
        system: RANKING_SYSTEM,
        text,
        identities,
    }
}

/// The model must return every candidate when there are few, else the top few.
fn count_wording(candidates: usize) -> (String, String) {
    if candidates <= MAX_RANKED {
        (
            format!("There are {candidates} candidates. Return ALL {candidates} of them, sorted by fit score."),
            format!("Return ALL {candidates} candidates."),
        )
    } else {
        (
            format!("There are {candidates} candidates. Return only the TOP {MAX_RANKED}."),
            format!("Return the top {MAX_RANKED} candidates."),
        )
    }
}

/// Trims and cuts `text` to at most `max_chars` characters, on a char boundary.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    let text = text.trim();
    match text.char_indices().nth(max_chars) {
        Some((byte_index, _)) => text[..byte_index].trim_end(),
        None => text,
    }
}

/// Replaces `{key}` placeholders in a single left-to-right pass. Substituted
/// values are copied verbatim and never scanned again; unknown `{...}`
/// sequences (such as JSON examples) are left as they are.
fn render(template: &str, vars: &[(&str, &str)]) -> String {
    let extra: usize = vars.iter().map(|(_, v)| v.len()).sum();
    let mut out = String::with_capacity(template.len() + extra);
    let mut rest = template;

    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        let substitution = after.find('}').and_then(|end| {
            let key = &after[..end];
            vars.iter()
                .find(|(name, _)| *name == key)
                .map(|(_, value)| (end, *value))
        });

        match substitution {
            Some((end, value)) => {
                out.push_str(value);
                rest = &after[end + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}
