use axum::{
    extract::{multipart::MultipartError, Multipart, Path, State},
    Json,
};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::errors::AppError;
use crate::extraction::{DocumentRef, ExtractionErrorKind, ExtractionFailure};
use crate::llm_client::{ProviderErrorKind, ProviderResponse};
use crate::pipeline::models::{BiasFlag, ConversationExtraction, RankingEntry};
use crate::state::AppState;

const RESUME_FIELD: &str = "resume";

#[derive(Serialize)]
pub struct ResumeMatchResponse {
    pub top_candidates: Vec<RankingEntry>,
    pub skipped_documents: Vec<SkippedDocument>,
    /// Entries dropped because the model echoed an identifier it was never given.
    pub dropped_entries: usize,
    pub provider: String,
}

/// A document left out of ranking. Parser detail stays in the logs.
#[derive(Serialize)]
pub struct SkippedDocument {
    pub source_id: String,
    pub file_name: String,
    pub kind: ExtractionErrorKind,
}

impl From<ExtractionFailure> for SkippedDocument {
    fn from(failure: ExtractionFailure) -> Self {
        Self {
            kind: failure.error.kind(),
            source_id: failure.source_id,
            file_name: failure.file_name,
        }
    }
}

#[derive(Deserialize)]
pub struct SummarizeChatRequest {
    pub transcript: String,
}

#[derive(Serialize)]
pub struct SummarizeChatResponse {
    pub candidate_id: String,
    #[serde(flatten)]
    pub summary: ConversationExtraction,
}

#[derive(Deserialize)]
pub struct BiasCheckRequest {
    pub feedback: String,
}

#[derive(Serialize)]
pub struct BiasCheckResponse {
    pub interview_id: String,
    pub flags: Vec<BiasFlag>,
}

#[derive(Serialize)]
pub struct ProbeResponse {
    pub providers: Vec<ProviderProbe>,
}

/// Probe result for one provider. Provider error text is logged, not returned.
#[derive(Serialize)]
pub struct ProviderProbe {
    pub provider_id: String,
    pub ok: bool,
    pub latency_ms: u64,
    pub kind: Option<ProviderErrorKind>,
}

impl From<ProviderResponse> for ProviderProbe {
    fn from(response: ProviderResponse) -> Self {
        Self {
            ok: response.error.is_none(),
            latency_ms: response.latency.as_millis() as u64,
            kind: response.error.as_ref().map(|e| e.kind()),
            provider_id: response.provider_id,
        }
    }
}

/// Parsed `resume_match` form.
#[derive(Debug, Default)]
struct ResumeMatchForm {
    job_title: String,
    job_description: String,
    comments: Option<String>,
    resumes: Vec<DocumentRef>,
}

/// POST /api/v1/resume_match
/// Multipart: `job_title`, `job_description`, optional `comments`, one or more `resume` files.
pub async fn handle_resume_match(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<ResumeMatchResponse>, AppError> {
    let form = read_resume_match_form(multipart).await?;

    require_text("job_description", &form.job_description)?;
    if form.resumes.is_empty() {
        return Err(AppError::Validation(format!(
            "At least one '{RESUME_FIELD}' file is required"
        )));
    }
    info!("Resume match requested for {} documents", form.resumes.len());

    let outcome = state
        .pipeline
        .rank_candidates(
            &form.job_title,
            &form.job_description,
            &form.resumes,
            form.comments.as_deref(),
        )
        .await?;

    Ok(Json(ResumeMatchResponse {
        top_candidates: outcome.entries,
        skipped_documents: outcome
            .skipped_documents
            .into_iter()
            .map(SkippedDocument::from)
            .collect(),
        dropped_entries: outcome.identity_mismatches.len(),
        provider: outcome.provider_id,
    }))
}

/// POST /api/v1/candidates/:id/summarize_chat
pub async fn handle_summarize_chat(
    State(state): State<AppState>,
    Path(candidate_id): Path<String>,
    Json(req): Json<SummarizeChatRequest>,
) -> Result<Json<SummarizeChatResponse>, AppError> {
    require_text("transcript", &req.transcript)?;
    let summary = state.pipeline.summarize_conversation(&req.transcript).await?;
    Ok(Json(SummarizeChatResponse {
        candidate_id,
        summary,
    }))
}

/// POST /api/v1/interviews/:id/bias_check
pub async fn handle_bias_check(
    State(state): State<AppState>,
    Path(interview_id): Path<String>,
    Json(req): Json<BiasCheckRequest>,
) -> Result<Json<BiasCheckResponse>, AppError> {
    require_text("feedback", &req.feedback)?;
    let flags = state.pipeline.detect_bias(&req.feedback).await?;
    Ok(Json(BiasCheckResponse {
        interview_id,
        flags,
    }))
}

/// POST /api/v1/ai/probe
pub async fn handle_probe(State(state): State<AppState>) -> Json<ProbeResponse> {
    let providers = state.pipeline.probe_providers().await;
    Json(ProbeResponse {
        providers: providers.into_iter().map(ProviderProbe::from).collect(),
    })
}

fn require_text(field: &str, value: &str) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::Validation(format!("'{field}' must not be blank")));
    }
    Ok(())
}

async fn read_resume_match_form(mut multipart: Multipart) -> Result<ResumeMatchForm, AppError> {
    let mut form = ResumeMatchForm::default();

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "job_title" => form.job_title = field.text().await.map_err(multipart_error)?,
            "job_description" => form.job_description = field.text().await.map_err(multipart_error)?,
            "comments" => {
                let comments = field.text().await.map_err(multipart_error)?;
                form.comments = Some(comments).filter(|c| !c.trim().is_empty());
            }
            RESUME_FIELD => {
                let ordinal = form.resumes.len() + 1;
                let file_name = field
                    .file_name()
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("resume_{ordinal}.pdf"));
                let bytes: Bytes = field.bytes().await.map_err(multipart_error)?;
                form.resumes.push(DocumentRef {
                    source_id: format!("file_{ordinal}"),
                    file_name,
                    candidate_name: None,
                    bytes,
                });
            }
            other => info!("Ignoring unexpected form field '{other}'"),
        }
    }

    Ok(form)
}

fn multipart_error(e: MultipartError) -> AppError {
    AppError::Validation(format!("Invalid multipart body: {}", e.body_text()))
}
