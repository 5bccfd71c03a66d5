//! Task Orchestrators: one entry point per structured task.
//!
//! Each run is self-contained: it compiles its own prompt, owns its own
//! identity map and makes its own provider calls. Nothing is cached between
//! runs and nothing is persisted here.

use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::extraction::{
    extract_many, DocumentRef, ExtractionFailure, NoUsableDocuments, TextExtractor,
};
use crate::llm_client::{GatewayError, ModelGateway, ProviderResponse};
use crate::pipeline::compiler::{compile, CompiledPrompt, TaskRequest, MAX_RANKED};
use crate::pipeline::decoder::{decode, ResponseFormatError};
use crate::pipeline::identity::{correlate, IdentityMismatch};
use crate::pipeline::models::{
    BiasFlag, BiasReport, ConversationExtraction, RankingEntry, RankingPayload,
};
use crate::pipeline::validation::{validate, SchemaValidationError, TaskSchema};
use crate::pipeline::TaskType;

/// Classified terminal failure of one task. The boundary layer maps each kind
/// to a stable status and message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FailureKind {
    NoUsableDocuments,
    ProviderAuth,
    AllProvidersFailed,
    ResponseFormat,
    SchemaValidation,
}

#[derive(Debug, Error)]
pub enum TaskError {
    #[error(transparent)]
    NoUsableDocuments(#[from] NoUsableDocuments),

    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error(transparent)]
    ResponseFormat(#[from] ResponseFormatError),

    #[error(transparent)]
    SchemaValidation(#[from] SchemaValidationError),
}

impl TaskError {
    pub fn kind(&self) -> FailureKind {
        match self {
            TaskError::NoUsableDocuments(_) => FailureKind::NoUsableDocuments,
            TaskError::Gateway(GatewayError::Auth { .. }) => FailureKind::ProviderAuth,
            TaskError::Gateway(GatewayError::AllProvidersFailed { .. }) => {
                FailureKind::AllProvidersFailed
            }
            TaskError::ResponseFormat(_) => FailureKind::ResponseFormat,
            TaskError::SchemaValidation(_) => FailureKind::SchemaValidation,
        }
    }

    /// Short internal diagnostic for logs. Never shown to end users.
    pub fn diagnostic(&self) -> String {
        match self {
            TaskError::Gateway(e) => {
                let attempts: Vec<String> = e
                    .attempts()
                    .iter()
                    .map(|a| match &a.error {
                        Some(err) => format!("{}: {err}", a.provider_id),
                        None => format!("{}: ok", a.provider_id),
                    })
                    .collect();
                format!("{e} [{}]", attempts.join("; "))
            }
            TaskError::ResponseFormat(e) => format!("{e} (excerpt: {:?})", e.excerpt),
            other => other.to_string(),
        }
    }
}

/// Ranked entries plus what was dropped on the way.
#[derive(Debug, Clone)]
pub struct RankingOutcome {
    pub entries: Vec<RankingEntry>,
    pub skipped_documents: Vec<ExtractionFailure>,
    pub identity_mismatches: Vec<IdentityMismatch>,
    pub provider_id: String,
}

/// A validated task result and the provider that produced it.
struct TaskRun<T> {
    result: T,
    provider_id: String,
}

pub struct Pipeline {
    extractor: Arc<dyn TextExtractor>,
    gateway: ModelGateway,
}

impl Pipeline {
    pub fn new(extractor: Arc<dyn TextExtractor>, gateway: ModelGateway) -> Self {
        Self { extractor, gateway }
    }

    /// Ranks candidate documents against a job. Entries are ordered by
    /// `fit_score` descending and capped at `min(5, usable documents)`.
    #[tracing::instrument(skip_all, fields(request_id = %Uuid::new_v4(), task = %TaskType::RankCandidates, documents = documents.len()))]
    pub async fn rank_candidates(
        &self,
        job_title: &str,
        job_description: &str,
        documents: &[DocumentRef],
        comments: Option<&str>,
    ) -> Result<RankingOutcome, TaskError> {
        let batch = extract_many(self.extractor.as_ref(), documents).await?;

        let prompt = compile(&TaskRequest::RankCandidates {
            job_title,
            job_description,
            candidates: &batch.documents,
            comments,
        });
        debug!(
            "Compiled ranking prompt: {} candidates, {} chars",
            prompt.identities.len(),
            prompt.text.chars().count()
        );
        let run: TaskRun<RankingPayload> = self.run(&prompt).await?;

        let correlated = correlate(run.result.top_candidates, &prompt.identities);
        let expected = MAX_RANKED.min(batch.documents.len());
        let mut entries = correlated.entries;
        entries.sort_by(|a, b| b.fit_score.cmp(&a.fit_score));
        entries.truncate(expected);

        for entry in entries.iter().filter(|e| e.concerns.is_empty()) {
            warn!(
                candidate_id = %entry.candidate_id,
                "Ranked entry has no concerns listed"
            );
        }

        if entries.len() < expected {
            let unranked: Vec<&str> = batch
                .documents
                .iter()
                .filter(|d| !entries.iter().any(|e| e.candidate_id == d.source_id))
                .filter_map(|d| prompt.identities.opaque_id_for(&d.source_id))
                .collect();
            warn!(
                unranked = ?unranked,
                "Model returned {} usable entries, expected {expected}",
                entries.len()
            );
        }

        info!(
            "Ranked {} of {} candidates ({} documents skipped)",
            entries.len(),
            batch.documents.len(),
            batch.failures.len()
        );

        Ok(RankingOutcome {
            entries,
            skipped_documents: batch.failures,
            identity_mismatches: correlated.mismatches,
            provider_id: run.provider_id,
        })
    }

    /// Extracts dates, salary range, interest level and a summary from a transcript.
    #[tracing::instrument(skip_all, fields(request_id = %Uuid::new_v4(), task = %TaskType::SummarizeConversation))]
    pub async fn summarize_conversation(
        &self,
        transcript: &str,
    ) -> Result<ConversationExtraction, TaskError> {
        let prompt = compile(&TaskRequest::SummarizeConversation { transcript });
        let run: TaskRun<ConversationExtraction> = self.run(&prompt).await?;
        Ok(run.result)
    }

    /// Flags potentially biased language. An empty list means none was found.
    #[tracing::instrument(skip_all, fields(request_id = %Uuid::new_v4(), task = %TaskType::DetectBias))]
    pub async fn detect_bias(&self, feedback: &str) -> Result<Vec<BiasFlag>, TaskError> {
        let prompt = compile(&TaskRequest::DetectBias { feedback });
        let run: TaskRun<BiasReport> = self.run(&prompt).await?;
        if run.result.flags.is_empty() {
            info!("No biased language detected");
        }
        Ok(run.result.flags)
    }

    /// Sends a fixed tiny prompt to each configured provider.
    pub async fn probe_providers(&self) -> Vec<ProviderResponse> {
        self.gateway.probe().await
    }

    /// invoke → decode → validate, with one interaction log line either way.
    async fn run<T: TaskSchema>(&self, prompt: &CompiledPrompt) -> Result<TaskRun<T>, TaskError> {
        let started = Instant::now();
        let invoked = self.gateway.invoke(prompt.system, &prompt.text).await;

        let (provider_id, attempts) = match &invoked {
            Ok(completion) => (
                Some(completion.response.provider_id.clone()),
                completion.failed_attempts.len() + 1,
            ),
            Err(e) => (None, e.attempts().len()),
        };

        let outcome = invoked
            .map_err(TaskError::from)
            .and_then(|completion| -> Result<TaskRun<T>, TaskError> {
                let value = decode(&completion.response.raw_text)?;
                let result = validate::<T>(&value)?;
                Ok(TaskRun {
                    result,
                    provider_id: completion.response.provider_id,
                })
            });
        let latency_ms = started.elapsed().as_millis() as u64;
        let prompt_chars = prompt.text.chars().count();
        let provider = provider_id.as_deref().unwrap_or("none");

        match &outcome {
            Ok(_) => info!(
                target: "ai_interaction",
                task = %T::TASK,
                prompt_chars,
                provider,
                attempts,
                latency_ms,
                status = "success",
                "AI interaction"
            ),
            Err(e) => warn!(
                target: "ai_interaction",
                task = %T::TASK,
                prompt_chars,
                provider,
                attempts,
                latency_ms,
                status = "failure",
                kind = ?e.kind(),
                diagnostic = %e.diagnostic(),
                "AI interaction"
            ),
        }
        outcome
    }
}
