//! Identity Correlator: maps opaque per-request tokens back to caller identities.
//!
//! The model only ever sees tokens like `candidate_3`. Identity is resolved
//! solely through the map issued for that request; a model-supplied name is
//! informational and never used to match.

use std::collections::{HashMap, HashSet};

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::pipeline::models::{RankedCandidate, RankingEntry};

const TOKEN_PREFIX: &str = "candidate_";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IssuedIdentity {
    pub opaque_id: String,
    pub source_id: String,
    pub display_name: String,
}

/// Issued identities in issue order, indexed both ways.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdentityMap {
    issued: Vec<IssuedIdentity>,
    by_opaque: HashMap<String, usize>,
    by_source: HashMap<String, usize>,
}

impl IdentityMap {
    /// Issues the next ordinal token (`candidate_1`, `candidate_2`, ...) for a caller identity.
    pub fn issue(&mut self, source_id: &str, display_name: &str) -> &IssuedIdentity {
        let index = self.issued.len();
        let opaque_id = format!("{TOKEN_PREFIX}{}", index + 1);

        self.by_opaque.insert(opaque_id.clone(), index);
        self.by_source.entry(source_id.to_string()).or_insert(index);
        self.issued.push(IssuedIdentity {
            opaque_id,
            source_id: source_id.to_string(),
            display_name: display_name.to_string(),
        });
        &self.issued[index]
    }

    pub fn resolve(&self, opaque_id: &str) -> Option<&IssuedIdentity> {
        self.by_opaque.get(opaque_id.trim()).map(|&i| &self.issued[i])
    }

    pub fn opaque_id_for(&self, source_id: &str) -> Option<&str> {
        self.by_source
            .get(source_id)
            .map(|&i| self.issued[i].opaque_id.as_str())
    }

    pub fn len(&self) -> usize {
        self.issued.len()
    }

    pub fn is_empty(&self) -> bool {
        self.issued.is_empty()
    }
}

/// The model echoed a token that was never issued for this request.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("model returned unknown candidate identifier '{opaque_id}'")]
pub struct IdentityMismatch {
    pub opaque_id: String,
}

#[derive(Debug, Clone, Default)]
pub struct Correlated {
    pub entries: Vec<RankingEntry>,
    pub mismatches: Vec<IdentityMismatch>,
}

/// Swaps opaque tokens for real identities. Unknown tokens are dropped and
/// recorded; a repeated token keeps its first occurrence.
pub fn correlate(candidates: Vec<RankedCandidate>, identities: &IdentityMap) -> Correlated {
    let mut correlated = Correlated::default();
    let mut seen: HashSet<String> = HashSet::new();

    for candidate in candidates {
        let Some(identity) = identities.resolve(&candidate.opaque_id) else {
            warn!(
                "Dropping ranked entry with unissued identifier '{}'",
                candidate.opaque_id
            );
            correlated.mismatches.push(IdentityMismatch {
                opaque_id: candidate.opaque_id,
            });
            continue;
        };

        if !seen.insert(identity.opaque_id.clone()) {
            warn!("Dropping duplicate ranked entry for '{}'", identity.opaque_id);
            continue;
        }

        if candidate.candidate_name.trim() != identity.display_name {
            debug!(
                "Model named {} '{}', known as '{}'",
                identity.opaque_id, candidate.candidate_name, identity.display_name
            );
        }

        correlated.entries.push(RankingEntry {
            candidate_id: identity.source_id.clone(),
            candidate_name: identity.display_name.clone(),
            fit_score: candidate.fit_score,
            strengths: candidate.strengths,
            concerns: candidate.concerns,
            technical_skills: candidate.technical_skills,
            reasoning: candidate.reasoning,
        });
    }

    correlated
}
