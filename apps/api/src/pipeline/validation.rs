//! Schema Validator: checks decoded JSON against each task's result shape.
//!
//! Values are never clamped or coerced into range: an out-of-range score or
//! interest level is a validation failure, not a silent fix. Absent list fields
//! are normalized to empty lists so downstream code never sees a null list.

use chrono::NaiveDate;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::pipeline::models::{
    BiasFlag, BiasReport, ConversationExtraction, RankedCandidate, RankingPayload,
};
use crate::pipeline::TaskType;

const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("field '{field}' {reason}")]
pub struct SchemaValidationError {
    /// Path to the offending field, e.g. `top_candidates[2].fit_score`.
    pub field: String,
    pub reason: String,
}

impl SchemaValidationError {
    fn new(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// A typed task result that can be checked out of an untrusted JSON value.
pub trait TaskSchema: Sized {
    const TASK: TaskType;

    fn validate(value: &Value) -> Result<Self, SchemaValidationError>;
}

pub fn validate<T: TaskSchema>(value: &Value) -> Result<T, SchemaValidationError> {
    T::validate(value)
}

impl TaskSchema for RankingPayload {
    const TASK: TaskType = TaskType::RankCandidates;

    fn validate(value: &Value) -> Result<Self, SchemaValidationError> {
        let root = object(value, "$")?;
        let items = match root.get("top_candidates") {
            Some(Value::Array(items)) => items,
            Some(_) => return Err(SchemaValidationError::new("top_candidates", "must be an array")),
            None => return Err(SchemaValidationError::new("top_candidates", "is required")),
        };

        let top_candidates = items
            .iter()
            .enumerate()
            .map(|(i, item)| ranked_candidate(item, &format!("top_candidates[{i}]")))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(RankingPayload { top_candidates })
    }
}

fn ranked_candidate(value: &Value, path: &str) -> Result<RankedCandidate, SchemaValidationError> {
    let item = object(value, path)?;

    let opaque_id = required_str(item, path, "candidate_id")?;
    if opaque_id.trim().is_empty() {
        return Err(SchemaValidationError::new(
            format!("{path}.candidate_id"),
            "must not be empty",
        ));
    }

    Ok(RankedCandidate {
        opaque_id: opaque_id.trim().to_string(),
        candidate_name: required_str(item, path, "candidate_name")?.to_string(),
        fit_score: bounded_int(item, path, "fit_score", 1, 10)?
            .ok_or_else(|| SchemaValidationError::new(format!("{path}.fit_score"), "is required"))?,
        strengths: string_list(item, path, "strengths")?,
        concerns: string_list(item, path, "concerns")?,
        technical_skills: string_list(item, path, "technical_skills")?,
        reasoning: required_str(item, path, "reasoning")?.to_string(),
    })
}

impl TaskSchema for ConversationExtraction {
    const TASK: TaskType = TaskType::SummarizeConversation;

    fn validate(value: &Value) -> Result<Self, SchemaValidationError> {
        let root = object(value, "$")?;
        let path = "";

        Ok(ConversationExtraction {
            start_date: date(root, path, "start_date")?,
            end_date: date(root, path, "end_date")?,
            min_salary: salary(root, path, "min_salary")?,
            max_salary: salary(root, path, "max_salary")?,
            interest_level: bounded_int(root, path, "interest_level", 1, 5)?,
            summary_text: optional_str(root, path, "summary_text")?
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty()),
        })
    }
}

impl TaskSchema for BiasReport {
    const TASK: TaskType = TaskType::DetectBias;

    fn validate(value: &Value) -> Result<Self, SchemaValidationError> {
        let root = object(value, "$")?;
        let items = match root.get("flags") {
            Some(Value::Array(items)) => items,
            Some(_) => return Err(SchemaValidationError::new("flags", "must be an array")),
            None => return Err(SchemaValidationError::new("flags", "is required")),
        };

        let flags = items
            .iter()
            .enumerate()
            .map(|(i, item)| {
                let path = format!("flags[{i}]");
                let flag = object(item, &path)?;
                Ok(BiasFlag {
                    term: non_empty_str(flag, &path, "term")?,
                    justification: non_empty_str(flag, &path, "justification")?,
                })
            })
            .collect::<Result<Vec<_>, SchemaValidationError>>()?;

        Ok(BiasReport { flags })
    }
}

fn field_path(path: &str, key: &str) -> String {
    if path.is_empty() {
        key.to_string()
    } else {
        format!("{path}.{key}")
    }
}

fn object<'a>(value: &'a Value, path: &str) -> Result<&'a Map<String, Value>, SchemaValidationError> {
    value
        .as_object()
        .ok_or_else(|| SchemaValidationError::new(path, "must be an object"))
}

fn required_str<'a>(
    item: &'a Map<String, Value>,
    path: &str,
    key: &str,
) -> Result<&'a str, SchemaValidationError> {
    match item.get(key) {
        Some(Value::String(s)) => Ok(s),
        Some(Value::Null) | None => Err(SchemaValidationError::new(field_path(path, key), "is required")),
        Some(_) => Err(SchemaValidationError::new(field_path(path, key), "must be a string")),
    }
}

fn non_empty_str(
    item: &Map<String, Value>,
    path: &str,
    key: &str,
) -> Result<String, SchemaValidationError> {
    let value = required_str(item, path, key)?.trim();
    if value.is_empty() {
        return Err(SchemaValidationError::new(field_path(path, key), "must not be empty"));
    }
    Ok(value.to_string())
}

fn optional_str(
    item: &Map<String, Value>,
    path: &str,
    key: &str,
) -> Result<Option<String>, SchemaValidationError> {
    match item.get(key) {
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(Value::Null) | None => Ok(None),
        Some(_) => Err(SchemaValidationError::new(field_path(path, key), "must be a string")),
    }
}

fn string_list(
    item: &Map<String, Value>,
    path: &str,
    key: &str,
) -> Result<Vec<String>, SchemaValidationError> {
    let items = match item.get(key) {
        Some(Value::Array(items)) => items,
        Some(Value::Null) | None => return Ok(Vec::new()),
        Some(_) => return Err(SchemaValidationError::new(field_path(path, key), "must be an array")),
    };

    items
        .iter()
        .enumerate()
        .map(|(i, v)| {
            v.as_str().map(str::to_string).ok_or_else(|| {
                SchemaValidationError::new(format!("{}[{i}]", field_path(path, key)), "must be a string")
            })
        })
        .collect()
}

/// Integer within `min..=max`. Fractional or out-of-range numbers are rejected.
fn bounded_int(
    item: &Map<String, Value>,
    path: &str,
    key: &str,
    min: u8,
    max: u8,
) -> Result<Option<u8>, SchemaValidationError> {
    let value = match item.get(key) {
        Some(Value::Null) | None => return Ok(None),
        Some(value) => value,
    };

    let out_of_range = || {
        SchemaValidationError::new(
            field_path(path, key),
            format!("must be between {min} and {max}, got {value}"),
        )
    };
    let n = match (value.as_i64(), value.as_f64()) {
        (Some(n), _) => n,
        // Whole numbers past i64 (1e20, large u64) are still integers, just out of range.
        (None, Some(f)) if f.fract() == 0.0 && (f < f64::from(min) || f > f64::from(max)) => {
            return Err(out_of_range());
        }
        _ => {
            return Err(SchemaValidationError::new(
                field_path(path, key),
                "must be an integer",
            ))
        }
    };
    if n < i64::from(min) || n > i64::from(max) {
        return Err(out_of_range());
    }
    // Bounded by the check above.
    Ok(Some(n as u8))
}

fn date(
    item: &Map<String, Value>,
    path: &str,
    key: &str,
) -> Result<Option<NaiveDate>, SchemaValidationError> {
    match optional_str(item, path, key)? {
        None => Ok(None),
        Some(s) if s.trim().is_empty() => Ok(None),
        Some(s) => NaiveDate::parse_from_str(s.trim(), DATE_FORMAT)
            .map(Some)
            .map_err(|_| {
                SchemaValidationError::new(field_path(path, key), format!("'{s}' is not a YYYY-MM-DD date"))
            }),
    }
}

fn salary(
    item: &Map<String, Value>,
    path: &str,
    key: &str,
) -> Result<Option<f64>, SchemaValidationError> {
    let value = match item.get(key) {
        Some(Value::Null) | None => return Ok(None),
        Some(value) => value,
    };

    match value.as_f64() {
        Some(n) if n.is_finite() && n >= 0.0 => Ok(Some(n)),
        Some(n) => Err(SchemaValidationError::new(
            field_path(path, key),
            format!("must be a non-negative number, got {n}"),
        )),
        None => Err(SchemaValidationError::new(field_path(path, key), "must be a number")),
    }
}
