//! Response validation and normalization.
//!
//! Turns untrusted model text into a [`ValidatedScore`] or fails closed:
//!
//! 1. parse the whole text as JSON, else parse the first `{`..last `}` span;
//! 2. coerce aliased, stringly-typed fields into bands clamped to `[0, 9]`;
//! 3. check every band is present and the comment count is within `[3, 8]`;
//! 4. reshape into the [`CanonicalScoreRecord`] handed to callers.
//!
//! Nothing here retries or substitutes a default score.

use crate::error::ScoringError;
use crate::score::{
    BAND_MAX, BAND_MIN, CanonicalScoreRecord, Criterion, MAX_COMMENTS, MIN_COMMENTS, ScoreSource,
    Skill, ValidatedScore, band_label, round_band,
};
use regex::Regex;
use serde_json::{Map, Value};
use std::sync::LazyLock;

/// Greedy: first `{` through last `}`, across newlines.
static BRACE_SPAN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\{.*\}").expect("brace span pattern is valid"));

const OVERALL_KEYS: &[&str] = &["overallBand", "overall", "overall_band"];

/// Why model text could not be read as a JSON object.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseFailure {
    #[error("no JSON object found: {message}")]
    NotJson { message: String },

    #[error("expected a JSON object, found {found}")]
    NotAnObject { found: &'static str },
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Parse model text as a JSON object.
///
/// A direct parse is tried first. Only if the text is not JSON at all is
/// the greedy brace span extracted and parsed; a direct parse that yields
/// a non-object fails without extraction.
pub fn parse_model_json(text: &str) -> Result<Map<String, Value>, ParseFailure> {
    let parsed = match serde_json::from_str::<Value>(text.trim()) {
        Ok(value) => value,
        Err(direct_err) => {
            let span = BRACE_SPAN
                .find(text)
                .ok_or_else(|| ParseFailure::NotJson {
                    message: direct_err.to_string(),
                })?;
            serde_json::from_str::<Value>(span.as_str()).map_err(|e| ParseFailure::NotJson {
                message: e.to_string(),
            })?
        }
    };

    match parsed {
        Value::Object(map) => Ok(map),
        other => Err(ParseFailure::NotAnObject {
            found: kind_of(&other),
        }),
    }
}

/// A model reply after alias resolution and clamping, before validation.
/// `None` marks a band that was missing or not numeric.
#[derive(Debug, Clone, PartialEq)]
pub struct CoercedScore {
    pub overall_band: Option<f64>,
    pub criteria: Vec<(Criterion, Option<f64>)>,
    pub comments: Vec<String>,
}

/// Convert a number or numeric string to a finite band in `[0, 9]`.
pub fn coerce_band(value: &Value) -> Option<f64> {
    let raw = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                None
            } else {
                trimmed.parse::<f64>().ok()
            }
        }
        _ => None,
    }?;
    raw.is_finite().then(|| raw.clamp(BAND_MIN, BAND_MAX))
}

fn lookup<'a>(map: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().find_map(|k| map.get(*k))
}

fn criterion_value<'a>(obj: &'a Map<String, Value>, criterion: Criterion) -> Option<&'a Value> {
    let mut keys = vec![criterion.key()];
    keys.extend_from_slice(criterion.aliases());

    obj.get("criteria")
        .and_then(Value::as_object)
        .and_then(|nested| lookup(nested, &keys))
        .or_else(|| lookup(obj, &keys))
}

fn coerce_comments(obj: &Map<String, Value>) -> Vec<String> {
    match obj.get("comments") {
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| item.as_str().map(str::trim).unwrap_or_default().to_string())
            .collect(),
        _ => match obj.get("feedback") {
            Some(Value::String(feedback)) => feedback
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(str::to_string)
                .collect(),
            _ => Vec::new(),
        },
    }
}

/// Resolve aliases and coerce every field the skill needs.
///
/// Accepts both a nested `criteria` object and flat top-level fields, and
/// `overallBand` or `overall` for the overall band.
pub fn coerce(obj: &Map<String, Value>, skill: Skill) -> CoercedScore {
    CoercedScore {
        overall_band: lookup(obj, OVERALL_KEYS).and_then(coerce_band),
        criteria: skill
            .criteria()
            .iter()
            .map(|c| (*c, criterion_value(obj, *c).and_then(coerce_band)))
            .collect(),
        comments: coerce_comments(obj),
    }
}

/// Check a coerced reply against the fixed score schema for `skill`.
pub fn validate(coerced: CoercedScore, skill: Skill) -> Result<ValidatedScore, ScoringError> {
    let mut violations = Vec::new();
    let in_range = |v: f64| (BAND_MIN..=BAND_MAX).contains(&v);

    for criterion in skill.criteria() {
        if !coerced.criteria.iter().any(|(c, _)| c == criterion) {
            violations.push(format!("{} is missing or not a number", criterion.key()));
        }
    }

    match coerced.overall_band {
        Some(v) if in_range(v) => {}
        Some(v) => violations.push(format!("overallBand {v} is outside 0-9")),
        None => violations.push("overallBand is missing or not a number".to_string()),
    }

    let mut criteria = Vec::with_capacity(coerced.criteria.len());
    for (criterion, value) in &coerced.criteria {
        match value {
            Some(v) if in_range(*v) => criteria.push((*criterion, *v)),
            Some(v) => violations.push(format!("{} {v} is outside 0-9", criterion.key())),
            None => violations.push(format!("{} is missing or not a number", criterion.key())),
        }
    }

    let count = coerced.comments.len();
    if !(MIN_COMMENTS..=MAX_COMMENTS).contains(&count) {
        violations.push(format!(
            "expected {MIN_COMMENTS}-{MAX_COMMENTS} comments, got {count}"
        ));
    }
    for (i, comment) in coerced.comments.iter().enumerate() {
        if comment.trim().is_empty() {
            violations.push(format!("comment {i} is empty"));
        }
    }

    if !violations.is_empty() {
        return Err(ScoringError::schema_violation(violations));
    }

    Ok(ValidatedScore {
        overall_band: coerced.overall_band.unwrap_or_default(),
        criteria,
        comments: coerced.comments,
    })
}

/// Reshape a validated score into the record exposed to callers.
pub fn to_canonical(score: &ValidatedScore) -> CanonicalScoreRecord {
    let overall = round_band(score.overall_band());
    let band = |c: Criterion| score.criterion(c);

    CanonicalScoreRecord {
        overall,
        task_response: band(Criterion::TaskResponse),
        fluency: band(Criterion::Fluency),
        coherence: band(Criterion::Coherence).unwrap_or_default(),
        lexical: band(Criterion::Lexical).unwrap_or_default(),
        grammar: band(Criterion::Grammar).unwrap_or_default(),
        pronunciation: band(Criterion::Pronunciation),
        feedback: score.comments().join("\n"),
        strengths: Vec::new(),
        improvements: Vec::new(),
        band_level: band_label(overall),
        source: ScoreSource::Ai,
    }
}

/// Parse, coerce and validate raw model text.
pub fn validate_response(text: &str, skill: Skill) -> Result<ValidatedScore, ScoringError> {
    let obj = parse_model_json(text).map_err(|e| {
        tracing::warn!(error = %e, chars = text.len(), "Model returned unparseable output");
        ScoringError::malformed_response(e.to_string())
    })?;
    validate(coerce(&obj, skill), skill).inspect_err(|e| {
        tracing::warn!(cause = %e.cause, "Model output failed score validation");
    })
}

/// Full normalization: raw model text to canonical record.
pub fn normalize(text: &str, skill: Skill) -> Result<CanonicalScoreRecord, ScoringError> {
    validate_response(text, skill).map(|score| to_canonical(&score))
}
