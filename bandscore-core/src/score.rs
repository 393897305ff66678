//! Scoring domain types: skills, criteria, proficiency levels, the incoming
//! request and the records the pipeline produces.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::str::FromStr;

/// Lowest and highest IELTS band.
pub const BAND_MIN: f64 = 0.0;
pub const BAND_MAX: f64 = 9.0;

/// Bounds on the number of feedback comments.
pub const MIN_COMMENTS: usize = 3;
pub const MAX_COMMENTS: usize = 8;

/// Task type assumed when the caller does not name one.
pub const DEFAULT_TASK_TYPE: &str = "Task 2";

/// The skill being assessed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Skill {
    #[default]
    Writing,
    Speaking,
}

impl Skill {
    /// Criteria graded for this skill, in reporting order.
    pub fn criteria(&self) -> &'static [Criterion] {
        match self {
            Skill::Writing => &[
                Criterion::TaskResponse,
                Criterion::Coherence,
                Criterion::Lexical,
                Criterion::Grammar,
            ],
            Skill::Speaking => &[
                Criterion::Fluency,
                Criterion::Coherence,
                Criterion::Lexical,
                Criterion::Grammar,
                Criterion::Pronunciation,
            ],
        }
    }
}

impl std::fmt::Display for Skill {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Skill::Writing => write!(f, "writing"),
            Skill::Speaking => write!(f, "speaking"),
        }
    }
}

impl FromStr for Skill {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "writing" => Ok(Skill::Writing),
            "speaking" => Ok(Skill::Speaking),
            other => Err(format!("unknown skill '{other}' (expected writing or speaking)")),
        }
    }
}

/// A single band-scored criterion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Criterion {
    TaskResponse,
    Fluency,
    Coherence,
    Lexical,
    Grammar,
    Pronunciation,
}

impl Criterion {
    /// Field name used in model output and in the canonical record.
    pub fn key(&self) -> &'static str {
        match self {
            Criterion::TaskResponse => "taskResponse",
            Criterion::Fluency => "fluency",
            Criterion::Coherence => "coherence",
            Criterion::Lexical => "lexical",
            Criterion::Grammar => "grammar",
            Criterion::Pronunciation => "pronunciation",
        }
    }

    /// Alternative spellings accepted when reading model output.
    pub fn aliases(&self) -> &'static [&'static str] {
        match self {
            Criterion::TaskResponse => &["task_response", "taskAchievement", "task_achievement"],
            Criterion::Fluency => &["fluencyCoherence", "fluency_coherence"],
            Criterion::Coherence => &["coherenceCohesion", "coherence_cohesion"],
            Criterion::Lexical => &["lexicalResource", "lexical_resource"],
            Criterion::Grammar => &["grammaticalRange", "grammatical_range", "grammar_accuracy"],
            Criterion::Pronunciation => &[],
        }
    }

    /// Human-readable rubric name.
    pub fn label(&self) -> &'static str {
        match self {
            Criterion::TaskResponse => "Task Response",
            Criterion::Fluency => "Fluency",
            Criterion::Coherence => "Coherence and Cohesion",
            Criterion::Lexical => "Lexical Resource",
            Criterion::Grammar => "Grammatical Range and Accuracy",
            Criterion::Pronunciation => "Pronunciation",
        }
    }
}

/// CEFR proficiency level used to calibrate feedback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ProficiencyLevel {
    A1,
    A2,
    B1,
    B2,
    C1,
    C2,
}

/// Level substituted for a missing or unrecognised label.
pub const DEFAULT_LEVEL: ProficiencyLevel = ProficiencyLevel::B1;

impl ProficiencyLevel {
    pub const ALL: [ProficiencyLevel; 6] = [
        ProficiencyLevel::A1,
        ProficiencyLevel::A2,
        ProficiencyLevel::B1,
        ProficiencyLevel::B2,
        ProficiencyLevel::C1,
        ProficiencyLevel::C2,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProficiencyLevel::A1 => "A1",
            ProficiencyLevel::A2 => "A2",
            ProficiencyLevel::B1 => "B1",
            ProficiencyLevel::B2 => "B2",
            ProficiencyLevel::C1 => "C1",
            ProficiencyLevel::C2 => "C2",
        }
    }

    /// Parse a level label, substituting [`DEFAULT_LEVEL`] when it is not
    /// recognised. The substitution is logged so upstream validation gaps
    /// stay visible.
    pub fn parse_or_default(label: &str) -> Self {
        match label.parse() {
            Ok(level) => level,
            Err(_) => {
                tracing::warn!(
                    label = %label,
                    fallback = DEFAULT_LEVEL.as_str(),
                    "Unrecognised proficiency level; using default"
                );
                DEFAULT_LEVEL
            }
        }
    }
}

impl Default for ProficiencyLevel {
    fn default() -> Self {
        DEFAULT_LEVEL
    }
}

impl std::fmt::Display for ProficiencyLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProficiencyLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        ProficiencyLevel::ALL
            .into_iter()
            .find(|level| level.as_str() == upper)
            .ok_or_else(|| format!("unknown proficiency level '{s}'"))
    }
}

fn lenient_level<'de, D>(deserializer: D) -> Result<ProficiencyLevel, D::Error>
where
    D: Deserializer<'de>,
{
    let label: Option<String> = Option::deserialize(deserializer)?;
    Ok(label
        .as_deref()
        .map(ProficiencyLevel::parse_or_default)
        .unwrap_or(DEFAULT_LEVEL))
}

fn default_task_type() -> String {
    DEFAULT_TASK_TYPE.to_string()
}

/// One submission to be scored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreRequest {
    pub raw_text: String,
    #[serde(default)]
    pub skill: Skill,
    #[serde(default, deserialize_with = "lenient_level")]
    pub proficiency_level: ProficiencyLevel,
    #[serde(default = "default_task_type")]
    pub task_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_override: Option<String>,
}

impl ScoreRequest {
    pub fn new(raw_text: impl Into<String>, skill: Skill) -> Self {
        Self {
            raw_text: raw_text.into(),
            skill,
            proficiency_level: DEFAULT_LEVEL,
            task_type: default_task_type(),
            model_override: None,
        }
    }

    pub fn with_level(mut self, level: ProficiencyLevel) -> Self {
        self.proficiency_level = level;
        self
    }

    pub fn with_task_type(mut self, task_type: impl Into<String>) -> Self {
        self.task_type = task_type.into();
        self
    }

    pub fn with_model_override(mut self, model: impl Into<String>) -> Self {
        self.model_override = Some(model.into());
        self
    }
}

/// A model score that passed validation. Only the validator constructs one,
/// so every band lies in `[0, 9]` and the comment count in `[3, 8]`.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedScore {
    pub(crate) overall_band: f64,
    pub(crate) criteria: Vec<(Criterion, f64)>,
    pub(crate) comments: Vec<String>,
}

impl ValidatedScore {
    pub fn overall_band(&self) -> f64 {
        self.overall_band
    }

    pub fn criteria(&self) -> &[(Criterion, f64)] {
        &self.criteria
    }

    pub fn criterion(&self, criterion: Criterion) -> Option<f64> {
        self.criteria
            .iter()
            .find(|(c, _)| *c == criterion)
            .map(|(_, v)| *v)
    }

    pub fn comments(&self) -> &[String] {
        &self.comments
    }
}

/// Where a canonical record came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoreSource {
    Ai,
    Fallback,
}

impl std::fmt::Display for ScoreSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScoreSource::Ai => write!(f, "ai"),
            ScoreSource::Fallback => write!(f, "fallback"),
        }
    }
}

/// The score as exposed to the persistence layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalScoreRecord {
    pub overall: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_response: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fluency: Option<f64>,
    pub coherence: f64,
    pub lexical: f64,
    pub grammar: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pronunciation: Option<f64>,
    pub feedback: String,
    pub strengths: Vec<String>,
    pub improvements: Vec<String>,
    pub band_level: String,
    pub source: ScoreSource,
}

/// Bookkeeping returned next to a successful record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoringMetadata {
    pub source: ScoreSource,
    pub model: String,
    pub prompt_version: String,
    pub latency_ms: u64,
    pub scored_at: DateTime<Utc>,
}

/// Successful pipeline result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringOutcome {
    pub record: CanonicalScoreRecord,
    pub metadata: ScoringMetadata,
}

/// Round a band to one decimal place, halves away from zero.
pub fn round_band(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Shortest string form of a band: `7.0` renders as `"7"`, `6.5` as `"6.5"`.
pub fn band_label(value: f64) -> String {
    let rounded = round_band(value);
    if rounded.fract() == 0.0 {
        format!("{}", rounded as i64)
    } else {
        format!("{rounded:.1}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_skill_criteria() {
        assert_eq!(
            Skill::Writing.criteria(),
            &[
                Criterion::TaskResponse,
                Criterion::Coherence,
                Criterion::Lexical,
                Criterion::Grammar
            ]
        );
        assert_eq!(Skill::Speaking.criteria().len(), 5);
        assert!(Skill::Speaking.criteria().contains(&Criterion::Pronunciation));
        assert!(!Skill::Speaking.criteria().contains(&Criterion::TaskResponse));
    }

    #[test]
    fn test_level_parse() {
        assert_eq!("c1".parse::<ProficiencyLevel>(), Ok(ProficiencyLevel::C1));
        assert_eq!(" B2 ".parse::<ProficiencyLevel>(), Ok(ProficiencyLevel::B2));
        assert!("D1".parse::<ProficiencyLevel>().is_err());
        assert_eq!(ProficiencyLevel::parse_or_default("Z9"), ProficiencyLevel::B1);
        assert_eq!(ProficiencyLevel::parse_or_default(""), ProficiencyLevel::B1);
        assert_eq!(ProficiencyLevel::parse_or_default("a2"), ProficiencyLevel::A2);
    }

    #[test]
    fn test_request_deserialization_defaults() {
        let req: ScoreRequest =
            serde_json::from_str(r#"{"rawText": "Some essay text"}"#).unwrap();
        assert_eq!(req.skill, Skill::Writing);
        assert_eq!(req.proficiency_level, ProficiencyLevel::B1);
        assert_eq!(req.task_type, "Task 2");
        assert!(req.model_override.is_none());
    }

    #[test]
    fn test_request_unrecognised_level_falls_back() {
        let req: ScoreRequest = serde_json::from_str(
            r#"{"rawText": "x", "skill": "speaking", "proficiencyLevel": "Expert"}"#,
        )
        .unwrap();
        assert_eq!(req.skill, Skill::Speaking);
        assert_eq!(req.proficiency_level, ProficiencyLevel::B1);

        let req: ScoreRequest =
            serde_json::from_str(r#"{"rawText": "x", "proficiencyLevel": null}"#).unwrap();
        assert_eq!(req.proficiency_level, ProficiencyLevel::B1);
    }

    #[test]
    fn test_round_band() {
        assert_eq!(round_band(6.94), 6.9);
        assert_eq!(round_band(6.96), 7.0);
        assert_eq!(round_band(9.0), 9.0);
        assert_eq!(round_band(0.04), 0.0);
    }

    #[test]
    fn test_band_label() {
        assert_eq!(band_label(7.0), "7");
        assert_eq!(band_label(6.96), "7");
        assert_eq!(band_label(6.5), "6.5");
        assert_eq!(band_label(0.0), "0");
    }

    #[test]
    fn test_record_serializes_camel_case() {
        let record = CanonicalScoreRecord {
            overall: 6.5,
            task_response: Some(6.0),
            fluency: None,
            coherence: 7.0,
            lexical: 6.5,
            grammar: 6.0,
            pronunciation: None,
            feedback: "a\nb\nc".into(),
            strengths: vec![],
            improvements: vec![],
            band_level: "6.5".into(),
            source: ScoreSource::Ai,
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["taskResponse"], 6.0);
        assert_eq!(json["bandLevel"], "6.5");
        assert_eq!(json["source"], "ai");
        assert!(json.get("fluency").is_none());
        assert!(json.get("pronunciation").is_none());
    }
}
