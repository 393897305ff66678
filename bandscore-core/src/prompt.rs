//! Prompt construction.
//!
//! Renders one instruction string from a submission and the calibration
//! profile of its level. Pure: no I/O and no state beyond the static
//! calibration table.

use crate::calibration::{self, CalibrationProfile};
use crate::score::{BAND_MAX, BAND_MIN, MAX_COMMENTS, MIN_COMMENTS, ScoreRequest, Skill};
use serde_json::{Value, json};

/// Revision of the prompt template, reported with every score.
pub const PROMPT_VERSION: &str = "band-feedback-v3";

/// Delimiters around the learner's text.
pub const RESPONSE_START: &str = "<<<LEARNER_RESPONSE";
pub const RESPONSE_END: &str = "LEARNER_RESPONSE>>>";

/// System message sent ahead of every scoring prompt.
pub const SYSTEM_PROMPT: &str = "You are a certified IELTS examiner. You assess candidate \
responses strictly against the official band descriptors and reply with a single JSON \
object and nothing else.";

const WRITING_RUBRIC: &str = "Grading criteria (IELTS Writing):
- taskResponse: how fully the response addresses every part of the task with a clear, developed position.
- coherence: logical organisation, paragraphing and accurate use of cohesive devices.
- lexical: range, precision and appropriacy of vocabulary, including collocation and spelling.
- grammar: range and accuracy of grammatical structures and punctuation.";

const SPEAKING_RUBRIC: &str = "Grading criteria (IELTS Speaking):
- fluency: ability to speak at length without noticeable effort, hesitation or self-correction.
- coherence: logical sequencing of ideas and use of discourse markers.
- lexical: range and precision of vocabulary, paraphrase and idiomatic language.
- grammar: range and accuracy of grammatical structures.
- pronunciation: intelligibility, stress, rhythm and intonation as evidenced by the transcript.";

/// Builds level-calibrated scoring prompts.
#[derive(Debug, Clone, Copy, Default)]
pub struct PromptBuilder;

impl PromptBuilder {
    pub fn new() -> Self {
        Self
    }

    /// Render the prompt for a request.
    pub fn build(&self, request: &ScoreRequest) -> String {
        self.render_with_profile(
            &request.raw_text,
            request.skill,
            calibration::profile_for(request.proficiency_level),
            &request.task_type,
        )
    }

    /// Render from a free-form level label. Unrecognised labels use the B1
    /// profile.
    pub fn render(&self, raw_text: &str, skill: Skill, level_label: &str, task_type: &str) -> String {
        self.render_with_profile(
            raw_text,
            skill,
            calibration::profile_for_label(level_label),
            task_type,
        )
    }

    fn render_with_profile(
        &self,
        raw_text: &str,
        skill: Skill,
        profile: &CalibrationProfile,
        task_type: &str,
    ) -> String {
        let rubric = match skill {
            Skill::Writing => WRITING_RUBRIC,
            Skill::Speaking => SPEAKING_RUBRIC,
        };
        let task_type = if task_type.trim().is_empty() {
            crate::score::DEFAULT_TASK_TYPE
        } else {
            task_type.trim()
        };

        format!(
            "Assess the following IELTS {skill} response ({task_type}).\n\n\
             {phrase}\n\
             Tone: {tone}\n\
             Vocabulary: {vocabulary}\n\
             Structure: {structure}\n\
             Feedback depth: {depth}\n\n\
             {rubric}\n\n\
             {start}\n{raw_text}\n{end}\n\n\
             {contract}",
            phrase = profile.phrase,
            tone = profile.tone,
            vocabulary = profile.vocabulary,
            structure = profile.structure,
            depth = profile.feedback_depth,
            start = RESPONSE_START,
            end = RESPONSE_END,
            contract = output_contract(skill),
        )
    }
}

/// The output-format section of the prompt.
fn output_contract(skill: Skill) -> String {
    let criteria = skill
        .criteria()
        .iter()
        .map(|c| format!("\"{}\": <number>", c.key()))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "Respond with ONLY a JSON object of exactly this shape:\n\
         {{\"overallBand\": <number>, \"criteria\": {{{criteria}}}, \"comments\": [<string>, ...]}}\n\
         Rules:\n\
         - Every band is a number from {min} to {max} in steps of 0.5.\n\
         - \"comments\" holds between {min_c} and {max_c} non-empty feedback strings.\n\
         - Do not wrap the JSON in markdown or add any text before or after it.",
        min = BAND_MIN,
        max = BAND_MAX,
        min_c = MIN_COMMENTS,
        max_c = MAX_COMMENTS,
    )
}

/// JSON schema pinning the reply shape for structured-output requests.
pub fn score_schema(skill: Skill) -> Value {
    let band = json!({ "type": "number", "minimum": BAND_MIN, "maximum": BAND_MAX });
    let keys: Vec<&str> = skill.criteria().iter().map(|c| c.key()).collect();
    let properties: serde_json::Map<String, Value> = keys
        .iter()
        .map(|k| (k.to_string(), band.clone()))
        .collect();

    json!({
        "type": "object",
        "properties": {
            "overallBand": band,
            "criteria": {
                "type": "object",
                "properties": properties,
                "required": keys,
                "additionalProperties": false,
            },
            "comments": {
                "type": "array",
                "items": { "type": "string", "minLength": 1 },
                "minItems": MIN_COMMENTS,
                "maxItems": MAX_COMMENTS,
            },
        },
        "required": ["overallBand", "criteria", "comments"],
        "additionalProperties": false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::score::ProficiencyLevel;

    const ESSAY: &str = "Some people believe that cities should ban cars.\n\nI partly agree  \
                         because pollution is harmful; however, {braces} and \"quotes\" stay.";

    #[test]
    fn test_every_level_embeds_phrase_and_text() {
        let builder = PromptBuilder::new();
        for level in ProficiencyLevel::ALL {
            for skill in [Skill::Writing, Skill::Speaking] {
                let request = ScoreRequest::new(ESSAY, skill).with_level(level);
                let prompt = builder.build(&request);
                assert!(prompt.contains(calibration::profile_for(level).phrase));
                assert!(prompt.contains(ESSAY), "raw text must be embedded unmodified");
            }
        }
    }

    #[test]
    fn test_raw_text_is_delimited() {
        let prompt = PromptBuilder::new().build(&ScoreRequest::new(ESSAY, Skill::Writing));
        let expected = format!("{RESPONSE_START}\n{ESSAY}\n{RESPONSE_END}");
        assert!(prompt.contains(&expected));
    }

    #[test]
    fn test_unrecognised_level_uses_b1() {
        let builder = PromptBuilder::new();
        let prompt = builder.render(ESSAY, Skill::Writing, "Z9", "Task 2");
        let b1 = calibration::profile_for(ProficiencyLevel::B1);
        assert!(prompt.contains(b1.phrase));
        assert_eq!(
            prompt,
            builder.build(&ScoreRequest::new(ESSAY, Skill::Writing).with_level(ProficiencyLevel::B1))
        );
    }

    #[test]
    fn test_rubric_and_contract_follow_skill() {
        let builder = PromptBuilder::new();
        let writing = builder.build(&ScoreRequest::new(ESSAY, Skill::Writing));
        assert!(writing.contains("IELTS Writing"));
        assert!(writing.contains("\"taskResponse\": <number>"));
        assert!(!writing.contains("\"pronunciation\""));

        let speaking = builder.build(&ScoreRequest::new(ESSAY, Skill::Speaking));
        assert!(speaking.contains("IELTS Speaking"));
        assert!(speaking.contains("\"fluency\": <number>"));
        assert!(speaking.contains("\"pronunciation\": <number>"));
        assert!(speaking.contains("between 3 and 8"));
    }

    #[test]
    fn test_task_type_defaulted_when_blank() {
        let prompt = PromptBuilder::new().render(ESSAY, Skill::Writing, "B2", "  ");
        assert!(prompt.contains("(Task 2)"));
        let prompt = PromptBuilder::new().render(ESSAY, Skill::Writing, "B2", "Task 1");
        assert!(prompt.contains("(Task 1)"));
    }

    #[test]
    fn test_build_is_deterministic() {
        let request = ScoreRequest::new(ESSAY, Skill::Speaking).with_level(ProficiencyLevel::C1);
        let builder = PromptBuilder::new();
        assert_eq!(builder.build(&request), builder.build(&request));
    }

    #[test]
    fn test_score_schema_shape() {
        let schema = score_schema(Skill::Speaking);
        let required = schema["properties"]["criteria"]["required"]
            .as_array()
            .unwrap();
        assert_eq!(required.len(), 5);
        assert_eq!(schema["properties"]["comments"]["minItems"], 3);
        assert_eq!(schema["properties"]["comments"]["maxItems"], 8);
        assert_eq!(schema["properties"]["overallBand"]["maximum"], 9.0);
    }
}
