//! Offline placeholder scores.
//!
//! Produces a deterministic record from the learner's level and the length
//! of the response, marked `source: "fallback"`. The scoring pipeline never
//! calls this; it exists for offline demos and UI work where no model is
//! reachable.

use crate::score::{
    BAND_MAX, BAND_MIN, CanonicalScoreRecord, ProficiencyLevel, ScoreRequest, ScoreSource, Skill,
    band_label, round_band,
};

/// Expected word count for a complete answer.
fn target_words(skill: Skill, task_type: &str) -> usize {
    match skill {
        Skill::Speaking => 120,
        Skill::Writing if task_type.contains('1') => 150,
        Skill::Writing => 250,
    }
}

fn level_baseline(level: ProficiencyLevel) -> f64 {
    match level {
        ProficiencyLevel::A1 => 3.5,
        ProficiencyLevel::A2 => 4.5,
        ProficiencyLevel::B1 => 5.5,
        ProficiencyLevel::B2 => 6.5,
        ProficiencyLevel::C1 => 7.5,
        ProficiencyLevel::C2 => 8.5,
    }
}

fn half_band(value: f64) -> f64 {
    ((value * 2.0).round() / 2.0).clamp(BAND_MIN, BAND_MAX)
}

/// Build a placeholder record for `request`.
///
/// Short answers are marked down by up to one band; the task criterion
/// (or fluency, for speaking) takes the full penalty.
pub fn placeholder_record(request: &ScoreRequest) -> CanonicalScoreRecord {
    let words = request.raw_text.split_whitespace().count();
    let target = target_words(request.skill, &request.task_type);
    let baseline = level_baseline(request.proficiency_level);
    let shortfall = if words >= target {
        0.0
    } else {
        1.0 - words as f64 / target as f64
    };

    let primary = half_band(baseline - shortfall);
    let coherence = half_band(baseline - shortfall / 2.0);
    let lexical = half_band(baseline);
    let grammar = half_band(baseline - 0.5);
    let pronunciation = half_band(baseline);

    let (task_response, fluency, pronunciation, bands) = match request.skill {
        Skill::Writing => (
            Some(primary),
            None,
            None,
            vec![primary, coherence, lexical, grammar],
        ),
        Skill::Speaking => (
            None,
            Some(primary),
            Some(pronunciation),
            vec![primary, coherence, lexical, grammar, pronunciation],
        ),
    };
    let overall = round_band(half_band(bands.iter().sum::<f64>() / bands.len() as f64));

    let mut improvements = Vec::new();
    if words < target {
        improvements.push(format!(
            "Develop your answer further: {words} words against a target of about {target}."
        ));
    }
    improvements.push("Check subject-verb agreement and article use.".to_string());
    improvements.push(match request.skill {
        Skill::Writing => "Link paragraphs with a wider range of cohesive devices.".to_string(),
        Skill::Speaking => "Reduce pauses by extending answers with examples.".to_string(),
    });

    let strengths = vec![
        "Response addresses the prompt.".to_string(),
        format!(
            "Vocabulary is appropriate for a {} learner.",
            request.proficiency_level
        ),
    ];

    CanonicalScoreRecord {
        overall,
        task_response,
        fluency,
        coherence,
        lexical,
        grammar,
        pronunciation,
        feedback: format!(
            "Offline estimate for a {} {} response of {words} words. \
             Run online scoring for examiner-style feedback.",
            request.proficiency_level, request.skill
        ),
        strengths,
        improvements,
        band_level: band_label(overall),
        source: ScoreSource::Fallback,
    }
}
