//! Level calibration profiles.
//!
//! A fixed table keyed by [`ProficiencyLevel`] describing how feedback
//! should read for a learner at that level. The table is static data and
//! never mutated, so concurrent requests share it without synchronisation.

use crate::score::ProficiencyLevel;

/// Tone, vocabulary, structure and depth directives for one level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalibrationProfile {
    pub level: ProficiencyLevel,
    /// Sentence embedded verbatim in every prompt for this level.
    pub phrase: &'static str,
    pub tone: &'static str,
    pub vocabulary: &'static str,
    pub structure: &'static str,
    pub feedback_depth: &'static str,
}

/// Indexed in [`ProficiencyLevel::ALL`] order.
static PROFILES: [CalibrationProfile; 6] = [
    CalibrationProfile {
        level: ProficiencyLevel::A1,
        phrase: "Calibrate all feedback for an A1 (beginner) learner.",
        tone: "Very encouraging and patient; celebrate every correct sentence.",
        vocabulary: "Use only the most common everyday words; avoid all grammar terminology.",
        structure: "One idea per comment, in short simple sentences.",
        feedback_depth: "Point out at most one or two basic errors and show the corrected form.",
    },
    CalibrationProfile {
        level: ProficiencyLevel::A2,
        phrase: "Calibrate all feedback for an A2 (elementary) learner.",
        tone: "Warm and encouraging; frame mistakes as next steps.",
        vocabulary: "Use simple high-frequency words; name grammar points only when essential.",
        structure: "Short sentences with a concrete example in each comment.",
        feedback_depth: "Focus on the most frequent errors in basic tenses and word order.",
    },
    CalibrationProfile {
        level: ProficiencyLevel::B1,
        phrase: "Calibrate all feedback for a B1 (intermediate) learner.",
        tone: "Supportive and clear; balance praise with direct correction.",
        vocabulary: "Plain language with common grammar terms such as tense, article and linking word.",
        structure: "Each comment names an issue, quotes an example and suggests a fix.",
        feedback_depth: "Cover task achievement, paragraphing and recurring grammar patterns.",
    },
    CalibrationProfile {
        level: ProficiencyLevel::B2,
        phrase: "Calibrate all feedback for a B2 (upper-intermediate) learner.",
        tone: "Constructive and direct; treat the learner as capable of independent revision.",
        vocabulary: "Standard IELTS rubric terminology is appropriate.",
        structure: "Group comments by criterion, each with a quoted example and a rewrite.",
        feedback_depth: "Address cohesion, range of structures and precision of word choice.",
    },
    CalibrationProfile {
        level: ProficiencyLevel::C1,
        phrase: "Calibrate all feedback for a C1 (advanced) learner.",
        tone: "Professional and exacting; acknowledge strengths briefly.",
        vocabulary: "Precise linguistic terminology, including collocation, register and hedging.",
        structure: "Dense, criterion-referenced comments with targeted rewrites.",
        feedback_depth: "Focus on nuance: register, idiomatic collocation and argument development.",
    },
    CalibrationProfile {
        level: ProficiencyLevel::C2,
        phrase: "Calibrate all feedback for a C2 (proficient) learner.",
        tone: "Peer-level and rigorous; hold the response to band 9 descriptors.",
        vocabulary: "Full academic and linguistic terminology.",
        structure: "Concise, examiner-style observations referencing band descriptors.",
        feedback_depth: "Identify the subtle lapses that separate band 8 from band 9.",
    },
];

/// Profile for a known level.
pub fn profile_for(level: ProficiencyLevel) -> &'static CalibrationProfile {
    let index = match level {
        ProficiencyLevel::A1 => 0,
        ProficiencyLevel::A2 => 1,
        ProficiencyLevel::B1 => 2,
        ProficiencyLevel::B2 => 3,
        ProficiencyLevel::C1 => 4,
        ProficiencyLevel::C2 => 5,
    };
    &PROFILES[index]
}

/// Profile for a free-form level label, using the B1 profile when the
/// label is not recognised.
pub fn profile_for_label(label: &str) -> &'static CalibrationProfile {
    profile_for(ProficiencyLevel::parse_or_default(label))
}
