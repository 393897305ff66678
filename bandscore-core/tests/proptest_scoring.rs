//! Property-based tests for band coercion, rounding and validation.

use proptest::prelude::*;
use serde_json::json;

use bandscore_core::score::{band_label, round_band};
use bandscore_core::validator::{coerce, coerce_band, normalize, parse_model_json};
use bandscore_core::{PromptBuilder, ProficiencyLevel, ScoreRequest, Skill};

fn reply(overall: f64, band: f64, comments: usize) -> String {
    json!({
        "overallBand": overall,
        "criteria": { "taskResponse": band, "coherence": band, "lexical": band, "grammar": band },
        "comments": (0..comments).map(|i| format!("Point {i}.")).collect::<Vec<_>>(),
    })
    .to_string()
}

// --- Band coercion properties ---

proptest! {
    #[test]
    fn coerced_number_is_within_range(v in -1.0e6f64..1.0e6) {
        let band = coerce_band(&json!(v)).unwrap();
        prop_assert!((0.0..=9.0).contains(&band));
    }

    #[test]
    fn coerced_string_matches_number(v in -20.0f64..20.0) {
        prop_assert_eq!(coerce_band(&json!(v.to_string())), coerce_band(&json!(v)));
    }

    #[test]
    fn in_range_numbers_are_unchanged(v in 0.0f64..=9.0) {
        prop_assert_eq!(coerce_band(&json!(v)), Some(v));
    }

    #[test]
    fn non_numeric_strings_are_rejected(s in "[a-zA-Z ]{1,12}") {
        prop_assert_eq!(coerce_band(&json!(s)), None);
    }
}

// --- Rounding properties ---

proptest! {
    #[test]
    fn rounding_is_within_half_step(v in 0.0f64..=9.0) {
        let rounded = round_band(v);
        prop_assert!((rounded - v).abs() <= 0.05 + 1e-9);
        prop_assert!((0.0..=9.0).contains(&rounded));
    }

    #[test]
    fn rounding_is_idempotent(v in 0.0f64..=9.0) {
        let once = round_band(v);
        prop_assert_eq!(round_band(once), once);
    }

    #[test]
    fn label_parses_back_to_band(v in 0.0f64..=9.0) {
        let rounded = round_band(v);
        let parsed: f64 = band_label(v).parse().unwrap();
        prop_assert_eq!(parsed, rounded);
    }
}

// --- Validation properties ---

proptest! {
    #[test]
    fn comment_count_gates_validation(count in 0usize..12, band in 0.0f64..=9.0) {
        let result = normalize(&reply(band, band, count), Skill::Writing);
        prop_assert_eq!(result.is_ok(), (3..=8).contains(&count));
    }

    #[test]
    fn normalized_bands_stay_in_range(overall in -50.0f64..50.0, band in -50.0f64..50.0) {
        let record = normalize(&reply(overall, band, 4), Skill::Writing).unwrap();
        prop_assert!((0.0..=9.0).contains(&record.overall));
        prop_assert!((0.0..=9.0).contains(&record.grammar));
        let task = record.task_response.unwrap();
        prop_assert!((task - band.clamp(0.0, 9.0)).abs() < 1e-9);
    }

    #[test]
    fn wrapped_json_parses_like_bare_json(prefix in "[a-zA-Z :\n]{0,30}", suffix in "[a-zA-Z .\n]{0,30}") {
        let bare = reply(6.5, 6.0, 3);
        let wrapped = format!("{prefix}{bare}{suffix}");
        let a = coerce(&parse_model_json(&bare).unwrap(), Skill::Writing);
        let b = coerce(&parse_model_json(&wrapped).unwrap(), Skill::Writing);
        prop_assert_eq!(a, b);
    }
}

// --- Prompt properties ---

proptest! {
    #[test]
    fn prompt_always_embeds_text(text in "[a-zA-Z0-9 .,!?\n]{1,200}", idx in 0usize..6) {
        let level = ProficiencyLevel::ALL[idx];
        let request = ScoreRequest::new(text.clone(), Skill::Speaking).with_level(level);
        let prompt = PromptBuilder::new().build(&request);
        prop_assert!(prompt.contains(&text));
        prop_assert!(prompt.contains(level.as_str()));
    }
}
