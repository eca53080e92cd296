//! Slug identifiers for habits and checklists.

use once_cell::sync::Lazy;
use regex::Regex;

/// Identifier used when a title slugs down to nothing.
pub const FALLBACK_ID: &str = "unnamed_habit";

static VALID_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9_]+$").expect("valid id regex"));
static NON_ID_RUN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^a-z0-9_]+").expect("valid id run regex"));
static REPEATED_UNDERSCORE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"_{2,}").expect("valid underscore regex"));

/// Derive a stable identifier from a human title.
///
/// `"Sleep Quality (1-10)"` becomes `"sleep_quality_1_10"`. The output always
/// satisfies [`is_valid_id`] and is a fixed point of this function.
pub fn generate_id_from_title(title: &str) -> String {
    let lower = title.to_lowercase();
    let replaced = NON_ID_RUN.replace_all(&lower, "_");
    let collapsed = REPEATED_UNDERSCORE.replace_all(&replaced, "_");
    let trimmed = collapsed.trim_matches('_');

    if trimmed.is_empty() {
        FALLBACK_ID.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Whether `id` matches `^[a-z0-9_]+$`.
pub fn is_valid_id(id: &str) -> bool {
    VALID_ID.is_match(id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_id_examples() {
        assert_eq!(generate_id_from_title("Sleep Quality (1-10)"), "sleep_quality_1_10");
        assert_eq!(generate_id_from_title("Morning Run"), "morning_run");
        assert_eq!(generate_id_from_title("  __Deep   Work__ "), "deep_work");
        assert_eq!(generate_id_from_title("already_valid_id"), "already_valid_id");
    }

    #[test]
    fn test_generate_id_fallback() {
        assert_eq!(generate_id_from_title(""), FALLBACK_ID);
        assert_eq!(generate_id_from_title("!!!"), FALLBACK_ID);
        assert_eq!(generate_id_from_title("___"), FALLBACK_ID);
    }

    #[test]
    fn test_generate_id_is_idempotent_and_valid() {
        let titles = [
            "Sleep Quality (1-10)",
            "Café au lait ☕",
            "a--b__c  d",
            "UPPER case",
            "_leading and trailing_",
            "🙂",
            "x",
        ];
        for title in titles {
            let once = generate_id_from_title(title);
            assert_eq!(generate_id_from_title(&once), once, "title: {title}");
            assert!(is_valid_id(&once), "title: {title} -> {once}");
        }
    }

    #[test]
    fn test_is_valid_id() {
        assert!(is_valid_id("wake_up"));
        assert!(is_valid_id("habit_2"));
        assert!(!is_valid_id(""));
        assert!(!is_valid_id("Wake_up"));
        assert!(!is_valid_id("wake-up"));
        assert!(!is_valid_id("wake up"));
    }
}
