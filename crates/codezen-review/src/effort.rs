//! Effort extraction from raw model output.
//!
//! Models are asked for strict JSON but routinely wrap it in prose, truncate
//! it, or ignore the schema. Extraction therefore never parses JSON: it walks
//! an ordered table of textual rules and returns the first hit.

use once_cell::sync::Lazy;
use regex::Regex;

type Rule = fn(&str) -> Option<String>;

/// Rules in priority order. The first one that yields a value wins.
const RULES: &[(&str, Rule)] = &[
    ("snake_case key", snake_case_key),
    ("camelCase key", camel_case_key),
    ("out of ten", out_of_ten),
    ("labelled effort", labelled_effort),
    ("keywords", keywords),
];

static OUT_OF_TEN: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"(?i)([0-9]+)\s*(?:/|out\s+of)\s*10").ok());

static LABELLED: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"(?i)effort[\s:]+([0-9]+)").ok());

const KEYWORDS: &[(&[&str], &str)] = &[
    (&["minor", "simple", "easy"], "2/10"),
    (&["moderate", "medium"], "5/10"),
    (&["major", "significant", "complex"], "8/10"),
];

/// Extract a normalized effort estimate (usually `"N/10"`) from model output.
///
/// Returns `None` for empty input or when no rule matches. Never fails.
///
/// # Examples
///
/// ```
/// use codezen_review::effort::extract_effort;
///
/// assert_eq!(extract_effort("{\"effort_estimation\": \"7/10\"").as_deref(), Some("7/10"));
/// assert_eq!(extract_effort("This needs 8 out of 10 effort.").as_deref(), Some("8/10"));
/// assert_eq!(extract_effort("This is a minor style nit.").as_deref(), Some("2/10"));
/// assert_eq!(extract_effort("Looks good to me."), None);
/// ```
pub fn extract_effort(response: &str) -> Option<String> {
    if response.trim().is_empty() {
        return None;
    }
    RULES.iter().find_map(|(name, rule)| {
        let hit = rule(response)?;
        tracing::debug!(rule = *name, effort = %hit, "effort extracted");
        Some(hit)
    })
}

fn snake_case_key(text: &str) -> Option<String> {
    quoted_value_after(text, "\"effort_estimation\"")
}

fn camel_case_key(text: &str) -> Option<String> {
    quoted_value_after(text, "\"effortEstimation\"")
}

/// Text between the first two `"` that follow the first occurrence of `key`.
fn quoted_value_after(text: &str, key: &str) -> Option<String> {
    let after_key = &text[text.find(key)? + key.len()..];
    let open = after_key.find('"')?;
    let rest = &after_key[open + 1..];
    let close = rest.find('"')?;
    let value = &rest[..close];
    if value.trim().is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

fn out_of_ten(text: &str) -> Option<String> {
    first_number(OUT_OF_TEN.as_ref()?, text)
}

fn labelled_effort(text: &str) -> Option<String> {
    first_number(LABELLED.as_ref()?, text)
}

fn first_number(re: &Regex, text: &str) -> Option<String> {
    let digits = re.captures(text)?.get(1)?.as_str();
    Some(format!("{digits}/10"))
}

fn keywords(text: &str) -> Option<String> {
    let lower = text.to_lowercase();
    KEYWORDS
        .iter()
        .find(|(words, _)| words.iter().any(|w| lower.contains(w)))
        .map(|(_, effort)| (*effort).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snake_key_in_well_formed_json() {
        let response = r#"{"summary": "ok", "findings": [], "effort_estimation": "3/10"}"#;
        assert_eq!(extract_effort(response).as_deref(), Some("3/10"));
    }

    #[test]
    fn snake_key_in_malformed_text() {
        let response = "Sure! Here is the review:\n{\"summary\": \"Type bug\", \"findings\": [ {\"line\": 3,\n\"effort_estimation\": \"7/10\"  trailing garbage";
        assert_eq!(extract_effort(response).as_deref(), Some("7/10"));
    }

    #[test]
    fn snake_key_wins_over_other_patterns() {
        let response = "2 out of 10 effort: 9, major work. \"effort_estimation\": \"6/10\"";
        assert_eq!(extract_effort(response).as_deref(), Some("6/10"));
    }

    #[test]
    fn camel_key_used_when_snake_absent() {
        let response = r#"{"summary": "fine", "effortEstimation": "4/10"}"#;
        assert_eq!(extract_effort(response).as_deref(), Some("4/10"));
    }

    #[test]
    fn key_value_is_returned_verbatim() {
        let response = r#"{"effort_estimation": "Low (2/10)"}"#;
        assert_eq!(extract_effort(response).as_deref(), Some("Low (2/10)"));
    }

    #[test]
    fn blank_key_value_falls_through() {
        let response = r#"{"effort_estimation": "  ", "note": "a simple change"}"#;
        // The scan lands on the blank string, so later rules decide.
        assert_eq!(extract_effort(response).as_deref(), Some("2/10"));
    }

    #[test]
    fn unterminated_key_value_falls_through() {
        let response = "\"effort_estimation\": \"5/10";
        assert_eq!(extract_effort(response).as_deref(), Some("5/10"));
    }

    #[test]
    fn slash_ten_pattern() {
        assert_eq!(
            extract_effort("I'd rate this 6/10 for complexity.").as_deref(),
            Some("6/10")
        );
        assert_eq!(extract_effort("score: 9 / 10").as_deref(), Some("9/10"));
    }

    #[test]
    fn out_of_ten_pattern() {
        assert_eq!(
            extract_effort("This needs 8 out of 10 effort.").as_deref(),
            Some("8/10")
        );
        assert_eq!(extract_effort("roughly 5 OUT OF 10").as_deref(), Some("5/10"));
    }

    #[test]
    fn first_out_of_ten_match_wins() {
        assert_eq!(
            extract_effort("Before: 9/10, after: 2/10").as_deref(),
            Some("9/10")
        );
    }

    #[test]
    fn labelled_effort_pattern() {
        assert_eq!(
            extract_effort("Effort: 3, fairly simple fix.").as_deref(),
            Some("3/10")
        );
        assert_eq!(extract_effort("EFFORT 7").as_deref(), Some("7/10"));
    }

    #[test]
    fn keyword_groups() {
        assert_eq!(
            extract_effort("This is a minor style nit.").as_deref(),
            Some("2/10")
        );
        assert_eq!(
            extract_effort("A Moderate amount of cleanup.").as_deref(),
            Some("5/10")
        );
        assert_eq!(
            extract_effort("Needs a significant rework.").as_deref(),
            Some("8/10")
        );
    }

    #[test]
    fn low_effort_keywords_checked_first() {
        assert_eq!(
            extract_effort("A complex module with one easy fix.").as_deref(),
            Some("2/10")
        );
    }

    #[test]
    fn keywords_match_inside_words() {
        assert_eq!(extract_effort("Simplest path forward.").as_deref(), Some("2/10"));
    }

    #[test]
    fn nothing_to_extract() {
        assert_eq!(extract_effort(""), None);
        assert_eq!(extract_effort("   \n"), None);
        assert_eq!(extract_effort("Looks good to me."), None);
        assert_eq!(extract_effort("{\"summary\": \"clean\"}"), None);
    }

    #[test]
    fn fallback_texts_yield_nothing() {
        assert_eq!(
            extract_effort(
                "Error: Unable to connect to Ollama. Please ensure Ollama is running on http://localhost:11434"
            ),
            None
        );
        assert_eq!(
            extract_effort("Error parsing response: expected value at line 1 column 1"),
            None
        );
    }

    #[test]
    fn extraction_is_deterministic() {
        let inputs = [
            "\"effortEstimation\": \"4/10\"",
            "6/10",
            "Effort: 3",
            "major rewrite",
            "",
            "nothing",
        ];
        for input in inputs {
            assert_eq!(extract_effort(input), extract_effort(input), "{input}");
        }
    }

    #[test]
    fn patterns_compile() {
        assert!(OUT_OF_TEN.is_some());
        assert!(LABELLED.is_some());
    }
}
