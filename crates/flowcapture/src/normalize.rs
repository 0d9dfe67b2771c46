//! Prompt normalization and tokenization

use once_cell::sync::Lazy;
use regex::Regex;

static PUNCTUATION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\p{P}!-/:-@\[-`{-~]").expect("punctuation pattern"));
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("whitespace pattern"));
static ALPHA_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"[a-zA-Z]+").expect("token pattern"));

/// Lowercase a raw prompt, strip punctuation, and collapse whitespace.
///
/// Zero-width characters are dropped and non-breaking spaces collapse like any
/// other whitespace, so a prompt pasted from a rich-text editor normalizes the
/// same as one typed by hand.
pub fn normalize_prompt(raw: &str) -> String {
    let visible: String = raw
        .chars()
        .filter(|c| {
            !matches!(
                *c,
                '\u{200B}' | // zero-width space
                '\u{200C}' | // zero-width non-joiner
                '\u{200D}' | // zero-width joiner
                '\u{FEFF}' // zero-width no-break space
            )
        })
        .collect::<String>()
        .to_lowercase();

    let stripped = PUNCTUATION.replace_all(&visible, "");
    WHITESPACE.replace_all(&stripped, " ").trim().to_string()
}

/// Maximal ASCII-alphabetic runs of `text`, lowercased, in order.
pub fn alphabetic_tokens(text: &str) -> Vec<String> {
    ALPHA_RUN
        .find_iter(text)
        .map(|m| m.as_str().to_lowercase())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_normalize_basic() {
        assert_eq!(
            normalize_prompt("  Create a project, named \"Apollo\" in   Linear!! "),
            "create a project named apollo in linear"
        );
    }

    #[test]
    fn test_normalize_strips_zero_width_and_nbsp() {
        assert_eq!(normalize_prompt("open\u{00A0}\u{200B}notion"), "open notion");
    }

    #[test]
    fn test_normalize_empty() {
        assert_eq!(normalize_prompt(""), "");
        assert_eq!(normalize_prompt(" ?! "), "");
    }

    #[test]
    fn test_alphabetic_tokens() {
        assert_eq!(
            alphabetic_tokens("filter issues by p1-high xyz123"),
            vec!["filter", "issues", "by", "p", "high", "xyz"]
        );
    }

    proptest! {
        #[test]
        fn prop_no_punctuation_or_double_whitespace(input in "\\PC{0,80}") {
            let out = normalize_prompt(&input);
            prop_assert!(!out.chars().any(|c| c.is_ascii_punctuation()));
            prop_assert!(!out.contains("  "));
            prop_assert!(!out.chars().any(|c| c.is_whitespace() && c != ' '));
            prop_assert_eq!(out.trim(), out.as_str());
        }

        #[test]
        fn prop_normalize_is_idempotent(input in "\\PC{0,80}") {
            let once = normalize_prompt(&input);
            prop_assert_eq!(normalize_prompt(&once), once);
        }
    }
}
