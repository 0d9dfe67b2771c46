//! Fuzzy vocabulary matching
//!
//! Tokens are resolved against the vocabulary with a similarity ratio
//! (`2 * matches / (len_a + len_b)` over a character diff). A candidate wins
//! when it clears the cutoff; among candidates with the same best score the
//! lexicographically greatest word wins.

use crate::config::VocabularyTables;
use crate::normalize::alphabetic_tokens;
use crate::types::{AppName, IntentKind, ObjectClass};
use similar::TextDiff;
use tracing::debug;

/// Similarity ratio in `0.0..=1.0` between two words
pub type SimilarityFn = fn(&str, &str) -> f32;

/// Character-level diff ratio. Identical strings score 1.0.
pub fn char_ratio(a: &str, b: &str) -> f32 {
    TextDiff::from_chars(a, b).ratio()
}

/// Nearest-neighbour lookup over a fixed word list
#[derive(Clone)]
pub struct FuzzyMatcher {
    similarity: SimilarityFn,
    cutoff: f32,
}

impl std::fmt::Debug for FuzzyMatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FuzzyMatcher")
            .field("cutoff", &self.cutoff)
            .finish()
    }
}

impl Default for FuzzyMatcher {
    fn default() -> Self {
        Self::new(0.7)
    }
}

impl FuzzyMatcher {
    pub fn new(cutoff: f32) -> Self {
        Self {
            similarity: char_ratio,
            cutoff,
        }
    }

    /// Swap the similarity function, keeping the cutoff
    pub fn with_similarity(mut self, similarity: SimilarityFn) -> Self {
        self.similarity = similarity;
        self
    }

    pub fn cutoff(&self) -> f32 {
        self.cutoff
    }

    /// Best candidate for `token` scoring at least the cutoff
    pub fn closest<'a, I>(&self, token: &str, candidates: I) -> Option<&'a str>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut best: Option<(f32, &'a str)> = None;
        for candidate in candidates {
            let score = (self.similarity)(token, candidate);
            if score < self.cutoff {
                continue;
            }
            best = match best {
                Some((s, w)) if s > score || (s == score && w >= candidate) => Some((s, w)),
                _ => Some((score, candidate)),
            };
        }
        best.map(|(_, word)| word)
    }
}

/// Resolves app, intent and object from a normalized prompt
#[derive(Debug, Clone)]
pub struct VocabularyMatcher<'v> {
    vocabulary: &'v VocabularyTables,
    fuzzy: FuzzyMatcher,
}

impl<'v> VocabularyMatcher<'v> {
    pub fn new(vocabulary: &'v VocabularyTables, fuzzy: FuzzyMatcher) -> Self {
        Self { vocabulary, fuzzy }
    }

    /// First token (in prompt order) that resolves to a known app
    pub fn detect_app(&self, normalized: &str) -> Option<AppName> {
        let lowered: Vec<(String, &AppName)> = self
            .vocabulary
            .apps()
            .iter()
            .map(|app| (app.as_str().to_lowercase(), app))
            .collect();

        for token in alphabetic_tokens(normalized) {
            let hit = self
                .fuzzy
                .closest(&token, lowered.iter().map(|(l, _)| l.as_str()));
            if let Some(word) = hit {
                let app = lowered
                    .iter()
                    .find(|(l, _)| l == word)
                    .map(|(_, app)| (*app).clone());
                debug!("[matcher] token {token:?} -> app {word:?}");
                return app;
            }
        }
        None
    }

    /// Single pass over the tokens; intent and object each take the first
    /// token that clears the cutoff against their own vocabulary.
    pub fn detect_intent_object(
        &self,
        normalized: &str,
    ) -> (Option<IntentKind>, Option<ObjectClass>) {
        let verbs = self.vocabulary.verbs();
        let nouns = self.vocabulary.nouns();
        let mut intent = None;
        let mut object = None;

        for token in alphabetic_tokens(normalized) {
            if intent.is_none() {
                if let Some(verb) = self.fuzzy.closest(&token, verbs.keys().map(String::as_str)) {
                    debug!("[matcher] token {token:?} -> verb {verb:?}");
                    intent = verbs.get(verb).copied();
                }
            }
            if object.is_none() {
                if let Some(noun) = self.fuzzy.closest(&token, nouns.keys().map(String::as_str)) {
                    debug!("[matcher] token {token:?} -> noun {noun:?}");
                    object = nouns.get(noun).cloned();
                }
            }
            if intent.is_some() && object.is_some() {
                break;
            }
        }
        (intent, object)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;

    fn vocab() -> VocabularyTables {
        Settings::builtin().unwrap().vocabulary
    }

    #[test]
    fn test_char_ratio() {
        assert_eq!(char_ratio("linear", "linear"), 1.0);
        let typo = char_ratio("liner", "linear");
        assert!((typo - 10.0 / 11.0).abs() < 1e-6, "got {typo}");
        assert!(char_ratio("xyz", "linear") < 0.7);
    }

    #[test]
    fn test_closest_respects_cutoff() {
        let m = FuzzyMatcher::new(0.7);
        assert_eq!(m.closest("projct", ["project", "page"]), Some("project"));
        assert_eq!(m.closest("zzz", ["project", "page"]), None);
    }

    #[test]
    fn test_closest_tie_prefers_greater_word() {
        let m = FuzzyMatcher::new(0.0).with_similarity(|_, _| 0.5);
        assert_eq!(m.closest("x", ["alpha", "beta", "abc"]), Some("beta"));
    }

    #[test]
    fn test_detect_app_typo_and_miss() {
        let v = vocab();
        let m = VocabularyMatcher::new(&v, FuzzyMatcher::default());
        assert_eq!(
            m.detect_app("create project in liner"),
            Some(AppName::new("Linear"))
        );
        assert_eq!(m.detect_app("xyz123"), None);
    }

    #[test]
    fn test_detect_app_first_token_wins() {
        let v = vocab();
        let m = VocabularyMatcher::new(&v, FuzzyMatcher::default());
        assert_eq!(
            m.detect_app("move from notion to linear"),
            Some(AppName::new("Notion"))
        );
    }

    #[test]
    fn test_detect_intent_object() {
        let v = vocab();
        let m = VocabularyMatcher::new(&v, FuzzyMatcher::default());
        assert_eq!(
            m.detect_intent_object("create a project named apollo in linear"),
            (Some(IntentKind::Create), Some(ObjectClass::new("project")))
        );
        assert_eq!(
            m.detect_intent_object("filter issues by priority high"),
            (Some(IntentKind::Filter), Some(ObjectClass::new("issue")))
        );
        assert_eq!(m.detect_intent_object("hello there"), (None, None));
    }

    #[test]
    fn test_detection_is_deterministic() {
        let v = vocab();
        let m = VocabularyMatcher::new(&v, FuzzyMatcher::default());
        let prompt = "make a tiket for the bug in linar";
        let first = (m.detect_app(prompt), m.detect_intent_object(prompt));
        let second = (m.detect_app(prompt), m.detect_intent_object(prompt));
        assert_eq!(first, second);
    }
}
