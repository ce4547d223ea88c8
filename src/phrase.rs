//! Fuzzy matching of a transcription against the expected challenge phrase.

use crate::defaults;
use std::collections::HashSet;

/// How closely a transcription matched the expected phrase.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhraseScore {
    /// Jaccard similarity of the word sets, 1.0 for an exact match
    pub similarity: f32,
    /// Normalized strings were identical
    pub exact: bool,
}

/// Word-set phrase matcher with a fixed acceptance threshold.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhraseMatcher {
    threshold: f32,
}

impl Default for PhraseMatcher {
    fn default() -> Self {
        Self::new(defaults::PHRASE_MATCH_THRESHOLD)
    }
}

impl PhraseMatcher {
    pub fn new(threshold: f32) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// Score `transcription` against `expected`.
    ///
    /// `None` when the expected phrase is empty after normalization. An empty
    /// transcription scores 0.0 like any other disjoint word set.
    pub fn score(&self, transcription: &str, expected: &str) -> Option<PhraseScore> {
        let heard = normalize(transcription);
        let wanted = normalize(expected);
        if wanted.is_empty() {
            return None;
        }
        if heard == wanted {
            return Some(PhraseScore {
                similarity: 1.0,
                exact: true,
            });
        }
        Some(PhraseScore {
            similarity: jaccard(&heard, &wanted),
            exact: false,
        })
    }

    pub fn is_match(&self, transcription: &str, expected: &str) -> bool {
        match self.score(transcription, expected) {
            Some(score) if score.exact || score.similarity >= self.threshold => {
                tracing::debug!(
                    similarity = score.similarity,
                    threshold = self.threshold,
                    "phrase matched"
                );
                true
            }
            Some(score) => {
                tracing::warn!(
                    heard = %normalize(transcription),
                    expected = %normalize(expected),
                    similarity = score.similarity,
                    threshold = self.threshold,
                    "phrase rejected"
                );
                false
            }
            None => {
                tracing::warn!(
                    heard = %normalize(transcription),
                    expected = %normalize(expected),
                    "phrase rejected: expected phrase is empty"
                );
                false
            }
        }
    }
}

/// Whether `transcription` says `expected` closely enough.
pub fn is_match(transcription: &str, expected: &str, threshold: f32) -> bool {
    PhraseMatcher::new(threshold).is_match(transcription, expected)
}

fn normalize(text: &str) -> String {
    text.trim().to_lowercase()
}

fn jaccard(a: &str, b: &str) -> f32 {
    let a: HashSet<&str> = a.split_whitespace().collect();
    let b: HashSet<&str> = b.split_whitespace().collect();
    let union = a.union(&b).count();
    if union == 0 {
        return 0.0;
    }
    a.intersection(&b).count() as f32 / union as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn word_order_does_not_matter() {
        assert!(is_match("ola mundo", "mundo ola", 0.5));
        let score = PhraseMatcher::default().score("ola mundo", "mundo ola").unwrap();
        assert_eq!(score.similarity, 1.0);
        assert!(!score.exact);
    }

    #[test]
    fn exact_match_passes_any_threshold() {
        assert!(is_match("Open Sesame", "open sesame ", 0.99));
        assert!(is_match("open sesame", "open sesame", 1.5));
    }

    #[test]
    fn empty_expected_never_matches() {
        assert!(!is_match("", "", 0.0));
        assert!(!is_match("anything", "   ", 0.0));
    }

    #[test]
    fn empty_transcription_scores_zero() {
        let score = PhraseMatcher::default().score("  \t", "ola mundo").unwrap();
        assert_eq!(score.similarity, 0.0);
        assert!(!score.exact);
        assert!(!is_match("  \t", "ola mundo", 0.5));
        assert!(is_match("", "ola mundo", 0.0));
    }

    #[test]
    fn disjoint_words_fail() {
        assert!(!is_match("completamente diferente", "ola mundo", 0.5));
        let score = PhraseMatcher::default()
            .score("completamente diferente", "ola mundo")
            .unwrap();
        assert_eq!(score.similarity, 0.0);
    }

    #[test]
    fn partial_overlap_against_threshold() {
        // {the, quick, brown} vs {the, quick, fox}: 2 / 4
        assert!(is_match("the quick brown", "the quick fox", 0.5));
        assert!(!is_match("the quick brown", "the quick fox", 0.51));
    }

    #[test]
    fn duplicate_words_count_once() {
        let score = PhraseMatcher::default()
            .score("hello hello world", "hello world")
            .unwrap();
        assert_eq!(score.similarity, 1.0);
    }

    #[test]
    fn unicode_case_folding() {
        assert!(is_match("ÉSTA ES MI VOZ", "ésta es mi voz", 0.99));
    }

    #[test]
    fn matcher_keeps_threshold() {
        assert_eq!(PhraseMatcher::default().threshold(), 0.5);
        assert_eq!(PhraseMatcher::new(0.8).threshold(), 0.8);
    }
}
