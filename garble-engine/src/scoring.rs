//! Heuristic "funniness" used to pick a survivor when no attempt was accepted.

use std::collections::BTreeSet;

pub trait FunninessScorer: Send + Sync {
    /// Higher is funnier.
    fn score(&self, candidate: &str, original: &str) -> f64;
}

/// Rewards drift away from the original wording: the symmetric word-set
/// difference plus twice the number of new words longer than two characters.
#[derive(Debug, Clone, Copy, Default)]
pub struct WordDriftScorer;

fn words(text: &str) -> BTreeSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect()
}

impl WordDriftScorer {
    pub fn difference(candidate: &str, original: &str) -> usize {
        words(candidate)
            .symmetric_difference(&words(original))
            .count()
    }

    pub fn unexpectedness(candidate: &str, original: &str) -> usize {
        let original = words(original);
        words(candidate)
            .iter()
            .filter(|w| w.chars().count() > 2 && !original.contains(*w))
            .count()
    }
}

impl FunninessScorer for WordDriftScorer {
    fn score(&self, candidate: &str, original: &str) -> f64 {
        (Self::difference(candidate, original) + 2 * Self::unexpectedness(candidate, original))
            as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_text_scores_zero() {
        assert_eq!(WordDriftScorer.score("Hello there", "hello, THERE"), 0.0);
    }

    #[test]
    fn counts_difference_and_new_words() {
        // difference: {lol, is, wild, crazy, joke, laugh} = 6
        // unexpected (len > 2): crazy, joke, laugh = 3
        let score = WordDriftScorer.score("This crazy joke laugh", "lol this is wild");
        assert_eq!(score, 12.0);
    }

    #[test]
    fn short_new_words_are_not_unexpected() {
        assert_eq!(WordDriftScorer::unexpectedness("an ox", "a cow"), 0);
        assert_eq!(WordDriftScorer::difference("an ox", "a cow"), 4);
    }
}
