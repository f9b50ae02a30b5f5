//! Text Normalizer & Similarity Scorer
//!
//! `similarity(a, b)` blends a token-set score (tolerates word order and extra words)
//! with a character edit-distance score (tolerates typos and light rewording), both
//! computed on normalized text.
//!
//! # Normalization
//! lowercase → punctuation replaced by spaces → whitespace collapsed → word tokens.
//!
//! # Scoring
//! - empty normalized input: 0.0
//! - identical normalized text: 1.0 (the only way to reach 1.0)
//! - otherwise `token_weight * containment + edit_weight * normalized_levenshtein`,
//!   capped at [`MAX_INEXACT_SCORE`]
//!
//! The token score is the containment `|A ∩ B| / min(|A|, |B|)` over content tokens
//! (stop words removed, plurals folded), so qualifiers present on only one side
//! ("your team", "daily") do not count against a match. Jaccard over raw tokens is
//! still computed for trace logging.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Ceiling for any score that is not an exact normalized match
pub const MAX_INEXACT_SCORE: f64 = 0.999;

/// Sorted for binary search
const STOP_WORDS: &[&str] = &[
    "a", "about", "an", "and", "are", "as", "at", "be", "by", "can", "could", "did", "do",
    "does", "for", "from", "has", "have", "how", "i", "if", "in", "is", "it", "its", "of", "on",
    "or", "our", "should", "so", "that", "the", "their", "there", "this", "to", "us", "was",
    "we", "were", "what", "when", "where", "which", "who", "will", "with", "would", "you",
    "your",
];

/// Blend weights of the two sub-scores
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimilarityWeights {
    pub token: f64,
    pub edit: f64,
}

impl Default for SimilarityWeights {
    fn default() -> Self {
        Self {
            token: 0.5,
            edit: 0.5,
        }
    }
}

/// Lowercase, strip punctuation, collapse whitespace
pub fn normalize_text(input: &str) -> String {
    let replaced: String = input
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();
    replaced.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Text prepared once for repeated scoring
#[derive(Debug, Clone)]
pub struct NormalizedText {
    text: String,
    tokens: BTreeSet<String>,
    content_tokens: BTreeSet<String>,
}

impl NormalizedText {
    pub fn new(input: &str) -> Self {
        let text = normalize_text(input);
        let tokens: BTreeSet<String> = text.split(' ').filter(|t| !t.is_empty()).map(String::from).collect();
        let mut content_tokens: BTreeSet<String> = tokens
            .iter()
            .filter(|t| STOP_WORDS.binary_search(&t.as_str()).is_err())
            .map(|t| fold_plural(t))
            .collect();
        if content_tokens.is_empty() {
            // All stop words ("How do you do?"): fall back to the raw tokens
            content_tokens = tokens.iter().map(|t| fold_plural(t)).collect();
        }

        Self {
            text,
            tokens,
            content_tokens,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Similarity to another prepared text
    pub fn score(&self, other: &NormalizedText, weights: &SimilarityWeights) -> f64 {
        if self.is_empty() || other.is_empty() {
            return 0.0;
        }
        if self.text == other.text {
            return 1.0;
        }

        let token_score = containment(&self.content_tokens, &other.content_tokens);
        let edit_score = strsim::normalized_levenshtein(&self.text, &other.text);

        let total_weight = weights.token + weights.edit;
        let blended = if total_weight > 0.0 {
            (weights.token * token_score + weights.edit * edit_score) / total_weight
        } else {
            0.0
        };

        tracing::trace!(
            a = %self.text,
            b = %other.text,
            token_score,
            edit_score,
            jaccard = jaccard(&self.tokens, &other.tokens),
            blended,
            "Similarity scored"
        );

        blended.clamp(0.0, MAX_INEXACT_SCORE)
    }
}

/// Similarity in [0, 1] with default weights
pub fn similarity(a: &str, b: &str) -> f64 {
    similarity_with(a, b, &SimilarityWeights::default())
}

/// Similarity in [0, 1] with explicit weights
pub fn similarity_with(a: &str, b: &str, weights: &SimilarityWeights) -> f64 {
    NormalizedText::new(a).score(&NormalizedText::new(b), weights)
}

/// |A ∩ B| / |A ∪ B|
pub fn jaccard(a: &BTreeSet<String>, b: &BTreeSet<String>) -> f64 {
    let union = a.union(b).count();
    if union == 0 {
        return 0.0;
    }
    a.intersection(b).count() as f64 / union as f64
}

/// |A ∩ B| / min(|A|, |B|)
pub fn containment(a: &BTreeSet<String>, b: &BTreeSet<String>) -> f64 {
    let smaller = a.len().min(b.len());
    if smaller == 0 {
        return 0.0;
    }
    a.intersection(b).count() as f64 / smaller as f64
}

fn fold_plural(token: &str) -> String {
    let len = token.chars().count();
    if len > 4 && token.ends_with("ies") {
        format!("{}y", &token[..token.len() - 3])
    } else if len > 4 && (token.ends_with("ses") || token.ends_with("xes") || token.ends_with("zes")) {
        token[..token.len() - 2].to_string()
    } else if len > 3 && token.ends_with('s') && !token.ends_with("ss") {
        token[..token.len() - 1].to_string()
    } else {
        token.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(words: &[&str]) -> BTreeSet<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    #[test]
    fn test_stop_words_sorted() {
        assert!(STOP_WORDS.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_normalize_text() {
        assert_eq!(
            normalize_text("  How MATURE is your data-governance?!  "),
            "how mature is your data governance"
        );
        assert_eq!(normalize_text("...!?"), "");
    }

    #[test]
    fn test_exact_after_normalization_is_one() {
        assert_eq!(
            similarity("How mature is your data-governance?", "how mature is your data governance"),
            1.0
        );
    }

    #[test]
    fn test_empty_inputs_score_zero() {
        assert_eq!(similarity("", "Anything"), 0.0);
        assert_eq!(similarity("Anything", "   "), 0.0);
        assert_eq!(similarity("?!", "?!"), 0.0);
    }

    #[test]
    fn test_paraphrase_scores_in_good_band() {
        let score = similarity(
            "Do you use AI in your workflow?",
            "Does your team use AI tools in daily workflow?",
        );
        assert!(score >= 0.7, "paraphrase scored {}", score);
        assert!(score < 0.9, "paraphrase scored {}", score);
    }

    #[test]
    fn test_unrelated_text_scores_low() {
        for internal in [
            "Does your team use AI tools in daily workflow?",
            "How mature is your data governance?",
            "Do you have a budget for AI initiatives?",
        ] {
            let score = similarity("Banana", internal);
            assert!(score < 0.5, "Banana vs {:?} scored {}", internal, score);
        }
    }

    #[test]
    fn test_distinct_questions_stay_below_threshold() {
        let score = similarity("Do you have an AI strategy?", "Do you use AI in your workflow?");
        assert!(score < 0.7, "scored {}", score);
    }

    #[test]
    fn test_inexact_never_reaches_one() {
        let score = similarity("data quality", "data qualities");
        assert!(score < 1.0);
        assert!(score <= MAX_INEXACT_SCORE);
        assert!(score > 0.85);
    }

    #[test]
    fn test_symmetric_and_bounded() {
        let pairs = [
            ("Do you track AI model performance?", "Do you use AI in your workflow?"),
            ("Data quality", "How do you measure data quality?"),
            ("x", "a much longer sentence about nothing"),
        ];
        for (a, b) in pairs {
            let ab = similarity(a, b);
            let ba = similarity(b, a);
            assert!((ab - ba).abs() < 1e-12);
            assert!((0.0..=1.0).contains(&ab));
        }
    }

    #[test]
    fn test_weights_shift_score() {
        let a = "Do you use AI in your workflow?";
        let b = "Does your team use AI tools in daily workflow?";
        let token_only = similarity_with(a, b, &SimilarityWeights { token: 1.0, edit: 0.0 });
        let edit_only = similarity_with(a, b, &SimilarityWeights { token: 0.0, edit: 1.0 });
        assert!(token_only > edit_only);
        assert_eq!(
            similarity_with(a, b, &SimilarityWeights { token: 0.0, edit: 0.0 }),
            0.0
        );
    }

    #[test]
    fn test_set_metrics() {
        let a = set(&["use", "ai", "workflow"]);
        let b = set(&["team", "use", "ai", "tool", "daily", "workflow"]);
        assert_eq!(containment(&a, &b), 1.0);
        assert_eq!(jaccard(&a, &b), 0.5);
        assert_eq!(jaccard(&set(&[]), &set(&[])), 0.0);
    }

    #[test]
    fn test_fold_plural() {
        assert_eq!(fold_plural("tools"), "tool");
        assert_eq!(fold_plural("capabilities"), "capability");
        assert_eq!(fold_plural("processes"), "process");
        assert_eq!(fold_plural("process"), "process");
        assert_eq!(fold_plural("ais"), "ais");
    }
}
