//! Validation report types

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Confidence band of a question match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchBand {
    /// Normalized texts are identical (confidence 1.0)
    Exact,
    /// Reused from the mapping store (confidence 1.0)
    Pinned,
    /// Confidence in [0.9, 1.0)
    Excellent,
    /// Confidence in [0.7, 0.9), manual review recommended
    Good,
    /// Best score below the accept threshold
    Unmatched,
}

/// Best internal candidate for one external question
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionMatch {
    pub external_id: String,
    pub external_text: String,
    pub internal_id: Option<String>,
    pub internal_text: Option<String>,
    /// 0 when unmatched
    pub confidence: f64,
    /// Dimension key of the matched question (the external hint when unmatched)
    pub dimension: Option<String>,
    pub band: MatchBand,
    pub pinned: bool,
    /// Highest candidate score, kept for operator visibility on rejected matches
    pub best_score: f64,
}

impl QuestionMatch {
    pub fn is_matched(&self) -> bool {
        self.internal_id.is_some()
    }
}

/// How many answer entries of the payload will turn into responses
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseStats {
    pub resolvable: usize,
    pub skipped_unmatched: usize,
    pub skipped_unnormalizable: usize,
}

impl ResponseStats {
    pub fn skipped(&self) -> usize {
        self.skipped_unmatched + self.skipped_unnormalizable
    }
}

/// Dry-run report over a whole import payload
///
/// Computed on demand, never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    pub valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub question_matches: Vec<QuestionMatch>,
    pub assessment_count: usize,
    pub dimension_mappings: BTreeMap<String, String>,
    pub response_stats: ResponseStats,
}

impl ValidationResult {
    /// Build a result; `valid` is derived from `errors`
    pub fn new(
        errors: Vec<String>,
        warnings: Vec<String>,
        question_matches: Vec<QuestionMatch>,
        assessment_count: usize,
        dimension_mappings: BTreeMap<String, String>,
        response_stats: ResponseStats,
    ) -> Self {
        Self {
            valid: errors.is_empty(),
            errors,
            warnings,
            question_matches,
            assessment_count,
            dimension_mappings,
            response_stats,
        }
    }

    pub fn matched_count(&self) -> usize {
        self.question_matches.iter().filter(|m| m.is_matched()).count()
    }
}
