//! Question Matcher
//!
//! Picks the single best internal question for an external question.
//!
//! # Algorithm
//! 1. A pinned mapping whose question still exists wins unconditionally (confidence 1.0).
//! 2. Otherwise every internal question is scored with [`similarity`]; a candidate in the
//!    dimension named by the external `dimensionHint` gets `dimension_bonus`.
//! 3. Highest score wins. Ties: bonus applied, then lower `order`, then first seen.
//! 4. Scores below `accept_threshold`, and zero scores under any threshold, are reported
//!    as unmatched (confidence 0, `best_score` keeps the number for the operator).
//!
//! [`similarity`]: super::similarity

use assess_common::db::InternalQuestion;
use std::cmp::Ordering;
use tracing::debug;

use super::similarity::{NormalizedText, MAX_INEXACT_SCORE};
use crate::config::ImportSettings;
use crate::models::{ExternalQuestion, MatchBand, QuestionMatch};

struct Candidate<'a> {
    question: &'a InternalQuestion,
    normalized: NormalizedText,
}

/// Scored candidate, ordered best-first by [`ScoredCandidate::rank`]
#[derive(Debug, Clone, Copy)]
struct ScoredCandidate {
    index: usize,
    score: f64,
    exact: bool,
    bonus: bool,
    order: i64,
}

impl ScoredCandidate {
    /// `Ordering::Less` means `self` ranks ahead of `other`
    fn rank(&self, other: &Self) -> Ordering {
        other
            .score
            .partial_cmp(&self.score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| other.bonus.cmp(&self.bonus))
            .then_with(|| self.order.cmp(&other.order))
            .then_with(|| self.index.cmp(&other.index))
    }
}

/// Matches external questions against one model's question set
///
/// Internal texts are normalized once at construction; the matcher is read-only
/// afterwards and can be shared across threads.
pub struct QuestionMatcher<'a> {
    candidates: Vec<Candidate<'a>>,
    settings: &'a ImportSettings,
}

impl<'a> QuestionMatcher<'a> {
    pub fn new(questions: &'a [InternalQuestion], settings: &'a ImportSettings) -> Self {
        let candidates = questions
            .iter()
            .map(|question| Candidate {
                question,
                normalized: NormalizedText::new(&question.text),
            })
            .collect();

        Self {
            candidates,
            settings,
        }
    }

    /// Internal question by id, if it is part of this model
    pub fn find(&self, internal_id: &str) -> Option<&'a InternalQuestion> {
        self.candidates
            .iter()
            .find(|c| c.question.id == internal_id)
            .map(|c| c.question)
    }

    /// Best match for `external`
    ///
    /// `pinned` is the internal id stored in the mapping store for this external id; it
    /// is ignored when that question no longer exists (callers detect this with
    /// [`QuestionMatcher::find`] to warn about it).
    pub fn match_question(&self, external: &ExternalQuestion, pinned: Option<&str>) -> QuestionMatch {
        if let Some(question) = pinned.and_then(|id| self.find(id)) {
            debug!(
                external_id = %external.external_id,
                internal_id = %question.id,
                "Using pinned mapping"
            );
            return QuestionMatch {
                external_id: external.external_id.clone(),
                external_text: external.text.clone(),
                internal_id: Some(question.id.clone()),
                internal_text: Some(question.text.clone()),
                confidence: 1.0,
                dimension: Some(question.dimension_key.clone()),
                band: MatchBand::Pinned,
                pinned: true,
                best_score: 1.0,
            };
        }

        let external_text = NormalizedText::new(&external.text);
        let hint = external
            .dimension_hint
            .as_deref()
            .map(|h| h.trim().to_lowercase())
            .filter(|h| !h.is_empty());

        let best = self
            .candidates
            .iter()
            .enumerate()
            .map(|(index, candidate)| self.score_candidate(index, candidate, &external_text, hint.as_deref()))
            .min_by(|a, b| a.rank(b));

        let Some(best) = best else {
            debug!(external_id = %external.external_id, "No internal questions to match against");
            return self.unmatched(external, 0.0);
        };

        if best.score <= 0.0 || best.score < self.settings.accept_threshold {
            debug!(
                external_id = %external.external_id,
                best_score = best.score,
                "No candidate above accept threshold"
            );
            return self.unmatched(external, best.score);
        }

        let question = self.candidates[best.index].question;
        let band = if best.exact {
            MatchBand::Exact
        } else if best.score >= self.settings.excellent_threshold {
            MatchBand::Excellent
        } else {
            MatchBand::Good
        };

        debug!(
            external_id = %external.external_id,
            internal_id = %question.id,
            confidence = best.score,
            dimension_bonus = best.bonus,
            band = ?band,
            "Question matched"
        );

        QuestionMatch {
            external_id: external.external_id.clone(),
            external_text: external.text.clone(),
            internal_id: Some(question.id.clone()),
            internal_text: Some(question.text.clone()),
            confidence: best.score,
            dimension: Some(question.dimension_key.clone()),
            band,
            pinned: false,
            best_score: best.score,
        }
    }

    fn score_candidate(
        &self,
        index: usize,
        candidate: &Candidate<'_>,
        external_text: &NormalizedText,
        hint: Option<&str>,
    ) -> ScoredCandidate {
        let base = external_text.score(&candidate.normalized, &self.settings.weights);
        let exact = !external_text.is_empty() && external_text.as_str() == candidate.normalized.as_str();
        // No bonus without textual evidence
        let bonus =
            base > 0.0 && hint.is_some_and(|h| candidate.question.dimension_key.trim().to_lowercase() == h);

        // Only exact text may reach 1.0, the bonus included
        let ceiling = if exact { 1.0 } else { MAX_INEXACT_SCORE };
        let score = if bonus {
            (base + self.settings.dimension_bonus).min(ceiling)
        } else {
            base
        };

        ScoredCandidate {
            index,
            score,
            exact,
            bonus,
            order: candidate.question.order,
        }
    }

    fn unmatched(&self, external: &ExternalQuestion, best_score: f64) -> QuestionMatch {
        QuestionMatch {
            external_id: external.external_id.clone(),
            external_text: external.text.clone(),
            internal_id: None,
            internal_text: None,
            confidence: 0.0,
            dimension: external.dimension_hint.clone(),
            band: MatchBand::Unmatched,
            pinned: false,
            best_score,
        }
    }
}
