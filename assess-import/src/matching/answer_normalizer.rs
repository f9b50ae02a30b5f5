//! Answer Scale Normalizer
//!
//! Maps a raw external value onto one of an internal question's discrete answers:
//! the value is clamped into the external scale, projected linearly onto the internal
//! score range, and the answer with the nearest score is chosen.

use assess_common::db::{InternalAnswer, InternalQuestion};
use serde_json::Value;
use std::cmp::Ordering;
use thiserror::Error;

use crate::models::ExternalScale;

/// Why a raw value could not be mapped onto an internal answer
#[derive(Debug, Clone, PartialEq, Error)]
pub enum NormalizeError {
    #[error("raw value {0} is not numeric")]
    TypeMismatch(String),

    /// No declared scale, and the observed values do not span a range
    #[error("no usable external scale; declare `scale` on the question or payload to import constant answers")]
    ScaleUnavailable,

    #[error("internal question has no answers")]
    NoAnswers,
}

/// Numeric reading of a raw value: JSON numbers and numeric strings
pub fn numeric_value(raw: &Value) -> Option<f64> {
    let value = match raw {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    value.is_finite().then_some(value)
}

/// External scale for one question
///
/// Precedence: the question's declared scale, then the payload-wide one, then the
/// min/max of every numeric value observed for the question.
pub fn resolve_scale(
    question_scale: Option<ExternalScale>,
    payload_scale: Option<ExternalScale>,
    observed: &[f64],
) -> Option<ExternalScale> {
    if let Some(scale) = question_scale.filter(ExternalScale::is_usable) {
        return Some(scale);
    }
    if let Some(scale) = payload_scale.filter(ExternalScale::is_usable) {
        return Some(scale);
    }

    let min = observed.iter().copied().fold(f64::INFINITY, f64::min);
    let max = observed.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    ExternalScale::new(min, max)
}

/// Linear projection of `value` (clamped into `from`) onto `[to_min, to_max]`
pub fn project(value: f64, from: ExternalScale, to_min: f64, to_max: f64) -> f64 {
    let clamped = value.clamp(from.min, from.max);
    let ratio = (clamped - from.min) / (from.max - from.min);
    to_min + ratio * (to_max - to_min)
}

/// Answer whose score is nearest to `target`; ties go to the lower order, then first seen
pub fn nearest_answer(answers: &[InternalAnswer], target: f64) -> Option<&InternalAnswer> {
    answers.iter().min_by(|a, b| {
        let da = (a.score - target).abs();
        let db = (b.score - target).abs();
        da.partial_cmp(&db)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.order.cmp(&b.order))
    })
}

/// Resolve `raw` to one of `question`'s answers
///
/// `scale` is the already resolved external scale (see [`resolve_scale`]); `None`
/// means no scale could be determined for this question.
pub fn normalize_answer<'a>(
    raw: &Value,
    scale: Option<ExternalScale>,
    question: &'a InternalQuestion,
) -> Result<&'a InternalAnswer, NormalizeError> {
    let value = numeric_value(raw).ok_or_else(|| NormalizeError::TypeMismatch(raw.to_string()))?;

    let (internal_min, internal_max) = question.score_range().ok_or(NormalizeError::NoAnswers)?;

    if internal_max <= internal_min {
        // Every answer scores the same
        return question
            .answers
            .iter()
            .min_by_key(|a| a.order)
            .ok_or(NormalizeError::NoAnswers);
    }

    let scale = scale
        .filter(ExternalScale::is_usable)
        .ok_or(NormalizeError::ScaleUnavailable)?;

    let target = project(value, scale, internal_min, internal_max);
    nearest_answer(&question.answers, target).ok_or(NormalizeError::NoAnswers)
}
