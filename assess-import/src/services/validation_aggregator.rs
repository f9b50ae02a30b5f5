//! Validation Aggregator
//!
//! Runs the whole import pipeline without writing anything:
//! payload parsing → model lookup → question matching (pins first) → answer
//! normalization, and folds every finding into one [`ValidationResult`].
//!
//! Execute calls [`prepare_import`] again instead of trusting a preview, so the two
//! always agree for the same payload, model and mapping store.
//!
//! Errors block an import (structural problems). Warnings never do: unmatched
//! questions and unnormalizable values only cause responses to be skipped.

use assess_common::db::{AssessmentModel, InternalQuestion};
use assess_common::Result;
use serde_json::Value;
use sqlx::SqlitePool;
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::{debug, info, warn};

use crate::config::ImportSettings;
use crate::db::{catalog, mappings};
use crate::matching::{normalize_answer, resolve_scale, NormalizeError, QuestionMatcher};
use crate::matching::answer_normalizer::numeric_value;
use crate::models::{
    ExternalQuestion, ImportPayload, ImportRequest, MatchBand, QuestionMatch, ResolvedAssessment,
    ResolvedResponse, ResponseStats, ValidationResult, DEFAULT_SOURCE,
};

/// Everything execute needs to persist a validated payload
#[derive(Debug, Clone)]
pub struct PreparedImport {
    pub model: AssessmentModel,
    pub source: String,
    pub assessments: Vec<ResolvedAssessment>,
    /// externalId → internal question id for every accepted match
    pub question_mappings: BTreeMap<String, String>,
    /// Matches not backed by an existing pin; these become new pins on execute
    pub new_mappings: Vec<(String, String)>,
    /// External ids of assessments without a single importable response
    pub empty_assessments: Vec<String>,
}

/// Mapping-store source: request override, then payload, then [`DEFAULT_SOURCE`]
pub fn resolve_source(request_source: Option<&str>, payload_source: Option<&str>) -> String {
    request_source
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .or_else(|| payload_source.map(str::trim).filter(|s| !s.is_empty()))
        .unwrap_or(DEFAULT_SOURCE)
        .to_string()
}

/// Dry-run validation report
pub async fn validate(
    pool: &SqlitePool,
    request: &ImportRequest,
    settings: &ImportSettings,
) -> Result<ValidationResult> {
    let (result, _) = prepare_import(pool, request, settings).await?;
    Ok(result)
}

/// Validate a payload and, when it is valid, resolve every importable response
///
/// `Err` is reserved for infrastructure failures (database unreachable); every
/// problem with the payload itself ends up in the returned report.
pub async fn prepare_import(
    pool: &SqlitePool,
    request: &ImportRequest,
    settings: &ImportSettings,
) -> Result<(ValidationResult, Option<PreparedImport>)> {
    let parsed = ImportPayload::parse(&request.import_data);
    let payload = parsed.payload;
    let assessment_count = parsed.assessment_count;
    let mut errors = parsed.errors;
    let mut warnings = Vec::new();

    if parsed.assessment_count == 0
        && request.import_data.get("assessments").is_some_and(Value::is_array)
    {
        errors.push("Import payload contains no assessments".to_string());
    }

    let questions = unique_questions(&payload.questions, &mut errors);
    check_answer_references(&payload, &mut errors);
    warn_duplicate_assessment_ids(&payload, &mut warnings);

    let slug = request.model_slug.trim();
    let model = if slug.is_empty() {
        errors.push("modelSlug must not be empty".to_string());
        None
    } else {
        let model = catalog::load_model_by_slug(pool, slug).await?;
        if model.is_none() {
            errors.push(format!("Assessment model '{}' not found", slug));
        }
        model
    };

    let Some(model) = model else {
        let result = ValidationResult::new(
            errors,
            warnings,
            Vec::new(),
            assessment_count,
            BTreeMap::new(),
            ResponseStats::default(),
        );
        log_summary(&request.model_slug, &result);
        return Ok((result, None));
    };

    let source = resolve_source(request.source.as_deref(), payload.source.as_deref());
    let internal_questions = catalog::load_questions(pool, &model.id).await?;
    let pins = mappings::lookup_all(pool, &source, &model.id).await?;

    let matcher = QuestionMatcher::new(&internal_questions, settings);
    let mut question_matches = Vec::with_capacity(questions.len());
    let mut dimension_mappings = BTreeMap::new();

    for external in &questions {
        let pinned = pins.get(&external.external_id).map(String::as_str);
        if let Some(stale) = pinned.filter(|id| matcher.find(id).is_none()) {
            warn!(
                source = %source,
                external_id = %external.external_id,
                internal_id = %stale,
                "Pinned question no longer exists, re-matching"
            );
            warnings.push(format!(
                "Question '{}': pinned internal question '{}' no longer exists in model '{}'; matched by similarity instead",
                external.external_id, stale, model.slug
            ));
        }

        let m = matcher.match_question(external, pinned);
        match m.band {
            MatchBand::Good => warnings.push(format!(
                "Question '{}' matched \"{}\" with confidence {:.2}; manual review recommended",
                m.external_id,
                m.internal_text.as_deref().unwrap_or_default(),
                m.confidence
            )),
            MatchBand::Unmatched => warnings.push(format!(
                "Question '{}' (\"{}\") has no match at or above {:.2} (best {:.2}); its responses will be skipped",
                m.external_id, m.external_text, settings.accept_threshold, m.best_score
            )),
            _ => {}
        }

        if let Some(internal) = m.internal_id.as_deref().and_then(|id| matcher.find(id)) {
            dimension_mappings.insert(
                internal.dimension_key.clone(),
                internal.dimension_label.clone(),
            );
        }
        question_matches.push(m);
    }

    let (assessments, response_stats) =
        resolve_responses(&payload, &questions, &question_matches, &matcher, &mut warnings);

    let empty_assessments: Vec<String> = assessments
        .iter()
        .filter(|a| a.responses.is_empty())
        .map(|a| a.external_assessment_id.clone())
        .collect();
    if !empty_assessments.is_empty() {
        warnings.push(format!(
            "{} assessment(s) have no importable responses and will be imported empty: {}",
            empty_assessments.len(),
            empty_assessments.join(", ")
        ));
    }

    let result = ValidationResult::new(
        errors,
        warnings,
        question_matches,
        assessment_count,
        dimension_mappings,
        response_stats,
    );
    log_summary(&model.slug, &result);

    if !result.valid {
        return Ok((result, None));
    }

    let question_mappings: BTreeMap<String, String> = result
        .question_matches
        .iter()
        .filter_map(|m| m.internal_id.clone().map(|id| (m.external_id.clone(), id)))
        .collect();
    let new_mappings = result
        .question_matches
        .iter()
        .filter(|m| !m.pinned)
        .filter_map(|m| m.internal_id.clone().map(|id| (m.external_id.clone(), id)))
        .collect();

    let prepared = PreparedImport {
        model,
        source,
        assessments,
        question_mappings,
        new_mappings,
        empty_assessments,
    };

    Ok((result, Some(prepared)))
}

/// First occurrence of every external id; each repeated id is one error
fn unique_questions(questions: &[ExternalQuestion], errors: &mut Vec<String>) -> Vec<ExternalQuestion> {
    let mut seen = HashSet::new();
    let mut reported = HashSet::new();
    let mut unique = Vec::with_capacity(questions.len());

    for question in questions {
        if seen.insert(question.external_id.as_str()) {
            unique.push(question.clone());
        } else if reported.insert(question.external_id.as_str()) {
            errors.push(format!("Duplicate question externalId '{}'", question.external_id));
        }
    }

    unique
}

fn check_answer_references(payload: &ImportPayload, errors: &mut Vec<String>) {
    let known: HashSet<&str> = payload
        .questions
        .iter()
        .map(|q| q.external_id.as_str())
        .collect();

    for assessment in &payload.assessments {
        for answer in &assessment.answers {
            if !known.contains(answer.external_question_id.as_str()) {
                errors.push(format!(
                    "Assessment '{}' answers unknown externalQuestionId '{}'",
                    assessment.external_assessment_id, answer.external_question_id
                ));
            }
        }
    }
}

fn warn_duplicate_assessment_ids(payload: &ImportPayload, warnings: &mut Vec<String>) {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    let mut order = Vec::new();
    for assessment in &payload.assessments {
        let count = counts.entry(assessment.external_assessment_id.as_str()).or_insert(0);
        if *count == 0 {
            order.push(assessment.external_assessment_id.as_str());
        }
        *count += 1;
    }

    for id in order {
        let count = counts[id];
        if count > 1 {
            warnings.push(format!(
                "externalAssessmentId '{}' appears {} times; each occurrence is imported as a separate assessment",
                id, count
            ));
        }
    }
}

/// Per-question normalization failures, reported as one warning each
#[derive(Default)]
struct NormalizeFailures {
    count: usize,
    first: Option<NormalizeError>,
}

fn resolve_responses(
    payload: &ImportPayload,
    questions: &[ExternalQuestion],
    matches: &[QuestionMatch],
    matcher: &QuestionMatcher<'_>,
    warnings: &mut Vec<String>,
) -> (Vec<ResolvedAssessment>, ResponseStats) {
    let mut observed: HashMap<&str, Vec<f64>> = HashMap::new();
    for assessment in &payload.assessments {
        for answer in &assessment.answers {
            if let Some(value) = numeric_value(&answer.raw_value) {
                observed
                    .entry(answer.external_question_id.as_str())
                    .or_default()
                    .push(value);
            }
        }
    }

    // externalId → (internal question, external scale)
    let targets: HashMap<&str, (&InternalQuestion, _)> = questions
        .iter()
        .zip(matches)
        .filter_map(|(external, m)| {
            let internal = m.internal_id.as_deref().and_then(|id| matcher.find(id))?;
            let scale = resolve_scale(
                external.scale,
                payload.scale,
                observed.get(external.external_id.as_str()).map(Vec::as_slice).unwrap_or_default(),
            );
            Some((external.external_id.as_str(), (internal, scale)))
        })
        .collect();

    let mut stats = ResponseStats::default();
    let mut failures: BTreeMap<usize, NormalizeFailures> = BTreeMap::new();
    let question_index: HashMap<&str, usize> = questions
        .iter()
        .enumerate()
        .map(|(i, q)| (q.external_id.as_str(), i))
        .collect();
    let mut resolved = Vec::with_capacity(payload.assessments.len());

    for assessment in &payload.assessments {
        let mut responses = Vec::new();
        let mut answered = HashSet::new();

        for answer in &assessment.answers {
            let external_id = answer.external_question_id.as_str();
            let Some(&index) = question_index.get(external_id) else {
                // Unknown question: already reported as an error
                continue;
            };

            let Some((internal, scale)) = targets.get(external_id) else {
                stats.skipped_unmatched += 1;
                continue;
            };

            if !answered.insert(external_id) {
                warnings.push(format!(
                    "Assessment '{}' answers question '{}' more than once; keeping the first answer",
                    assessment.external_assessment_id, external_id
                ));
                continue;
            }

            match normalize_answer(&answer.raw_value, *scale, internal) {
                Ok(chosen) => {
                    debug!(
                        external_id,
                        question_id = %internal.id,
                        answer_id = %chosen.id,
                        "Response resolved"
                    );
                    stats.resolvable += 1;
                    responses.push(ResolvedResponse {
                        question_id: internal.id.clone(),
                        answer_id: chosen.id.clone(),
                        raw_value: answer.raw_value.clone(),
                    });
                }
                Err(e) => {
                    stats.skipped_unnormalizable += 1;
                    let entry = failures.entry(index).or_default();
                    entry.count += 1;
                    entry.first.get_or_insert(e);
                }
            }
        }

        resolved.push(ResolvedAssessment {
            external_assessment_id: assessment.external_assessment_id.clone(),
            respondent_meta: assessment.respondent_meta.clone(),
            responses,
        });
    }

    for (index, failure) in failures {
        let reason = failure
            .first
            .map(|e| e.to_string())
            .unwrap_or_default();
        warnings.push(format!(
            "Question '{}': {} response(s) could not be normalized ({}); they will be skipped",
            questions[index].external_id, failure.count, reason
        ));
    }

    (resolved, stats)
}

fn log_summary(model_slug: &str, result: &ValidationResult) {
    info!(
        model = model_slug,
        valid = result.valid,
        errors = result.errors.len(),
        warnings = result.warnings.len(),
        questions = result.question_matches.len(),
        matched = result.matched_count(),
        assessments = result.assessment_count,
        resolvable = result.response_stats.resolvable,
        skipped = result.response_stats.skipped(),
        "Import payload validated"
    );
}
