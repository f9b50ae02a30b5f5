//! Import requests, batch records and execute outcomes

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use uuid::Uuid;

use super::validation::ValidationResult;

/// Source key used for mapping pins when neither the request nor the payload names one
pub const DEFAULT_SOURCE: &str = "default";

/// Input of a validate call
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportRequest {
    pub import_data: Value,
    pub model_slug: String,
    /// Overrides the payload's `source`
    #[serde(default)]
    pub source: Option<String>,
}

/// Input of an execute call
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteRequest {
    #[serde(flatten)]
    pub import: ImportRequest,
    pub filename: String,
    #[serde(default)]
    pub imported_by: Option<String>,
}

/// Durable record of one executed import
///
/// Immutable once written; removed only by rollback, which cascades to every row the
/// import created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportBatch {
    pub id: Uuid,
    pub source: String,
    pub filename: String,
    pub imported_by: String,
    pub model_id: String,
    pub assessment_count: usize,
    pub response_count: usize,
    /// externalId → internal question id
    pub question_mappings: BTreeMap<String, String>,
    pub metadata: Value,
    pub created_at: DateTime<Utc>,
}

/// One response ready to be written: the answer always belongs to the question
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedResponse {
    pub question_id: String,
    pub answer_id: String,
    pub raw_value: Value,
}

/// One external assessment with its resolvable responses
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedAssessment {
    pub external_assessment_id: String,
    pub respondent_meta: Value,
    pub responses: Vec<ResolvedResponse>,
}

/// Result of a successful execute
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteOutcome {
    pub batch_id: Uuid,
    pub imported_count: usize,
    pub response_count: usize,
    pub skipped_responses: usize,
    /// The re-validation the commit was based on
    pub validation: ValidationResult,
}

/// Rows removed by an administrative rollback
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RollbackSummary {
    pub batch_id: Uuid,
    pub assessments: u64,
    pub responses: u64,
    /// Pins deleted because no surviving batch uses them
    pub mappings: u64,
    /// Pins handed over to a surviving batch of the same source
    pub mappings_transferred: u64,
}
