//! Batch Executor
//!
//! Commits a payload as one import batch. Nothing from a previous preview is trusted:
//! the payload is prepared again, and an invalid result rejects the call before any
//! write. All rows (batch, assessments, responses, new mapping pins) go through a
//! single transaction, so a failure leaves no trace.

use assess_common::{time, Error, Result};
use serde_json::json;
use sqlx::SqlitePool;
use tracing::{error, info};
use uuid::Uuid;

use super::validation_aggregator::{prepare_import, PreparedImport};
use crate::config::ImportSettings;
use crate::db::{batches, mappings};
use crate::error::ImportError;
use crate::models::{ExecuteOutcome, ExecuteRequest, ImportBatch};
use crate::utils::retry_on_lock;

/// Recorded when the request does not name who imported
pub const DEFAULT_IMPORTED_BY: &str = "system";

/// Validate and persist a payload atomically
pub async fn execute(
    pool: &SqlitePool,
    request: &ExecuteRequest,
    settings: &ImportSettings,
) -> std::result::Result<ExecuteOutcome, ImportError> {
    let filename = request.filename.trim();
    if filename.is_empty() {
        return Err(Error::InvalidInput("filename must not be empty".to_string()).into());
    }

    let (validation, prepared) = prepare_import(pool, &request.import, settings).await?;
    let prepared = match prepared {
        Some(prepared) if validation.valid => prepared,
        _ => {
            info!(
                model = %request.import.model_slug,
                errors = validation.errors.len(),
                "Import rejected by re-validation"
            );
            return Err(ImportError::Rejected(Box::new(validation)));
        }
    };

    let batch = ImportBatch {
        id: Uuid::new_v4(),
        source: prepared.source.clone(),
        filename: filename.to_string(),
        imported_by: request
            .imported_by
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(DEFAULT_IMPORTED_BY)
            .to_string(),
        model_id: prepared.model.id.clone(),
        assessment_count: prepared.assessments.len(),
        response_count: validation.response_stats.resolvable,
        question_mappings: prepared.question_mappings.clone(),
        metadata: json!({
            "modelSlug": prepared.model.slug,
            "emptyAssessments": prepared.empty_assessments,
            "responseStats": validation.response_stats,
            "warningCount": validation.warnings.len(),
        }),
        created_at: time::now(),
    };

    // Each attempt opens a fresh transaction; a failed attempt has already rolled back
    let new_pins = retry_on_lock("import batch commit", settings.max_lock_wait_ms, || {
        persist_batch(pool, &batch, &prepared)
    })
    .await
    .map_err(|e| {
        error!(batch_id = %batch.id, error = %e, "Import batch rolled back");
        ImportError::Failed(e.to_string())
    })?;

    info!(
        batch_id = %batch.id,
        source = %batch.source,
        model = %prepared.model.slug,
        assessments = batch.assessment_count,
        responses = batch.response_count,
        skipped = validation.response_stats.skipped(),
        new_pins,
        "Import batch committed"
    );

    Ok(ExecuteOutcome {
        batch_id: batch.id,
        imported_count: batch.assessment_count,
        response_count: batch.response_count,
        skipped_responses: validation.response_stats.skipped(),
        validation,
    })
}

/// One transaction: batch row, assessments with responses, new pins
///
/// Returns the number of pins inserted. Dropping the transaction on an early `?`
/// rolls everything back.
async fn persist_batch(pool: &SqlitePool, batch: &ImportBatch, prepared: &PreparedImport) -> Result<u64> {
    let created_at = time::to_db(&batch.created_at);
    let mut tx = pool.begin().await?;

    batches::insert_batch(&mut tx, batch).await?;

    for assessment in &prepared.assessments {
        batches::insert_assessment(&mut tx, batch.id, &batch.model_id, assessment, &created_at).await?;
    }

    let new_pins = mappings::persist(
        &mut tx,
        &batch.source,
        &batch.model_id,
        batch.id,
        &prepared.new_mappings,
        &created_at,
    )
    .await?;

    tx.commit().await?;
    Ok(new_pins)
}
