//! Import API handlers
//!
//! POST /import/validate, POST /import/execute, GET/DELETE /import/batches

use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    config::ImportSettings,
    db::batches,
    error::{ApiError, ApiResult, ImportError},
    models::{ExecuteOutcome, ExecuteRequest, ImportBatch, ImportRequest, RollbackSummary, ValidationResult},
    services, AppState,
};

const DEFAULT_BATCH_LIMIT: i64 = 50;
const MAX_BATCH_LIMIT: i64 = 500;

/// GET /import/batches query
#[derive(Debug, Deserialize)]
pub struct ListBatchesQuery {
    pub limit: Option<i64>,
}

/// POST /import/validate
///
/// Dry run: matches questions and normalizes answers without writing anything.
pub async fn validate_import(
    State(state): State<AppState>,
    Json(request): Json<ImportRequest>,
) -> ApiResult<Json<ValidationResult>> {
    let settings = ImportSettings::load(&state.db).await?;
    let result = services::validate(&state.db, &request, &settings).await?;
    Ok(Json(result))
}

/// POST /import/execute
///
/// Re-validates the payload and commits it as one batch. 422 with the fresh report
/// when re-validation fails; 500 `IMPORT_FAILED` when the transaction rolls back.
pub async fn execute_import(
    State(state): State<AppState>,
    Json(request): Json<ExecuteRequest>,
) -> ApiResult<Json<ExecuteOutcome>> {
    let settings = ImportSettings::load(&state.db).await?;

    match services::execute(&state.db, &request, &settings).await {
        Ok(outcome) => Ok(Json(outcome)),
        Err(ImportError::Failed(msg)) => {
            state
                .record_error(format!("Import of '{}' failed: {}", request.filename, msg))
                .await;
            Err(ApiError::ImportFailed(msg))
        }
        Err(e) => Err(e.into()),
    }
}

/// GET /import/batches?limit=
pub async fn list_batches(
    State(state): State<AppState>,
    Query(query): Query<ListBatchesQuery>,
) -> ApiResult<Json<Vec<ImportBatch>>> {
    let limit = query.limit.unwrap_or(DEFAULT_BATCH_LIMIT);
    if !(1..=MAX_BATCH_LIMIT).contains(&limit) {
        return Err(ApiError::BadRequest(format!(
            "limit must be between 1 and {}",
            MAX_BATCH_LIMIT
        )));
    }

    Ok(Json(batches::list_batches(&state.db, limit).await?))
}

/// GET /import/batches/:id
pub async fn get_batch(
    State(state): State<AppState>,
    Path(batch_id): Path<Uuid>,
) -> ApiResult<Json<ImportBatch>> {
    batches::load_batch(&state.db, batch_id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Import batch {}", batch_id)))
}

/// DELETE /import/batches/:id
///
/// Administrative rollback of a whole batch.
pub async fn rollback_batch(
    State(state): State<AppState>,
    Path(batch_id): Path<Uuid>,
) -> ApiResult<Json<RollbackSummary>> {
    Ok(Json(batches::rollback_batch(&state.db, batch_id).await?))
}

/// Build import routes
pub fn import_routes() -> Router<AppState> {
    Router::new()
        .route("/import/validate", post(validate_import))
        .route("/import/execute", post(execute_import))
        .route("/import/batches", get(list_batches))
        .route("/import/batches/:id", get(get_batch).delete(rollback_batch))
}
