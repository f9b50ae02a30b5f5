//! Import batch database operations
//!
//! Writes run on the execute transaction's connection; reads and rollback use the pool.
//! Every assessment and response row carries its `import_batch_id`, and deleting the
//! batch row cascades to them. Pins owned by the batch survive when another batch of the
//! same source still uses them.

use assess_common::{time, Error, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection, SqlitePool};
use std::collections::BTreeMap;
use uuid::Uuid;

use super::mappings;
use crate::models::{ImportBatch, ResolvedAssessment, RollbackSummary};

/// Insert the batch row
pub async fn insert_batch(conn: &mut SqliteConnection, batch: &ImportBatch) -> Result<()> {
    // Serialize before touching the connection
    let question_mappings = serde_json::to_string(&batch.question_mappings)
        .map_err(|e| Error::Internal(format!("Failed to serialize question mappings: {}", e)))?;
    let metadata = serde_json::to_string(&batch.metadata)
        .map_err(|e| Error::Internal(format!("Failed to serialize batch metadata: {}", e)))?;

    sqlx::query(
        r#"
        INSERT INTO import_batches (
            id, source, filename, imported_by, model_id,
            assessment_count, response_count, question_mappings, metadata, created_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(batch.id.to_string())
    .bind(&batch.source)
    .bind(&batch.filename)
    .bind(&batch.imported_by)
    .bind(&batch.model_id)
    .bind(batch.assessment_count as i64)
    .bind(batch.response_count as i64)
    .bind(question_mappings)
    .bind(metadata)
    .bind(time::to_db(&batch.created_at))
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Insert one completed assessment and its responses; returns the new assessment id
pub async fn insert_assessment(
    conn: &mut SqliteConnection,
    batch_id: Uuid,
    model_id: &str,
    assessment: &ResolvedAssessment,
    created_at: &str,
) -> Result<Uuid> {
    let assessment_id = Uuid::new_v4();
    let batch_id = batch_id.to_string();
    let respondent_meta = serde_json::to_string(&assessment.respondent_meta)
        .map_err(|e| Error::Internal(format!("Failed to serialize respondent meta: {}", e)))?;

    sqlx::query(
        r#"
        INSERT INTO assessments (
            id, model_id, status, respondent_meta, external_assessment_id,
            import_batch_id, created_at, completed_at
        ) VALUES (?, ?, 'completed', ?, ?, ?, ?, ?)
        "#,
    )
    .bind(assessment_id.to_string())
    .bind(model_id)
    .bind(respondent_meta)
    .bind(&assessment.external_assessment_id)
    .bind(&batch_id)
    .bind(created_at)
    .bind(created_at)
    .execute(&mut *conn)
    .await?;

    for response in &assessment.responses {
        sqlx::query(
            r#"
            INSERT INTO responses (
                id, assessment_id, question_id, answer_id, import_batch_id, raw_value, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(assessment_id.to_string())
        .bind(&response.question_id)
        .bind(&response.answer_id)
        .bind(&batch_id)
        .bind(response.raw_value.to_string())
        .bind(created_at)
        .execute(&mut *conn)
        .await?;
    }

    Ok(assessment_id)
}

/// Most recent batches first
pub async fn list_batches(pool: &SqlitePool, limit: i64) -> Result<Vec<ImportBatch>> {
    let rows = sqlx::query(
        r#"
        SELECT id, source, filename, imported_by, model_id, assessment_count,
               response_count, question_mappings, metadata, created_at
        FROM import_batches
        ORDER BY created_at DESC, id
        LIMIT ?
        "#,
    )
    .bind(limit)
    .fetch_all(pool)
    .await?;

    rows.iter().map(row_to_batch).collect()
}

/// Load one batch
pub async fn load_batch(pool: &SqlitePool, batch_id: Uuid) -> Result<Option<ImportBatch>> {
    let row = sqlx::query(
        r#"
        SELECT id, source, filename, imported_by, model_id, assessment_count,
               response_count, question_mappings, metadata, created_at
        FROM import_batches
        WHERE id = ?
        "#,
    )
    .bind(batch_id.to_string())
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(row_to_batch).transpose()
}

/// Delete a batch and everything it created
///
/// Pins the batch owns are handed to the newest surviving batch of the same source and
/// model whose `question_mappings` maps the external id to the same question; the rest
/// cascade with the batch row. Counts, hand-over and delete share one transaction.
pub async fn rollback_batch(pool: &SqlitePool, batch_id: Uuid) -> Result<RollbackSummary> {
    let id = batch_id.to_string();
    let mut tx = pool.begin().await?;

    let owner: Option<(String, String)> =
        sqlx::query_as("SELECT source, model_id FROM import_batches WHERE id = ?")
            .bind(&id)
            .fetch_optional(&mut *tx)
            .await?;
    let Some((source, model_id)) = owner else {
        tx.rollback().await?;
        return Err(Error::NotFound(format!("Import batch {}", batch_id)));
    };

    let assessments: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM assessments WHERE import_batch_id = ?")
            .bind(&id)
            .fetch_one(&mut *tx)
            .await?;
    let responses: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM responses WHERE import_batch_id = ?")
            .bind(&id)
            .fetch_one(&mut *tx)
            .await?;

    let pins = mappings::owned_by_batch(&mut tx, batch_id).await?;
    let survivors = if pins.is_empty() {
        Vec::new()
    } else {
        surviving_mappings(&mut tx, &source, &model_id, batch_id).await?
    };

    let mut transferred = 0u64;
    for (external_id, internal_id) in &pins {
        let heir = survivors
            .iter()
            .find(|(_, used)| used.get(external_id) == Some(internal_id))
            .map(|(heir, _)| *heir);

        if let Some(heir) = heir {
            mappings::reassign(&mut tx, &source, &model_id, external_id, heir).await?;
            tracing::debug!(
                external_id = %external_id,
                internal_id = %internal_id,
                from_batch = %batch_id,
                to_batch = %heir,
                "Pin handed to surviving batch"
            );
            transferred += 1;
        }
    }
    let removed = pins.len() as u64 - transferred;

    sqlx::query("DELETE FROM import_batches WHERE id = ?")
        .bind(&id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    tracing::info!(
        batch_id = %batch_id,
        assessments,
        responses,
        mappings_removed = removed,
        mappings_transferred = transferred,
        "Import batch rolled back"
    );

    Ok(RollbackSummary {
        batch_id,
        assessments: assessments as u64,
        responses: responses as u64,
        mappings: removed,
        mappings_transferred: transferred,
    })
}

/// Question mappings of the other batches of a source and model, newest first
async fn surviving_mappings(
    conn: &mut SqliteConnection,
    source: &str,
    model_id: &str,
    excluded: Uuid,
) -> Result<Vec<(Uuid, BTreeMap<String, String>)>> {
    let rows = sqlx::query(
        r#"
        SELECT id, question_mappings FROM import_batches
        WHERE source = ? AND model_id = ? AND id != ?
        ORDER BY created_at DESC, id
        "#,
    )
    .bind(source)
    .bind(model_id)
    .bind(excluded.to_string())
    .fetch_all(&mut *conn)
    .await?;

    rows.iter()
        .map(|row| {
            let id: String = row.get("id");
            let id = Uuid::parse_str(&id)
                .map_err(|e| Error::Internal(format!("Invalid batch id '{}': {}", id, e)))?;
            let used: String = row.get("question_mappings");
            let used = serde_json::from_str(&used).map_err(|e| {
                Error::Internal(format!("Failed to deserialize question mappings: {}", e))
            })?;
            Ok((id, used))
        })
        .collect()
}

fn row_to_batch(row: &SqliteRow) -> Result<ImportBatch> {
    let id: String = row.get("id");
    let id = Uuid::parse_str(&id)
        .map_err(|e| Error::Internal(format!("Invalid batch id '{}': {}", id, e)))?;

    let question_mappings: String = row.get("question_mappings");
    let question_mappings = serde_json::from_str(&question_mappings)
        .map_err(|e| Error::Internal(format!("Failed to deserialize question mappings: {}", e)))?;

    let metadata: String = row.get("metadata");
    let metadata = serde_json::from_str(&metadata)
        .map_err(|e| Error::Internal(format!("Failed to deserialize batch metadata: {}", e)))?;

    let created_at: String = row.get("created_at");

    Ok(ImportBatch {
        id,
        source: row.get("source"),
        filename: row.get("filename"),
        imported_by: row.get("imported_by"),
        model_id: row.get("model_id"),
        assessment_count: row.get::<i64, _>("assessment_count") as usize,
        response_count: row.get::<i64, _>("response_count") as usize,
        question_mappings,
        metadata,
        created_at: time::from_db(&created_at)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ResolvedResponse;
    use assess_common::db::init_schema;
    use serde_json::json;

    async fn setup_test_db() -> SqlitePool {
        let pool = sqlx::sqlite::SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        init_schema(&pool).await.unwrap();

        for sql in [
            "INSERT INTO assessment_models (id, slug, name) VALUES ('m1', 'ai', 'AI')",
            "INSERT INTO dimensions (id, model_id, key, label) VALUES ('d1', 'm1', 'strategy', 'Strategy')",
            "INSERT INTO questions (id, model_id, dimension_id, text) VALUES ('q1', 'm1', 'd1', 'One')",
            "INSERT INTO answers (id, question_id, text, score) VALUES ('a1', 'q1', 'Low', 1.0)",
        ] {
            sqlx::query(sql).execute(&pool).await.unwrap();
        }
        pool
    }

    fn batch(id: Uuid) -> ImportBatch {
        ImportBatch {
            id,
            source: "vendor".to_string(),
            filename: "export.json".to_string(),
            imported_by: "tester".to_string(),
            model_id: "m1".to_string(),
            assessment_count: 1,
            response_count: 1,
            question_mappings: BTreeMap::from([("E1".to_string(), "q1".to_string())]),
            metadata: json!({"emptyAssessments": []}),
            created_at: time::now(),
        }
    }

    async fn write_batch(pool: &SqlitePool, record: &ImportBatch) {
        let mut tx = pool.begin().await.unwrap();
        insert_batch(&mut tx, record).await.unwrap();
        insert_assessment(
            &mut tx,
            record.id,
            "m1",
            &ResolvedAssessment {
                external_assessment_id: "A1".to_string(),
                respondent_meta: json!({"org": "Acme"}),
                responses: vec![ResolvedResponse {
                    question_id: "q1".to_string(),
                    answer_id: "a1".to_string(),
                    raw_value: json!(0),
                }],
            },
            &time::to_db(&record.created_at),
        )
        .await
        .unwrap();
        tx.commit().await.unwrap();
    }

    #[tokio::test]
    async fn test_insert_and_load_batch() {
        let pool = setup_test_db().await;
        let record = batch(Uuid::new_v4());
        write_batch(&pool, &record).await;

        let loaded = load_batch(&pool, record.id).await.unwrap().unwrap();
        assert_eq!(loaded.question_mappings, record.question_mappings);
        assert_eq!(loaded.metadata, record.metadata);
        assert_eq!(loaded.created_at, record.created_at);

        let listed = list_batches(&pool, 10).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, record.id);

        assert!(load_batch(&pool, Uuid::new_v4()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_rollback_removes_rows() {
        let pool = setup_test_db().await;
        let record = batch(Uuid::new_v4());
        write_batch(&pool, &record).await;

        let summary = rollback_batch(&pool, record.id).await.unwrap();
        assert_eq!(summary.assessments, 1);
        assert_eq!(summary.responses, 1);

        let remaining: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM responses")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(remaining, 0);
        assert!(load_batch(&pool, record.id).await.unwrap().is_none());
    }

    async fn pin(pool: &SqlitePool, record: &ImportBatch) {
        let mut tx = pool.begin().await.unwrap();
        let pairs: Vec<(String, String)> = record.question_mappings.clone().into_iter().collect();
        mappings::persist(&mut tx, &record.source, "m1", record.id, &pairs, "2026-01-01T00:00:00Z")
            .await
            .unwrap();
        tx.commit().await.unwrap();
    }

    async fn pin_owner(pool: &SqlitePool) -> Option<String> {
        sqlx::query_scalar("SELECT import_batch_id FROM import_question_mappings WHERE external_id = 'E1'")
            .fetch_optional(pool)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_rollback_hands_pin_to_surviving_batch() {
        let pool = setup_test_db().await;
        let first = batch(Uuid::new_v4());
        let second = batch(Uuid::new_v4());
        write_batch(&pool, &first).await;
        pin(&pool, &first).await;
        write_batch(&pool, &second).await;
        pin(&pool, &second).await;

        let summary = rollback_batch(&pool, first.id).await.unwrap();
        assert_eq!(summary.mappings, 0);
        assert_eq!(summary.mappings_transferred, 1);
        assert_eq!(pin_owner(&pool).await, Some(second.id.to_string()));

        let summary = rollback_batch(&pool, second.id).await.unwrap();
        assert_eq!(summary.mappings, 1);
        assert_eq!(summary.mappings_transferred, 0);
        assert_eq!(pin_owner(&pool).await, None);
    }

    #[tokio::test]
    async fn test_rollback_does_not_hand_pin_across_sources() {
        let pool = setup_test_db().await;
        let first = batch(Uuid::new_v4());
        let mut other = batch(Uuid::new_v4());
        other.source = "other-vendor".to_string();
        write_batch(&pool, &first).await;
        pin(&pool, &first).await;
        write_batch(&pool, &other).await;

        let summary = rollback_batch(&pool, first.id).await.unwrap();
        assert_eq!(summary.mappings, 1);
        assert_eq!(summary.mappings_transferred, 0);
        assert_eq!(pin_owner(&pool).await, None);
    }

    #[tokio::test]
    async fn test_rollback_unknown_batch_is_not_found() {
        let pool = setup_test_db().await;
        let result = rollback_batch(&pool, Uuid::new_v4()).await;
        assert!(matches!(result, Err(Error::NotFound(_))));
    }

    #[tokio::test]
    async fn test_response_answer_must_belong_to_question() {
        let pool = setup_test_db().await;
        sqlx::query("INSERT INTO questions (id, model_id, dimension_id, text) VALUES ('q2', 'm1', 'd1', 'Two')")
            .execute(&pool)
            .await
            .unwrap();

        let record = batch(Uuid::new_v4());
        let mut tx = pool.begin().await.unwrap();
        insert_batch(&mut tx, &record).await.unwrap();
        let result = insert_assessment(
            &mut tx,
            record.id,
            "m1",
            &ResolvedAssessment {
                external_assessment_id: "A1".to_string(),
                respondent_meta: json!({}),
                responses: vec![ResolvedResponse {
                    question_id: "q2".to_string(),
                    answer_id: "a1".to_string(),
                    raw_value: json!(1),
                }],
            },
            "2026-01-01T00:00:00Z",
        )
        .await;

        assert!(result.is_err());
    }
}
