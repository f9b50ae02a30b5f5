//! Mapping Store
//!
//! Confirmed `(source, model, external question) → internal question` pins. A pin is
//! written the first time an external question is imported for a source and reused on
//! every later validate/execute, so the same feed keeps mapping to the same question
//! even when question wording is edited.
//!
//! Pins are only written inside the execute transaction, and existing pins are never
//! rewritten (`ON CONFLICT DO NOTHING`). A pin is owned by one batch; rolling that batch
//! back hands the pin to a surviving batch that used it, so only pins no remaining
//! import depends on disappear.

use assess_common::Result;
use sqlx::{Row, SqliteConnection, SqlitePool};
use std::collections::HashMap;
use uuid::Uuid;

/// Pinned internal question id for one external id
pub async fn lookup(
    pool: &SqlitePool,
    source: &str,
    model_id: &str,
    external_id: &str,
) -> Result<Option<String>> {
    let internal_id = sqlx::query_scalar(
        r#"
        SELECT internal_question_id FROM import_question_mappings
        WHERE source = ? AND model_id = ? AND external_id = ?
        "#,
    )
    .bind(source)
    .bind(model_id)
    .bind(external_id)
    .fetch_optional(pool)
    .await?;

    Ok(internal_id)
}

/// Every pin for a source and model, keyed by external id
pub async fn lookup_all(
    pool: &SqlitePool,
    source: &str,
    model_id: &str,
) -> Result<HashMap<String, String>> {
    let rows = sqlx::query(
        r#"
        SELECT external_id, internal_question_id FROM import_question_mappings
        WHERE source = ? AND model_id = ?
        "#,
    )
    .bind(source)
    .bind(model_id)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|row| (row.get("external_id"), row.get("internal_question_id")))
        .collect())
}

/// Insert pins established by a batch; returns how many were new
///
/// Runs on the caller's transaction connection. Pairs already pinned are left as they are.
pub async fn persist(
    conn: &mut SqliteConnection,
    source: &str,
    model_id: &str,
    batch_id: Uuid,
    mappings: &[(String, String)],
    created_at: &str,
) -> Result<u64> {
    let batch_id = batch_id.to_string();
    let mut inserted = 0;

    for (external_id, internal_id) in mappings {
        let result = sqlx::query(
            r#"
            INSERT INTO import_question_mappings
                (source, model_id, external_id, internal_question_id, import_batch_id, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT (source, model_id, external_id) DO NOTHING
            "#,
        )
        .bind(source)
        .bind(model_id)
        .bind(external_id)
        .bind(internal_id)
        .bind(&batch_id)
        .bind(created_at)
        .execute(&mut *conn)
        .await?;

        inserted += result.rows_affected();
    }

    Ok(inserted)
}

/// Pins currently owned by a batch as `(external_id, internal_question_id)`
pub async fn owned_by_batch(conn: &mut SqliteConnection, batch_id: Uuid) -> Result<Vec<(String, String)>> {
    let rows = sqlx::query(
        r#"
        SELECT external_id, internal_question_id FROM import_question_mappings
        WHERE import_batch_id = ?
        ORDER BY external_id
        "#,
    )
    .bind(batch_id.to_string())
    .fetch_all(&mut *conn)
    .await?;

    Ok(rows
        .into_iter()
        .map(|row| (row.get("external_id"), row.get("internal_question_id")))
        .collect())
}

/// Move ownership of one pin to another batch; the mapping itself is unchanged
pub async fn reassign(
    conn: &mut SqliteConnection,
    source: &str,
    model_id: &str,
    external_id: &str,
    to_batch: Uuid,
) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE import_question_mappings SET import_batch_id = ?
        WHERE source = ? AND model_id = ? AND external_id = ?
        "#,
    )
    .bind(to_batch.to_string())
    .bind(source)
    .bind(model_id)
    .bind(external_id)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Number of pins owned by a batch
pub async fn count_for_batch(pool: &SqlitePool, batch_id: Uuid) -> Result<u64> {
    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM import_question_mappings WHERE import_batch_id = ?")
            .bind(batch_id.to_string())
            .fetch_one(pool)
            .await?;

    Ok(count as u64)
}
