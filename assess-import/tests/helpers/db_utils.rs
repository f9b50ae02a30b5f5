//! Database Test Utilities
//!
//! Temporary platform databases seeded with a small assessment model.

use anyhow::Result;
use sqlx::SqlitePool;
use tempfile::TempDir;

pub const MODEL_ID: &str = "model-ai";
pub const MODEL_SLUG: &str = "ai-readiness";

/// (id, dimension key, text, order)
pub const QUESTIONS: &[(&str, &str, &str, i64)] = &[
    ("q-strategy", "strategy", "Does your organization have a documented AI strategy?", 0),
    ("q-workflow", "adoption", "Does your team use AI tools in daily workflow?", 1),
    ("q-governance", "data", "How mature is your data governance?", 2),
];

/// Create temporary test database with the full schema
///
/// Returns (TempDir, SqlitePool) - TempDir must be kept alive for duration of test
pub async fn create_test_db() -> Result<(TempDir, SqlitePool)> {
    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("test_assess.db");
    let pool = assess_common::db::init_database(&db_path).await?;
    Ok((temp_dir, pool))
}

/// Test database with the AI readiness model seeded
pub async fn create_seeded_db() -> Result<(TempDir, SqlitePool)> {
    let (temp_dir, pool) = create_test_db().await?;
    seed_model(&pool).await?;
    Ok((temp_dir, pool))
}

/// Three dimensions, one question each, five answers scored 100..=500
pub async fn seed_model(pool: &SqlitePool) -> Result<()> {
    sqlx::query("INSERT INTO assessment_models (id, slug, name) VALUES (?, ?, 'AI Readiness')")
        .bind(MODEL_ID)
        .bind(MODEL_SLUG)
        .execute(pool)
        .await?;

    for (order, (dimension, label)) in [("strategy", "Strategy"), ("adoption", "Adoption"), ("data", "Data")]
        .into_iter()
        .enumerate()
    {
        sqlx::query("INSERT INTO dimensions (id, model_id, key, label, sort_order) VALUES (?, ?, ?, ?, ?)")
            .bind(format!("dim-{}", dimension))
            .bind(MODEL_ID)
            .bind(dimension)
            .bind(label)
            .bind(order as i64)
            .execute(pool)
            .await?;
    }

    for &(id, dimension, text, order) in QUESTIONS {
        sqlx::query(
            "INSERT INTO questions (id, model_id, dimension_id, text, sort_order) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(id)
        .bind(MODEL_ID)
        .bind(format!("dim-{}", dimension))
        .bind(text)
        .bind(order)
        .execute(pool)
        .await?;

        for level in 1..=5i64 {
            sqlx::query(
                "INSERT INTO answers (id, question_id, text, score, sort_order) VALUES (?, ?, ?, ?, ?)",
            )
            .bind(answer_id(id, level))
            .bind(id)
            .bind(format!("Level {}", level))
            .bind((level * 100) as f64)
            .bind(level - 1)
            .execute(pool)
            .await?;
        }
    }

    Ok(())
}

/// Id of the seeded answer scoring `level * 100`
pub fn answer_id(question_id: &str, level: i64) -> String {
    format!("{}-{}", question_id, level)
}

pub async fn count_rows(pool: &SqlitePool, table: &str) -> i64 {
    sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", table))
        .fetch_one(pool)
        .await
        .unwrap()
}
