//! Database initialization
//!
//! Creates the platform catalog tables (models, dimensions, questions, answers), the
//! assessment tables and the import bookkeeping tables. Every statement is idempotent.

use crate::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

/// Default SQLite busy timeout before a lock error surfaces
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5000;

/// Open (or create) the database and make sure every table exists
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // WAL lets validation readers run while an import transaction is open; readers
    // never see uncommitted batch rows.
    let options = SqliteConnectOptions::from_str(&format!("sqlite://{}", db_path.display()))?
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS));

    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .connect_with(options)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    init_schema(&pool).await?;

    Ok(pool)
}

/// Create all tables (idempotent)
pub async fn init_schema(pool: &SqlitePool) -> Result<()> {
    create_settings_table(pool).await?;

    // Assessment catalog (owned by the model builder, read-only for imports)
    create_models_table(pool).await?;
    create_dimensions_table(pool).await?;
    create_questions_table(pool).await?;
    create_answers_table(pool).await?;

    // Import bookkeeping must exist before the rows that reference it
    create_import_batches_table(pool).await?;
    create_assessments_table(pool).await?;
    create_responses_table(pool).await?;
    create_import_question_mappings_table(pool).await?;

    info!("Database schema initialized");
    Ok(())
}

pub async fn create_settings_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS settings (
            key TEXT PRIMARY KEY,
            value TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_models_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS assessment_models (
            id TEXT PRIMARY KEY,
            slug TEXT NOT NULL UNIQUE,
            name TEXT NOT NULL,
            created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_dimensions_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS dimensions (
            id TEXT PRIMARY KEY,
            model_id TEXT NOT NULL REFERENCES assessment_models(id) ON DELETE CASCADE,
            key TEXT NOT NULL,
            label TEXT NOT NULL,
            sort_order INTEGER NOT NULL DEFAULT 0,
            UNIQUE (model_id, key)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_questions_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS questions (
            id TEXT PRIMARY KEY,
            model_id TEXT NOT NULL REFERENCES assessment_models(id) ON DELETE CASCADE,
            dimension_id TEXT NOT NULL REFERENCES dimensions(id) ON DELETE CASCADE,
            text TEXT NOT NULL,
            sort_order INTEGER NOT NULL DEFAULT 0
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_questions_model ON questions(model_id)")
        .execute(pool)
        .await?;

    Ok(())
}

async fn create_answers_table(pool: &SqlitePool) -> Result<()> {
    // UNIQUE (question_id, id) backs the composite foreign key on responses
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS answers (
            id TEXT PRIMARY KEY,
            question_id TEXT NOT NULL REFERENCES questions(id) ON DELETE CASCADE,
            text TEXT NOT NULL,
            score REAL NOT NULL,
            sort_order INTEGER NOT NULL DEFAULT 0,
            UNIQUE (question_id, id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_import_batches_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS import_batches (
            id TEXT PRIMARY KEY,
            source TEXT NOT NULL,
            filename TEXT NOT NULL,
            imported_by TEXT NOT NULL,
            model_id TEXT NOT NULL REFERENCES assessment_models(id),
            assessment_count INTEGER NOT NULL,
            response_count INTEGER NOT NULL,
            question_mappings TEXT NOT NULL DEFAULT '{}',
            metadata TEXT NOT NULL DEFAULT '{}',
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_assessments_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS assessments (
            id TEXT PRIMARY KEY,
            model_id TEXT NOT NULL REFERENCES assessment_models(id),
            status TEXT NOT NULL,
            respondent_meta TEXT NOT NULL DEFAULT '{}',
            external_assessment_id TEXT,
            import_batch_id TEXT REFERENCES import_batches(id) ON DELETE CASCADE,
            created_at TEXT NOT NULL,
            completed_at TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_assessments_import_batch ON assessments(import_batch_id)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_responses_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS responses (
            id TEXT PRIMARY KEY,
            assessment_id TEXT NOT NULL REFERENCES assessments(id) ON DELETE CASCADE,
            question_id TEXT NOT NULL REFERENCES questions(id),
            answer_id TEXT NOT NULL,
            import_batch_id TEXT REFERENCES import_batches(id) ON DELETE CASCADE,
            raw_value TEXT,
            created_at TEXT NOT NULL,
            FOREIGN KEY (question_id, answer_id) REFERENCES answers(question_id, id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_responses_assessment ON responses(assessment_id)",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_responses_import_batch ON responses(import_batch_id)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_import_question_mappings_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS import_question_mappings (
            source TEXT NOT NULL,
            model_id TEXT NOT NULL REFERENCES assessment_models(id) ON DELETE CASCADE,
            external_id TEXT NOT NULL,
            internal_question_id TEXT NOT NULL REFERENCES questions(id) ON DELETE CASCADE,
            import_batch_id TEXT NOT NULL REFERENCES import_batches(id) ON DELETE CASCADE,
            created_at TEXT NOT NULL,
            PRIMARY KEY (source, model_id, external_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
