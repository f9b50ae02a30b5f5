//! Settings database operations
//!
//! Key-value accessors over the `settings` table. Import tunables are read through
//! [`crate::config::ImportSettings::load`].

use sqlx::{Pool, Sqlite};
use assess_common::{Error, Result};

pub const ACCEPT_THRESHOLD_KEY: &str = "import_accept_threshold";
pub const EXCELLENT_THRESHOLD_KEY: &str = "import_excellent_threshold";
pub const DIMENSION_BONUS_KEY: &str = "import_dimension_bonus";
pub const TOKEN_WEIGHT_KEY: &str = "import_token_weight";
pub const EDIT_WEIGHT_KEY: &str = "import_edit_weight";
pub const MAX_LOCK_WAIT_MS_KEY: &str = "import_max_lock_wait_ms";

/// Generic setting getter
///
/// **Returns:** `Some(value)` when present and non-NULL
pub async fn get_setting<T>(db: &Pool<Sqlite>, key: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let row: Option<(Option<String>,)> = sqlx::query_as("SELECT value FROM settings WHERE key = ?")
        .bind(key)
        .fetch_optional(db)
        .await
        .map_err(Error::Database)?;

    match row {
        Some((Some(value),)) => {
            let parsed = value
                .trim()
                .parse::<T>()
                .map_err(|e| Error::Config(format!("Parse setting '{}' failed: {}", key, e)))?;
            Ok(Some(parsed))
        }
        _ => Ok(None),
    }
}

/// Generic setting setter (upsert)
pub async fn set_setting<T>(db: &Pool<Sqlite>, key: &str, value: T) -> Result<()>
where
    T: std::fmt::Display,
{
    sqlx::query(
        "INSERT INTO settings (key, value) VALUES (?, ?)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value",
    )
    .bind(key)
    .bind(value.to_string())
    .execute(db)
    .await
    .map_err(Error::Database)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::SqlitePool;

    async fn setup_test_db() -> SqlitePool {
        // Single connection so every query sees the same in-memory database
        let pool = sqlx::sqlite::SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        assess_common::db::init::create_settings_table(&pool)
            .await
            .unwrap();
        pool
    }

    #[tokio::test]
    async fn test_get_missing_setting_is_none() {
        let pool = setup_test_db().await;
        let value: Option<f64> = get_setting(&pool, ACCEPT_THRESHOLD_KEY).await.unwrap();
        assert_eq!(value, None);
    }

    #[tokio::test]
    async fn test_set_then_get_roundtrip_and_update() {
        let pool = setup_test_db().await;

        set_setting(&pool, ACCEPT_THRESHOLD_KEY, 0.75).await.unwrap();
        let value: Option<f64> = get_setting(&pool, ACCEPT_THRESHOLD_KEY).await.unwrap();
        assert_eq!(value, Some(0.75));

        set_setting(&pool, ACCEPT_THRESHOLD_KEY, 0.8).await.unwrap();
        let value: Option<f64> = get_setting(&pool, ACCEPT_THRESHOLD_KEY).await.unwrap();
        assert_eq!(value, Some(0.8));
    }

    #[tokio::test]
    async fn test_null_value_is_none() {
        let pool = setup_test_db().await;
        sqlx::query("INSERT INTO settings (key, value) VALUES (?, NULL)")
            .bind(EDIT_WEIGHT_KEY)
            .execute(&pool)
            .await
            .unwrap();

        let value: Option<f64> = get_setting(&pool, EDIT_WEIGHT_KEY).await.unwrap();
        assert_eq!(value, None);
    }

    #[tokio::test]
    async fn test_unparseable_value_is_config_error() {
        let pool = setup_test_db().await;
        set_setting(&pool, MAX_LOCK_WAIT_MS_KEY, "soon").await.unwrap();

        let result: Result<Option<u64>> = get_setting(&pool, MAX_LOCK_WAIT_MS_KEY).await;
        assert!(matches!(result, Err(Error::Config(_))));
    }
}
