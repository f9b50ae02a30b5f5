//! Database access for assess-import
//!
//! The schema itself lives in `assess_common::db`; this module holds the queries the
//! import engine runs against it.

pub mod batches;
pub mod catalog;
pub mod mappings;
pub mod settings;

use assess_common::Result;
use sqlx::SqlitePool;
use std::path::Path;

/// Open the shared database in the root folder, creating tables as needed
pub async fn init_database_pool(db_path: &Path) -> Result<SqlitePool> {
    tracing::debug!("Connecting to database: {}", db_path.display());
    assess_common::db::init_database(db_path).await
}
