//! Common error types for the assessment platform

use thiserror::Error;

/// Common result type for platform operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across platform services
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation error (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Requested resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid user input or request parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// True when SQLite reported lock contention for this error
    pub fn is_lock_error(&self) -> bool {
        match self {
            Error::Database(db_err) => {
                let msg = db_err.to_string();
                msg.contains("database is locked") || msg.contains("database table is locked")
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lock_error_detection_ignores_other_variants() {
        assert!(!Error::NotFound("batch".to_string()).is_lock_error());
        assert!(!Error::Internal("database is locked".to_string()).is_lock_error());
    }

    #[test]
    fn test_display_messages() {
        assert_eq!(
            Error::NotFound("model 'x'".to_string()).to_string(),
            "Not found: model 'x'"
        );
        assert_eq!(
            Error::Config("bad port".to_string()).to_string(),
            "Configuration error: bad port"
        );
    }
}
