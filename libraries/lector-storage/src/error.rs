/// Storage-specific errors
use thiserror::Error;

/// Result type alias using `StorageError`
pub type Result<T> = std::result::Result<T, StorageError>;

/// Storage error types
#[derive(Error, Debug)]
pub enum StorageError {
    /// Database connection error
    #[error("Database connection error: {0}")]
    Connection(String),

    /// Migration error
    #[error("Migration error: {0}")]
    Migration(String),

    /// Stored bytes could not be decoded, or a record could not be encoded
    #[error("Serialization error for key '{key}': {message}")]
    Serialization { key: String, message: String },

    /// Database error from `SQLx`
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

impl StorageError {
    /// Create a serialization error for a key
    pub fn serialization(key: impl Into<String>, err: impl std::fmt::Display) -> Self {
        Self::Serialization {
            key: key.into(),
            message: err.to_string(),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for StorageError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        Self::Migration(err.to_string())
    }
}

impl From<StorageError> for lector_core::LectorError {
    fn from(err: StorageError) -> Self {
        lector_core::LectorError::persistence(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lector_core::LectorError;

    #[test]
    fn converts_into_persistence_error() {
        let err: LectorError = StorageError::serialization("resume/unit/x", "bad json").into();
        assert!(matches!(err, LectorError::Persistence(_)));
        assert!(err.to_string().contains("resume/unit/x"));
        assert!(!err.is_user_facing());
    }
}
