//! Error types for fourcut.

use thiserror::Error;

/// Application result type.
pub type AppResult<T> = Result<T, AppError>;

/// Application error type.
#[derive(Debug, Error)]
pub enum AppError {
    // === Client Errors ===
    /// Self-referential or otherwise malformed request.
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    /// Referenced record does not exist, or the caller lacks the role to act on it.
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("User not found: {0}")]
    UserNotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    /// Duplicate pending or accepted relationship.
    #[error("Conflict: {0}")]
    Conflict(String),

    // === Server Errors ===
    #[error("Database error: {0}")]
    Database(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Returns the error code for boundary-layer responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidOperation(_) => "INVALID_OPERATION",
            Self::NotFound(_) => "NOT_FOUND",
            Self::UserNotFound(_) => "USER_NOT_FOUND",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Conflict(_) => "CONFLICT",
            Self::Database(_) => "DATABASE_ERROR",
            Self::Storage(_) => "STORAGE_ERROR",
            Self::Config(_) => "CONFIG_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Returns whether this error is an infrastructure failure rather than a domain rejection.
    #[must_use]
    pub const fn is_server_error(&self) -> bool {
        matches!(
            self,
            Self::Database(_) | Self::Storage(_) | Self::Config(_) | Self::Internal(_)
        )
    }

    /// Returns whether this error is one of the not-found kinds.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_) | Self::UserNotFound(_))
    }
}

// === From implementations ===

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(
            AppError::InvalidOperation("self".to_string()).error_code(),
            "INVALID_OPERATION"
        );
        assert_eq!(AppError::Conflict("dup".to_string()).error_code(), "CONFLICT");
        assert_eq!(AppError::NotFound("x".to_string()).error_code(), "NOT_FOUND");
    }

    #[test]
    fn test_server_error_classification() {
        assert!(AppError::Database("down".to_string()).is_server_error());
        assert!(AppError::Storage("disk full".to_string()).is_server_error());
        assert!(!AppError::Conflict("dup".to_string()).is_server_error());
        assert!(!AppError::NotFound("x".to_string()).is_server_error());
    }

    #[test]
    fn test_display() {
        let err = AppError::Conflict("Already friends".to_string());
        assert_eq!(err.to_string(), "Conflict: Already friends");
    }

    #[test]
    fn test_is_not_found() {
        assert!(AppError::UserNotFound("u1".to_string()).is_not_found());
        assert!(!AppError::Validation("no".to_string()).is_not_found());
    }
}
