use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::auth::identity::SessionOperation;

/// Errors produced by the session lifecycle
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// The verifier rejected the email/password pair or the provider flow
    #[error("Invalid credentials: {reason}")]
    InvalidCredentials {
        reason: String,
    },

    /// Reading or writing the persisted session record failed
    #[error("Session persistence failed: {reason}")]
    PersistenceFailure {
        reason: String,
    },

    /// The persisted session record could not be decoded
    #[error("Stored session record is malformed: {reason}")]
    MalformedStoredRecord {
        reason: String,
    },

    /// Another mutating session operation is still in flight
    #[error("Session operation '{operation}' is already in progress")]
    OperationInProgress {
        operation: SessionOperation,
    },

    /// The task running the operation stopped before it settled
    #[error("Session operation '{operation}' was interrupted")]
    Interrupted {
        operation: SessionOperation,
    },
}

impl AuthError {
    pub fn invalid_credentials(reason: impl Into<String>) -> Self {
        AuthError::InvalidCredentials {
            reason: reason.into(),
        }
    }

    pub fn persistence(reason: impl Into<String>) -> Self {
        AuthError::PersistenceFailure {
            reason: reason.into(),
        }
    }

    pub fn malformed(reason: impl Into<String>) -> Self {
        AuthError::MalformedStoredRecord {
            reason: reason.into(),
        }
    }

    /// Error code for programmatic handling in the view layer
    pub fn code(&self) -> ErrorCode {
        match self {
            AuthError::InvalidCredentials { .. } => ErrorCode::AuthInvalidCredentials,
            AuthError::PersistenceFailure { .. } => ErrorCode::SessionPersistenceFailed,
            AuthError::MalformedStoredRecord { .. } => ErrorCode::SessionRecordMalformed,
            AuthError::OperationInProgress { .. } => ErrorCode::SessionBusy,
            AuthError::Interrupted { .. } => ErrorCode::SessionInterrupted,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            AuthError::InvalidCredentials { .. } => ErrorSeverity::Warning,
            AuthError::OperationInProgress { .. } => ErrorSeverity::Info,
            AuthError::MalformedStoredRecord { .. } => ErrorSeverity::Warning,
            AuthError::Interrupted { .. } => ErrorSeverity::Warning,
            AuthError::PersistenceFailure { .. } => ErrorSeverity::Error,
        }
    }

    /// Returns true if repeating the same call later may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AuthError::PersistenceFailure { .. }
                | AuthError::OperationInProgress { .. }
                | AuthError::Interrupted { .. }
        )
    }

    /// Short message suitable for a toast
    pub fn user_message(&self) -> &'static str {
        match self {
            AuthError::InvalidCredentials { .. } => {
                "Please check your email and password and try again."
            }
            AuthError::PersistenceFailure { .. } => {
                "Could not save your session. Please try again."
            }
            AuthError::MalformedStoredRecord { .. } => "Your saved session was reset.",
            AuthError::OperationInProgress { .. } => "Please wait for the current request to finish.",
            AuthError::Interrupted { .. } => "The request was interrupted. Please try again.",
        }
    }
}

/// Error codes for different types of errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    AuthInvalidCredentials,
    SessionPersistenceFailed,
    SessionRecordMalformed,
    SessionBusy,
    SessionInterrupted,
}

/// Severity levels for errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorSeverity {
    /// Informational messages that don't impact functionality
    Info,
    /// Warnings that might impact functionality but don't stop operation
    Warning,
    /// Errors that impact functionality but allow continued operation
    Error,
}

/// Serializable error summary handed to the view layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorReport {
    /// Error code for programmatic handling
    pub code: ErrorCode,
    /// User-facing message
    pub message: String,
    /// Technical detail, kept out of the toast
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    pub severity: ErrorSeverity,
    pub retryable: bool,
}

impl From<&AuthError> for ErrorReport {
    fn from(error: &AuthError) -> Self {
        Self {
            code: error.code(),
            message: error.user_message().to_string(),
            detail: Some(error.to_string()),
            severity: error.severity(),
            retryable: error.is_retryable(),
        }
    }
}

impl From<AuthError> for ErrorReport {
    fn from(error: AuthError) -> Self {
        ErrorReport::from(&error)
    }
}

/// Result type for session operations
pub type AuthResult<T> = Result<T, AuthError>;
