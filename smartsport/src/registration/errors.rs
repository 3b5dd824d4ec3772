//! Registration error types.

use super::RegistrationId;
use crate::tournament::TournamentId;
use crate::validation::FieldErrors;
use thiserror::Error;

/// Registration workflow errors
#[derive(Debug, Error)]
pub enum RegistrationError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Registration not found: {0}")]
    NotFound(RegistrationId),

    #[error("Tournament not found: {0}")]
    TournamentNotFound(TournamentId),

    /// Request fields failed validation, or the workflow state forbids the step
    #[error("Invalid input: {0}")]
    Validation(FieldErrors),

    #[error("Forbidden: {0}")]
    Forbidden(&'static str),
}

impl RegistrationError {
    /// Get a client-safe error message that doesn't leak sensitive information
    pub fn client_message(&self) -> String {
        match self {
            RegistrationError::Database(_) => "Internal server error".to_string(),
            RegistrationError::NotFound(_) => "Registration not found".to_string(),
            RegistrationError::TournamentNotFound(_) => "Tournament not found".to_string(),
            _ => self.to_string(),
        }
    }
}

impl From<FieldErrors> for RegistrationError {
    fn from(errors: FieldErrors) -> Self {
        RegistrationError::Validation(errors)
    }
}

/// Result type for registration operations
pub type RegistrationResult<T> = Result<T, RegistrationError>;
