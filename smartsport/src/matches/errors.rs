//! Match error types.

use super::MatchId;
use crate::tournament::TournamentId;
use crate::validation::FieldErrors;
use thiserror::Error;

/// Match errors
#[derive(Debug, Error)]
pub enum MatchError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Match not found: {0}")]
    NotFound(MatchId),

    #[error("Tournament not found: {0}")]
    TournamentNotFound(TournamentId),

    /// Bad input, or a state that forbids the operation (finished match,
    /// too few teams, unsupported format)
    #[error("Invalid input: {0}")]
    Validation(FieldErrors),

    #[error("Forbidden: {0}")]
    Forbidden(&'static str),
}

impl MatchError {
    /// Get a client-safe error message that doesn't leak sensitive information
    pub fn client_message(&self) -> String {
        match self {
            MatchError::Database(_) => "Internal server error".to_string(),
            MatchError::NotFound(_) => "Match not found".to_string(),
            MatchError::TournamentNotFound(_) => "Tournament not found".to_string(),
            _ => self.to_string(),
        }
    }
}

impl From<FieldErrors> for MatchError {
    fn from(errors: FieldErrors) -> Self {
        MatchError::Validation(errors)
    }
}

/// Result type for match operations
pub type MatchResult<T> = Result<T, MatchError>;
