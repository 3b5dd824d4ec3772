//! Authentication error types.

use crate::validation::FieldErrors;
use thiserror::Error;

/// Authentication errors
#[derive(Debug, Error)]
pub enum AuthError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Password hashing failed
    #[error("Password hashing failed")]
    HashingFailed,

    /// Password verification failed
    #[error("Incorrect password")]
    InvalidPassword,

    /// User not found
    #[error("User not found")]
    UserNotFound,

    /// Account deactivated by an administrator
    #[error("Account is disabled")]
    AccountDisabled,

    /// Request fields failed validation
    #[error("Invalid input: {0}")]
    Validation(FieldErrors),

    /// Administrator accounts cannot be self-registered
    #[error("Role {0} cannot be chosen at registration")]
    RoleNotSelfAssignable(super::Role),

    /// JWT token error
    #[error("JWT error: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),

    /// Session expired
    #[error("Session expired")]
    SessionExpired,

    /// Invalid refresh token
    #[error("Invalid refresh token")]
    InvalidRefreshToken,
}

impl AuthError {
    /// Get a client-safe error message that doesn't leak sensitive information
    pub fn client_message(&self) -> String {
        match self {
            AuthError::Database(_) | AuthError::HashingFailed => {
                "Internal server error".to_string()
            }
            AuthError::JwtError(_) => "Authentication failed".to_string(),
            _ => self.to_string(),
        }
    }
}

impl From<FieldErrors> for AuthError {
    fn from(errors: FieldErrors) -> Self {
        AuthError::Validation(errors)
    }
}

/// Result type for authentication operations
pub type AuthResult<T> = Result<T, AuthError>;
