//! Payment error types.

use super::PaymentId;
use crate::validation::FieldErrors;
use thiserror::Error;

/// Payment errors
#[derive(Debug, Error)]
pub enum PaymentError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Payment not found, or not visible to the caller
    #[error("Payment not found: {0}")]
    NotFound(PaymentId),

    /// Invalid amount or reference
    #[error("Invalid input: {0}")]
    Validation(FieldErrors),

    #[error("Forbidden: {0}")]
    Forbidden(&'static str),
}

impl PaymentError {
    /// Get a client-safe error message that doesn't leak sensitive information
    ///
    /// Database errors are sanitized and payment IDs are redacted.
    pub fn client_message(&self) -> String {
        match self {
            PaymentError::Database(_) => "Internal server error".to_string(),
            PaymentError::NotFound(_) => "Payment not found".to_string(),
            _ => self.to_string(),
        }
    }
}

impl From<FieldErrors> for PaymentError {
    fn from(errors: FieldErrors) -> Self {
        PaymentError::Validation(errors)
    }
}

/// Result type for payment operations
pub type PaymentResult<T> = Result<T, PaymentError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_message_redacts_ids() {
        assert_eq!(PaymentError::NotFound(41).client_message(), "Payment not found");
        assert_eq!(
            PaymentError::Database(sqlx::Error::PoolTimedOut).client_message(),
            "Internal server error"
        );
    }
}
