//! Payment data models.

use crate::auth::UserId;
use crate::text_enum::text_enum;
use crate::validation::FieldErrors;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Payment ID type
pub type PaymentId = i64;

text_enum! {
    /// How a payment was made
    pub enum PaymentMethod {
        Card => "card",
        BankTransfer => "bank_transfer",
        Cash => "cash",
        Other => "other",
    }
}

text_enum! {
    /// Payment state
    pub enum PaymentStatus {
        Pending => "pending",
        Paid => "paid",
        Refused => "refused",
        Refunded => "refunded",
    }
}

impl Default for PaymentStatus {
    fn default() -> Self {
        PaymentStatus::Pending
    }
}

/// Payment record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    pub id: PaymentId,
    pub player_id: UserId,
    /// Amount in cents
    pub amount_cents: i64,
    pub method: PaymentMethod,
    pub status: PaymentStatus,
    pub paid_at: DateTime<Utc>,
}

/// Payment creation request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPayment {
    pub amount_cents: i64,
    pub method: PaymentMethod,
    /// Payer; players always pay for themselves.
    #[serde(default)]
    pub player_id: Option<UserId>,
    /// Initial state; administrators only.
    #[serde(default)]
    pub status: Option<PaymentStatus>,
}

impl NewPayment {
    pub fn validate(&self) -> FieldErrors {
        let mut errors = FieldErrors::new();
        check_amount(&mut errors, self.amount_cents);
        errors
    }
}

/// Administrator edit of a payment
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PaymentUpdate {
    pub amount_cents: Option<i64>,
    pub method: Option<PaymentMethod>,
    pub status: Option<PaymentStatus>,
}

impl PaymentUpdate {
    pub fn validate(&self) -> FieldErrors {
        let mut errors = FieldErrors::new();
        if let Some(amount) = self.amount_cents {
            check_amount(&mut errors, amount);
        }
        errors
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PaymentFilter {
    pub status: Option<PaymentStatus>,
    pub method: Option<PaymentMethod>,
    /// Ignored for players, who only ever see their own payments
    pub player_id: Option<UserId>,
}

fn check_amount(errors: &mut FieldErrors, amount: i64) {
    if amount < 0 {
        errors.add("amount_cents", "Ensure this value is greater than or equal to 0.");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_negative_amount_is_a_field_error() {
        let payment = NewPayment {
            amount_cents: -100,
            method: PaymentMethod::Card,
            player_id: None,
            status: None,
        };
        assert!(payment.validate().contains("amount_cents"));
    }

    #[test]
    fn test_zero_amount_is_allowed() {
        let update = PaymentUpdate {
            amount_cents: Some(0),
            ..Default::default()
        };
        assert!(update.validate().is_empty());
    }

    #[test]
    fn test_method_wire_names() {
        let method: PaymentMethod = serde_json::from_str("\"bank_transfer\"").unwrap();
        assert_eq!(method, PaymentMethod::BankTransfer);
        assert_eq!(PaymentStatus::default().as_str(), "pending");
    }
}
