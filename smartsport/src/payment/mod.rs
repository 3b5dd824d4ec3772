//! Payment ledger.
//!
//! Amounts are integer cents. Players record and see their own payments;
//! administrators see every payment and move them between states
//! (`pending`, `paid`, `refused`, `refunded`).

pub mod errors;
pub mod manager;
pub mod models;

pub use errors::{PaymentError, PaymentResult};
pub use manager::PaymentManager;
pub use models::{
    NewPayment, Payment, PaymentFilter, PaymentId, PaymentMethod, PaymentStatus, PaymentUpdate,
};
