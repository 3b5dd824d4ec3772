//! Tournament registration workflow.
//!
//! A player files a registration against a planned tournament; the organizer
//! owning the tournament (or an administrator) approves or rejects it once.
//! Approval increments the tournament's registered count and enters the
//! registration's team, if any.

pub mod errors;
pub mod manager;
pub mod models;

pub use errors::{RegistrationError, RegistrationResult};
pub use manager::RegistrationManager;
pub use models::{
    Decision, NewRegistration, Registration, RegistrationFilter, RegistrationForm, RegistrationId,
    RegistrationStatus,
};
