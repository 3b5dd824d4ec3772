//! # SmartSport
//!
//! Core library of an e-sport tournament management backend.
//!
//! Domain records live in PostgreSQL. Every module exposes a manager that
//! takes the authenticated [`auth::Actor`], enforces ownership and runs its
//! multi-step writes inside one SQL transaction.
//!
//! ## Core Modules
//!
//! - [`auth`]: accounts, role profiles, sessions and the role policy table
//! - [`directory`]: user administration and player/organizer/referee profiles
//! - [`team`]: teams and their rosters
//! - [`tournament`]: tournaments, their lifecycle and registered teams
//! - [`registration`]: players applying to tournaments, organizer decisions
//! - [`matches`]: scheduling, scoring and automatic pairing
//! - [`payment`]: the payment ledger
//! - [`faq`]: the FAQ knowledge base
//! - [`dashboard`]: administrator overview
//!
//! ## Example
//!
//! ```no_run
//! use smartsport::auth::{AuthManager, LoginRequest};
//! use smartsport::db::{Database, DatabaseConfig};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Database::new(&DatabaseConfig::from_env()).await?;
//!     let pool = Arc::new(db.pool().clone());
//!     let auth = AuthManager::new(pool, "pepper-of-sixteen+".into(), "s".repeat(32));
//!
//!     let (user, tokens) = auth
//!         .login(LoginRequest {
//!             email: "alice@example.com".into(),
//!             password: "correct horse".into(),
//!         })
//!         .await?;
//!     println!("{} logged in: {}", user.username, tokens.access_token);
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod dashboard;
pub mod db;
pub mod directory;
pub mod faq;
pub mod matches;
pub mod pagination;
pub mod payment;
pub mod registration;
pub mod team;
pub mod tournament;
pub mod validation;

mod text_enum;

pub use pagination::Page;
pub use text_enum::UnknownVariant;
pub use validation::FieldErrors;
