//! Accounts, sessions and role-based authorization.
//!
//! - Argon2id password hashing with a server-side pepper
//! - JWT access tokens carrying the account role (15-minute expiry)
//! - Rotating refresh tokens stored as SHA-256 digests (7-day expiry)
//! - Role profile rows created in the same transaction as the user
//! - A single authorization table, [`Policy`]
//!
//! ## Example
//!
//! ```no_run
//! use smartsport::auth::{AuthManager, RegisterRequest, Role};
//! use smartsport::db::Database;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Database::new(&Default::default()).await?;
//!     let auth = AuthManager::new(
//!         Arc::new(db.pool().clone()),
//!         "secret_pepper".to_string(),
//!         "jwt_secret".to_string(),
//!     );
//!
//!     let user = auth
//!         .register(RegisterRequest {
//!             email: "org@example.com".to_string(),
//!             username: "org".to_string(),
//!             password: "SecurePass123".to_string(),
//!             role: Some(Role::Organizer),
//!             first_name: None,
//!             last_name: None,
//!             phone: None,
//!             organization_name: Some("Arena League".to_string()),
//!         })
//!         .await?;
//!     println!("Registered {} as {}", user.username, user.role);
//!     Ok(())
//! }
//! ```

pub mod errors;
pub mod manager;
pub mod models;
pub mod policy;

pub use errors::{AuthError, AuthResult};
pub use manager::{AuthManager, validate_registration};
pub use models::{
    AccessTokenClaims, Actor, LoginRequest, RegisterRequest, Role, SessionTokens, User, UserId,
};
pub use policy::{Action, Denied, Policy, Resource};
