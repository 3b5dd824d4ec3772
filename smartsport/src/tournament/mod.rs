//! Tournament catalog.
//!
//! This module provides:
//! - Tournament creation with schedule and fee validation
//! - Filtered listing and search
//! - Lifecycle transitions (`planned → ongoing → finished`, or `cancelled`)
//! - Team entries and per-tournament statistics
//!
//! ## Example
//!
//! ```no_run
//! use smartsport::auth::{Actor, Role};
//! use smartsport::db::Database;
//! use smartsport::tournament::{NewTournament, TournamentFormat, TournamentManager};
//! use chrono::{Duration, Utc};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Database::new(&Default::default()).await?;
//!     let tournaments = TournamentManager::new(Arc::new(db.pool().clone()));
//!
//!     let starts_at = Utc::now() + Duration::days(7);
//!     let organizer = Actor::new(12, Role::Organizer);
//!     let cup = tournaments
//!         .create_tournament(
//!             &organizer,
//!             NewTournament {
//!                 name: "Spring Cup".to_string(),
//!                 description: String::new(),
//!                 rules: String::new(),
//!                 format: TournamentFormat::RoundRobin,
//!                 starts_at,
//!                 ends_at: starts_at + Duration::days(1),
//!                 entry_fee_cents: 1500,
//!                 organizer_id: None,
//!             },
//!         )
//!         .await?;
//!     println!("Created tournament {}", cup.id);
//!     Ok(())
//! }
//! ```

pub mod manager;
pub mod models;

pub use manager::{TournamentError, TournamentManager, TournamentResult};
pub use models::{
    MatchCounts, NewTournament, RegistrationCounts, Tournament, TournamentFilter, TournamentFormat,
    TournamentId, TournamentStats, TournamentStatus, TournamentUpdate,
};
