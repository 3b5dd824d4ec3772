//! Matches between teams.
//!
//! This module implements:
//! - Match scheduling with the two-distinct-teams rule
//! - The match lifecycle (`planned`, `ongoing`, `postponed`, then `finished` or `cancelled`)
//! - Score submission under a row lock, frozen once the match is finished
//! - Round-robin and elimination pairing of a tournament's registered teams
//!
//! ## Example
//!
//! ```no_run
//! use smartsport::auth::{Actor, Role};
//! use smartsport::db::Database;
//! use smartsport::matches::{GenerateMatches, MatchManager, ScoreSubmission};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Database::new(&Default::default()).await?;
//!     let matches = MatchManager::new(Arc::new(db.pool().clone()));
//!
//!     let organizer = Actor::new(12, Role::Organizer);
//!     let generated = matches
//!         .generate_matches(&organizer, 3, GenerateMatches::default())
//!         .await?;
//!
//!     let referee = Actor::new(20, Role::Referee);
//!     let first = &generated.matches[0];
//!     let finished = matches
//!         .submit_score(
//!             &referee,
//!             first.id,
//!             ScoreSubmission {
//!                 score1: Some(2),
//!                 score2: Some(1),
//!             },
//!         )
//!         .await?;
//!     println!("{} is {}", finished.name, finished.status);
//!     Ok(())
//! }
//! ```

pub mod errors;
pub mod manager;
pub mod models;
pub mod pairing;

pub use errors::{MatchError, MatchResult};
pub use manager::MatchManager;
pub use models::{
    DEFAULT_SPACING_MINUTES, GenerateMatches, GeneratedMatches, MAX_SPACING_MINUTES, Match,
    MatchFilter, MatchId, MatchStatus, MatchUpdate, NewMatch, ScoreSubmission,
};
pub use pairing::Bracket;
