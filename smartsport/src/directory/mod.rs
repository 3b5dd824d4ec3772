//! User directory: administrator account management and the player,
//! organizer and referee profiles.

pub mod manager;
pub mod models;

pub use manager::{DirectoryError, DirectoryManager, DirectoryResult};
pub use models::{
    OrganizerProfile, OrganizerProfileUpdate, PlayerFilter, PlayerProfile, PlayerProfileUpdate,
    RefereeProfile, SkillLevel, UserFilter, UserUpdate,
};
