//! Teams owned by organizers, and the player rosters behind them.

pub mod manager;
pub mod models;

pub use manager::{TeamError, TeamManager, TeamResult};
pub use models::{
    MemberId, MembershipRole, NewTeam, NewTeamMember, Team, TeamFilter, TeamId, TeamMember,
    TeamMemberFilter, TeamMemberUpdate, TeamUpdate,
};
