//! Team and roster models.

use crate::auth::UserId;
use crate::text_enum::text_enum;
use crate::validation::{FieldErrors, require_text};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Team ID type
pub type TeamId = i64;

/// Team membership ID type
pub type MemberId = i64;

text_enum! {
    /// Position of a player within a team.
    pub enum MembershipRole {
        Captain => "captain",
        Member => "member",
        Substitute => "substitute",
    }
}

impl Default for MembershipRole {
    fn default() -> Self {
        MembershipRole::Member
    }
}

/// Team record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Team {
    pub id: TeamId,
    pub name: String,
    pub organizer_id: UserId,
    pub created_at: DateTime<Utc>,
}

/// Team creation request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTeam {
    pub name: String,
    /// Owner; only read when an administrator creates the team.
    #[serde(default)]
    pub organizer_id: Option<UserId>,
}

impl NewTeam {
    pub fn validate(&self) -> FieldErrors {
        let mut errors = FieldErrors::new();
        require_text(&mut errors, "name", &self.name, 100);
        errors
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TeamUpdate {
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TeamFilter {
    pub organizer_id: Option<UserId>,
    pub search: Option<String>,
}

/// A player's place on a team roster
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamMember {
    pub id: MemberId,
    pub player_id: UserId,
    pub team_id: TeamId,
    pub role: MembershipRole,
    pub joined_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTeamMember {
    pub player_id: UserId,
    pub team_id: TeamId,
    #[serde(default)]
    pub role: MembershipRole,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TeamMemberUpdate {
    pub role: Option<MembershipRole>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TeamMemberFilter {
    pub team_id: Option<TeamId>,
    pub player_id: Option<UserId>,
    pub role: Option<MembershipRole>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_team_name_is_rejected() {
        let team = NewTeam {
            name: "  ".to_string(),
            organizer_id: None,
        };
        assert!(team.validate().contains("name"));
    }

    #[test]
    fn test_member_role_defaults_to_member() {
        let member: NewTeamMember =
            serde_json::from_str(r#"{"player_id": 3, "team_id": 4}"#).unwrap();
        assert_eq!(member.role, MembershipRole::Member);
    }
}
