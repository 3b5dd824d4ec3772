//! Registration data models.

use crate::auth::UserId;
use crate::directory::SkillLevel;
use crate::team::TeamId;
use crate::text_enum::text_enum;
use crate::tournament::TournamentId;
use crate::validation::{FieldErrors, require_text};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Registration ID type
pub type RegistrationId = i64;

text_enum! {
    /// `pending → approved | rejected`; both outcomes are final.
    pub enum RegistrationStatus {
        Pending => "pending",
        Approved => "approved",
        Rejected => "rejected",
    }
}

impl RegistrationStatus {
    pub fn is_decision(&self) -> bool {
        !matches!(self, RegistrationStatus::Pending)
    }
}

/// A player's request to take part in a tournament
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Registration {
    pub id: RegistrationId,
    pub player_id: UserId,
    pub tournament_id: TournamentId,
    pub team_id: Option<TeamId>,
    pub game: String,
    pub alias: String,
    pub skill_level: SkillLevel,
    pub experience: String,
    pub comment: Option<String>,
    pub status: RegistrationStatus,
    pub created_at: DateTime<Utc>,
    pub decided_at: Option<DateTime<Utc>>,
}

/// What a player fills in to register. The tournament comes from the URL
/// or from [`NewRegistration`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistrationForm {
    pub game: String,
    pub alias: String,
    #[serde(default)]
    pub skill_level: SkillLevel,
    #[serde(default)]
    pub experience: String,
    #[serde(default)]
    pub comment: Option<String>,
    /// Join under an existing team
    #[serde(default)]
    pub team_id: Option<TeamId>,
    /// Join under a team found or created by name
    #[serde(default)]
    pub team_name: Option<String>,
}

impl RegistrationForm {
    pub fn validate(&self) -> FieldErrors {
        let mut errors = FieldErrors::new();
        require_text(&mut errors, "game", &self.game, 100);
        require_text(&mut errors, "alias", &self.alias, 100);
        if let Some(name) = &self.team_name {
            if self.team_id.is_some() {
                errors.add("team_name", "Provide either team_id or team_name, not both.");
            } else {
                require_text(&mut errors, "team_name", name, 100);
            }
        }
        errors
    }
}

/// Body of `POST /registrations`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewRegistration {
    pub tournament_id: TournamentId,
    #[serde(flatten)]
    pub form: RegistrationForm,
}

/// Organizer's verdict on a pending registration
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Decision {
    pub status: RegistrationStatus,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegistrationFilter {
    pub tournament_id: Option<TournamentId>,
    pub status: Option<RegistrationStatus>,
}
