//! User directory and role-profile models.

use crate::auth::{Role, UserId};
use crate::text_enum::text_enum;
use crate::validation::{FieldErrors, require_text};
use serde::{Deserialize, Serialize};

text_enum! {
    /// Self-declared player level.
    pub enum SkillLevel {
        Beginner => "beginner",
        Intermediate => "intermediate",
        Advanced => "advanced",
        Expert => "expert",
    }
}

impl Default for SkillLevel {
    fn default() -> Self {
        SkillLevel::Beginner
    }
}

/// Administrator edit of an account. The role is fixed at creation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserUpdate {
    pub email: Option<String>,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub is_active: Option<bool>,
}

impl UserUpdate {
    pub fn validate(&self) -> FieldErrors {
        let mut errors = FieldErrors::new();
        if let Some(email) = &self.email {
            if !email.trim().split_once('@').is_some_and(|(l, d)| !l.is_empty() && !d.is_empty()) {
                errors.add("email", "Enter a valid email address.");
            }
        }
        if let Some(username) = &self.username {
            require_text(&mut errors, "username", username, 150);
        }
        if let Some(phone) = &self.phone {
            if phone.chars().count() > 20 {
                errors.add("phone", "Ensure this field has no more than 20 characters.");
            }
        }
        errors
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserFilter {
    pub role: Option<Role>,
    /// Case-insensitive match on username, email, first or last name
    pub search: Option<String>,
}

/// Player profile as exposed by the API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerProfile {
    pub user_id: UserId,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub skill_level: SkillLevel,
    pub ranking: Option<i32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlayerProfileUpdate {
    pub skill_level: Option<SkillLevel>,
    pub ranking: Option<i32>,
}

impl PlayerProfileUpdate {
    pub fn validate(&self) -> FieldErrors {
        let mut errors = FieldErrors::new();
        if self.ranking.is_some_and(|r| r < 1) {
            errors.add("ranking", "Ensure this value is greater than or equal to 1.");
        }
        errors
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PlayerFilter {
    pub skill_level: Option<SkillLevel>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrganizerProfile {
    pub user_id: UserId,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub organization_name: String,
    pub description: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrganizerProfileUpdate {
    pub organization_name: Option<String>,
    pub description: Option<String>,
}

impl OrganizerProfileUpdate {
    pub fn validate(&self) -> FieldErrors {
        let mut errors = FieldErrors::new();
        if let Some(name) = &self.organization_name {
            require_text(&mut errors, "organization_name", name, 100);
        }
        errors
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefereeProfile {
    pub user_id: UserId,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_update_checks_only_present_fields() {
        assert!(UserUpdate::default().validate().is_empty());

        let update = UserUpdate {
            email: Some("nobody".to_string()),
            phone: Some("0".repeat(21)),
            ..Default::default()
        };
        let errors = update.validate();
        assert!(errors.contains("email"));
        assert!(errors.contains("phone"));
        assert!(!errors.contains("username"));
    }

    #[test]
    fn test_ranking_starts_at_one() {
        let update = PlayerProfileUpdate {
            skill_level: None,
            ranking: Some(0),
        };
        assert!(update.validate().contains("ranking"));
    }

    #[test]
    fn test_skill_level_defaults_to_beginner() {
        assert_eq!(SkillLevel::default(), SkillLevel::Beginner);
        assert_eq!("expert".parse::<SkillLevel>().unwrap(), SkillLevel::Expert);
    }
}
