//! Authentication data models.

use crate::text_enum::text_enum;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// User ID type
pub type UserId = i64;

text_enum! {
    /// Account role. Fixed at creation; selects which profile row exists.
    pub enum Role {
        Player => "player",
        Organizer => "organizer",
        Referee => "referee",
        Administrator => "administrator",
    }
}

impl Role {
    /// Table holding this role's profile rows.
    pub(crate) fn profile_table(&self) -> &'static str {
        match self {
            Role::Player => "players",
            Role::Organizer => "organizers",
            Role::Referee => "referees",
            Role::Administrator => "administrators",
        }
    }
}

/// User model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub username: String,
    pub role: Role,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
}

/// The authenticated caller of an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub user_id: UserId,
    pub role: Role,
}

impl Actor {
    pub fn new(user_id: UserId, role: Role) -> Self {
        Self { user_id, role }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Administrator
    }

    /// Administrators manage everything; organizers manage what they own.
    pub fn manages(&self, organizer_id: UserId) -> bool {
        self.is_admin() || (self.role == Role::Organizer && self.user_id == organizer_id)
    }

    /// Owner of a record this actor creates: organizers own their own
    /// records, administrators name the organizer explicitly.
    pub fn owner_for(&self, requested: Option<UserId>) -> Option<UserId> {
        match self.role {
            Role::Organizer => Some(self.user_id),
            Role::Administrator => requested,
            _ => None,
        }
    }
}

/// Account creation request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub role: Option<Role>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    /// Only read for organizer accounts.
    #[serde(default)]
    pub organization_name: Option<String>,
}

impl RegisterRequest {
    /// Role requested, defaulting to player.
    pub fn role(&self) -> Role {
        self.role.unwrap_or(Role::Player)
    }
}

/// User login request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Session tokens
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionTokens {
    pub access_token: String,
    pub refresh_token: String,
}

/// JWT claims for access token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessTokenClaims {
    pub sub: UserId,
    pub username: String,
    pub role: Role,
    pub exp: i64,
    pub iat: i64,
}

impl AccessTokenClaims {
    pub fn actor(&self) -> Actor {
        Actor::new(self.sub, self.role)
    }
}
