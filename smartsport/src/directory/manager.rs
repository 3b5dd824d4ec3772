//! Directory manager: account administration and role profiles.

use super::models::{
    OrganizerProfile, OrganizerProfileUpdate, PlayerFilter, PlayerProfile, PlayerProfileUpdate,
    RefereeProfile, UserFilter, UserUpdate,
};
use crate::auth::{
    Actor, AuthError, AuthManager, RegisterRequest, Role, User, UserId,
    manager::{USER_COLUMNS, user_from_row},
};
use crate::db::{is_foreign_key_violation, like_pattern, text_column, unique_violation};
use crate::pagination::Page;
use crate::validation::FieldErrors;
use sqlx::{PgPool, Postgres, QueryBuilder, Row, postgres::PgRow};
use std::sync::Arc;
use thiserror::Error;

/// Directory errors
#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("User not found: {0}")]
    UserNotFound(UserId),

    #[error("No {role} profile for user {user_id}")]
    ProfileNotFound { role: Role, user_id: UserId },

    #[error("Invalid input: {0}")]
    Validation(FieldErrors),

    #[error("Forbidden: {0}")]
    Forbidden(&'static str),

    /// Account creation failed
    #[error(transparent)]
    Account(#[from] AuthError),
}

impl DirectoryError {
    /// Get a client-safe error message
    pub fn client_message(&self) -> String {
        match self {
            DirectoryError::Database(_) => "Internal server error".to_string(),
            DirectoryError::UserNotFound(_) => "User not found".to_string(),
            DirectoryError::ProfileNotFound { role, .. } => format!("{role} profile not found"),
            DirectoryError::Account(e) => e.client_message(),
            _ => self.to_string(),
        }
    }
}

impl From<FieldErrors> for DirectoryError {
    fn from(errors: FieldErrors) -> Self {
        DirectoryError::Validation(errors)
    }
}

pub type DirectoryResult<T> = Result<T, DirectoryError>;

const PLAYER_SELECT: &str = "SELECT u.id AS user_id, u.username, u.first_name, u.last_name, \
     p.skill_level, p.ranking FROM players p JOIN users u ON u.id = p.user_id";

const ORGANIZER_SELECT: &str = "SELECT u.id AS user_id, u.username, u.first_name, u.last_name, \
     o.organization_name, o.description FROM organizers o JOIN users u ON u.id = o.user_id";

const REFEREE_SELECT: &str = "SELECT u.id AS user_id, u.username, u.first_name, u.last_name \
     FROM referees r JOIN users u ON u.id = r.user_id";

fn player_from_row(row: &PgRow) -> Result<PlayerProfile, sqlx::Error> {
    Ok(PlayerProfile {
        user_id: row.try_get("user_id")?,
        username: row.try_get("username")?,
        first_name: row.try_get("first_name")?,
        last_name: row.try_get("last_name")?,
        skill_level: text_column(row, "skill_level")?,
        ranking: row.try_get("ranking")?,
    })
}

fn organizer_from_row(row: &PgRow) -> Result<OrganizerProfile, sqlx::Error> {
    Ok(OrganizerProfile {
        user_id: row.try_get("user_id")?,
        username: row.try_get("username")?,
        first_name: row.try_get("first_name")?,
        last_name: row.try_get("last_name")?,
        organization_name: row.try_get("organization_name")?,
        description: row.try_get("description")?,
    })
}

fn referee_from_row(row: &PgRow) -> Result<RefereeProfile, sqlx::Error> {
    Ok(RefereeProfile {
        user_id: row.try_get("user_id")?,
        username: row.try_get("username")?,
        first_name: row.try_get("first_name")?,
        last_name: row.try_get("last_name")?,
    })
}

fn user_conflict(err: sqlx::Error) -> DirectoryError {
    match unique_violation(&err).as_deref() {
        Some("users_email_key") => {
            FieldErrors::single("email", "A user with this email already exists.").into()
        }
        Some("users_username_key") => {
            FieldErrors::single("username", "A user with that username already exists.").into()
        }
        _ => err.into(),
    }
}

fn paged<'a>(query: &mut QueryBuilder<'a, Postgres>, order: &str, page: Page) {
    let page = page.normalized();
    query
        .push(format!(" ORDER BY {order} LIMIT "))
        .push_bind(page.limit)
        .push(" OFFSET ")
        .push_bind(page.offset);
}

/// Account administration and role profiles
#[derive(Clone)]
pub struct DirectoryManager {
    pool: Arc<PgPool>,
    auth: AuthManager,
}

impl DirectoryManager {
    /// Accounts are created through `auth` so that user and profile rows
    /// are always written together.
    pub fn new(pool: Arc<PgPool>, auth: AuthManager) -> Self {
        Self { pool, auth }
    }

    /// Administrator account creation, any role included.
    pub async fn create_user(&self, actor: &Actor, request: RegisterRequest) -> DirectoryResult<User> {
        if !actor.is_admin() {
            return Err(DirectoryError::Forbidden("only administrators create accounts"));
        }
        Ok(self.auth.create_user(request).await?)
    }

    pub async fn get_user(&self, user_id: UserId) -> DirectoryResult<User> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(user_id)
            .fetch_optional(self.pool.as_ref())
            .await?
            .ok_or(DirectoryError::UserNotFound(user_id))?;
        Ok(user_from_row(&row)?)
    }

    /// Newest accounts first.
    pub async fn list_users(&self, filter: &UserFilter, page: Page) -> DirectoryResult<Vec<User>> {
        let mut query =
            QueryBuilder::<Postgres>::new(format!("SELECT {USER_COLUMNS} FROM users WHERE TRUE"));
        if let Some(role) = filter.role {
            query.push(" AND role = ").push_bind(role.as_str());
        }
        if let Some(search) = filter.search.as_deref().filter(|s| !s.trim().is_empty()) {
            let pattern = like_pattern(search);
            query.push(" AND (username ILIKE ").push_bind(pattern.clone());
            query.push(" OR email ILIKE ").push_bind(pattern.clone());
            query.push(" OR first_name ILIKE ").push_bind(pattern.clone());
            query.push(" OR last_name ILIKE ").push_bind(pattern).push(")");
        }
        paged(&mut query, "created_at DESC, id DESC", page);

        let rows = query.build().fetch_all(self.pool.as_ref()).await?;
        Ok(rows.iter().map(user_from_row).collect::<Result<_, _>>()?)
    }

    /// Edit account fields. Deactivating an account also revokes its sessions.
    pub async fn update_user(
        &self,
        actor: &Actor,
        user_id: UserId,
        update: UserUpdate,
    ) -> DirectoryResult<User> {
        if !actor.is_admin() {
            return Err(DirectoryError::Forbidden("only administrators edit accounts"));
        }
        update.validate().into_result()?;

        let current = self.get_user(user_id).await?;
        let row = sqlx::query(&format!(
            "UPDATE users
             SET email = $1, username = $2, first_name = $3, last_name = $4,
                 phone = $5, is_active = $6
             WHERE id = $7
             RETURNING {USER_COLUMNS}"
        ))
        .bind(update.email.as_deref().map(str::trim).unwrap_or(&current.email))
        .bind(
            update
                .username
                .as_deref()
                .map(str::trim)
                .unwrap_or(&current.username),
        )
        .bind(update.first_name.as_ref().unwrap_or(&current.first_name))
        .bind(update.last_name.as_ref().unwrap_or(&current.last_name))
        .bind(update.phone.or(current.phone))
        .bind(update.is_active.unwrap_or(current.is_active))
        .bind(user_id)
        .fetch_one(self.pool.as_ref())
        .await
        .map_err(user_conflict)?;
        let user = user_from_row(&row)?;

        if current.is_active && !user.is_active {
            let revoked = self.auth.revoke_sessions(user_id).await?;
            log::info!("Deactivated user {} ({} sessions revoked)", user_id, revoked);
        }
        Ok(user)
    }

    /// Delete an account with its profile and sessions.
    ///
    /// Players with recorded payments cannot be deleted.
    pub async fn delete_user(&self, actor: &Actor, user_id: UserId) -> DirectoryResult<()> {
        if !actor.is_admin() {
            return Err(DirectoryError::Forbidden("only administrators delete accounts"));
        }
        if actor.user_id == user_id {
            return Err(FieldErrors::single("id", "You cannot delete your own account.").into());
        }

        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(user_id)
            .execute(self.pool.as_ref())
            .await
            .map_err(|e| {
                if is_foreign_key_violation(&e) {
                    FieldErrors::single(
                        "id",
                        "This user is still referenced by payments and cannot be deleted.",
                    )
                    .into()
                } else {
                    DirectoryError::from(e)
                }
            })?;
        if result.rows_affected() == 0 {
            return Err(DirectoryError::UserNotFound(user_id));
        }
        log::info!("User {} deleted by administrator {}", user_id, actor.user_id);
        Ok(())
    }

    pub async fn get_player(&self, user_id: UserId) -> DirectoryResult<PlayerProfile> {
        let row = sqlx::query(&format!("{PLAYER_SELECT} WHERE p.user_id = $1"))
            .bind(user_id)
            .fetch_optional(self.pool.as_ref())
            .await?
            .ok_or(DirectoryError::ProfileNotFound {
                role: Role::Player,
                user_id,
            })?;
        Ok(player_from_row(&row)?)
    }

    /// Best-ranked first; unranked players last.
    pub async fn list_players(
        &self,
        filter: &PlayerFilter,
        page: Page,
    ) -> DirectoryResult<Vec<PlayerProfile>> {
        let mut query = QueryBuilder::<Postgres>::new(format!("{PLAYER_SELECT} WHERE TRUE"));
        if let Some(level) = filter.skill_level {
            query.push(" AND p.skill_level = ").push_bind(level.as_str());
        }
        paged(&mut query, "p.ranking ASC NULLS LAST, u.username", page);

        let rows = query.build().fetch_all(self.pool.as_ref()).await?;
        Ok(rows.iter().map(player_from_row).collect::<Result<_, _>>()?)
    }

    /// Players edit their own profile; administrators edit any.
    pub async fn update_player(
        &self,
        actor: &Actor,
        user_id: UserId,
        update: PlayerProfileUpdate,
    ) -> DirectoryResult<PlayerProfile> {
        if !(actor.is_admin() || (actor.role == Role::Player && actor.user_id == user_id)) {
            return Err(DirectoryError::Forbidden("players may only edit their own profile"));
        }
        update.validate().into_result()?;

        let current = self.get_player(user_id).await?;
        sqlx::query("UPDATE players SET skill_level = $1, ranking = $2 WHERE user_id = $3")
            .bind(update.skill_level.unwrap_or(current.skill_level).as_str())
            .bind(update.ranking.or(current.ranking))
            .bind(user_id)
            .execute(self.pool.as_ref())
            .await?;
        self.get_player(user_id).await
    }

    pub async fn get_organizer(&self, user_id: UserId) -> DirectoryResult<OrganizerProfile> {
        let row = sqlx::query(&format!("{ORGANIZER_SELECT} WHERE o.user_id = $1"))
            .bind(user_id)
            .fetch_optional(self.pool.as_ref())
            .await?
            .ok_or(DirectoryError::ProfileNotFound {
                role: Role::Organizer,
                user_id,
            })?;
        Ok(organizer_from_row(&row)?)
    }

    pub async fn list_organizers(&self, page: Page) -> DirectoryResult<Vec<OrganizerProfile>> {
        let mut query = QueryBuilder::<Postgres>::new(ORGANIZER_SELECT);
        paged(&mut query, "o.organization_name, u.id", page);
        let rows = query.build().fetch_all(self.pool.as_ref()).await?;
        Ok(rows.iter().map(organizer_from_row).collect::<Result<_, _>>()?)
    }

    /// Organizers edit their own profile; administrators edit any.
    pub async fn update_organizer(
        &self,
        actor: &Actor,
        user_id: UserId,
        update: OrganizerProfileUpdate,
    ) -> DirectoryResult<OrganizerProfile> {
        if !actor.manages(user_id) {
            return Err(DirectoryError::Forbidden("organizers may only edit their own profile"));
        }
        update.validate().into_result()?;

        let current = self.get_organizer(user_id).await?;
        sqlx::query(
            "UPDATE organizers SET organization_name = $1, description = $2 WHERE user_id = $3",
        )
        .bind(
            update
                .organization_name
                .as_deref()
                .map(str::trim)
                .unwrap_or(&current.organization_name),
        )
        .bind(update.description.as_ref().unwrap_or(&current.description))
        .bind(user_id)
        .execute(self.pool.as_ref())
        .await?;
        self.get_organizer(user_id).await
    }

    pub async fn get_referee(&self, user_id: UserId) -> DirectoryResult<RefereeProfile> {
        let row = sqlx::query(&format!("{REFEREE_SELECT} WHERE r.user_id = $1"))
            .bind(user_id)
            .fetch_optional(self.pool.as_ref())
            .await?
            .ok_or(DirectoryError::ProfileNotFound {
                role: Role::Referee,
                user_id,
            })?;
        Ok(referee_from_row(&row)?)
    }

    pub async fn list_referees(&self, page: Page) -> DirectoryResult<Vec<RefereeProfile>> {
        let mut query = QueryBuilder::<Postgres>::new(REFEREE_SELECT);
        paged(&mut query, "u.username", page);
        let rows = query.build().fetch_all(self.pool.as_ref()).await?;
        Ok(rows.iter().map(referee_from_row).collect::<Result<_, _>>()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> DirectoryManager {
        let pool = Arc::new(
            sqlx::postgres::PgPoolOptions::new()
                .connect_lazy("postgres://localhost/smartsport_unit")
                .unwrap(),
        );
        let auth = AuthManager::new(
            pool.clone(),
            "unit_test_pepper".to_string(),
            "unit_test_secret_that_is_long_enough".to_string(),
        );
        DirectoryManager::new(pool, auth)
    }

    #[tokio::test]
    async fn test_players_cannot_edit_other_players() {
        let result = manager()
            .update_player(
                &Actor::new(5, Role::Player),
                6,
                PlayerProfileUpdate::default(),
            )
            .await;
        assert!(matches!(result, Err(DirectoryError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_organizers_cannot_edit_other_organizers() {
        let result = manager()
            .update_organizer(
                &Actor::new(5, Role::Organizer),
                6,
                OrganizerProfileUpdate::default(),
            )
            .await;
        assert!(matches!(result, Err(DirectoryError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_administrator_cannot_delete_self() {
        let result = manager()
            .delete_user(&Actor::new(1, Role::Administrator), 1)
            .await;
        assert!(matches!(result, Err(DirectoryError::Validation(_))));
    }

    #[tokio::test]
    async fn test_only_administrators_create_accounts() {
        let request = RegisterRequest {
            email: "ref@example.com".to_string(),
            username: "ref".to_string(),
            password: "longenough".to_string(),
            role: Some(Role::Referee),
            first_name: None,
            last_name: None,
            phone: None,
            organization_name: None,
        };
        let result = manager()
            .create_user(&Actor::new(2, Role::Organizer), request)
            .await;
        assert!(matches!(result, Err(DirectoryError::Forbidden(_))));
    }

    #[test]
    fn test_profile_not_found_names_the_role() {
        let err = DirectoryError::ProfileNotFound {
            role: Role::Referee,
            user_id: 3,
        };
        assert_eq!(err.client_message(), "referee profile not found");
    }
}
