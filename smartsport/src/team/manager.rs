//! Team and roster manager.

use super::models::{
    MemberId, MembershipRole, NewTeam, NewTeamMember, Team, TeamFilter, TeamId, TeamMember,
    TeamMemberFilter, TeamMemberUpdate, TeamUpdate,
};
use crate::auth::{Actor, UserId};
use crate::db::{foreign_key_field, like_pattern, text_column, unique_violation};
use crate::pagination::Page;
use crate::validation::{FieldErrors, INVALID_REFERENCE, require_text};
use sqlx::{PgExecutor, PgPool, Postgres, QueryBuilder, Row, postgres::PgRow};
use std::sync::Arc;
use thiserror::Error;

/// Team errors
#[derive(Debug, Error)]
pub enum TeamError {
    #[error("Team not found: {0}")]
    TeamNotFound(TeamId),

    #[error("Team member not found: {0}")]
    MemberNotFound(MemberId),

    #[error("Invalid input: {0}")]
    Validation(FieldErrors),

    #[error("Forbidden: {0}")]
    Forbidden(&'static str),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl TeamError {
    /// Get a client-safe error message
    pub fn client_message(&self) -> String {
        match self {
            TeamError::Database(_) => "Internal server error".to_string(),
            TeamError::TeamNotFound(_) => "Team not found".to_string(),
            TeamError::MemberNotFound(_) => "Team member not found".to_string(),
            _ => self.to_string(),
        }
    }
}

impl From<FieldErrors> for TeamError {
    fn from(errors: FieldErrors) -> Self {
        TeamError::Validation(errors)
    }
}

pub type TeamResult<T> = Result<T, TeamError>;

const TEAM_COLUMNS: &str = "id, name, organizer_id, created_at";
const MEMBER_COLUMNS: &str = "id, player_id, team_id, role, joined_at";

fn team_from_row(row: &PgRow) -> Result<Team, sqlx::Error> {
    Ok(Team {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        organizer_id: row.try_get("organizer_id")?,
        created_at: row.try_get("created_at")?,
    })
}

fn member_from_row(row: &PgRow) -> Result<TeamMember, sqlx::Error> {
    Ok(TeamMember {
        id: row.try_get("id")?,
        player_id: row.try_get("player_id")?,
        team_id: row.try_get("team_id")?,
        role: text_column(row, "role")?,
        joined_at: row.try_get("joined_at")?,
    })
}

/// Insert a team row. Shared with the registration workflow, which creates
/// teams inside its own transaction.
pub(crate) async fn insert_team<'e>(
    executor: impl PgExecutor<'e>,
    name: &str,
    organizer_id: UserId,
) -> Result<Team, sqlx::Error> {
    let row = sqlx::query(&format!(
        "INSERT INTO teams (name, organizer_id) VALUES ($1, $2) RETURNING {TEAM_COLUMNS}"
    ))
    .bind(name)
    .bind(organizer_id)
    .fetch_one(executor)
    .await?;
    team_from_row(&row)
}

pub(crate) async fn find_team_by_name<'e>(
    executor: impl PgExecutor<'e>,
    name: &str,
) -> Result<Option<Team>, sqlx::Error> {
    sqlx::query(&format!("SELECT {TEAM_COLUMNS} FROM teams WHERE name = $1"))
        .bind(name)
        .fetch_optional(executor)
        .await?
        .as_ref()
        .map(team_from_row)
        .transpose()
}

/// Add a player to a roster; an existing membership is left as it is.
pub(crate) async fn ensure_member<'e>(
    executor: impl PgExecutor<'e>,
    team_id: TeamId,
    player_id: UserId,
    role: MembershipRole,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO team_members (player_id, team_id, role) VALUES ($1, $2, $3)
         ON CONFLICT ON CONSTRAINT team_members_player_team_key DO NOTHING",
    )
    .bind(player_id)
    .bind(team_id)
    .bind(role.as_str())
    .execute(executor)
    .await?;
    Ok(())
}

fn team_conflict(err: sqlx::Error) -> TeamError {
    if unique_violation(&err).as_deref() == Some("teams_name_key") {
        return FieldErrors::single("name", "team with this name already exists.").into();
    }
    if let Some(field) = foreign_key_field(&err, "teams") {
        return FieldErrors::single(field, INVALID_REFERENCE).into();
    }
    err.into()
}

fn member_conflict(err: sqlx::Error) -> TeamError {
    if unique_violation(&err).as_deref() == Some("team_members_player_team_key") {
        return FieldErrors::single("player_id", "This player is already on the team.").into();
    }
    if let Some(field) = foreign_key_field(&err, "team_members") {
        return FieldErrors::single(field, INVALID_REFERENCE).into();
    }
    err.into()
}

/// Teams and their rosters
#[derive(Clone)]
pub struct TeamManager {
    pool: Arc<PgPool>,
}

impl TeamManager {
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }

    /// Create a team owned by the calling organizer (or, for an
    /// administrator, by `organizer_id`).
    pub async fn create_team(&self, actor: &Actor, request: NewTeam) -> TeamResult<Team> {
        let mut errors = request.validate();
        let owner = actor.owner_for(request.organizer_id);
        if owner.is_none() {
            errors.add("organizer_id", "This field is required.");
        }
        errors.into_result()?;
        let Some(owner) = owner else {
            return Err(TeamError::Forbidden("only organizers own teams"));
        };

        let team = insert_team(self.pool.as_ref(), request.name.trim(), owner)
            .await
            .map_err(team_conflict)?;

        log::info!("Team {} '{}' created for organizer {}", team.id, team.name, owner);
        Ok(team)
    }

    pub async fn get_team(&self, team_id: TeamId) -> TeamResult<Team> {
        let row = sqlx::query(&format!("SELECT {TEAM_COLUMNS} FROM teams WHERE id = $1"))
            .bind(team_id)
            .fetch_optional(self.pool.as_ref())
            .await?
            .ok_or(TeamError::TeamNotFound(team_id))?;
        Ok(team_from_row(&row)?)
    }

    pub async fn list_teams(&self, filter: &TeamFilter, page: Page) -> TeamResult<Vec<Team>> {
        let page = page.normalized();
        let mut query =
            QueryBuilder::<Postgres>::new(format!("SELECT {TEAM_COLUMNS} FROM teams WHERE TRUE"));
        if let Some(organizer_id) = filter.organizer_id {
            query.push(" AND organizer_id = ").push_bind(organizer_id);
        }
        if let Some(search) = filter.search.as_deref().filter(|s| !s.trim().is_empty()) {
            query.push(" AND name ILIKE ").push_bind(like_pattern(search));
        }
        query
            .push(" ORDER BY name, id LIMIT ")
            .push_bind(page.limit)
            .push(" OFFSET ")
            .push_bind(page.offset);

        let rows = query.build().fetch_all(self.pool.as_ref()).await?;
        Ok(rows.iter().map(team_from_row).collect::<Result<_, _>>()?)
    }

    pub async fn update_team(
        &self,
        actor: &Actor,
        team_id: TeamId,
        update: TeamUpdate,
    ) -> TeamResult<Team> {
        let team = self.owned_team(actor, team_id).await?;
        let Some(name) = update.name else {
            return Ok(team);
        };

        let mut errors = FieldErrors::new();
        require_text(&mut errors, "name", &name, 100);
        errors.into_result()?;

        let row = sqlx::query(&format!(
            "UPDATE teams SET name = $1 WHERE id = $2 RETURNING {TEAM_COLUMNS}"
        ))
        .bind(name.trim())
        .bind(team_id)
        .fetch_one(self.pool.as_ref())
        .await
        .map_err(team_conflict)?;
        Ok(team_from_row(&row)?)
    }

    pub async fn delete_team(&self, actor: &Actor, team_id: TeamId) -> TeamResult<()> {
        self.owned_team(actor, team_id).await?;
        sqlx::query("DELETE FROM teams WHERE id = $1")
            .bind(team_id)
            .execute(self.pool.as_ref())
            .await?;
        log::info!("Team {} deleted by user {}", team_id, actor.user_id);
        Ok(())
    }

    /// Put a player on a team the caller manages.
    pub async fn add_member(&self, actor: &Actor, request: NewTeamMember) -> TeamResult<TeamMember> {
        let team = match self.get_team(request.team_id).await {
            Ok(team) => team,
            Err(TeamError::TeamNotFound(_)) => {
                return Err(FieldErrors::single("team_id", INVALID_REFERENCE).into());
            }
            Err(e) => return Err(e),
        };
        if !actor.manages(team.organizer_id) {
            return Err(TeamError::Forbidden("team belongs to another organizer"));
        }

        let row = sqlx::query(&format!(
            "INSERT INTO team_members (player_id, team_id, role) VALUES ($1, $2, $3)
             RETURNING {MEMBER_COLUMNS}"
        ))
        .bind(request.player_id)
        .bind(request.team_id)
        .bind(request.role.as_str())
        .fetch_one(self.pool.as_ref())
        .await
        .map_err(member_conflict)?;
        Ok(member_from_row(&row)?)
    }

    pub async fn get_member(&self, member_id: MemberId) -> TeamResult<TeamMember> {
        let row = sqlx::query(&format!(
            "SELECT {MEMBER_COLUMNS} FROM team_members WHERE id = $1"
        ))
        .bind(member_id)
        .fetch_optional(self.pool.as_ref())
        .await?
        .ok_or(TeamError::MemberNotFound(member_id))?;
        Ok(member_from_row(&row)?)
    }

    pub async fn list_members(
        &self,
        filter: &TeamMemberFilter,
        page: Page,
    ) -> TeamResult<Vec<TeamMember>> {
        let page = page.normalized();
        let mut query = QueryBuilder::<Postgres>::new(format!(
            "SELECT {MEMBER_COLUMNS} FROM team_members WHERE TRUE"
        ));
        if let Some(team_id) = filter.team_id {
            query.push(" AND team_id = ").push_bind(team_id);
        }
        if let Some(player_id) = filter.player_id {
            query.push(" AND player_id = ").push_bind(player_id);
        }
        if let Some(role) = filter.role {
            query.push(" AND role = ").push_bind(role.as_str());
        }
        query
            .push(" ORDER BY id LIMIT ")
            .push_bind(page.limit)
            .push(" OFFSET ")
            .push_bind(page.offset);

        let rows = query.build().fetch_all(self.pool.as_ref()).await?;
        Ok(rows.iter().map(member_from_row).collect::<Result<_, _>>()?)
    }

    pub async fn update_member(
        &self,
        actor: &Actor,
        member_id: MemberId,
        update: TeamMemberUpdate,
    ) -> TeamResult<TeamMember> {
        let member = self.get_member(member_id).await?;
        self.owned_team(actor, member.team_id).await?;
        let Some(role) = update.role else {
            return Ok(member);
        };

        let row = sqlx::query(&format!(
            "UPDATE team_members SET role = $1 WHERE id = $2 RETURNING {MEMBER_COLUMNS}"
        ))
        .bind(role.as_str())
        .bind(member_id)
        .fetch_one(self.pool.as_ref())
        .await?;
        Ok(member_from_row(&row)?)
    }

    pub async fn remove_member(&self, actor: &Actor, member_id: MemberId) -> TeamResult<()> {
        let member = self.get_member(member_id).await?;
        self.owned_team(actor, member.team_id).await?;
        sqlx::query("DELETE FROM team_members WHERE id = $1")
            .bind(member_id)
            .execute(self.pool.as_ref())
            .await?;
        Ok(())
    }

    async fn owned_team(&self, actor: &Actor, team_id: TeamId) -> TeamResult<Team> {
        let team = self.get_team(team_id).await?;
        if actor.manages(team.organizer_id) {
            Ok(team)
        } else {
            Err(TeamError::Forbidden("team belongs to another organizer"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Role;

    fn manager() -> TeamManager {
        let pool = sqlx::postgres::PgPoolOptions::new()
            .connect_lazy("postgres://localhost/smartsport_unit")
            .unwrap();
        TeamManager::new(Arc::new(pool))
    }

    #[tokio::test]
    async fn test_admin_must_name_the_owner() {
        let teams = manager();
        let admin = Actor::new(1, Role::Administrator);
        let result = teams
            .create_team(
                &admin,
                NewTeam {
                    name: "Falcons".to_string(),
                    organizer_id: None,
                },
            )
            .await;
        match result {
            Err(TeamError::Validation(errors)) => assert!(errors.contains("organizer_id")),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_blank_name_fails_before_touching_database() {
        let teams = manager();
        let organizer = Actor::new(4, Role::Organizer);
        let result = teams
            .create_team(
                &organizer,
                NewTeam {
                    name: String::new(),
                    organizer_id: None,
                },
            )
            .await;
        assert!(matches!(result, Err(TeamError::Validation(_))));
    }

    #[test]
    fn test_not_found_hides_identifier() {
        assert_eq!(TeamError::TeamNotFound(77).client_message(), "Team not found");
    }
}
