//! Registration workflow implementation.

use super::{
    errors::{RegistrationError, RegistrationResult},
    models::{
        Decision, NewRegistration, Registration, RegistrationFilter, RegistrationForm,
        RegistrationId, RegistrationStatus,
    },
};
use crate::auth::{Actor, Role};
use crate::db::{qualified, text_column, unique_violation};
use crate::pagination::Page;
use crate::team::{MembershipRole, manager as teams};
use crate::tournament::{TournamentId, TournamentStatus, manager as tournaments};
use crate::validation::{FieldErrors, INVALID_REFERENCE};
use sqlx::{PgPool, Postgres, QueryBuilder, Row, postgres::PgRow};
use std::sync::Arc;

const REGISTRATION_COLUMNS: &str = "id, player_id, tournament_id, team_id, game, alias, \
     skill_level, experience, comment, status, created_at, decided_at";

const ALREADY_REGISTERED: &str = "You already hold a registration for this tournament.";

fn registration_from_row(row: &PgRow) -> Result<Registration, sqlx::Error> {
    Ok(Registration {
        id: row.try_get("id")?,
        player_id: row.try_get("player_id")?,
        tournament_id: row.try_get("tournament_id")?,
        team_id: row.try_get("team_id")?,
        game: row.try_get("game")?,
        alias: row.try_get("alias")?,
        skill_level: text_column(row, "skill_level")?,
        experience: row.try_get("experience")?,
        comment: row.try_get("comment")?,
        status: text_column(row, "status")?,
        created_at: row.try_get("created_at")?,
        decided_at: row.try_get("decided_at")?,
    })
}

fn registration_conflict(err: sqlx::Error) -> RegistrationError {
    match unique_violation(&err).as_deref() {
        Some("registrations_active_key") => {
            FieldErrors::single("tournament_id", ALREADY_REGISTERED).into()
        }
        _ => err.into(),
    }
}

/// A concurrent registration may create the same team name first.
fn new_team_conflict(err: sqlx::Error) -> RegistrationError {
    if unique_violation(&err).as_deref() == Some("teams_name_key") {
        return FieldErrors::single(
            "team_name",
            "team with this name was just created; register with its team_id instead.",
        )
        .into();
    }
    err.into()
}

/// Registration workflow manager
#[derive(Clone)]
pub struct RegistrationManager {
    pool: Arc<PgPool>,
}

impl RegistrationManager {
    /// Create a new registration manager
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }

    /// Register the calling player for a tournament.
    ///
    /// The tournament must be planned and the player must not already hold a
    /// pending or approved registration for it. A previously rejected
    /// registration is replaced. With `team_name`, a team of that name is
    /// reused or created for the tournament's organizer, the player becoming
    /// its captain.
    ///
    /// # Errors
    ///
    /// * `RegistrationError::Validation` - bad fields, closed tournament, duplicate registration
    /// * `RegistrationError::TournamentNotFound` - unknown tournament
    pub async fn register(
        &self,
        actor: &Actor,
        request: NewRegistration,
    ) -> RegistrationResult<Registration> {
        if actor.role != Role::Player {
            return Err(RegistrationError::Forbidden("only players register for tournaments"));
        }
        let NewRegistration {
            tournament_id,
            form,
        } = request;
        form.validate().into_result()?;

        let mut tx = self.pool.begin().await?;

        let tournament = tournaments::lock_tournament(&mut *tx, tournament_id)
            .await?
            .ok_or(RegistrationError::TournamentNotFound(tournament_id))?;
        if tournament.status != TournamentStatus::Planned {
            return Err(FieldErrors::single(
                "tournament_id",
                "Registrations are closed for this tournament.",
            )
            .into());
        }

        let active: Option<RegistrationId> = sqlx::query_scalar(
            "SELECT id FROM registrations
             WHERE player_id = $1 AND tournament_id = $2 AND status <> 'rejected'",
        )
        .bind(actor.user_id)
        .bind(tournament_id)
        .fetch_optional(&mut *tx)
        .await?;
        if active.is_some() {
            return Err(FieldErrors::single("tournament_id", ALREADY_REGISTERED).into());
        }

        let superseded = sqlx::query(
            "DELETE FROM registrations
             WHERE player_id = $1 AND tournament_id = $2 AND status = 'rejected'",
        )
        .bind(actor.user_id)
        .bind(tournament_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        let team_id = match (&form.team_id, &form.team_name) {
            (Some(team_id), _) => {
                let exists: Option<i64> = sqlx::query_scalar("SELECT id FROM teams WHERE id = $1")
                    .bind(*team_id)
                    .fetch_optional(&mut *tx)
                    .await?;
                if exists.is_none() {
                    return Err(FieldErrors::single("team_id", INVALID_REFERENCE).into());
                }
                Some(*team_id)
            }
            (None, Some(name)) => {
                let name = name.trim();
                let team = match teams::find_team_by_name(&mut *tx, name).await? {
                    Some(team) => team,
                    None => {
                        let team = teams::insert_team(&mut *tx, name, tournament.organizer_id)
                            .await
                            .map_err(new_team_conflict)?;
                        teams::ensure_member(
                            &mut *tx,
                            team.id,
                            actor.user_id,
                            MembershipRole::Captain,
                        )
                        .await?;
                        team
                    }
                };
                Some(team.id)
            }
            (None, None) => None,
        };

        let registration = insert_registration(&mut tx, actor, tournament_id, team_id, &form)
            .await
            .map_err(registration_conflict)?;

        tx.commit().await?;

        log::info!(
            "Player {} registered for tournament {} (registration {}, {} superseded)",
            actor.user_id,
            tournament_id,
            registration.id,
            superseded
        );
        Ok(registration)
    }

    /// Approve or reject a pending registration.
    ///
    /// The status flip is conditional on the row still being pending, and an
    /// approval bumps the tournament's `registered_count` in the same
    /// transaction with an in-place increment, so concurrent approvals of
    /// different registrations never lose a count.
    pub async fn decide(
        &self,
        actor: &Actor,
        registration_id: RegistrationId,
        decision: Decision,
    ) -> RegistrationResult<Registration> {
        if !decision.status.is_decision() {
            return Err(FieldErrors::single("status", "Choose approved or rejected.").into());
        }

        let mut tx = self.pool.begin().await?;

        let organizer_id: Option<i64> = sqlx::query_scalar(
            "SELECT t.organizer_id FROM registrations r
             JOIN tournaments t ON t.id = r.tournament_id
             WHERE r.id = $1",
        )
        .bind(registration_id)
        .fetch_optional(&mut *tx)
        .await?;
        let Some(organizer_id) = organizer_id else {
            return Err(RegistrationError::NotFound(registration_id));
        };
        if !actor.manages(organizer_id) {
            return Err(RegistrationError::Forbidden(
                "tournament belongs to another organizer",
            ));
        }

        let row = sqlx::query(&format!(
            "UPDATE registrations SET status = $1, decided_at = NOW()
             WHERE id = $2 AND status = 'pending'
             RETURNING {REGISTRATION_COLUMNS}"
        ))
        .bind(decision.status.as_str())
        .bind(registration_id)
        .fetch_optional(&mut *tx)
        .await?;
        let Some(row) = row else {
            return Err(FieldErrors::single(
                "status",
                "Only pending registrations can be approved or rejected.",
            )
            .into());
        };
        let registration = registration_from_row(&row)?;

        if registration.status == RegistrationStatus::Approved {
            sqlx::query(
                "UPDATE tournaments SET registered_count = registered_count + 1 WHERE id = $1",
            )
            .bind(registration.tournament_id)
            .execute(&mut *tx)
            .await?;

            if let Some(team_id) = registration.team_id {
                tournaments::enter_team(&mut *tx, registration.tournament_id, team_id).await?;
            }
        }

        tx.commit().await?;

        log::info!(
            "Registration {} {} by user {}",
            registration.id,
            registration.status,
            actor.user_id
        );
        Ok(registration)
    }

    /// Load a registration visible to the caller.
    pub async fn get_registration(
        &self,
        actor: &Actor,
        registration_id: RegistrationId,
    ) -> RegistrationResult<Registration> {
        let row = sqlx::query(&format!(
            "SELECT {}, t.organizer_id FROM registrations r
             JOIN tournaments t ON t.id = r.tournament_id
             WHERE r.id = $1",
            qualified(REGISTRATION_COLUMNS, "r")
        ))
        .bind(registration_id)
        .fetch_optional(self.pool.as_ref())
        .await?
        .ok_or(RegistrationError::NotFound(registration_id))?;

        let registration = registration_from_row(&row)?;
        let organizer_id: i64 = row.try_get("organizer_id")?;
        let visible = match actor.role {
            Role::Player => registration.player_id == actor.user_id,
            _ => actor.manages(organizer_id),
        };
        if visible {
            Ok(registration)
        } else {
            Err(RegistrationError::Forbidden("registration is outside your scope"))
        }
    }

    /// Registrations visible to the caller: players see their own, organizers
    /// those for their tournaments, administrators everything.
    pub async fn list_registrations(
        &self,
        actor: &Actor,
        filter: &RegistrationFilter,
        page: Page,
    ) -> RegistrationResult<Vec<Registration>> {
        let page = page.normalized();
        let mut query = QueryBuilder::<Postgres>::new(format!(
            "SELECT {REGISTRATION_COLUMNS} FROM registrations WHERE TRUE"
        ));
        match actor.role {
            Role::Administrator => {}
            Role::Player => {
                query.push(" AND player_id = ").push_bind(actor.user_id);
            }
            Role::Organizer => {
                query
                    .push(" AND tournament_id IN (SELECT id FROM tournaments WHERE organizer_id = ")
                    .push_bind(actor.user_id)
                    .push(")");
            }
            Role::Referee => return Ok(Vec::new()),
        }
        if let Some(tournament_id) = filter.tournament_id {
            query.push(" AND tournament_id = ").push_bind(tournament_id);
        }
        if let Some(status) = filter.status {
            query.push(" AND status = ").push_bind(status.as_str());
        }
        query
            .push(" ORDER BY created_at DESC, id DESC LIMIT ")
            .push_bind(page.limit)
            .push(" OFFSET ")
            .push_bind(page.offset);

        let rows = query.build().fetch_all(self.pool.as_ref()).await?;
        Ok(rows
            .iter()
            .map(registration_from_row)
            .collect::<Result<_, _>>()?)
    }
}

async fn insert_registration(
    tx: &mut sqlx::Transaction<'_, Postgres>,
    actor: &Actor,
    tournament_id: TournamentId,
    team_id: Option<i64>,
    form: &RegistrationForm,
) -> Result<Registration, sqlx::Error> {
    let row = sqlx::query(&format!(
        "INSERT INTO registrations
             (player_id, tournament_id, team_id, game, alias, skill_level, experience, comment)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
         RETURNING {REGISTRATION_COLUMNS}"
    ))
    .bind(actor.user_id)
    .bind(tournament_id)
    .bind(team_id)
    .bind(form.game.trim())
    .bind(form.alias.trim())
    .bind(form.skill_level.as_str())
    .bind(&form.experience)
    .bind(&form.comment)
    .fetch_one(&mut **tx)
    .await?;
    registration_from_row(&row)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::SkillLevel;

    fn manager() -> RegistrationManager {
        let pool = sqlx::postgres::PgPoolOptions::new()
            .connect_lazy("postgres://localhost/smartsport_unit")
            .unwrap();
        RegistrationManager::new(Arc::new(pool))
    }

    fn request() -> NewRegistration {
        NewRegistration {
            tournament_id: 1,
            form: RegistrationForm {
                game: "Valorant".to_string(),
                alias: "nyx".to_string(),
                skill_level: SkillLevel::Intermediate,
                experience: String::new(),
                comment: None,
                team_id: None,
                team_name: None,
            },
        }
    }

    #[tokio::test]
    async fn test_only_players_register() {
        let result = manager()
            .register(&Actor::new(3, Role::Organizer), request())
            .await;
        assert!(matches!(result, Err(RegistrationError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_invalid_form_fails_before_touching_database() {
        let mut req = request();
        req.form.game.clear();
        let result = manager().register(&Actor::new(3, Role::Player), req).await;
        match result {
            Err(RegistrationError::Validation(errors)) => assert!(errors.contains("game")),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_other_team_insert_failures_stay_database_errors() {
        assert!(matches!(
            new_team_conflict(sqlx::Error::RowNotFound),
            RegistrationError::Database(_)
        ));
    }

    #[tokio::test]
    async fn test_pending_is_not_a_decision() {
        let result = manager()
            .decide(
                &Actor::new(1, Role::Administrator),
                5,
                Decision {
                    status: RegistrationStatus::Pending,
                },
            )
            .await;
        match result {
            Err(RegistrationError::Validation(errors)) => assert!(errors.contains("status")),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_referees_see_no_registrations() {
        let listed = manager()
            .list_registrations(
                &Actor::new(4, Role::Referee),
                &RegistrationFilter::default(),
                Page::default(),
            )
            .await
            .unwrap();
        assert!(listed.is_empty());
    }
}
