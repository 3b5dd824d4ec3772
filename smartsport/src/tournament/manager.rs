//! Tournament manager: catalog CRUD, lifecycle, and team entries.

use super::models::{
    MatchCounts, NewTournament, RegistrationCounts, Tournament, TournamentFilter, TournamentId,
    TournamentStats, TournamentStatus, TournamentUpdate,
};
use crate::auth::Actor;
use crate::db::{foreign_key_field, like_pattern, text_column};
use crate::pagination::Page;
use crate::team::TeamId;
use crate::validation::{FieldErrors, INVALID_REFERENCE};
use chrono::Utc;
use sqlx::{PgExecutor, PgPool, Postgres, QueryBuilder, Row, postgres::PgRow};
use std::sync::Arc;
use thiserror::Error;

/// Tournament errors
#[derive(Debug, Error)]
pub enum TournamentError {
    #[error("Tournament not found: {0}")]
    NotFound(TournamentId),

    #[error("Cannot move tournament from {from} to {to}")]
    InvalidTransition {
        from: TournamentStatus,
        to: TournamentStatus,
    },

    #[error("Invalid input: {0}")]
    Validation(FieldErrors),

    #[error("Forbidden: {0}")]
    Forbidden(&'static str),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl TournamentError {
    /// Get a client-safe error message
    pub fn client_message(&self) -> String {
        match self {
            TournamentError::Database(_) => "Internal server error".to_string(),
            TournamentError::NotFound(_) => "Tournament not found".to_string(),
            _ => self.to_string(),
        }
    }
}

impl From<FieldErrors> for TournamentError {
    fn from(errors: FieldErrors) -> Self {
        TournamentError::Validation(errors)
    }
}

pub type TournamentResult<T> = Result<T, TournamentError>;

pub(crate) const TOURNAMENT_COLUMNS: &str = "id, name, description, rules, format, starts_at, \
     ends_at, entry_fee_cents, status, registered_count, organizer_id, created_at";

pub(crate) fn tournament_from_row(row: &PgRow) -> Result<Tournament, sqlx::Error> {
    Ok(Tournament {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        description: row.try_get("description")?,
        rules: row.try_get("rules")?,
        format: text_column(row, "format")?,
        starts_at: row.try_get("starts_at")?,
        ends_at: row.try_get("ends_at")?,
        entry_fee_cents: row.try_get("entry_fee_cents")?,
        status: text_column(row, "status")?,
        registered_count: row.try_get("registered_count")?,
        organizer_id: row.try_get("organizer_id")?,
        created_at: row.try_get("created_at")?,
    })
}

/// Load a tournament and lock its row until the surrounding transaction ends.
pub(crate) async fn lock_tournament<'e>(
    executor: impl PgExecutor<'e>,
    tournament_id: TournamentId,
) -> Result<Option<Tournament>, sqlx::Error> {
    sqlx::query(&format!(
        "SELECT {TOURNAMENT_COLUMNS} FROM tournaments WHERE id = $1 FOR UPDATE"
    ))
    .bind(tournament_id)
    .fetch_optional(executor)
    .await?
    .as_ref()
    .map(tournament_from_row)
    .transpose()
}

/// Enter a team in a tournament; repeated entries are ignored.
pub(crate) async fn enter_team<'e>(
    executor: impl PgExecutor<'e>,
    tournament_id: TournamentId,
    team_id: TeamId,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "INSERT INTO tournament_teams (tournament_id, team_id) VALUES ($1, $2)
         ON CONFLICT (tournament_id, team_id) DO NOTHING",
    )
    .bind(tournament_id)
    .bind(team_id)
    .execute(executor)
    .await?;
    Ok(result.rows_affected() == 1)
}

/// Teams entered in a tournament, in entry order.
pub(crate) async fn entered_teams<'e>(
    executor: impl PgExecutor<'e>,
    tournament_id: TournamentId,
) -> Result<Vec<TeamId>, sqlx::Error> {
    let rows = sqlx::query(
        "SELECT team_id FROM tournament_teams WHERE tournament_id = $1
         ORDER BY registered_at, team_id",
    )
    .bind(tournament_id)
    .fetch_all(executor)
    .await?;
    rows.iter().map(|row| row.try_get("team_id")).collect()
}

fn tournament_conflict(err: sqlx::Error) -> TournamentError {
    if let Some(field) = foreign_key_field(&err, "tournaments") {
        return FieldErrors::single(field, INVALID_REFERENCE).into();
    }
    err.into()
}

/// Tournament manager
#[derive(Clone)]
pub struct TournamentManager {
    pool: Arc<PgPool>,
}

impl TournamentManager {
    /// Create a new tournament manager
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }

    /// Create a tournament in the `planned` state.
    ///
    /// # Errors
    ///
    /// * `TournamentError::Validation` - blank name, start in the past,
    ///   `ends_at <= starts_at`, negative fee, or no owner named by an administrator
    pub async fn create_tournament(
        &self,
        actor: &Actor,
        request: NewTournament,
    ) -> TournamentResult<Tournament> {
        let mut errors = request.validate(Utc::now());
        let owner = actor.owner_for(request.organizer_id);
        if owner.is_none() {
            errors.add("organizer_id", "This field is required.");
        }
        errors.into_result()?;
        let Some(owner) = owner else {
            return Err(TournamentError::Forbidden("only organizers own tournaments"));
        };

        let row = sqlx::query(&format!(
            "INSERT INTO tournaments
                 (name, description, rules, format, starts_at, ends_at, entry_fee_cents, organizer_id)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             RETURNING {TOURNAMENT_COLUMNS}"
        ))
        .bind(request.name.trim())
        .bind(&request.description)
        .bind(&request.rules)
        .bind(request.format.as_str())
        .bind(request.starts_at)
        .bind(request.ends_at)
        .bind(request.entry_fee_cents)
        .bind(owner)
        .fetch_one(self.pool.as_ref())
        .await
        .map_err(tournament_conflict)?;

        let tournament = tournament_from_row(&row)?;
        log::info!(
            "Created {} tournament {} '{}' for organizer {}",
            tournament.format,
            tournament.id,
            tournament.name,
            owner
        );
        Ok(tournament)
    }

    /// Get tournament by ID
    pub async fn get_tournament(&self, tournament_id: TournamentId) -> TournamentResult<Tournament> {
        let row = sqlx::query(&format!(
            "SELECT {TOURNAMENT_COLUMNS} FROM tournaments WHERE id = $1"
        ))
        .bind(tournament_id)
        .fetch_optional(self.pool.as_ref())
        .await?
        .ok_or(TournamentError::NotFound(tournament_id))?;

        Ok(tournament_from_row(&row)?)
    }

    /// List tournaments, soonest first.
    pub async fn list_tournaments(
        &self,
        filter: &TournamentFilter,
        page: Page,
    ) -> TournamentResult<Vec<Tournament>> {
        let page = page.normalized();
        let mut query = QueryBuilder::<Postgres>::new(format!(
            "SELECT {TOURNAMENT_COLUMNS} FROM tournaments WHERE TRUE"
        ));
        if let Some(format) = filter.format {
            query.push(" AND format = ").push_bind(format.as_str());
        }
        if let Some(status) = filter.status {
            query.push(" AND status = ").push_bind(status.as_str());
        }
        if let Some(organizer_id) = filter.organizer_id {
            query.push(" AND organizer_id = ").push_bind(organizer_id);
        }
        if let Some(search) = filter.search.as_deref().filter(|s| !s.trim().is_empty()) {
            let pattern = like_pattern(search);
            query
                .push(" AND (name ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR description ILIKE ")
                .push_bind(pattern)
                .push(")");
        }
        query
            .push(" ORDER BY starts_at, id LIMIT ")
            .push_bind(page.limit)
            .push(" OFFSET ")
            .push_bind(page.offset);

        let rows = query.build().fetch_all(self.pool.as_ref()).await?;
        Ok(rows.iter().map(tournament_from_row).collect::<Result<_, _>>()?)
    }

    /// Edit descriptive fields and schedule. Status has its own operation.
    pub async fn update_tournament(
        &self,
        actor: &Actor,
        tournament_id: TournamentId,
        update: TournamentUpdate,
    ) -> TournamentResult<Tournament> {
        let current = self.owned_tournament(actor, tournament_id).await?;
        let merged = update.apply(current)?;

        let row = sqlx::query(&format!(
            "UPDATE tournaments
             SET name = $1, description = $2, rules = $3, format = $4,
                 starts_at = $5, ends_at = $6, entry_fee_cents = $7
             WHERE id = $8
             RETURNING {TOURNAMENT_COLUMNS}"
        ))
        .bind(merged.name.trim())
        .bind(&merged.description)
        .bind(&merged.rules)
        .bind(merged.format.as_str())
        .bind(merged.starts_at)
        .bind(merged.ends_at)
        .bind(merged.entry_fee_cents)
        .bind(tournament_id)
        .fetch_optional(self.pool.as_ref())
        .await?
        .ok_or(TournamentError::NotFound(tournament_id))?;

        Ok(tournament_from_row(&row)?)
    }

    /// Delete a tournament with its matches, entries and registrations.
    pub async fn delete_tournament(
        &self,
        actor: &Actor,
        tournament_id: TournamentId,
    ) -> TournamentResult<()> {
        self.owned_tournament(actor, tournament_id).await?;
        sqlx::query("DELETE FROM tournaments WHERE id = $1")
            .bind(tournament_id)
            .execute(self.pool.as_ref())
            .await?;
        log::info!("Tournament {} deleted by user {}", tournament_id, actor.user_id);
        Ok(())
    }

    /// Move a tournament along its lifecycle.
    ///
    /// # Errors
    ///
    /// * `TournamentError::InvalidTransition` - the move is not allowed from the current state
    pub async fn change_status(
        &self,
        actor: &Actor,
        tournament_id: TournamentId,
        next: TournamentStatus,
    ) -> TournamentResult<Tournament> {
        let mut tx = self.pool.begin().await?;

        let current = lock_tournament(&mut *tx, tournament_id)
            .await?
            .ok_or(TournamentError::NotFound(tournament_id))?;
        if !actor.manages(current.organizer_id) {
            return Err(TournamentError::Forbidden("tournament belongs to another organizer"));
        }
        if !current.status.can_transition_to(next) {
            return Err(TournamentError::InvalidTransition {
                from: current.status,
                to: next,
            });
        }

        let row = sqlx::query(&format!(
            "UPDATE tournaments SET status = $1 WHERE id = $2 RETURNING {TOURNAMENT_COLUMNS}"
        ))
        .bind(next.as_str())
        .bind(tournament_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        log::info!(
            "Tournament {} moved from {} to {}",
            tournament_id,
            current.status,
            next
        );
        Ok(tournament_from_row(&row)?)
    }

    /// Enter a team in a planned tournament.
    ///
    /// The caller must manage both the team and the tournament.
    pub async fn register_team(
        &self,
        actor: &Actor,
        tournament_id: TournamentId,
        team_id: TeamId,
    ) -> TournamentResult<Vec<TeamId>> {
        let mut tx = self.pool.begin().await?;

        let tournament = lock_tournament(&mut *tx, tournament_id)
            .await?
            .ok_or(TournamentError::NotFound(tournament_id))?;
        if !actor.manages(tournament.organizer_id) {
            return Err(TournamentError::Forbidden("tournament belongs to another organizer"));
        }
        if tournament.status != TournamentStatus::Planned {
            return Err(FieldErrors::single(
                "status",
                "Teams can only be entered while the tournament is planned.",
            )
            .into());
        }

        let team_owner: Option<i64> =
            sqlx::query_scalar("SELECT organizer_id FROM teams WHERE id = $1")
                .bind(team_id)
                .fetch_optional(&mut *tx)
                .await?;
        let Some(team_owner) = team_owner else {
            return Err(FieldErrors::single("team_id", INVALID_REFERENCE).into());
        };
        if !actor.manages(team_owner) {
            return Err(TournamentError::Forbidden("team belongs to another organizer"));
        }

        if !enter_team(&mut *tx, tournament_id, team_id).await? {
            return Err(FieldErrors::single(
                "team_id",
                "The team is already registered for this tournament.",
            )
            .into());
        }

        let teams = entered_teams(&mut *tx, tournament_id).await?;
        tx.commit().await?;

        log::info!("Team {} entered in tournament {}", team_id, tournament_id);
        Ok(teams)
    }

    /// Registration and match counts for one tournament.
    pub async fn stats(&self, tournament_id: TournamentId) -> TournamentResult<TournamentStats> {
        let tournament = self.get_tournament(tournament_id).await?;

        let mut registrations = RegistrationCounts::default();
        let rows = sqlx::query(
            "SELECT status, COUNT(*) AS n FROM registrations
             WHERE tournament_id = $1 GROUP BY status",
        )
        .bind(tournament_id)
        .fetch_all(self.pool.as_ref())
        .await?;
        for row in &rows {
            let n: i64 = row.try_get("n")?;
            match row.try_get::<String, _>("status")?.as_str() {
                "pending" => registrations.pending = n,
                "approved" => registrations.approved = n,
                "rejected" => registrations.rejected = n,
                _ => {}
            }
        }

        let mut matches = MatchCounts::default();
        let rows = sqlx::query(
            "SELECT status, COUNT(*) AS n FROM matches WHERE tournament_id = $1 GROUP BY status",
        )
        .bind(tournament_id)
        .fetch_all(self.pool.as_ref())
        .await?;
        for row in &rows {
            let n: i64 = row.try_get("n")?;
            match row.try_get::<String, _>("status")?.as_str() {
                "planned" => matches.planned = n,
                "ongoing" => matches.ongoing = n,
                "finished" => matches.finished = n,
                "cancelled" => matches.cancelled = n,
                "postponed" => matches.postponed = n,
                _ => {}
            }
        }

        let registered_teams = entered_teams(self.pool.as_ref(), tournament_id).await?;

        Ok(TournamentStats {
            tournament_id,
            status: tournament.status,
            registered_count: tournament.registered_count,
            registered_teams,
            registrations,
            total_matches: matches.total(),
            matches,
        })
    }

    async fn owned_tournament(
        &self,
        actor: &Actor,
        tournament_id: TournamentId,
    ) -> TournamentResult<Tournament> {
        let tournament = self.get_tournament(tournament_id).await?;
        if actor.manages(tournament.organizer_id) {
            Ok(tournament)
        } else {
            Err(TournamentError::Forbidden("tournament belongs to another organizer"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Role;
    use crate::tournament::TournamentFormat;
    use chrono::Duration;

    fn manager() -> TournamentManager {
        let pool = sqlx::postgres::PgPoolOptions::new()
            .connect_lazy("postgres://localhost/smartsport_unit")
            .unwrap();
        TournamentManager::new(Arc::new(pool))
    }

    #[tokio::test]
    async fn test_inverted_dates_fail_before_touching_database() {
        let starts_at = Utc::now() + Duration::days(7);
        let request = NewTournament {
            name: "Winter Open".to_string(),
            description: String::new(),
            rules: String::new(),
            format: TournamentFormat::Elimination,
            starts_at,
            ends_at: starts_at - Duration::hours(1),
            entry_fee_cents: 1000,
            organizer_id: None,
        };

        let result = manager()
            .create_tournament(&Actor::new(2, Role::Organizer), request)
            .await;
        match result {
            Err(TournamentError::Validation(errors)) => {
                assert!(errors.contains("ends_at"));
                assert!(!errors.contains("organizer_id"));
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_invalid_transition_message_names_both_states() {
        let err = TournamentError::InvalidTransition {
            from: TournamentStatus::Finished,
            to: TournamentStatus::Planned,
        };
        assert_eq!(err.client_message(), "Cannot move tournament from finished to planned");
    }
}
