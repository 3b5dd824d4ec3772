//! Match manager: scheduling, edits, score submission, and bulk generation.

use super::{
    errors::{MatchError, MatchResult},
    models::{
        GenerateMatches, GeneratedMatches, Match, MatchFilter, MatchId, MatchStatus, MatchUpdate,
        NewMatch, ScoreSubmission, kickoff,
    },
    pairing,
};
use crate::auth::{Actor, Role, UserId};
use crate::db::{foreign_key_field, qualified, text_column};
use crate::pagination::Page;
use crate::tournament::{TournamentFormat, TournamentId, manager as tournaments};
use crate::validation::{FieldErrors, INVALID_REFERENCE};
use sqlx::{PgExecutor, PgPool, Postgres, QueryBuilder, Row, postgres::PgRow};
use std::sync::Arc;

const MATCH_COLUMNS: &str = "id, tournament_id, name, scheduled_at, duration_minutes, score1, \
     score2, status, team1_id, team2_id, referee_id, venue";

fn match_from_row(row: &PgRow) -> Result<Match, sqlx::Error> {
    Ok(Match {
        id: row.try_get("id")?,
        tournament_id: row.try_get("tournament_id")?,
        name: row.try_get("name")?,
        scheduled_at: row.try_get("scheduled_at")?,
        duration_minutes: row.try_get("duration_minutes")?,
        score1: row.try_get("score1")?,
        score2: row.try_get("score2")?,
        status: text_column(row, "status")?,
        team1_id: row.try_get("team1_id")?,
        team2_id: row.try_get("team2_id")?,
        referee_id: row.try_get("referee_id")?,
        venue: row.try_get("venue")?,
    })
}

fn match_conflict(err: sqlx::Error) -> MatchError {
    if let Some(field) = foreign_key_field(&err, "matches") {
        return FieldErrors::single(field, INVALID_REFERENCE).into();
    }
    err.into()
}

/// Insert a match; a blank name becomes "<team1> vs <team2>".
async fn insert_match<'e>(executor: impl PgExecutor<'e>, m: &NewMatch) -> Result<Match, sqlx::Error> {
    let row = sqlx::query(&format!(
        "INSERT INTO matches
             (tournament_id, name, scheduled_at, duration_minutes, team1_id, team2_id, referee_id, venue)
         VALUES (
             $1,
             COALESCE(
                 NULLIF(BTRIM($2), ''),
                 (SELECT name FROM teams WHERE id = $5) || ' vs ' || (SELECT name FROM teams WHERE id = $6),
                 ''
             ),
             $3, $4, $5, $6, $7, $8
         )
         RETURNING {MATCH_COLUMNS}"
    ))
    .bind(m.tournament_id)
    .bind(m.name.as_deref().unwrap_or_default())
    .bind(m.scheduled_at)
    .bind(m.duration_minutes)
    .bind(m.team1_id)
    .bind(m.team2_id)
    .bind(m.referee_id)
    .bind(&m.venue)
    .fetch_one(executor)
    .await?;
    match_from_row(&row)
}

/// Organizers edit matches of their own tournaments; referees and
/// administrators edit any match.
fn may_edit(actor: &Actor, organizer_id: UserId) -> bool {
    actor.role == Role::Referee || actor.manages(organizer_id)
}

/// Match manager
#[derive(Clone)]
pub struct MatchManager {
    pool: Arc<PgPool>,
}

impl MatchManager {
    /// Create a new match manager
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }

    /// Schedule a single match.
    ///
    /// # Errors
    ///
    /// * `MatchError::Validation` - same team twice, negative duration, unknown team or referee
    /// * `MatchError::TournamentNotFound` - unknown tournament
    pub async fn create_match(&self, actor: &Actor, request: NewMatch) -> MatchResult<Match> {
        request.validate().into_result()?;

        let organizer_id: Option<UserId> =
            sqlx::query_scalar("SELECT organizer_id FROM tournaments WHERE id = $1")
                .bind(request.tournament_id)
                .fetch_optional(self.pool.as_ref())
                .await?;
        let Some(organizer_id) = organizer_id else {
            return Err(MatchError::TournamentNotFound(request.tournament_id));
        };
        if !may_edit(actor, organizer_id) {
            return Err(MatchError::Forbidden("tournament belongs to another organizer"));
        }

        let created = insert_match(self.pool.as_ref(), &request)
            .await
            .map_err(match_conflict)?;
        log::info!(
            "Match {} '{}' scheduled in tournament {}",
            created.id,
            created.name,
            created.tournament_id
        );
        Ok(created)
    }

    pub async fn get_match(&self, match_id: MatchId) -> MatchResult<Match> {
        let row = sqlx::query(&format!("SELECT {MATCH_COLUMNS} FROM matches WHERE id = $1"))
            .bind(match_id)
            .fetch_optional(self.pool.as_ref())
            .await?
            .ok_or(MatchError::NotFound(match_id))?;
        Ok(match_from_row(&row)?)
    }

    /// Matches in kickoff order.
    pub async fn list_matches(&self, filter: &MatchFilter, page: Page) -> MatchResult<Vec<Match>> {
        let page = page.normalized();
        let mut query = QueryBuilder::<Postgres>::new(format!(
            "SELECT {MATCH_COLUMNS} FROM matches WHERE TRUE"
        ));
        if let Some(tournament_id) = filter.tournament_id {
            query.push(" AND tournament_id = ").push_bind(tournament_id);
        }
        if let Some(status) = filter.status {
            query.push(" AND status = ").push_bind(status.as_str());
        }
        if let Some(team_id) = filter.team_id {
            query
                .push(" AND (team1_id = ")
                .push_bind(team_id)
                .push(" OR team2_id = ")
                .push_bind(team_id)
                .push(")");
        }
        query
            .push(" ORDER BY scheduled_at, id LIMIT ")
            .push_bind(page.limit)
            .push(" OFFSET ")
            .push_bind(page.offset);

        let rows = query.build().fetch_all(self.pool.as_ref()).await?;
        Ok(rows.iter().map(match_from_row).collect::<Result<_, _>>()?)
    }

    /// Edit a match under a row lock. A finished match keeps its score and
    /// status; other fields stay editable.
    pub async fn update_match(
        &self,
        actor: &Actor,
        match_id: MatchId,
        update: MatchUpdate,
    ) -> MatchResult<Match> {
        let mut tx = self.pool.begin().await?;

        let (current, organizer_id) = self.lock_match(&mut tx, match_id).await?;
        if !may_edit(actor, organizer_id) {
            return Err(MatchError::Forbidden("tournament belongs to another organizer"));
        }
        let merged = update.apply(current)?;

        let row = sqlx::query(&format!(
            "UPDATE matches
             SET name = $1, scheduled_at = $2, duration_minutes = $3, score1 = $4, score2 = $5,
                 status = $6, referee_id = $7, venue = $8
             WHERE id = $9
             RETURNING {MATCH_COLUMNS}"
        ))
        .bind(&merged.name)
        .bind(merged.scheduled_at)
        .bind(merged.duration_minutes)
        .bind(merged.score1)
        .bind(merged.score2)
        .bind(merged.status.as_str())
        .bind(merged.referee_id)
        .bind(&merged.venue)
        .bind(match_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(match_conflict)?;

        tx.commit().await?;
        Ok(match_from_row(&row)?)
    }

    pub async fn delete_match(&self, actor: &Actor, match_id: MatchId) -> MatchResult<()> {
        let mut tx = self.pool.begin().await?;
        let (_, organizer_id) = self.lock_match(&mut tx, match_id).await?;
        if !may_edit(actor, organizer_id) {
            return Err(MatchError::Forbidden("tournament belongs to another organizer"));
        }
        sqlx::query("DELETE FROM matches WHERE id = $1")
            .bind(match_id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(())
    }

    /// Record the final score and finish the match.
    ///
    /// The match row is locked for the duration, so of several concurrent
    /// submissions exactly one succeeds and the rest see a finished match.
    ///
    /// # Errors
    ///
    /// * `MatchError::Validation` - missing or negative score, match already finished or cancelled
    /// * `MatchError::Forbidden` - caller is not an administrator or the assigned referee
    pub async fn submit_score(
        &self,
        actor: &Actor,
        match_id: MatchId,
        submission: ScoreSubmission,
    ) -> MatchResult<Match> {
        let (score1, score2) = submission.validate()?;
        if !matches!(actor.role, Role::Referee | Role::Administrator) {
            return Err(MatchError::Forbidden("only referees submit scores"));
        }

        let mut tx = self.pool.begin().await?;

        let (current, _) = self.lock_match(&mut tx, match_id).await?;
        if actor.role == Role::Referee
            && current.referee_id.is_some_and(|assigned| assigned != actor.user_id)
        {
            return Err(MatchError::Forbidden("another referee is assigned to this match"));
        }
        if !current.status.accepts_score() {
            return Err(FieldErrors::single(
                "status",
                format!("The match is {}; its score can no longer change.", current.status),
            )
            .into());
        }

        let row = sqlx::query(&format!(
            "UPDATE matches SET score1 = $1, score2 = $2, status = $3
             WHERE id = $4
             RETURNING {MATCH_COLUMNS}"
        ))
        .bind(score1)
        .bind(score2)
        .bind(MatchStatus::Finished.as_str())
        .bind(match_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        log::info!(
            "Match {} finished {}-{} (submitted by user {})",
            match_id,
            score1,
            score2,
            actor.user_id
        );
        Ok(match_from_row(&row)?)
    }

    /// Replace a tournament's matches with a fresh pairing of its registered
    /// teams.
    ///
    /// Runs in one transaction holding the tournament row lock. Refuses when
    /// any existing match is finished, so played results are never dropped.
    pub async fn generate_matches(
        &self,
        actor: &Actor,
        tournament_id: TournamentId,
        options: GenerateMatches,
    ) -> MatchResult<GeneratedMatches> {
        let spacing = options.spacing()?;

        let mut tx = self.pool.begin().await?;

        let tournament = tournaments::lock_tournament(&mut *tx, tournament_id)
            .await?
            .ok_or(MatchError::TournamentNotFound(tournament_id))?;
        if !actor.manages(tournament.organizer_id) {
            return Err(MatchError::Forbidden("tournament belongs to another organizer"));
        }
        if tournament.status.is_terminal() {
            return Err(FieldErrors::single(
                "status",
                format!("The tournament is {}.", tournament.status),
            )
            .into());
        }

        let teams = tournaments::entered_teams(&mut *tx, tournament_id).await?;
        if teams.len() < 2 {
            return Err(FieldErrors::single(
                "teams",
                "At least two registered teams are needed to generate matches.",
            )
            .into());
        }

        let (pairs, bye_team_id) = match tournament.format {
            TournamentFormat::RoundRobin => (pairing::round_robin(&teams), None),
            TournamentFormat::Elimination => {
                let bracket = pairing::elimination(&teams, &mut rand::rng());
                (bracket.pairs, bracket.bye)
            }
            TournamentFormat::Mixed => {
                return Err(FieldErrors::single(
                    "format",
                    "Matches of mixed-format tournaments are scheduled by hand.",
                )
                .into());
            }
        };

        let finished: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM matches WHERE tournament_id = $1 AND status = 'finished'",
        )
        .bind(tournament_id)
        .fetch_one(&mut *tx)
        .await?;
        if finished > 0 {
            return Err(FieldErrors::single(
                "matches",
                format!("{finished} match(es) already finished; regeneration would discard results."),
            )
            .into());
        }

        let replaced = sqlx::query("DELETE FROM matches WHERE tournament_id = $1")
            .bind(tournament_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        let start = options.start_at.unwrap_or(tournament.starts_at);
        let mut matches = Vec::with_capacity(pairs.len());
        for (slot, (team1_id, team2_id)) in pairs.into_iter().enumerate() {
            let scheduled_at = kickoff(start, spacing, slot).ok_or_else(|| {
                FieldErrors::single(
                    "spacing_minutes",
                    "The generated schedule runs past the supported date range.",
                )
            })?;
            let new_match = NewMatch {
                tournament_id,
                name: None,
                scheduled_at,
                duration_minutes: None,
                team1_id,
                team2_id,
                referee_id: options.referee_id,
                venue: String::new(),
            };
            let created = insert_match(&mut *tx, &new_match)
                .await
                .map_err(match_conflict)?;
            matches.push(created);
        }

        tx.commit().await?;

        log::info!(
            "Generated {} {} matches for tournament {} ({} replaced, bye: {:?})",
            matches.len(),
            tournament.format,
            tournament_id,
            replaced,
            bye_team_id
        );
        Ok(GeneratedMatches {
            tournament_id,
            matches,
            bye_team_id,
        })
    }

    /// Load a match with its tournament's organizer, locking the match row.
    async fn lock_match(
        &self,
        tx: &mut sqlx::Transaction<'_, Postgres>,
        match_id: MatchId,
    ) -> MatchResult<(Match, UserId)> {
        let row = sqlx::query(&format!(
            "SELECT {}, t.organizer_id FROM matches m
             JOIN tournaments t ON t.id = m.tournament_id
             WHERE m.id = $1
             FOR UPDATE OF m",
            qualified(MATCH_COLUMNS, "m")
        ))
        .bind(match_id)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or(MatchError::NotFound(match_id))?;

        Ok((match_from_row(&row)?, row.try_get("organizer_id")?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> MatchManager {
        let pool = sqlx::postgres::PgPoolOptions::new()
            .connect_lazy("postgres://localhost/smartsport_unit")
            .unwrap();
        MatchManager::new(Arc::new(pool))
    }

    #[test]
    fn test_edit_rights() {
        assert!(may_edit(&Actor::new(3, Role::Referee), 9));
        assert!(may_edit(&Actor::new(9, Role::Organizer), 9));
        assert!(!may_edit(&Actor::new(8, Role::Organizer), 9));
        assert!(!may_edit(&Actor::new(9, Role::Player), 9));
    }

    #[tokio::test]
    async fn test_organizers_cannot_submit_scores() {
        let result = manager()
            .submit_score(
                &Actor::new(2, Role::Organizer),
                1,
                ScoreSubmission {
                    score1: Some(2),
                    score2: Some(1),
                },
            )
            .await;
        assert!(matches!(result, Err(MatchError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_missing_score_fails_before_touching_database() {
        let result = manager()
            .submit_score(
                &Actor::new(2, Role::Referee),
                1,
                ScoreSubmission {
                    score1: None,
                    score2: Some(1),
                },
            )
            .await;
        match result {
            Err(MatchError::Validation(errors)) => assert!(errors.contains("score1")),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_zero_spacing_is_rejected() {
        let result = manager()
            .generate_matches(
                &Actor::new(1, Role::Administrator),
                1,
                GenerateMatches {
                    spacing_minutes: Some(0),
                    ..Default::default()
                },
            )
            .await;
        assert!(matches!(result, Err(MatchError::Validation(_))));
    }

    #[tokio::test]
    async fn test_oversized_spacing_is_rejected_without_panicking() {
        let result = manager()
            .generate_matches(
                &Actor::new(1, Role::Administrator),
                1,
                GenerateMatches {
                    spacing_minutes: Some(1_000_000_000_000),
                    ..Default::default()
                },
            )
            .await;
        match result {
            Err(MatchError::Validation(errors)) => assert!(errors.contains("spacing_minutes")),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_same_team_match_is_rejected() {
        let request = NewMatch {
            tournament_id: 1,
            name: None,
            scheduled_at: chrono::Utc::now(),
            duration_minutes: None,
            team1_id: 3,
            team2_id: 3,
            referee_id: None,
            venue: String::new(),
        };
        let result = manager()
            .create_match(&Actor::new(1, Role::Administrator), request)
            .await;
        match result {
            Err(MatchError::Validation(errors)) => assert!(errors.contains("team2_id")),
            other => panic!("expected validation error, got {other:?}"),
        }
    }
}
