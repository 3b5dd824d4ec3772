//! Tournament handlers and workflow actions.
//!
//! # Endpoints
//!
//! - `POST /tournaments/{id}/register-team` - enter an owned team
//! - `POST /tournaments/{id}/register-player` - player applies to join
//! - `POST /tournaments/{id}/change-status` - lifecycle transition
//! - `GET /tournaments/{id}/stats` - counts per status and registered teams
//! - `POST /tournaments/{id}/generate-matches` - pair the registered teams

use axum::{
    Json,
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use smartsport::{
    Page,
    auth::{Action, Policy, Resource},
    matches::{GenerateMatches, GeneratedMatches},
    registration::{NewRegistration, Registration, RegistrationForm},
    team::TeamId,
    tournament::{
        NewTournament, Tournament, TournamentFilter, TournamentId, TournamentStats,
        TournamentStatus, TournamentUpdate,
    },
};

use super::{
    AppState,
    error::{ApiError, ApiJson, ApiResult},
    middleware::CurrentActor,
};
use crate::metrics;

#[derive(Debug, Deserialize)]
pub struct RegisterTeamPayload {
    pub team_id: TeamId,
}

#[derive(Debug, Serialize)]
pub struct RegisteredTeams {
    pub tournament_id: TournamentId,
    pub registered_teams: Vec<TeamId>,
}

#[derive(Debug, Deserialize)]
pub struct StatusChange {
    pub status: TournamentStatus,
}

pub async fn list_tournaments(
    State(state): State<AppState>,
    Query(filter): Query<TournamentFilter>,
    Query(page): Query<Page>,
) -> ApiResult<Json<Vec<Tournament>>> {
    Ok(Json(state.tournaments.list_tournaments(&filter, page).await?))
}

pub async fn create_tournament(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    ApiJson(payload): ApiJson<NewTournament>,
) -> ApiResult<(StatusCode, Json<Tournament>)> {
    Policy::check(&actor, Resource::Tournament, Action::Create)?;
    let tournament = state.tournaments.create_tournament(&actor, payload).await?;
    Ok((StatusCode::CREATED, Json(tournament)))
}

pub async fn get_tournament(
    State(state): State<AppState>,
    Path(tournament_id): Path<TournamentId>,
) -> ApiResult<Json<Tournament>> {
    Ok(Json(state.tournaments.get_tournament(tournament_id).await?))
}

pub async fn update_tournament(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(tournament_id): Path<TournamentId>,
    ApiJson(payload): ApiJson<TournamentUpdate>,
) -> ApiResult<Json<Tournament>> {
    Policy::check(&actor, Resource::Tournament, Action::Update)?;
    Ok(Json(
        state
            .tournaments
            .update_tournament(&actor, tournament_id, payload)
            .await?,
    ))
}

pub async fn delete_tournament(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(tournament_id): Path<TournamentId>,
) -> ApiResult<StatusCode> {
    Policy::check(&actor, Resource::Tournament, Action::Delete)?;
    state.tournaments.delete_tournament(&actor, tournament_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn change_status(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(tournament_id): Path<TournamentId>,
    ApiJson(payload): ApiJson<StatusChange>,
) -> ApiResult<Json<Tournament>> {
    Policy::check(&actor, Resource::Tournament, Action::ChangeStatus)?;
    Ok(Json(
        state
            .tournaments
            .change_status(&actor, tournament_id, payload.status)
            .await?,
    ))
}

pub async fn register_team(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(tournament_id): Path<TournamentId>,
    ApiJson(payload): ApiJson<RegisterTeamPayload>,
) -> ApiResult<Json<RegisteredTeams>> {
    Policy::check(&actor, Resource::Tournament, Action::RegisterTeam)?;
    let registered_teams = state
        .tournaments
        .register_team(&actor, tournament_id, payload.team_id)
        .await?;
    Ok(Json(RegisteredTeams {
        tournament_id,
        registered_teams,
    }))
}

/// Same workflow as `POST /registrations`, with the tournament taken from
/// the path.
pub async fn register_player(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(tournament_id): Path<TournamentId>,
    ApiJson(form): ApiJson<RegistrationForm>,
) -> ApiResult<(StatusCode, Json<Registration>)> {
    Policy::check(&actor, Resource::Tournament, Action::RegisterPlayer)?;
    let registration = state
        .registrations
        .register(&actor, NewRegistration { tournament_id, form })
        .await?;
    Ok((StatusCode::CREATED, Json(registration)))
}

pub async fn stats(
    State(state): State<AppState>,
    Path(tournament_id): Path<TournamentId>,
) -> ApiResult<Json<TournamentStats>> {
    Ok(Json(state.tournaments.stats(tournament_id).await?))
}

pub async fn generate_matches(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(tournament_id): Path<TournamentId>,
    body: Bytes,
) -> ApiResult<(StatusCode, Json<GeneratedMatches>)> {
    Policy::check(&actor, Resource::Tournament, Action::GenerateMatches)?;
    // An empty body means default options
    let options: GenerateMatches = if body.iter().all(u8::is_ascii_whitespace) {
        GenerateMatches::default()
    } else {
        Json::<GenerateMatches>::from_bytes(&body).map_err(ApiError::from)?.0
    };
    let generated = state
        .matches
        .generate_matches(&actor, tournament_id, options)
        .await?;
    metrics::matches_generated_total(generated.matches.len());
    Ok((StatusCode::CREATED, Json(generated)))
}
