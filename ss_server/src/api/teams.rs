//! Team and roster handlers.
//!
//! Reads are public. Organizers manage the teams they own; administrators
//! manage all of them.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use smartsport::{
    Page,
    auth::{Action, Policy, Resource},
    team::{
        MemberId, NewTeam, NewTeamMember, Team, TeamFilter, TeamId, TeamMember, TeamMemberFilter,
        TeamMemberUpdate, TeamUpdate,
    },
};

use super::{AppState, error::{ApiJson, ApiResult}, middleware::CurrentActor};

pub async fn list_teams(
    State(state): State<AppState>,
    Query(filter): Query<TeamFilter>,
    Query(page): Query<Page>,
) -> ApiResult<Json<Vec<Team>>> {
    Ok(Json(state.teams.list_teams(&filter, page).await?))
}

pub async fn create_team(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    ApiJson(payload): ApiJson<NewTeam>,
) -> ApiResult<(StatusCode, Json<Team>)> {
    Policy::check(&actor, Resource::Team, Action::Create)?;
    let team = state.teams.create_team(&actor, payload).await?;
    Ok((StatusCode::CREATED, Json(team)))
}

pub async fn get_team(
    State(state): State<AppState>,
    Path(team_id): Path<TeamId>,
) -> ApiResult<Json<Team>> {
    Ok(Json(state.teams.get_team(team_id).await?))
}

pub async fn update_team(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(team_id): Path<TeamId>,
    ApiJson(payload): ApiJson<TeamUpdate>,
) -> ApiResult<Json<Team>> {
    Policy::check(&actor, Resource::Team, Action::Update)?;
    Ok(Json(state.teams.update_team(&actor, team_id, payload).await?))
}

pub async fn delete_team(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(team_id): Path<TeamId>,
) -> ApiResult<StatusCode> {
    Policy::check(&actor, Resource::Team, Action::Delete)?;
    state.teams.delete_team(&actor, team_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_members(
    State(state): State<AppState>,
    Query(filter): Query<TeamMemberFilter>,
    Query(page): Query<Page>,
) -> ApiResult<Json<Vec<TeamMember>>> {
    Ok(Json(state.teams.list_members(&filter, page).await?))
}

pub async fn add_member(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    ApiJson(payload): ApiJson<NewTeamMember>,
) -> ApiResult<(StatusCode, Json<TeamMember>)> {
    Policy::check(&actor, Resource::TeamMember, Action::Create)?;
    let member = state.teams.add_member(&actor, payload).await?;
    Ok((StatusCode::CREATED, Json(member)))
}

pub async fn get_member(
    State(state): State<AppState>,
    Path(member_id): Path<MemberId>,
) -> ApiResult<Json<TeamMember>> {
    Ok(Json(state.teams.get_member(member_id).await?))
}

pub async fn update_member(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(member_id): Path<MemberId>,
    ApiJson(payload): ApiJson<TeamMemberUpdate>,
) -> ApiResult<Json<TeamMember>> {
    Policy::check(&actor, Resource::TeamMember, Action::Update)?;
    Ok(Json(state.teams.update_member(&actor, member_id, payload).await?))
}

pub async fn remove_member(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(member_id): Path<MemberId>,
) -> ApiResult<StatusCode> {
    Policy::check(&actor, Resource::TeamMember, Action::Delete)?;
    state.teams.remove_member(&actor, member_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
