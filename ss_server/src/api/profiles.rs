//! Player, organizer and referee profile handlers.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use smartsport::{
    Page,
    auth::{Action, Policy, Resource, UserId},
    directory::{
        OrganizerProfile, OrganizerProfileUpdate, PlayerFilter, PlayerProfile,
        PlayerProfileUpdate, RefereeProfile,
    },
};

use super::{AppState, error::{ApiJson, ApiResult}, middleware::CurrentActor};

pub async fn list_players(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Query(filter): Query<PlayerFilter>,
    Query(page): Query<Page>,
) -> ApiResult<Json<Vec<PlayerProfile>>> {
    Policy::check(&actor, Resource::PlayerProfile, Action::Read)?;
    Ok(Json(state.directory.list_players(&filter, page).await?))
}

pub async fn get_player(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(user_id): Path<UserId>,
) -> ApiResult<Json<PlayerProfile>> {
    Policy::check(&actor, Resource::PlayerProfile, Action::Read)?;
    Ok(Json(state.directory.get_player(user_id).await?))
}

/// Players edit their own profile; administrators edit any.
pub async fn update_player(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(user_id): Path<UserId>,
    ApiJson(payload): ApiJson<PlayerProfileUpdate>,
) -> ApiResult<Json<PlayerProfile>> {
    Policy::check(&actor, Resource::PlayerProfile, Action::Update)?;
    Ok(Json(state.directory.update_player(&actor, user_id, payload).await?))
}

pub async fn list_organizers(
    State(state): State<AppState>,
    Query(page): Query<Page>,
) -> ApiResult<Json<Vec<OrganizerProfile>>> {
    Ok(Json(state.directory.list_organizers(page).await?))
}

pub async fn get_organizer(
    State(state): State<AppState>,
    Path(user_id): Path<UserId>,
) -> ApiResult<Json<OrganizerProfile>> {
    Ok(Json(state.directory.get_organizer(user_id).await?))
}

pub async fn update_organizer(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(user_id): Path<UserId>,
    ApiJson(payload): ApiJson<OrganizerProfileUpdate>,
) -> ApiResult<Json<OrganizerProfile>> {
    Policy::check(&actor, Resource::OrganizerProfile, Action::Update)?;
    Ok(Json(state.directory.update_organizer(&actor, user_id, payload).await?))
}

pub async fn list_referees(
    State(state): State<AppState>,
    Query(page): Query<Page>,
) -> ApiResult<Json<Vec<RefereeProfile>>> {
    Ok(Json(state.directory.list_referees(page).await?))
}

pub async fn get_referee(
    State(state): State<AppState>,
    Path(user_id): Path<UserId>,
) -> ApiResult<Json<RefereeProfile>> {
    Ok(Json(state.directory.get_referee(user_id).await?))
}
