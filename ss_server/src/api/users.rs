//! User administration handlers.
//!
//! Any authenticated caller may read accounts; only administrators create,
//! edit or delete them.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use smartsport::{
    Page,
    auth::{Action, Policy, RegisterRequest, Resource, User, UserId},
    directory::{UserFilter, UserUpdate},
};

use super::{AppState, error::{ApiJson, ApiResult}, middleware::CurrentActor};

pub async fn list_users(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Query(filter): Query<UserFilter>,
    Query(page): Query<Page>,
) -> ApiResult<Json<Vec<User>>> {
    Policy::check(&actor, Resource::User, Action::Read)?;
    Ok(Json(state.directory.list_users(&filter, page).await?))
}

/// Create an account of any role, administrators included.
pub async fn create_user(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    ApiJson(payload): ApiJson<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<User>)> {
    Policy::check(&actor, Resource::User, Action::Create)?;
    let user = state.directory.create_user(&actor, payload).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn get_user(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(user_id): Path<UserId>,
) -> ApiResult<Json<User>> {
    Policy::check(&actor, Resource::User, Action::Read)?;
    Ok(Json(state.directory.get_user(user_id).await?))
}

pub async fn update_user(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(user_id): Path<UserId>,
    ApiJson(payload): ApiJson<UserUpdate>,
) -> ApiResult<Json<User>> {
    Policy::check(&actor, Resource::User, Action::Update)?;
    Ok(Json(state.directory.update_user(&actor, user_id, payload).await?))
}

pub async fn delete_user(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(user_id): Path<UserId>,
) -> ApiResult<StatusCode> {
    Policy::check(&actor, Resource::User, Action::Delete)?;
    state.directory.delete_user(&actor, user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
