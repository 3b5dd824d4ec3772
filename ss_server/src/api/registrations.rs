//! Registration handlers: players apply, organizers decide.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use smartsport::{
    Page,
    auth::{Action, Policy, Resource},
    registration::{Decision, NewRegistration, Registration, RegistrationFilter, RegistrationId},
};

use super::{AppState, error::{ApiJson, ApiResult}, middleware::CurrentActor};
use crate::metrics;

pub async fn list_registrations(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Query(filter): Query<RegistrationFilter>,
    Query(page): Query<Page>,
) -> ApiResult<Json<Vec<Registration>>> {
    Policy::check(&actor, Resource::Registration, Action::Read)?;
    Ok(Json(
        state
            .registrations
            .list_registrations(&actor, &filter, page)
            .await?,
    ))
}

pub async fn create_registration(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    ApiJson(payload): ApiJson<NewRegistration>,
) -> ApiResult<(StatusCode, Json<Registration>)> {
    Policy::check(&actor, Resource::Registration, Action::Create)?;
    let registration = state.registrations.register(&actor, payload).await?;
    Ok((StatusCode::CREATED, Json(registration)))
}

pub async fn get_registration(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(registration_id): Path<RegistrationId>,
) -> ApiResult<Json<Registration>> {
    Policy::check(&actor, Resource::Registration, Action::Read)?;
    Ok(Json(
        state
            .registrations
            .get_registration(&actor, registration_id)
            .await?,
    ))
}

/// Approve or reject a pending registration (`PATCH /registrations/{id}`).
pub async fn decide_registration(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(registration_id): Path<RegistrationId>,
    ApiJson(payload): ApiJson<Decision>,
) -> ApiResult<Json<Registration>> {
    Policy::check(&actor, Resource::Registration, Action::Decide)?;
    let decided = state
        .registrations
        .decide(&actor, registration_id, payload)
        .await?;
    metrics::registration_decisions_total(decided.status.as_str());
    Ok(Json(decided))
}
