//! Match handlers.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use smartsport::{
    Page,
    auth::{Action, Policy, Resource},
    matches::{Match, MatchFilter, MatchId, MatchUpdate, NewMatch, ScoreSubmission},
};

use super::{AppState, error::{ApiJson, ApiResult}, middleware::CurrentActor};
use crate::metrics;

pub async fn list_matches(
    State(state): State<AppState>,
    Query(filter): Query<MatchFilter>,
    Query(page): Query<Page>,
) -> ApiResult<Json<Vec<Match>>> {
    Ok(Json(state.matches.list_matches(&filter, page).await?))
}

pub async fn create_match(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    ApiJson(payload): ApiJson<NewMatch>,
) -> ApiResult<(StatusCode, Json<Match>)> {
    Policy::check(&actor, Resource::Match, Action::Create)?;
    let created = state.matches.create_match(&actor, payload).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn get_match(
    State(state): State<AppState>,
    Path(match_id): Path<MatchId>,
) -> ApiResult<Json<Match>> {
    Ok(Json(state.matches.get_match(match_id).await?))
}

/// Scores and status of a finished match are frozen; such a patch is `400`.
pub async fn update_match(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(match_id): Path<MatchId>,
    ApiJson(payload): ApiJson<MatchUpdate>,
) -> ApiResult<Json<Match>> {
    Policy::check(&actor, Resource::Match, Action::Update)?;
    Ok(Json(state.matches.update_match(&actor, match_id, payload).await?))
}

pub async fn delete_match(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(match_id): Path<MatchId>,
) -> ApiResult<StatusCode> {
    Policy::check(&actor, Resource::Match, Action::Delete)?;
    state.matches.delete_match(&actor, match_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Record the final score and finish the match.
///
/// # Errors
///
/// - `400 Bad Request`: missing or negative score, match already finished or cancelled
/// - `403 Forbidden`: caller is neither an administrator nor the assigned referee
pub async fn submit_score(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(match_id): Path<MatchId>,
    ApiJson(payload): ApiJson<ScoreSubmission>,
) -> ApiResult<Json<Match>> {
    Policy::check(&actor, Resource::Match, Action::SubmitScore)?;
    let finished = state.matches.submit_score(&actor, match_id, payload).await?;
    metrics::scores_submitted_total();
    Ok(Json(finished))
}
