//! FAQ handlers. Public reads; administrator writes.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use smartsport::{
    Page,
    auth::{Action, Policy, Resource},
    faq::{
        CategoryId, EntryId, FaqCategory, FaqCategoryUpdate, FaqEntry, FaqEntryFilter,
        FaqEntryUpdate, NewFaqCategory, NewFaqEntry,
    },
};

use super::{
    AppState,
    error::{ApiJson, ApiResult},
    middleware::{CurrentActor, Viewer},
};

pub async fn list_categories(
    State(state): State<AppState>,
    Query(page): Query<Page>,
) -> ApiResult<Json<Vec<FaqCategory>>> {
    Ok(Json(state.faq.list_categories(page).await?))
}

pub async fn create_category(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    ApiJson(payload): ApiJson<NewFaqCategory>,
) -> ApiResult<(StatusCode, Json<FaqCategory>)> {
    Policy::check(&actor, Resource::Faq, Action::Create)?;
    let category = state.faq.create_category(&actor, payload).await?;
    Ok((StatusCode::CREATED, Json(category)))
}

pub async fn get_category(
    State(state): State<AppState>,
    Path(category_id): Path<CategoryId>,
) -> ApiResult<Json<FaqCategory>> {
    Ok(Json(state.faq.get_category(category_id).await?))
}

pub async fn update_category(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(category_id): Path<CategoryId>,
    ApiJson(payload): ApiJson<FaqCategoryUpdate>,
) -> ApiResult<Json<FaqCategory>> {
    Policy::check(&actor, Resource::Faq, Action::Update)?;
    Ok(Json(
        state
            .faq
            .update_category(&actor, category_id, payload)
            .await?,
    ))
}

pub async fn delete_category(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(category_id): Path<CategoryId>,
) -> ApiResult<StatusCode> {
    Policy::check(&actor, Resource::Faq, Action::Delete)?;
    state.faq.delete_category(&actor, category_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Administrators also see inactive entries.
pub async fn list_entries(
    State(state): State<AppState>,
    Viewer(viewer): Viewer,
    Query(filter): Query<FaqEntryFilter>,
    Query(page): Query<Page>,
) -> ApiResult<Json<Vec<FaqEntry>>> {
    Ok(Json(
        state
            .faq
            .list_entries(viewer.as_ref(), &filter, page)
            .await?,
    ))
}

pub async fn create_entry(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    ApiJson(payload): ApiJson<NewFaqEntry>,
) -> ApiResult<(StatusCode, Json<FaqEntry>)> {
    Policy::check(&actor, Resource::Faq, Action::Create)?;
    let entry = state.faq.create_entry(&actor, payload).await?;
    Ok((StatusCode::CREATED, Json(entry)))
}

pub async fn get_entry(
    State(state): State<AppState>,
    Viewer(viewer): Viewer,
    Path(entry_id): Path<EntryId>,
) -> ApiResult<Json<FaqEntry>> {
    Ok(Json(state.faq.get_entry(viewer.as_ref(), entry_id).await?))
}

pub async fn update_entry(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(entry_id): Path<EntryId>,
    ApiJson(payload): ApiJson<FaqEntryUpdate>,
) -> ApiResult<Json<FaqEntry>> {
    Policy::check(&actor, Resource::Faq, Action::Update)?;
    Ok(Json(state.faq.update_entry(&actor, entry_id, payload).await?))
}

pub async fn delete_entry(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(entry_id): Path<EntryId>,
) -> ApiResult<StatusCode> {
    Policy::check(&actor, Resource::Faq, Action::Delete)?;
    state.faq.delete_entry(&actor, entry_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
