//! Payment handlers.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use smartsport::{
    Page,
    auth::{Action, Policy, Resource},
    payment::{NewPayment, Payment, PaymentFilter, PaymentId, PaymentUpdate},
};

use super::{AppState, error::{ApiJson, ApiResult}, middleware::CurrentActor};

/// Players see their own payments, administrators all of them.
pub async fn list_payments(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Query(filter): Query<PaymentFilter>,
    Query(page): Query<Page>,
) -> ApiResult<Json<Vec<Payment>>> {
    Policy::check(&actor, Resource::Payment, Action::Read)?;
    Ok(Json(state.payments.list_payments(&actor, &filter, page).await?))
}

pub async fn create_payment(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    ApiJson(payload): ApiJson<NewPayment>,
) -> ApiResult<(StatusCode, Json<Payment>)> {
    Policy::check(&actor, Resource::Payment, Action::Create)?;
    let payment = state.payments.create_payment(&actor, payload).await?;
    Ok((StatusCode::CREATED, Json(payment)))
}

pub async fn get_payment(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(payment_id): Path<PaymentId>,
) -> ApiResult<Json<Payment>> {
    Policy::check(&actor, Resource::Payment, Action::Read)?;
    Ok(Json(state.payments.get_payment(&actor, payment_id).await?))
}

pub async fn update_payment(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(payment_id): Path<PaymentId>,
    ApiJson(payload): ApiJson<PaymentUpdate>,
) -> ApiResult<Json<Payment>> {
    Policy::check(&actor, Resource::Payment, Action::Update)?;
    Ok(Json(
        state
            .payments
            .update_payment(&actor, payment_id, payload)
            .await?,
    ))
}

pub async fn delete_payment(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(payment_id): Path<PaymentId>,
) -> ApiResult<StatusCode> {
    Policy::check(&actor, Resource::Payment, Action::Delete)?;
    state.payments.delete_payment(&actor, payment_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
