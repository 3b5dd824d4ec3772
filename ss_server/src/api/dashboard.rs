use axum::{Json, extract::State};
use smartsport::{
    auth::{Action, Policy, Resource},
    dashboard::AdminDashboard,
};

use super::{AppState, error::ApiResult, middleware::CurrentActor};

/// Headline counts and the latest players, organizers and payments.
pub async fn admin_dashboard(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
) -> ApiResult<Json<AdminDashboard>> {
    Policy::check(&actor, Resource::Dashboard, Action::Read)?;
    Ok(Json(state.dashboard.admin_dashboard(&actor).await?))
}
