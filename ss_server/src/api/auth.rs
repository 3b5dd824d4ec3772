//! Authentication API handlers.
//!
//! Register:
//! ```bash
//! curl -X POST http://localhost:8000/api/v1/auth/register \
//!   -H "Content-Type: application/json" \
//!   -d '{"email": "ana@example.com", "username": "ana", "password": "long-enough", "role": "player"}'
//! ```
//!
//! Login:
//! ```bash
//! curl -X POST http://localhost:8000/api/v1/auth/login \
//!   -H "Content-Type: application/json" \
//!   -d '{"email": "ana@example.com", "password": "long-enough"}'
//! ```

use axum::{Json, extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};
use smartsport::auth::{LoginRequest, RegisterRequest, User};

use super::{AppState, error::{ApiJson, ApiResult}, middleware::CurrentActor};
use crate::{logging, metrics};

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub user: User,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub user: User,
}

#[derive(Debug, Deserialize)]
pub struct RefreshPayload {
    pub refresh_token: String,
}

/// Create an account with its role profile.
///
/// # Errors
///
/// - `400 Bad Request`: malformed or duplicate email/username, short password
/// - `403 Forbidden`: administrator role requested
pub async fn register(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<RegisterResponse>)> {
    let user = state.auth_manager.register(payload).await?;
    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            user,
            message: "User created successfully".to_string(),
        }),
    ))
}

/// Exchange email and password for an access/refresh token pair.
///
/// # Errors
///
/// - `404 Not Found`: no account with this email
/// - `401 Unauthorized`: wrong password
/// - `403 Forbidden`: account disabled
pub async fn login(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<LoginRequest>,
) -> ApiResult<Json<AuthResponse>> {
    let email = payload.email.clone();
    match state.auth_manager.login(payload).await {
        Ok((user, tokens)) => {
            metrics::login_attempts_total(true);
            Ok(Json(AuthResponse {
                access_token: tokens.access_token,
                refresh_token: tokens.refresh_token,
                user,
            }))
        }
        Err(e) => {
            metrics::login_attempts_total(false);
            logging::log_security_event("failed_login", None, None, &format!("{email}: {e}"));
            Err(e.into())
        }
    }
}

/// Revoke a refresh token. Access tokens stay valid until they expire.
pub async fn logout(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<RefreshPayload>,
) -> ApiResult<StatusCode> {
    state.auth_manager.logout(&payload.refresh_token).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Rotate a refresh token: the old one is revoked, a new pair is issued.
///
/// # Errors
///
/// - `401 Unauthorized`: unknown, expired or revoked refresh token
pub async fn refresh_token(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<RefreshPayload>,
) -> ApiResult<Json<AuthResponse>> {
    let (user, tokens) = state.auth_manager.refresh_token(&payload.refresh_token).await?;
    Ok(Json(AuthResponse {
        access_token: tokens.access_token,
        refresh_token: tokens.refresh_token,
        user,
    }))
}

/// The caller's own account.
pub async fn me(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
) -> ApiResult<Json<User>> {
    Ok(Json(state.auth_manager.get_user(actor.user_id).await?))
}
