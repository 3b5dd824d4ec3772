//! Bearer-token authentication.
//!
//! [`auth_middleware`] runs on every `/api/v1` route. A valid
//! `Authorization: Bearer <jwt>` header puts the caller's [`Actor`] into the
//! request extensions; a missing header leaves them empty so public catalog
//! reads still work; a malformed or expired token is rejected with `401`.
//!
//! Handlers then pick the extractor matching their access rule:
//!
//! ```rust,no_run
//! use ss_server::api::middleware::{CurrentActor, Viewer};
//!
//! async fn protected(CurrentActor(actor): CurrentActor) -> String {
//!     format!("Authenticated as user {}", actor.user_id)
//! }
//!
//! async fn public(Viewer(viewer): Viewer) -> String {
//!     format!("Anonymous: {}", viewer.is_none())
//! }
//! # let _ = (protected, public);
//! ```

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
};
use smartsport::auth::Actor;

use super::{AppState, error::ApiError};

/// Validate an optional bearer token and record the caller.
///
/// # Behavior
///
/// - **No header**: request continues anonymously
/// - **Valid token**: `Actor` inserted into request extensions
/// - **Wrong scheme or invalid/expired token**: `401 Unauthorized`
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let Some(header) = request.headers().get(AUTHORIZATION) else {
        return next.run(request).await;
    };

    let token = header
        .to_str()
        .ok()
        .and_then(|value| value.strip_prefix("Bearer "));
    let Some(token) = token else {
        return ApiError::Unauthorized("Malformed authorization header.".to_string())
            .into_response();
    };

    match state.auth_manager.verify_access_token(token) {
        Ok(claims) => {
            request.extensions_mut().insert(claims.actor());
            next.run(request).await
        }
        Err(e) => ApiError::from(e).into_response(),
    }
}

/// The authenticated caller; `401` when the request carried no token.
#[derive(Debug, Clone, Copy)]
pub struct CurrentActor(pub Actor);

impl<S> FromRequestParts<S> for CurrentActor
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Actor>()
            .copied()
            .map(CurrentActor)
            .ok_or_else(ApiError::unauthorized)
    }
}

/// The caller if one authenticated, for routes that are also public.
#[derive(Debug, Clone, Copy)]
pub struct Viewer(pub Option<Actor>);

impl<S> FromRequestParts<S> for Viewer
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Viewer(parts.extensions.get::<Actor>().copied()))
    }
}
