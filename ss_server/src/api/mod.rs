//! REST API for the tournament platform.
//!
//! Every resource route lives under `/api/v1` and speaks JSON. Callers
//! authenticate with `Authorization: Bearer <access token>`; catalog reads
//! (teams, tournaments, matches, public profiles, FAQ) also work anonymously.
//!
//! # Modules
//!
//! - [`auth`]: register, login, logout, token refresh, current user
//! - [`users`], [`profiles`]: accounts and role profiles
//! - [`teams`], [`tournaments`], [`registrations`], [`matches`]: competition
//! - [`payments`], [`faq`], [`dashboard`]: back office
//! - [`middleware`], [`rate_limiter`], [`request_id`]: cross-cutting layers
//! - [`error`]: mapping of domain errors onto status codes
//!
//! # Endpoints
//!
//! ```text
//! GET  /health
//! POST /api/v1/auth/register | /auth/login | /auth/logout | /token/refresh
//! GET  /api/v1/auth/me
//! CRUD /api/v1/users | /teams | /team-members | /tournaments | /matches
//!      /payments | /faq/categories | /faq/entries
//! R/U  /api/v1/players | /organizers      R /api/v1/referees
//! POST /api/v1/tournaments/{id}/register-team | register-player
//!      change-status | generate-matches
//! GET  /api/v1/tournaments/{id}/stats
//! POST /api/v1/matches/{id}/submit-score
//! GET/POST /api/v1/registrations, GET/PATCH /api/v1/registrations/{id}
//! GET  /api/v1/dashboard/admin
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use ss_server::api::{AppState, create_router, rate_limiter::ClientRateLimiter};
//! use smartsport::auth::AuthManager;
//! use sqlx::PgPool;
//! use std::{sync::Arc, time::Duration};
//! # async fn example(pool: PgPool) -> Result<(), Box<dyn std::error::Error>> {
//! let pool = Arc::new(pool);
//! let auth = AuthManager::new(pool.clone(), "pepper".into(), "secret".into());
//! let limiter = ClientRateLimiter::new(10, Duration::from_secs(60));
//! let app = create_router(AppState::new(pool, auth, limiter));
//!
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:8000").await?;
//! axum::serve(listener, app).await?;
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod dashboard;
pub mod error;
pub mod faq;
pub mod matches;
pub mod middleware;
pub mod payments;
pub mod profiles;
pub mod rate_limiter;
pub mod registrations;
pub mod request_id;
pub mod teams;
pub mod tournaments;
pub mod users;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post},
};
use serde_json::json;
use smartsport::{
    auth::AuthManager, dashboard::DashboardManager, directory::DirectoryManager,
    faq::FaqManager, matches::MatchManager, payment::PaymentManager,
    registration::RegistrationManager, team::TeamManager, tournament::TournamentManager,
};
use sqlx::PgPool;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use rate_limiter::ClientRateLimiter;

/// Shared handler state. Cloned per request; every field is an `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub pool: Arc<PgPool>,
    pub auth_manager: Arc<AuthManager>,
    pub directory: Arc<DirectoryManager>,
    pub teams: Arc<TeamManager>,
    pub tournaments: Arc<TournamentManager>,
    pub registrations: Arc<RegistrationManager>,
    pub matches: Arc<MatchManager>,
    pub payments: Arc<PaymentManager>,
    pub faq: Arc<FaqManager>,
    pub dashboard: Arc<DashboardManager>,
    pub auth_rate_limiter: Arc<ClientRateLimiter>,
}

impl AppState {
    /// Build every domain manager over one pool.
    pub fn new(
        pool: Arc<PgPool>,
        auth_manager: AuthManager,
        auth_rate_limiter: ClientRateLimiter,
    ) -> Self {
        Self {
            directory: Arc::new(DirectoryManager::new(pool.clone(), auth_manager.clone())),
            teams: Arc::new(TeamManager::new(pool.clone())),
            tournaments: Arc::new(TournamentManager::new(pool.clone())),
            registrations: Arc::new(RegistrationManager::new(pool.clone())),
            matches: Arc::new(MatchManager::new(pool.clone())),
            payments: Arc::new(PaymentManager::new(pool.clone())),
            faq: Arc::new(FaqManager::new(pool.clone())),
            dashboard: Arc::new(DashboardManager::new(pool.clone())),
            auth_manager: Arc::new(auth_manager),
            auth_rate_limiter: Arc::new(auth_rate_limiter),
            pool,
        }
    }
}

/// Assemble the full application router.
///
/// Layers, outermost first: CORS, request ID and access logging, then the
/// bearer-token middleware on `/api/v1`.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .nest("/api/v1", create_v1_router(state.clone()))
        .layer(axum::middleware::from_fn(request_id::request_id_middleware))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

fn create_v1_router(state: AppState) -> Router<AppState> {
    // Credential endpoints are the brute-force target
    let limited = Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            rate_limiter::rate_limit_middleware,
        ));

    let accounts = Router::new()
        .route("/auth/logout", post(auth::logout))
        .route("/auth/me", get(auth::me))
        .route("/token/refresh", post(auth::refresh_token))
        .route("/users", get(users::list_users).post(users::create_user))
        .route(
            "/users/{id}",
            get(users::get_user)
                .put(users::update_user)
                .patch(users::update_user)
                .delete(users::delete_user),
        )
        .route("/players", get(profiles::list_players))
        .route(
            "/players/{id}",
            get(profiles::get_player)
                .put(profiles::update_player)
                .patch(profiles::update_player),
        )
        .route("/organizers", get(profiles::list_organizers))
        .route(
            "/organizers/{id}",
            get(profiles::get_organizer)
                .put(profiles::update_organizer)
                .patch(profiles::update_organizer),
        )
        .route("/referees", get(profiles::list_referees))
        .route("/referees/{id}", get(profiles::get_referee));

    let competition = Router::new()
        .route("/teams", get(teams::list_teams).post(teams::create_team))
        .route(
            "/teams/{id}",
            get(teams::get_team)
                .put(teams::update_team)
                .patch(teams::update_team)
                .delete(teams::delete_team),
        )
        .route(
            "/team-members",
            get(teams::list_members).post(teams::add_member),
        )
        .route(
            "/team-members/{id}",
            get(teams::get_member)
                .put(teams::update_member)
                .patch(teams::update_member)
                .delete(teams::remove_member),
        )
        .route(
            "/tournaments",
            get(tournaments::list_tournaments).post(tournaments::create_tournament),
        )
        .route(
            "/tournaments/{id}",
            get(tournaments::get_tournament)
                .put(tournaments::update_tournament)
                .patch(tournaments::update_tournament)
                .delete(tournaments::delete_tournament),
        )
        .route(
            "/tournaments/{id}/register-team",
            post(tournaments::register_team),
        )
        .route(
            "/tournaments/{id}/register-player",
            post(tournaments::register_player),
        )
        .route(
            "/tournaments/{id}/change-status",
            post(tournaments::change_status),
        )
        .route(
            "/tournaments/{id}/generate-matches",
            post(tournaments::generate_matches),
        )
        .route("/tournaments/{id}/stats", get(tournaments::stats))
        .route(
            "/registrations",
            get(registrations::list_registrations).post(registrations::create_registration),
        )
        .route(
            "/registrations/{id}",
            get(registrations::get_registration).patch(registrations::decide_registration),
        )
        .route(
            "/matches",
            get(matches::list_matches).post(matches::create_match),
        )
        .route(
            "/matches/{id}",
            get(matches::get_match)
                .put(matches::update_match)
                .patch(matches::update_match)
                .delete(matches::delete_match),
        )
        .route("/matches/{id}/submit-score", post(matches::submit_score));

    let back_office = Router::new()
        .route(
            "/payments",
            get(payments::list_payments).post(payments::create_payment),
        )
        .route(
            "/payments/{id}",
            get(payments::get_payment)
                .put(payments::update_payment)
                .patch(payments::update_payment)
                .delete(payments::delete_payment),
        )
        .route(
            "/faq/categories",
            get(faq::list_categories).post(faq::create_category),
        )
        .route(
            "/faq/categories/{id}",
            get(faq::get_category)
                .put(faq::update_category)
                .patch(faq::update_category)
                .delete(faq::delete_category),
        )
        .route(
            "/faq/entries",
            get(faq::list_entries).post(faq::create_entry),
        )
        .route(
            "/faq/entries/{id}",
            get(faq::get_entry)
                .put(faq::update_entry)
                .patch(faq::update_entry)
                .delete(faq::delete_entry),
        )
        .route("/dashboard/admin", get(dashboard::admin_dashboard));

    Router::new()
        .merge(limited)
        .merge(accounts)
        .merge(competition)
        .merge(back_office)
        .layer(axum::middleware::from_fn_with_state(
            state,
            middleware::auth_middleware,
        ))
}

/// Liveness check: `200` when the database answers, `503` otherwise.
///
/// ```bash
/// curl http://localhost:8000/health
/// # {"status":"healthy","database":true,"version":"1.0.0","timestamp":"..."}
/// ```
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let db_healthy = sqlx::query("SELECT 1")
        .fetch_one(&*state.pool)
        .await
        .is_ok();
    crate::metrics::db_connections_active(state.pool.size());

    let status_code = if db_healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let response = json!({
        "status": if db_healthy { "healthy" } else { "unhealthy" },
        "version": env!("CARGO_PKG_VERSION"),
        "database": db_healthy,
        "timestamp": chrono::Utc::now().to_rfc3339(),
    });

    (status_code, Json(response))
}
