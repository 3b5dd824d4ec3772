//! SmartSport REST server.
//!
//! Loads configuration, connects the pool, optionally applies migrations or
//! seeds an administrator, then serves the API until Ctrl+C.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Error, anyhow};
use pico_args::Arguments;
use smartsport::{
    auth::{AuthManager, RegisterRequest, Role},
    db::Database,
};
use ss_server::{
    api::{self, rate_limiter::ClientRateLimiter},
    config::ServerConfig,
    logging, metrics,
};
use tracing::{info, warn};

const HELP: &str = "\
Run the SmartSport tournament management server

USAGE:
  ss_server [OPTIONS]

OPTIONS:
  --bind             IP:PORT   Server socket bind address  [default: env SERVER_BIND or 127.0.0.1:8000]
  --db-url           URL       Database connection string  [default: env DATABASE_URL]
  --admin-email      EMAIL     Administrator email (with --create-admin)
  --admin-username   NAME      Administrator username (with --create-admin)
  --admin-password   PASSWORD  Administrator password (with --create-admin)

FLAGS:
  --migrate                    Apply database migrations before serving
  --create-admin               Create an administrator account and exit
  -h, --help                   Print help information

ENVIRONMENT:
  SERVER_BIND                  Server bind address (e.g., 0.0.0.0:8000)
  DATABASE_URL                 PostgreSQL connection string
  JWT_SECRET                   JWT signing secret (>= 32 chars, required)
  PASSWORD_PEPPER              Password hashing pepper (>= 16 chars, required)
  ACCESS_TOKEN_MINUTES         Access token lifetime [default: 15]
  REFRESH_TOKEN_DAYS           Refresh token lifetime [default: 7]
  RATE_LIMIT_AUTH_REQUESTS     Login/register requests per window [default: 10]
  RATE_LIMIT_AUTH_WINDOW_SECS  Rate limit window [default: 60]
  METRICS_BIND                 Prometheus exporter address (disabled when unset)
";

struct Args {
    bind: Option<SocketAddr>,
    database_url: Option<String>,
    migrate: bool,
    admin: Option<AdminArgs>,
}

struct AdminArgs {
    email: String,
    username: String,
    password: String,
}

fn parse_args() -> Result<Args, Error> {
    let mut pargs = Arguments::from_env();

    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        std::process::exit(0);
    }

    let migrate = pargs.contains("--migrate");
    let admin = if pargs.contains("--create-admin") {
        Some(AdminArgs {
            email: pargs
                .value_from_str("--admin-email")
                .context("--create-admin requires --admin-email")?,
            username: pargs
                .value_from_str("--admin-username")
                .context("--create-admin requires --admin-username")?,
            password: pargs
                .value_from_str("--admin-password")
                .context("--create-admin requires --admin-password")?,
        })
    } else {
        None
    };

    let args = Args {
        bind: pargs.opt_value_from_str("--bind")?,
        database_url: pargs.opt_value_from_str("--db-url")?,
        migrate,
        admin,
    };

    let remaining = pargs.finish();
    if !remaining.is_empty() {
        return Err(anyhow!("Unexpected arguments: {remaining:?}"));
    }

    Ok(args)
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    let _ = dotenvy::dotenv();
    let args = parse_args()?;

    logging::init();

    let config = ServerConfig::from_env(args.bind, args.database_url)?;
    config.validate()?;

    info!("Connecting to database");
    let db = Database::new(&config.database)
        .await
        .context("Failed to connect to database")?;

    if args.migrate {
        let started = Instant::now();
        db.migrate().await.context("Failed to apply migrations")?;
        logging::log_database_operation(
            "MIGRATE",
            "schema",
            started.elapsed().as_millis() as u64,
        );
        info!("Migrations applied");
    }

    let pool = Arc::new(db.pool().clone());
    let auth_manager = AuthManager::new(
        pool.clone(),
        config.security.password_pepper.clone(),
        config.security.jwt_secret.clone(),
    )
    .with_token_durations(
        chrono::Duration::minutes(config.security.access_token_minutes),
        chrono::Duration::days(config.security.refresh_token_days),
    );

    if let Some(admin) = args.admin {
        let user = auth_manager
            .create_user(RegisterRequest {
                email: admin.email,
                username: admin.username,
                password: admin.password,
                role: Some(Role::Administrator),
                first_name: None,
                last_name: None,
                phone: None,
                organization_name: None,
            })
            .await
            .map_err(|e| anyhow!("Failed to create administrator: {e}"))?;
        info!(user_id = user.id, username = %user.username, "Administrator created");
        db.close().await;
        return Ok(());
    }

    if let Some(metrics_bind) = config.metrics_bind {
        match metrics::init_metrics(metrics_bind) {
            Ok(()) => info!("Prometheus exporter listening on {metrics_bind}"),
            Err(e) => warn!("{e}"),
        }
    }

    let limiter = ClientRateLimiter::new(config.rate_limit.auth_requests, config.rate_limit.window());
    let app = api::create_router(api::AppState::new(pool, auth_manager, limiter));

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind))?;

    info!(
        "Server is running at http://{}. Press Ctrl+C to stop.",
        config.bind
    );

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("Server error")?;

    info!("Shutting down server...");
    db.close().await;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl+C: {e}");
        std::future::pending::<()>().await;
    }
}
