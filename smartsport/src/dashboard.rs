//! Administrator overview: headline counts and the latest records.

use crate::auth::manager::{USER_COLUMNS, user_from_row};
use crate::auth::{Actor, Role, User};
use crate::payment::Payment;
use crate::payment::manager::{PAYMENT_COLUMNS, payment_from_row};
use serde::Serialize;
use sqlx::{PgPool, Row};
use std::sync::Arc;
use thiserror::Error;

/// Length of each "recent" list.
pub const RECENT_LIMIT: i64 = 5;

#[derive(Debug, Error)]
pub enum DashboardError {
    #[error("Forbidden: {0}")]
    Forbidden(&'static str),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl DashboardError {
    pub fn client_message(&self) -> String {
        match self {
            DashboardError::Database(_) => "Internal server error".to_string(),
            _ => self.to_string(),
        }
    }
}

pub type DashboardResult<T> = Result<T, DashboardError>;

#[derive(Debug, Clone, Serialize)]
pub struct AdminDashboard {
    pub total_players: i64,
    pub total_organizers: i64,
    pub total_tournaments: i64,
    pub total_teams: i64,
    /// Tournaments still planned or under way
    pub active_tournaments: i64,
    pub recent_players: Vec<User>,
    pub recent_organizers: Vec<User>,
    pub recent_payments: Vec<Payment>,
}

#[derive(Clone)]
pub struct DashboardManager {
    pool: Arc<PgPool>,
}

impl DashboardManager {
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }

    pub async fn admin_dashboard(&self, actor: &Actor) -> DashboardResult<AdminDashboard> {
        if !actor.is_admin() {
            return Err(DashboardError::Forbidden("the dashboard is for administrators"));
        }

        let counts = sqlx::query(
            "SELECT
                (SELECT COUNT(*) FROM players) AS total_players,
                (SELECT COUNT(*) FROM organizers) AS total_organizers,
                (SELECT COUNT(*) FROM tournaments) AS total_tournaments,
                (SELECT COUNT(*) FROM teams) AS total_teams,
                (SELECT COUNT(*) FROM tournaments
                  WHERE status IN ('planned', 'ongoing')) AS active_tournaments",
        )
        .fetch_one(self.pool.as_ref())
        .await?;

        let recent_payments = sqlx::query(&format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments ORDER BY paid_at DESC, id DESC LIMIT $1"
        ))
        .bind(RECENT_LIMIT)
        .fetch_all(self.pool.as_ref())
        .await?
        .iter()
        .map(payment_from_row)
        .collect::<Result<_, _>>()?;

        Ok(AdminDashboard {
            total_players: counts.try_get("total_players")?,
            total_organizers: counts.try_get("total_organizers")?,
            total_tournaments: counts.try_get("total_tournaments")?,
            total_teams: counts.try_get("total_teams")?,
            active_tournaments: counts.try_get("active_tournaments")?,
            recent_players: self.recent_users(Role::Player).await?,
            recent_organizers: self.recent_users(Role::Organizer).await?,
            recent_payments,
        })
    }

    async fn recent_users(&self, role: Role) -> Result<Vec<User>, sqlx::Error> {
        sqlx::query(&format!(
            "SELECT {USER_COLUMNS} FROM users
             WHERE role = $1
             ORDER BY created_at DESC, id DESC
             LIMIT $2"
        ))
        .bind(role.as_str())
        .bind(RECENT_LIMIT)
        .fetch_all(self.pool.as_ref())
        .await?
        .iter()
        .map(user_from_row)
        .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_dashboard_is_administrator_only() {
        let pool = sqlx::postgres::PgPoolOptions::new()
            .connect_lazy("postgres://localhost/smartsport_unit")
            .unwrap();
        let dashboard = DashboardManager::new(Arc::new(pool));

        for role in [Role::Player, Role::Organizer, Role::Referee] {
            let result = dashboard.admin_dashboard(&Actor::new(3, role)).await;
            assert!(matches!(result, Err(DashboardError::Forbidden(_))));
        }
    }
}
