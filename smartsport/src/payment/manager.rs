//! Payment ledger implementation.

use super::{
    errors::{PaymentError, PaymentResult},
    models::{NewPayment, Payment, PaymentFilter, PaymentId, PaymentStatus, PaymentUpdate},
};
use crate::auth::{Actor, Role};
use crate::db::{foreign_key_field, text_column};
use crate::pagination::Page;
use crate::validation::{FieldErrors, INVALID_REFERENCE};
use sqlx::{PgPool, Postgres, QueryBuilder, Row, postgres::PgRow};
use std::sync::Arc;

pub(crate) const PAYMENT_COLUMNS: &str = "id, player_id, amount_cents, method, status, paid_at";

pub(crate) fn payment_from_row(row: &PgRow) -> Result<Payment, sqlx::Error> {
    Ok(Payment {
        id: row.try_get("id")?,
        player_id: row.try_get("player_id")?,
        amount_cents: row.try_get("amount_cents")?,
        method: text_column(row, "method")?,
        status: text_column(row, "status")?,
        paid_at: row.try_get("paid_at")?,
    })
}

/// Payment ledger manager
#[derive(Clone)]
pub struct PaymentManager {
    pool: Arc<PgPool>,
}

impl PaymentManager {
    /// Create a new payment manager
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }

    /// Record a payment.
    ///
    /// Players record their own pending payments. Administrators record
    /// payments for any player (`player_id` required) with any initial status.
    ///
    /// # Errors
    ///
    /// * `PaymentError::Validation` - negative amount, missing or unknown player
    pub async fn create_payment(&self, actor: &Actor, request: NewPayment) -> PaymentResult<Payment> {
        let mut errors = request.validate();
        let (player_id, status) = match actor.role {
            Role::Player => (Some(actor.user_id), PaymentStatus::Pending),
            Role::Administrator => (request.player_id, request.status.unwrap_or_default()),
            _ => return Err(PaymentError::Forbidden("only players and administrators record payments")),
        };
        if player_id.is_none() {
            errors.add("player_id", "This field is required.");
        }
        errors.into_result()?;

        let row = sqlx::query(&format!(
            "INSERT INTO payments (player_id, amount_cents, method, status)
             VALUES ($1, $2, $3, $4)
             RETURNING {PAYMENT_COLUMNS}"
        ))
        .bind(player_id)
        .bind(request.amount_cents)
        .bind(request.method.as_str())
        .bind(status.as_str())
        .fetch_one(self.pool.as_ref())
        .await
        .map_err(|e| match foreign_key_field(&e, "payments") {
            Some(field) => FieldErrors::single(field, INVALID_REFERENCE).into(),
            None => PaymentError::from(e),
        })?;

        let payment = payment_from_row(&row)?;
        log::info!(
            "Payment {} of {} cents ({}) recorded for player {}",
            payment.id,
            payment.amount_cents,
            payment.method,
            payment.player_id
        );
        Ok(payment)
    }

    /// Get a payment visible to the caller.
    ///
    /// A player asking for someone else's payment gets `NotFound`.
    pub async fn get_payment(&self, actor: &Actor, payment_id: PaymentId) -> PaymentResult<Payment> {
        let payment = self.load(payment_id).await?;
        if actor.is_admin() || payment.player_id == actor.user_id {
            Ok(payment)
        } else {
            Err(PaymentError::NotFound(payment_id))
        }
    }

    /// Most recent first.
    pub async fn list_payments(
        &self,
        actor: &Actor,
        filter: &PaymentFilter,
        page: Page,
    ) -> PaymentResult<Vec<Payment>> {
        let page = page.normalized();
        let mut query = QueryBuilder::<Postgres>::new(format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments WHERE TRUE"
        ));
        match actor.role {
            Role::Administrator => {
                if let Some(player_id) = filter.player_id {
                    query.push(" AND player_id = ").push_bind(player_id);
                }
            }
            Role::Player => {
                query.push(" AND player_id = ").push_bind(actor.user_id);
            }
            _ => return Err(PaymentError::Forbidden("payments are private")),
        }
        if let Some(status) = filter.status {
            query.push(" AND status = ").push_bind(status.as_str());
        }
        if let Some(method) = filter.method {
            query.push(" AND method = ").push_bind(method.as_str());
        }
        query
            .push(" ORDER BY paid_at DESC, id DESC LIMIT ")
            .push_bind(page.limit)
            .push(" OFFSET ")
            .push_bind(page.offset);

        let rows = query.build().fetch_all(self.pool.as_ref()).await?;
        Ok(rows.iter().map(payment_from_row).collect::<Result<_, _>>()?)
    }

    /// Administrator edit: status, amount or method.
    pub async fn update_payment(
        &self,
        actor: &Actor,
        payment_id: PaymentId,
        update: PaymentUpdate,
    ) -> PaymentResult<Payment> {
        if !actor.is_admin() {
            return Err(PaymentError::Forbidden("only administrators edit payments"));
        }
        update.validate().into_result()?;

        let row = sqlx::query(&format!(
            "UPDATE payments
             SET amount_cents = COALESCE($1, amount_cents),
                 method = COALESCE($2, method),
                 status = COALESCE($3, status)
             WHERE id = $4
             RETURNING {PAYMENT_COLUMNS}"
        ))
        .bind(update.amount_cents)
        .bind(update.method.map(|m| m.as_str()))
        .bind(update.status.map(|s| s.as_str()))
        .bind(payment_id)
        .fetch_optional(self.pool.as_ref())
        .await?
        .ok_or(PaymentError::NotFound(payment_id))?;

        let payment = payment_from_row(&row)?;
        if let Some(status) = update.status {
            log::info!("Payment {} marked {} by user {}", payment_id, status, actor.user_id);
        }
        Ok(payment)
    }

    pub async fn delete_payment(&self, actor: &Actor, payment_id: PaymentId) -> PaymentResult<()> {
        if !actor.is_admin() {
            return Err(PaymentError::Forbidden("only administrators delete payments"));
        }
        let result = sqlx::query("DELETE FROM payments WHERE id = $1")
            .bind(payment_id)
            .execute(self.pool.as_ref())
            .await?;
        if result.rows_affected() == 0 {
            return Err(PaymentError::NotFound(payment_id));
        }
        Ok(())
    }

    async fn load(&self, payment_id: PaymentId) -> PaymentResult<Payment> {
        let row = sqlx::query(&format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments WHERE id = $1"
        ))
        .bind(payment_id)
        .fetch_optional(self.pool.as_ref())
        .await?
        .ok_or(PaymentError::NotFound(payment_id))?;
        Ok(payment_from_row(&row)?)
    }
}
