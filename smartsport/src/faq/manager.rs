use super::models::{
    CategoryId, EntryId, FaqCategory, FaqCategoryUpdate, FaqEntry, FaqEntryFilter, FaqEntryUpdate,
    NewFaqCategory, NewFaqEntry,
};
use crate::auth::Actor;
use crate::db::foreign_key_field;
use crate::pagination::Page;
use crate::validation::{FieldErrors, INVALID_REFERENCE};
use sqlx::{PgPool, Postgres, QueryBuilder, Row, postgres::PgRow};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FaqError {
    #[error("FAQ category not found: {0}")]
    CategoryNotFound(CategoryId),

    #[error("FAQ entry not found: {0}")]
    EntryNotFound(EntryId),

    #[error("Invalid input: {0}")]
    Validation(FieldErrors),

    #[error("Forbidden: {0}")]
    Forbidden(&'static str),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl FaqError {
    pub fn client_message(&self) -> String {
        match self {
            FaqError::Database(_) => "Internal server error".to_string(),
            FaqError::CategoryNotFound(_) => "FAQ category not found".to_string(),
            FaqError::EntryNotFound(_) => "FAQ entry not found".to_string(),
            _ => self.to_string(),
        }
    }
}

impl From<FieldErrors> for FaqError {
    fn from(errors: FieldErrors) -> Self {
        FaqError::Validation(errors)
    }
}

pub type FaqResult<T> = Result<T, FaqError>;

const CATEGORY_COLUMNS: &str = "id, name, description, display_order";
const ENTRY_COLUMNS: &str =
    "id, category_id, question, answer, display_order, is_active, created_at, updated_at";

fn category_from_row(row: &PgRow) -> Result<FaqCategory, sqlx::Error> {
    Ok(FaqCategory {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        description: row.try_get("description")?,
        display_order: row.try_get("display_order")?,
    })
}

fn entry_from_row(row: &PgRow) -> Result<FaqEntry, sqlx::Error> {
    Ok(FaqEntry {
        id: row.try_get("id")?,
        category_id: row.try_get("category_id")?,
        question: row.try_get("question")?,
        answer: row.try_get("answer")?,
        display_order: row.try_get("display_order")?,
        is_active: row.try_get("is_active")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn entry_conflict(err: sqlx::Error) -> FaqError {
    match foreign_key_field(&err, "faq_entries") {
        Some(field) => FieldErrors::single(field, INVALID_REFERENCE).into(),
        None => err.into(),
    }
}

fn require_admin(actor: &Actor) -> FaqResult<()> {
    if actor.is_admin() {
        Ok(())
    } else {
        Err(FaqError::Forbidden("only administrators edit the FAQ"))
    }
}

/// FAQ catalog manager
#[derive(Clone)]
pub struct FaqManager {
    pool: Arc<PgPool>,
}

impl FaqManager {
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }

    pub async fn create_category(
        &self,
        actor: &Actor,
        request: NewFaqCategory,
    ) -> FaqResult<FaqCategory> {
        require_admin(actor)?;
        request.validate().into_result()?;

        let row = sqlx::query(&format!(
            "INSERT INTO faq_categories (name, description, display_order)
             VALUES ($1, $2, $3)
             RETURNING {CATEGORY_COLUMNS}"
        ))
        .bind(request.name.trim())
        .bind(&request.description)
        .bind(request.display_order)
        .fetch_one(self.pool.as_ref())
        .await?;
        Ok(category_from_row(&row)?)
    }

    pub async fn get_category(&self, category_id: CategoryId) -> FaqResult<FaqCategory> {
        let row = sqlx::query(&format!(
            "SELECT {CATEGORY_COLUMNS} FROM faq_categories WHERE id = $1"
        ))
        .bind(category_id)
        .fetch_optional(self.pool.as_ref())
        .await?
        .ok_or(FaqError::CategoryNotFound(category_id))?;
        Ok(category_from_row(&row)?)
    }

    /// Categories in display order.
    pub async fn list_categories(&self, page: Page) -> FaqResult<Vec<FaqCategory>> {
        let page = page.normalized();
        let rows = sqlx::query(&format!(
            "SELECT {CATEGORY_COLUMNS} FROM faq_categories
             ORDER BY display_order, id
             LIMIT $1 OFFSET $2"
        ))
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(self.pool.as_ref())
        .await?;
        Ok(rows.iter().map(category_from_row).collect::<Result<_, _>>()?)
    }

    pub async fn update_category(
        &self,
        actor: &Actor,
        category_id: CategoryId,
        update: FaqCategoryUpdate,
    ) -> FaqResult<FaqCategory> {
        require_admin(actor)?;
        update.validate().into_result()?;

        let row = sqlx::query(&format!(
            "UPDATE faq_categories
             SET name = COALESCE($1, name),
                 description = COALESCE($2, description),
                 display_order = COALESCE($3, display_order)
             WHERE id = $4
             RETURNING {CATEGORY_COLUMNS}"
        ))
        .bind(update.name.as_deref().map(str::trim))
        .bind(update.description)
        .bind(update.display_order)
        .bind(category_id)
        .fetch_optional(self.pool.as_ref())
        .await?
        .ok_or(FaqError::CategoryNotFound(category_id))?;
        Ok(category_from_row(&row)?)
    }

    /// Deleting a category removes its entries.
    pub async fn delete_category(&self, actor: &Actor, category_id: CategoryId) -> FaqResult<()> {
        require_admin(actor)?;
        let result = sqlx::query("DELETE FROM faq_categories WHERE id = $1")
            .bind(category_id)
            .execute(self.pool.as_ref())
            .await?;
        if result.rows_affected() == 0 {
            return Err(FaqError::CategoryNotFound(category_id));
        }
        log::info!("FAQ category {} deleted by user {}", category_id, actor.user_id);
        Ok(())
    }

    pub async fn create_entry(&self, actor: &Actor, request: NewFaqEntry) -> FaqResult<FaqEntry> {
        require_admin(actor)?;
        request.validate().into_result()?;

        let row = sqlx::query(&format!(
            "INSERT INTO faq_entries (category_id, question, answer, display_order, is_active)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {ENTRY_COLUMNS}"
        ))
        .bind(request.category_id)
        .bind(request.question.trim())
        .bind(&request.answer)
        .bind(request.display_order)
        .bind(request.is_active)
        .fetch_one(self.pool.as_ref())
        .await
        .map_err(entry_conflict)?;
        Ok(entry_from_row(&row)?)
    }

    /// Inactive entries are hidden unless `viewer` is an administrator.
    pub async fn get_entry(&self, viewer: Option<&Actor>, entry_id: EntryId) -> FaqResult<FaqEntry> {
        let row = sqlx::query(&format!(
            "SELECT {ENTRY_COLUMNS} FROM faq_entries WHERE id = $1"
        ))
        .bind(entry_id)
        .fetch_optional(self.pool.as_ref())
        .await?
        .ok_or(FaqError::EntryNotFound(entry_id))?;
        let entry = entry_from_row(&row)?;
        if entry.is_active || sees_inactive(viewer) {
            Ok(entry)
        } else {
            Err(FaqError::EntryNotFound(entry_id))
        }
    }

    pub async fn list_entries(
        &self,
        viewer: Option<&Actor>,
        filter: &FaqEntryFilter,
        page: Page,
    ) -> FaqResult<Vec<FaqEntry>> {
        let page = page.normalized();
        let mut query = QueryBuilder::<Postgres>::new(format!(
            "SELECT {ENTRY_COLUMNS} FROM faq_entries WHERE TRUE"
        ));
        if !sees_inactive(viewer) {
            query.push(" AND is_active");
        }
        if let Some(category_id) = filter.category_id {
            query.push(" AND category_id = ").push_bind(category_id);
        }
        query
            .push(" ORDER BY category_id, display_order, id LIMIT ")
            .push_bind(page.limit)
            .push(" OFFSET ")
            .push_bind(page.offset);

        let rows = query.build().fetch_all(self.pool.as_ref()).await?;
        Ok(rows.iter().map(entry_from_row).collect::<Result<_, _>>()?)
    }

    pub async fn update_entry(
        &self,
        actor: &Actor,
        entry_id: EntryId,
        update: FaqEntryUpdate,
    ) -> FaqResult<FaqEntry> {
        require_admin(actor)?;
        update.validate().into_result()?;

        let row = sqlx::query(&format!(
            "UPDATE faq_entries
             SET category_id = COALESCE($1, category_id),
                 question = COALESCE($2, question),
                 answer = COALESCE($3, answer),
                 display_order = COALESCE($4, display_order),
                 is_active = COALESCE($5, is_active),
                 updated_at = NOW()
             WHERE id = $6
             RETURNING {ENTRY_COLUMNS}"
        ))
        .bind(update.category_id)
        .bind(update.question.as_deref().map(str::trim))
        .bind(update.answer)
        .bind(update.display_order)
        .bind(update.is_active)
        .bind(entry_id)
        .fetch_optional(self.pool.as_ref())
        .await
        .map_err(entry_conflict)?
        .ok_or(FaqError::EntryNotFound(entry_id))?;
        Ok(entry_from_row(&row)?)
    }

    pub async fn delete_entry(&self, actor: &Actor, entry_id: EntryId) -> FaqResult<()> {
        require_admin(actor)?;
        let result = sqlx::query("DELETE FROM faq_entries WHERE id = $1")
            .bind(entry_id)
            .execute(self.pool.as_ref())
            .await?;
        if result.rows_affected() == 0 {
            return Err(FaqError::EntryNotFound(entry_id));
        }
        Ok(())
    }
}

fn sees_inactive(viewer: Option<&Actor>) -> bool {
    viewer.is_some_and(Actor::is_admin)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Role;

    fn manager() -> FaqManager {
        let pool = sqlx::postgres::PgPoolOptions::new()
            .connect_lazy("postgres://localhost/smartsport_unit")
            .unwrap();
        FaqManager::new(Arc::new(pool))
    }

    #[test]
    fn test_only_administrators_see_inactive_entries() {
        assert!(!sees_inactive(None));
        assert!(!sees_inactive(Some(&Actor::new(2, Role::Organizer))));
        assert!(sees_inactive(Some(&Actor::new(1, Role::Administrator))));
    }

    #[tokio::test]
    async fn test_organizers_cannot_write_the_faq() {
        let organizer = Actor::new(2, Role::Organizer);
        let result = manager()
            .create_category(
                &organizer,
                NewFaqCategory {
                    name: "Payments".to_string(),
                    description: String::new(),
                    display_order: 1,
                },
            )
            .await;
        assert!(matches!(result, Err(FaqError::Forbidden(_))));

        let result = manager().delete_entry(&organizer, 9).await;
        assert!(matches!(result, Err(FaqError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_blank_question_is_rejected() {
        let result = manager()
            .create_entry(
                &Actor::new(1, Role::Administrator),
                NewFaqEntry {
                    category_id: 1,
                    question: " ".to_string(),
                    answer: "Anything".to_string(),
                    display_order: 0,
                    is_active: true,
                },
            )
            .await;
        match result {
            Err(FaqError::Validation(errors)) => assert!(errors.contains("question")),
            other => panic!("expected validation error, got {other:?}"),
        }
    }
}
