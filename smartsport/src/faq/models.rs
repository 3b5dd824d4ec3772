//! FAQ data models.

use crate::validation::{FieldErrors, require_text};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type CategoryId = i64;
pub type EntryId = i64;

/// Longest question accepted.
pub const MAX_QUESTION_LEN: usize = 200;

const MAX_CATEGORY_NAME_LEN: usize = 100;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FaqCategory {
    pub id: CategoryId,
    pub name: String,
    pub description: String,
    pub display_order: i32,
}

/// Category creation request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewFaqCategory {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub display_order: i32,
}

impl NewFaqCategory {
    pub fn validate(&self) -> FieldErrors {
        let mut errors = FieldErrors::new();
        require_text(&mut errors, "name", &self.name, MAX_CATEGORY_NAME_LEN);
        errors
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FaqCategoryUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub display_order: Option<i32>,
}

impl FaqCategoryUpdate {
    pub fn validate(&self) -> FieldErrors {
        let mut errors = FieldErrors::new();
        if let Some(name) = &self.name {
            require_text(&mut errors, "name", name, MAX_CATEGORY_NAME_LEN);
        }
        errors
    }
}

/// A question and its answer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FaqEntry {
    pub id: EntryId,
    pub category_id: CategoryId,
    pub question: String,
    pub answer: String,
    pub display_order: i32,
    /// Inactive entries are only shown to administrators
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewFaqEntry {
    pub category_id: CategoryId,
    pub question: String,
    pub answer: String,
    #[serde(default)]
    pub display_order: i32,
    #[serde(default = "active_by_default")]
    pub is_active: bool,
}

fn active_by_default() -> bool {
    true
}

impl NewFaqEntry {
    pub fn validate(&self) -> FieldErrors {
        let mut errors = FieldErrors::new();
        require_text(&mut errors, "question", &self.question, MAX_QUESTION_LEN);
        if self.answer.trim().is_empty() {
            errors.add("answer", "This field may not be blank.");
        }
        errors
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FaqEntryUpdate {
    pub category_id: Option<CategoryId>,
    pub question: Option<String>,
    pub answer: Option<String>,
    pub display_order: Option<i32>,
    pub is_active: Option<bool>,
}

impl FaqEntryUpdate {
    pub fn validate(&self) -> FieldErrors {
        let mut errors = FieldErrors::new();
        if let Some(question) = &self.question {
            require_text(&mut errors, "question", question, MAX_QUESTION_LEN);
        }
        if self.answer.as_deref().is_some_and(|a| a.trim().is_empty()) {
            errors.add("answer", "This field may not be blank.");
        }
        errors
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FaqEntryFilter {
    pub category_id: Option<CategoryId>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_defaults_to_active() {
        let entry: NewFaqEntry = serde_json::from_value(serde_json::json!({
            "category_id": 1,
            "question": "How do I register?",
            "answer": "Open the tournament page and press Register."
        }))
        .unwrap();
        assert!(entry.is_active);
        assert_eq!(entry.display_order, 0);
        assert!(entry.validate().is_empty());
    }

    #[test]
    fn test_question_length_is_bounded() {
        let entry = NewFaqEntry {
            category_id: 1,
            question: "?".repeat(MAX_QUESTION_LEN + 1),
            answer: "Yes.".to_string(),
            display_order: 0,
            is_active: true,
        };
        let errors = entry.validate();
        assert!(errors.contains("question"));
        assert!(!errors.contains("answer"));
    }

    #[test]
    fn test_blank_answer_in_update() {
        let update = FaqEntryUpdate {
            answer: Some("  ".to_string()),
            ..Default::default()
        };
        assert!(update.validate().contains("answer"));
        assert!(FaqEntryUpdate::default().validate().is_empty());
    }

    #[test]
    fn test_category_requires_name() {
        let category = NewFaqCategory {
            name: String::new(),
            description: String::new(),
            display_order: 3,
        };
        assert!(category.validate().contains("name"));
    }
}
