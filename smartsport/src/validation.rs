//! Field-level validation errors.
//!
//! Every write operation collects its problems into a [`FieldErrors`] map keyed
//! by the offending request field, so the HTTP layer can answer `400` with one
//! message list per field.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Validation failures keyed by field name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// A single failure on `field`.
    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.entry(field.into()).or_default().push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    /// Messages recorded for `field`.
    pub fn messages(&self, field: &str) -> &[String] {
        self.0.get(field).map(Vec::as_slice).unwrap_or_default()
    }

    /// `Ok(())` when nothing was recorded.
    pub fn into_result(self) -> Result<(), FieldErrors> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, messages) in &self.0 {
            for message in messages {
                if !first {
                    f.write_str("; ")?;
                }
                write!(f, "{field}: {message}")?;
                first = false;
            }
        }
        Ok(())
    }
}

impl std::error::Error for FieldErrors {}

/// Message for a reference to a row that does not exist.
pub const INVALID_REFERENCE: &str = "Invalid pk - object does not exist.";

/// Record an error when a required text field is blank.
pub(crate) fn require_text(errors: &mut FieldErrors, field: &str, value: &str, max_len: usize) {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        errors.add(field, "This field may not be blank.");
    } else if trimmed.chars().count() > max_len {
        errors.add(field, format!("Ensure this field has no more than {max_len} characters."));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_errors_are_ok() {
        assert!(FieldErrors::new().into_result().is_ok());
    }

    #[test]
    fn test_messages_accumulate_per_field() {
        let mut errors = FieldErrors::new();
        errors.add("email", "Enter a valid email address.");
        errors.add("email", "This email is already in use.");
        errors.add("username", "This field may not be blank.");

        assert_eq!(errors.messages("email").len(), 2);
        assert!(errors.contains("username"));
        assert!(errors.messages("password").is_empty());
    }

    #[test]
    fn test_serializes_as_field_map() {
        let errors = FieldErrors::single("ends_at", "must be after starts_at");
        let json = serde_json::to_value(&errors).unwrap();
        assert_eq!(json, serde_json::json!({ "ends_at": ["must be after starts_at"] }));
    }

    #[test]
    fn test_display_lists_every_message() {
        let mut errors = FieldErrors::new();
        errors.add("a", "first");
        errors.add("b", "second");
        assert_eq!(errors.to_string(), "a: first; b: second");
    }

    #[test]
    fn test_require_text_limits() {
        let mut errors = FieldErrors::new();
        require_text(&mut errors, "name", "   ", 10);
        require_text(&mut errors, "alias", "abcdefghijk", 10);
        require_text(&mut errors, "game", "ok", 10);
        assert!(errors.contains("name"));
        assert!(errors.contains("alias"));
        assert!(!errors.contains("game"));
    }
}
