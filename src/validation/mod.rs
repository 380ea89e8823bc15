//! Validation Support
//!
//! Field-level validation for mutation payloads. A [`RuleSet`] maps field names to
//! ordered [`Rule`] lists; [`Validator::validate`] runs them against a decoded
//! [`FormInput`](crate::input::FormInput) and collects every failure into
//! [`ValidationErrors`], which renders as `{"errors": {"field": ["message", ...]}}`.
//!
//! # Example
//!
//! ```rust,ignore
//! use resourcecrate::validation::{Rule, RuleSet, Validator};
//!
//! let mut rules = RuleSet::new();
//! rules.insert("name".into(), vec![Rule::Required, Rule::String]);
//! rules.insert("lang".into(), vec![Rule::Nullable, Rule::String, Rule::Max(2)]);
//!
//! Validator::new(rules).validate(&db, &input).await?;
//! ```

mod exists;
mod rules;

pub use exists::{AlreadyExists, Exists};
pub use rules::{Rule, RuleSet, Validator};

use indexmap::IndexMap;
use serde::Serialize;
use std::fmt;

/// Validation error with field name and message
#[derive(Debug, Clone, Serialize)]
pub struct ValidationError {
    /// The field that failed validation
    pub field: String,
    /// Human-readable error message
    pub message: String,
}

impl ValidationError {
    /// Create a new validation error
    #[must_use]
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

/// Validation failures grouped by field, in the order fields were checked.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors {
    errors: IndexMap<String, Vec<String>>,
}

impl ValidationErrors {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Errors holding a single message for a single field.
    #[must_use]
    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(ValidationError::new(field, message));
        errors
    }

    pub fn add(&mut self, error: ValidationError) {
        self.errors.entry(error.field).or_default().push(error.message);
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Number of fields with at least one error
    #[must_use]
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// Messages recorded for `field`
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.errors.get(field).map(Vec::as_slice)
    }

    #[must_use]
    pub fn fields(&self) -> &IndexMap<String, Vec<String>> {
        &self.errors
    }

    /// Convert to Result
    ///
    /// # Errors
    ///
    /// Returns `self` when at least one error was recorded.
    pub fn result(self) -> Result<(), Self> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Validation failed with {} error(s):", self.errors.len())?;
        for (field, messages) in &self.errors {
            for message in messages {
                write!(f, "\n  - {field}: {message}")?;
            }
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

/// Helper validators for common patterns
pub mod validators {
    /// Basic email validation: a non-empty local part and a dotted domain.
    #[must_use]
    pub fn is_email(value: &str) -> bool {
        let Some((local, domain)) = value.split_once('@') else {
            return false;
        };
        !local.is_empty()
            && !domain.contains('@')
            && domain.split('.').count() >= 2
            && domain.split('.').all(|part| !part.is_empty())
            && value.len() <= 255
    }

    /// Character length, not byte length.
    #[must_use]
    pub fn char_len(value: &str) -> usize {
        value.chars().count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_creation() {
        let err = ValidationError::new("email", "Invalid email");
        assert_eq!(err.field, "email");
        assert_eq!(err.message, "Invalid email");
    }

    #[test]
    fn test_validation_errors_group_by_field() {
        let mut errors = ValidationErrors::new();
        assert!(errors.is_empty());

        errors.add(ValidationError::new("name", "first"));
        errors.add(ValidationError::new("email", "second"));
        errors.add(ValidationError::new("name", "third"));

        assert_eq!(errors.len(), 2);
        assert_eq!(errors.get("name"), Some(&["first".to_string(), "third".to_string()][..]));
        assert!(errors.result().is_err());
    }

    #[test]
    fn test_validation_errors_serialize_as_map() {
        let errors = ValidationErrors::single("role_id", "nope");
        let json = serde_json::to_value(&errors).unwrap();
        assert_eq!(json, serde_json::json!({"role_id": ["nope"]}));
    }

    #[test]
    fn test_is_email() {
        use validators::is_email;

        assert!(is_email("test@example.com"));
        assert!(!is_email("invalid"));
        assert!(!is_email("@example.com"));
        assert!(!is_email("a@localhost"));
        assert!(!is_email("a@b@c.com"));
        assert!(!is_email("a@example."));
    }
}
