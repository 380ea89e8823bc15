use indexmap::IndexMap;
use sea_orm::ConnectionTrait;

use super::validators::{char_len, is_email};
use super::{AlreadyExists, Exists, ValidationError, ValidationErrors};
use crate::errors::ApiError;
use crate::helpers::replace_placeholders;
use crate::input::{FormInput, FormValue};

/// Minimum password length applied by [`Rule::Password`]
pub const PASSWORD_MIN_LENGTH: usize = 8;

/// A single field rule.
#[derive(Debug, Clone)]
pub enum Rule {
    /// Present and not empty
    Required,
    /// Null short-circuits the remaining rules
    Nullable,
    String,
    Email,
    /// Maximum length in characters
    Max(usize),
    /// Equal to another submitted field
    Same(&'static str),
    /// Password policy (minimum length)
    Password,
    /// Uploaded file whose extension is one of the listed ones
    FileTypes(&'static [&'static str]),
    Exists(Exists),
    AlreadyExists(AlreadyExists),
}

/// Rules keyed by field name, checked in insertion order.
pub type RuleSet = IndexMap<String, Vec<Rule>>;

/// Runs a [`RuleSet`] against decoded input.
#[derive(Debug, Clone, Default)]
pub struct Validator {
    rules: RuleSet,
}

fn attribute_name(field: &str) -> String {
    field.replace('_', " ")
}

fn message(template: &str, field: &str, extra: &[&str]) -> String {
    let attribute = attribute_name(field);
    let mut arguments = vec![attribute.as_str()];
    arguments.extend_from_slice(extra);
    replace_placeholders(template, &arguments)
}

fn is_filled(value: Option<&FormValue>) -> bool {
    match value {
        None | Some(FormValue::Null) => false,
        Some(FormValue::Text(text)) => !text.trim().is_empty(),
        Some(FormValue::List(items)) => !items.is_empty(),
        Some(FormValue::File(_)) => true,
    }
}

impl Validator {
    #[must_use]
    pub fn new(rules: RuleSet) -> Self {
        Self { rules }
    }

    #[must_use]
    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    /// Validate `input`, collecting every failing rule per field.
    ///
    /// Absent fields are only checked for [`Rule::Required`]; a null value on a
    /// [`Rule::Nullable`] field skips the remaining rules.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::ValidationFailed`] with all messages, or a database error
    /// raised by an existence rule.
    pub async fn validate<C: ConnectionTrait>(&self, db: &C, input: &FormInput) -> Result<(), ApiError> {
        let mut errors = ValidationErrors::new();

        for (field, rules) in &self.rules {
            let value = input.get(field);
            let required = rules.iter().any(|rule| matches!(rule, Rule::Required));
            let nullable = rules.iter().any(|rule| matches!(rule, Rule::Nullable));

            if !is_filled(value) {
                if required {
                    errors.add(ValidationError::new(
                        field.as_str(),
                        message("The :attribute field is required.", field, &[]),
                    ));
                    continue;
                }
                if value.is_none() || nullable {
                    continue;
                }
            }

            let Some(value) = value else { continue };
            for rule in rules {
                if let Some(failure) = Self::check(db, rule, field, value, input).await? {
                    errors.add(ValidationError::new(field.as_str(), failure));
                }
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            tracing::debug!(fields = errors.len(), "Validation failed");
            Err(ApiError::validation_failed(errors))
        }
    }

    async fn check<C: ConnectionTrait>(
        db: &C,
        rule: &Rule,
        field: &str,
        value: &FormValue,
        input: &FormInput,
    ) -> Result<Option<String>, ApiError> {
        let text = value.as_text();
        let failure = match rule {
            Rule::Required | Rule::Nullable => None,
            Rule::String => text
                .is_none()
                .then(|| message("The :attribute field must be a string.", field, &[])),
            Rule::Email => (!text.is_some_and(is_email)).then(|| {
                message("The :attribute field must be a valid email address.", field, &[])
            }),
            Rule::Max(max) => text.filter(|text| char_len(text) > *max).map(|_| {
                message(
                    "The :attribute field must not be greater than :max characters.",
                    field,
                    &[&max.to_string()],
                )
            }),
            Rule::Same(other) => (text != input.text(other)).then(|| {
                message(
                    "The :attribute field must match :other.",
                    field,
                    &[&attribute_name(other)],
                )
            }),
            Rule::Password => (!text.is_some_and(|text| char_len(text) >= PASSWORD_MIN_LENGTH))
                .then(|| {
                    message(
                        "The :attribute field must be at least :min characters.",
                        field,
                        &[&PASSWORD_MIN_LENGTH.to_string()],
                    )
                }),
            Rule::FileTypes(types) => {
                let allowed = value
                    .as_file()
                    .and_then(crate::storage::UploadedFile::extension)
                    .is_some_and(|ext| types.contains(&ext.as_str()));
                (!allowed).then(|| {
                    message(
                        "The :attribute field must be a file of type: :values.",
                        field,
                        &[&types.join(", ")],
                    )
                })
            }
            Rule::Exists(rule) => {
                let candidates: Vec<&str> = match value {
                    FormValue::Text(text) => vec![text.as_str()],
                    FormValue::List(items) => items.iter().map(String::as_str).collect(),
                    FormValue::Null | FormValue::File(_) => Vec::new(),
                };
                let mut all_exist = !candidates.is_empty();
                for candidate in candidates {
                    if !rule.passes(db, candidate).await? {
                        all_exist = false;
                        break;
                    }
                }
                (!all_exist).then(|| message("The selected :attribute is invalid.", field, &[]))
            }
            Rule::AlreadyExists(rule) => match text {
                Some(text) if !rule.passes(db, field, text).await? => Some(rule.message(text)),
                _ => None,
            },
        };
        Ok(failure)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::Database;

    fn rules(entries: Vec<(&str, Vec<Rule>)>) -> Validator {
        Validator::new(
            entries
                .into_iter()
                .map(|(field, rules)| (field.to_string(), rules))
                .collect(),
        )
    }

    fn failing_fields(result: Result<(), ApiError>) -> Vec<String> {
        match result {
            Err(ApiError::ValidationFailed { errors }) => errors.fields().keys().cloned().collect(),
            Err(other) => panic!("unexpected error {other:?}"),
            Ok(()) => Vec::new(),
        }
    }

    #[tokio::test]
    async fn test_required_and_absent_optional_fields() {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        let validator = rules(vec![
            ("name", vec![Rule::Required, Rule::String]),
            ("phone", vec![Rule::Nullable, Rule::String, Rule::Max(4)]),
        ]);

        let input = FormInput::from_json_slice(br#"{}"#).unwrap();
        assert_eq!(failing_fields(validator.validate(&db, &input).await), vec!["name"]);

        let input = FormInput::from_json_slice(br#"{"name": "Ann", "phone": null}"#).unwrap();
        assert!(validator.validate(&db, &input).await.is_ok());
    }

    #[tokio::test]
    async fn test_max_email_and_same() {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        let validator = rules(vec![
            ("lang", vec![Rule::Nullable, Rule::String, Rule::Max(2)]),
            ("email", vec![Rule::Required, Rule::Email]),
            ("password", vec![Rule::Required, Rule::Same("confirmation"), Rule::Password]),
        ]);

        let input = FormInput::from_json_slice(
            br#"{"lang": "eng", "email": "nope", "password": "short", "confirmation": "other"}"#,
        )
        .unwrap();
        let result = validator.validate(&db, &input).await;
        let Err(ApiError::ValidationFailed { errors }) = result else {
            panic!("expected validation failure");
        };
        assert_eq!(
            errors.get("lang"),
            Some(&["The lang field must not be greater than 2 characters.".to_string()][..])
        );
        assert!(errors.get("email").is_some());
        assert_eq!(errors.get("password").map(<[String]>::len), Some(2));
    }

    #[tokio::test]
    async fn test_file_types() {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        let validator = rules(vec![("img_url", vec![Rule::Nullable, Rule::FileTypes(&["png", "jpg"])])]);

        let mut input = FormInput::new();
        input.insert(
            "img_url",
            FormValue::File(crate::storage::UploadedFile {
                file_name: Some("doc.pdf".to_string()),
                content_type: None,
                bytes: axum::body::Bytes::from_static(b"%PDF"),
            }),
        );
        assert_eq!(failing_fields(validator.validate(&db, &input).await), vec!["img_url"]);

        let mut input = FormInput::new();
        input.insert("img_url", FormValue::Null);
        assert!(validator.validate(&db, &input).await.is_ok());
    }
}
