//! # Error Handling for Resource APIs
//!
//! A single [`ApiError`] type that:
//! - Returns appropriate HTTP status codes
//! - Sends sanitized, user-facing messages with optional field-scoped errors
//! - Logs internal details through `tracing` without exposing them to clients
//!
//! Every error renders as JSON:
//!
//! ```json
//! {"message": "The given data was invalid.", "errors": {"email": ["The email field is required."]}}
//! ```
//!
//! `errors` is only present for field-scoped failures (validation, authorization on a
//! field, file attachment).

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use sea_orm::{DbErr, SqlErr};
use serde::Serialize;
use std::fmt;
use utoipa::ToSchema;

use crate::helpers::ucfirst;
use crate::storage::FileError;
use crate::validation::ValidationErrors;

/// API error type with automatic logging and sanitized responses
#[derive(Debug)]
pub enum ApiError {
    /// 404 Not Found - Resource doesn't exist
    NotFound {
        /// Resource name (e.g., "user")
        resource: String,
        /// Optional identifier that wasn't found
        id: Option<String>,
    },

    /// 400 Bad Request - Invalid input from user
    BadRequest { message: String },

    /// 403 Forbidden - Caller lacks the privilege for this change
    Forbidden {
        message: String,
        /// Field-scoped reasons, if the refusal concerns specific fields
        errors: Option<ValidationErrors>,
    },

    /// 409 Conflict - Resource conflict (e.g., duplicate key)
    Conflict { message: String },

    /// 422 Unprocessable Entity - Validation failed
    ValidationFailed { errors: ValidationErrors },

    /// 400 Bad Request - The file attachment collaborator failed
    FileOperation {
        /// Field the file was submitted under
        field: String,
        /// Collaborator error
        source: FileError,
    },

    /// 500 Internal Server Error - Database error (details logged, not exposed)
    Database { message: String, internal: DbErr },

    /// 500 Internal Server Error - Generic internal error
    Internal {
        message: String,
        internal: Option<String>,
    },
}

impl ApiError {
    pub fn not_found(resource: impl Into<String>, id: Option<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
            id,
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest {
            message: message.into(),
        }
    }

    /// 403 scoped to a single field
    ///
    /// # Example
    /// ```rust,ignore
    /// return Err(ApiError::forbidden_field("role_id", "You do not have permission to modify this user."));
    /// ```
    pub fn forbidden_field(field: impl Into<String>, message: impl Into<String>) -> Self {
        let message = message.into();
        Self::Forbidden {
            errors: Some(ValidationErrors::single(field, message.clone())),
            message,
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn validation_failed(errors: ValidationErrors) -> Self {
        Self::ValidationFailed { errors }
    }

    pub fn file_operation(field: impl Into<String>, source: FileError) -> Self {
        Self::FileOperation {
            field: field.into(),
            source,
        }
    }

    /// Create a 500 Internal Server Error from a database error
    ///
    /// The database error details are logged but NOT sent to the user.
    #[must_use]
    pub fn database(err: DbErr) -> Self {
        Self::Database {
            message: "A database error occurred".to_string(),
            internal: err,
        }
    }

    pub fn internal(message: impl Into<String>, internal: Option<String>) -> Self {
        Self::Internal {
            message: message.into(),
            internal,
        }
    }

    /// Get the HTTP status code for this error
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::BadRequest { .. } | Self::FileOperation { .. } => StatusCode::BAD_REQUEST,
            Self::Forbidden { .. } => StatusCode::FORBIDDEN,
            Self::Conflict { .. } => StatusCode::CONFLICT,
            Self::ValidationFailed { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Database { .. } | Self::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the user-facing error message (sanitized)
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::NotFound { resource, id } => match id {
                Some(id) => format!("{} with ID '{id}' not found", ucfirst(resource)),
                None => format!("{} not found", ucfirst(resource)),
            },
            Self::ValidationFailed { .. } => "The given data was invalid.".to_string(),
            Self::FileOperation { source, .. } => source.to_string(),
            Self::BadRequest { message }
            | Self::Forbidden { message, .. }
            | Self::Conflict { message }
            | Self::Database { message, .. }
            | Self::Internal { message, .. } => message.clone(),
        }
    }

    /// Field-scoped errors carried in the response body, if any
    #[must_use]
    pub fn field_errors(&self) -> Option<ValidationErrors> {
        match self {
            Self::ValidationFailed { errors } => Some(errors.clone()),
            Self::Forbidden { errors, .. } => errors.clone(),
            Self::FileOperation { field, source } => {
                Some(ValidationErrors::single(field.clone(), source.to_string()))
            }
            _ => None,
        }
    }

    fn log_internal(&self) {
        match self {
            Self::Database { internal, .. } => {
                tracing::error!(error = ?internal, "Database error occurred");
            }
            Self::Internal {
                internal: Some(details),
                ..
            } => {
                tracing::error!(details = %details, "Internal error occurred");
            }
            Self::FileOperation { field, source } => {
                tracing::warn!(field = %field, error = %source, "File operation failed");
            }
            _ => {
                tracing::debug!(
                    error = %self.user_message(),
                    status = %self.status_code(),
                    "API error"
                );
            }
        }
    }
}

/// Error response sent to users (sanitized)
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Error message
    pub message: String,
    /// Messages grouped by field
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub errors: Option<ValidationErrors>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        self.log_internal();

        let status = self.status_code();
        let body = ErrorResponse {
            message: self.user_message(),
            errors: self.field_errors(),
        };

        (status, Json(body)).into_response()
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.user_message())
    }
}

impl std::error::Error for ApiError {}

/// Convert SeaORM `DbErr` to `ApiError`
///
/// - `DbErr::RecordNotFound` → 404 Not Found
/// - unique constraint violations → 409 Conflict
/// - everything else → 500 (logged internally, sanitized for users)
impl From<DbErr> for ApiError {
    fn from(err: DbErr) -> Self {
        if let DbErr::RecordNotFound(msg) = &err {
            let resource = msg.split_whitespace().next().unwrap_or("Resource");
            return Self::not_found(resource, None);
        }
        if let Some(SqlErr::UniqueConstraintViolation(detail)) = err.sql_err() {
            tracing::debug!(detail = %detail, "Unique constraint violation");
            return Self::conflict("A record with the same unique value already exists");
        }
        Self::database(err)
    }
}

impl From<ValidationErrors> for ApiError {
    fn from(errors: ValidationErrors) -> Self {
        Self::validation_failed(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_with_id() {
        let err = ApiError::not_found("user", Some("123".to_string()));
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(err.user_message(), "User with ID '123' not found");
        assert!(err.field_errors().is_none());
    }

    #[test]
    fn test_not_found_without_id() {
        let err = ApiError::not_found("user", None);
        assert_eq!(err.user_message(), "User not found");
    }

    #[test]
    fn test_forbidden_field_carries_errors() {
        let err = ApiError::forbidden_field("role_id", "Insufficient permissions");
        assert_eq!(err.status_code(), StatusCode::FORBIDDEN);
        let errors = err.field_errors().expect("field errors");
        assert_eq!(errors.get("role_id"), Some(&["Insufficient permissions".to_string()][..]));
    }

    #[test]
    fn test_validation_failed() {
        let err: ApiError = ValidationErrors::single("email", "The email field is required.").into();
        assert_eq!(err.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(err.user_message(), "The given data was invalid.");
        assert!(err.field_errors().is_some());
    }

    #[test]
    fn test_file_operation_is_bad_request_scoped_to_field() {
        let err = ApiError::file_operation("img_url", FileError::new("disk full"));
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        let errors = err.field_errors().expect("field errors");
        assert_eq!(errors.get("img_url"), Some(&["disk full".to_string()][..]));
    }

    #[test]
    fn test_dberr_record_not_found_becomes_404() {
        let api_err: ApiError = DbErr::RecordNotFound("user not found".to_string()).into();
        assert_eq!(api_err.status_code(), StatusCode::NOT_FOUND);
        assert!(api_err.user_message().contains("not found"));
    }

    #[test]
    fn test_all_other_dberr_become_500() {
        let test_cases = vec![
            DbErr::Custom("Any custom error".to_string()),
            DbErr::Type("Type error".to_string()),
            DbErr::Json("JSON error".to_string()),
        ];

        for db_err in test_cases {
            let api_err: ApiError = db_err.into();
            assert_eq!(api_err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
            assert_eq!(api_err.user_message(), "A database error occurred");
        }
    }

    #[test]
    fn test_display_trait() {
        let err = ApiError::bad_request("Test error");
        assert_eq!(format!("{err}"), "Test error");
    }

    #[test]
    fn test_all_status_codes() {
        let test_cases = vec![
            (ApiError::not_found("Test", None), StatusCode::NOT_FOUND),
            (ApiError::bad_request("Test"), StatusCode::BAD_REQUEST),
            (ApiError::forbidden_field("f", "Test"), StatusCode::FORBIDDEN),
            (ApiError::conflict("Test"), StatusCode::CONFLICT),
            (
                ApiError::validation_failed(ValidationErrors::single("f", "Test")),
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (
                ApiError::database(DbErr::Custom("Test".to_string())),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (ApiError::internal("Test", None), StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (err, expected_status) in test_cases {
            assert_eq!(err.status_code(), expected_status);
        }
    }
}
