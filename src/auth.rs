//! Caller identity and credentials.
//!
//! Authentication itself happens upstream: a middleware that has identified the
//! caller inserts a [`CurrentCaller`] into the request extensions. Handlers only
//! read it, resolve the caller's privilege level and compare it with the target's.

use async_trait::async_trait;
use axum::{extract::FromRequestParts, http::request::Parts};
use sea_orm::{ConnectionTrait, DatabaseConnection, EntityTrait};
use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use sha2::{Digest, Sha256};
use std::convert::Infallible;

use crate::errors::ApiError;
use crate::users::{role, user};

pub use crate::users::role::LEAST_PRIVILEGED_LEVEL;

/// The authenticated caller, if any.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CurrentCaller {
    pub user_id: Option<i32>,
}

impl CurrentCaller {
    #[must_use]
    pub fn user(user_id: i32) -> Self {
        Self {
            user_id: Some(user_id),
        }
    }

    #[must_use]
    pub fn anonymous() -> Self {
        Self::default()
    }
}

impl<S> FromRequestParts<S> for CurrentCaller
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts.extensions.get::<Self>().copied().unwrap_or_default())
    }
}

/// Level of a role, or the least privileged level when there is none.
///
/// # Errors
///
/// Propagates database errors.
pub async fn role_level<C: ConnectionTrait>(db: &C, role_id: Option<i32>) -> Result<i32, ApiError> {
    let Some(role_id) = role_id else {
        return Ok(LEAST_PRIVILEGED_LEVEL);
    };
    Ok(role::Entity::find_by_id(role_id)
        .one(db)
        .await?
        .map_or(LEAST_PRIVILEGED_LEVEL, |role| role.level))
}

/// Level of the caller's role; unknown or anonymous callers get the least
/// privileged level.
///
/// # Errors
///
/// Propagates database errors.
pub async fn caller_level<C: ConnectionTrait>(db: &C, caller: &CurrentCaller) -> Result<i32, ApiError> {
    let Some(user_id) = caller.user_id else {
        return Ok(LEAST_PRIVILEGED_LEVEL);
    };
    let role_id = user::Entity::find_by_id(user_id)
        .one(db)
        .await?
        .and_then(|user| user.role_id);
    role_level(db, role_id).await
}

/// A caller may only modify users at their own level or below.
///
/// # Errors
///
/// Returns a 403 scoped to `role_id` when `caller_level > target_level`.
pub fn ensure_can_modify(caller_level: i32, target_level: i32) -> Result<(), ApiError> {
    if caller_level > target_level {
        tracing::debug!(caller_level, target_level, "Refusing to modify a more privileged user");
        return Err(ApiError::forbidden_field(
            "role_id",
            "You do not have permission to modify this user.",
        ));
    }
    Ok(())
}

/// A caller may not hand out a role more privileged than their own.
///
/// # Errors
///
/// Returns a 403 scoped to `role_id` when `role_level < caller_level`.
pub fn ensure_can_assign(caller_level: i32, role_level: i32) -> Result<(), ApiError> {
    if role_level < caller_level {
        tracing::debug!(caller_level, role_level, "Refusing to assign a more privileged role");
        return Err(ApiError::forbidden_field(
            "role_id",
            "You do not have permission to assign this role.",
        ));
    }
    Ok(())
}

/// Issues access tokens for newly registered users.
#[async_trait]
pub trait TokenIssuer: Send + Sync {
    /// Create a token for `user_id` and return its plain-text value.
    async fn issue(&self, db: &DatabaseConnection, user_id: i32) -> Result<String, ApiError>;
}

/// Hex SHA-256 of an access-token secret, as stored in `access_tokens.token`.
#[must_use]
pub fn digest_token(secret: &str) -> String {
    hex::encode(Sha256::digest(secret.as_bytes()))
}

/// Argon2id hash of `password` in PHC string format.
///
/// # Errors
///
/// Returns an internal error when hashing fails.
pub fn hash_password(password: &str) -> Result<String, ApiError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|err| ApiError::internal("Failed to hash password", Some(err.to_string())))
}

/// Check `password` against a PHC hash produced by [`hash_password`].
#[must_use]
pub fn verify_password(password: &str, stored: &str) -> bool {
    PasswordHash::new(stored).is_ok_and(|hash| {
        Argon2::default()
            .verify_password(password.as_bytes(), &hash)
            .is_ok()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn test_privilege_check() {
        let err = ensure_can_modify(10, 5).unwrap_err();
        assert_eq!(err.status_code(), StatusCode::FORBIDDEN);
        assert!(err.field_errors().unwrap().get("role_id").is_some());

        assert!(ensure_can_modify(5, 5).is_ok());
        assert!(ensure_can_modify(1, 5).is_ok());
        assert!(ensure_can_modify(LEAST_PRIVILEGED_LEVEL, LEAST_PRIVILEGED_LEVEL).is_ok());
    }

    #[test]
    fn test_role_assignment_check() {
        assert!(ensure_can_assign(5, 1).is_err());
        assert!(ensure_can_assign(5, 5).is_ok());
        assert!(ensure_can_assign(5, 200).is_ok());
    }

    #[test]
    fn test_password_hash_is_salted_and_verifiable() {
        let first = hash_password("secret123").unwrap();
        let second = hash_password("secret123").unwrap();
        assert_ne!(first, second);
        assert!(first.starts_with("$argon2id$"));
        assert!(verify_password("secret123", &first));
        assert!(!verify_password("secret124", &first));
        assert!(!verify_password("secret123", "plain"));
        assert!(!verify_password("secret123", "sha256$salt$digest"));
    }

    #[test]
    fn test_token_digest_is_hex_sha256() {
        assert_eq!(
            digest_token("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[tokio::test]
    async fn test_caller_extractor_defaults_to_anonymous() {
        let request = axum::http::Request::builder().body(()).unwrap();
        let (mut parts, ()) = request.into_parts();
        let caller = CurrentCaller::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(caller, CurrentCaller::anonymous());

        parts.extensions.insert(CurrentCaller::user(7));
        let caller = CurrentCaller::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(caller.user_id, Some(7));
    }
}
