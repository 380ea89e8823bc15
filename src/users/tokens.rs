use async_trait::async_trait;
use sea_orm::{ActiveModelTrait, ActiveValue::Set, DatabaseConnection};
use uuid::Uuid;

use super::access_token;
use crate::auth::{TokenIssuer, digest_token};
use crate::errors::ApiError;

/// Name recorded on tokens issued at registration
pub const REGISTRATION_TOKEN_NAME: &str = "auth_token";

/// Stores a SHA-256 digest of each issued secret in `access_tokens`.
///
/// The plain-text token is `<token id>|<secret>` and is only returned once.
#[derive(Debug, Clone, Copy, Default)]
pub struct DatabaseTokenIssuer;

#[async_trait]
impl TokenIssuer for DatabaseTokenIssuer {
    async fn issue(&self, db: &DatabaseConnection, user_id: i32) -> Result<String, ApiError> {
        let secret = Uuid::new_v4().simple().to_string();
        let token = access_token::ActiveModel {
            user_id: Set(user_id),
            name: Set(REGISTRATION_TOKEN_NAME.to_string()),
            token: Set(digest_token(&secret)),
            ..Default::default()
        }
        .insert(db)
        .await?;

        tracing::debug!(user_id, token_id = token.id, "Issued access token");
        Ok(format!("{}|{secret}", token.id))
    }
}
