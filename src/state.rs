use sea_orm::DatabaseConnection;
use std::sync::Arc;

use crate::auth::TokenIssuer;
use crate::config::Settings;
use crate::storage::{FileStorage, LocalFileStorage};
use crate::users::DatabaseTokenIssuer;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub settings: Arc<Settings>,
    pub storage: Arc<dyn FileStorage>,
    pub tokens: Arc<dyn TokenIssuer>,
}

impl AppState {
    /// State with local file storage under `settings.storage.root` and
    /// database-backed tokens.
    #[must_use]
    pub fn new(db: DatabaseConnection, settings: Settings) -> Self {
        let storage = Arc::new(LocalFileStorage::new(settings.storage.root.clone()));
        Self {
            db,
            settings: Arc::new(settings),
            storage,
            tokens: Arc::new(DatabaseTokenIssuer),
        }
    }

    #[must_use]
    pub fn with_storage(mut self, storage: Arc<dyn FileStorage>) -> Self {
        self.storage = storage;
        self
    }

    #[must_use]
    pub fn with_tokens(mut self, tokens: Arc<dyn TokenIssuer>) -> Self {
        self.tokens = tokens;
        self
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("db", &self.db)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}
