//! Configuration management using Figment
//!
//! Settings are layered, later sources overriding earlier ones:
//!
//! 1. Built-in defaults
//! 2. A TOML file (optional; missing files are skipped)
//! 3. `RESOURCECRATE_`-prefixed environment variables, with `__` separating
//!    sections, e.g. `RESOURCECRATE_LISTING__TAKE=50`

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use sea_orm::{Database, DatabaseConnection, DbErr};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::filtering::ListDefaults;

const ENV_PREFIX: &str = "RESOURCECRATE_";
const DEFAULT_CONFIG_FILE: &str = "resourcecrate.toml";

/// Where uploaded files are kept
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    pub root: PathBuf,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            root: PathBuf::from("storage"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    pub url: String,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            url: "sqlite::memory:".to_string(),
        }
    }
}

/// Application settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub listing: ListDefaults,
    pub storage: StorageSettings,
    pub database: DatabaseSettings,
}

impl Settings {
    /// Layered provider for `path`
    #[must_use]
    pub fn figment(path: &Path) -> Figment {
        Figment::new()
            .merge(Serialized::defaults(Self::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Load from `resourcecrate.toml` in the working directory and the environment.
    ///
    /// # Errors
    ///
    /// Returns a [`figment::Error`] when a source holds invalid values.
    pub fn load() -> Result<Self, figment::Error> {
        Self::load_from(DEFAULT_CONFIG_FILE)
    }

    /// Load from a specific TOML file and the environment.
    ///
    /// # Errors
    ///
    /// Returns a [`figment::Error`] when a source holds invalid values.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, figment::Error> {
        let path = path.as_ref();
        tracing::debug!(path = %path.display(), "Loading settings");
        Self::figment(path).extract()
    }

    /// Connect to the configured database.
    ///
    /// # Errors
    ///
    /// Returns a [`DbErr`] when the connection cannot be established.
    pub async fn connect(&self) -> Result<DatabaseConnection, DbErr> {
        Database::connect(self.database.url.as_str()).await
    }
}
