//! File attachment collaborator.
//!
//! Mutation handlers only depend on the [`FileStorage`] contract: `save` a submitted
//! file under a destination directory and get back the stored path, or `remove` a
//! previously stored path. [`LocalFileStorage`] keeps files under a root directory on
//! the local filesystem. Both operations are synchronous and block the request.

use axum::body::Bytes;
use std::fmt;
use std::path::{Component, Path, PathBuf};
use uuid::Uuid;

use crate::helpers::slugify;

/// A file received in a multipart request.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    /// Client-supplied file name, if any
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

impl UploadedFile {
    /// Lowercased extension of the client file name
    #[must_use]
    pub fn extension(&self) -> Option<String> {
        self.file_name
            .as_deref()
            .and_then(|name| Path::new(name).extension())
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)
    }

    /// Client file name without its extension
    #[must_use]
    pub fn stem(&self) -> Option<&str> {
        self.file_name
            .as_deref()
            .and_then(|name| Path::new(name).file_stem())
            .and_then(|stem| stem.to_str())
    }
}

/// Failure reported by a [`FileStorage`] implementation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileError {
    message: String,
}

impl FileError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for FileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for FileError {}

impl From<std::io::Error> for FileError {
    fn from(err: std::io::Error) -> Self {
        Self::new(format!("File operation failed: {err}"))
    }
}

/// Storage contract consumed by the mutation handlers.
pub trait FileStorage: Send + Sync {
    /// Persist `file` under `destination`, returning the stored path.
    ///
    /// `field_hint` prefixes the generated file name when given.
    ///
    /// # Errors
    ///
    /// Returns a [`FileError`] when the file cannot be written.
    fn save(
        &self,
        file: &UploadedFile,
        destination: &str,
        field_hint: Option<&str>,
    ) -> Result<String, FileError>;

    /// Remove a previously stored path. Removing a missing file is not an error.
    ///
    /// # Errors
    ///
    /// Returns a [`FileError`] when an existing file cannot be removed.
    fn remove(&self, stored_path: &str) -> Result<(), FileError>;
}

/// Stores files below a root directory.
#[derive(Debug, Clone)]
pub struct LocalFileStorage {
    root: PathBuf,
}

impl LocalFileStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a relative storage path below the root, refusing traversal.
    fn resolve(&self, relative: &str) -> Result<PathBuf, FileError> {
        let relative = Path::new(relative);
        if relative
            .components()
            .any(|component| !matches!(component, Component::Normal(_)))
        {
            return Err(FileError::new(format!(
                "Invalid storage path '{}'",
                relative.display()
            )));
        }
        Ok(self.root.join(relative))
    }
}

impl FileStorage for LocalFileStorage {
    fn save(
        &self,
        file: &UploadedFile,
        destination: &str,
        field_hint: Option<&str>,
    ) -> Result<String, FileError> {
        let directory = self.resolve(destination)?;
        std::fs::create_dir_all(&directory)?;

        let base = field_hint
            .map(slugify)
            .or_else(|| file.stem().map(slugify))
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| "file".to_string());
        let unique = Uuid::new_v4().simple().to_string();
        let file_name = match file.extension() {
            Some(ext) => format!("{base}-{}.{ext}", &unique[..12]),
            None => format!("{base}-{}", &unique[..12]),
        };

        std::fs::write(directory.join(&file_name), &file.bytes)?;
        let stored = format!("{}/{file_name}", destination.trim_end_matches('/'));
        tracing::debug!(path = %stored, size = file.bytes.len(), "Stored file");
        Ok(stored)
    }

    fn remove(&self, stored_path: &str) -> Result<(), FileError> {
        let path = self.resolve(stored_path)?;
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn png(name: &str) -> UploadedFile {
        UploadedFile {
            file_name: Some(name.to_string()),
            content_type: Some("image/png".to_string()),
            bytes: Bytes::from_static(b"\x89PNG"),
        }
    }

    #[test]
    fn test_save_and_remove_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalFileStorage::new(dir.path());

        let stored = storage.save(&png("Me.PNG"), "users/1", Some("user_img")).unwrap();
        assert!(stored.starts_with("users/1/user_img-"));
        assert!(stored.ends_with(".png"));
        assert!(dir.path().join(&stored).exists());

        storage.remove(&stored).unwrap();
        assert!(!dir.path().join(&stored).exists());
    }

    #[test]
    fn test_save_without_hint_uses_slugged_stem() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalFileStorage::new(dir.path());

        let stored = storage.save(&png("Holiday Photo.png"), "users/2", None).unwrap();
        assert!(stored.starts_with("users/2/holiday-photo-"));
    }

    #[test]
    fn test_accented_names_keep_their_letters() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalFileStorage::new(dir.path());

        let stored = storage.save(&png("Élan.png"), "users/3", None).unwrap();
        assert!(stored.starts_with("users/3/elan-"));
        assert!(stored.ends_with(".png"));
    }

    #[test]
    fn test_remove_missing_file_is_ok() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalFileStorage::new(dir.path());
        assert!(storage.remove("users/9/nothing.png").is_ok());
    }

    #[test]
    fn test_traversal_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalFileStorage::new(dir.path());
        assert!(storage.save(&png("a.png"), "../outside", None).is_err());
        assert!(storage.remove("/etc/passwd").is_err());
    }

    #[test]
    fn test_extension_is_lowercased() {
        assert_eq!(png("photo.JPeG").extension().as_deref(), Some("jpeg"));
        assert_eq!(png("noext").extension(), None);
    }
}
