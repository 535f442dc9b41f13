//! # Folio FileSystem Storage
//!
//! A local filesystem bucket for Folio.
//!
//! This crate implements the [`StorageBackend`] trait, storing originals
//! and derived variants directly in a directory per bucket.
//!
//! ## Features
//!
//! * **Atomic Writes**: Each write goes to its own temporary file in the target directory and is renamed into place, so a variant is never served half-written.
//!
//! ## Usage
//!
//! ```no_run
//! use folio_fs::FileSystemStorage;
//!
//! let originals = FileSystemStorage::new("./folio_data/photos-original", "http://localhost:3000/files/photos-original");
//! ```

use bytes::Bytes;
use folio_core::prelude::*;
use std::io::Write;
use std::path::{Component, Path, PathBuf};
use tokio::fs;
use tracing::debug;

/// Prefix of in-flight temp files. `list` never reports them.
const TEMP_PREFIX: &str = ".folio-upload-";

async fn atomic_write(path: &Path, data: Bytes) -> Result<(), StorageError> {
    let parent = path
        .parent()
        .ok_or_else(|| StorageError::Generic(format!("No parent directory for {}", path.display())))?
        .to_path_buf();
    fs::create_dir_all(&parent).await.map_err(StorageError::Io)?;

    let target = path.to_path_buf();
    tokio::task::spawn_blocking(move || -> Result<(), StorageError> {
        let mut tmp = tempfile::Builder::new()
            .prefix(TEMP_PREFIX)
            .tempfile_in(&parent)?;
        tmp.write_all(&data)?;
        tmp.persist(&target).map_err(|e| StorageError::Io(e.error))?;
        Ok(())
    })
    .await
    .map_err(|e| StorageError::Generic(format!("Write task failed: {e}")))?
}

#[derive(Clone)]
pub struct FileSystemStorage {
    root: PathBuf,
    public_base: String,
}

impl FileSystemStorage {
    pub fn new(path: impl Into<PathBuf>, public_base: impl Into<String>) -> Self {
        Self {
            root: path.into(),
            public_base: public_base.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn get_path(&self, key: &str) -> Result<PathBuf, StorageError> {
        let relative = Path::new(key);
        if relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)))
        {
            return Err(StorageError::Generic(format!("Invalid object key: {key}")));
        }
        Ok(self.root.join(relative))
    }
}

impl StorageBackend for FileSystemStorage {
    async fn upload(&self, key: &str, data: Bytes, overwrite: bool) -> Result<(), StorageError> {
        let path = self.get_path(key)?;
        if !overwrite && fs::try_exists(&path).await? {
            return Err(StorageError::AlreadyExists(key.to_string()));
        }
        atomic_write(&path, data).await?;
        debug!("Wrote {}", path.display());
        Ok(())
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
        let prefix = prefix.trim_matches('/');
        let dir = if prefix.is_empty() {
            self.root.clone()
        } else {
            self.get_path(prefix)?
        };

        let mut entries = match fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StorageError::Io(e)),
        };

        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().to_string();
            if !name.starts_with(TEMP_PREFIX) {
                names.push(name);
            }
        }
        names.sort();
        Ok(names)
    }

    async fn remove(&self, keys: &[String]) -> Result<(), StorageError> {
        for key in keys {
            let path = self.get_path(key)?;
            match fs::remove_file(&path).await {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(StorageError::Io(e)),
            }
        }
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool, StorageError> {
        Ok(fs::try_exists(self.get_path(key)?).await?)
    }

    async fn read(&self, key: &str) -> Result<Bytes, StorageError> {
        let path = self.get_path(key)?;
        match fs::read(&path).await {
            Ok(data) => Ok(Bytes::from(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(key.to_string()))
            }
            Err(e) => Err(StorageError::Io(e)),
        }
    }

    fn public_url(&self, key: &str) -> String {
        format!("{}/{key}", self.public_base)
    }
}
