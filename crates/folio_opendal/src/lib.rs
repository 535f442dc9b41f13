use bytes::Bytes;
use folio_core::prelude::*;
use opendal::{EntryMode, ErrorKind, Operator};
use tracing::{debug, error, instrument};

fn backend_err(e: opendal::Error) -> StorageError {
    StorageError::Generic(format!("OpenDAL Error: {e}"))
}

#[derive(Clone)]
pub struct OpendalStorage {
    op: Operator,
    public_base: String,
}

impl OpendalStorage {
    /// Create a new storage from an OpenDAL Operator rooted at the bucket.
    /// The Operator can be configured for any supported backend e.g., s3, fs, gcs, etc.
    ///
    /// `public_base` is prepended to keys to build public URLs,
    /// e.g. `https://xyz.supabase.co/storage/v1/object/public/photos-derived`.
    pub fn new(op: Operator, public_base: impl Into<String>) -> Self {
        Self {
            op,
            public_base: public_base.into().trim_end_matches('/').to_string(),
        }
    }
}

impl StorageBackend for OpendalStorage {
    #[instrument(skip(self, data), fields(size = data.len()))]
    async fn upload(&self, key: &str, data: Bytes, overwrite: bool) -> Result<(), StorageError> {
        if !overwrite && self.op.exists(key).await.map_err(backend_err)? {
            return Err(StorageError::AlreadyExists(key.to_string()));
        }

        let mime = mime_guess::from_path(key).first_or_octet_stream();
        self.op
            .write_with(key, data)
            .content_type(mime.as_ref())
            .await
            .map_err(|e| {
                error!("Failed to upload object: {e}");
                backend_err(e)
            })?;

        debug!("Upload successful");
        Ok(())
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
        let dir = match prefix.trim_matches('/') {
            "" => "/".to_string(),
            p => format!("{p}/"),
        };

        let entries = match self.op.list(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(backend_err(e)),
        };

        let mut names: Vec<String> = entries
            .into_iter()
            .filter(|entry| entry.metadata().mode() == EntryMode::FILE)
            .map(|entry| entry.name().to_string())
            .collect();
        names.sort();
        Ok(names)
    }

    #[instrument(skip(self))]
    async fn remove(&self, keys: &[String]) -> Result<(), StorageError> {
        for key in keys {
            self.op.delete(key).await.map_err(|e| {
                error!("Failed to delete {key}: {e}");
                backend_err(e)
            })?;
        }
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool, StorageError> {
        self.op.exists(key).await.map_err(backend_err)
    }

    async fn read(&self, key: &str) -> Result<Bytes, StorageError> {
        match self.op.read(key).await {
            Ok(buffer) => Ok(buffer.to_bytes()),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(StorageError::NotFound(key.to_string())),
            Err(e) => Err(backend_err(e)),
        }
    }

    fn public_url(&self, key: &str) -> String {
        format!("{}/{key}", self.public_base)
    }
}
