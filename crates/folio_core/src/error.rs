use thiserror::Error;

use crate::model::{AssetId, CategoryId};

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("Object already exists: {0}")]
    AlreadyExists(String),

    #[error("Storage backend error: {0}")]
    Generic(String),
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Record serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Record store error: {0}")]
    Generic(String),
}

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Invalid token")]
    InvalidToken,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Insufficient permissions: {0}")]
    Forbidden(String),

    #[error("Authentication provider error: {0}")]
    Generic(String),
}

#[derive(Error, Debug)]
pub enum ThumbnailError {
    #[error("Thumbnail service unreachable: {0}")]
    Transport(String),

    #[error("Thumbnail service returned non-JSON (status {0})")]
    MalformedResponse(u16),

    #[error("Thumbnail service failed: {0}")]
    Rejected(String),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required environment variable `{0}`")]
    Missing(&'static str),

    #[error("Invalid value for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

/// Errors surfaced by library and role operations.
#[derive(Error, Debug)]
pub enum FolioError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Thumbnail(#[from] ThumbnailError),

    #[error("Asset not found: {0}")]
    AssetNotFound(AssetId),

    #[error("Category not found: {0}")]
    CategoryNotFound(CategoryId),

    #[error("Unknown category '{0}'")]
    UnknownCategory(String),

    #[error("Invalid scope: {0}")]
    InvalidScope(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}
