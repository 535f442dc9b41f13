use folio_core::prelude::*;
use reqwest::{Client, Response, StatusCode};
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

mod probe;
mod rest;
mod thumbnails;
pub mod videos;

pub use probe::HttpProbe;
pub use rest::RestRecordStore;
pub use thumbnails::{GenerateResponse, ThumbnailServiceClient};
pub use videos::{Video, VideoCatalogClient, to_embed_url};

#[derive(Error, Debug)]
pub enum FolioClientError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Server returned error {0}: {1}")]
    ServerError(StatusCode, String),

    #[error("Validation error: {0}")]
    Validation(String),
}

pub type Result<T> = std::result::Result<T, FolioClientError>;

pub(crate) async fn error_for_status(response: Response) -> Result<Response> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status();
    let text = response.text().await.unwrap_or_default();
    Err(FolioClientError::ServerError(status, text))
}

/// Client for the folio server's public and admin endpoints.
#[derive(Clone)]
pub struct FolioClient {
    base_url: String,
    client: Client,
    token: Option<String>,
}

#[derive(Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
struct LoginResponse {
    token: String,
}

#[derive(Serialize)]
struct PromoteRequest {
    asset_id: AssetId,
    #[serde(skip_serializing_if = "Option::is_none")]
    category: Option<CategoryId>,
}

impl FolioClient {
    pub fn new(base_url: impl Into<String>, token: Option<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: Client::new(),
            token,
        }
    }

    fn auth_request(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        if let Some(token) = &self.token {
            builder.header("Authorization", format!("Bearer {token}"))
        } else {
            builder
        }
    }

    /// Exchanges admin credentials for a session token.
    pub async fn login(&self, email: &str, password: &str) -> Result<String> {
        let url = format!("{}/auth/login", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&LoginRequest { email, password })
            .send()
            .await?;

        let data: LoginResponse = error_for_status(response)
            .await?
            .json()
            .await
            .map_err(|_| FolioClientError::Validation("Failed to parse login response".into()))?;

        Ok(data.token)
    }

    pub async fn upload_file(&self, path: &Path, category: Option<CategoryId>) -> Result<IngestReport> {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| FolioClientError::Validation(format!("Invalid file name: {path:?}")))?
            .to_string();
        let data = tokio::fs::read(path).await?;

        let url = format!("{}/admin/assets", self.base_url);
        let mut query = vec![("name", name)];
        if let Some(category) = category {
            query.push(("category", category.to_string()));
        }
        let response = self
            .auth_request(self.client.post(&url))
            .query(&query)
            .body(data)
            .send()
            .await?;

        Ok(error_for_status(response).await?.json().await?)
    }

    pub async fn list_assets(&self) -> Result<Vec<Asset>> {
        let url = format!("{}/admin/assets", self.base_url);
        let response = self.auth_request(self.client.get(&url)).send().await?;
        Ok(error_for_status(response).await?.json().await?)
    }

    pub async fn delete(&self, id: AssetId) -> Result<DeleteReport> {
        let url = format!("{}/admin/assets/{id}", self.base_url);
        let response = self.auth_request(self.client.delete(&url)).send().await?;
        Ok(error_for_status(response).await?.json().await?)
    }

    pub async fn promote(
        &self,
        asset_id: AssetId,
        role: Role,
        category: Option<CategoryId>,
    ) -> Result<Asset> {
        let url = format!("{}/admin/roles/{role}", self.base_url);
        let response = self
            .auth_request(self.client.put(&url))
            .json(&PromoteRequest { asset_id, category })
            .send()
            .await?;
        Ok(error_for_status(response).await?.json().await?)
    }

    pub async fn holder(
        &self,
        role: Role,
        category: Option<CategoryId>,
        width: Option<u32>,
    ) -> Result<RoleHolder> {
        let url = format!("{}/roles/{role}", self.base_url);
        let mut query = Vec::new();
        if let Some(category) = category {
            query.push(("category", category.to_string()));
        }
        if let Some(width) = width {
            query.push(("width", width.to_string()));
        }
        let response = self.client.get(&url).query(&query).send().await?;
        Ok(error_for_status(response).await?.json().await?)
    }

    pub async fn resolve(&self, id: AssetId, width: Option<u32>, hero: bool) -> Result<ResolvedUrl> {
        let url = format!("{}/assets/{id}/url", self.base_url);
        let mut query = vec![("hero", hero.to_string())];
        if let Some(width) = width {
            query.push(("width", width.to_string()));
        }
        let response = self.client.get(&url).query(&query).send().await?;
        Ok(error_for_status(response).await?.json().await?)
    }

    pub async fn backfill(&self) -> Result<BackfillReport> {
        let url = format!("{}/admin/backfill", self.base_url);
        let response = self.auth_request(self.client.post(&url)).send().await?;
        Ok(error_for_status(response).await?.json().await?)
    }

    pub async fn categories(&self) -> Result<Vec<Category>> {
        let url = format!("{}/admin/categories", self.base_url);
        let response = self.auth_request(self.client.get(&url)).send().await?;
        Ok(error_for_status(response).await?.json().await?)
    }

    pub async fn create_category(&self, category: &NewCategory) -> Result<Category> {
        let url = format!("{}/admin/categories", self.base_url);
        let response = self
            .auth_request(self.client.post(&url))
            .json(category)
            .send()
            .await?;
        Ok(error_for_status(response).await?.json().await?)
    }
}
