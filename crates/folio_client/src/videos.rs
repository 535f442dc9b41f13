//! Client for the separately deployed video catalog service.

use crate::{FolioClientError, Result, error_for_status};
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Video {
    pub title: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Deserialize)]
struct VideoListResponse {
    videos: Vec<Video>,
}

/// Normalizes a YouTube watch, shorts or short link to its embed URL.
///
/// Embed URLs pass through unchanged. Anything else is `None`.
pub fn to_embed_url(link: &str) -> Option<String> {
    if link.contains("/embed/") {
        return Some(link.to_string());
    }

    let url = Url::parse(link).ok()?;
    let host = url.host_str()?.to_ascii_lowercase();

    let id = if host == "youtu.be" {
        url.path().trim_start_matches('/').to_string()
    } else if host == "youtube.com" || host.ends_with(".youtube.com") {
        if url.path().starts_with("/watch") {
            url.query_pairs()
                .find(|(k, _)| k == "v")
                .map(|(_, v)| v.into_owned())?
        } else {
            url.path().strip_prefix("/shorts/")?.to_string()
        }
    } else {
        return None;
    };

    let id = id.trim_end_matches('/');
    (!id.is_empty()).then(|| format!("https://www.youtube.com/embed/{id}"))
}

#[derive(Clone)]
pub struct VideoCatalogClient {
    base_url: String,
    client: Client,
}

impl VideoCatalogClient {
    /// `base_url` points at the catalog root, e.g. `https://videos.example.com/api/videos`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: Client::new(),
        }
    }

    /// Catalog URL with `segments` appended, each percent-encoded as one path segment.
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let invalid = || FolioClientError::Validation(format!("Invalid video service URL: {}", self.base_url));
        let mut url = Url::parse(&self.base_url).map_err(|_| invalid())?;
        url.path_segments_mut()
            .map_err(|_| invalid())?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    pub async fn categories(&self) -> Result<Vec<String>> {
        let response = self.client.get(&self.base_url).send().await?;
        Ok(error_for_status(response).await?.json().await?)
    }

    pub async fn list(&self, category: &str) -> Result<Vec<Video>> {
        let response = self.client.get(self.endpoint(&[category])?).send().await?;
        Ok(error_for_status(response).await?.json().await?)
    }

    /// Adds a video after normalizing its link. Returns the category's new video list.
    pub async fn add(&self, category: &str, title: &str, link: &str) -> Result<Vec<Video>> {
        if title.trim().is_empty() {
            return Err(FolioClientError::Validation("Title required".into()));
        }
        let url = to_embed_url(link)
            .ok_or_else(|| FolioClientError::Validation(format!("Invalid YouTube URL: {link}")))?;

        let response = self
            .client
            .post(self.endpoint(&[category])?)
            .json(&Video {
                title: title.trim().to_string(),
                url,
                description: None,
            })
            .send()
            .await?;
        let data: VideoListResponse = error_for_status(response).await?.json().await?;
        Ok(data.videos)
    }

    pub async fn delete(&self, category: &str, index: usize) -> Result<Vec<Video>> {
        let index = index.to_string();
        let response = self
            .client
            .delete(self.endpoint(&[category, &index])?)
            .send()
            .await?;
        let data: VideoListResponse = error_for_status(response).await?.json().await?;
        Ok(data.videos)
    }
}
