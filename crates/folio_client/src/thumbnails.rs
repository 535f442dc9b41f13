use folio_core::prelude::*;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, instrument, warn};

#[derive(Serialize)]
struct GenerateRequest<'a> {
    bucket: &'a str,
    file: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    category: Option<&'a str>,
}

/// A single entry of the legacy `generated` list.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum GeneratedEntry {
    Key(String),
    Object {
        path: Option<String>,
        name: Option<String>,
    },
}

impl GeneratedEntry {
    fn into_key(self) -> Option<String> {
        match self {
            GeneratedEntry::Key(key) => Some(key),
            GeneratedEntry::Object { path, name } => path.or(name),
        }
    }
}

/// Raw `/generate-thumbnails` response. Both historical shapes are accepted.
#[derive(Debug, Default, Deserialize)]
pub struct GenerateResponse {
    #[serde(default)]
    ok: bool,
    error: Option<String>,
    #[serde(default)]
    generated: Option<Vec<GeneratedEntry>>,
    #[serde(default, rename = "generatedPaths")]
    generated_paths: Option<BTreeMap<String, BTreeMap<String, String>>>,
}

impl GenerateResponse {
    /// Collapses the wire shapes into [`GeneratedThumbnails`]. The structured form wins when both are present.
    pub fn normalize(self) -> Result<GeneratedThumbnails, ThumbnailError> {
        if !self.ok {
            return Err(ThumbnailError::Rejected(
                self.error.unwrap_or_else(|| "service reported failure".into()),
            ));
        }

        if let Some(paths) = self.generated_paths {
            let mut manifest = DerivedManifest::default();
            for (size, formats) in paths {
                let Ok(tier) = size.parse::<SizeTier>() else {
                    warn!("Ignoring unknown size '{size}' from thumbnail service");
                    continue;
                };
                for (format, key) in formats {
                    match format.parse::<ImageFormat>() {
                        Ok(format) => manifest.insert(tier, format, key),
                        Err(e) => warn!("Ignoring {key}: {e}"),
                    }
                }
            }
            if !manifest.is_empty() {
                return Ok(GeneratedThumbnails::Structured(manifest));
            }
        }

        let keys: Vec<String> = self
            .generated
            .unwrap_or_default()
            .into_iter()
            .filter_map(GeneratedEntry::into_key)
            .collect();
        if keys.is_empty() {
            Ok(GeneratedThumbnails::Empty)
        } else {
            Ok(GeneratedThumbnails::Flat(keys))
        }
    }
}

#[derive(Serialize)]
struct DeleteJobRequest<'a> {
    path: &'a str,
    derived_paths: &'a [String],
}

#[derive(Deserialize)]
struct DeleteJobResponse {
    #[serde(default)]
    ok: bool,
    error: Option<String>,
}

/// Client for the external thumbnail-generation and delete-job endpoints.
#[derive(Clone)]
pub struct ThumbnailServiceClient {
    base_url: String,
    client: Client,
    token: Option<String>,
}

impl ThumbnailServiceClient {
    pub fn new(base_url: impl Into<String>, token: Option<String>, timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
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
}

fn transport(e: reqwest::Error) -> ThumbnailError {
    ThumbnailError::Transport(e.to_string())
}

impl ThumbnailService for ThumbnailServiceClient {
    #[instrument(skip(self))]
    async fn generate(
        &self,
        bucket: &str,
        file: &str,
        category: Option<&str>,
    ) -> Result<GeneratedThumbnails, ThumbnailError> {
        let url = format!("{}/generate-thumbnails", self.base_url);
        let response = self
            .auth_request(self.client.post(&url))
            .json(&GenerateRequest {
                bucket,
                file,
                category,
            })
            .send()
            .await
            .map_err(transport)?;

        let status = response.status();
        let body = response.bytes().await.map_err(transport)?;
        let parsed: GenerateResponse = serde_json::from_slice(&body)
            .map_err(|_| ThumbnailError::MalformedResponse(status.as_u16()))?;

        if !status.is_success() {
            return Err(ThumbnailError::Rejected(
                parsed
                    .error
                    .unwrap_or_else(|| format!("Thumbnail service failed ({status})")),
            ));
        }

        let generated = parsed.normalize()?;
        debug!(?generated, "Thumbnail service answered");
        Ok(generated)
    }

    #[instrument(skip(self, derived_paths), fields(count = derived_paths.len()))]
    async fn delete_job(&self, path: &str, derived_paths: &[String]) -> Result<(), ThumbnailError> {
        let url = format!("{}/delete-job", self.base_url);
        let response = self
            .auth_request(self.client.post(&url))
            .json(&DeleteJobRequest {
                path,
                derived_paths,
            })
            .send()
            .await
            .map_err(transport)?;

        let status = response.status();
        let body: DeleteJobResponse = response
            .json()
            .await
            .map_err(|_| ThumbnailError::MalformedResponse(status.as_u16()))?;

        if status.is_success() && body.ok {
            Ok(())
        } else {
            Err(ThumbnailError::Rejected(
                body.error
                    .unwrap_or_else(|| format!("Delete job failed ({status})")),
            ))
        }
    }
}
