use folio_core::prelude::*;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

/// Confirms a derived variant with a single `HEAD` request on its public URL.
#[derive(Clone)]
pub struct HttpProbe {
    client: Client,
}

impl HttpProbe {
    pub fn new(timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();
        Self { client }
    }
}

impl ExistenceProbe for HttpProbe {
    async fn probe(&self, candidate: &Candidate) -> Result<bool, StorageError> {
        let response = self
            .client
            .head(&candidate.url)
            .send()
            .await
            .map_err(|e| StorageError::Generic(format!("HEAD {} failed: {e}", candidate.url)))?;

        debug!(status = %response.status(), "Probed {}", candidate.key);
        Ok(response.status().is_success())
    }
}
