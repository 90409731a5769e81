use std::time::Duration;

use anyhow::{Context, Result};
use domain::contract::{
    CreatedSmartLink, CreationPayload, Envelope, SmartLinkLookup, SnapshotResponse,
};
use domain::{CreationError, ShortId, SnapshotError};
use reqwest::{Client, StatusCode};
use tracing::{info, warn};

/// HTTP client for the SmartLink backend.
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn build_url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Short URL served by this backend for a code.
    pub fn short_url(&self, code: &str) -> String {
        self.build_url(&format!("/l/{}", code))
    }

    /// Submit a creation payload. A backend explanation is kept verbatim.
    pub async fn create(
        &self,
        payload: &CreationPayload,
    ) -> Result<CreatedSmartLink, CreationError> {
        let response = self
            .client
            .post(self.build_url("/api/smartlinks"))
            .json(payload)
            .send()
            .await
            .map_err(|e| CreationError::Unknown(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| CreationError::Unknown(e.to_string()))?;

        match serde_json::from_str::<Envelope<CreatedSmartLink>>(&body) {
            Ok(envelope) => envelope.into_result().map_err(|message| match message {
                Some(m) if !m.trim().is_empty() => CreationError::Backend(m),
                _ => CreationError::Unknown(format!(
                    "backend returned status {}",
                    status.as_u16()
                )),
            }),
            Err(e) => {
                warn!(status = status.as_u16(), err = %e, "undecodable creation response");
                Err(CreationError::Unknown(format!(
                    "unexpected response (status {})",
                    status.as_u16()
                )))
            }
        }
    }

    /// Look up a short code. `Ok(None)` means the backend does not know it.
    pub async fn lookup_short_code(
        &self,
        code: &ShortId,
    ) -> Result<Option<SmartLinkLookup>, String> {
        let response = self
            .client
            .get(self.build_url(&format!("/api/short/{}", code.as_str())))
            .send()
            .await
            .map_err(|e| e.to_string())?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(format!("backend returned status {}", status.as_u16()));
        }

        let envelope: Envelope<SmartLinkLookup> = response
            .json()
            .await
            .map_err(|e| format!("invalid lookup response: {}", e))?;
        envelope
            .into_result()
            .map(Some)
            .map_err(|m| m.unwrap_or_else(|| "lookup failed".into()))
    }

    /// Ask the backend to (re)generate the static snapshot; returns its URL.
    pub async fn generate_snapshot(&self, short_id: &str) -> Result<String, SnapshotError> {
        let response = self
            .client
            .post(self.build_url(&format!("/api/snapshots/{}", short_id)))
            .send()
            .await
            .map_err(|e| SnapshotError::Failed(e.to_string()))?;

        let status = response.status();
        let body: SnapshotResponse = response.json().await.map_err(|_| {
            SnapshotError::Failed(format!("backend returned status {}", status.as_u16()))
        })?;

        match (body.success, body.url) {
            (true, Some(url)) => {
                info!(%url, "snapshot ready");
                Ok(url)
            }
            _ => Err(SnapshotError::Failed(body.error.unwrap_or_else(|| {
                format!("backend returned status {}", status.as_u16())
            }))),
        }
    }
}
