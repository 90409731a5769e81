//! odesli: link resolution client for the music metadata provider.
//!
//! Purpose
//! - Turn one platform URL (or an ISRC/UPC) into track metadata plus the
//!   equivalent link on every platform the provider knows.
//! - Normalize the provider's inconsistent per-platform shapes into a clean
//!   `PlatformId -> URL` map.
//!
//! API
//! - `OdesliClient::resolve(source, user_country)` → `Result<ResolvedTrack, ResolutionError>`
//!
//! Notes
//! - Exactly one request per call. Retrying is left to the operator.
//! - A successful response with no usable link is `NoPlatformsFound`, never
//!   an empty success.

use std::collections::BTreeMap;
use std::time::Duration;

use domain::normalize::{normalize_links_by_platform, normalize_source_url, RawPlatformLink};
use domain::validate::validate;
use domain::{Artwork, InputKind, ResolutionError, ResolvedTrack};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("RESOLVER_ENDPOINT is not set")]
    MissingEndpoint,
    #[error("invalid resolver endpoint: {0}")]
    InvalidEndpoint(String),
    #[error("invalid RESOLVER_TIMEOUT_SECS: {0}")]
    InvalidTimeout(String),
    #[error("failed to build http client: {0}")]
    Build(#[from] reqwest::Error),
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ResolveRequest<'a> {
    source_url: &'a str,
    user_country: &'a str,
}

/// Success body of the provider call.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProviderResponse {
    #[serde(default)]
    title: String,
    #[serde(default, alias = "artistName")]
    artist: String,
    #[serde(default)]
    album: Option<String>,
    #[serde(default, alias = "artworkUrl")]
    artwork: Option<String>,
    #[serde(default)]
    alternative_artworks: Vec<Artwork>,
    #[serde(default)]
    isrc: Option<String>,
    #[serde(default)]
    release_date: Option<String>,
    #[serde(default)]
    source_provider: Option<String>,
    #[serde(default)]
    links_by_platform: BTreeMap<String, RawPlatformLink>,
}

/// Error body; providers use either field.
#[derive(Debug, Default, Deserialize)]
struct ProviderError {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Clone, Debug)]
pub struct OdesliClient {
    http: reqwest::Client,
    endpoint: String,
}

impl OdesliClient {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, ClientError> {
        let endpoint = endpoint.into().trim().to_string();
        if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
            return Err(ClientError::InvalidEndpoint(endpoint));
        }
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { http, endpoint })
    }

    /// Build from `RESOLVER_ENDPOINT` and optional `RESOLVER_TIMEOUT_SECS`.
    pub fn from_env() -> Result<Self, ClientError> {
        let endpoint = std::env::var("RESOLVER_ENDPOINT")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .ok_or(ClientError::MissingEndpoint)?;
        let timeout = match std::env::var("RESOLVER_TIMEOUT_SECS") {
            Ok(v) => parse_timeout(&v)?,
            Err(_) => DEFAULT_TIMEOUT,
        };
        Self::new(endpoint, timeout)
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Resolve one source against the provider. Input that does not pass
    /// `validate` is rejected without a request.
    pub async fn resolve(
        &self,
        source: &str,
        user_country: &str,
    ) -> Result<ResolvedTrack, ResolutionError> {
        let source = validate(source).map_err(|e| {
            warn!(error = %e, "input rejected before resolution");
            ResolutionError::InvalidInput(Some(e.to_string()))
        })?;
        let input_type = source.kind();
        let source_url = normalize_source_url(source.value());
        info!(source = %source_url, country = user_country, "resolving track");

        let resp = self
            .http
            .post(&self.endpoint)
            .json(&ResolveRequest {
                source_url: &source_url,
                user_country,
            })
            .send()
            .await
            .map_err(transport_error)?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            let err = map_status(status.as_u16(), &body);
            warn!(status = status.as_u16(), error = %err, "provider rejected resolution");
            return Err(err);
        }

        let payload: ProviderResponse = resp.json().await.map_err(|e| {
            warn!(error = %e, "undecodable provider payload");
            ResolutionError::Unknown(format!("invalid provider payload: {}", e))
        })?;
        let track = into_resolved(payload, input_type)?;
        info!(
            title = %track.title,
            platforms = track.platform_links.len(),
            "track resolved"
        );
        Ok(track)
    }
}

fn parse_timeout(raw: &str) -> Result<Duration, ClientError> {
    match raw.trim().parse::<u64>() {
        Ok(secs) if secs > 0 => Ok(Duration::from_secs(secs)),
        _ => Err(ClientError::InvalidTimeout(raw.to_string())),
    }
}

fn transport_error(e: reqwest::Error) -> ResolutionError {
    warn!(error = %e, "provider request failed");
    if e.is_timeout() {
        ResolutionError::Unknown("request timed out".into())
    } else {
        ResolutionError::Unknown(e.to_string())
    }
}

fn map_status(status: u16, body: &str) -> ResolutionError {
    match status {
        404 => ResolutionError::NotFound,
        400 => {
            let parsed: ProviderError = serde_json::from_str(body).unwrap_or_default();
            let msg = parsed
                .message
                .or(parsed.error)
                .map(|m| m.trim().to_string())
                .filter(|m| !m.is_empty());
            ResolutionError::InvalidInput(msg)
        }
        429 => ResolutionError::RateLimited,
        other => ResolutionError::Unknown(format!("provider returned status {}", other)),
    }
}

fn into_resolved(
    payload: ProviderResponse,
    input_type: InputKind,
) -> Result<ResolvedTrack, ResolutionError> {
    let platform_links = normalize_links_by_platform(&payload.links_by_platform);
    if platform_links.is_empty() {
        return Err(ResolutionError::NoPlatformsFound);
    }
    Ok(ResolvedTrack {
        title: payload.title.trim().to_string(),
        artist_name: payload.artist.trim().to_string(),
        album: non_blank(payload.album),
        isrc: non_blank(payload.isrc),
        release_date: non_blank(payload.release_date),
        artwork_url: non_blank(payload.artwork),
        alternative_artworks: payload.alternative_artworks,
        platform_links,
        source_provider: non_blank(payload.source_provider).unwrap_or_else(|| "odesli".into()),
        input_type,
    })
}

fn non_blank(v: Option<String>) -> Option<String> {
    v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}
