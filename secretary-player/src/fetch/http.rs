//! Calls service client for `GET /calls/{id}/audio`

use super::{AudioFetcher, AudioPayload};
use crate::error::{Error, Result};
use async_trait::async_trait;
use base64::Engine;
use reqwest::header::CONTENT_TYPE;
use reqwest::{StatusCode, Url};
use secretary_common::TrackId;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

const FALLBACK_MIME_TYPE: &str = "application/octet-stream";

/// JSON body of the audio endpoint
#[derive(Debug, Deserialize)]
struct AudioDataResponse {
    #[serde(default, alias = "mimeType")]
    mime_type: Option<String>,
    /// Base64 payload, optionally wrapped in a `data:` URL
    data: String,
}

/// HTTP client for the calls service audio endpoint
pub struct HttpAudioFetcher {
    client: reqwest::Client,
    base_url: Url,
    token: Option<String>,
}

impl HttpAudioFetcher {
    /// Create a fetcher for the service rooted at `base_url` (e.g. `http://host/api`)
    ///
    /// `timeout` is a transport-level limit; `None` leaves requests unbounded.
    pub fn new(base_url: &str, token: Option<String>, timeout: Option<Duration>) -> Result<Self> {
        let parsed = Url::parse(base_url)
            .map_err(|e| Error::Config(format!("Invalid service URL '{}': {}", base_url, e)))?;
        if parsed.cannot_be_a_base() {
            return Err(Error::Config(format!(
                "Service URL '{}' cannot carry a path",
                base_url
            )));
        }

        let mut builder = reqwest::Client::builder()
            .user_agent(concat!("secretary-player/", env!("CARGO_PKG_VERSION")));
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| Error::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: parsed,
            token,
        })
    }

    /// `{base_url}/calls/{track_id}/audio`, with the id percent-encoded as one segment
    pub fn audio_url(&self, track_id: &TrackId) -> Result<Url> {
        let mut url = self.base_url.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| Error::Config(format!("Service URL '{}' cannot carry a path", self.base_url)))?;
            segments
                .pop_if_empty()
                .extend(["calls", track_id.as_str(), "audio"]);
        }
        Ok(url)
    }
}

#[async_trait]
impl AudioFetcher for HttpAudioFetcher {
    async fn fetch(&self, track_id: &TrackId) -> Result<AudioPayload> {
        let url = self.audio_url(track_id)?;
        debug!("Fetching call audio: {}", url);

        let mut request = self.client.get(url);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();

        if status == StatusCode::UNAUTHORIZED {
            return Err(Error::Fetch(
                "session expired, please log in again".to_string(),
            ));
        }
        if !status.is_success() {
            return Err(Error::Fetch(format!("calls service returned {}", status)));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.split(';').next().unwrap_or_default().trim().to_ascii_lowercase())
            .unwrap_or_default();

        if content_type.starts_with("audio/") || content_type == FALLBACK_MIME_TYPE {
            let bytes = response.bytes().await?;
            debug!("Received {} raw bytes of {}", bytes.len(), content_type);
            return non_empty(AudioPayload::new(content_type, bytes.to_vec()));
        }

        let body: AudioDataResponse = response
            .json()
            .await
            .map_err(|e| Error::Fetch(format!("malformed audio response: {}", e)))?;

        decode_transport_payload(body.mime_type.as_deref(), &body.data)
    }
}

/// Turn the service's base64 (or `data:` URL) payload into raw bytes
pub fn decode_transport_payload(mime_type: Option<&str>, data: &str) -> Result<AudioPayload> {
    let (url_mime, encoded) = match data.strip_prefix("data:") {
        Some(rest) => {
            let (header, encoded) = rest
                .split_once(',')
                .ok_or_else(|| Error::Fetch("malformed data URL in audio response".to_string()))?;
            let header_mime = header
                .strip_suffix(";base64")
                .ok_or_else(|| Error::Fetch("audio data URL is not base64 encoded".to_string()))?;
            (Some(header_mime), encoded)
        }
        None => (None, data),
    };

    let mime_type = mime_type
        .filter(|m| !m.is_empty())
        .or(url_mime.filter(|m| !m.is_empty()))
        .unwrap_or(FALLBACK_MIME_TYPE);

    let compact: String;
    let encoded = if encoded.contains(char::is_whitespace) {
        compact = encoded.split_whitespace().collect();
        compact.as_str()
    } else {
        encoded
    };

    let bytes = base64::engine::general_purpose::STANDARD
        .decode(encoded)
        .map_err(|e| Error::Fetch(format!("audio payload is not valid base64: {}", e)))?;

    non_empty(AudioPayload::new(mime_type, bytes))
}

fn non_empty(payload: AudioPayload) -> Result<AudioPayload> {
    if payload.bytes.is_empty() {
        Err(Error::Fetch("calls service returned an empty recording".to_string()))
    } else {
        Ok(payload)
    }
}
