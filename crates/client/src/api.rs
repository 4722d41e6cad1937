//! REST client for the poster service HTTP endpoints.
//!
//! Wraps job submission, status polling, reference data, health and
//! artifact retrieval using [`reqwest`]. Timeouts are applied by the
//! callers (poller, session, catalog loader) per request class.

use std::time::Duration;

use async_trait::async_trait;
use maposter_core::artifact::{ArtifactRef, Intent};
use maposter_core::catalog::{Presets, Theme};
use maposter_core::job::{StatusResponse, SubmitResponse};
use maposter_core::request::GenerationRequest;
use serde::Deserialize;

use crate::transport::PosterTransport;

/// Message shown when the service gives no usable detail.
pub const GENERIC_SUBMIT_ERROR: &str = "Error generating poster";

/// HTTP client for one poster service.
pub struct PosterApi {
    client: reqwest::Client,
    api_url: String,
}

/// Response of `GET /api/health`.
#[derive(Debug, Clone, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    #[serde(default)]
    pub timestamp: Option<String>,
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        self.status == "healthy"
    }
}

/// Errors from the REST layer.
#[derive(Debug, thiserror::Error)]
pub enum PosterApiError {
    /// The HTTP request itself failed (network, DNS, TLS, decoding).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// No response within the request class timeout.
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    /// The service returned a non-2xx status code.
    #[error("Poster service error ({status}): {detail}")]
    ApiError {
        /// HTTP status code.
        status: u16,
        /// `detail` from the error body, or the raw body.
        detail: String,
    },
}

impl PosterApiError {
    /// Message suitable for showing to the end user.
    pub fn user_message(&self) -> String {
        match self {
            Self::ApiError { detail, .. } if !detail.trim().is_empty() => detail.clone(),
            Self::ApiError { .. } => GENERIC_SUBMIT_ERROR.to_string(),
            Self::Timeout(after) => format!("The poster service did not respond within {after:?}"),
            Self::Request(e) => format!("{GENERIC_SUBMIT_ERROR}: {e}"),
        }
    }
}

impl PosterApi {
    /// Create a new API client.
    ///
    /// * `api_url` - Base HTTP URL, e.g. `http://host:8000`.
    pub fn new(api_url: String) -> Self {
        Self::with_client(reqwest::Client::new(), api_url)
    }

    /// Create an API client reusing an existing [`reqwest::Client`].
    pub fn with_client(client: reqwest::Client, api_url: String) -> Self {
        Self {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    /// Check the service liveness endpoint.
    pub async fn health(&self) -> Result<HealthStatus, PosterApiError> {
        let response = self.client.get(self.url("/api/health")).send().await?;
        Self::parse_response(response).await
    }

    /// Resolve a service-relative location against the base URL.
    /// Absolute URLs are returned unchanged.
    pub fn url(&self, location: &str) -> String {
        if location.starts_with("http://") || location.starts_with("https://") {
            location.to_string()
        } else if location.starts_with('/') {
            format!("{}{location}", self.api_url)
        } else {
            format!("{}/{location}", self.api_url)
        }
    }

    // ---- private helpers ----

    /// Ensure the response has a success status code, extracting the
    /// FastAPI-style `{"detail": "..."}` message on failure.
    async fn ensure_success(
        response: reqwest::Response,
    ) -> Result<reqwest::Response, PosterApiError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(PosterApiError::ApiError {
                status: status.as_u16(),
                detail: extract_detail(&body),
            });
        }
        Ok(response)
    }

    /// Parse a successful JSON response body into the expected type.
    async fn parse_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, PosterApiError> {
        let response = Self::ensure_success(response).await?;
        Ok(response.json::<T>().await?)
    }
}

#[async_trait]
impl PosterTransport for PosterApi {
    async fn submit(&self, request: &GenerationRequest) -> Result<SubmitResponse, PosterApiError> {
        let response = self
            .client
            .post(self.url("/api/generate"))
            .json(request)
            .send()
            .await?;

        Self::parse_response(response).await
    }

    async fn job_status(&self, job_id: &str) -> Result<StatusResponse, PosterApiError> {
        let response = self
            .client
            .get(self.url(&format!("/api/job/{job_id}")))
            .send()
            .await?;

        Self::parse_response(response).await
    }

    async fn themes(&self) -> Result<Vec<Theme>, PosterApiError> {
        let response = self.client.get(self.url("/api/themes")).send().await?;
        Self::parse_response(response).await
    }

    async fn presets(&self) -> Result<Presets, PosterApiError> {
        let response = self.client.get(self.url("/api/presets")).send().await?;
        Self::parse_response(response).await
    }

    async fn fetch_artifact(
        &self,
        reference: &ArtifactRef,
        intent: Intent,
    ) -> Result<Vec<u8>, PosterApiError> {
        let response = self
            .client
            .get(self.url(&reference.url(intent)))
            .send()
            .await?;

        let response = Self::ensure_success(response).await?;
        Ok(response.bytes().await?.to_vec())
    }
}

/// Pull a human-readable message out of an error body.
///
/// FastAPI returns `{"detail": "..."}` for handled errors and
/// `{"detail": [{"msg": ...}, ...]}` for request validation errors.
fn extract_detail(body: &str) -> String {
    let Ok(value) = serde_json::from_str::<serde_json::Value>(body) else {
        return body.trim().to_string();
    };
    match value.get("detail") {
        Some(serde_json::Value::String(detail)) => detail.clone(),
        Some(serde_json::Value::Array(items)) => items
            .iter()
            .filter_map(|item| item.get("msg").and_then(|m| m.as_str()))
            .collect::<Vec<_>>()
            .join("; "),
        _ => body.trim().to_string(),
    }
}
