//! The seam between lifecycle logic and the network.
//!
//! [`JobPoller`](crate::poller::JobPoller), [`PosterSession`](crate::session::PosterSession),
//! the catalog loader and the download executor all talk to the service
//! through [`PosterTransport`]. [`PosterApi`](crate::api::PosterApi) is the
//! HTTP implementation.

use async_trait::async_trait;
use maposter_core::artifact::{ArtifactRef, Intent};
use maposter_core::catalog::{Presets, Theme};
use maposter_core::job::{StatusResponse, SubmitResponse};
use maposter_core::request::GenerationRequest;

use crate::api::PosterApiError;

#[async_trait]
pub trait PosterTransport: Send + Sync + 'static {
    /// `POST /api/generate`.
    async fn submit(&self, request: &GenerationRequest) -> Result<SubmitResponse, PosterApiError>;

    /// `GET /api/job/{job_id}`.
    async fn job_status(&self, job_id: &str) -> Result<StatusResponse, PosterApiError>;

    /// `GET /api/themes`.
    async fn themes(&self) -> Result<Vec<Theme>, PosterApiError>;

    /// `GET /api/presets`.
    async fn presets(&self) -> Result<Presets, PosterApiError>;

    /// Retrieve an artifact's bytes with the given intent.
    async fn fetch_artifact(
        &self,
        reference: &ArtifactRef,
        intent: Intent,
    ) -> Result<Vec<u8>, PosterApiError>;
}
