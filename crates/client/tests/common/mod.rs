#![allow(dead_code)]

//! Shared test fixtures: a scripted in-memory [`PosterTransport`].

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use maposter_client::api::PosterApiError;
use maposter_client::config::ClientConfig;
use maposter_client::transport::PosterTransport;
use maposter_core::artifact::{ArtifactRef, Intent};
use maposter_core::catalog::{FeatureSet, OutputSize, Presets, Theme};
use maposter_core::job::{JobStatus, StatusResponse, SubmitResponse};
use maposter_core::request::GenerationRequest;

/// One scripted answer to `job_status`.
#[derive(Debug, Clone)]
pub enum Step {
    /// Answer immediately.
    Respond(StatusResponse),
    /// Answer after a delay.
    Delayed(Duration, StatusResponse),
    /// Fail in transport.
    Fail(String),
}

/// In-memory transport with per-job scripts.
///
/// Each job's script is consumed front to back; the last step repeats once
/// the script is exhausted.
#[derive(Default)]
pub struct FakeTransport {
    scripts: Mutex<HashMap<String, VecDeque<Step>>>,
    status_calls: Mutex<Vec<String>>,
    submissions: Mutex<VecDeque<Result<SubmitResponse, (u16, String)>>>,
    submitted: Mutex<Vec<GenerationRequest>>,
    themes: Mutex<Option<Vec<Theme>>>,
    presets: Mutex<Option<Presets>>,
    catalog_delay: Mutex<Option<Duration>>,
    fetched: Mutex<Vec<(String, Intent)>>,
    missing_artifacts: Mutex<Vec<String>>,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script(&self, job_id: &str, steps: Vec<Step>) {
        self.scripts
            .lock()
            .unwrap()
            .insert(job_id.to_string(), steps.into());
    }

    /// Queue the response to the next submission.
    pub fn accept_next(&self, job_id: &str) {
        self.submissions.lock().unwrap().push_back(Ok(SubmitResponse {
            job_id: job_id.to_string(),
            status: JobStatus::Queued,
            progress: 0,
            message: "Job queued for processing".to_string(),
        }));
    }

    /// Queue a non-2xx answer to the next submission.
    pub fn reject_next(&self, status: u16, detail: &str) {
        self.submissions
            .lock()
            .unwrap()
            .push_back(Err((status, detail.to_string())));
    }

    pub fn set_themes(&self, themes: Vec<Theme>) {
        *self.themes.lock().unwrap() = Some(themes);
    }

    pub fn set_presets(&self, presets: Presets) {
        *self.presets.lock().unwrap() = Some(presets);
    }

    /// Answer 404 for artifact URLs containing `fragment`.
    pub fn fail_artifacts_matching(&self, fragment: &str) {
        self.missing_artifacts.lock().unwrap().push(fragment.to_string());
    }

    pub fn delay_catalog(&self, delay: Duration) {
        *self.catalog_delay.lock().unwrap() = Some(delay);
    }

    /// Number of status fetches issued for `job_id`.
    pub fn status_calls(&self, job_id: &str) -> usize {
        self.status_calls
            .lock()
            .unwrap()
            .iter()
            .filter(|id| id.as_str() == job_id)
            .count()
    }

    pub fn submitted(&self) -> Vec<GenerationRequest> {
        self.submitted.lock().unwrap().clone()
    }

    /// Locations fetched, in order.
    pub fn fetched(&self) -> Vec<(String, Intent)> {
        self.fetched.lock().unwrap().clone()
    }

    fn next_step(&self, job_id: &str) -> Option<Step> {
        let mut scripts = self.scripts.lock().unwrap();
        let script = scripts.get_mut(job_id)?;
        if script.len() > 1 {
            script.pop_front()
        } else {
            script.front().cloned()
        }
    }
}

#[async_trait]
impl PosterTransport for FakeTransport {
    async fn submit(&self, request: &GenerationRequest) -> Result<SubmitResponse, PosterApiError> {
        self.submitted.lock().unwrap().push(request.clone());
        let next = self.submissions.lock().unwrap().pop_front();
        match next {
            Some(Ok(resp)) => Ok(resp),
            Some(Err((status, detail))) => Err(PosterApiError::ApiError { status, detail }),
            None => Err(PosterApiError::ApiError {
                status: 500,
                detail: String::new(),
            }),
        }
    }

    async fn job_status(&self, job_id: &str) -> Result<StatusResponse, PosterApiError> {
        self.status_calls.lock().unwrap().push(job_id.to_string());
        match self.next_step(job_id) {
            Some(Step::Respond(resp)) => Ok(resp),
            Some(Step::Delayed(delay, resp)) => {
                tokio::time::sleep(delay).await;
                Ok(resp)
            }
            Some(Step::Fail(detail)) => Err(PosterApiError::ApiError { status: 502, detail }),
            None => Err(PosterApiError::ApiError {
                status: 404,
                detail: "Job not found".to_string(),
            }),
        }
    }

    async fn themes(&self) -> Result<Vec<Theme>, PosterApiError> {
        let delay = *self.catalog_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.themes.lock().unwrap().clone().ok_or(PosterApiError::ApiError {
            status: 503,
            detail: "themes unavailable".to_string(),
        })
    }

    async fn presets(&self) -> Result<Presets, PosterApiError> {
        let delay = *self.catalog_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.presets.lock().unwrap().clone().ok_or(PosterApiError::ApiError {
            status: 503,
            detail: "presets unavailable".to_string(),
        })
    }

    async fn fetch_artifact(
        &self,
        reference: &ArtifactRef,
        intent: Intent,
    ) -> Result<Vec<u8>, PosterApiError> {
        let url = reference.url(intent);
        self.fetched.lock().unwrap().push((url.clone(), intent));
        let missing = self
            .missing_artifacts
            .lock()
            .unwrap()
            .iter()
            .any(|fragment| url.contains(fragment.as_str()));
        if missing {
            return Err(PosterApiError::ApiError {
                status: 404,
                detail: "File not found".to_string(),
            });
        }
        Ok(url.into_bytes())
    }
}

// ---------------------------------------------------------------------------
// Builders
// ---------------------------------------------------------------------------

pub fn status(job_id: &str, status: JobStatus, progress: i64, message: &str) -> StatusResponse {
    StatusResponse {
        job_id: Some(job_id.to_string()),
        status,
        progress,
        message: message.to_string(),
        file_url: None,
        file_urls: Default::default(),
    }
}

pub fn completed(job_id: &str) -> StatusResponse {
    StatusResponse {
        file_url: Some(format!("/api/download/{job_id}")),
        ..status(job_id, JobStatus::Completed, 100, "Poster generated successfully!")
    }
}

pub fn completed_both(job_id: &str) -> StatusResponse {
    let mut resp = completed(job_id);
    resp.file_urls.insert("png".to_string(), format!("/api/download/{job_id}"));
    resp.file_urls
        .insert("svg".to_string(), format!("/api/download/{job_id}?format=svg"));
    resp
}

pub fn failed(job_id: &str, message: &str) -> StatusResponse {
    status(job_id, JobStatus::Failed, 0, message)
}

/// Fast timings so paused-clock tests stay short.
pub fn test_config() -> ClientConfig {
    ClientConfig {
        poll_interval: Duration::from_millis(100),
        poll_timeout: Duration::from_secs(1),
        submit_timeout: Duration::from_secs(5),
        catalog_timeout: Duration::from_secs(1),
        ..ClientConfig::default()
    }
}

pub fn sample_presets() -> Presets {
    Presets {
        output_sizes: vec![OutputSize {
            name: "A3".to_string(),
            width: 11.7,
            height: 16.5,
        }],
        feature_sets: vec![FeatureSet {
            name: "Full".to_string(),
            water: true,
            parks: true,
            buildings: true,
            railways: true,
        }],
        ..Presets::default()
    }
}
