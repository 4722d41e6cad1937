//! Job record and the wire payloads that create and update it.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::{clamp_percent, JobId, OutputFormat, Percent};

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// Every status a job passes through.
///
/// `Idle` and `Submitted` exist only on the client. The named phases between
/// `Queued` and `Completed` are informational labels the service may send;
/// any label the client does not recognise (including the service's generic
/// `processing`) maps to [`JobStatus::Processing`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum JobStatus {
    Idle,
    Submitted,
    Queued,
    Geocoding,
    StreetNetwork,
    Water,
    Parks,
    Buildings,
    Railways,
    Rendering,
    Saving,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn from_wire(label: &str) -> Self {
        match label {
            "idle" => Self::Idle,
            "submitted" => Self::Submitted,
            "queued" => Self::Queued,
            "geocoding" => Self::Geocoding,
            "street_network" => Self::StreetNetwork,
            "water" => Self::Water,
            "parks" => Self::Parks,
            "buildings" => Self::Buildings,
            "railways" => Self::Railways,
            "rendering" => Self::Rendering,
            "saving" => Self::Saving,
            "completed" => Self::Completed,
            "failed" => Self::Failed,
            _ => Self::Processing,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Submitted => "submitted",
            Self::Queued => "queued",
            Self::Geocoding => "geocoding",
            Self::StreetNetwork => "street_network",
            Self::Water => "water",
            Self::Parks => "parks",
            Self::Buildings => "buildings",
            Self::Railways => "railways",
            Self::Rendering => "rendering",
            Self::Saving => "saving",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    /// `Completed` or `Failed`: no further transitions or polling.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl From<String> for JobStatus {
    fn from(label: String) -> Self {
        Self::from_wire(&label)
    }
}

impl From<JobStatus> for String {
    fn from(status: JobStatus) -> Self {
        status.as_str().to_string()
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Wire payloads
// ---------------------------------------------------------------------------

/// Response to `POST /api/generate`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmitResponse {
    pub job_id: JobId,
    pub status: JobStatus,
    #[serde(default)]
    pub progress: i64,
    #[serde(default)]
    pub message: String,
}

/// Response to `GET /api/job/{job_id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_id: Option<JobId>,
    pub status: JobStatus,
    #[serde(default)]
    pub progress: i64,
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_url: Option<String>,
    /// Per-format references, keyed by `png` / `svg`.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub file_urls: BTreeMap<String, String>,
}

impl StatusResponse {
    /// Per-format references with unknown keys dropped.
    pub fn format_references(&self) -> BTreeMap<OutputFormat, String> {
        self.file_urls
            .iter()
            .filter_map(|(key, url)| match key.to_ascii_lowercase().as_str() {
                "png" => Some((OutputFormat::Png, url.clone())),
                "svg" => Some((OutputFormat::Svg, url.clone())),
                _ => None,
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Job
// ---------------------------------------------------------------------------

/// The single job tracked by the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Job {
    pub id: JobId,
    pub status: JobStatus,
    /// Last progress value reported by the service.
    pub progress: Percent,
    /// Highest progress value seen so far.
    pub peak_progress: Percent,
    pub message: String,
    /// Primary artifact reference. Only present once completed.
    pub file_url: Option<String>,
    /// Per-format artifact references. Only present once completed.
    pub file_urls: BTreeMap<OutputFormat, String>,
}

impl Job {
    pub fn new(id: JobId, status: JobStatus, progress: Percent, message: String) -> Self {
        Self {
            id,
            status,
            progress,
            peak_progress: progress,
            message,
            file_url: None,
            file_urls: BTreeMap::new(),
        }
    }

    /// Create the tracked job from a submission response.
    pub fn from_submission(resp: &SubmitResponse) -> Self {
        Self::new(
            resp.job_id.clone(),
            resp.status,
            clamp_percent(resp.progress),
            resp.message.clone(),
        )
    }

    /// Apply a poll response. The message is always replaced. Regressed
    /// progress is recorded as reported but never lowers the peak. A
    /// completed job is always at 100, whatever progress the payload carried.
    pub fn apply_status(&mut self, resp: &StatusResponse) {
        self.status = resp.status;
        self.progress = clamp_percent(resp.progress);
        self.message = resp.message.clone();

        if resp.status == JobStatus::Completed {
            self.progress = 100;
        }
        self.peak_progress = self.peak_progress.max(self.progress);

        if resp.status == JobStatus::Completed {
            self.file_url = resp.file_url.clone();
            self.file_urls = resp.format_references();
        } else {
            self.file_url = None;
            self.file_urls.clear();
        }
    }

    /// Whether the service exposed more than one artifact reference.
    pub fn has_multiple_references(&self) -> bool {
        self.file_urls.len() > 1
    }
}
