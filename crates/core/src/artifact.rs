//! Artifact resolution: which files to fetch for a completed job.
//!
//! The resolver is pure. It only computes an ordered plan of
//! `(reference, filename)` pairs; fetching them one at a time is the job of
//! the I/O layer.

use serde::Serialize;

use crate::job::Job;
use crate::types::{JobId, OutputFormat};

/// Path of the retrieval endpoint, relative to the service base URL.
pub const DOWNLOAD_PATH: &str = "/api/download";

/// Why an artifact is being fetched.
///
/// The same file is served either inline (for display) or as an
/// attachment (for saving).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    Preview,
    Download,
}

/// Reference to one artifact of a job, independent of intent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtifactRef {
    pub job_id: JobId,
    /// `Png` or `Svg`; never `Both`.
    pub format: OutputFormat,
    /// Service-relative location without the intent flag.
    pub location: String,
}

impl ArtifactRef {
    /// Location with the intent flag appended.
    pub fn url(&self, intent: Intent) -> String {
        let flag = match intent {
            Intent::Preview => "false",
            Intent::Download => "true",
        };
        with_query(&self.location, "download", flag)
    }

    pub fn preview_url(&self) -> String {
        self.url(Intent::Preview)
    }

    pub fn download_url(&self) -> String {
        self.url(Intent::Download)
    }
}

/// One entry of a download plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedDownload {
    pub reference: ArtifactRef,
    pub filename: String,
}

/// Compute the ordered download plan for a completed job.
///
/// - `Both` with more than one reference on the job: two entries, PNG then SVG.
/// - Anything else: exactly one entry whose extension matches the requested
///   format (`Both` without two references falls back to PNG).
pub fn resolve_downloads(
    job: &Job,
    requested: OutputFormat,
    city: &str,
    theme: &str,
) -> Vec<PlannedDownload> {
    let formats: &[OutputFormat] = if requested == OutputFormat::Both && job.has_multiple_references() {
        &[OutputFormat::Png, OutputFormat::Svg]
    } else if requested == OutputFormat::Svg {
        &[OutputFormat::Svg]
    } else {
        &[OutputFormat::Png]
    };

    formats
        .iter()
        .map(|&format| PlannedDownload {
            reference: artifact_ref(job, format),
            filename: poster_filename(city, theme, format),
        })
        .collect()
}

/// Reference to display inline for a completed job.
pub fn resolve_preview(job: &Job, requested: OutputFormat) -> ArtifactRef {
    let format = match requested {
        OutputFormat::Svg => OutputFormat::Svg,
        OutputFormat::Png | OutputFormat::Both => OutputFormat::Png,
    };
    artifact_ref(job, format)
}

/// `{city}_{theme}_poster.{ext}` with the city lowercased and spaces
/// replaced by underscores.
pub fn poster_filename(city: &str, theme: &str, format: OutputFormat) -> String {
    let city_slug = city.trim().to_lowercase().replace(' ', "_");
    format!("{city_slug}_{theme}_poster.{}", format.extension())
}

fn artifact_ref(job: &Job, format: OutputFormat) -> ArtifactRef {
    let location = match (job.file_urls.get(&format), &job.file_url) {
        (Some(exact), _) => exact.clone(),
        (None, Some(primary)) => with_format(primary, format),
        (None, None) => with_format(&format!("{DOWNLOAD_PATH}/{}", job.id), format),
    };
    ArtifactRef {
        job_id: job.id.clone(),
        format,
        location,
    }
}

/// PNG is the service default, so only non-PNG formats carry a selector.
fn with_format(location: &str, format: OutputFormat) -> String {
    match format {
        OutputFormat::Svg => with_query(location, "format", "svg"),
        OutputFormat::Png | OutputFormat::Both => location.to_string(),
    }
}

fn with_query(location: &str, key: &str, value: &str) -> String {
    let sep = if location.contains('?') { '&' } else { '?' };
    format!("{location}{sep}{key}={value}")
}
