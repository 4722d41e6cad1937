//! Sequential execution of a download plan.
//!
//! Each planned file is fetched and written before the next one starts,
//! mirroring the one-download-per-gesture rule of browser clients.

use std::path::{Path, PathBuf};

use maposter_core::artifact::{Intent, PlannedDownload};

use crate::api::PosterApiError;
use crate::transport::PosterTransport;

/// A download plan that stopped part way. `saved` lists the files written
/// before the failure; they are left on disk.
#[derive(Debug, thiserror::Error)]
pub enum DownloadError {
    #[error("Failed to fetch {filename}: {source}")]
    Fetch {
        filename: String,
        saved: Vec<PathBuf>,
        #[source]
        source: PosterApiError,
    },

    #[error("Failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        saved: Vec<PathBuf>,
        #[source]
        source: std::io::Error,
    },
}

impl DownloadError {
    /// Files written before the failure.
    pub fn saved(&self) -> &[PathBuf] {
        match self {
            Self::Fetch { saved, .. } | Self::Write { saved, .. } => saved,
        }
    }
}

/// Fetch every planned artifact in order and save it under `out_dir`.
///
/// Returns every written path. Stops at the first failure; nothing after
/// the failing entry is fetched.
pub async fn download_all<T: PosterTransport + ?Sized>(
    transport: &T,
    plan: &[PlannedDownload],
    out_dir: &Path,
) -> Result<Vec<PathBuf>, DownloadError> {
    tokio::fs::create_dir_all(out_dir)
        .await
        .map_err(|source| DownloadError::Write {
            path: out_dir.to_path_buf(),
            saved: Vec::new(),
            source,
        })?;

    let mut saved = Vec::with_capacity(plan.len());
    for entry in plan {
        let bytes = match transport
            .fetch_artifact(&entry.reference, Intent::Download)
            .await
        {
            Ok(bytes) => bytes,
            Err(source) => {
                return Err(DownloadError::Fetch {
                    filename: entry.filename.clone(),
                    saved,
                    source,
                })
            }
        };

        let path = out_dir.join(&entry.filename);
        if let Err(source) = tokio::fs::write(&path, &bytes).await {
            return Err(DownloadError::Write {
                path,
                saved,
                source,
            });
        }

        tracing::info!(
            job_id = %entry.reference.job_id,
            format = %entry.reference.format,
            bytes = bytes.len(),
            path = %path.display(),
            "Artifact saved",
        );
        saved.push(path);
    }
    Ok(saved)
}
