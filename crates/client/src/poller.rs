//! Status polling loop for the tracked job.
//!
//! [`JobPoller`] owns at most one polling task. [`JobPoller::start`] stops
//! any previous loop before spawning the new one, and every loop checks its
//! own [`CancellationToken`] and the tracked job id before reporting a
//! result, so a response that arrives after `stop` is dropped.
//!
//! Results are delivered as [`PollEvent`]s on the receiver returned by
//! [`JobPoller::new`].

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use maposter_core::job::{JobStatus, StatusResponse};
use maposter_core::types::JobId;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::api::PosterApiError;
use crate::config::{ClientConfig, DEFAULT_POLL_INTERVAL, DEFAULT_POLL_TIMEOUT};
use crate::transport::PosterTransport;

/// Interval and per-request timeout of the polling loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollerConfig {
    pub interval: Duration,
    pub timeout: Duration,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            timeout: DEFAULT_POLL_TIMEOUT,
        }
    }
}

impl From<&ClientConfig> for PollerConfig {
    fn from(config: &ClientConfig) -> Self {
        Self {
            interval: config.poll_interval,
            timeout: config.poll_timeout,
        }
    }
}

/// Results reported by the polling loop.
#[derive(Debug, Clone, PartialEq)]
pub enum PollEvent {
    /// Non-terminal status update.
    Progress {
        job_id: JobId,
        response: StatusResponse,
    },
    /// Final payload. Polling has stopped.
    Completed {
        job_id: JobId,
        response: StatusResponse,
    },
    /// Service-reported failure. Polling has stopped and the tracked id is
    /// cleared.
    Failed {
        job_id: JobId,
        message: String,
        response: StatusResponse,
    },
    /// One poll timed out or failed in transport. Polling continues.
    TransientError { job_id: JobId, error: String },
}

/// Bookkeeping for the running loop.
struct ActiveLoop {
    job_id: JobId,
    cancel: CancellationToken,
    task_handle: JoinHandle<()>,
}

/// Polls one job at a time.
pub struct JobPoller<T: PosterTransport> {
    transport: Arc<T>,
    config: PollerConfig,
    event_tx: mpsc::UnboundedSender<PollEvent>,
    active: Mutex<Option<ActiveLoop>>,
    /// Job id results are accepted for. Shared with the running loop.
    tracked: Arc<Mutex<Option<JobId>>>,
}

impl<T: PosterTransport> JobPoller<T> {
    /// Create a poller and the receiver its events are delivered on.
    pub fn new(
        transport: Arc<T>,
        config: PollerConfig,
    ) -> (Self, mpsc::UnboundedReceiver<PollEvent>) {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let poller = Self {
            transport,
            config,
            event_tx,
            active: Mutex::new(None),
            tracked: Arc::new(Mutex::new(None)),
        };
        (poller, event_rx)
    }

    /// Start polling `job_id`, replacing any loop that is already running.
    ///
    /// The first status fetch is issued immediately. Must be called from
    /// within a tokio runtime.
    pub fn start(&self, job_id: JobId) {
        let mut active = self.active.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(previous) = active.take() {
            tracing::debug!(
                previous_job_id = %previous.job_id,
                job_id = %job_id,
                "Replacing active polling loop",
            );
            previous.cancel.cancel();
        }

        *self.tracked.lock().unwrap_or_else(PoisonError::into_inner) = Some(job_id.clone());

        let cancel = CancellationToken::new();
        let task_handle = tokio::spawn(run_poll_loop(
            Arc::clone(&self.transport),
            job_id.clone(),
            self.config,
            cancel.clone(),
            Arc::clone(&self.tracked),
            self.event_tx.clone(),
        ));

        tracing::info!(job_id = %job_id, interval_ms = self.config.interval.as_millis() as u64, "Polling started");

        *active = Some(ActiveLoop {
            job_id,
            cancel,
            task_handle,
        });
    }

    /// Stop polling. Safe to call repeatedly and from any state.
    pub fn stop(&self) {
        let previous = self
            .active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        *self.tracked.lock().unwrap_or_else(PoisonError::into_inner) = None;

        if let Some(previous) = previous {
            previous.cancel.cancel();
            tracing::info!(job_id = %previous.job_id, "Polling stopped");
        }
    }

    /// Whether a loop is currently running.
    ///
    /// A loop that ended on its own after a terminal status is not running.
    pub fn is_polling(&self) -> bool {
        self.active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|l| !l.cancel.is_cancelled() && !l.task_handle.is_finished())
    }

    /// Job id of the running (or completed) loop. Cleared on stop and on
    /// a failed job.
    pub fn tracked_job_id(&self) -> Option<JobId> {
        self.tracked
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl<T: PosterTransport> Drop for JobPoller<T> {
    fn drop(&mut self) {
        if let Some(active) = self
            .active
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            active.cancel.cancel();
        }
    }
}

/// Fetch status on every tick until a terminal status or cancellation.
async fn run_poll_loop<T: PosterTransport>(
    transport: Arc<T>,
    job_id: JobId,
    config: PollerConfig,
    cancel: CancellationToken,
    tracked: Arc<Mutex<Option<JobId>>>,
    event_tx: mpsc::UnboundedSender<PollEvent>,
) {
    let mut ticker = tokio::time::interval(config.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }

        // The fetch itself is not cancelled; a late result is discarded below.
        let result = match tokio::time::timeout(config.timeout, transport.job_status(&job_id)).await
        {
            Ok(result) => result,
            Err(_) => Err(PosterApiError::Timeout(config.timeout)),
        };

        if cancel.is_cancelled() || !is_tracked(&tracked, &job_id) {
            tracing::debug!(job_id = %job_id, "Discarding poll result for stopped loop");
            break;
        }

        let response = match result {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(job_id = %job_id, error = %e, "Status poll failed, retrying on next tick");
                let _ = event_tx.send(PollEvent::TransientError {
                    job_id: job_id.clone(),
                    error: e.to_string(),
                });
                continue;
            }
        };

        if response.job_id.as_deref().is_some_and(|id| id != job_id) {
            tracing::warn!(
                job_id = %job_id,
                response_job_id = ?response.job_id,
                "Discarding status response for a different job",
            );
            continue;
        }

        match response.status {
            JobStatus::Completed => {
                tracing::info!(job_id = %job_id, "Job completed");
                let _ = event_tx.send(PollEvent::Completed {
                    job_id: job_id.clone(),
                    response,
                });
                break;
            }
            JobStatus::Failed => {
                tracing::warn!(job_id = %job_id, message = %response.message, "Job failed");
                clear_tracked(&tracked, &job_id);
                let _ = event_tx.send(PollEvent::Failed {
                    job_id: job_id.clone(),
                    message: response.message.clone(),
                    response,
                });
                break;
            }
            _ => {
                tracing::debug!(
                    job_id = %job_id,
                    status = %response.status,
                    progress = response.progress,
                    "Job progress",
                );
                let _ = event_tx.send(PollEvent::Progress {
                    job_id: job_id.clone(),
                    response,
                });
            }
        }
    }

    tracing::debug!(job_id = %job_id, "Polling loop exited");
}

fn is_tracked(tracked: &Mutex<Option<JobId>>, job_id: &str) -> bool {
    tracked
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .as_deref()
        == Some(job_id)
}

fn clear_tracked(tracked: &Mutex<Option<JobId>>, job_id: &str) {
    let mut guard = tracked.lock().unwrap_or_else(PoisonError::into_inner);
    if guard.as_deref() == Some(job_id) {
        *guard = None;
    }
}
