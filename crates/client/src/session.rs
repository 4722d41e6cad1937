//! The tracked job and everything that writes to it.
//!
//! [`PosterSession`] is the single writer of the client's [`JobState`]. User
//! actions ([`submit`](PosterSession::submit), [`reset`](PosterSession::reset))
//! and poll results ([`next_event`](PosterSession::next_event)) are turned
//! into [`JobEvent`]s, run through [`transition`], and the resulting
//! effects are executed here. Nothing else mutates the job.

use std::collections::VecDeque;
use std::sync::Arc;

use maposter_core::artifact::{resolve_downloads, resolve_preview, ArtifactRef, PlannedDownload};
use maposter_core::catalog::Catalog;
use maposter_core::error::CoreError;
use maposter_core::job::Job;
use maposter_core::request::{GenerationRequest, PosterForm};
use maposter_core::state::{transition, Effect, JobEvent, JobState};
use maposter_core::steps::ProgressSnapshot;
use tokio::sync::mpsc;

use crate::api::PosterApiError;
use crate::config::ClientConfig;
use crate::poller::{JobPoller, PollEvent, PollerConfig};
use crate::transport::PosterTransport;

/// Presentation-level notifications.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// The tracked job moved.
    Progress(ProgressSnapshot),
    /// The job finished and its artifacts can be fetched.
    Completed {
        job: Job,
        snapshot: ProgressSnapshot,
        preview: ArtifactRef,
        downloads: Vec<PlannedDownload>,
    },
    /// The service reported a failure. The session is ready for a new
    /// submission.
    Failed {
        message: String,
        snapshot: ProgressSnapshot,
    },
}

/// Errors surfaced to the user by [`PosterSession::submit`].
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The request was rejected before anything was sent.
    #[error(transparent)]
    Validation(#[from] CoreError),

    /// The service could not be reached or refused the submission.
    #[error("{0}")]
    Submit(String),

    /// A submission is already waiting for the service.
    #[error("A submission is already in progress")]
    Busy,
}

/// Owns the tracked job, its polling loop and the reference-data snapshot.
pub struct PosterSession<T: PosterTransport> {
    transport: Arc<T>,
    catalog: Arc<Catalog>,
    config: ClientConfig,
    poller: JobPoller<T>,
    poll_rx: mpsc::UnboundedReceiver<PollEvent>,
    state: JobState,
    /// Request behind the current job; names the downloaded files.
    request: Option<GenerationRequest>,
    pending: VecDeque<SessionEvent>,
}

impl<T: PosterTransport> PosterSession<T> {
    pub fn new(transport: Arc<T>, catalog: Arc<Catalog>, config: ClientConfig) -> Self {
        let (poller, poll_rx) = JobPoller::new(Arc::clone(&transport), PollerConfig::from(&config));
        Self {
            transport,
            catalog,
            config,
            poller,
            poll_rx,
            state: JobState::Idle,
            request: None,
            pending: VecDeque::new(),
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn state(&self) -> &JobState {
        &self.state
    }

    /// Whether a polling loop is running for the tracked job.
    pub fn is_polling(&self) -> bool {
        self.poller.is_polling()
    }

    /// Progress view of the current job, if there is one.
    pub fn snapshot(&self) -> Option<ProgressSnapshot> {
        self.state.job().map(ProgressSnapshot::from_job)
    }

    /// Download plan for a completed job.
    pub fn downloads(&self) -> Option<Vec<PlannedDownload>> {
        match (&self.state, &self.request) {
            (JobState::Completed(job), Some(req)) => {
                Some(resolve_downloads(job, req.format, &req.city, &req.theme))
            }
            _ => None,
        }
    }

    /// Validate raw form values and submit them.
    pub async fn submit_form(&mut self, form: &PosterForm) -> Result<Job, SessionError> {
        let request = form.build(&self.catalog)?;
        self.submit(request).await
    }

    /// Submit a new request, discarding any previous job.
    ///
    /// Returns the freshly created job. Progress then arrives through
    /// [`next_event`](Self::next_event).
    pub async fn submit(&mut self, request: GenerationRequest) -> Result<Job, SessionError> {
        request.validate(&self.catalog)?;

        if matches!(self.state, JobState::Submitted(_)) {
            // A previous submit future was dropped before it resolved.
            self.apply(JobEvent::Reset);
        }

        self.pending.clear();
        self.request = Some(request.clone());
        let effects = self.apply(JobEvent::Submit(request));

        let Some(to_send) = effects.into_iter().find_map(|e| match e {
            Effect::SendSubmission(req) => Some(req),
            _ => None,
        }) else {
            return Err(SessionError::Busy);
        };

        tracing::info!(
            city = %to_send.city,
            country = %to_send.country,
            theme = %to_send.theme,
            distance = to_send.distance,
            format = %to_send.format,
            "Submitting poster request",
        );

        let timeout = self.config.submit_timeout;
        let outcome = match tokio::time::timeout(timeout, self.transport.submit(&to_send)).await {
            Ok(result) => result,
            Err(_) => Err(PosterApiError::Timeout(timeout)),
        };

        match outcome {
            Ok(response) => {
                tracing::info!(job_id = %response.job_id, status = %response.status, "Job created");
                self.apply(JobEvent::SubmitAccepted(response));
                match self.state.job() {
                    Some(job) => Ok(job.clone()),
                    None => Err(SessionError::Submit(
                        "Submission was accepted without a job".to_string(),
                    )),
                }
            }
            Err(e) => {
                tracing::error!(error = %e, "Submission failed");
                let message = e.user_message();
                self.apply(JobEvent::SubmitRejected {
                    message: message.clone(),
                });
                self.request = None;
                Err(SessionError::Submit(message))
            }
        }
    }

    /// Wait for the next presentation event.
    ///
    /// Transient poll failures and stale results are absorbed here. Returns
    /// `None` once there is nothing left to wait for (no job, or the job
    /// reached a terminal state and its event was delivered).
    pub async fn next_event(&mut self) -> Option<SessionEvent> {
        loop {
            if let Some(event) = self.pending.pop_front() {
                return Some(event);
            }
            if !self.state.is_polling() {
                return None;
            }

            let poll = self.poll_rx.recv().await?;
            let job_event = match poll {
                PollEvent::Progress { job_id, response }
                | PollEvent::Completed { job_id, response }
                | PollEvent::Failed {
                    job_id, response, ..
                } => JobEvent::PollSucceeded { job_id, response },
                PollEvent::TransientError { job_id, error } => JobEvent::PollFailed { job_id, error },
            };
            self.apply(job_event);
        }
    }

    /// Discard the current job and stop polling.
    pub fn reset(&mut self) {
        self.apply(JobEvent::Reset);
        self.request = None;
        self.pending.clear();
    }

    /// Run one event through the state machine and execute its effects.
    ///
    /// `SendSubmission` is returned to the caller, which owns the network
    /// round trip.
    fn apply(&mut self, event: JobEvent) -> Vec<Effect> {
        let state = std::mem::take(&mut self.state);
        let (next, effects) = transition(state, event);
        self.state = next;

        let mut unhandled = Vec::new();
        for effect in effects {
            match effect {
                Effect::StopPolling => self.poller.stop(),
                Effect::StartPolling(job_id) => self.poller.start(job_id),
                Effect::JobUpdated(job) => {
                    self.pending
                        .push_back(SessionEvent::Progress(ProgressSnapshot::from_job(&job)));
                }
                Effect::JobCompleted(job) => self.on_completed(job),
                Effect::JobFailed { job_id, message } => {
                    tracing::warn!(job_id = %job_id, message = %message, "Poster generation failed");
                    let snapshot = self
                        .state
                        .job()
                        .map(ProgressSnapshot::from_job)
                        .unwrap_or_else(|| failed_snapshot(&job_id, &message));
                    self.pending
                        .push_back(SessionEvent::Failed { message, snapshot });
                }
                Effect::SubmitFailed { message } => {
                    tracing::debug!(message = %message, "Submission rejected");
                }
                Effect::TransientError { job_id, error } => {
                    tracing::warn!(job_id = %job_id, error = %error, "Ignoring transient poll error");
                }
                Effect::Discarded { reason } => {
                    tracing::debug!(reason, "Event discarded");
                }
                other @ Effect::SendSubmission(_) => unhandled.push(other),
            }
        }
        unhandled
    }

    fn on_completed(&mut self, job: Job) {
        let (format, city, theme) = match &self.request {
            Some(req) => (req.format, req.city.clone(), req.theme.clone()),
            None => {
                tracing::warn!(job_id = %job.id, "Completed job has no request, using defaults");
                (Default::default(), "poster".to_string(), "default".to_string())
            }
        };
        let downloads = resolve_downloads(&job, format, &city, &theme);
        let preview = resolve_preview(&job, format);
        tracing::info!(job_id = %job.id, files = downloads.len(), "Artifacts ready");
        self.pending.push_back(SessionEvent::Completed {
            snapshot: ProgressSnapshot::from_job(&job),
            job,
            preview,
            downloads,
        });
    }
}

fn failed_snapshot(job_id: &str, message: &str) -> ProgressSnapshot {
    let job = Job::new(
        job_id.to_string(),
        maposter_core::job::JobStatus::Failed,
        0,
        message.to_string(),
    );
    ProgressSnapshot::from_job(&job)
}
