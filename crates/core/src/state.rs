//! Job lifecycle state machine.
//!
//! Modelled as a pure function `(state, event) -> (state, effects)`. The
//! caller owns the state, feeds it events (user actions, submission results,
//! poll results) and executes the returned [`Effect`]s. No timers or I/O
//! live here, so every lifecycle rule is unit-testable.

use crate::job::{Job, JobStatus, StatusResponse, SubmitResponse};
use crate::request::GenerationRequest;
use crate::types::JobId;

/// Where the client is in the lifecycle of its (at most one) job.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum JobState {
    /// Nothing submitted yet, or the previous job was discarded.
    #[default]
    Idle,
    /// Submission sent, waiting for the service to assign an id.
    Submitted(GenerationRequest),
    /// Job accepted and not yet terminal. Polling is running.
    Active(Job),
    /// Job finished; artifact references are available.
    Completed(Job),
    /// Job failed on the service. The job id is no longer tracked; the
    /// record is kept only so the display can freeze at its last step.
    Failed(Job),
}

impl JobState {
    pub fn status(&self) -> JobStatus {
        match self {
            Self::Idle => JobStatus::Idle,
            Self::Submitted(_) => JobStatus::Submitted,
            Self::Active(job) => job.status,
            Self::Completed(_) => JobStatus::Completed,
            Self::Failed(_) => JobStatus::Failed,
        }
    }

    /// The job id poll results are matched against. `None` once failed.
    pub fn tracked_job_id(&self) -> Option<&str> {
        match self {
            Self::Active(job) | Self::Completed(job) => Some(job.id.as_str()),
            _ => None,
        }
    }

    /// The job record, if one exists.
    pub fn job(&self) -> Option<&Job> {
        match self {
            Self::Active(job) | Self::Completed(job) | Self::Failed(job) => Some(job),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed(_) | Self::Failed(_))
    }

    pub fn is_polling(&self) -> bool {
        matches!(self, Self::Active(_))
    }
}

/// Inputs to the state machine.
#[derive(Debug, Clone, PartialEq)]
pub enum JobEvent {
    /// The user asked for a new poster.
    Submit(GenerationRequest),
    /// The service accepted the submission.
    SubmitAccepted(SubmitResponse),
    /// The submission failed (transport, timeout or non-2xx).
    SubmitRejected { message: String },
    /// A poll returned a status for `job_id`.
    PollSucceeded {
        job_id: JobId,
        response: StatusResponse,
    },
    /// A poll for `job_id` timed out or failed in transport.
    PollFailed { job_id: JobId, error: String },
    /// The user discarded the current job.
    Reset,
}

/// Side effects the caller must carry out, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    StopPolling,
    SendSubmission(GenerationRequest),
    StartPolling(JobId),
    /// The tracked job changed (new progress, status or message).
    JobUpdated(Job),
    /// The job completed; the payload carries the artifact references.
    JobCompleted(Job),
    /// The job failed on the service. `message` is the service's message.
    JobFailed { job_id: JobId, message: String },
    /// Submission failed; surface `message` to the user.
    SubmitFailed { message: String },
    /// A poll failed transiently. Log only.
    TransientError { job_id: JobId, error: String },
    /// An input did not apply to the current state and was dropped.
    Discarded { reason: &'static str },
}

/// Advance the state machine by one event.
pub fn transition(state: JobState, event: JobEvent) -> (JobState, Vec<Effect>) {
    match (state, event) {
        // -- user actions --
        (JobState::Submitted(req), JobEvent::Submit(_)) => (
            JobState::Submitted(req),
            vec![Effect::Discarded {
                reason: "a submission is already in flight",
            }],
        ),
        (_, JobEvent::Submit(req)) => (
            JobState::Submitted(req.clone()),
            vec![Effect::StopPolling, Effect::SendSubmission(req)],
        ),
        (_, JobEvent::Reset) => (JobState::Idle, vec![Effect::StopPolling]),

        // -- submission results --
        (JobState::Submitted(_), JobEvent::SubmitAccepted(resp)) => accept(Job::from_submission(&resp)),
        (JobState::Submitted(_), JobEvent::SubmitRejected { message }) => {
            (JobState::Idle, vec![Effect::SubmitFailed { message }])
        }
        (state, JobEvent::SubmitAccepted(_) | JobEvent::SubmitRejected { .. }) => (
            state,
            vec![Effect::Discarded {
                reason: "no submission in flight",
            }],
        ),

        // -- poll results --
        (JobState::Active(mut job), JobEvent::PollSucceeded { job_id, response })
            if job.id == job_id =>
        {
            job.apply_status(&response);
            match job.status {
                JobStatus::Completed => (
                    JobState::Completed(job.clone()),
                    vec![Effect::StopPolling, Effect::JobCompleted(job)],
                ),
                JobStatus::Failed => {
                    let message = job.message.clone();
                    (
                        JobState::Failed(job),
                        vec![Effect::StopPolling, Effect::JobFailed { job_id, message }],
                    )
                }
                _ => (JobState::Active(job.clone()), vec![Effect::JobUpdated(job)]),
            }
        }
        (JobState::Active(job), JobEvent::PollFailed { job_id, error }) if job.id == job_id => {
            (JobState::Active(job), vec![Effect::TransientError { job_id, error }])
        }
        (state, JobEvent::PollSucceeded { .. } | JobEvent::PollFailed { .. }) => (
            state,
            vec![Effect::Discarded {
                reason: "poll result for a job that is not being tracked",
            }],
        ),
    }
}

/// Enter the state matching a freshly accepted job.
fn accept(job: Job) -> (JobState, Vec<Effect>) {
    match job.status {
        JobStatus::Completed => (JobState::Completed(job.clone()), vec![Effect::JobCompleted(job)]),
        JobStatus::Failed => {
            let job_id = job.id.clone();
            let message = job.message.clone();
            (
                JobState::Failed(job),
                vec![Effect::JobFailed { job_id, message }],
            )
        }
        _ => {
            let id = job.id.clone();
            (
                JobState::Active(job.clone()),
                vec![Effect::JobUpdated(job), Effect::StartPolling(id)],
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use assert_matches::assert_matches;

    use super::*;

    fn request() -> GenerationRequest {
        GenerationRequest::new("Venice", "Italy", "feature_based")
    }

    fn accepted(id: &str) -> SubmitResponse {
        SubmitResponse {
            job_id: id.into(),
            status: JobStatus::Queued,
            progress: 0,
            message: "Job queued for processing".into(),
        }
    }

    fn poll(id: &str, status: JobStatus, progress: i64, message: &str) -> JobEvent {
        JobEvent::PollSucceeded {
            job_id: id.into(),
            response: StatusResponse {
                job_id: Some(id.into()),
                status,
                progress,
                message: message.into(),
                file_url: (status == JobStatus::Completed)
                    .then(|| format!("/api/download/{id}")),
                file_urls: BTreeMap::new(),
            },
        }
    }

    fn active(id: &str) -> JobState {
        let (state, _) = transition(JobState::Idle, JobEvent::Submit(request()));
        let (state, _) = transition(state, JobEvent::SubmitAccepted(accepted(id)));
        state
    }

    #[test]
    fn submit_from_idle_sends_request() {
        let (state, effects) = transition(JobState::Idle, JobEvent::Submit(request()));
        assert_matches!(state, JobState::Submitted(_));
        assert_eq!(
            effects,
            vec![Effect::StopPolling, Effect::SendSubmission(request())]
        );
    }

    #[test]
    fn submit_while_in_flight_is_discarded() {
        let (state, _) = transition(JobState::Idle, JobEvent::Submit(request()));
        let (state, effects) = transition(state, JobEvent::Submit(request()));
        assert_matches!(state, JobState::Submitted(_));
        assert_matches!(effects.as_slice(), [Effect::Discarded { .. }]);
    }

    #[test]
    fn accepted_submission_starts_polling() {
        let (state, _) = transition(JobState::Idle, JobEvent::Submit(request()));
        let (state, effects) = transition(state, JobEvent::SubmitAccepted(accepted("abc")));
        assert_eq!(state.tracked_job_id(), Some("abc"));
        assert!(state.is_polling());
        assert_matches!(
            effects.as_slice(),
            [Effect::JobUpdated(_), Effect::StartPolling(id)] if id == "abc"
        );
    }

    #[test]
    fn rejected_submission_returns_to_idle() {
        let (state, _) = transition(JobState::Idle, JobEvent::Submit(request()));
        let (state, effects) = transition(
            state,
            JobEvent::SubmitRejected {
                message: "Theme 'x' not found".into(),
            },
        );
        assert_eq!(state, JobState::Idle);
        assert_eq!(
            effects,
            vec![Effect::SubmitFailed {
                message: "Theme 'x' not found".into()
            }]
        );
    }

    #[test]
    fn progress_poll_updates_job() {
        let (state, effects) = transition(
            active("abc"),
            poll("abc", JobStatus::Geocoding, 12, "Geocoding location..."),
        );
        let job = state.job().unwrap();
        assert_eq!(job.progress, 12);
        assert_eq!(job.message, "Geocoding location...");
        assert_matches!(effects.as_slice(), [Effect::JobUpdated(_)]);
    }

    #[test]
    fn completed_poll_stops_and_carries_references() {
        let (state, effects) = transition(
            active("abc"),
            poll("abc", JobStatus::Completed, 100, "Poster generated successfully"),
        );
        assert!(state.is_terminal());
        assert_matches!(
            effects.as_slice(),
            [Effect::StopPolling, Effect::JobCompleted(job)]
                if job.file_url.as_deref() == Some("/api/download/abc")
        );
    }

    #[test]
    fn failed_poll_stops_and_clears_tracked_id() {
        let (state, effects) = transition(
            active("abc"),
            poll("abc", JobStatus::Failed, 0, "Error: could not geocode"),
        );
        assert_matches!(state, JobState::Failed(_));
        assert_eq!(state.tracked_job_id(), None);
        assert_eq!(
            effects,
            vec![
                Effect::StopPolling,
                Effect::JobFailed {
                    job_id: "abc".into(),
                    message: "Error: could not geocode".into()
                }
            ]
        );
    }

    #[test]
    fn poll_failure_is_transient() {
        let before = active("abc");
        let (after, effects) = transition(
            before.clone(),
            JobEvent::PollFailed {
                job_id: "abc".into(),
                error: "timed out".into(),
            },
        );
        assert_eq!(before, after);
        assert_matches!(effects.as_slice(), [Effect::TransientError { .. }]);
    }

    #[test]
    fn stale_poll_for_other_job_is_discarded() {
        let before = active("b");
        let (after, effects) =
            transition(before.clone(), poll("a", JobStatus::Completed, 100, "done"));
        assert_eq!(before, after);
        assert_matches!(effects.as_slice(), [Effect::Discarded { .. }]);
    }

    #[test]
    fn poll_after_terminal_is_discarded() {
        let (done, _) = transition(active("abc"), poll("abc", JobStatus::Completed, 100, "ok"));
        let (after, effects) = transition(done.clone(), poll("abc", JobStatus::Rendering, 80, ""));
        assert_eq!(done, after);
        assert_matches!(effects.as_slice(), [Effect::Discarded { .. }]);
    }

    #[test]
    fn late_submission_result_after_reset_is_discarded() {
        let (state, _) = transition(JobState::Idle, JobEvent::Submit(request()));
        let (state, _) = transition(state, JobEvent::Reset);
        let (state, effects) = transition(state, JobEvent::SubmitAccepted(accepted("abc")));
        assert_eq!(state, JobState::Idle);
        assert_matches!(effects.as_slice(), [Effect::Discarded { .. }]);
    }

    #[test]
    fn new_submission_while_active_stops_previous_polling() {
        let (state, effects) = transition(active("abc"), JobEvent::Submit(request()));
        assert_matches!(state, JobState::Submitted(_));
        assert_eq!(effects[0], Effect::StopPolling);
        assert_eq!(state.tracked_job_id(), None);
    }

    #[test]
    fn submission_already_failed_never_polls() {
        let (state, _) = transition(JobState::Idle, JobEvent::Submit(request()));
        let mut resp = accepted("abc");
        resp.status = JobStatus::Failed;
        resp.message = "upstream down".into();
        let (state, effects) = transition(state, JobEvent::SubmitAccepted(resp));
        assert_matches!(state, JobState::Failed(_));
        assert!(!effects.iter().any(|e| matches!(e, Effect::StartPolling(_))));
    }

    #[test]
    fn reset_returns_to_idle() {
        let (state, effects) = transition(active("abc"), JobEvent::Reset);
        assert_eq!(state, JobState::Idle);
        assert_eq!(effects, vec![Effect::StopPolling]);
    }
}
