//! Progress step table and resolution (client-side phase approximation).
//!
//! The remote service reports a coarse percentage. [`resolve_step`] maps it
//! onto a fixed ten-entry table so the presentation layer can show a
//! step-by-step checklist regardless of which status label the service sent.

use serde::Serialize;

use crate::job::{Job, JobStatus};
use crate::types::Percent;

// ---------------------------------------------------------------------------
// Step table
// ---------------------------------------------------------------------------

/// A named phase with the minimum progress at which it is considered reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProgressStep {
    pub key: &'static str,
    pub label: &'static str,
    pub threshold: Percent,
}

const fn step(key: &'static str, label: &'static str, threshold: Percent) -> ProgressStep {
    ProgressStep {
        key,
        label,
        threshold,
    }
}

/// Ordered phases. Thresholds are non-decreasing.
pub const PROGRESS_STEPS: [ProgressStep; 10] = [
    step("queued", "Queued", 0),
    step("geocoding", "Geocoding", 10),
    step("street_network", "Street Network", 35),
    step("water", "Water Features", 45),
    step("parks", "Parks", 50),
    step("buildings", "Buildings", 55),
    step("railways", "Railways", 60),
    step("rendering", "Rendering", 80),
    step("saving", "Saving", 90),
    step("complete", "Complete", 100),
];

/// Index of the final step in [`PROGRESS_STEPS`].
pub const LAST_STEP_INDEX: usize = PROGRESS_STEPS.len() - 1;

// ---------------------------------------------------------------------------
// Resolution
// ---------------------------------------------------------------------------

/// Resolve the index of the current step for a raw progress value.
///
/// Scans from the highest threshold down and returns the first step whose
/// threshold is `<= progress`. Values below the first threshold (negative or
/// otherwise malformed input) resolve to `0`; values above 100 resolve to
/// the last step.
pub fn resolve_step(progress: i64) -> usize {
    PROGRESS_STEPS
        .iter()
        .rposition(|s| i64::from(s.threshold) <= progress)
        .unwrap_or(0)
}

/// Display state of a single step relative to the resolved index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepState {
    Past,
    Current,
    Future,
    /// The step the job was on when it failed. Never shown as running.
    Halted,
}

/// Classify step `index` given the resolved step and the job status.
///
/// - `Completed`: every step is past.
/// - `Failed`: no step is current; the resolved step is frozen as halted.
/// - Otherwise: before the resolved index is past, at it is current, after
///   it is future.
pub fn classify_step(index: usize, resolved: usize, status: &JobStatus) -> StepState {
    if *status == JobStatus::Completed {
        return StepState::Past;
    }
    match index.cmp(&resolved) {
        std::cmp::Ordering::Less => StepState::Past,
        std::cmp::Ordering::Equal if *status == JobStatus::Failed => StepState::Halted,
        std::cmp::Ordering::Equal => StepState::Current,
        std::cmp::Ordering::Greater => StepState::Future,
    }
}

// ---------------------------------------------------------------------------
// Snapshot for the presentation layer
// ---------------------------------------------------------------------------

/// Visual tone for the overall status badge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BadgeTone {
    Neutral,
    Success,
    Error,
}

/// One row of the step checklist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepView {
    pub key: &'static str,
    pub label: &'static str,
    pub state: StepState,
}

/// Everything a progress display needs, derived from a [`Job`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProgressSnapshot {
    pub percent: Percent,
    pub message: String,
    pub tone: BadgeTone,
    pub current_index: usize,
    pub steps: Vec<StepView>,
}

impl ProgressSnapshot {
    /// Build a snapshot from the tracked job.
    ///
    /// Steps are resolved from the job's peak progress so a regressed value
    /// from the service never un-checks a step that was already shown past.
    pub fn from_job(job: &Job) -> Self {
        let current_index = resolve_step(i64::from(job.peak_progress));
        let tone = match job.status {
            JobStatus::Completed => BadgeTone::Success,
            JobStatus::Failed => BadgeTone::Error,
            _ => BadgeTone::Neutral,
        };
        let steps = PROGRESS_STEPS
            .iter()
            .enumerate()
            .map(|(i, s)| StepView {
                key: s.key,
                label: s.label,
                state: classify_step(i, current_index, &job.status),
            })
            .collect();

        Self {
            percent: job.progress,
            message: job.message.clone(),
            tone,
            current_index,
            steps,
        }
    }

    /// The step shown as running, if any.
    pub fn current_step(&self) -> Option<&StepView> {
        self.steps.iter().find(|s| s.state == StepState::Current)
    }
}
