//! Which step of the job workflow the user is on, derived from the job alone.

use std::fmt;

use tracing::debug;

use crate::data::{data_types, missing_data_objects};
use crate::status::JobStatusKind;
use crate::types::Job;
use crate::JobResult;

pub const SETUP: &str = "setup";
pub const SUBMIT: &str = "submit";
pub const RESULTS: &str = "results";

pub const NEEDS_DATA: &str = "Needs data";
pub const COMPLETE: &str = "Complete";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Job not created yet.
    Setup,
    /// Waiting for uploads of this data type.
    Data(String),
    Error,
    /// All data present, calculation not yet submitted.
    Calculate,
    Results,
}

impl Step {
    pub fn as_str(&self) -> &str {
        match self {
            Step::Setup => SETUP,
            Step::Data(data_type) => data_type,
            Step::Error => "error",
            Step::Calculate => "calculate",
            Step::Results => RESULTS,
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Derives the current step.
///
/// In order: a job without an id is in setup; an errored job is in error
/// whatever its data; the first data type with a missing object is next;
/// otherwise the status decides between calculate and results. An
/// unrecognised status is an error, never a silent no-op.
pub fn infer_step(job: &Job) -> JobResult<Step> {
    let kind = job.status_kind()?;
    let step = if !job.is_created() {
        Step::Setup
    } else if kind == JobStatusKind::Error {
        Step::Error
    } else if let Some(missing) = missing_data_objects(job).next() {
        Step::Data(missing.data_type().to_string())
    } else if kind.is_submitted() {
        Step::Results
    } else {
        Step::Calculate
    };
    debug!(%step, status = %kind, "inferred job step");
    Ok(step)
}

/// Ordered workflow steps shown for `job`.
pub fn job_steps(job: &Job) -> Vec<String> {
    if !job.is_created() {
        return vec![SETUP.to_string()];
    }
    std::iter::once(SETUP)
        .chain(data_types(job))
        .chain([SUBMIT, RESULTS])
        .map(str::to_string)
        .collect()
}

/// Upload state of each data type, in first-appearance order.
pub fn data_step_status(job: &Job) -> Vec<(&str, &'static str)> {
    data_types(job)
        .into_iter()
        .map(|data_type| {
            let missing = missing_data_objects(job).any(|d| d.data_type() == data_type);
            (data_type, if missing { NEEDS_DATA } else { COMPLETE })
        })
        .collect()
}

/// Summary of all uploads.
pub fn data_object_status(job: &Job) -> &'static str {
    if !job.is_created() {
        "Calculation Setup Required"
    } else if missing_data_objects(job).next().is_some() {
        "Data Upload Required"
    } else {
        "All Data Uploaded"
    }
}
